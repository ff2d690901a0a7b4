//! Command trees with typed flags.
//!
//! A flag's value is resolved from, in order, the command line, environment
//! variables, a file, a structured [`InputSource`] and finally its default.
//! Commands nest: an internal command parses its own flags and hands the rest
//! of the arguments to the child named by the first positional.
//!
//! ```no_run
//! use cmdtree::{App, Command, Flag};
//!
//! let app = App::new(
//!     Command::new("hello")
//!         .flag(Flag::string("name", "world").alias("n").env("HELLO_NAME"))
//!         .flag(Flag::bool("emoji").alias("e"))
//!         .action(|ctx| {
//!             let bang = if ctx.bool("emoji") { "❣️" } else { "!" };
//!             println!("Hello {}{}", ctx.string("name"), bang);
//!             Ok(())
//!         }),
//! );
//! app.run_or_exit();
//! ```

mod command;
mod context;
mod flag;
mod help;
mod reorder;
mod resolve;
mod rt;
mod source;
mod value;

use std::{ffi::OsString, fmt, io, path::PathBuf, process};

pub use crate::{
    command::{Action, App, Command, NotFoundHandler, UsageReporter},
    context::Context,
    flag::{Flag, FlagSet},
    reorder::reorder,
    source::{InputSource, MapInputSource, Node},
    value::{parse_duration, FromValue, Generic, Kind, Slot, Value},
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Can't parse {value:?} as {kind} for flag `{flag}`: {reason}")]
    Malformed { flag: String, value: String, kind: Kind, reason: String },

    #[error("Mismatched type for flag '{name}'. Expected '{expected}' but actual is '{actual}'")]
    TypeMismatch { name: String, expected: Kind, actual: String },

    #[error("Required flags \"{}\" not set", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("Unknown flag: `{0}`. Use `help` for more information")]
    UnknownFlag(String),

    #[error("Expected a value for `{0}`")]
    MissingValue(String),

    #[error("Bad flag syntax: `{0}`")]
    BadSyntax(String),

    #[error("Unknown command: `{0}`. Use `help` for more information")]
    UnknownCommand(String),

    #[error("A subcommand is required. Use `help` for more information")]
    SubcommandRequired,

    #[error("Flag redefined: `{0}`")]
    DuplicateFlag(String),

    #[error("Argument is not valid utf8: {0:?}")]
    InvalidUtf8(OsString),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid input source {source_name}: {source}")]
    Json {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Help(String),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps an arbitrary message, for use in actions and `before` hooks.
    pub fn msg(msg: impl fmt::Display) -> Error {
        Error::Other(msg.to_string().into())
    }

    pub fn is_help(&self) -> bool {
        matches!(self, Error::Help(_))
    }

    pub fn exit(self) -> ! {
        if self.is_help() {
            println!("{self}");
            process::exit(0)
        } else {
            eprintln!("{self}");
            process::exit(2)
        }
    }
}
