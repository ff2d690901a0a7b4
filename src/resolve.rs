//! Merges the sources of a flag's value, highest priority first:
//! command line, environment, file, input source, default.

use std::{env, fmt, fs};

use crate::{
    flag::{Flag, FlagSet},
    rt::Parsed,
    source::InputSource,
    value::Value,
    Error, Result,
};

/// The effective value of one flag.
#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    pub(crate) value: Value,
    /// Whether any source above the default supplied the value.
    pub(crate) set: bool,
    /// Occurrences on the command line.
    pub(crate) count: usize,
}

#[derive(Debug, Clone, Copy)]
enum Origin {
    CommandLine,
    Env,
    File,
    InputSource,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Origin::CommandLine => "command line",
            Origin::Env => "environment",
            Origin::File => "file",
            Origin::InputSource => "input source",
        };
        f.write_str(s)
    }
}

enum Supplied {
    Value(Value),
    /// The source is there but holds an empty string.
    Empty,
    Absent,
}

pub(crate) fn resolve(
    set: &FlagSet,
    parsed: &Parsed,
    input: Option<&dyn InputSource>,
) -> Result<Vec<Resolved>> {
    set.iter()
        .enumerate()
        .map(|(idx, flag)| resolve_flag(flag, &parsed.occurrences[idx], parsed.counts[idx], input))
        .collect()
}

fn resolve_flag(
    flag: &Flag,
    occurrences: &[String],
    count: usize,
    input: Option<&dyn InputSource>,
) -> Result<Resolved> {
    let mut resolved = None;
    for origin in [Origin::CommandLine, Origin::Env, Origin::File, Origin::InputSource] {
        match supply(flag, origin, occurrences, input)? {
            Supplied::Value(value) => {
                tracing::debug!(flag = %flag.name, %origin, kind = %value.kind(), "resolved flag");
                resolved = Some(value);
                break;
            }
            Supplied::Empty if !flag.required => {
                tracing::debug!(flag = %flag.name, %origin, "empty value, keeping default");
                break;
            }
            Supplied::Empty | Supplied::Absent => continue,
        }
    }

    let set = resolved.is_some();
    let value = resolved.unwrap_or_else(|| flag.default.clone());
    if let Some(destination) = &flag.destination {
        destination.store(&value);
    }
    if let Some(counter) = &flag.counter {
        *counter.cell.borrow_mut() += count;
    }
    Ok(Resolved { value, set, count })
}

fn supply(
    flag: &Flag,
    origin: Origin,
    occurrences: &[String],
    input: Option<&dyn InputSource>,
) -> Result<Supplied> {
    if flag.command_line_only && !matches!(origin, Origin::CommandLine) {
        return Ok(Supplied::Absent);
    }
    let text = match origin {
        Origin::CommandLine => {
            let raws = occurrences.iter().map(String::as_str).collect::<Vec<_>>();
            return Ok(flag.parse(&raws)?.map_or(Supplied::Absent, Supplied::Value));
        }
        Origin::InputSource => {
            let value = match input {
                Some(src) => src.get(&flag.name, flag.kind())?,
                None => None,
            };
            return Ok(value.map_or(Supplied::Absent, Supplied::Value));
        }
        Origin::Env => from_env(flag)?,
        Origin::File => from_file(flag),
    };
    let supplied = match text {
        None => Supplied::Absent,
        Some(text) if text.is_empty() => Supplied::Empty,
        Some(text) => flag.parse(&flag.split_list(&text))?.map_or(Supplied::Absent, Supplied::Value),
    };
    Ok(supplied)
}

/// The first listed variable with a non-empty value, or an empty string if
/// all that are set are empty.
fn from_env(flag: &Flag) -> Result<Option<String>> {
    let mut res = None;
    for var in &flag.env_vars {
        match env::var(var) {
            Ok(it) if it.is_empty() => res = Some(it),
            Ok(it) => return Ok(Some(it)),
            Err(env::VarError::NotPresent) => (),
            Err(env::VarError::NotUnicode(raw)) => {
                return Err(Error::Malformed {
                    flag: flag.name.clone(),
                    value: raw.to_string_lossy().into_owned(),
                    kind: flag.kind(),
                    reason: format!("${var} is not valid utf8"),
                })
            }
        }
    }
    Ok(res)
}

fn from_file(flag: &Flag) -> Option<String> {
    let path = flag.file_path.as_ref()?;
    match fs::read_to_string(path) {
        Ok(text) => Some(text.trim().to_string()),
        Err(err) => {
            tracing::debug!(flag = %flag.name, path = %path.display(), %err, "flag file not readable");
            None
        }
    }
}
