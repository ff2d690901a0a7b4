use std::{iter, time::Duration};

use crate::{
    flag::FlagSet,
    resolve::Resolved,
    value::{FromValue, Generic, Value},
};

/// Resolved flags and remaining arguments of one command invocation.
///
/// A flag that is not declared by this command is looked up in the contexts
/// of the enclosing commands, innermost first.
pub struct Context<'a> {
    command: String,
    set: FlagSet,
    values: Vec<Resolved>,
    args: Vec<String>,
    parent: Option<&'a Context<'a>>,
}

macro_rules! getters {
    ($($(#[$attr:meta])* $name:ident -> $ty:ty;)*) => {$(
        $(#[$attr])*
        pub fn $name(&self, name: &str) -> $ty {
            self.get(name).unwrap_or_default()
        }
    )*};
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        command: String,
        set: FlagSet,
        values: Vec<Resolved>,
        args: Vec<String>,
        parent: Option<&'a Context<'a>>,
    ) -> Context<'a> {
        Context { command, set, values, args, parent }
    }

    /// Full name of the command, e.g. `app server start`.
    pub fn command_name(&self) -> &str {
        &self.command
    }

    /// Positional arguments left after flag parsing.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn arg(&self, idx: usize) -> Option<&str> {
        self.args.get(idx).map(String::as_str)
    }

    pub fn parent(&self) -> Option<&Context<'a>> {
        self.parent
    }

    /// This context followed by its ancestors.
    pub fn lineage(&self) -> impl Iterator<Item = &Context<'a>> + '_ {
        iter::successors(Some(self), |ctx| ctx.parent)
    }

    fn lookup(&self, name: &str) -> Option<&Resolved> {
        self.lineage().find_map(|ctx| ctx.set.position(name).map(|idx| &ctx.values[idx]))
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.lookup(name).map(|it| &it.value)
    }

    /// Whether any source other than the default supplied the flag.
    pub fn is_set(&self, name: &str) -> bool {
        self.lookup(name).map_or(false, |it| it.set)
    }

    /// How many times the flag appeared on the command line.
    pub fn count(&self, name: &str) -> usize {
        self.lookup(name).map_or(0, |it| it.count)
    }

    /// `None` if no such flag is in scope or it has another kind.
    pub fn get<T: FromValue>(&self, name: &str) -> Option<T> {
        self.value(name).and_then(T::from_value)
    }

    getters! {
        bool -> bool;
        int -> isize;
        int64 -> i64;
        uint -> usize;
        uint64 -> u64;
        float64 -> f64;
        /// Empty if the flag is unknown.
        string -> String;
        duration -> Duration;
        int_slice -> Vec<isize>;
        int64_slice -> Vec<i64>;
        uint_slice -> Vec<usize>;
        uint64_slice -> Vec<u64>;
        float64_slice -> Vec<f64>;
        string_slice -> Vec<String>;
    }

    pub fn generic(&self, name: &str) -> Option<Box<dyn Generic>> {
        self.get(name)
    }

    pub(crate) fn is_local_set(&self, name: &str) -> bool {
        self.set.position(name).map_or(false, |idx| self.values[idx].set)
    }

    /// Names of required flags of this command that no source supplied.
    pub(crate) fn missing_required(&self) -> Vec<String> {
        self.set
            .iter()
            .zip(&self.values)
            .filter(|(flag, value)| flag.is_required() && !value.set)
            .map(|(flag, _)| flag.name().to_string())
            .collect()
    }
}
