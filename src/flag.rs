use std::{collections::HashMap, fmt, path::PathBuf, rc::Rc, time::Duration};

use crate::{
    value::{self, FromValue, Generic, Kind, Rejected, Sink, Slot, Value},
    Error, Result,
};

/// A named, typed value that can be set from the command line, environment
/// variables, a file or an input source.
///
/// Flags are plain data; build them with the per-kind constructors and the
/// builder methods, then hand them to a [`Command`](crate::Command).
#[derive(Clone)]
pub struct Flag {
    pub(crate) name: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) usage: String,
    pub(crate) env_vars: Vec<String>,
    pub(crate) file_path: Option<PathBuf>,
    pub(crate) default: Value,
    pub(crate) required: bool,
    pub(crate) hidden: bool,
    /// Ignores environment, file and input source.
    pub(crate) command_line_only: bool,
    pub(crate) destination: Option<Rc<dyn Sink>>,
    pub(crate) counter: Option<Slot<usize>>,
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flag")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("kind", &self.kind())
            .field("default", &self.default)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

impl Flag {
    pub fn new(name: impl Into<String>, default: impl Into<Value>) -> Flag {
        Flag {
            name: name.into(),
            aliases: Vec::new(),
            usage: String::new(),
            env_vars: Vec::new(),
            file_path: None,
            default: default.into(),
            required: false,
            hidden: false,
            command_line_only: false,
            destination: None,
            counter: None,
        }
    }

    pub fn bool(name: impl Into<String>) -> Flag {
        Flag::new(name, false)
    }

    pub fn int(name: impl Into<String>, default: isize) -> Flag {
        Flag::new(name, default)
    }

    pub fn int64(name: impl Into<String>, default: i64) -> Flag {
        Flag::new(name, default)
    }

    pub fn uint(name: impl Into<String>, default: usize) -> Flag {
        Flag::new(name, default)
    }

    pub fn uint64(name: impl Into<String>, default: u64) -> Flag {
        Flag::new(name, default)
    }

    pub fn float64(name: impl Into<String>, default: f64) -> Flag {
        Flag::new(name, default)
    }

    pub fn string(name: impl Into<String>, default: impl Into<String>) -> Flag {
        Flag::new(name, default.into())
    }

    pub fn duration(name: impl Into<String>, default: Duration) -> Flag {
        Flag::new(name, default)
    }

    /// A flag of a user-defined type; `default` is also the prototype every
    /// parse starts from.
    pub fn generic(name: impl Into<String>, default: impl Generic + 'static) -> Flag {
        Flag::new(name, Box::new(default) as Box<dyn Generic>)
    }

    pub fn int_slice(name: impl Into<String>, default: Vec<isize>) -> Flag {
        Flag::new(name, default)
    }

    pub fn int64_slice(name: impl Into<String>, default: Vec<i64>) -> Flag {
        Flag::new(name, default)
    }

    pub fn uint_slice(name: impl Into<String>, default: Vec<usize>) -> Flag {
        Flag::new(name, default)
    }

    pub fn uint64_slice(name: impl Into<String>, default: Vec<u64>) -> Flag {
        Flag::new(name, default)
    }

    pub fn float64_slice(name: impl Into<String>, default: Vec<f64>) -> Flag {
        Flag::new(name, default)
    }

    pub fn string_slice(name: impl Into<String>, default: Vec<String>) -> Flag {
        Flag::new(name, default)
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Flag {
        self.aliases.push(alias.into());
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Flag {
        self.usage = usage.into();
        self
    }

    /// Adds an environment variable to consult; earlier ones win.
    pub fn env(mut self, var: impl Into<String>) -> Flag {
        self.env_vars.push(var.into());
        self
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Flag {
        self.file_path = Some(path.into());
        self
    }

    pub fn required(mut self) -> Flag {
        self.required = true;
        self
    }

    pub fn hidden(mut self) -> Flag {
        self.hidden = true;
        self
    }

    pub(crate) fn command_line_only(mut self) -> Flag {
        self.command_line_only = true;
        self
    }

    /// Writes the resolved value into `slot` as well.
    ///
    /// # Panics
    ///
    /// If `T` is not the Rust type of this flag's kind.
    pub fn destination<T: FromValue + fmt::Debug + 'static>(mut self, slot: &Slot<T>) -> Flag {
        assert_eq!(T::KIND, self.kind(), "destination type doesn't match flag `{}`", self.name);
        let sink: Rc<dyn Sink> = slot.cell.clone();
        self.destination = Some(sink);
        self
    }

    /// Counts how many times a bool flag appears on the command line.
    ///
    /// # Panics
    ///
    /// If this is not a bool flag.
    pub fn count(mut self, counter: &Slot<usize>) -> Flag {
        assert_eq!(self.kind(), Kind::Bool, "only bool flags can be counted: `{}`", self.name);
        self.counter = Some(counter.clone());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn kind(&self) -> Kind {
        self.default.kind()
    }

    pub fn takes_value(&self) -> bool {
        self.kind().takes_value()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_visible(&self) -> bool {
        !self.hidden
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// Parses raw occurrences of this flag, in order.
    pub(crate) fn parse(&self, raws: &[&str]) -> Result<Option<Value>> {
        let malformed = |raw: &str, reason: String| Error::Malformed {
            flag: self.name.clone(),
            value: raw.to_string(),
            kind: self.kind(),
            reason,
        };
        if raws.is_empty() {
            return Ok(None);
        }
        match &self.default {
            Value::Generic(proto) => {
                let mut it = proto.clone();
                for raw in raws {
                    it.set(raw).map_err(|reason| malformed(raw, reason))?;
                }
                Ok(Some(Value::Generic(it)))
            }
            _ => value::parse(self.kind(), raws)
                .map_err(|Rejected { raw, reason }| malformed(&raw, reason)),
        }
    }

    /// Splits a value from the environment or a file into occurrences.
    pub(crate) fn split_list<'a>(&self, raw: &'a str) -> Vec<&'a str> {
        if self.kind().is_slice() {
            raw.split(',').map(str::trim).collect()
        } else {
            vec![raw]
        }
    }
}

/// The flags of one command invocation.
#[derive(Debug, Default, Clone)]
pub struct FlagSet {
    flags: Vec<Flag>,
    index: HashMap<String, usize>,
}

impl FlagSet {
    /// Fails if two flags share a name or alias.
    pub fn new(flags: impl IntoIterator<Item = Flag>) -> Result<FlagSet> {
        let mut res = FlagSet::default();
        for flag in flags {
            let idx = res.flags.len();
            for name in flag.names() {
                if res.index.insert(name.to_string(), idx).is_some() {
                    return Err(Error::DuplicateFlag(name.to_string()));
                }
            }
            res.flags.push(flag);
        }
        Ok(res)
    }

    pub fn lookup(&self, name: &str) -> Option<&Flag> {
        self.position(name).map(|idx| &self.flags[idx])
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}
