use crate::{flag::FlagSet, Error, Result};

/// Where a parse stops looking for flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Flags may appear anywhere; positionals are collected as they come.
    Interleaved,
    /// The first positional ends flag parsing, everything from it on is
    /// positional. Used by commands that dispatch to a child.
    StopAtPositional,
}

/// Raw result of matching tokens against a [`FlagSet`].
#[derive(Debug)]
pub(crate) struct Parsed {
    /// Raw values per flag, indexed like the flag set.
    pub(crate) occurrences: Vec<Vec<String>>,
    /// Number of times each flag appeared.
    pub(crate) counts: Vec<usize>,
    pub(crate) positionals: Vec<String>,
}

pub(crate) struct Parser<'a> {
    set: &'a FlagSet,
    mode: Mode,
    after_double_dash: bool,
    rargs: Vec<String>,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(set: &'a FlagSet, mut args: Vec<String>, mode: Mode) -> Self {
        args.reverse();
        Self { set, mode, after_double_dash: false, rargs: args }
    }

    pub(crate) fn parse(mut self) -> Result<Parsed> {
        let mut res = Parsed {
            occurrences: vec![Vec::new(); self.set.len()],
            counts: vec![0; self.set.len()],
            positionals: Vec::new(),
        };
        while let Some(arg) = self.pop_flag() {
            match arg {
                Ok(flag) => self.flag(&mut res, flag)?,
                Err(arg) => {
                    res.positionals.push(arg);
                    if self.mode == Mode::StopAtPositional {
                        res.positionals.extend(self.rargs.drain(..).rev());
                    }
                }
            }
        }
        Ok(res)
    }

    fn flag(&mut self, res: &mut Parsed, flag: String) -> Result<()> {
        let body = flag.strip_prefix("--").or_else(|| flag.strip_prefix('-')).unwrap_or(&flag);
        if body.is_empty() || body.starts_with('-') || body.starts_with('=') {
            return Err(Error::BadSyntax(flag));
        }
        let (name, inline) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };
        let idx = match self.set.position(name) {
            Some(it) => it,
            None => return Err(Error::UnknownFlag(flag)),
        };

        let value = if self.set.lookup(name).map_or(false, |it| it.takes_value()) {
            match inline {
                Some(it) => it.to_string(),
                None => self.next_value(&flag)?,
            }
        } else {
            inline.unwrap_or("true").to_string()
        };
        res.occurrences[idx].push(value);
        res.counts[idx] += 1;
        Ok(())
    }

    fn pop_flag(&mut self) -> Option<Result<String, String>> {
        if self.after_double_dash {
            self.next().map(Err)
        } else {
            let arg = self.next()?;
            if arg.len() > 1 && arg.starts_with('-') {
                if arg == "--" {
                    self.after_double_dash = true;
                    return self.next().map(Err);
                }
                Some(Ok(arg))
            } else {
                Some(Err(arg))
            }
        }
    }

    fn next(&mut self) -> Option<String> {
        self.rargs.pop()
    }

    fn next_value(&mut self, flag: &str) -> Result<String> {
        self.next().ok_or_else(|| Error::MissingValue(flag.to_string()))
    }
}
