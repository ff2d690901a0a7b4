use std::{env, fmt};

use crate::{
    context::Context,
    flag::{Flag, FlagSet},
    help,
    reorder::reorder,
    resolve::resolve,
    rt::{Mode, Parser},
    source::InputSource,
    Error, Result,
};

/// Runs with the resolved context of a command.
pub type Action = Box<dyn Fn(&Context<'_>) -> Result<()>>;

/// Called with the context of the parent command and the unmatched name.
pub type NotFoundHandler = Box<dyn Fn(&Context<'_>, &str) -> Result<()>>;

/// Called with a parse error and the usage text of the failing command.
pub type UsageReporter = Box<dyn Fn(&Error, &str)>;

/// A node of the command tree.
///
/// A command with subcommands or a `before` hook is internal: it parses its
/// own flags up to the first positional, runs `before`, and passes the
/// remaining arguments to the subcommand that positional names. A leaf has
/// its arguments reordered so flags and positionals may be mixed freely.
pub struct Command {
    pub(crate) name: String,
    pub(crate) short_name: Option<String>,
    pub(crate) usage: String,
    pub(crate) description: String,
    pub(crate) subcommands: Vec<Command>,
    pub(crate) flags: Vec<Flag>,
    pub(crate) before: Option<Action>,
    pub(crate) action: Option<Action>,
    pub(crate) skip_flag_parsing: bool,
    pub(crate) hide_help: bool,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("short_name", &self.short_name)
            .field("subcommands", &self.subcommands)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl Command {
    pub fn new(name: impl Into<String>) -> Command {
        Command {
            name: name.into(),
            short_name: None,
            usage: String::new(),
            description: String::new(),
            subcommands: Vec::new(),
            flags: Vec::new(),
            before: None,
            action: None,
            skip_flag_parsing: false,
            hide_help: false,
        }
    }

    pub fn short_name(mut self, name: impl Into<String>) -> Command {
        self.short_name = Some(name.into());
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Command {
        self.usage = usage.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Command {
        self.description = description.into();
        self
    }

    pub fn subcommand(mut self, cmd: Command) -> Command {
        self.subcommands.push(cmd);
        self
    }

    pub fn flag(mut self, flag: Flag) -> Command {
        self.flags.push(flag);
        self
    }

    pub fn flags(mut self, flags: impl IntoIterator<Item = Flag>) -> Command {
        self.flags.extend(flags);
        self
    }

    /// Runs after flags are resolved and before the action or subcommand.
    /// An error stops the dispatch.
    pub fn before(mut self, f: impl Fn(&Context<'_>) -> Result<()> + 'static) -> Command {
        self.before = Some(Box::new(f));
        self
    }

    pub fn action(mut self, f: impl Fn(&Context<'_>) -> Result<()> + 'static) -> Command {
        self.action = Some(Box::new(f));
        self
    }

    /// Hands every argument to the action as a positional.
    pub fn skip_flag_parsing(mut self) -> Command {
        self.skip_flag_parsing = true;
        self
    }

    /// Drops the automatic `--help` flag.
    pub fn hide_help(mut self) -> Command {
        self.hide_help = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name == name || self.short_name.as_deref() == Some(name)
    }

    /// Neither subcommands nor a `before` hook.
    pub fn is_leaf(&self) -> bool {
        self.subcommands.is_empty() && self.before.is_none()
    }

    fn flag_set(&self) -> Result<FlagSet> {
        let help = if self.hide_help { None } else { Some(help::help_flag()) };
        FlagSet::new(self.flags.iter().cloned().chain(help))
    }
}

/// A command tree together with the settings shared by all its nodes.
pub struct App {
    root: Command,
    input_source: Option<Box<dyn InputSource>>,
    command_not_found: Option<NotFoundHandler>,
    usage_reporter: Option<UsageReporter>,
}

impl App {
    pub fn new(root: Command) -> App {
        App { root, input_source: None, command_not_found: None, usage_reporter: None }
    }

    /// Consulted for every flag that no higher-priority source sets.
    pub fn input_source(mut self, src: impl InputSource + 'static) -> App {
        self.input_source = Some(Box::new(src));
        self
    }

    /// Replaces the default handler, which reports the unknown command on
    /// stderr and succeeds.
    pub fn command_not_found(
        mut self,
        f: impl Fn(&Context<'_>, &str) -> Result<()> + 'static,
    ) -> App {
        self.command_not_found = Some(Box::new(f));
        self
    }

    /// Replaces the default reporter, which prints to stderr.
    pub fn usage_reporter(mut self, f: impl Fn(&Error, &str) + 'static) -> App {
        self.usage_reporter = Some(Box::new(f));
        self
    }

    pub fn root(&self) -> &Command {
        &self.root
    }

    /// Runs the command tree on `args`, which exclude the program name.
    pub fn run<I, S>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = args.into_iter().map(Into::into).collect();
        self.dispatch(&self.root, self.root.name.clone(), args, None)
    }

    pub fn run_from_env(&self) -> Result<()> {
        let args = env::args_os()
            .skip(1)
            .map(|it| it.into_string().map_err(Error::InvalidUtf8))
            .collect::<Result<Vec<_>>>()?;
        self.run(args)
    }

    pub fn run_or_exit(&self) {
        self.run_from_env().unwrap_or_else(|err| err.exit())
    }

    fn dispatch<'p>(
        &self,
        cmd: &Command,
        path: String,
        args: Vec<String>,
        parent: Option<&'p Context<'p>>,
    ) -> Result<()> {
        let ctx = if cmd.skip_flag_parsing {
            Context::new(path, FlagSet::default(), Vec::new(), args, parent)
        } else {
            self.parse(cmd, &path, args, parent).map_err(|err| {
                if !err.is_help() {
                    self.report(&err, &help::render(cmd, &path));
                }
                err
            })?
        };

        if let Some(before) = &cmd.before {
            before(&ctx)?;
        }

        if cmd.subcommands.is_empty() {
            return match &cmd.action {
                Some(action) => action(&ctx),
                None => Ok(()),
            };
        }
        let (name, rest) = match ctx.args().split_first() {
            Some(it) => it,
            None => {
                return match &cmd.action {
                    Some(action) => action(&ctx),
                    None => Err(Error::SubcommandRequired),
                }
            }
        };
        match cmd.subcommands.iter().find(|it| it.has_name(name)) {
            Some(sub) => {
                tracing::debug!(command = %ctx.command_name(), subcommand = %sub.name, "dispatching");
                let path = format!("{} {}", ctx.command_name(), sub.name);
                self.dispatch(sub, path, rest.to_vec(), Some(&ctx))
            }
            None => self.not_found(&ctx, name),
        }
    }

    fn parse<'p>(
        &self,
        cmd: &Command,
        path: &str,
        args: Vec<String>,
        parent: Option<&'p Context<'p>>,
    ) -> Result<Context<'p>> {
        let set = cmd.flag_set()?;
        let (args, mode) = if cmd.is_leaf() {
            (reorder(&set, &args), Mode::Interleaved)
        } else {
            (args, Mode::StopAtPositional)
        };
        let parsed = Parser::new(&set, args, mode).parse()?;
        let values = resolve(&set, &parsed, self.input_source.as_deref())?;
        let ctx = Context::new(path.to_string(), set, values, parsed.positionals, parent);
        if ctx.is_local_set("help") && !cmd.hide_help {
            return Err(Error::Help(help::render(cmd, path)));
        }
        let missing = ctx.missing_required();
        if !missing.is_empty() {
            return Err(Error::MissingRequired(missing));
        }
        Ok(ctx)
    }

    fn not_found(&self, ctx: &Context<'_>, name: &str) -> Result<()> {
        tracing::debug!(command = %ctx.command_name(), %name, "command not found");
        match &self.command_not_found {
            Some(handler) => handler(ctx, name),
            None => {
                eprintln!("{}", Error::UnknownCommand(name.to_string()));
                Ok(())
            }
        }
    }

    fn report(&self, err: &Error, usage: &str) {
        match &self.usage_reporter {
            Some(reporter) => reporter(err, usage),
            None => eprintln!("Incorrect Usage: {err}\n\n{usage}\n"),
        }
    }
}
