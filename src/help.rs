use std::fmt::Write;

use crate::{command::Command, flag::Flag, value::Kind};

pub(crate) fn help_flag() -> Flag {
    Flag::bool("help").alias("h").usage("Prints help information.").command_line_only()
}

/// Usage text for `cmd`, invoked as `path`.
pub(crate) fn render(cmd: &Command, path: &str) -> String {
    let mut buf = String::new();
    let has_subcommands = !cmd.subcommands.is_empty();

    let _ = write!(buf, "Usage: {path} [flags]");
    if has_subcommands {
        buf.push_str(" <command>");
    }
    buf.push_str(" [args...]\n");

    let about = if cmd.description.is_empty() { &cmd.usage } else { &cmd.description };
    if !about.is_empty() {
        let _ = write!(buf, "\n{about}\n");
    }

    if has_subcommands {
        buf.push_str("\nCommands:\n");
        for sub in &cmd.subcommands {
            let names = match &sub.short_name {
                Some(short) => format!("{}, {short}", sub.name),
                None => sub.name.clone(),
            };
            let _ = writeln!(buf, "    {names:<20} {}", sub.usage);
        }
    }

    let flags = cmd.flags.iter().filter(|it| it.is_visible()).collect::<Vec<_>>();
    if !flags.is_empty() || !cmd.hide_help {
        buf.push_str("\nFlags:\n");
        let help = help_flag();
        let help = if cmd.hide_help { None } else { Some(&help) };
        for flag in flags.into_iter().chain(help) {
            let _ = writeln!(buf, "    {:<28} {}", signature(flag), details(flag));
        }
    }
    buf.trim_end().to_string()
}

fn signature(flag: &Flag) -> String {
    let mut res = flag
        .names()
        .map(|name| if name.chars().count() == 1 { format!("-{name}") } else { format!("--{name}") })
        .collect::<Vec<_>>()
        .join(", ");
    if flag.takes_value() {
        let _ = write!(res, " <{}>", flag.kind());
    }
    res
}

fn details(flag: &Flag) -> String {
    let mut res = flag.usage.clone();
    let default = flag.default_value();
    let is_zero = match default.kind() {
        Kind::Bool => true,
        Kind::String => default.to_string() == "\"\"",
        kind if kind.is_slice() => default.to_string() == "[]",
        _ => false,
    };
    if !is_zero {
        let _ = write!(res, " (default: {default})");
    }
    if !flag.env_vars.is_empty() {
        let vars = flag.env_vars.iter().map(|it| format!("${it}")).collect::<Vec<_>>();
        let _ = write!(res, " [{}]", vars.join(", "));
    }
    if flag.is_required() {
        res.push_str(" (required)");
    }
    res.trim_start().to_string()
}
