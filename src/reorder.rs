use crate::flag::{Flag, FlagSet};

/// Moves flags in front of positional arguments, keeping each value-taking
/// flag next to its value.
///
/// `cmd file.txt -o out.txt -v` becomes `cmd -o out.txt -v file.txt`. Flags
/// keep their relative order, as do positionals. A value-taking flag takes
/// the first non-flag token after it as its value; unknown flags and bool
/// flags take nothing, so an unknown flag reaches the parser untouched.
///
/// `--` and everything after it are left in place at the end. If the
/// arguments run out while a flag still waits for its value, the flags after
/// the last paired value stay behind the positionals, so the missing value is
/// reported rather than filled with a positional.
///
/// Reordering its own output changes nothing.
pub fn reorder(set: &FlagSet, args: &[String]) -> Vec<String> {
    let (head, tail) = match args.iter().position(|it| it == "--") {
        Some(idx) => args.split_at(idx),
        None => (args, &[][..]),
    };

    let mut flags = Vec::with_capacity(args.len());
    let mut positionals = Vec::new();
    let mut awaiting = false;
    let mut paired = 0;
    for arg in head {
        if is_flag_like(arg) {
            flags.push(arg.clone());
            awaiting = set.lookup(flag_name(arg)).map_or(false, Flag::takes_value);
        } else if awaiting {
            flags.push(arg.clone());
            paired = flags.len();
            awaiting = false;
        } else {
            positionals.push(arg.clone());
        }
    }

    let trailing = if awaiting { flags.split_off(paired) } else { Vec::new() };
    let mut res = flags;
    res.extend(positionals);
    res.extend(trailing);
    res.extend(tail.iter().cloned());
    tracing::trace!(?res, "reordered arguments");
    res
}

fn is_flag_like(arg: &str) -> bool {
    arg.len() > 1 && arg.starts_with('-')
}

fn flag_name(arg: &str) -> &str {
    arg.strip_prefix("--").or_else(|| arg.strip_prefix('-')).unwrap_or(arg)
}
