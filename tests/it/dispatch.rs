use cmdtree::{App, Command, Error, Flag, MapInputSource, Slot};
use expect_test::expect;
use serde_json::json;

use crate::{check, Log};

fn app(log: &Log) -> App {
    let build = {
        let log = log.clone();
        Command::new("build")
            .short_name("b")
            .usage("Builds the site")
            .flag(Flag::string("out", "public").alias("o"))
            .flag(Flag::int("jobs", 1).alias("j"))
            .action(move |ctx| {
                log.push(format!(
                    "build out={} jobs={} verbose={} args={:?}",
                    ctx.string("out"),
                    ctx.int("jobs"),
                    ctx.bool("verbose"),
                    ctx.args()
                ));
                Ok(())
            })
    };
    let serve = {
        let log = log.clone();
        Command::new("serve")
            .flag(Flag::uint("port", 8080).alias("p"))
            .flag(Flag::string("token", "").required())
            .action(move |ctx| {
                log.push(format!("serve port={}", ctx.uint("port")));
                Ok(())
            })
    };
    let exec = {
        let log = log.clone();
        Command::new("exec").skip_flag_parsing().action(move |ctx| {
            log.push(format!("exec {:?}", ctx.args()));
            Ok(())
        })
    };
    let root_log = log.clone();
    App::new(
        Command::new("site")
            .flag(Flag::bool("verbose").alias("v"))
            .subcommand(serve)
            .subcommand(build)
            .subcommand(exec)
            .action(move |_| {
                root_log.push("root");
                Ok(())
            }),
    )
}

#[test]
fn selects_child_by_name() {
    let log = Log::default();
    check(
        app(&log),
        &log,
        "build --out dist",
        expect![[r#"build out=dist jobs=1 verbose=false args=[]"#]],
    );
}

#[test]
fn selects_child_by_short_name() {
    let log = Log::default();
    check(app(&log), &log, "b -j 4", expect![[r#"build out=public jobs=4 verbose=false args=[]"#]]);
}

#[test]
fn child_sees_parent_flags() {
    let log = Log::default();
    check(
        app(&log),
        &log,
        "-v build src -o dist",
        expect![[r#"build out=dist jobs=1 verbose=true args=["src"]"#]],
    );
}

#[test]
fn parent_flag_after_child_name_is_unknown_to_child() {
    let log = Log::default();
    check(
        app(&log),
        &log,
        "build --verbose",
        expect!["error: Unknown flag: `--verbose`. Use `help` for more information"],
    );
}

#[test]
fn positionals_and_flags_interleave() {
    let log = Log::default();
    check(
        app(&log),
        &log,
        "build a -o dist b --jobs 3 c",
        expect![[r#"build out=dist jobs=3 verbose=false args=["a", "b", "c"]"#]],
    );
}

#[test]
fn trailing_flag_misses_its_value() {
    let log = Log::default();
    check(app(&log), &log, "build src --out", expect!["error: Expected a value for `--out`"]);
}

#[test]
fn malformed_token() {
    let log = Log::default();
    check(
        app(&log),
        &log,
        "build -j many",
        expect![[r#"error: Can't parse "many" as int for flag `jobs`: invalid digit found in string"#]],
    );
}

#[test]
fn root_action_without_arguments() {
    let log = Log::default();
    check(app(&log), &log, "", expect!["root"]);
}

#[test]
fn unknown_command_goes_to_handler() {
    let log = Log::default();
    let handler_log = log.clone();
    let app = app(&log).command_not_found(move |ctx, name| {
        handler_log.push(format!("{}: no command {name}", ctx.command_name()));
        Ok(())
    });
    check(app, &log, "unknown --out x", expect!["site: no command unknown"]);
}

#[test]
fn unknown_command_is_not_fatal_by_default() {
    let log = Log::default();
    check(app(&log), &log, "unknown", expect![""]);
}

#[test]
fn missing_required_flag_stops_before_action() {
    let log = Log::default();
    check(app(&log), &log, "serve -p 80", expect![[r#"error: Required flags "token" not set"#]]);
    check(app(&log), &log, "serve -p 80 --token s3cret", expect!["serve port=80"]);
}

#[test]
fn skip_flag_parsing_passes_everything_through() {
    let log = Log::default();
    check(
        app(&log),
        &log,
        "exec ls -la --color -- x",
        expect![[r#"exec ["ls", "-la", "--color", "--", "x"]"#]],
    );
}

#[test]
fn help_flag_returns_usage() {
    let log = Log::default();
    let err = app(&log).run(["build", "src", "--help"]).unwrap_err();
    assert!(err.is_help());
    expect![[r#"
        Usage: site build [flags] [args...]

        Builds the site

        Flags:
            --out, -o <string>           (default: "public")
            --jobs, -j <int>             (default: 1)
            --help, -h                   Prints help information."#]]
    .assert_eq(&err.to_string());
}

#[test]
fn usage_is_reported_on_parse_errors() {
    let log = Log::default();
    let reported = Log::default();
    let app = {
        let reported = reported.clone();
        app(&log).usage_reporter(move |err, usage| {
            reported.push(format!("{err}"));
            reported.push(usage.lines().next().unwrap_or_default());
        })
    };
    assert!(app.run(["serve", "--nope"]).is_err());
    assert_eq!(
        reported.0.borrow().as_slice(),
        ["Unknown flag: `--nope`. Use `help` for more information", "Usage: site serve [flags] [args...]"]
    );
}

#[test]
fn subcommand_required() {
    let log = Log::default();
    let app = App::new(Command::new("tool").subcommand(Command::new("a")));
    check(app, &log, "", expect!["error: A subcommand is required. Use `help` for more information"]);
}

#[test]
fn before_hook_runs_first_and_can_abort() {
    let log = Log::default();
    let app = |fail: bool| {
        let before_log = log.clone();
        let action_log = log.clone();
        let child_log = log.clone();
        App::new(
            Command::new("db")
                .flag(Flag::string("url", "sqlite://"))
                .before(move |ctx| {
                    before_log.push(format!("before url={}", ctx.string("url")));
                    if fail {
                        return Err(Error::msg("cannot connect"));
                    }
                    Ok(())
                })
                .subcommand(Command::new("migrate").action(move |ctx| {
                    child_log.push(format!("migrate url={}", ctx.string("url")));
                    Ok(())
                }))
                .action(move |_| {
                    action_log.push("db");
                    Ok(())
                }),
        )
    };
    check(app(false), &log, "--url pg:// migrate", expect![[r#"
        before url=pg://
        migrate url=pg://"#]]);
    check(app(true), &log, "--url pg:// migrate", expect![[r#"
        before url=pg://
        error: cannot connect"#]]);
}

#[test]
fn before_hook_makes_a_command_internal() {
    let log = Log::default();
    let before_log = log.clone();
    let action_log = log.clone();
    let app = App::new(
        Command::new("fmt")
            .flag(Flag::bool("check"))
            .before(move |_| {
                before_log.push("before");
                Ok(())
            })
            .action(move |ctx| {
                action_log.push(format!("fmt check={} {:?}", ctx.bool("check"), ctx.args()));
                Ok(())
            }),
    );
    assert!(!app.root().is_leaf());
    check(app, &log, "--check src", expect![[r#"
        before
        fmt check=true ["src"]"#]]);
}

#[test]
fn before_hook_stops_flag_parsing_at_first_positional() {
    let log = Log::default();
    let action_log = log.clone();
    let app = App::new(
        Command::new("fmt")
            .flag(Flag::bool("check"))
            .before(|_| Ok(()))
            .action(move |ctx| {
                action_log.push(format!("fmt check={} {:?}", ctx.bool("check"), ctx.args()));
                Ok(())
            }),
    );
    check(app, &log, "src --check", expect![[r#"fmt check=false ["src", "--check"]"#]]);
}

#[test]
fn help_is_read_from_the_command_line_only() {
    let log = Log::default();
    let app = |config: serde_json::Value| {
        let action_log = log.clone();
        App::new(Command::new("tool").flag(Flag::bool("quiet")).action(move |ctx| {
            action_log.push(format!("quiet={}", ctx.bool("quiet")));
            Ok(())
        }))
        .input_source(MapInputSource::from_json("cfg", config).unwrap())
    };
    check(app(json!({"help": true, "quiet": true})), &log, "", expect!["quiet=true"]);
    check(app(json!({"help": "see README"})), &log, "", expect!["quiet=false"]);
    assert!(app(json!({"help": false})).run(["--help"]).unwrap_err().is_help());
}

#[test]
fn nested_contexts_chain_to_the_root() {
    let log = Log::default();
    let leaf_log = log.clone();
    let app = App::new(
        Command::new("app")
            .flag(Flag::string("profile", "dev"))
            .subcommand(
                Command::new("server")
                    .flag(Flag::uint("port", 80))
                    .subcommand(Command::new("start").flag(Flag::bool("detach").alias("d")).action(
                        move |ctx| {
                            let lineage = ctx.lineage().map(|it| it.command_name()).collect::<Vec<_>>();
                            leaf_log.push(format!("{lineage:?}"));
                            leaf_log.push(format!(
                                "profile={} port={} detach={} profile_set={}",
                                ctx.string("profile"),
                                ctx.uint("port"),
                                ctx.bool("detach"),
                                ctx.is_set("profile"),
                            ));
                            Ok(())
                        },
                    )),
            ),
    );
    check(app, &log, "--profile prod server --port 9000 start -d", expect![[r#"
        ["app server start", "app server", "app"]
        profile=prod port=9000 detach=true profile_set=true"#]]);
}

#[test]
fn counter_and_destination() {
    let verbosity = Slot::new(0);
    let out = Slot::new(String::new());
    let app = App::new(
        Command::new("tool")
            .flag(Flag::bool("verbose").alias("v").count(&verbosity))
            .flag(Flag::string("out", "a.out").destination(&out)),
    );
    app.run(["-v", "-v", "x", "--verbose"]).unwrap();
    assert_eq!(verbosity.get(), 3);
    assert_eq!(out.get(), "a.out");

    app.run(["--out", "b.out"]).unwrap();
    assert_eq!(verbosity.get(), 3);
    assert_eq!(out.get(), "b.out");
}

#[test]
fn duplicate_flag_names_are_rejected() {
    let log = Log::default();
    let app = App::new(Command::new("tool").flag(Flag::bool("x")).flag(Flag::int("y", 0).alias("x")));
    check(app, &log, "", expect!["error: Flag redefined: `x`"]);
}
