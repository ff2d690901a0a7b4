use cmdtree::{App, Command, Flag, MapInputSource};

fn main() {
    tracing_subscriber::fmt::init();

    let greet = Command::new("greet")
        .short_name("g")
        .usage("Greets someone")
        .flag(Flag::string("name", "world").alias("n").env("HELLO_NAME").usage("Who to greet"))
        .flag(Flag::bool("emoji").alias("e"))
        .action(|ctx| {
            let bang = if ctx.bool("emoji") { "❣️" } else { "!" };
            let name = ctx.arg(0).map_or_else(|| ctx.string("name"), String::from);
            for _ in 0..ctx.uint("greeting.repeat").max(1) {
                println!("Hello {name}{bang}");
            }
            Ok(())
        });

    let mut app = App::new(
        Command::new("hello")
            .usage("A friendly demo")
            .flag(Flag::uint("greeting.repeat", 1).alias("r"))
            .subcommand(greet),
    );
    if let Ok(path) = std::env::var("HELLO_CONFIG") {
        match MapInputSource::from_json_file(&path) {
            Ok(src) => app = app.input_source(src),
            Err(err) => err.exit(),
        }
    }
    app.run_or_exit();
}
