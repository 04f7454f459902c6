use clap::Parser;
use shelf::cli::commands::{Cli, Commands};
use shelf::cli::handlers;
use shelf::logging::{LogConfig, init_logging};

fn main() {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_verbosity(cli.verbose));

    let result = match cli.command {
        // Init is handled before shelf discovery
        Commands::Init(args) => handlers::cmd_init(args, cli.shelf_dir.as_deref()),
        _ => handlers::dispatch(cli),
    };
    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
