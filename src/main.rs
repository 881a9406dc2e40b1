use clap::Parser;
use relay::cli::setup::{init_tracing, load_config_with_overrides};
use relay::cli::{
    handle_catalog, handle_config_check, handle_config_init, handle_route, Cli, Commands,
    ConfigCommands,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_level = cli.log_level.as_deref();

    // Tracing follows the config the command points at, when there is one.
    let config_path = match &cli.command {
        Commands::Route(args) => Some(&args.config),
        Commands::Catalog(args) => Some(&args.config),
        Commands::Config(_) => None,
    };
    if let Some(path) = config_path {
        if let Ok(config) = load_config_with_overrides(path, log_level) {
            init_tracing(&config.logging)?;
        }
    }

    let output = match &cli.command {
        Commands::Route(args) => handle_route(args, log_level)?,
        Commands::Catalog(args) => handle_catalog(args, log_level)?,
        Commands::Config(ConfigCommands::Init(args)) => handle_config_init(args)?,
        Commands::Config(ConfigCommands::Check(args)) => handle_config_check(args)?,
    };
    println!("{}", output);

    Ok(())
}
