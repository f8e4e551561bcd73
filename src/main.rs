use anyhow::Result;
use clap::Parser;
use gitvision::cli::{AppContext, Cli, Commands};
use gitvision::commands::{self, finish_with_exit};
use gitvision::infra::{config, logging};

fn main() {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
    };
    logging::init(cli.verbose, cli.no_color);

    let result = dispatch(cli, &ctx);
    finish_with_exit(result, &ctx)
}

fn dispatch(
    cli: Cli,
    ctx: &AppContext,
) -> Result<()> {
    // `init` must work even when an existing config is broken
    let load = || config::load_config(cli.config.as_deref());

    match cli.command {
        Commands::Normalize(args) => commands::normalize_run(args, ctx),
        Commands::Resolve(args) => commands::resolve_run(args, &load()?, ctx),
        Commands::Run(args) => commands::run_run(args, &load()?, ctx),
        Commands::Session(args) => commands::session_run(args, &load()?, ctx),
        Commands::Init(args) => config::init(args, ctx),
    }
}
