//! CLI entry point.
//!
//! Parses arguments, installs logging, and routes each command to its
//! handler. Infrastructure is composed only in `bootstrap`.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use dubline_cli::bootstrap::apply_overrides;
use dubline_cli::{Cli, CliError, Commands, RunOptions, bootstrap, handlers, load_settings};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let mut settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => {
            apply_overrides(&mut settings, &args);
            let options = RunOptions::from_args(&args)?;
            let ctx = bootstrap(settings, options)?;
            handlers::run::execute(ctx, args.json).await?;
        }
        Commands::Segment {
            file,
            style,
            filler_every,
            json,
        } => {
            handlers::segment::execute(
                &file,
                style.unwrap_or(settings.style),
                filler_every.unwrap_or(settings.filler_every),
                json,
            )?;
        }
        Commands::Voices => handlers::voices::execute(),
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Load .env before clap reads env-backed flags
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = dispatch(cli).await {
        eprintln!("Error: {err:#}");
        let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        std::process::exit(code);
    }
}
