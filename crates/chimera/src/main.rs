mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use chimera_core::{CoreError, RemoteFailureKind, Session};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a service connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "chimera", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let client_config = config::build_client_config(&cli.global)?;
            let url = client_config.base_url.to_string();
            let session = Session::new(client_config)?;

            if commands::needs_inventory(&cmd) {
                commands::util::with_spinner("Loading devices…", cli.global.quiet, session.load())
                    .await
                    .map_err(|e| connection_error(e, &url))?;
            }

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &session, &cli.global).await
        }
    }
}

/// An unreachable service on first load is a connection problem, not a
/// failed device action.
fn connection_error(err: CoreError, url: &str) -> CliError {
    match err {
        CoreError::LoadFailure {
            kind: RemoteFailureKind::Network,
            message,
        } => CliError::ConnectionFailed {
            url: url.to_owned(),
            message,
        },
        other => other.into(),
    }
}
