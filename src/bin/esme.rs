// ABOUTME: Command-line entrypoint running one configured SMPP client
// ABOUTME: Loads a JSON client declaration, binds, and runs until stopped

//! # esme
//!
//! Runs one SMPP transceiver session from a JSON client declaration:
//!
//! ```bash
//! esme --client client.json
//! ```
//!
//! where `client.json` deserializes into [`esme::ClientConfig`]:
//!
//! ```json
//! {
//!   "smsc_host": "127.0.0.1",
//!   "smsc_port": 2775,
//!   "system_id": "smppclient1",
//!   "password": "password"
//! }
//! ```
//!
//! The process binds as a transceiver with the in-process broker wired in,
//! answers deliveries and link probes, and reconnects on session loss.
//! Applications that enqueue their own traffic or plug in an external
//! broker embed the library instead of running this binary.
//!
//! Exit codes: 0 on normal shutdown, 2 on a configuration error, 1 on an
//! unrecoverable runtime error.

use argh::FromArgs;
use esme::{Client, ClientConfig, InMemoryBroker};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Asynchronous SMPP v3.4 transceiver client.
#[derive(FromArgs)]
struct CliArgs {
    /// path to the JSON declaration of the configured client
    #[argh(option)]
    client: Option<String>,

    /// print the version and exit
    #[argh(switch)]
    version: bool,

    /// enable debug logging
    #[argh(switch, short = 'd')]
    debugging: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli_args: CliArgs = argh::from_env();

    if cli_args.version {
        println!("esme {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("failed to install the log subscriber");
        return ExitCode::from(1);
    }

    let config = match load_config(cli_args.client.as_deref()) {
        Ok(config) => config,
        Err(message) => {
            error!(%message, "configuration error");
            return ExitCode::from(2);
        }
    };

    let broker = Arc::new(InMemoryBroker::new(1000));
    let client = Arc::new(Client::new(config, broker));

    {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping client");
                client.stop();
            }
        });
    }

    match client.run().await {
        Ok(()) => {
            info!("client shut down");
            ExitCode::SUCCESS
        }
        Err(esme::SessionError::Config(message)) => {
            error!(%message, "configuration error");
            ExitCode::from(2)
        }
        Err(error) => {
            error!(%error, "client failed");
            ExitCode::from(1)
        }
    }
}

fn load_config(path: Option<&str>) -> Result<ClientConfig, String> {
    let path = path.ok_or("--client <path> is required (see --help)")?;
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read client declaration '{path}': {e}"))?;
    let config: ClientConfig = serde_json::from_str(&raw)
        .map_err(|e| format!("client declaration '{path}' is invalid: {e}"))?;
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}
