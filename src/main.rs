#![allow(dead_code, clippy::similar_names)]
#![warn(clippy::shadow_reuse, clippy::shadow_same, clippy::builtin_type_shadow)]
mod config;
mod error;
mod flight_control;
mod logger;
mod operator;
mod session;
mod wire_link;

use crate::config::ConsoleConfig;
use crate::flight_control::FlightSequencer;
use crate::operator::{Commander, ConsoleSignal, OperatorConsole};
use crate::session::Session;
use crate::wire_link::{LinkAddress, UdpLink, WireLink};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() {
    let config = ConsoleConfig::from_env();
    let mut commander = init(&config).await;
    let mut console = OperatorConsole::stdin();

    loop {
        OperatorConsole::<tokio::io::Stdin>::print_menu(commander.flight_state());
        let read = tokio::select! {
            read = console.read_operation() => read,
            _ = tokio::signal::ctrl_c() => None,
        };
        let operation = match read {
            None => break,
            Some(Ok(operation)) => operation,
            Some(Err(e)) => {
                error!("Invalid input: {e:?}");
                continue;
            }
        };

        let c_tok = CancellationToken::new();
        let c_tok_clone = c_tok.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, aborting the running action.");
                c_tok_clone.cancel();
            }
        });
        let res = commander.execute(operation, &c_tok).await;
        interrupt.abort();
        match res {
            Ok(ConsoleSignal::Continue) => {}
            Ok(ConsoleSignal::Exit) => break,
            Err(e) => error!("Action failed: {e:?}"),
        }
    }
    info!("Shutting down.");
    // the blocking stdin reader would otherwise keep the runtime alive
    std::process::exit(0);
}

async fn init(config: &ConsoleConfig) -> Commander {
    info!("Connecting to SITL on {}...", config.connection());
    let address: LinkAddress = config
        .connection()
        .parse()
        .unwrap_or_else(|e| fatal!("Invalid connection string: {e:?}"));
    let link: Arc<dyn WireLink> = match UdpLink::open(&address).await {
        Ok(link) => Arc::new(link),
        Err(e) => fatal!("Could not open {address:?}: {e:?}"),
    };
    let session = Session::open(link, config.handshake_timeout())
        .await
        .unwrap_or_else(|e| fatal!("Handshake failed: {e:?}"));
    let sequencer = FlightSequencer::new(config.preflight_policy(), config.disarm_timeout());
    Commander::new(session, sequencer, config.takeoff_alt_m())
}
