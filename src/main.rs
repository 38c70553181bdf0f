use std::io::BufRead;

use g2p_studio::{
    config::StudioConfig,
    console::{
        parse_command,
        ConsoleView,
        HELP,
    },
    languages::LanguageMetadataClient,
    protocol::spawn_transport,
    session::{
        StudioSession,
        UiCommand,
    },
};
use tokio::sync::mpsc::{
    self,
    UnboundedSender,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

// Stdin is read on a plain thread so a pending read never holds up shutdown.
fn read_commands(commands: UnboundedSender<UiCommand>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Ok(command) => {
                    if commands.send(command).is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("! {}\n{}", e, HELP),
            }
        }
        let _ = commands.send(UiCommand::Quit);
    });
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = StudioConfig::load();

    let metadata = match LanguageMetadataClient::new(&config.api_base) {
        Ok(metadata) => metadata,
        Err(e) => {
            error!("Failed to create metadata client: {}", e);
            return;
        }
    };

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (outbound, _transport) = spawn_transport(config.server_url.clone(), events_tx);

    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let session = StudioSession::new(config, outbound, Box::new(ConsoleView));

    println!("{}", HELP);
    read_commands(commands_tx);

    session.run(metadata, commands_rx, events_rx).await;
}
