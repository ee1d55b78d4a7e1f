use clap::Parser;
use dotenv::dotenv;
use lex_relay::client::{ ClientError, RelayClient, Transcript };
use log::{ error, info };
use std::error::Error;
use std::time::Duration;
use tokio::io::{ AsyncBufReadExt, BufReader };

/// Sends chat turns to a running relay.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct ChatArgs {
    /// Base URL of the relay.
    #[arg(long, env = "RELAY_URL", default_value = "http://127.0.0.1:8787")]
    relay_url: String,

    /// Seconds to wait for a reply before giving up.
    #[arg(long, env = "RELAY_TIMEOUT_SECS", default_value = "20")]
    timeout_secs: u64,

    /// API key expected by the relay, if it requires one.
    #[arg(long, env = "SERVER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Message to send. Without it, lines are read from stdin, one turn each.
    message: Option<String>,
}

fn report(err: &ClientError) {
    match err {
        ClientError::Timeout { .. } => error!("{}", err),
        ClientError::Transport(e) => error!("Could not reach the relay: {}", e),
        ClientError::Status { status, body } => error!("Relay returned {}: {}", status, body),
        other => error!("{}", other),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = ChatArgs::parse();

    let client = RelayClient::builder(args.relay_url.clone())
        .timeout(Duration::from_secs(args.timeout_secs.max(1)))
        .api_key(args.api_key.clone())
        .build()?;
    let mut transcript = Transcript::new();

    if let Some(message) = args.message {
        match client.send_turn(&mut transcript, &message).await {
            Ok(reply) => println!("{}", reply),
            Err(e) => {
                report(&e);
                return Err(e.into());
            }
        }
        return Ok(());
    }

    info!("Connected to {} (empty line or Ctrl-D to quit)", args.relay_url);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            break;
        }
        match client.send_turn(&mut transcript, &line).await {
            Ok(reply) => println!("{}\n", reply),
            Err(e) => report(&e),
        }
    }

    Ok(())
}
