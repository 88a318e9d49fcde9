mod assistant;
mod config;
mod instrumentation;
mod relay;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};

use config::{Config, LogFormat};
use server::AppState;

#[derive(Parser)]
#[command(name = "asim-relay", about = "Asİm support chat relay for the Asan İmza widget")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the chat endpoint and the widget's static files
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Send a single message through the relay and print the reply
    Ask {
        /// The message to send
        message: String,

        /// Continue an existing conversation thread
        #[arg(short, long)]
        thread: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            server::serve(&config).await?;
        }
        Commands::Ask { message, thread } => {
            if message.trim().is_empty() {
                anyhow::bail!("Message must not be empty");
            }
            let missing = config.missing_settings();
            if !missing.is_empty() {
                anyhow::bail!("Missing required settings: {}", missing.join(", "));
            }
            let state = AppState::from_config(&config)?;
            let relay = state
                .relay()
                .ok_or_else(|| anyhow::anyhow!("relay is not configured"))?;

            let outcome = relay
                .handle_turn(&message, thread.map(assistant::ThreadId::from))
                .await?;
            println!("\n{}\n", outcome.reply);
            println!("Thread: {}", outcome.thread_id);
            println!("{}", outcome.log.summary());
        }
    }

    Ok(())
}
