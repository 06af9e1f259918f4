use clap::Parser;
use log::{error, info};
use server::config::{BroadcastMode, ServerConfig};
use server::network::Server;
use shared::{BROADCAST_EVERY, DEFAULT_PORT};
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Ticks between state broadcasts
    #[arg(short, long, default_value_t = BROADCAST_EVERY)]
    broadcast_every: u32,

    /// What to send on broadcast ticks
    #[arg(short, long, value_enum, default_value_t = BroadcastMode::State)]
    mode: BroadcastMode,

    /// How long a new client may take to send its hello
    #[arg(long, default_value = "500")]
    hello_timeout_ms: u64,

    /// Upper bound for reading or writing a single frame
    #[arg(long, default_value = "250")]
    frame_timeout_ms: u64,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            broadcast_every: args.broadcast_every,
            mode: args.mode,
            hello_timeout_ms: args.hello_timeout_ms,
            frame_timeout_ms: args.frame_timeout_ms,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig::from(args);

    info!("Starting server...");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down gracefully...");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                // Dropping the sender would stop the server.
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    });

    let mut server = Server::bind(config, shutdown_rx).await?;
    server.run().await?;
    info!("Match ended after {} ticks", server.simulation().tick);

    Ok(())
}
