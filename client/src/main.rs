use clap::Parser;
use client::game::Snapshot;
use client::input::{InputMode, InputSource};
use client::network::Client;
use client::rendering::ConsoleRenderer;
use log::info;
use shared::DEFAULT_PORT;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host to connect to
    #[arg(default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Name announced to the server
    #[arg(short, long, default_value = "Player")]
    name: String,

    /// Where button presses come from
    #[arg(short, long, value_enum, default_value_t = InputMode::Bot)]
    input: InputMode,

    /// Disconnect after this many seconds (runs until the server closes when absent)
    #[arg(short, long)]
    duration_secs: Option<u64>,

    /// Milliseconds between console frames
    #[arg(long, default_value = "500")]
    render_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);

    info!("Starting client...");
    info!("Connecting to: {}", address);

    let snapshot = Snapshot::new();
    let client = Client::connect(
        &address,
        &args.name,
        InputSource::new(args.input),
        snapshot.clone(),
    )
    .await?;

    let mut renderer = ConsoleRenderer::start(snapshot, Duration::from_millis(args.render_ms));
    let result = client.run(args.duration_secs.map(Duration::from_secs)).await;
    renderer.stop();

    result
}
