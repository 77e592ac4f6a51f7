//! Registers a single `echo` function and serves it forever. Run alongside
//! `call-echo-client` against a `repeater` instance to see a round-trip
//! Call.

use clap::Parser;
use ether_call::CallServer;
use ether_data::Value;
use ether_runtime::Channel;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
struct Args {
    #[arg(long, default_value = "ws://127.0.0.1:10000")]
    url: String,
    #[arg(long, default_value = "demo-echo")]
    service: String,
    #[arg(long)]
    channel: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new("info")).init();

    let args = Args::parse();
    let channel = match args.channel {
        Some(hex) => Channel::from_hex(&hex).expect("--channel must be 32 lowercase hex characters"),
        None => Channel::BRIDGE,
    };

    let server = CallServer::connect(&args.url, channel, &args.service).await.expect("failed to connect to relay");
    server.register("echo", |args| Ok(vec![args.get("value").cloned().unwrap_or(Value::Null)]));
    tracing::info!(service = %args.service, %channel, "call-echo-server ready");

    server.start().await.expect("server task panicked");
}
