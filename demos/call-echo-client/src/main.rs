//! Calls `echo` once against a `call-echo-server` and prints the result.

use clap::Parser;
use ether_call::CallClient;
use ether_data::Value;
use ether_runtime::Channel;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
struct Args {
    #[arg(long, default_value = "ws://127.0.0.1:10000")]
    url: String,
    #[arg(long, default_value = "demo-echo")]
    service: String,
    #[arg(long, default_value = "hello from call-echo-client")]
    message: String,
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

    let client = CallClient::connect(&args.url, channel).await.expect("failed to connect to relay");
    tracing::info!(service = %args.service, %channel, "call-echo-client connected");
    let mut ret = client
        .call(&args.service, "echo", Value::map([("value", Value::str(args.message.clone()))]), false, false)
        .await;

    match ret.capture() {
        Ok(values) => println!("echo replied: {values:?}"),
        Err(e) => eprintln!("echo call failed: {e}"),
    }
}
