//! Binary entrypoint for the Remora client.

use std::process;

#[tokio::main]
async fn main() {
    process::exit(remora_app::run().await);
}
