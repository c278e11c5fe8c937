//! Relay CLI entry point.

use opentsdb_relay::cli::{self, Cli};
use opentsdb_relay::core::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    // Execute the relay
    cli::execute(cli).await
}
