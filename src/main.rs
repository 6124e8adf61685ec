//! otlp2dd CLI entry point.

use otlp2dd_lib::cli::{self, Cli};
use otlp2dd_lib::core::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    // Execute the command
    cli::execute(cli).await
}
