use anyhow::Result;
use clap::Parser;

use devassist::{
    cli::{handle_command, Cli},
    utils::init_logger,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Logs go to stderr so JSON reports on stdout stay clean
    init_logger(cli.verbose);

    let passed = handle_command(&cli).await?;
    if !passed {
        std::process::exit(1);
    }
    Ok(())
}
