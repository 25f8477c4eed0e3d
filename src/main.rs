use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "table-extractor-rust",
    version,
    about = "Extract table rows from document images"
)]
struct Cli {
    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve POST /extract_text_from_image
    Serve {
        /// Listen address (default: server.addr from settings)
        #[arg(short = 'a', long = "addr")]
        addr: Option<String>,
    },
    /// Extract tables from one image and print the JSON response
    Extract {
        /// PNG or JPEG page image
        image: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    table_extractor_rust::logging::init(cli.verbose)?;
    let settings_path = cli.read_settings.as_deref();

    match cli.command {
        Commands::Serve { addr } => serve(settings_path, addr).await,
        Commands::Extract { image } => {
            let output = table_extractor_rust::extract_file(&image, settings_path).await?;
            println!("{}", output);
            Ok(())
        }
    }
}

async fn serve(settings_path: Option<&Path>, addr: Option<String>) -> Result<()> {
    let settings = table_extractor_rust::settings::load_settings(settings_path)?;
    let addr = addr.unwrap_or_else(|| settings.server_addr.clone());
    table_extractor_rust::server::run_server(settings, addr).await
}
