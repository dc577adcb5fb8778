// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "autoshot")]
#[command(about = "Automatic portrait capture with live QR and face detection")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the capture pipeline until a face is found
    Run {
        /// Camera index to use (from 'autoshot list')
        #[arg(short, long)]
        camera: Option<usize>,

        /// Seconds between capture attempts
        #[arg(short, long)]
        interval: Option<f64>,

        /// Serve frames from a directory of images instead of a camera
        #[arg(long)]
        source: Option<PathBuf>,

        /// Upload the captured portrait to the configured endpoint
        #[arg(long)]
        upload: bool,
    },

    /// List available cameras
    List,

    /// Upload an image (the bundled sample when no file is given)
    Upload {
        /// Image file to upload
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Upload endpoint, overriding the configured one
        #[arg(short, long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=autoshot=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            camera,
            interval,
            source,
            upload,
        }) => {
            cli::run(cli::RunArgs {
                camera,
                interval,
                source,
                upload,
            })
            .await
        }
        Some(Commands::List) => cli::list_cameras(),
        Some(Commands::Upload { file, url }) => cli::upload_image(file, url).await,
        None => cli::run(cli::RunArgs::default()).await,
    }
}
