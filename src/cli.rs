// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for the capture pipeline
//!
//! This module provides command-line functionality for:
//! - Running the capture-and-decision pipeline
//! - Listing available cameras
//! - Manually uploading an image

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use autoshot::auth::{ConsoleAuthorizer, DeviceAuthorizer, StaticAuthorizer};
use autoshot::backends::camera::{get_backend_for_type, CameraBackend, DeviceSelector};
use autoshot::backends::camera::synthetic::SyntheticBackend;
use autoshot::config::Config;
use autoshot::pipeline::classify::{FaceClassifier, SkinToneDetector};
use autoshot::pipeline::scan::ScanConfig;
use autoshot::pipeline::{CapturePipeline, PipelineConfig};
use autoshot::presenter::ConsolePresenter;
use autoshot::session::CaptureSessionManager;
use autoshot::storage;
use autoshot::upload::Uploader;

/// Options for the `run` command
#[derive(Debug, Default)]
pub struct RunArgs {
    /// Camera index override
    pub camera: Option<usize>,
    /// Trigger interval override in seconds
    pub interval: Option<f64>,
    /// Serve frames from a directory of images instead of hardware
    pub source: Option<PathBuf>,
    /// Upload the terminating still when an endpoint is configured
    pub upload: bool,
}

/// Run the capture pipeline until a face terminates it
pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();

    let pipeline_config = PipelineConfig {
        selector: DeviceSelector {
            index: args.camera.or(config.camera_index),
            facing: config.facing,
        },
        capture_interval: args
            .interval
            .map(|secs| std::time::Duration::from_secs_f64(secs.max(0.1)))
            .unwrap_or_else(|| config.capture_interval()),
        scan: ScanConfig {
            cadence: config.scan_interval(),
            ..ScanConfig::default()
        },
    };

    // A frame directory bypasses hardware and authorization prompts
    match &args.source {
        Some(dir) => {
            let backend = SyntheticBackend::from_dir(dir)?;
            drive(
                StaticAuthorizer::granted(),
                Box::new(backend),
                pipeline_config,
                &config,
                &args,
            )
            .await
        }
        None => {
            let backend = get_backend_for_type(config.backend);
            drive(
                ConsoleAuthorizer::default(),
                backend,
                pipeline_config,
                &config,
                &args,
            )
            .await
        }
    }
}

async fn drive<A: DeviceAuthorizer + 'static>(
    authorizer: A,
    backend: Box<dyn CameraBackend>,
    pipeline_config: PipelineConfig,
    config: &Config,
    args: &RunArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = CaptureSessionManager::new(backend);
    let classifier = FaceClassifier::new(Arc::new(SkinToneDetector::default()));
    let presenter = ConsolePresenter::default();

    let pipeline = CapturePipeline::new(authorizer, presenter, session, classifier, pipeline_config);

    // Ctrl-C winds the pipeline down gracefully
    let handle = pipeline.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.shutdown().await;
        }
    });

    let outcome = pipeline.run().await?;

    if !outcome.authorized {
        println!("Permission to use the camera was denied.");
        return Ok(());
    }

    let Some(still) = outcome.still else {
        println!("No portrait was captured.");
        return Ok(());
    };

    if let Some(face) = &outcome.observation {
        println!(
            "Captured a portrait ({}x{}, smiling: {})",
            still.width, still.height, face.has_smile
        );
    }

    let dir = config
        .output_dir
        .clone()
        .unwrap_or_else(storage::default_picture_dir);
    let path = storage::save_still(&still.jpeg, &dir).await?;
    println!("Saved to {}", path.display());

    // Upload outcome is logged only; failures never fail the run
    if args.upload {
        match &config.upload_url {
            Some(url) => {
                let uploader = Uploader::new(url).with_field(config.upload_field.clone());
                match uploader.upload_file(&path).await {
                    Ok(response) => info!(response = %response, "Upload complete"),
                    Err(e) => error!(error = %e, "Upload failed"),
                }
            }
            None => error!("No upload endpoint configured; skipping upload"),
        }
    }

    Ok(())
}

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let backend = get_backend_for_type(config.backend);
    let cameras = backend.enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for camera in &cameras {
        println!("  [{}] {} ({})", camera.index, camera.name, camera.facing);
        if let Some(info) = &camera.info {
            println!("      Driver: {}  Path: {}", info.driver, info.path);
        }
    }

    Ok(())
}

/// Manually upload an image, independent of the capture pipeline
///
/// Without a file argument the bundled sample image is shipped.
pub async fn upload_image(
    file: Option<PathBuf>,
    url: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let Some(url) = url.or(config.upload_url) else {
        eprintln!("No upload endpoint configured. Pass --url or set upload_url in the config.");
        return Ok(());
    };

    let uploader = Uploader::new(url).with_field(config.upload_field);
    let result = match &file {
        Some(path) => uploader.upload_file(path).await,
        None => uploader.upload_sample().await,
    };

    match result {
        Ok(response) => info!(response = %response, "Upload complete"),
        Err(e) => error!(error = %e, "Upload failed"),
    }

    Ok(())
}
