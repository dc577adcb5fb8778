// SPDX-License-Identifier: GPL-3.0-only

//! The capture-and-decision pipeline
//!
//! One event loop consumes everything the collaborators produce: trigger
//! fires, capture completions, and live metadata batches all arrive over a
//! single-consumer channel, so the decision logic runs on one context and
//! needs no locks.
//!
//! A capture cycle is: trigger fire → still capture → suspend session →
//! settle → classify → resume (no face) or stop + cancel + teardown
//! (face found). Cycles are serialized: a fire that lands while a cycle is
//! in flight is dropped, and the next fire starts fresh.

pub mod classify;
pub mod metadata;
pub mod scan;
pub mod still;
pub mod trigger;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::auth::{self, DeviceAuthorizer};
use crate::backends::camera::{DeviceSelector, MetadataObject, StillCapture};
use crate::constants::{CAPTURE_INTERVAL, EVENT_QUEUE_DEPTH};
use crate::errors::{AppResult, CaptureError};
use crate::presenter::Presenter;
use crate::session::{CaptureSessionManager, SessionState};

use classify::{FaceClassifier, FaceObservation};
use metadata::MetadataStreamHandler;
use scan::ScanConfig;
use still::StillCaptureHandler;
use trigger::PeriodicTrigger;

/// Events delivered to the pipeline's event loop
#[derive(Debug)]
pub enum PipelineEvent {
    /// The periodic trigger fired; request one still capture
    TriggerFired,
    /// A still capture completed (or failed)
    PhotoCompleted(Result<StillCapture, CaptureError>),
    /// A batch of live metadata objects was scanned
    MetadataBatch(Vec<MetadataObject>),
    /// External request to wind the pipeline down
    Shutdown,
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Which camera to run against
    pub selector: DeviceSelector,
    /// Cadence of the periodic trigger
    pub capture_interval: std::time::Duration,
    /// Live metadata scanning configuration
    pub scan: ScanConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            selector: DeviceSelector::default(),
            capture_interval: CAPTURE_INTERVAL,
            scan: ScanConfig::default(),
        }
    }
}

/// The still that terminated the capture loop
#[derive(Debug, Clone)]
pub struct CapturedStill {
    pub jpeg: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
}

/// What a pipeline run produced
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    /// Whether camera authorization resolved true
    pub authorized: bool,
    /// The observation that terminated the loop, if any
    pub observation: Option<FaceObservation>,
    /// The terminating still, if any
    pub still: Option<CapturedStill>,
}

/// Handle for requesting shutdown from outside the event loop
#[derive(Clone)]
pub struct PipelineHandle {
    events: mpsc::Sender<PipelineEvent>,
}

impl PipelineHandle {
    /// Ask the pipeline to stop; a no-op once it already has
    pub async fn shutdown(&self) {
        let _ = self.events.send(PipelineEvent::Shutdown).await;
    }
}

/// The capture-and-decision pipeline
pub struct CapturePipeline<A: DeviceAuthorizer, P: Presenter> {
    authorizer: A,
    presenter: P,
    session: CaptureSessionManager,
    classifier: FaceClassifier,
    config: PipelineConfig,
    events_tx: mpsc::Sender<PipelineEvent>,
    events_rx: mpsc::Receiver<PipelineEvent>,
}

impl<A: DeviceAuthorizer, P: Presenter> CapturePipeline<A, P> {
    pub fn new(
        authorizer: A,
        presenter: P,
        session: CaptureSessionManager,
        classifier: FaceClassifier,
        config: PipelineConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        Self {
            authorizer,
            presenter,
            session,
            classifier,
            config,
            events_tx,
            events_rx,
        }
    }

    /// Handle for shutting the pipeline down from another task
    pub fn handle(&self) -> PipelineHandle {
        PipelineHandle {
            events: self.events_tx.clone(),
        }
    }

    /// Observe session state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Run the pipeline to completion
    ///
    /// Resolves when a face terminates the capture loop, when startup is
    /// halted (authorization or session errors, both non-fatal), or when
    /// shutdown is requested.
    pub async fn run(mut self) -> AppResult<PipelineOutcome> {
        let mut outcome = PipelineOutcome::default();

        self.session.begin_authorization();
        if !auth::check_authorization(&mut self.authorizer).await {
            self.session.authorization_denied();
            return Ok(outcome);
        }
        outcome.authorized = true;

        if let Err(e) = self
            .session
            .start(&self.config.selector, &mut self.presenter)
            .await
        {
            error!(error = %e, "Session failed to start");
            return Ok(outcome);
        }

        // The session is running: register the trigger and the scanner
        let trigger = PeriodicTrigger::start(self.config.capture_interval, self.events_tx.clone());
        let scanner = scan::spawn_scanner(
            self.session.backend(),
            self.session.subscribe(),
            self.classifier.detector(),
            self.config.scan.clone(),
            self.events_tx.clone(),
        );

        let mut overlay = MetadataStreamHandler::new(self.presenter.viewport());
        let mut cycle_in_flight = false;

        while let Some(event) = self.events_rx.recv().await {
            match event {
                PipelineEvent::TriggerFired => {
                    if !self.session.is_running() {
                        debug!("Trigger fired while session not running; ignoring");
                        continue;
                    }
                    if cycle_in_flight {
                        debug!("Previous capture cycle still in flight; dropping fire");
                        continue;
                    }
                    cycle_in_flight = true;
                    StillCaptureHandler::request_capture(&self.session, self.events_tx.clone());
                }

                PipelineEvent::PhotoCompleted(Err(e)) => {
                    // Per-cycle failure: skip classification, stay running
                    warn!(error = %e, "Capture failed; cycle skipped");
                    cycle_in_flight = false;
                }

                PipelineEvent::PhotoCompleted(Ok(capture)) => {
                    let image = match StillCaptureHandler::decode_still(&capture) {
                        Ok(image) => image,
                        Err(e) => {
                            warn!(error = %e, "Capture could not be decoded; cycle skipped");
                            cycle_in_flight = false;
                            continue;
                        }
                    };

                    // Classification must not race live frames: suspend, then
                    // wait for the presentation layer to settle
                    self.session.suspend().await;
                    self.presenter.settle().await;

                    // Classification is CPU work; run it on a blocking worker
                    let classifier = self.classifier.clone();
                    let (observation, image) = match tokio::task::spawn_blocking(move || {
                        let observation = classifier.classify(&image);
                        (observation, image)
                    })
                    .await
                    {
                        Ok(result) => result,
                        Err(e) => {
                            warn!(error = %e, "Classification task failed; cycle skipped");
                            if let Err(e) = self.session.resume().await {
                                error!(error = %e, "Failed to resume session");
                                break;
                            }
                            cycle_in_flight = false;
                            continue;
                        }
                    };

                    match observation {
                        None => {
                            debug!("No face in still; resuming capture loop");
                            if let Err(e) = self.session.resume().await {
                                error!(error = %e, "Failed to resume session");
                                break;
                            }
                            cycle_in_flight = false;
                        }
                        Some(face) => {
                            self.presenter.display_still(&image);
                            self.session.stop().await;
                            trigger.cancel();
                            self.presenter.teardown().await;

                            outcome.observation = Some(face);
                            outcome.still = Some(CapturedStill {
                                jpeg: Arc::clone(&capture.jpeg),
                                width: capture.width,
                                height: capture.height,
                            });
                            break;
                        }
                    }
                }

                PipelineEvent::MetadataBatch(batch) => {
                    let rect = overlay.handle_batch(&batch);
                    self.presenter.set_highlight(rect);
                }

                PipelineEvent::Shutdown => {
                    info!("Shutdown requested");
                    trigger.cancel();
                    self.session.stop().await;
                    self.presenter.teardown().await;
                    break;
                }
            }
        }

        scanner.abort();
        Ok(outcome)
    }
}
