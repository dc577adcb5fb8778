// SPDX-License-Identifier: GPL-3.0-only

//! Capture session lifecycle manager
//!
//! Owns the camera session: device selection, input attachment, output
//! wiring, and the start/suspend/resume/stop transitions. No other
//! component mutates the session; collaborators observe state through a
//! watch channel.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backends::camera::{
    CameraBackend, CameraDevice, DeviceSelector, PixelFormat,
};
use crate::errors::SessionError;
use crate::presenter::Presenter;

/// Lifecycle state of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Created, nothing attached yet
    #[default]
    Idle,
    /// Waiting for the authorization result
    Authorizing,
    /// Device probing and output wiring in progress
    Configuring,
    /// Live frames are being delivered
    Running,
    /// Frame delivery halted (mid-cycle suspension or final stop)
    Stopped,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Authorizing => write!(f, "authorizing"),
            SessionState::Configuring => write!(f, "configuring"),
            SessionState::Running => write!(f, "running"),
            SessionState::Stopped => write!(f, "stopped"),
        }
    }
}

/// A photo output wired into the session
#[derive(Debug, Clone)]
pub struct PhotoOutput {
    /// Whether this output captures at full sensor resolution
    pub high_resolution: bool,
    /// Pixel formats advertised for preview thumbnails
    pub advertised_formats: Vec<PixelFormat>,
}

/// The live metadata output wired into the session
#[derive(Debug, Clone)]
pub struct MetadataOutput {
    /// Scan for machine-readable codes
    pub codes: bool,
    /// Scan for face regions
    pub faces: bool,
}

/// The three outputs wired on session start
#[derive(Debug, Clone)]
pub struct SessionOutputs {
    pub still: PhotoOutput,
    pub high_res: PhotoOutput,
    pub metadata: MetadataOutput,
}

/// Shared handle to the camera backend
pub type SharedBackend = Arc<Mutex<Box<dyn CameraBackend>>>;

/// Owns the camera session lifecycle
pub struct CaptureSessionManager {
    backend: SharedBackend,
    state_tx: watch::Sender<SessionState>,
    device: Option<CameraDevice>,
    outputs: Option<SessionOutputs>,
    released: bool,
}

impl CaptureSessionManager {
    pub fn new(backend: Box<dyn CameraBackend>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            backend: Arc::new(Mutex::new(backend)),
            state_tx,
            device: None,
            outputs: None,
            released: false,
        }
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Observe state transitions without being able to mutate them
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// The outputs wired at start, if the session started
    pub fn outputs(&self) -> Option<&SessionOutputs> {
        self.outputs.as_ref()
    }

    /// The device selected at start
    pub fn device(&self) -> Option<&CameraDevice> {
        self.device.as_ref()
    }

    pub(crate) fn backend(&self) -> SharedBackend {
        Arc::clone(&self.backend)
    }

    /// Mark the session as waiting for the authorization result
    pub fn begin_authorization(&mut self) {
        self.state_tx.send_replace(SessionState::Authorizing);
    }

    /// Record a negative authorization result; startup halts here
    pub fn authorization_denied(&mut self) {
        warn!("Camera authorization denied; session will not start");
        self.state_tx.send_replace(SessionState::Idle);
    }

    /// Start the session: select a device, attach it as input, wire the
    /// still-photo, high-resolution photo, and live metadata outputs, then
    /// begin streaming.
    ///
    /// Device probing and attachment run on a blocking worker so the
    /// interactive context is never blocked; the visual wiring happens back
    /// on the caller's context before streaming begins.
    pub async fn start<P: Presenter>(
        &mut self,
        selector: &DeviceSelector,
        presenter: &mut P,
    ) -> Result<(), SessionError> {
        self.state_tx.send_replace(SessionState::Configuring);

        let backend = Arc::clone(&self.backend);
        let selector = selector.clone();
        let configured = tokio::task::spawn_blocking(move || {
            let mut guard = backend.lock().unwrap();
            let devices = guard.enumerate_cameras();
            let device = selector
                .select(&devices)
                .cloned()
                .ok_or_else(|| match selector.facing {
                    Some(facing) => {
                        SessionError::DeviceUnavailable(format!("no {} camera found", facing))
                    }
                    None => SessionError::DeviceUnavailable("no camera found".to_string()),
                })?;
            guard
                .attach(&device)
                .map_err(|e| SessionError::InputAttach(e.to_string()))?;
            let formats = guard.advertised_preview_formats();
            Ok::<_, SessionError>((device, formats))
        })
        .await
        .map_err(|e| SessionError::InputAttach(format!("configuration task failed: {}", e)))?;

        let (device, formats) = match configured {
            Ok(ok) => ok,
            Err(e) => {
                self.state_tx.send_replace(SessionState::Idle);
                return Err(e);
            }
        };

        // Visual wiring on the presentation context before streaming begins
        presenter.attach_preview(&device);

        self.outputs = Some(SessionOutputs {
            still: PhotoOutput {
                high_resolution: false,
                advertised_formats: formats.clone(),
            },
            high_res: PhotoOutput {
                high_resolution: true,
                advertised_formats: formats,
            },
            metadata: MetadataOutput {
                codes: true,
                faces: true,
            },
        });

        if let Err(e) = self.backend.lock().unwrap().start_streaming() {
            self.state_tx.send_replace(SessionState::Idle);
            return Err(SessionError::InputAttach(format!(
                "failed to start streaming: {}",
                e
            )));
        }

        info!(device = %device.name, "Capture session running");
        self.device = Some(device);
        self.state_tx.send_replace(SessionState::Running);
        Ok(())
    }

    /// Halt frame delivery without releasing anything, so a captured still
    /// can be classified undisturbed by concurrent frames
    pub async fn suspend(&mut self) {
        if self.state() != SessionState::Running {
            return;
        }
        let backend = Arc::clone(&self.backend);
        let _ = tokio::task::spawn_blocking(move || backend.lock().unwrap().stop_streaming()).await;
        self.state_tx.send_replace(SessionState::Stopped);
        debug!("Capture session suspended");
    }

    /// Restart frame delivery after a suspension
    pub async fn resume(&mut self) -> Result<(), SessionError> {
        if self.released {
            return Err(SessionError::NotRunning);
        }
        if self.state() == SessionState::Running {
            return Ok(());
        }
        let backend = Arc::clone(&self.backend);
        let started =
            tokio::task::spawn_blocking(move || backend.lock().unwrap().start_streaming())
                .await
                .map_err(|e| SessionError::InputAttach(format!("resume task failed: {}", e)))?;
        started.map_err(|e| SessionError::InputAttach(e.to_string()))?;
        self.state_tx.send_replace(SessionState::Running);
        debug!("Capture session resumed");
        Ok(())
    }

    /// Stop the session and release the device
    ///
    /// Idempotent: stopping an already-stopped session is a no-op.
    pub async fn stop(&mut self) {
        if self.released {
            debug!("Capture session already stopped");
            return;
        }
        let backend = Arc::clone(&self.backend);
        let _ = tokio::task::spawn_blocking(move || {
            let mut guard = backend.lock().unwrap();
            guard.stop_streaming();
            guard.detach();
        })
        .await;
        self.released = true;
        self.state_tx.send_replace(SessionState::Stopped);
        info!("Capture session stopped");
    }
}
