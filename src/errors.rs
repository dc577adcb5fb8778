// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture pipeline

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera authorization errors
    Auth(AuthError),
    /// Session lifecycle errors
    Session(SessionError),
    /// Still capture errors
    Capture(CaptureError),
    /// Upload errors
    Upload(UploadError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Authorization errors
#[derive(Debug, Clone)]
pub enum AuthError {
    /// The user declined camera access
    Denied,
    /// Access is restricted by system policy
    Restricted,
}

/// Session lifecycle errors
#[derive(Debug, Clone)]
pub enum SessionError {
    /// No camera device matched the requested facing/type
    DeviceUnavailable(String),
    /// The device could not be attached as a session input
    InputAttach(String),
    /// An operation required a running session
    NotRunning,
}

/// Still capture errors
///
/// All of these are per-cycle: the cycle is skipped and the next
/// scheduled trigger fire tries again naturally.
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// Capture was requested without an active photo output
    NoPhotoOutput,
    /// The backend completed without producing a sample buffer
    NoSampleBuffer,
    /// The backend reported an error during capture
    Backend(String),
    /// The completed sample could not be decoded into an image
    Decode(String),
}

/// Upload errors
#[derive(Debug, Clone)]
pub enum UploadError {
    /// Transport-level failure (connection, TLS, timeout)
    Transport(String),
    /// The request body or response payload could not be encoded/decoded
    Encoding(String),
    /// The server answered with a non-success status
    Status(u16),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Auth(e) => write!(f, "Authorization error: {}", e),
            AppError::Session(e) => write!(f, "Session error: {}", e),
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Upload(e) => write!(f, "Upload error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Denied => write!(f, "Camera access denied"),
            AuthError::Restricted => write!(f, "Camera access restricted"),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::DeviceUnavailable(msg) => write!(f, "Device unavailable: {}", msg),
            SessionError::InputAttach(msg) => write!(f, "Input attach failed: {}", msg),
            SessionError::NotRunning => write!(f, "Session is not running"),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NoPhotoOutput => write!(f, "No active photo output"),
            CaptureError::NoSampleBuffer => write!(f, "No sample buffer produced"),
            CaptureError::Backend(msg) => write!(f, "Backend capture failed: {}", msg),
            CaptureError::Decode(msg) => write!(f, "Sample decode failed: {}", msg),
        }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::Transport(msg) => write!(f, "Transport failure: {}", msg),
            UploadError::Encoding(msg) => write!(f, "Encoding failure: {}", msg),
            UploadError::Status(code) => write!(f, "Server returned status {}", code),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for AuthError {}
impl std::error::Error for SessionError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for UploadError {}

// Conversions from sub-errors to AppError
impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        AppError::Upload(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

// Conversions for I/O errors
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}
