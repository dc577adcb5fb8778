// SPDX-License-Identifier: GPL-3.0-only

//! Camera device authorization
//!
//! Resolves whether the process may use the camera before the session is
//! configured. The result is delivered asynchronously exactly once; a
//! negative result halts pipeline startup but is never fatal to the
//! process.

use std::future::Future;
use std::io::Write;

use tracing::{debug, warn};

/// Authorization state of camera access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    /// Access has previously been granted
    Authorized,
    /// The user has not been asked yet
    NotDetermined,
    /// The user has previously declined access
    Denied,
    /// Access is blocked by system policy
    Restricted,
}

/// Resolves camera authorization for the process
pub trait DeviceAuthorizer: Send {
    /// Current authorization state, without prompting
    fn status(&self) -> AuthorizationStatus;

    /// Prompt for access; called only when the state is `NotDetermined`
    fn request_access(&mut self) -> impl Future<Output = bool> + Send;
}

/// Resolve authorization, prompting at most once
///
/// The result is delivered exactly once per call; there are no retries.
pub async fn check_authorization(authorizer: &mut impl DeviceAuthorizer) -> bool {
    match authorizer.status() {
        AuthorizationStatus::Authorized => true,
        AuthorizationStatus::NotDetermined => authorizer.request_access().await,
        AuthorizationStatus::Denied | AuthorizationStatus::Restricted => false,
    }
}

/// Authorizer backed by device-node access checks and a console prompt
///
/// Opening the device node read-only answers the question the platform
/// would otherwise answer for us: a permission error means access was
/// denied to this process, any other failure is treated as restricted.
/// When no device node exists yet there is nothing to probe, so the
/// operator is asked once.
pub struct ConsoleAuthorizer {
    device_path: String,
}

impl ConsoleAuthorizer {
    pub fn new(device_path: impl Into<String>) -> Self {
        Self {
            device_path: device_path.into(),
        }
    }
}

impl Default for ConsoleAuthorizer {
    fn default() -> Self {
        Self::new("/dev/video0")
    }
}

impl DeviceAuthorizer for ConsoleAuthorizer {
    fn status(&self) -> AuthorizationStatus {
        match std::fs::File::open(&self.device_path) {
            Ok(_) => AuthorizationStatus::Authorized,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                warn!(path = %self.device_path, "Camera device not readable by this process");
                AuthorizationStatus::Denied
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.device_path, "No camera device node present");
                AuthorizationStatus::NotDetermined
            }
            Err(e) => {
                warn!(path = %self.device_path, error = %e, "Camera device probe failed");
                AuthorizationStatus::Restricted
            }
        }
    }

    fn request_access(&mut self) -> impl Future<Output = bool> + Send {
        async {
            // Blocking stdin read runs off the async worker threads
            tokio::task::spawn_blocking(|| {
                print!("No camera device was found. Continue anyway? [y/N] ");
                let _ = std::io::stdout().flush();
                let mut answer = String::new();
                if std::io::stdin().read_line(&mut answer).is_err() {
                    return false;
                }
                matches!(answer.trim(), "y" | "Y" | "yes")
            })
            .await
            .unwrap_or(false)
        }
    }
}

/// Authorizer with a fixed outcome, for scripted runs and tests
pub struct StaticAuthorizer {
    status: AuthorizationStatus,
    grant_on_request: bool,
}

impl StaticAuthorizer {
    /// Always authorized
    pub fn granted() -> Self {
        Self {
            status: AuthorizationStatus::Authorized,
            grant_on_request: true,
        }
    }

    /// Always denied
    pub fn denied() -> Self {
        Self {
            status: AuthorizationStatus::Denied,
            grant_on_request: false,
        }
    }

    /// Undetermined, resolving to `grant` when prompted
    pub fn undetermined(grant: bool) -> Self {
        Self {
            status: AuthorizationStatus::NotDetermined,
            grant_on_request: grant,
        }
    }
}

impl DeviceAuthorizer for StaticAuthorizer {
    fn status(&self) -> AuthorizationStatus {
        self.status
    }

    fn request_access(&mut self) -> impl Future<Output = bool> + Send {
        std::future::ready(self.grant_on_request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_authorized_resolves_true() {
        let mut auth = StaticAuthorizer::granted();
        assert!(check_authorization(&mut auth).await);
    }

    #[tokio::test]
    async fn test_denied_and_restricted_resolve_false() {
        let mut auth = StaticAuthorizer::denied();
        assert!(!check_authorization(&mut auth).await);

        let mut auth = StaticAuthorizer {
            status: AuthorizationStatus::Restricted,
            grant_on_request: true,
        };
        assert!(!check_authorization(&mut auth).await);
    }

    #[tokio::test]
    async fn test_undetermined_follows_user_choice() {
        let mut auth = StaticAuthorizer::undetermined(true);
        assert!(check_authorization(&mut auth).await);

        let mut auth = StaticAuthorizer::undetermined(false);
        assert!(!check_authorization(&mut auth).await);
    }
}
