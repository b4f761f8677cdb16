//! Back-office header actions.
//!
//! Identity lookup, cache clearing with toast feedback, and logout, all
//! driven through an [`AdminApi`] so the transport can be swapped in tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub const TOAST_DURATION: Duration = Duration::from_secs(3);
pub const LOGOUT_TIMEOUT: Duration = Duration::from_secs(5);
pub const LOGIN_PATH: &str = "/login";

const FALLBACK_DISPLAY_NAME: &str = "Admin";
const CLEARED_MESSAGE: &str = "Cache cleared successfully.";
const REJECTED_MESSAGE: &str = "Failed to clear cache. Please try again.";
const TRANSPORT_MESSAGE: &str = "Something went wrong while clearing the cache.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminIdentity {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl AdminIdentity {
    /// Name, else the local part of the e-mail, else `"Admin"`. Empty values are skipped.
    pub fn display_name(&self) -> String {
        display_name(Some(self))
    }
}

pub fn display_name(identity: Option<&AdminIdentity>) -> String {
    let Some(identity) = identity else {
        return FALLBACK_DISPLAY_NAME.to_string();
    };

    identity
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .or_else(|| {
            identity
                .email
                .as_deref()
                .and_then(|email| email.split('@').next())
                .filter(|local| !local.is_empty())
        })
        .unwrap_or(FALLBACK_DISPLAY_NAME)
        .to_string()
}

#[derive(Debug, Error)]
pub enum AdminApiError {
    #[error("admin api request failed: {0}")]
    Transport(String),
    #[error("admin api returned status {0}")]
    Status(u16),
    #[error("admin api response could not be decoded: {0}")]
    Decode(String),
}

/// Result of asking the server to clear the calendar cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared,
    Rejected { status: u16 },
}

#[async_trait]
pub trait AdminApi: Send + Sync {
    /// `Ok(None)` when the server answers without a signed-in admin.
    async fn me(&self) -> Result<Option<AdminIdentity>, AdminApiError>;

    async fn clear_calendar_cache(&self) -> Result<ClearOutcome, AdminApiError>;

    async fn logout(&self) -> Result<(), AdminApiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: &'static str,
    pub duration: Duration,
}

impl Toast {
    fn success(message: &'static str) -> Self {
        Self {
            kind: ToastKind::Success,
            message,
            duration: TOAST_DURATION,
        }
    }

    fn error(message: &'static str) -> Self {
        Self {
            kind: ToastKind::Error,
            message,
            duration: TOAST_DURATION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutOutcome {
    Completed,
    Failed(String),
    TimedOut,
}

/// Navigation target plus a handle on the still-running logout request.
pub struct Logout {
    pub redirect: &'static str,
    pub completion: JoinHandle<LogoutOutcome>,
}

pub struct AdminConsole {
    api: Arc<dyn AdminApi>,
    clearing: AtomicBool,
}

struct ClearingGuard<'a>(&'a AtomicBool);

impl Drop for ClearingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AdminConsole {
    pub fn new(api: Arc<dyn AdminApi>) -> Self {
        Self {
            api,
            clearing: AtomicBool::new(false),
        }
    }

    /// Any failure is logged and reported as "no user".
    pub async fn load_identity(&self) -> Option<AdminIdentity> {
        match self.api.me().await {
            Ok(identity) => identity,
            Err(err) => {
                warn!(error = %err, "Failed to load admin identity");
                None
            }
        }
    }

    pub fn is_clearing(&self) -> bool {
        self.clearing.load(Ordering::Acquire)
    }

    /// Ask the server to clear the calendar cache.
    ///
    /// Returns `None` without calling the server while another clear is in flight.
    pub async fn clear_cache(&self) -> Option<Toast> {
        if self
            .clearing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        let _guard = ClearingGuard(&self.clearing);

        let toast = match self.api.clear_calendar_cache().await {
            Ok(ClearOutcome::Cleared) => Toast::success(CLEARED_MESSAGE),
            Ok(ClearOutcome::Rejected { status }) => {
                warn!(status, "Calendar cache clear rejected");
                Toast::error(REJECTED_MESSAGE)
            }
            Err(err) => {
                error!(error = %err, "Calendar cache clear failed");
                Toast::error(TRANSPORT_MESSAGE)
            }
        };
        Some(toast)
    }

    /// Start the logout request and return immediately.
    ///
    /// The redirect is always [`LOGIN_PATH`]; the request outcome only shows
    /// up in the completion handle and the logs. Must be called from within a
    /// Tokio runtime.
    pub fn logout(&self) -> Logout {
        let api = Arc::clone(&self.api);
        let completion = tokio::spawn(async move {
            let outcome = match tokio::time::timeout(LOGOUT_TIMEOUT, api.logout()).await {
                Ok(Ok(())) => LogoutOutcome::Completed,
                Ok(Err(err)) => LogoutOutcome::Failed(err.to_string()),
                Err(_) => LogoutOutcome::TimedOut,
            };
            match &outcome {
                LogoutOutcome::Completed => info!("Logout request completed"),
                LogoutOutcome::Failed(message) => warn!(error = %message, "Logout request failed"),
                LogoutOutcome::TimedOut => warn!("Logout request timed out"),
            }
            outcome
        });

        Logout {
            redirect: LOGIN_PATH,
            completion,
        }
    }
}
