//! User-facing notifications. The library only classifies outcomes; how they
//! are presented is up to the [`Notifier`].

use crate::error::ZiptreeError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(severity: Severity, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            message: message.into(),
        }
    }
}

pub trait Notifier {
    fn notify(&self, notification: &Notification);
    /// Asks the user to accept or refuse a warning. Declines unless overridden.
    fn confirm(&self, warning: &Notification) -> bool {
        self.notify(warning);
        false
    }
}

/// Drops notifications and accepts every confirmation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Notifier for Silent {
    fn notify(&self, _notification: &Notification) {}
    fn confirm(&self, _warning: &Notification) -> bool {
        true
    }
}

/// Soft limit crossed by the aggregate size of a batch. Not an error: the user
/// decides whether to go on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OversizeWarning {
    pub total_bytes: u64,
    pub threshold: u64,
}

impl OversizeWarning {
    pub fn notification(&self) -> Notification {
        let gib = |bytes: u64| bytes as f64 / (1024.0 * 1024.0 * 1024.0);
        Notification::new(
            Severity::Warning,
            "Input is very large",
            format!(
                "The selected inputs add up to {:.1} GiB (more than {:.0} GiB) and may make the session unstable. Continue anyway?",
                gib(self.total_bytes),
                gib(self.threshold)
            ),
        )
    }
}

impl ZiptreeError {
    /// The single notification shown when this error ends an operation on `subject`.
    pub fn notification(&self, subject: &str) -> Notification {
        let title = match self {
            ZiptreeError::EmptyInput { .. } | ZiptreeError::EmptyArchive { .. } => {
                format!("Nothing to show in {subject}")
            }
            ZiptreeError::CorruptArchive { .. } => format!("Could not process {subject}"),
            ZiptreeError::PayloadRead { .. } => format!("Could not open {subject}"),
            ZiptreeError::Cancelled => "Cancelled".to_string(),
            ZiptreeError::NothingSelected => "Nothing selected".to_string(),
            ZiptreeError::Export(_) => "Could not generate the ZIP".to_string(),
            _ => format!("Error in {subject}"),
        };
        let severity = match self {
            ZiptreeError::Cancelled | ZiptreeError::NothingSelected => Severity::Info,
            _ => Severity::Error,
        };
        let message = match self {
            ZiptreeError::CorruptArchive { .. } => {
                format!("{self}. The file may be corrupted or too large.")
            }
            ZiptreeError::PayloadRead { .. } => {
                format!("{self}. The file may be corrupted.")
            }
            _ => self.to_string(),
        };
        Notification::new(severity, title, message)
    }
}
