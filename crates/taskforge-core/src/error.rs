//! Unified error taxonomy for the task-dispatch engine.
//!
//! Every subsystem (managers, processors, workers, the scheduler) surfaces
//! errors through [`TaskforgeError`], mirroring how a single `thiserror` enum
//! per crate carries enough context for callers without inspecting opaque
//! strings.

/// Unified error type for the taskforge engine.
#[derive(Debug, thiserror::Error)]
pub enum TaskforgeError {
    // -- Submit-side validation ----------------------------------------------
    /// A submission argument (priority, attempts, cron expression, ...) was
    /// out of range or otherwise malformed.
    #[error("invalid argument: {reason}")]
    ArgumentInvalid {
        /// Human-readable reason.
        reason: String,
    },

    /// A name/slot that must be unique was registered twice.
    #[error("already registered: {name}")]
    AlreadyRegistered {
        /// The name or key that collided.
        name: String,
    },

    /// A manager or processor was constructed with an unsupported
    /// combination of options (e.g. `maxSimultaneous > 1` with `Reuse`).
    #[error("configuration error: {reason}")]
    ConfigurationError {
        /// Human-readable reason.
        reason: String,
    },

    // -- Execution-side -------------------------------------------------------
    /// `attemptsRemaining` reached zero before the task ever succeeded.
    #[error("no attempts left")]
    NoAttemptsLeft,

    /// The submission was canceled by the caller (inner cancellation).
    #[error("canceled by caller")]
    CanceledByCaller,

    /// The in-flight execution was aborted by worker shutdown (outer
    /// cancellation); the attempt has been credited back to the wrapper.
    #[error("canceled by shutdown")]
    CanceledByShutdown,

    /// The user-supplied task body returned or threw an error.
    #[error("task failed: {reason}")]
    TaskFailure {
        /// Human-readable reason.
        reason: String,
        /// Optional underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A `StartStoppable` argument failed to activate; the task that needed
    /// it was reverted without consuming an attempt.
    #[error("resource activation failed: {reason}")]
    ResourceActivationError {
        /// Human-readable reason.
        reason: String,
    },
}

impl TaskforgeError {
    /// Build a [`TaskforgeError::TaskFailure`] from a plain message.
    pub fn task_failure(reason: impl Into<String>) -> Self {
        Self::TaskFailure {
            reason: reason.into(),
            source: None,
        }
    }

    /// Build a [`TaskforgeError::TaskFailure`] wrapping a source error.
    pub fn task_failure_from(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::TaskFailure {
            reason: reason.into(),
            source: Some(source),
        }
    }

    /// True for the two cancellation variants.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        matches!(
            self,
            Self::CanceledByCaller | Self::CanceledByShutdown
        )
    }
}

/// Convenience alias used throughout the taskforge workspace.
pub type Result<T> = std::result::Result<T, TaskforgeError>;
