//! The configuration options table from `SPEC_FULL.md` §6: `max_attempts`,
//! `max_priority`, `max_simultaneous`, `reuse_strategy`, validated before a
//! pipeline is built rather than discovered later at submit time.

use taskforge_core::{Result, TaskforgeError};

/// Which argument-lifecycle family a pipeline's processor uses. Named after
/// the eight policies in `SPEC_FULL.md` §4.3, collapsed to the four
/// families that actually vary by `max_simultaneous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReuseStrategy {
    /// No shared argument; `()` is passed to every task.
    Null,
    /// A plain, cloned-per-task argument with no activation lifecycle.
    Static,
    /// A pooled, lazily built `StartStoppable` argument torn down on idle.
    Reusable,
    /// A freshly built-and-torn-down `StartStoppable` argument per task.
    OneTime,
}

/// Declarative settings for one pipeline (manager + processor + worker).
///
/// `max_simultaneous == 1` selects the `Single*` processor shape (one
/// slot, no pool bookkeeping); any larger value selects the pooled
/// `Multiple*` shape. Both are legal for every [`ReuseStrategy`], per the
/// Open Question resolution recorded in `DESIGN.md` permitting
/// `MultipleReusable`/`MultipleOneTime` pools.
#[derive(Debug, Clone, Copy)]
pub struct ConfigOptions {
    /// Default attempts for a submission that doesn't override it.
    pub max_attempts: u32,
    /// `Some(n)` for a priority-partitioned manager with lanes `0..=n`;
    /// `None` for a single-lane FIFO.
    pub max_priority: Option<u8>,
    /// Processor pool size; `1` selects the `Single*` shape.
    pub max_simultaneous: u32,
    /// Which argument-lifecycle family the processor uses.
    pub reuse_strategy: ReuseStrategy,
}

impl ConfigOptions {
    /// Defaults: one attempt, no priority lanes, a single slot, no shared
    /// argument.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_attempts: 1,
            max_priority: None,
            max_simultaneous: 1,
            reuse_strategy: ReuseStrategy::Null,
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_max_priority(mut self, max_priority: u8) -> Self {
        self.max_priority = Some(max_priority);
        self
    }

    #[must_use]
    pub fn with_max_simultaneous(mut self, max_simultaneous: u32) -> Self {
        self.max_simultaneous = max_simultaneous;
        self
    }

    #[must_use]
    pub fn with_reuse_strategy(mut self, reuse_strategy: ReuseStrategy) -> Self {
        self.reuse_strategy = reuse_strategy;
        self
    }

    /// Reject configurations no pipeline can legally run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(TaskforgeError::ConfigurationError {
                reason: "max_attempts must be at least 1".to_string(),
            });
        }
        if self.max_simultaneous == 0 {
            return Err(TaskforgeError::ConfigurationError {
                reason: "max_simultaneous must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(ConfigOptions::new().validate().is_ok());
    }

    #[test]
    fn zero_max_attempts_is_rejected() {
        let options = ConfigOptions::new().with_max_attempts(0);
        assert!(matches!(
            options.validate(),
            Err(TaskforgeError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn zero_max_simultaneous_is_rejected() {
        let options = ConfigOptions::new().with_max_simultaneous(0);
        assert!(matches!(
            options.validate(),
            Err(TaskforgeError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn builder_methods_compose() {
        let options = ConfigOptions::new()
            .with_max_attempts(3)
            .with_max_priority(4)
            .with_max_simultaneous(2)
            .with_reuse_strategy(ReuseStrategy::Reusable);
        assert_eq!(options.max_attempts, 3);
        assert_eq!(options.max_priority, Some(4));
        assert_eq!(options.max_simultaneous, 2);
        assert_eq!(options.reuse_strategy, ReuseStrategy::Reusable);
        assert!(options.validate().is_ok());
    }
}
