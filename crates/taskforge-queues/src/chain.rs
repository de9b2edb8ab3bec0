//! Conveyor chaining (`SPEC_FULL.md` §4.6): compose `C1: D -> I`, `C2: I ->
//! R` into one aggregated [`ConveyorMachine<D, R>`]. Longer chains nest:
//! `Chain2<Chain2<C1, C2>, C3>` for a three-stage pipeline, built with
//! [`chain2`].

use taskforge_core::{CancellationToken, ConveyorMachine, Result, TaskforgeError};

/// Two conveyor stages glued into one `D -> R` machine.
pub struct Chain2<C1, C2> {
    first: C1,
    second: C2,
}

impl<C1, C2> Chain2<C1, C2> {
    /// Chain `first` into `second`.
    pub fn new(first: C1, second: C2) -> Self {
        Self { first, second }
    }
}

/// Convenience constructor mirroring [`Chain2::new`].
pub fn chain2<C1, C2>(first: C1, second: C2) -> Chain2<C1, C2> {
    Chain2::new(first, second)
}

#[async_trait::async_trait]
impl<D, I, R, C1, C2> ConveyorMachine<D, R> for Chain2<C1, C2>
where
    D: Send + 'static,
    I: Send + 'static,
    R: Send + 'static,
    C1: ConveyorMachine<D, I>,
    C2: ConveyorMachine<I, R>,
{
    fn max_attempts(&self) -> u32 {
        self.first.max_attempts().max(self.second.max_attempts())
    }

    async fn process(
        &self,
        data: D,
        attempts_remaining: u32,
        cancel: CancellationToken,
    ) -> Result<R> {
        if cancel.is_cancelled() {
            return Err(TaskforgeError::CanceledByCaller);
        }
        let stage_one_attempts = attempts_remaining.min(self.first.max_attempts()).max(1);
        let intermediate = self
            .first
            .process(data, stage_one_attempts, cancel.clone())
            .await?;

        if cancel.is_cancelled() {
            return Err(TaskforgeError::CanceledByCaller);
        }
        let stage_two_attempts = attempts_remaining.min(self.second.max_attempts()).max(1);
        self.second
            .process(intermediate, stage_two_attempts, cancel)
            .await
    }
}
