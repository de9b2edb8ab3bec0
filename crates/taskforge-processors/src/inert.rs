//! `Inert<Arg>` adapts a plain, non-activatable argument into
//! `StartStoppable` so it can be used with the `Reusable`/`OneTime`
//! processor families, which require activation lifecycle uniformly.
//!
//! Resolves an ambiguity in the originating design ("call Activate if the
//! argument implements StartStoppable"): Rust has no trait-implementation
//! probing at runtime, so `StartStoppable` is a required bound here instead
//! of a conditional one. Wrap an argument that has no real activation step
//! in `Inert` to get a trivial always-active implementation.

use taskforge_core::{CancellationToken, Result, StartStoppable};

/// Wraps `Arg`, providing a no-op `StartStoppable` implementation.
pub struct Inert<Arg>(pub Arg);

impl<Arg> Inert<Arg> {
    /// Wrap `arg`.
    pub fn new(arg: Arg) -> Self {
        Self(arg)
    }

    /// Unwrap back to the underlying argument.
    pub fn into_inner(self) -> Arg {
        self.0
    }
}

#[async_trait::async_trait]
impl<Arg> StartStoppable for Inert<Arg>
where
    Arg: Send + Sync,
{
    fn is_active(&self) -> bool {
        true
    }

    async fn activate(&self, _cancel: &CancellationToken) -> Result<()> {
        Ok(())
    }

    async fn deactivate(&self, _cancel: &CancellationToken) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inert_is_always_active_and_its_lifecycle_is_a_no_op() {
        let inert = Inert::new(42u32);
        assert!(inert.is_active());
        inert.activate(&CancellationToken::new()).await.unwrap();
        inert.deactivate(&CancellationToken::new()).await.unwrap();
        assert_eq!(inert.into_inner(), 42);
    }
}
