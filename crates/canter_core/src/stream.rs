//! Lazy, restartable fact streams.

use crate::error::{CoreError, CoreResult};
use crate::fact::Fact;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Whether a stream consumer wants more items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    /// Produce the next fact.
    Continue,
    /// Terminate iteration early.
    Stop,
}

/// Context threaded through a stream production run.
///
/// Carries a cancellation flag checked between produced items. Clones share
/// the flag, so a clone handed to another thread can cancel an in-flight
/// iteration.
#[derive(Debug, Clone, Default)]
pub struct StreamCtx {
    cancelled: Arc<AtomicBool>,
}

impl StreamCtx {
    /// Creates a fresh, uncancelled context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of any iteration using this context.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns true if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// A finite, restartable sequence of facts.
///
/// Production is consumer-driven: [`FactStream::produce`] invokes the
/// consumer once per fact and stops when the consumer returns
/// [`ScanControl::Stop`], the context is cancelled, or the sequence is
/// exhausted. A fresh `produce` call restarts from the beginning. The
/// stream is not meant for concurrent iteration.
#[derive(Debug, Clone, Default)]
pub struct FactStream {
    facts: Vec<Fact>,
}

impl FactStream {
    /// Creates a stream over an already-materialized batch of facts.
    #[must_use]
    pub fn from_facts(facts: Vec<Fact>) -> Self {
        Self { facts }
    }

    /// Drives `consume` once per fact.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Cancelled`] if the context is cancelled
    /// mid-iteration, or whatever error the consumer returns.
    pub fn produce(
        &self,
        ctx: &StreamCtx,
        consume: &mut dyn FnMut(&Fact) -> CoreResult<ScanControl>,
    ) -> CoreResult<()> {
        for fact in &self.facts {
            if ctx.is_cancelled() {
                return Err(CoreError::Cancelled);
            }
            if consume(fact)? == ScanControl::Stop {
                break;
            }
        }
        Ok(())
    }

    /// Materializes the stream into an ordered list.
    pub fn collect(&self, ctx: &StreamCtx) -> CoreResult<Vec<Fact>> {
        let mut out = Vec::with_capacity(self.facts.len());
        self.produce(ctx, &mut |fact| {
            out.push(fact.clone());
            Ok(ScanControl::Continue)
        })?;
        Ok(out)
    }
}
