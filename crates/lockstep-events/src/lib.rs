//! Host input pipeline.
//!
//! Host events arrive on a dedicated producer thread blocked in the host's event wait. Each
//! event is delivered to two classes of listeners:
//!
//! - *immediate* listeners run inline on the producer thread, with no ordering guarantee
//!   relative to emulation. They exist for latency-sensitive host-level concerns and must
//!   not touch emulated state.
//! - *deferred* listeners run on the emulation thread, only from
//!   [`DeferredEvents::drain_deferred`], which the main loop calls once per iteration. Host
//!   input therefore never becomes visible in the middle of an emulation step.
//!
//! [`EventDistributor::new`] returns both halves: the thread-safe producer side and the
//! emulation-thread-only consumer side.

mod distributor;

use std::fmt::Debug;
use std::hash::Hash;

use thiserror::Error;

pub use distributor::{DeferredEvents, DeferredListener, EventDistributor, ImmediateListener};

/// A host event that can be routed by kind.
pub trait Event: Clone + Send + 'static {
    type Kind: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

/// Receiver of host events.
pub trait EventListener<E> {
    fn signal_event(&self, event: &E);
}

impl<E, F: Fn(&E)> EventListener<E> for F {
    fn signal_event(&self, event: &E) {
        self(event)
    }
}

/// Registration handle returned by the `register_*_listener` methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Blocking source of host events, polled by the producer thread.
pub trait HostEventSource<E> {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Blocks until the next event arrives.
    ///
    /// `Ok(None)` means the source was closed in an orderly way. An error is never retried.
    fn wait_event(&mut self) -> Result<Option<E>, Self::Error>;
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("host event source failed: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}
