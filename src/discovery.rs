//! Element discovery for asynchronously rendered page shells
//!
//! The host page renders its navigation with JavaScript well after the load
//! event, so the elements a handler has to be bound to are not there yet
//! when the hook starts. A [`Discovery`] probes the document on a fixed
//! interval until its [`TargetPath`] resolves, hands the element to a
//! one-shot callback and stops.
//!
//! # Termination
//! A discovery ends in exactly one of three ways:
//! - the path resolves: the callback runs once, synchronously, inside the
//!   probe that found the element, and `Ok(Discovered)` is returned
//! - the optional timeout elapses: `Err(DiscoveryError::TimedOut)`
//! - its cancellation token fires: `Err(DiscoveryError::Cancelled)`
//!
//! `run`, `run_then` and `spawn` consume the discovery, so a finished poller
//! cannot be started again.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::dom::{Document, ElementId};
use crate::path::TargetPath;

/// Smallest accepted polling interval
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Largest accepted polling interval (one day)
const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Successful discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discovered {
    pub element: ElementId,
    /// Number of probes, the successful one included
    pub attempts: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error(
        "{name}: '{path}' not found (timeout after {}ms, {attempts} probes)",
        .elapsed.as_millis()
    )]
    TimedOut {
        name: String,
        path: String,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("{name}: discovery cancelled after {attempts} probes")]
    Cancelled { name: String, attempts: u32 },

    #[error("{name}: discovery task aborted: {reason}")]
    Aborted { name: String, reason: String },
}

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Repeating probe for one target path
#[derive(Debug, Clone)]
pub struct Discovery {
    name: String,
    path: TargetPath,
    interval: Duration,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl Discovery {
    /// Probe `path` every `interval`, without timeout
    ///
    /// The first probe happens one interval after the discovery starts.
    pub fn new(name: impl Into<String>, path: TargetPath, interval: Duration) -> Self {
        Self {
            name: name.into(),
            path,
            interval: interval.clamp(MIN_INTERVAL, MAX_INTERVAL),
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Give up after `timeout`; `None` probes until cancelled
    ///
    /// A timeout too large to be represented as a deadline counts as none.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stop probing when `token` is cancelled
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Probe until the path resolves
    pub async fn run<D>(self, document: &D) -> DiscoveryResult<Discovered>
    where
        D: Document + ?Sized,
    {
        self.run_then(document, |_| {}).await
    }

    /// Probe until the path resolves, then hand the element to `on_found`
    pub async fn run_then<D, F>(self, document: &D, on_found: F) -> DiscoveryResult<Discovered>
    where
        D: Document + ?Sized,
        F: FnOnce(ElementId),
    {
        let started = Instant::now();
        let mut ticker = time::interval_at(started + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let expiry = expiry(self.timeout.and_then(|timeout| started.checked_add(timeout)));
        tokio::pin!(expiry);

        debug!(
            "{}: probing '{}' every {}ms",
            self.name,
            self.path,
            self.interval.as_millis()
        );

        let mut attempts: u32 = 0;
        let element = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("{}: cancelled after {} probes", self.name, attempts);
                    return Err(DiscoveryError::Cancelled {
                        name: self.name,
                        attempts,
                    });
                }
                _ = ticker.tick() => {}
                _ = &mut expiry => {
                    warn!(
                        "{}: '{}' still missing after {} probes, giving up",
                        self.name, self.path, attempts
                    );
                    return Err(DiscoveryError::TimedOut {
                        name: self.name,
                        path: self.path.to_string(),
                        attempts,
                        elapsed: started.elapsed(),
                    });
                }
            }

            attempts += 1;
            match self.path.resolve(document) {
                Some(element) => break element,
                None => trace!("{}: probe {} found nothing", self.name, attempts),
            }
        };

        debug!(
            "{}: found {} after {} probes ({}ms)",
            self.name,
            element,
            attempts,
            started.elapsed().as_millis()
        );
        on_found(element);

        Ok(Discovered { element, attempts })
    }

    /// Run the discovery on its own task of the current runtime
    ///
    /// Dropping the returned handle detaches the task; use
    /// [`DiscoveryHandle::cancel`] to stop it.
    ///
    /// # Panics
    /// Outside a tokio runtime; see [`Discovery::spawn_on`].
    pub fn spawn<D, F>(self, document: Arc<D>, on_found: F) -> DiscoveryHandle
    where
        D: Document + ?Sized + 'static,
        F: FnOnce(ElementId) + Send + 'static,
    {
        self.spawn_on(&Handle::current(), document, on_found)
    }

    /// Run the discovery on its own task of `runtime`
    ///
    /// Safe to call from any thread, e.g. from a click listener dispatched
    /// by the host's event thread.
    pub fn spawn_on<D, F>(self, runtime: &Handle, document: Arc<D>, on_found: F) -> DiscoveryHandle
    where
        D: Document + ?Sized + 'static,
        F: FnOnce(ElementId) + Send + 'static,
    {
        let name = self.name.clone();
        let token = self.cancel.clone();
        let join = runtime.spawn(async move { self.run_then(document.as_ref(), on_found).await });

        DiscoveryHandle { name, token, join }
    }
}

async fn expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending::<()>().await,
    }
}

/// Owner of a spawned discovery
#[derive(Debug)]
pub struct DiscoveryHandle {
    name: String,
    token: CancellationToken,
    join: JoinHandle<DiscoveryResult<Discovered>>,
}

impl DiscoveryHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the discovery to end
    pub async fn join(self) -> DiscoveryResult<Discovered> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(DiscoveryError::Aborted {
                name: self.name,
                reason: e.to_string(),
            }),
        }
    }
}
