//! Document abstraction the logout hook probes and binds against
//!
//! The host page is only reachable through [`Document`]: element lookup by
//! identifier, by class and by tag (each with an index, mirroring the live
//! collections a browser returns), and click-listener attachment.
//! [`DomTree`] is the in-memory implementation used by the dry-run binary
//! and by the test suite.

pub mod shell;
mod tree;

pub use tree::{ClickOutcome, DomTree, Element};

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Opaque handle to an element of a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Click event handed to listeners while it bubbles from the target to the root
#[derive(Debug, Clone)]
pub struct ClickEvent {
    target: ElementId,
    current_target: ElementId,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
    default_prevented: bool,
}

impl ClickEvent {
    pub fn new(target: ElementId) -> Self {
        Self {
            target,
            current_target: target,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            default_prevented: false,
        }
    }

    pub fn target(&self) -> ElementId {
        self.target
    }

    /// Element whose listener is currently running
    pub fn current_target(&self) -> ElementId {
        self.current_target
    }

    pub(crate) fn set_current_target(&mut self, element: ElementId) {
        self.current_target = element;
    }

    /// Stop bubbling once the listeners of the current element have run
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stop bubbling and skip the remaining listeners of the current element
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    /// Suppress the element's default action (link navigation)
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Click listener attached to an element
pub type ClickListener = Arc<dyn Fn(&mut ClickEvent) + Send + Sync>;

/// Live document the hook polls
///
/// Lookups are synchronous: a single probe of a target path never yields,
/// so it observes one consistent snapshot of the document.
pub trait Document: Send + Sync {
    /// First attached element carrying `id`
    fn element_by_id(&self, id: &str) -> Option<ElementId>;

    /// `index`-th descendant of `scope` (document order) carrying `class`
    fn element_by_class(&self, scope: ElementId, class: &str, index: usize) -> Option<ElementId>;

    /// `index`-th descendant of `scope` (document order) with tag `tag`
    fn element_by_tag(&self, scope: ElementId, tag: &str, index: usize) -> Option<ElementId>;

    /// Attach a click listener; listeners run in attachment order
    fn add_click_listener(&self, element: ElementId, listener: ClickListener) -> DomResult<()>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Element {0} is not attached to the document")]
    Detached(ElementId),

    #[error("Unknown element {0}")]
    UnknownElement(ElementId),

    #[error("The document root cannot be removed")]
    RootRemoval,
}

pub type DomResult<T> = Result<T, DomError>;
