//! Logout hook: chains menu discovery, popup discovery and the logout request
//!
//! # Flow
//! 1. [`LogoutHook::start`] probes for the user menu trigger
//!    (`#global-navigation .js-user-authenticated a`) and binds a click
//!    listener to it.
//! 2. A click on the trigger lets the page shell open its user popup; the
//!    listener only starts a second discovery for the popup's logout link
//!    (second `<a>` of `.popup`). It neither stops propagation nor prevents
//!    the default action, so the shell's own toggle keeps working.
//! 3. A click on the logout link is swallowed (immediate propagation
//!    stopped, default action prevented) and replaced by
//!    `POST /api/authentication/logout`. Once that request has completed
//!    the browser is sent to the CAS logout destination.
//!
//! # Single binding
//! Every bind goes through the [`BindingRegistry`]: a listener of a given
//! kind is attached to an element at most once, however many discoveries
//! find it. At most one popup discovery is pending at a time.
//!
//! # Threads
//! The runtime [`LogoutHook::start`] runs on is captured and carried into
//! every listener, so clicks may be dispatched from any thread.
//!
//! # Lifetime
//! Listeners hold a weak reference to the hook. Dropping the hook (or
//! calling [`LogoutHook::shutdown`]) cancels pending discoveries and turns
//! already bound listeners into no-ops.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{Config, ConfigResult};
use crate::discovery::{Discovery, DiscoveryHandle};
use crate::dom::{ClickEvent, ClickListener, Document, ElementId};
use crate::http::{HttpClient, HttpError, HttpResponse, HttpResult};
use crate::navigation::Navigator;
use crate::path::TargetPath;
use crate::utils::constants::{
    DEFAULT_MENU_INTERVAL_MS, DEFAULT_MENU_TIMEOUT_MS, DEFAULT_POPUP_INTERVAL_MS,
    DEFAULT_POPUP_TIMEOUT_MS, LOGOUT_ENDPOINT, RETRY_BASE_DELAY_MS, RETRY_MAX_DELAY_MS,
};
use crate::utils::{validate_discovery_timeout, validate_interval};

/// Reaction to a failed logout request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stay on the page without any trace above debug level
    #[default]
    Silent,
    /// Stay on the page and log a warning
    Warn,
    /// Log a warning and go to the logout destination anyway
    Redirect,
}

/// Handler kinds the hook attaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    MenuTrigger,
    LogoutLink,
}

/// Record of the listeners attached so far
#[derive(Debug, Default)]
pub struct BindingRegistry {
    bound: Mutex<HashSet<(ElementId, BindingKind)>>,
}

impl BindingRegistry {
    /// Reserve `(element, kind)`; `false` if it is already bound
    pub fn claim(&self, element: ElementId, kind: BindingKind) -> bool {
        self.bound.lock().insert((element, kind))
    }

    fn release(&self, element: ElementId, kind: BindingKind) {
        self.bound.lock().remove(&(element, kind));
    }

    pub fn is_bound(&self, element: ElementId, kind: BindingKind) -> bool {
        self.bound.lock().contains(&(element, kind))
    }

    pub fn count(&self, kind: BindingKind) -> usize {
        self.bound
            .lock()
            .iter()
            .filter(|(_, bound_kind)| *bound_kind == kind)
            .count()
    }
}

/// Timing and endpoints of the hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOptions {
    pub menu_interval: Duration,
    pub menu_timeout: Option<Duration>,
    pub popup_interval: Duration,
    pub popup_timeout: Option<Duration>,
    pub logout_endpoint: String,
    pub destination: String,
    pub failure_policy: FailurePolicy,
    pub retries: u32,
}

impl HookOptions {
    /// Default timings, logging out towards `destination`
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            menu_interval: Duration::from_millis(DEFAULT_MENU_INTERVAL_MS),
            menu_timeout: Some(Duration::from_millis(DEFAULT_MENU_TIMEOUT_MS)),
            popup_interval: Duration::from_millis(DEFAULT_POPUP_INTERVAL_MS),
            popup_timeout: Some(Duration::from_millis(DEFAULT_POPUP_TIMEOUT_MS)),
            logout_endpoint: LOGOUT_ENDPOINT.to_string(),
            destination: destination.into(),
            failure_policy: FailurePolicy::default(),
            retries: 0,
        }
    }

    pub fn from_config(config: &Config) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            menu_interval: validate_interval("menu.interval_ms", config.menu.interval_ms)?,
            menu_timeout: validate_discovery_timeout("menu.timeout_ms", config.menu.timeout_ms)?,
            popup_interval: validate_interval("popup.interval_ms", config.popup.interval_ms)?,
            popup_timeout: validate_discovery_timeout("popup.timeout_ms", config.popup.timeout_ms)?,
            logout_endpoint: config.logout.endpoint.clone(),
            destination: config.logout_destination()?,
            failure_policy: config.logout.failure,
            retries: config.logout.retries,
        })
    }
}

/// How a logout attempt ended when the browser left the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutOutcome {
    Redirected { destination: String },
    RedirectedAfterFailure { destination: String, error: HttpError },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogoutError {
    #[error("A logout request is already in flight")]
    InFlight,

    #[error("Logout request failed: {0}")]
    Request(#[from] HttpError),
}

pub type LogoutResult<T> = Result<T, LogoutError>;

/// Resets the in-flight flag when a logout attempt ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct HookInner {
    document: Arc<dyn Document>,
    http: Arc<dyn HttpClient>,
    navigator: Arc<dyn Navigator>,
    options: HookOptions,
    bindings: BindingRegistry,
    menu_discovery: Mutex<Option<DiscoveryHandle>>,
    popup_discovery: Mutex<Option<DiscoveryHandle>>,
    logout_in_flight: AtomicBool,
    shutdown: CancellationToken,
}

pub struct LogoutHook {
    inner: Arc<HookInner>,
}

impl LogoutHook {
    pub fn new(
        document: Arc<dyn Document>,
        http: Arc<dyn HttpClient>,
        navigator: Arc<dyn Navigator>,
        options: HookOptions,
    ) -> Self {
        Self {
            inner: Arc::new(HookInner {
                document,
                http,
                navigator,
                options,
                bindings: BindingRegistry::default(),
                menu_discovery: Mutex::new(None),
                popup_discovery: Mutex::new(None),
                logout_in_flight: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn options(&self) -> &HookOptions {
        &self.inner.options
    }

    pub fn bindings(&self) -> &BindingRegistry {
        &self.inner.bindings
    }

    /// Start waiting for the user menu trigger
    ///
    /// Must be called inside a tokio runtime. Calling it again while the
    /// menu discovery is pending does nothing.
    pub fn start(&self) {
        let inner = &self.inner;
        let mut pending = inner.menu_discovery.lock();
        if pending.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Menu discovery already pending");
            return;
        }

        info!(
            "Logout hook started, waiting for '{}'",
            TargetPath::menu_trigger()
        );
        let runtime = Handle::current();
        let hook = Arc::downgrade(inner);
        let discovery = Discovery::new(
            "menu discovery",
            TargetPath::menu_trigger(),
            inner.options.menu_interval,
        )
        .timeout(inner.options.menu_timeout)
        .cancellation(inner.shutdown.child_token());

        let on_found = {
            let runtime = runtime.clone();
            move |trigger| {
                if let Some(inner) = hook.upgrade() {
                    HookInner::bind_menu_trigger(&inner, trigger, runtime);
                }
            }
        };
        *pending = Some(discovery.spawn_on(&runtime, inner.document.clone(), on_found));
    }

    pub fn is_menu_discovery_pending(&self) -> bool {
        self.inner.menu_discovery.lock().as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn is_popup_discovery_pending(&self) -> bool {
        self.inner.popup_discovery.lock().as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Send the logout request and navigate, as a click on the logout link does
    pub async fn logout(&self) -> LogoutResult<LogoutOutcome> {
        self.inner.logout().await
    }

    /// Cancel pending discoveries and disarm bound listeners
    pub fn shutdown(&self) {
        if !self.inner.shutdown.is_cancelled() {
            info!("Logout hook shutting down");
            self.inner.shutdown.cancel();
        }
    }
}

impl Drop for LogoutHook {
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
    }
}

impl HookInner {
    fn bind_menu_trigger(inner: &Arc<Self>, trigger: ElementId, runtime: Handle) {
        if !inner.bindings.claim(trigger, BindingKind::MenuTrigger) {
            debug!("Menu trigger {} already bound", trigger);
            return;
        }

        let hook = Arc::downgrade(inner);
        let listener: ClickListener = Arc::new(move |_event: &mut ClickEvent| {
            if let Some(inner) = hook.upgrade() {
                HookInner::start_popup_discovery(&inner, &runtime);
            }
        });

        match inner.document.add_click_listener(trigger, listener) {
            Ok(()) => info!("Bound popup discovery to menu trigger {}", trigger),
            Err(e) => {
                warn!("Failed to bind menu trigger {}: {}", trigger, e);
                inner.bindings.release(trigger, BindingKind::MenuTrigger);
            }
        }
    }

    fn start_popup_discovery(inner: &Arc<Self>, runtime: &Handle) {
        if inner.shutdown.is_cancelled() {
            return;
        }

        let mut pending = inner.popup_discovery.lock();
        if pending.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Popup discovery already pending, ignoring click");
            return;
        }

        let hook: Weak<Self> = Arc::downgrade(inner);
        let discovery = Discovery::new(
            "popup discovery",
            TargetPath::logout_link(),
            inner.options.popup_interval,
        )
        .timeout(inner.options.popup_timeout)
        .cancellation(inner.shutdown.child_token());

        let on_found = {
            let runtime = runtime.clone();
            move |link| {
                if let Some(inner) = hook.upgrade() {
                    HookInner::bind_logout_link(&inner, link, runtime);
                }
            }
        };
        *pending = Some(discovery.spawn_on(runtime, inner.document.clone(), on_found));
    }

    fn bind_logout_link(inner: &Arc<Self>, link: ElementId, runtime: Handle) {
        if !inner.bindings.claim(link, BindingKind::LogoutLink) {
            debug!("Logout link {} already bound", link);
            return;
        }

        let hook = Arc::downgrade(inner);
        let listener: ClickListener = Arc::new(move |event: &mut ClickEvent| {
            event.stop_immediate_propagation();
            event.prevent_default();
            if let Some(inner) = hook.upgrade()
                && !inner.shutdown.is_cancelled()
            {
                debug!("Logout link {} clicked", event.target());
                runtime.spawn(async move {
                    // Failures are reported by `logout` according to the policy
                    let _ = inner.logout().await;
                });
            }
        });

        match inner.document.add_click_listener(link, listener) {
            Ok(()) => info!("Bound CAS logout to popup link {}", link),
            Err(e) => {
                warn!("Failed to bind logout link {}: {}", link, e);
                inner.bindings.release(link, BindingKind::LogoutLink);
            }
        }
    }

    async fn logout(&self) -> LogoutResult<LogoutOutcome> {
        if self.logout_in_flight.swap(true, Ordering::SeqCst) {
            debug!("Logout already in flight, ignoring");
            return Err(LogoutError::InFlight);
        }
        let _in_flight = InFlight(&self.logout_in_flight);

        let destination = self.options.destination.clone();
        match self.request_logout().await {
            Ok(_) => {
                info!("Local session closed, redirecting to {}", destination);
                self.navigator.navigate(&destination);
                Ok(LogoutOutcome::Redirected { destination })
            }
            Err(error) => match self.options.failure_policy {
                FailurePolicy::Silent => {
                    debug!("Logout request failed, staying on page: {}", error);
                    Err(LogoutError::Request(error))
                }
                FailurePolicy::Warn => {
                    warn!("Logout request failed, staying on page: {}", error);
                    Err(LogoutError::Request(error))
                }
                FailurePolicy::Redirect => {
                    warn!(
                        "Logout request failed, redirecting to {} anyway: {}",
                        destination, error
                    );
                    self.navigator.navigate(&destination);
                    Ok(LogoutOutcome::RedirectedAfterFailure { destination, error })
                }
            },
        }
    }

    /// POST the logout endpoint, retrying network and server errors with backoff
    async fn request_logout(&self) -> HttpResult<HttpResponse> {
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
        let max_delay = Duration::from_millis(RETRY_MAX_DELAY_MS);
        let mut attempt: u32 = 0;

        loop {
            match self.http.post(&self.options.logout_endpoint, None).await {
                Ok(response) => return Ok(response),
                Err(error) if error.is_retryable() && attempt < self.options.retries => {
                    attempt += 1;
                    debug!(
                        "Logout request failed ({}), retry {}/{} in {}ms",
                        error,
                        attempt,
                        self.options.retries,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(max_delay);
                }
                Err(error) => return Err(error),
            }
        }
    }
}
