//! CAS single sign-out for an asynchronously rendered navigation menu
//!
//! The host page renders its user menu with JavaScript some time after the
//! load event, and renders the user popup only after the menu has been
//! clicked. [`LogoutHook`] waits for both with two chained
//! [`Discovery`] pollers and replaces the popup's "Log out" link with a
//! request to the local logout endpoint followed by a redirect to the CAS
//! server's logout page.

pub mod config;
pub mod discovery;
pub mod dom;
pub mod hook;
pub mod http;
pub mod navigation;
pub mod path;
pub mod settings;
pub mod utils;

pub use config::{Config, ConfigError, ConfigResult};
pub use discovery::{Discovered, Discovery, DiscoveryError, DiscoveryHandle, DiscoveryResult};
pub use dom::{ClickEvent, ClickListener, Document, DomError, DomResult, DomTree, ElementId};
pub use hook::{
    BindingKind, BindingRegistry, FailurePolicy, HookOptions, LogoutError, LogoutHook,
    LogoutOutcome, LogoutResult,
};
pub use http::{HttpClient, HttpError, HttpResponse, HttpResult, ReqwestHttpClient};
pub use navigation::Navigator;
pub use path::{Step, TargetPath};
pub use settings::CasSettings;
