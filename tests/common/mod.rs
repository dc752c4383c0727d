#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cas_logout_hook::dom::shell::{MountedNavigation, PageShell};
use cas_logout_hook::http::check_status;
use cas_logout_hook::{
    DomTree, HookOptions, HttpClient, HttpError, HttpResponse, HttpResult, LogoutHook,
};
use parking_lot::Mutex;
use tokio::time::Instant;

pub const DESTINATION: &str = "https://cas.example.com/cas/logout?service=https://sonar.example.com";
pub const START_PAGE: &str = "https://sonar.example.com/projects";

/// Status standing for a transport failure
pub const NETWORK_FAILURE: u16 = 0;

/// Scripted HTTP client
pub struct MockHttp {
    statuses: Mutex<VecDeque<u16>>,
    fallback: u16,
    delay: Duration,
    pub requests: Mutex<Vec<(String, Option<String>)>>,
    pub completed_at: Mutex<Vec<Instant>>,
}

impl MockHttp {
    pub fn answering(status: u16) -> Arc<Self> {
        Self::scripted(&[], status, Duration::ZERO)
    }

    pub fn slow(status: u16, delay: Duration) -> Arc<Self> {
        Self::scripted(&[], status, delay)
    }

    /// Answer `statuses` in order, then `fallback` forever
    pub fn scripted(statuses: &[u16], fallback: u16, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            statuses: Mutex::new(statuses.iter().copied().collect()),
            fallback,
            delay,
            requests: Mutex::new(Vec::new()),
            completed_at: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    async fn answer(&self, url: &str, form: Option<String>) -> HttpResult<HttpResponse> {
        self.requests.lock().push((url.to_string(), form));
        tokio::time::sleep(self.delay).await;
        self.completed_at.lock().push(Instant::now());

        let status = self.statuses.lock().pop_front().unwrap_or(self.fallback);
        if status == NETWORK_FAILURE {
            return Err(HttpError::Network("connection reset".to_string()));
        }
        check_status(status, String::new())
    }
}

#[async_trait]
impl HttpClient for MockHttp {
    async fn get(&self, url: &str) -> HttpResult<HttpResponse> {
        self.answer(url, None).await
    }

    async fn post(&self, url: &str, form: Option<String>) -> HttpResult<HttpResponse> {
        self.answer(url, form).await
    }
}

pub struct Page {
    pub tree: Arc<DomTree>,
    pub shell: PageShell,
}

pub fn page() -> Page {
    let tree = Arc::new(DomTree::new(START_PAGE));
    let shell = PageShell::new(tree.clone());
    Page { tree, shell }
}

pub fn hook(page: &Page, http: Arc<MockHttp>, options: HookOptions) -> LogoutHook {
    LogoutHook::new(page.tree.clone(), http, page.tree.clone(), options)
}

pub fn options() -> HookOptions {
    HookOptions::new(DESTINATION)
}

pub fn mount(page: &Page) -> MountedNavigation {
    page.shell.mount_navigation("admin").unwrap()
}

pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
