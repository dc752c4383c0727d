// CAS logout hook: dry run
//
// Loads the configuration, prints the CAS logout destination and plays the
// whole flow against the emulated page shell: the navigation is rendered
// late, the user menu and then the logout link are clicked, and the logout
// request goes to `http.base_url` for real.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cas_logout_hook::dom::shell::PageShell;
use cas_logout_hook::{BindingKind, Config, DomTree, HookOptions, LogoutHook, ReqwestHttpClient};
use tokio::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "cas-logout-hook.yaml";

/// Delay before the emulated shell renders its navigation
const SHELL_RENDER_DELAY: Duration = Duration::from_millis(1_200);

/// Delay between a click on the user menu and the popup showing up
const POPUP_RENDER_DELAY: Duration = Duration::from_millis(300);

const STEP_TIMEOUT: Duration = Duration::from_secs(15);

async fn wait_for(what: &str, condition: impl Fn() -> bool) -> Result<()> {
    let deadline = Instant::now() + STEP_TIMEOUT;
    while !condition() {
        if Instant::now() >= deadline {
            anyhow::bail!("Timed out after {}s waiting for {}", STEP_TIMEOUT.as_secs(), what);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let options = HookOptions::from_config(&config)?;
    println!("Logout destination: {}", options.destination);

    let http = Arc::new(ReqwestHttpClient::new(
        &config.http.base_url,
        config.http.request_timeout_ms.map(Duration::from_millis),
    )?);
    let start_page = format!("{}/projects", config.http.base_url.trim_end_matches('/'));
    let tree = Arc::new(DomTree::new(start_page.clone()));
    let shell = PageShell::new(tree.clone());

    let hook = LogoutHook::new(tree.clone(), http, tree.clone(), options);
    hook.start();

    tokio::time::sleep(SHELL_RENDER_DELAY).await;
    let mounted = shell.mount_navigation("admin")?;
    shell.install_popup_toggle(mounted, POPUP_RENDER_DELAY)?;

    wait_for("the menu trigger binding", || {
        hook.bindings().is_bound(mounted.trigger, BindingKind::MenuTrigger)
    })
    .await?;
    info!("Clicking the user menu");
    tree.click(mounted.trigger)?;

    wait_for("the logout link binding", || {
        hook.bindings().count(BindingKind::LogoutLink) > 0
    })
    .await?;
    let popup = shell
        .current_popup()
        .context("User popup vanished before the logout click")?;
    info!("Clicking the logout link");
    tree.click(popup.logout_link)?;

    let navigated = wait_for("the redirect", || tree.location() != start_page)
        .await
        .is_ok();
    if navigated {
        println!("Final location: {}", tree.location());
    } else {
        println!("Logout request failed, stayed on {}", tree.location());
    }

    hook.shutdown();
    Ok(())
}
