//! Emulation of the host page shell
//!
//! Renders the authenticated navigation bar and the user popup with the
//! same structure the real shell produces, including the asynchronous
//! render delay between a click on the user menu and the popup showing up.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::debug;

use super::{ClickEvent, DomResult, DomTree, Element, ElementId};
use crate::path::{AUTHENTICATED_CLASS, GLOBAL_NAVIGATION_ID, POPUP_CLASS};

/// Href of the shell's own logout link, which the hook must override
pub const SHELL_LOGOUT_HREF: &str = "/sessions/logout";

/// Elements of a mounted navigation bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountedNavigation {
    pub navigation: ElementId,
    pub user_menu: ElementId,
    pub trigger: ElementId,
}

/// Elements of an open user popup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserPopup {
    pub popup: ElementId,
    pub account_link: ElementId,
    pub logout_link: ElementId,
}

#[derive(Clone)]
pub struct PageShell {
    tree: Arc<DomTree>,
    open_popup: Arc<Mutex<Option<UserPopup>>>,
}

impl PageShell {
    pub fn new(tree: Arc<DomTree>) -> Self {
        Self {
            tree,
            open_popup: Arc::new(Mutex::new(None)),
        }
    }

    pub fn tree(&self) -> &Arc<DomTree> {
        &self.tree
    }

    /// Render `#global-navigation` for an authenticated user
    pub fn mount_navigation(&self, login: &str) -> DomResult<MountedNavigation> {
        let navigation = self.tree.append(
            self.tree.root(),
            Element::new("nav").id(GLOBAL_NAVIGATION_ID).child(
                Element::new("ul")
                    .class("global-navigation-primary")
                    .child(Element::new("li").child(Element::new("a").href("/projects"))),
            ),
        )?;
        let user_menu = self.tree.append(
            navigation,
            Element::new("li")
                .class("dropdown")
                .class(AUTHENTICATED_CLASS)
                .attr("data-login", login),
        )?;
        let trigger = self.tree.append(
            user_menu,
            Element::new("a").class("dropdown-toggle").href("#"),
        )?;

        debug!("Page shell mounted navigation for {}", login);
        Ok(MountedNavigation {
            navigation,
            user_menu,
            trigger,
        })
    }

    /// Render the user popup under the authenticated menu
    pub fn open_user_popup(&self, mounted: &MountedNavigation) -> DomResult<UserPopup> {
        let popup = self.tree.append(
            mounted.user_menu,
            Element::new("div").class(POPUP_CLASS).class("dropdown-menu"),
        )?;
        let list = self.tree.append(popup, Element::new("ul"))?;
        let account_item = self.tree.append(list, Element::new("li"))?;
        let account_link = self
            .tree
            .append(account_item, Element::new("a").href("/account"))?;
        let logout_item = self.tree.append(list, Element::new("li"))?;
        let logout_link = self
            .tree
            .append(logout_item, Element::new("a").href(SHELL_LOGOUT_HREF))?;

        let opened = UserPopup {
            popup,
            account_link,
            logout_link,
        };
        *self.open_popup.lock() = Some(opened);
        Ok(opened)
    }

    pub fn close_user_popup(&self) -> DomResult<()> {
        let opened = self.open_popup.lock().take();
        match opened {
            Some(opened) => self.tree.remove(opened.popup),
            None => Ok(()),
        }
    }

    pub fn current_popup(&self) -> Option<UserPopup> {
        *self.open_popup.lock()
    }

    /// Make the trigger toggle the popup, rendered `render_delay` after the click
    ///
    /// Must be called inside a tokio runtime: each click schedules the
    /// render on a task of that runtime, the way the shell re-renders on its
    /// own tick. The click itself may come from any thread.
    pub fn install_popup_toggle(
        &self,
        mounted: MountedNavigation,
        render_delay: Duration,
    ) -> DomResult<()> {
        use super::Document;

        let shell = self.clone();
        let runtime = Handle::current();
        self.tree.add_click_listener(
            mounted.trigger,
            Arc::new(move |event: &mut ClickEvent| {
                event.prevent_default();
                let shell = shell.clone();
                runtime.spawn(async move {
                    tokio::time::sleep(render_delay).await;
                    let result = if shell.current_popup().is_some() {
                        shell.close_user_popup()
                    } else {
                        shell.open_user_popup(&mounted).map(|_| ())
                    };
                    if let Err(e) = result {
                        debug!("Page shell popup toggle skipped: {}", e);
                    }
                });
            }),
        )
    }
}
