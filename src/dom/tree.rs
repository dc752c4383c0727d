//! In-memory document
//!
//! Models just enough of a browser document for the logout hook: element
//! insertion and removal at any time, lookups in document order, click
//! dispatch that bubbles from the target to the root, and the default
//! action of `<a href>` (assigning the location).

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use super::{ClickEvent, ClickListener, Document, DomError, DomResult, ElementId};
use crate::navigation::Navigator;

/// Detached element description, inserted with [`DomTree::append`]
#[derive(Debug, Clone, Default)]
pub struct Element {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn href(self, href: impl Into<String>) -> Self {
        self.attr("href", href)
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }
}

/// Result of dispatching a click
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickOutcome {
    pub default_prevented: bool,
    pub listeners_run: usize,
    /// Location assigned by the default action of an enclosing link
    pub navigated_to: Option<String>,
}

struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, String)>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    listeners: Vec<ClickListener>,
}

impl Node {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

struct TreeState {
    nodes: HashMap<ElementId, Node>,
    /// Ids are never reused: anything below this was attached once
    next_id: u64,
    location: String,
    history: Vec<String>,
}

impl TreeState {
    fn allocate(&mut self) -> ElementId {
        let id = ElementId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn ensure_attached(&self, element: ElementId) -> DomResult<&Node> {
        match self.nodes.get(&element) {
            Some(node) => Ok(node),
            None if element.0 < self.next_id => Err(DomError::Detached(element)),
            None => Err(DomError::UnknownElement(element)),
        }
    }

    fn insert(&mut self, parent: ElementId, element: Element) -> ElementId {
        let id = self.allocate();
        let Element {
            tag,
            id: element_id,
            classes,
            attributes,
            children,
        } = element;

        self.nodes.insert(
            id,
            Node {
                tag,
                id: element_id,
                classes,
                attributes,
                parent: Some(parent),
                children: Vec::new(),
                listeners: Vec::new(),
            },
        );
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(id);
        }

        for child in children {
            self.insert(id, child);
        }
        id
    }

    /// Descendants of `scope` in document order, `scope` excluded
    fn descendants(&self, scope: ElementId) -> Vec<ElementId> {
        let mut ordered = Vec::new();
        let mut stack: Vec<ElementId> = match self.nodes.get(&scope) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return ordered,
        };

        while let Some(current) = stack.pop() {
            ordered.push(current);
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        ordered
    }

    /// `element` followed by its ancestors up to the root
    fn ancestry(&self, element: ElementId) -> Vec<ElementId> {
        let mut chain = Vec::new();
        let mut cursor = Some(element);
        while let Some(current) = cursor {
            chain.push(current);
            cursor = self.nodes.get(&current).and_then(|node| node.parent);
        }
        chain
    }

    /// Target of the enclosing link; fragment-only hrefs stay on the page
    fn link_href(&self, element: ElementId) -> Option<String> {
        let href = self.ancestry(element).into_iter().find_map(|current| {
            let node = self.nodes.get(&current)?;
            if node.tag == "a" {
                node.attribute("href").map(str::to_string)
            } else {
                None
            }
        })?;
        (!href.starts_with('#')).then_some(href)
    }
}

/// Thread-safe in-memory document with a location
pub struct DomTree {
    root: ElementId,
    state: Mutex<TreeState>,
}

impl DomTree {
    /// Empty document (`<body>` root) loaded at `location`
    pub fn new(location: impl Into<String>) -> Self {
        let root = ElementId::new(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                tag: "body".to_string(),
                id: None,
                classes: Vec::new(),
                attributes: Vec::new(),
                parent: None,
                children: Vec::new(),
                listeners: Vec::new(),
            },
        );

        Self {
            root,
            state: Mutex::new(TreeState {
                nodes,
                next_id: 1,
                location: location.into(),
                history: Vec::new(),
            }),
        }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Insert `element` (and its subtree) as the last child of `parent`
    pub fn append(&self, parent: ElementId, element: Element) -> DomResult<ElementId> {
        let mut state = self.state.lock();
        state.ensure_attached(parent)?;
        Ok(state.insert(parent, element))
    }

    /// Detach `element` and its subtree, dropping their listeners
    pub fn remove(&self, element: ElementId) -> DomResult<()> {
        if element == self.root {
            return Err(DomError::RootRemoval);
        }

        let mut state = self.state.lock();
        let parent = state.ensure_attached(element)?.parent;
        if let Some(parent) = parent
            && let Some(parent_node) = state.nodes.get_mut(&parent)
        {
            parent_node.children.retain(|child| *child != element);
        }

        let mut doomed = state.descendants(element);
        doomed.push(element);
        for id in doomed {
            state.nodes.remove(&id);
        }
        Ok(())
    }

    pub fn contains(&self, element: ElementId) -> bool {
        self.state.lock().nodes.contains_key(&element)
    }

    pub fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        self.state
            .lock()
            .nodes
            .get(&element)
            .and_then(|node| node.attribute(name).map(str::to_string))
    }

    pub fn listener_count(&self, element: ElementId) -> usize {
        self.state
            .lock()
            .nodes
            .get(&element)
            .map_or(0, |node| node.listeners.len())
    }

    pub fn location(&self) -> String {
        self.state.lock().location.clone()
    }

    /// Every location assigned since the document was created
    pub fn history(&self) -> Vec<String> {
        self.state.lock().history.clone()
    }

    /// Dispatch a click on `target`
    ///
    /// Listeners run without the document lock held, so they may query or
    /// mutate the document themselves.
    pub fn click(&self, target: ElementId) -> DomResult<ClickOutcome> {
        let path = {
            let state = self.state.lock();
            state.ensure_attached(target)?;
            state.ancestry(target)
        };

        let mut event = ClickEvent::new(target);
        let mut listeners_run = 0;

        for element in path {
            let listeners = self
                .state
                .lock()
                .nodes
                .get(&element)
                .map(|node| node.listeners.clone())
                .unwrap_or_default();

            event.set_current_target(element);
            for listener in listeners {
                listener(&mut event);
                listeners_run += 1;
                if event.immediate_propagation_stopped() {
                    break;
                }
            }
            if event.propagation_stopped() {
                break;
            }
        }

        let navigated_to = if event.default_prevented() {
            None
        } else {
            let href = self.state.lock().link_href(target);
            if let Some(href) = &href {
                self.navigate(href);
            }
            href
        };

        Ok(ClickOutcome {
            default_prevented: event.default_prevented(),
            listeners_run,
            navigated_to,
        })
    }
}

impl Document for DomTree {
    fn element_by_id(&self, id: &str) -> Option<ElementId> {
        let state = self.state.lock();
        state
            .descendants(self.root)
            .into_iter()
            .find(|candidate| {
                state
                    .nodes
                    .get(candidate)
                    .is_some_and(|node| node.id.as_deref() == Some(id))
            })
    }

    fn element_by_class(&self, scope: ElementId, class: &str, index: usize) -> Option<ElementId> {
        let state = self.state.lock();
        state
            .descendants(scope)
            .into_iter()
            .filter(|candidate| {
                state
                    .nodes
                    .get(candidate)
                    .is_some_and(|node| node.classes.iter().any(|c| c == class))
            })
            .nth(index)
    }

    fn element_by_tag(&self, scope: ElementId, tag: &str, index: usize) -> Option<ElementId> {
        let state = self.state.lock();
        state
            .descendants(scope)
            .into_iter()
            .filter(|candidate| {
                state
                    .nodes
                    .get(candidate)
                    .is_some_and(|node| node.tag.eq_ignore_ascii_case(tag))
            })
            .nth(index)
    }

    fn add_click_listener(&self, element: ElementId, listener: ClickListener) -> DomResult<()> {
        let mut state = self.state.lock();
        state.ensure_attached(element)?;
        if let Some(node) = state.nodes.get_mut(&element) {
            node.listeners.push(listener);
        }
        Ok(())
    }
}

impl Navigator for DomTree {
    fn navigate(&self, url: &str) {
        debug!("Document location assigned: {}", url);
        let mut state = self.state.lock();
        state.location = url.to_string();
        state.history.push(url.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn menu() -> Element {
        Element::new("div").id("nav").child(
            Element::new("ul")
                .class("menu")
                .child(Element::new("a").href("/first"))
                .child(Element::new("li").child(Element::new("A").href("/second"))),
        )
    }

    #[test]
    fn lookups_follow_document_order() {
        let tree = DomTree::new("http://localhost/");
        tree.append(tree.root(), menu()).unwrap();

        let nav = tree.element_by_id("nav").unwrap();
        let list = tree.element_by_class(nav, "menu", 0).unwrap();
        let first = tree.element_by_tag(list, "a", 0).unwrap();
        let second = tree.element_by_tag(list, "a", 1).unwrap();

        assert_eq!(tree.attribute(first, "href").as_deref(), Some("/first"));
        assert_eq!(tree.attribute(second, "href").as_deref(), Some("/second"));
        assert!(tree.element_by_tag(list, "a", 2).is_none());
        assert!(tree.element_by_class(list, "menu", 0).is_none());
    }

    #[test]
    fn removed_elements_vanish_from_lookups() {
        let tree = DomTree::new("http://localhost/");
        let nav = tree.append(tree.root(), menu()).unwrap();
        let link = tree.element_by_tag(nav, "a", 0).unwrap();
        assert!(tree.contains(link));
        tree.remove(nav).unwrap();

        assert!(tree.element_by_id("nav").is_none());
        assert!(!tree.contains(nav));
        assert!(!tree.contains(link));
        let listener: ClickListener = Arc::new(|_: &mut ClickEvent| {});
        assert_eq!(tree.add_click_listener(nav, listener.clone()), Err(DomError::Detached(nav)));
        assert_eq!(tree.click(link), Err(DomError::Detached(link)));

        let unknown = ElementId::new(1_000);
        assert_eq!(
            tree.add_click_listener(unknown, listener),
            Err(DomError::UnknownElement(unknown))
        );
        assert_eq!(tree.remove(tree.root()), Err(DomError::RootRemoval));
    }

    #[test]
    fn click_bubbles_and_follows_links() {
        let tree = DomTree::new("http://localhost/");
        tree.append(tree.root(), menu()).unwrap();
        let nav = tree.element_by_id("nav").unwrap();
        let link = tree.element_by_tag(nav, "a", 0).unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tree.add_click_listener(
            nav,
            Arc::new(move |event: &mut ClickEvent| {
                assert_eq!(event.target(), link);
                assert_eq!(event.current_target(), nav);
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

        let outcome = tree.click(link).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.navigated_to.as_deref(), Some("/first"));
        assert_eq!(tree.location(), "/first");
    }

    #[test]
    fn stop_immediate_propagation_and_prevent_default() {
        let tree = DomTree::new("http://localhost/");
        tree.append(tree.root(), menu()).unwrap();
        let nav = tree.element_by_id("nav").unwrap();
        let link = tree.element_by_tag(nav, "a", 1).unwrap();

        let later = Arc::new(AtomicUsize::new(0));
        tree.add_click_listener(
            link,
            Arc::new(|event: &mut ClickEvent| {
                event.stop_immediate_propagation();
                event.prevent_default();
            }),
        )
        .unwrap();
        for element in [link, nav] {
            let later = later.clone();
            tree.add_click_listener(
                element,
                Arc::new(move |_: &mut ClickEvent| {
                    later.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        }

        let outcome = tree.click(link).unwrap();
        assert_eq!(later.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.listeners_run, 1);
        assert!(outcome.default_prevented);
        assert_eq!(outcome.navigated_to, None);
        assert_eq!(tree.location(), "http://localhost/");
        assert!(tree.history().is_empty());
    }
}
