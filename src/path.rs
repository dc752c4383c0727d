//! Target paths: where in the document a handler has to be bound

use std::fmt;

use crate::dom::{Document, ElementId};

/// Identifier of the host page's navigation container
pub const GLOBAL_NAVIGATION_ID: &str = "global-navigation";

/// Class carried by the user menu once a user is authenticated
pub const AUTHENTICATED_CLASS: &str = "js-user-authenticated";

/// Class of the user popup revealed by a click on the menu trigger
pub const POPUP_CLASS: &str = "popup";

/// One lookup step, applied to the element found by the previous step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Element by identifier, looked up from the document root
    Id(String),
    /// `index`-th descendant carrying a class
    Class { name: String, index: usize },
    /// `index`-th descendant with a tag name
    Tag { name: String, index: usize },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Id(id) => write!(f, "#{id}"),
            Step::Class { name, index } => write!(f, ".{name}[{index}]"),
            Step::Tag { name, index } => write!(f, "{name}[{index}]"),
        }
    }
}

/// Ordered, immutable sequence of lookup steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPath {
    steps: Vec<Step>,
}

impl TargetPath {
    /// Start a path at the element carrying `id`
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            steps: vec![Step::Id(id.into())],
        }
    }

    pub fn class(mut self, name: impl Into<String>, index: usize) -> Self {
        self.steps.push(Step::Class {
            name: name.into(),
            index,
        });
        self
    }

    pub fn tag(mut self, name: impl Into<String>, index: usize) -> Self {
        self.steps.push(Step::Tag {
            name: name.into(),
            index,
        });
        self
    }

    /// `#global-navigation .js-user-authenticated[0] a[0]`
    pub fn menu_trigger() -> Self {
        Self::by_id(GLOBAL_NAVIGATION_ID)
            .class(AUTHENTICATED_CLASS, 0)
            .tag("a", 0)
    }

    /// `#global-navigation .js-user-authenticated[0] .popup[0] a[1]`
    pub fn logout_link() -> Self {
        Self::by_id(GLOBAL_NAVIGATION_ID)
            .class(AUTHENTICATED_CLASS, 0)
            .class(POPUP_CLASS, 0)
            .tag("a", 1)
    }

    /// Walk the path from the document root
    ///
    /// Stops at the first step that finds nothing. An identifier step always
    /// restarts from the root, whatever precedes it.
    pub fn resolve<D: Document + ?Sized>(&self, document: &D) -> Option<ElementId> {
        let mut current: Option<ElementId> = None;
        for step in &self.steps {
            let found = match (step, current) {
                (Step::Id(id), _) => document.element_by_id(id),
                (Step::Class { name, index }, Some(scope)) => {
                    document.element_by_class(scope, name, *index)
                }
                (Step::Tag { name, index }, Some(scope)) => {
                    document.element_by_tag(scope, name, *index)
                }
                // Scoped step without a scope: the path must start with an id
                (_, None) => None,
            };
            current = Some(found?);
        }
        current
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.steps.iter().map(Step::to_string).collect();
        write!(f, "{}", rendered.join(" "))
    }
}
