//! Tree-agnostic view of an element.
//!
//! The link classifier only needs to look at a link's ancestors, so it works
//! over anything implementing [`NodeView`]: parsed HTML from `scraper`, or
//! an [`ElementSnapshot`] built by hand in tests or by a host application
//! that keeps its own DOM.

use scraper::ElementRef;

/// Read-only access to the parts of an element the heuristics inspect.
pub trait NodeView {
    /// Lowercase tag name
    fn tag_name(&self) -> &str;

    /// Value of an attribute, if present
    fn attr(&self, name: &str) -> Option<&str>;

    fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    fn class_name(&self) -> Option<&str> {
        self.attr("class")
    }

    fn role(&self) -> Option<&str> {
        self.attr("role")
    }

    /// Class and id joined and lowercased, for substring matching.
    fn signature(&self) -> String {
        let mut signature = String::new();
        if let Some(class) = self.class_name() {
            signature.push_str(class);
        }
        if let Some(id) = self.id() {
            if !signature.is_empty() {
                signature.push(' ');
            }
            signature.push_str(id);
        }
        signature.to_lowercase()
    }
}

impl NodeView for ElementRef<'_> {
    fn tag_name(&self) -> &str {
        self.value().name()
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.value().attr(name)
    }
}

/// Owned element description, usable as a stand-in for real DOM nodes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementSnapshot {
    pub tag: String,
    pub id: Option<String>,
    pub class: Option<String>,
    pub role: Option<String>,
}

impl ElementSnapshot {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.class = Some(class.to_string());
        self
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    /// Capture any node view into an owned snapshot
    #[cfg(test)]
    pub fn capture<N: NodeView>(node: &N) -> Self {
        Self {
            tag: node.tag_name().to_lowercase(),
            id: node.id().map(str::to_string),
            class: node.class_name().map(str::to_string),
            role: node.role().map(str::to_string),
        }
    }
}

impl NodeView for ElementSnapshot {
    fn tag_name(&self) -> &str {
        &self.tag
    }

    fn attr(&self, name: &str) -> Option<&str> {
        match name {
            "id" => self.id.as_deref(),
            "class" => self.class.as_deref(),
            "role" => self.role.as_deref(),
            _ => None,
        }
    }
}

/// Element ancestors of `element`, nearest first, up to `limit` levels.
pub fn ancestor_chain<'a>(element: &ElementRef<'a>, limit: usize) -> Vec<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn test_snapshot_signature() {
        let node = ElementSnapshot::new("DIV")
            .with_class("Post-Content main")
            .with_id("Body");
        assert_eq!(node.tag_name(), "div");
        assert_eq!(node.signature(), "post-content main body");
        assert_eq!(node.attr("href"), None);
    }

    #[test]
    fn test_ancestor_chain_nearest_first() {
        let doc = Html::parse_document(
            r#"<html><body><div id="outer"><p class="lead"><a href="/x">x</a></p></div></body></html>"#,
        );
        let selector = Selector::parse("a").unwrap();
        let link = doc.select(&selector).next().unwrap();

        let chain = ancestor_chain(&link, 3);
        let tags: Vec<&str> = chain.iter().map(|n| n.tag_name()).collect();
        assert_eq!(tags, vec!["p", "div", "body"]);

        let snapshot = ElementSnapshot::capture(&chain[1]);
        assert_eq!(snapshot.id.as_deref(), Some("outer"));
    }
}
