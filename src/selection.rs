use std::{borrow::Cow, collections::HashSet};

use scraper::{ElementRef, Html, Selector};

use crate::tag::{Extract, Tag};

/// An ordered set of matched elements forming the current decode scope.
///
/// Selections borrow the parsed [`Html`] and are never mutated: narrowing
/// always produces a new selection.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    nodes: Vec<ElementRef<'a>>,
    document: bool,
}

impl<'a> Selection<'a> {
    /// The whole document. Narrowing it also considers the root element itself.
    pub fn document(html: &'a Html) -> Self {
        Self {
            nodes: vec![html.root_element()],
            document: true,
        }
    }

    /// A selection over an explicit node list, duplicates removed.
    ///
    /// A list holding the root element keeps document semantics, so the
    /// nodes handed to a custom unmarshaler at the top level behave like
    /// [`Selection::document`].
    pub fn from_nodes<I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = ElementRef<'a>>,
    {
        let mut seen = HashSet::new();
        let nodes: Vec<_> = nodes
            .into_iter()
            .filter(|node| seen.insert((**node).id()))
            .collect();
        let document = nodes.iter().any(is_document_root);
        Self { nodes, document }
    }

    /// A selection matching nothing.
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            document: false,
        }
    }

    /// The descendants of every node in this selection that match `selector`,
    /// in the order they are first found.
    ///
    /// An empty selector returns this selection unchanged. A selector that
    /// cannot be compiled matches nothing.
    pub fn find(&self, selector: &str) -> Selection<'a> {
        let selector = selector.trim();
        if selector.is_empty() {
            return self.clone();
        }

        let compiled = match Selector::parse(selector) {
            Ok(compiled) => compiled,
            Err(err) => {
                log::warn!("Selector '{selector}' could not be compiled, matching nothing: {err}");
                return Self::empty();
            }
        };

        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        for node in &self.nodes {
            if self.document
                && is_document_root(node)
                && compiled.matches(node)
                && seen.insert((**node).id())
            {
                nodes.push(*node);
            }
            for found in node.select(&compiled) {
                if seen.insert((*found).id()) {
                    nodes.push(found);
                }
            }
        }

        log::trace!("Selector '{selector}' matched {} nodes", nodes.len());
        Self {
            nodes,
            document: false,
        }
    }

    /// Narrows by the tag's selector, borrowing this selection when the tag
    /// has none.
    pub fn narrow(&self, tag: &Tag<'_>) -> Cow<'_, Selection<'a>> {
        match tag.selector() {
            "" => Cow::Borrowed(self),
            selector => Cow::Owned(self.find(selector)),
        }
    }

    /// The matched nodes in order.
    pub fn nodes(&self) -> &[ElementRef<'a>] {
        &self.nodes
    }

    /// Number of matched nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether nothing matched.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// A selection holding only the node at `index`.
    pub fn get(&self, index: usize) -> Option<Selection<'a>> {
        self.nodes.get(index).map(|node| self.single(node))
    }

    /// One single-node selection per matched node.
    pub fn iter(&self) -> impl Iterator<Item = Selection<'a>> + '_ {
        self.nodes.iter().map(|node| self.single(node))
    }

    fn single(&self, node: &ElementRef<'a>) -> Selection<'a> {
        Self {
            nodes: vec![*node],
            document: self.document && is_document_root(node),
        }
    }

    /// Concatenated text content of every matched node, trimmed.
    pub fn text(&self) -> String {
        let text: String = self.nodes.iter().flat_map(|node| node.text()).collect();
        text.trim().to_owned()
    }

    /// Attributes of `node` as `(name, value)` pairs.
    pub fn attributes(node: ElementRef<'a>) -> Vec<(&'a str, &'a str)> {
        node.value().attrs().collect()
    }

    /// Value of the attribute `name` on the first matched node.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.nodes.first().and_then(|node| node.value().attr(name))
    }

    /// Inner HTML of the first matched node, empty when nothing matched.
    pub fn inner_html(&self) -> String {
        self.nodes
            .first()
            .map(|node| node.inner_html())
            .unwrap_or_default()
    }

    /// The trimmed string a leaf value is read from.
    pub fn value(&self, extract: Extract<'_>) -> String {
        match extract {
            Extract::Text => self.text(),
            Extract::Html => self.inner_html().trim().to_owned(),
            Extract::Attr(name) => self.attr(name).unwrap_or_default().trim().to_owned(),
        }
    }
}

fn is_document_root(node: &ElementRef<'_>) -> bool {
    node.parent().is_some_and(|parent| parent.value().is_document())
}
