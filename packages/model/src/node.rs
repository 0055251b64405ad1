//! # Node Tree
//!
//! Document content is a tree of elements and text runs. Offsets inside an
//! element count one per child element and one per character of text, so a
//! text run can be addressed (and split) character by character.
//!
//! Children are kept normalised: adjacent text runs with equal attributes
//! are merged and empty runs dropped. Normalisation never changes an offset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Attributes = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    Element(Element),
    Text(Text),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub data: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl Node {
    pub fn text(data: impl Into<String>) -> Self {
        Node::Text(Text::new(data))
    }

    pub fn element(name: impl Into<String>) -> Self {
        Node::Element(Element::new(name))
    }

    /// Number of offsets this node occupies in its parent.
    pub fn width(&self) -> usize {
        match self {
            Node::Element(_) => 1,
            Node::Text(text) => text.width(),
        }
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            Node::Element(element) => &element.attributes,
            Node::Text(text) => &text.attributes,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes().get(key)
    }

    pub(crate) fn set_attribute(&mut self, key: &str, value: Option<Value>) {
        let attributes = match self {
            Node::Element(element) => &mut element.attributes,
            Node::Text(text) => &mut text.attributes,
        };
        match value {
            Some(value) => {
                attributes.insert(key.to_string(), value);
            }
            None => {
                attributes.remove(key);
            }
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        }
    }
}

/// Total width of a list of nodes.
pub fn width_of(nodes: &[Node]) -> usize {
    nodes.iter().map(Node::width).sum()
}

impl Text {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn width(&self) -> usize {
        self.data.chars().count()
    }

    /// Split off the characters from `at` onwards into a new run.
    fn split_off(&mut self, at: usize) -> Text {
        let byte = self
            .data
            .char_indices()
            .nth(at)
            .map(|(index, _)| index)
            .unwrap_or(self.data.len());
        Text {
            data: self.data.split_off(byte),
            attributes: self.attributes.clone(),
        }
    }
}

impl From<Text> for Node {
    fn from(text: Text) -> Self {
        Node::Text(text)
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self.normalize();
        self
    }

    /// Same name and attributes, no children.
    pub fn empty_copy(&self) -> Element {
        Element {
            name: self.name.clone(),
            attributes: self.attributes.clone(),
            children: Vec::new(),
        }
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Sum of the children's widths.
    pub fn max_offset(&self) -> usize {
        width_of(&self.children)
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(&text.data),
                Node::Element(element) => out.push_str(&element.text_content()),
            }
        }
        out
    }

    /// Child index and start offset of the child covering `offset`.
    fn locate(&self, offset: usize) -> Option<(usize, usize)> {
        let mut start = 0;
        for (index, child) in self.children.iter().enumerate() {
            let width = child.width();
            if offset < start + width {
                return Some((index, start));
            }
            start += width;
        }
        None
    }

    /// The node that begins exactly at `offset`.
    pub fn node_starting_at(&self, offset: usize) -> Option<&Node> {
        match self.locate(offset) {
            Some((index, start)) if start == offset => Some(&self.children[index]),
            _ => None,
        }
    }

    pub fn element_at_offset(&self, offset: usize) -> Option<&Element> {
        self.node_starting_at(offset).and_then(Node::as_element)
    }

    pub(crate) fn element_at_offset_mut(&mut self, offset: usize) -> Option<&mut Element> {
        let (index, start) = self.locate(offset)?;
        if start != offset {
            return None;
        }
        match &mut self.children[index] {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    /// Nodes overlapping `[offset, offset + how_many)`. An empty span
    /// overlaps nothing.
    pub fn nodes_in(&self, offset: usize, how_many: usize) -> Vec<&Node> {
        if how_many == 0 {
            return Vec::new();
        }
        let end = offset + how_many;
        let mut start = 0;
        let mut nodes = Vec::new();
        for child in &self.children {
            let width = child.width();
            if start < end && offset < start + width {
                nodes.push(child);
            }
            start += width;
        }
        nodes
    }

    /// Make sure a child boundary exists at `offset`, splitting a text run
    /// if needed. Returns the index of the first child at or after `offset`.
    fn split_at(&mut self, offset: usize) -> usize {
        match self.locate(offset) {
            None => self.children.len(),
            Some((index, start)) if start == offset => index,
            Some((index, start)) => {
                if let Node::Text(text) = &mut self.children[index] {
                    let tail = text.split_off(offset - start);
                    self.children.insert(index + 1, Node::Text(tail));
                }
                index + 1
            }
        }
    }

    pub(crate) fn insert_nodes(&mut self, offset: usize, nodes: Vec<Node>) {
        let index = self.split_at(offset);
        self.children.splice(index..index, nodes);
        self.normalize();
    }

    pub(crate) fn remove_nodes(&mut self, offset: usize, how_many: usize) -> Vec<Node> {
        if how_many == 0 {
            return Vec::new();
        }
        let first = self.split_at(offset);
        let last = self.split_at(offset + how_many);
        let removed = self.children.drain(first..last).collect();
        self.normalize();
        removed
    }

    pub(crate) fn set_attribute_in(
        &mut self,
        offset: usize,
        how_many: usize,
        key: &str,
        value: Option<&Value>,
    ) {
        let first = self.split_at(offset);
        let last = self.split_at(offset + how_many);
        for child in &mut self.children[first..last] {
            child.set_attribute(key, value.cloned());
        }
        self.normalize();
    }

    fn normalize(&mut self) {
        let mut merged: Vec<Node> = Vec::with_capacity(self.children.len());
        for child in self.children.drain(..) {
            if let Node::Text(text) = &child {
                if text.data.is_empty() {
                    continue;
                }
                if let Some(Node::Text(previous)) = merged.last_mut() {
                    if previous.attributes == text.attributes {
                        previous.data.push_str(&text.data);
                        continue;
                    }
                }
            }
            merged.push(child);
        }
        self.children = merged;
    }
}
