//! Arena-backed document tree.
//!
//! Nodes live in a flat `Vec` and refer to each other by [`NodeId`]. Detached
//! nodes stay in the arena; they are simply unreachable from the root.

use tracing::debug;

use super::tokenizer::{tokenize, Attribute, ParseError, Token};

/// Elements whose text is not page content, or must stay plain text.
const TEXT_ONLY_CONTAINERS: &[&str] = &["head", "title", "textarea", "script", "style", "template"];

const HEAD_CONTENT: &[&str] = &[
    "head", "title", "meta", "link", "style", "script", "base", "noscript",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub name: String,
    pub attributes: Vec<Attribute>,
}

impl ElementData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(existing) = self.attributes.iter_mut().find(|a| a.name == name) {
            existing.value = value;
        } else {
            self.attributes.push(Attribute::new(name, value));
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(pos).value)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id").filter(|id| !id.is_empty())
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Doctype(String),
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

// Starting one of these closes an open <p>.
fn closes_paragraph(name: &str) -> bool {
    matches!(
        name,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "details"
            | "dialog"
            | "div"
            | "dl"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hgroup"
            | "hr"
            | "main"
            | "menu"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "table"
            | "ul"
    )
}

fn is_phrasing(name: &str) -> bool {
    matches!(
        name,
        "a" | "abbr"
            | "b"
            | "bdi"
            | "bdo"
            | "cite"
            | "code"
            | "data"
            | "dfn"
            | "em"
            | "font"
            | "i"
            | "kbd"
            | "mark"
            | "q"
            | "s"
            | "samp"
            | "small"
            | "span"
            | "strong"
            | "sub"
            | "sup"
            | "time"
            | "u"
            | "var"
    )
}

pub fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Parse markup into a tree.
    ///
    /// Tree construction is lenient: unmatched end tags are dropped and the
    /// usual optional end tags (`p`, `li`, `dt`, `dd`, `tr`, `td`, `th`,
    /// `option`) are implied. No `html`/`head`/`body` wrappers are invented.
    ///
    /// # Errors
    ///
    /// Returns the tokenizer's [`ParseError`] for markup that cannot be
    /// terminated.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let tokens = tokenize(input)?;
        let mut doc = Self::new();
        let root = doc.root();
        let mut open: Vec<NodeId> = vec![root];

        for token in tokens {
            let current = *open.last().unwrap_or(&root);
            match token {
                Token::Doctype(value) => {
                    let id = doc.push_node(NodeData::Doctype(value));
                    doc.append_child(current, id);
                }
                Token::Comment(value) => {
                    let id = doc.push_node(NodeData::Comment(value));
                    doc.append_child(current, id);
                }
                Token::Text(text) => doc.append_text(current, &text),
                Token::StartTag {
                    name,
                    attributes,
                    self_closing,
                } => {
                    doc.close_implied(&mut open, &name);
                    let parent = *open.last().unwrap_or(&root);
                    let id = doc.push_node(NodeData::Element(ElementData { name, attributes }));
                    doc.append_child(parent, id);
                    if !self_closing {
                        open.push(id);
                    }
                }
                Token::EndTag(name) => {
                    let matching = open
                        .iter()
                        .rposition(|id| doc.tag_name(*id) == Some(name.as_str()));
                    match matching {
                        Some(pos) if pos > 0 => open.truncate(pos),
                        _ => debug!(tag = %name, "ignoring unmatched end tag"),
                    }
                }
            }
        }
        Ok(doc)
    }

    fn close_implied(&self, open: &mut Vec<NodeId>, name: &str) {
        if closes_paragraph(name) {
            for pos in (1..open.len()).rev() {
                match self.tag_name(open[pos]) {
                    Some("p") => {
                        open.truncate(pos);
                        break;
                    }
                    Some(tag) if is_phrasing(tag) => {}
                    _ => break,
                }
            }
        }
        if is_heading(name) && open.last().and_then(|id| self.tag_name(*id)).is_some_and(is_heading)
        {
            open.pop();
        }
        let (targets, boundaries): (&[&str], &[&str]) = match name {
            "li" => (&["li"], &["ul", "ol", "menu", "table"]),
            "dt" | "dd" => (&["dt", "dd"], &["dl", "table"]),
            "tr" => (&["tr"], &["table", "thead", "tbody", "tfoot"]),
            "td" | "th" => (&["td", "th"], &["tr", "table"]),
            "thead" | "tbody" | "tfoot" => (&["thead", "tbody", "tfoot"], &["table"]),
            "option" => (&["option"], &["select", "datalist", "optgroup"]),
            _ => return,
        };
        for pos in (1..open.len()).rev() {
            let Some(tag) = self.tag_name(open[pos]) else {
                break;
            };
            if targets.contains(&tag) {
                open.truncate(pos);
                return;
            }
            if boundaries.contains(&tag) {
                return;
            }
        }
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    // Appends text, merging with a trailing text sibling.
    fn append_text(&mut self, parent: NodeId, text: &str) {
        if let Some(last) = self.nodes[parent.0].children.last().copied() {
            if let NodeData::Text(existing) = &mut self.nodes[last.0].data {
                existing.push_str(text);
                return;
            }
        }
        let id = self.push_node(NodeData::Text(text.to_string()));
        self.append_child(parent, id);
    }

    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.name.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.element(*child).is_some())
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |node| self.parent(*node))
    }

    /// Pre-order traversal of everything below `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// All elements of the document in document order.
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(self.root())
            .filter(|id| self.element(*id).is_some())
    }

    pub fn elements_by_tag<'a>(&'a self, name: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.elements()
            .filter(move |id| self.tag_name(*id) == Some(name))
    }

    pub fn has_ancestor(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(id).any(|node| node == ancestor)
    }

    pub fn has_ancestor_tag(&self, id: NodeId, names: &[&str]) -> bool {
        self.ancestors(id)
            .filter_map(|node| self.tag_name(node))
            .any(|tag| names.contains(&tag))
    }

    /// The `html` element, if present.
    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root())
            .find(|id| self.tag_name(*id) == Some("html"))
    }

    /// The `body` element, falling back to `html` and then the root for
    /// fragments.
    pub fn body(&self) -> NodeId {
        self.elements_by_tag("body")
            .next()
            .or_else(|| self.document_element())
            .unwrap_or_else(|| self.root())
    }

    /// Where content goes to appear first on the page: the parent and the
    /// child to insert before. Without a `body` element, a leading doctype,
    /// comments, whitespace and head content stay in front.
    pub fn content_start(&self) -> (NodeId, Option<NodeId>) {
        let body = self.body();
        let children = self.children(body);
        if self.tag_name(body) == Some("body") {
            return (body, children.first().copied());
        }
        let first = children.iter().copied().find(|id| match &self.nodes[id.0].data {
            NodeData::Doctype(_) | NodeData::Comment(_) => false,
            NodeData::Text(text) => !text.trim().is_empty(),
            NodeData::Element(el) => !HEAD_CONTENT.contains(&el.name.as_str()),
            NodeData::Document => true,
        });
        (body, first)
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements()
            .find(|node| self.element(*node).and_then(ElementData::id) == Some(id))
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Text nodes below `root` that hold document prose, skipping `script`,
    /// `style` and `template` bodies.
    pub fn text_nodes(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .filter(|id| self.text(*id).is_some())
            .filter(|id| !self.has_ancestor_tag(*id, TEXT_ONLY_CONTAINERS))
            .collect()
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push_node(NodeData::Element(ElementData::new(name)))
    }

    pub fn create_element_with(&mut self, name: &str, attributes: &[(&str, &str)]) -> NodeId {
        let mut data = ElementData::new(name);
        for (attr, value) in attributes {
            data.set_attr(attr, *value);
        }
        self.push_node(NodeData::Element(data))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeData::Text(text.into()))
    }

    /// Remove `id` from its parent. The node and its subtree stay usable.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `child` before `reference` under `parent`. A `reference` that is
    /// not a child of `parent` appends.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        let siblings = &mut self.nodes[parent.0].children;
        let index = reference
            .and_then(|r| siblings.iter().position(|c| *c == r))
            .unwrap_or(siblings.len());
        siblings.insert(index, child);
    }

    /// Replace `old` with `replacements`, in order. Returns false when `old`
    /// has no parent.
    pub fn replace_with(&mut self, old: NodeId, replacements: &[NodeId]) -> bool {
        let Some(parent) = self.parent(old) else {
            return false;
        };
        for &node in replacements {
            self.insert_before(parent, node, Some(old));
        }
        self.detach(old);
        true
    }

    /// Replace all children of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if let NodeData::Text(existing) = &mut self.nodes[id.0].data {
            *existing = text.to_string();
            return;
        }
        for child in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[child.0].parent = None;
        }
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node);
        }
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        self.element_children(parent)
            .take_while(|sibling| *sibling != id)
            .last()
    }

    /// 1-based position among element siblings.
    pub fn element_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.element_children(parent)
            .position(|sibling| sibling == id)
            .map(|pos| pos + 1)
    }

    pub fn element_sibling_count(&self, id: NodeId) -> usize {
        self.parent(id)
            .map_or(1, |parent| self.element_children(parent).count())
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}
