//! Owned, editable SVG element tree.
//!
//! Built from `roxmltree` so flattening can rewrite attributes in place and the result can be
//! serialized back for measurement, icon extraction and rasterization.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::foundation::error::{TesseraError, TesseraResult};

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Handle of a node in a [`Document`].
///
/// For parsed documents the numeric value is the pre-order document position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Pre-order index.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
enum NodeData {
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Clone, Debug)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Editable SVG tree.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
    ids: HashMap<String, NodeId>,
}

impl Document {
    /// Parse SVG markup. The root element must be `<svg>`.
    pub fn parse(markup: &str) -> TesseraResult<Self> {
        let opts = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let xml = roxmltree::Document::parse_with_options(markup, opts)
            .map_err(|e| TesseraError::template_parse(format!("invalid markup: {e}")))?;
        let root = xml.root_element();
        if root.tag_name().name() != "svg" {
            return Err(TesseraError::template_parse(format!(
                "root element must be <svg>, found <{}>",
                root.tag_name().name()
            )));
        }

        let mut doc = Self {
            nodes: Vec::new(),
            ids: HashMap::new(),
        };
        doc.import(root, None);
        Ok(doc)
    }

    fn import(&mut self, node: roxmltree::Node<'_, '_>, parent: Option<NodeId>) {
        let id = NodeId(self.nodes.len());
        let attrs = node
            .attributes()
            .filter_map(|a| {
                let name = match a.namespace() {
                    None => a.name().to_string(),
                    Some(XLINK_NS) => format!("xlink:{}", a.name()),
                    Some(XML_NS) => format!("xml:{}", a.name()),
                    Some(_) => return None,
                };
                Some((name, a.value().to_string()))
            })
            .collect::<Vec<_>>();
        if let Some((_, v)) = attrs.iter().find(|(k, _)| k == "id") {
            self.ids.entry(v.clone()).or_insert(id);
        }
        self.nodes.push(Node {
            data: NodeData::Element {
                name: node.tag_name().name().to_string(),
                attrs,
            },
            parent,
            children: Vec::new(),
        });
        if let Some(p) = parent {
            self.nodes[p.0].children.push(id);
        }

        let keeps_text = matches!(
            node.tag_name().name(),
            "text" | "tspan" | "textPath" | "style" | "title"
        );
        for child in node.children() {
            if child.is_element() {
                let ns = child.tag_name().namespace();
                if ns.is_none() || ns == Some(SVG_NS) {
                    self.import(child, Some(id));
                }
            } else if child.is_text() && keeps_text {
                let text_id = NodeId(self.nodes.len());
                self.nodes.push(Node {
                    data: NodeData::Text(child.text().unwrap_or_default().to_string()),
                    parent: Some(id),
                    children: Vec::new(),
                });
                self.nodes[id.0].children.push(text_id);
            }
        }
    }

    /// Root `<svg>` element.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Element with the given `id` attribute.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }

    /// Element name, or `None` for text nodes.
    pub fn name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { name, .. } => Some(name),
            NodeData::Text(_) => None,
        }
    }

    /// Whether `node` is an element.
    pub fn is_element(&self, node: NodeId) -> bool {
        self.name(node).is_some()
    }

    /// Parent node.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    /// Direct children (elements and text).
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// Direct element children.
    pub fn element_children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(node)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
    }

    /// `node` and all its descendants in pre-order.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Pre-order document position, usable to order elements by paint order.
    pub fn position(&self, node: NodeId) -> usize {
        node.0
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.parent(n);
        }
        false
    }

    /// Attribute value.
    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            NodeData::Text(_) => None,
        }
    }

    /// Attribute parsed as a finite number (a trailing `px` is accepted).
    pub fn attr_f64(&self, node: NodeId, name: &str) -> Option<f64> {
        parse_length(self.attr(node, name)?)
    }

    /// Set (or add) an attribute.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        if name == "id" {
            self.ids.insert(value.clone(), node);
        }
        if let NodeData::Element { attrs, .. } = &mut self.nodes[node.0].data {
            match attrs.iter_mut().find(|(k, _)| k == name) {
                Some(slot) => slot.1 = value,
                None => attrs.push((name.to_string(), value)),
            }
        }
    }

    /// Change the tag name of an element.
    pub fn rename(&mut self, node: NodeId, new_name: &str) {
        if let NodeData::Element { name, .. } = &mut self.nodes[node.0].data {
            *name = new_name.to_string();
        }
    }

    /// Remove an attribute if present.
    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[node.0].data {
            attrs.retain(|(k, _)| k != name);
        }
    }

    /// Property from the inline `style` attribute.
    pub fn style_property(&self, node: NodeId, prop: &str) -> Option<String> {
        let style = self.attr(node, "style")?;
        style.split(';').find_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            (k.trim() == prop).then(|| v.trim().to_string())
        })
    }

    /// Remove a property from the inline `style` attribute.
    pub fn remove_style_property(&mut self, node: NodeId, prop: &str) {
        let Some(style) = self.attr(node, "style") else {
            return;
        };
        let kept: Vec<String> = style
            .split(';')
            .filter(|decl| {
                decl.split_once(':')
                    .is_none_or(|(k, _)| k.trim() != prop)
            })
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();
        if kept.is_empty() {
            self.remove_attr(node, "style");
        } else {
            self.set_attr(node, "style", kept.join(";"));
        }
    }

    /// Presentation property: inline style wins over the attribute of the same name.
    pub fn presentation(&self, node: NodeId, prop: &str) -> Option<String> {
        self.style_property(node, prop)
            .or_else(|| self.attr(node, prop).map(str::to_string))
    }

    /// `href` or `xlink:href`.
    pub fn href(&self, node: NodeId) -> Option<&str> {
        self.attr(node, "href")
            .or_else(|| self.attr(node, "xlink:href"))
    }

    /// Resolve `url(#id)`, `url('#id')` or `#id` to an element.
    pub fn resolve_reference(&self, value: &str) -> Option<NodeId> {
        let v = value.trim();
        let inner = v
            .strip_prefix("url(")
            .and_then(|r| r.strip_suffix(')'))
            .map(|r| r.trim().trim_matches(['"', '\'']))
            .unwrap_or(v);
        let id = inner.strip_prefix('#')?;
        self.element_by_id(id)
    }

    /// Concatenated text of `node` and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        for n in self.descendants(node) {
            if let NodeData::Text(t) = &self.nodes[n.0].data {
                out.push_str(t);
            }
        }
        out
    }

    /// Text split into lines: one line per direct `<tspan>` child when present, otherwise the
    /// whole text content. Lines are trimmed and blank lines dropped.
    pub fn text_lines(&self, node: NodeId) -> Vec<String> {
        let spans: Vec<NodeId> = self
            .element_children(node)
            .filter(|&c| self.name(c) == Some("tspan"))
            .collect();
        let raw: Vec<String> = if spans.is_empty() {
            self.text_content(node).lines().map(str::to_string).collect()
        } else {
            spans.iter().map(|&s| self.text_content(s)).collect()
        };
        raw.into_iter()
            .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|l| !l.is_empty())
            .collect()
    }

    /// Replace the children of `node` with one text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        let text_id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data: NodeData::Text(text.to_string()),
            parent: Some(node),
            children: Vec::new(),
        });
        let old = std::mem::replace(&mut self.nodes[node.0].children, vec![text_id]);
        for c in old {
            self.nodes[c.0].parent = None;
        }
    }

    /// Serialize the whole document.
    pub fn to_svg_string(&self) -> String {
        let mut out = String::new();
        self.write_node(&mut out, self.root(), true);
        out
    }

    /// Serialize `node` as a self-contained SVG document of the given size and view box.
    ///
    /// Root-level `<defs>` and `<style>` are carried over. Elements elsewhere in the document
    /// that the subtree references through `url(#id)` or `href="#id"` are copied into an extra
    /// `<defs>`, following their own references in turn.
    pub fn standalone(&self, node: NodeId, width: f64, height: f64, view_box: &str) -> String {
        let mut out = String::new();
        let _ = write!(out, r#"<svg xmlns="{SVG_NS}" xmlns:xlink="{XLINK_NS}""#);
        let _ = write!(
            out,
            r#" width="{width}" height="{height}" viewBox="{}">"#,
            escape_attr(view_box)
        );
        let carried: Vec<NodeId> = self
            .element_children(self.root())
            .filter(|&c| c != node && matches!(self.name(c), Some("defs" | "style")))
            .collect();
        for &c in &carried {
            self.write_node(&mut out, c, false);
        }
        let extra = self.external_references(node, &carried);
        if !extra.is_empty() {
            out.push_str("<defs>");
            for n in extra {
                self.write_node(&mut out, n, false);
            }
            out.push_str("</defs>");
        }
        self.write_node(&mut out, node, false);
        out.push_str("</svg>");
        out
    }

    /// Outermost elements outside `node` and `carried` that `node` depends on, in document order.
    fn external_references(&self, node: NodeId, carried: &[NodeId]) -> Vec<NodeId> {
        let covered = |n: NodeId| {
            self.is_ancestor_or_self(node, n)
                || carried.iter().any(|&c| self.is_ancestor_or_self(c, n))
        };
        let mut found: Vec<NodeId> = Vec::new();
        let mut queue = self.descendants(node);
        while let Some(n) = queue.pop() {
            let NodeData::Element { attrs, .. } = &self.nodes[n.0].data else {
                continue;
            };
            for (k, v) in attrs {
                let is_href = k == "href" || k == "xlink:href";
                for id in referenced_ids(v, is_href) {
                    let Some(target) = self.element_by_id(id) else {
                        continue;
                    };
                    if covered(target) || found.contains(&target) {
                        continue;
                    }
                    found.push(target);
                    queue.extend(self.descendants(target));
                }
            }
        }
        let mut outermost: Vec<NodeId> = found
            .iter()
            .copied()
            .filter(|&n| !found.iter().any(|&o| o != n && self.is_ancestor_or_self(o, n)))
            .collect();
        outermost.sort();
        outermost
    }

    fn write_node(&self, out: &mut String, node: NodeId, is_root: bool) {
        match &self.nodes[node.0].data {
            NodeData::Text(t) => out.push_str(&escape_text(t)),
            NodeData::Element { name, attrs } => {
                out.push('<');
                out.push_str(name);
                if is_root {
                    let _ = write!(out, r#" xmlns="{SVG_NS}" xmlns:xlink="{XLINK_NS}""#);
                }
                for (k, v) in attrs {
                    let _ = write!(out, r#" {k}="{}""#, escape_attr(v));
                }
                let children = self.children(node);
                if children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for &c in children {
                    self.write_node(out, c, false);
                }
                let _ = write!(out, "</{name}>");
            }
        }
    }
}

/// Ids named by `url(#id)` inside `value`, or by a whole `#id` when `value` is an href.
fn referenced_ids(value: &str, is_href: bool) -> Vec<&str> {
    if is_href {
        return value.trim().strip_prefix('#').into_iter().collect();
    }
    let mut ids = Vec::new();
    let mut rest = value;
    while let Some(i) = rest.find("url(") {
        rest = &rest[i + 4..];
        let Some(end) = rest.find(')') else {
            break;
        };
        let inner = rest[..end].trim().trim_matches(['"', '\'']);
        if let Some(id) = inner.strip_prefix('#') {
            ids.push(id);
        }
        rest = &rest[end + 1..];
    }
    ids
}

/// Parse an SVG length; `px` and bare numbers only.
pub fn parse_length(s: &str) -> Option<f64> {
    let t = s.trim();
    let t = t.strip_suffix("px").unwrap_or(t).trim();
    t.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
#[path = "../../tests/unit/markup/document.rs"]
mod tests;
