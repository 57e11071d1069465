//! Arena-backed element tree that the widgets read and mutate.
//!
//! Nodes are never freed. A [`NodeId`] stays valid for the life of the [`Dom`],
//! including for nodes that have been detached from the document.

use std::collections::{HashMap, HashSet};

use crate::selector::{SelectorCombinator, SelectorPart, SelectorStep, parse_selector_groups};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    tag_name: String,
    // Insertion order is kept so dumps are stable.
    attrs: Vec<(String, String)>,
    value: String,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        if let Some(slot) = self.attrs.iter_mut().find(|(key, _)| key == name) {
            slot.1 = value.to_string();
        } else {
            self.attrs.push((name.to_string(), value.to_string()));
        }
    }

    fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(key, _)| key != name);
    }

    fn has_class(&self, class_name: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class_name))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
    root: NodeId,
    id_index: HashMap<String, NodeId>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    pub fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
        }
    }

    /// The document node. Every attached element descends from it.
    pub fn root(&self) -> NodeId {
        self.root
    }

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: &str,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        let value = attrs
            .iter()
            .find(|(key, _)| key == "value")
            .map(|(_, value)| value.clone())
            .unwrap_or_default();
        let element = Element {
            tag_name: tag_name.to_ascii_lowercase(),
            attrs,
            value,
        };
        let id = self.create_node(Some(parent), NodeType::Element(element));
        if let Some(id_attr) = self.attr(id, "id") {
            self.id_index.entry(id_attr).or_insert(id);
        }
        id
    }

    pub fn create_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text.to_string()))
    }

    /// Unlinks `node_id` from its parent. The subtree stays in the arena and
    /// drops out of the id index.
    pub fn detach(&mut self, node_id: NodeId) {
        let Some(parent) = self.parent(node_id) else {
            return;
        };
        self.nodes[parent.0].children.retain(|child| *child != node_id);
        self.nodes[node_id.0].parent = None;

        let mut subtree = vec![node_id];
        self.collect_elements_descendants_dfs(node_id, &mut subtree);
        self.id_index.retain(|_, indexed| !subtree.contains(indexed));
    }

    fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes.get(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    fn require_element_mut(&mut self, node_id: NodeId, op: &str) -> Result<&mut Element> {
        self.element_mut(node_id)
            .ok_or_else(|| Error::Dom(format!("{op} target is not an element")))
    }

    pub fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id.0).and_then(|node| node.parent)
    }

    /// Ancestor-or-self test, matching `Node.contains`.
    pub fn contains(&self, ancestor: NodeId, node_id: NodeId) -> bool {
        let mut cursor = Some(node_id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub fn is_connected(&self, node_id: NodeId) -> bool {
        self.contains(self.root, node_id)
    }

    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    /// Concatenated text of the subtree. `None` for a node this document does
    /// not own.
    pub fn text_content(&self, node_id: NodeId) -> Option<String> {
        let node = self.nodes.get(node_id.0)?;
        match &node.node_type {
            NodeType::Document | NodeType::Element(_) => Some(
                node.children
                    .iter()
                    .filter_map(|child| self.text_content(*child))
                    .collect(),
            ),
            NodeType::Text(text) => Some(text.clone()),
        }
    }

    pub fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.element(node_id)
            .and_then(|e| e.attr(&name.to_ascii_lowercase()).map(ToOwned::to_owned))
    }

    pub fn set_attr(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let lowered = name.to_ascii_lowercase();
        let connected = self.is_connected(node_id);
        let old_id = self.attr(node_id, "id");
        {
            let element = self.require_element_mut(node_id, "setAttribute")?;
            element.set_attr(&lowered, value);
            if lowered == "value" {
                element.value = value.to_string();
            }
        }

        if lowered == "id" && connected {
            if let Some(old_id) = old_id {
                if self.id_index.get(&old_id) == Some(&node_id) {
                    self.id_index.remove(&old_id);
                }
            }
            self.id_index.entry(value.to_string()).or_insert(node_id);
        }
        Ok(())
    }

    pub fn value(&self, node_id: NodeId) -> Result<String> {
        let element = self
            .element(node_id)
            .ok_or_else(|| Error::Dom("value target is not an element".into()))?;
        Ok(element.value.clone())
    }

    /// Sets the live form value. The `value` attribute (the default value) is
    /// left alone.
    pub fn set_value(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        let element = self.require_element_mut(node_id, "value")?;
        element.value = value.to_string();
        Ok(())
    }

    pub fn class_list(&self, node_id: NodeId) -> Result<Vec<String>> {
        let element = self
            .element(node_id)
            .ok_or_else(|| Error::Dom("classList target is not an element".into()))?;
        Ok(class_tokens(element.attr("class")))
    }

    pub fn class_contains(&self, node_id: NodeId, class_name: &str) -> Result<bool> {
        let element = self
            .element(node_id)
            .ok_or_else(|| Error::Dom("classList target is not an element".into()))?;
        Ok(element.has_class(class_name))
    }

    pub fn class_add(&mut self, node_id: NodeId, class_name: &str) -> Result<()> {
        let element = self.require_element_mut(node_id, "classList")?;
        let mut classes = class_tokens(element.attr("class"));
        if !classes.iter().any(|name| name == class_name) {
            classes.push(class_name.to_string());
        }
        set_class_attr(element, &classes);
        Ok(())
    }

    pub fn class_remove(&mut self, node_id: NodeId, class_name: &str) -> Result<()> {
        let element = self.require_element_mut(node_id, "classList")?;
        let mut classes = class_tokens(element.attr("class"));
        classes.retain(|name| name != class_name);
        set_class_attr(element, &classes);
        Ok(())
    }

    pub fn class_toggle(&mut self, node_id: NodeId, class_name: &str) -> Result<bool> {
        let has = self.class_contains(node_id, class_name)?;
        if has {
            self.class_remove(node_id, class_name)?;
            Ok(false)
        } else {
            self.class_add(node_id, class_name)?;
            Ok(true)
        }
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        let all = self.query_selector_all(selector)?;
        Ok(all.into_iter().next())
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let groups = parse_selector_groups(selector)?;

        if groups.len() == 1 && groups[0].len() == 1 {
            if let Some(id) = groups[0][0].step.id_only() {
                return Ok(self.by_id(id).into_iter().collect());
            }
        }

        let mut ids = Vec::new();
        self.collect_elements_descendants_dfs(self.root, &mut ids);
        Ok(self.filter_matching(ids, &groups))
    }

    /// Descendants of `root` (excluding `root` itself) matching `selector`,
    /// in document order.
    pub fn query_selector_all_from(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let groups = parse_selector_groups(selector)?;
        let mut ids = Vec::new();
        self.collect_elements_descendants_dfs(root, &mut ids);
        Ok(self.filter_matching(ids, &groups))
    }

    fn filter_matching(&self, candidates: Vec<NodeId>, groups: &[Vec<SelectorPart>]) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut matched = Vec::new();
        for candidate in candidates {
            if groups
                .iter()
                .any(|steps| self.matches_selector_chain(candidate, steps))
                && seen.insert(candidate)
            {
                matched.push(candidate);
            }
        }
        matched
    }

    fn collect_elements_descendants_dfs(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        let Some(node) = self.nodes.get(node_id.0) else {
            return;
        };
        for child in &node.children {
            if self.element(*child).is_some() {
                out.push(*child);
            }
            self.collect_elements_descendants_dfs(*child, out);
        }
    }

    fn matches_selector_chain(&self, node_id: NodeId, steps: &[SelectorPart]) -> bool {
        let Some(last) = steps.last() else {
            return false;
        };
        if !self.matches_step(node_id, &last.step) {
            return false;
        }

        let mut current = node_id;
        for idx in (1..steps.len()).rev() {
            let prev_step = &steps[idx - 1].step;
            let combinator = steps[idx]
                .combinator
                .unwrap_or(SelectorCombinator::Descendant);

            let matched = match combinator {
                SelectorCombinator::Child => self
                    .parent(current)
                    .filter(|parent| self.matches_step(*parent, prev_step)),
                SelectorCombinator::Descendant => {
                    let mut cursor = self.parent(current);
                    let mut found = None;
                    while let Some(parent) = cursor {
                        if self.matches_step(parent, prev_step) {
                            found = Some(parent);
                            break;
                        }
                        cursor = self.parent(parent);
                    }
                    found
                }
            };

            let Some(matched) = matched else {
                return false;
            };
            current = matched;
        }

        true
    }

    fn matches_step(&self, node_id: NodeId, step: &SelectorStep) -> bool {
        let Some(element) = self.element(node_id) else {
            return false;
        };

        if let Some(tag) = &step.tag {
            if !element.tag_name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        if let Some(id) = &step.id {
            if element.attr("id") != Some(id.as_str()) {
                return false;
            }
        }

        if step
            .classes
            .iter()
            .any(|class_name| !element.has_class(class_name))
        {
            return false;
        }

        step.attrs.iter().all(|cond| cond.matches(element.attr(cond.key())))
    }

    pub fn dump_node(&self, node_id: NodeId) -> Option<String> {
        let node = self.nodes.get(node_id.0)?;
        let children = || -> String {
            node.children
                .iter()
                .filter_map(|child| self.dump_node(*child))
                .collect()
        };
        let out = match &node.node_type {
            NodeType::Document => children(),
            NodeType::Text(text) => text.clone(),
            NodeType::Element(element) => {
                let mut out = String::new();
                out.push('<');
                out.push_str(&element.tag_name);
                for (k, v) in &element.attrs {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    out.push_str(v);
                    out.push('"');
                }
                out.push('>');
                out.push_str(&children());
                out.push_str("</");
                out.push_str(&element.tag_name);
                out.push('>');
                out
            }
        };
        Some(out)
    }

    /// Short `tag#id.class` label for trace output.
    pub(crate) fn node_label(&self, node_id: NodeId) -> String {
        let Some(element) = self.element(node_id) else {
            return if node_id == self.root {
                "#document".into()
            } else {
                "#text".into()
            };
        };
        let mut label = element.tag_name.clone();
        if let Some(id) = element.attr("id") {
            label.push('#');
            label.push_str(id);
        }
        label
    }
}

fn class_tokens(class_attr: Option<&str>) -> Vec<String> {
    class_attr
        .map(|value| value.split_whitespace().map(ToOwned::to_owned).collect())
        .unwrap_or_default()
}

fn set_class_attr(element: &mut Element, classes: &[String]) {
    if classes.is_empty() {
        element.remove_attr("class");
    } else {
        element.set_attr("class", &classes.join(" "));
    }
}

pub(crate) fn truncate_chars(value: &str, max_chars: usize) -> String {
    let mut it = value.chars();
    let mut out = String::new();
    for _ in 0..max_chars {
        let Some(ch) = it.next() else {
            return out;
        };
        out.push(ch);
    }
    if it.next().is_some() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn contains_is_ancestor_or_self() {
        let mut dom = Dom::new();
        let root = dom.root();
        let nav = dom.create_element(root, "nav", attrs(&[("id", "nav")]));
        let button = dom.create_element(nav, "button", Vec::new());
        let icon = dom.create_element(button, "span", Vec::new());
        let other = dom.create_element(root, "main", Vec::new());

        assert!(dom.contains(button, button));
        assert!(dom.contains(button, icon));
        assert!(dom.contains(nav, icon));
        assert!(!dom.contains(button, nav));
        assert!(!dom.contains(button, other));
    }

    #[test]
    fn class_list_operations_keep_tokens_unique() -> Result<()> {
        let mut dom = Dom::new();
        let root = dom.root();
        let menu = dom.create_element(root, "div", attrs(&[("class", "menu  hidden")]));

        dom.class_add(menu, "hidden")?;
        assert_eq!(dom.class_list(menu)?, vec!["menu", "hidden"]);

        assert!(!dom.class_toggle(menu, "hidden")?);
        assert!(!dom.class_contains(menu, "hidden")?);
        assert!(dom.class_toggle(menu, "hidden")?);
        assert!(dom.class_contains(menu, "hidden")?);

        dom.class_remove(menu, "menu")?;
        dom.class_remove(menu, "hidden")?;
        assert_eq!(dom.attr(menu, "class"), None);
        Ok(())
    }

    #[test]
    fn class_ops_on_text_nodes_are_errors() {
        let mut dom = Dom::new();
        let root = dom.root();
        let text = dom.create_text(root, "hello");
        assert!(matches!(dom.class_add(text, "x"), Err(Error::Dom(_))));
        assert!(matches!(dom.value(text), Err(Error::Dom(_))));
    }

    #[test]
    fn detached_nodes_still_accept_class_removal() -> Result<()> {
        let mut dom = Dom::new();
        let root = dom.root();
        let star = dom.create_element(root, "svg", attrs(&[("id", "s1"), ("class", "shadow-lg")]));
        dom.detach(star);

        assert!(!dom.is_connected(star));
        assert_eq!(dom.by_id("s1"), None);
        dom.class_remove(star, "shadow-lg")?;
        assert!(!dom.class_contains(star, "shadow-lg")?);
        Ok(())
    }

    #[test]
    fn node_ids_from_another_document_are_rejected() {
        let mut big = Dom::new();
        let root = big.root();
        let mut last = root;
        for _ in 0..4 {
            last = big.create_element(root, "p", Vec::new());
        }
        let small = Dom::new();

        assert_eq!(small.text_content(last), None);
        assert_eq!(small.dump_node(last), None);
        assert!(small.query_selector_all_from(last, "p").is_ok_and(|found| found.is_empty()));
        assert_eq!(big.text_content(last).as_deref(), Some(""));
        assert_eq!(big.dump_node(last).as_deref(), Some("<p></p>"));
    }

    #[test]
    fn set_value_does_not_touch_default_value_attribute() -> Result<()> {
        let mut dom = Dom::new();
        let root = dom.root();
        let input = dom.create_element(root, "input", attrs(&[("value", "3")]));
        assert_eq!(dom.value(input)?, "3");

        dom.set_value(input, "5")?;
        assert_eq!(dom.value(input)?, "5");
        assert_eq!(dom.attr(input, "value").as_deref(), Some("3"));
        Ok(())
    }

    #[test]
    fn set_attr_reindexes_id() -> Result<()> {
        let mut dom = Dom::new();
        let root = dom.root();
        let node = dom.create_element(root, "div", attrs(&[("id", "old")]));
        dom.set_attr(node, "id", "new")?;
        assert_eq!(dom.by_id("old"), None);
        assert_eq!(dom.by_id("new"), Some(node));
        Ok(())
    }

    #[test]
    fn query_selector_all_from_excludes_root_and_keeps_document_order() -> Result<()> {
        let mut dom = Dom::new();
        let root = dom.root();
        let stars = dom.create_element(root, "svg", attrs(&[("id", "stars")]));
        let a = dom.create_element(stars, "svg", attrs(&[("data-value", "1")]));
        let wrapper = dom.create_element(stars, "span", Vec::new());
        let b = dom.create_element(wrapper, "svg", attrs(&[("data-value", "2")]));

        assert_eq!(dom.query_selector_all_from(stars, "svg")?, vec![a, b]);
        assert_eq!(dom.query_selector_all("#stars > svg")?, vec![a]);
        assert_eq!(dom.query_selector("[data-value='2']")?, Some(b));
        Ok(())
    }

    #[test]
    fn truncate_chars_marks_cut_output() {
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }
}
