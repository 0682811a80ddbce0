//! View tree: the mounted element hierarchy playback writes into.
//!
//! The tree is ephemeral view state: every run rebuilds it from the script
//! and discards it on scene change or stop. It carries no data the scripts
//! depend on. Click listeners are one-shot and owned by the tree so that a
//! reset can never leave one behind.

mod mount;

use std::collections::HashMap;

use tokio::sync::oneshot;

use crate::sprites::Visual;

pub use mount::Mount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// What activating a button does in the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    Close,
    /// The launcher's terminal button: short press and long press differ.
    Launch,
}

/// A rendered sprite attached to the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteInstance {
    pub name: String,
    pub frame: usize,
    pub visual: Visual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Block,
    /// Sprite area with a ground line.
    Stage,
    /// A line of text; typed content lives in `Element::text`.
    Text,
    Cursor,
    Sprite(SpriteInstance),
    Button(UiAction),
    Meter { fill: u8 },
    Connection { broken: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub kind: ElementKind,
    pub classes: Vec<String>,
    pub text: String,
    /// Column inside the parent stage.
    pub x: i32,
    /// Row inside the parent stage; `None` stands the element on the ground.
    pub y: Option<i32>,
    pub hidden: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        Element {
            kind,
            classes: Vec::new(),
            text: String::new(),
            x: 0,
            y: None,
            hidden: false,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn block(class: &str) -> Self {
        Element::new(ElementKind::Block).with_class(class)
    }

    /// Add one or more space-separated classes.
    pub fn with_class(mut self, classes: &str) -> Self {
        for class in classes.split_whitespace() {
            if !self.has_class(class) {
                self.classes.push(class.to_string());
            }
        }
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn at(mut self, x: i32, y: Option<i32>) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn sprite(&self) -> Option<&SpriteInstance> {
        match &self.kind {
            ElementKind::Sprite(instance) => Some(instance),
            _ => None,
        }
    }
}

pub struct ViewTree {
    nodes: HashMap<NodeId, Element>,
    root: NodeId,
    next_node: u32,
    listeners: Vec<(ListenerId, oneshot::Sender<()>)>,
    next_listener: u64,
}

const ROOT_CLASS: &str = "mount";

impl Default for ViewTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewTree {
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, Element::block(ROOT_CLASS));
        ViewTree {
            nodes,
            root,
            next_node: 1,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of attached elements, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root_children().is_empty()
    }

    pub fn root_children(&self) -> &[NodeId] {
        self.children(self.root)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map(|e| e.children()).unwrap_or(&[])
    }

    /// Append `element` as the last child of `parent`. Returns `None` when the
    /// parent is no longer attached.
    pub fn append(&mut self, parent: NodeId, mut element: Element) -> Option<NodeId> {
        if !self.nodes.contains_key(&parent) {
            return None;
        }
        let id = NodeId(self.next_node);
        self.next_node += 1;
        element.parent = Some(parent);
        element.children.clear();
        self.nodes.insert(id, element);
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        Some(id)
    }

    /// Detach and drop `id` with its whole subtree. The root is only cleared.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            self.clear(id);
            return;
        }
        let Some(element) = self.nodes.get(&id) else {
            return;
        };
        if let Some(parent) = element.parent {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.retain(|c| *c != id);
            }
        }
        self.drop_subtree(id);
    }

    /// Drop every child of `id`.
    pub fn clear(&mut self, id: NodeId) {
        let children = match self.nodes.get_mut(&id) {
            Some(element) => std::mem::take(&mut element.children),
            None => return,
        };
        for child in children {
            self.drop_subtree(child);
        }
    }

    fn drop_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(element) = self.nodes.remove(&next) {
                stack.extend(element.children);
            }
        }
    }

    /// Empty the mount point and detach every pending listener.
    pub fn reset(&mut self) {
        self.clear(self.root);
        if let Some(root) = self.nodes.get_mut(&self.root) {
            root.classes = vec![ROOT_CLASS.to_string()];
        }
        self.listeners.clear();
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(element) = self.nodes.get_mut(&id) {
            if !element.has_class(class) {
                element.classes.push(class.to_string());
            }
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(element) = self.nodes.get_mut(&id) {
            element.classes.retain(|c| c != class);
        }
    }

    pub fn push_text(&mut self, id: NodeId, ch: char) -> bool {
        match self.nodes.get_mut(&id) {
            Some(element) => {
                element.text.push(ch);
                true
            }
            None => false,
        }
    }

    /// Element ids in document order, starting at the root.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    pub fn find_by_class(&self, class: &str) -> Vec<NodeId> {
        self.walk()
            .into_iter()
            .filter(|id| self.get(*id).is_some_and(|e| e.has_class(class)))
            .collect()
    }

    pub fn first_by_class(&self, class: &str) -> Option<NodeId> {
        self.find_by_class(class).into_iter().next()
    }

    /// Text of `id` and its descendants, concatenated in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(element) = self.get(next) {
                out.push_str(&element.text);
                stack.extend(element.children.iter().rev().copied());
            }
        }
        out
    }

    // -----------------------------------------------------------------------
    // One-shot click listeners
    // -----------------------------------------------------------------------

    pub fn add_click_listener(&mut self, tx: oneshot::Sender<()>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, tx));
        id
    }

    pub fn remove_click_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        before != self.listeners.len()
    }

    pub fn click_listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver a click on the mount point. Every listener fires once and is
    /// detached. Returns how many listeners were notified.
    pub fn dispatch_click(&mut self) -> usize {
        let listeners = std::mem::take(&mut self.listeners);
        let mut notified = 0;
        for (_, tx) in listeners {
            if tx.send(()).is_ok() {
                notified += 1;
            }
        }
        notified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_walk_in_document_order() {
        let mut tree = ViewTree::new();
        let root = tree.root();
        let a = tree.append(root, Element::block("a")).unwrap();
        let b = tree.append(root, Element::block("b")).unwrap();
        let a1 = tree.append(a, Element::block("a1")).unwrap();
        assert_eq!(tree.walk(), vec![root, a, a1, b]);
    }

    #[test]
    fn append_to_detached_parent_fails() {
        let mut tree = ViewTree::new();
        let a = tree.append(tree.root(), Element::block("a")).unwrap();
        tree.remove(a);
        assert!(tree.append(a, Element::block("x")).is_none());
    }

    #[test]
    fn remove_drops_whole_subtree() {
        let mut tree = ViewTree::new();
        let a = tree.append(tree.root(), Element::block("a")).unwrap();
        tree.append(a, Element::block("a1")).unwrap();
        tree.append(a, Element::block("a2")).unwrap();
        assert_eq!(tree.len(), 4);
        tree.remove(a);
        assert_eq!(tree.len(), 1);
        assert!(tree.is_empty());
    }

    #[test]
    fn text_content_concatenates_descendants() {
        let mut tree = ViewTree::new();
        let line = tree
            .append(tree.root(), Element::new(ElementKind::Text).with_text("O"))
            .unwrap();
        tree.push_text(line, 'K');
        assert_eq!(tree.text_content(tree.root()), "OK");
    }

    #[test]
    fn with_class_splits_and_dedupes() {
        let el = Element::block("game-text error").with_class("error");
        assert_eq!(el.classes, vec!["game-text", "error"]);
    }

    #[test]
    fn click_fires_each_listener_once() {
        let mut tree = ViewTree::new();
        let (tx, mut rx) = oneshot::channel();
        tree.add_click_listener(tx);
        assert_eq!(tree.dispatch_click(), 1);
        assert_eq!(tree.click_listener_count(), 0);
        assert!(rx.try_recv().is_ok());
        assert_eq!(tree.dispatch_click(), 0);
    }

    #[test]
    fn reset_drops_listeners_and_children() {
        let mut tree = ViewTree::new();
        let root = tree.root();
        tree.add_class(root, "terminal-game");
        tree.append(root, Element::block("game-scene")).unwrap();
        let (tx, _rx) = oneshot::channel();
        tree.add_click_listener(tx);
        tree.reset();
        assert!(tree.is_empty());
        assert_eq!(tree.click_listener_count(), 0);
        assert!(!tree.get(root).unwrap().has_class("terminal-game"));
    }
}
