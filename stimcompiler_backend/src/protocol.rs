//! The protocol tree: an ordered forest of Block and Stimulation nodes.
//!
//! ## Storage
//! Nodes live in an arena keyed by [`NodeId`]. Each [`NodeEntry`] records its parent and its
//! ordered children, and the top-level nodes are the children of an implicit, invisible root.
//! Every node has exactly one parent, and since the only structural operations insert fresh
//! leaves or delete whole subtrees, no edit can create a cycle.
//!
//! ## Derived kind
//! A node with children is a Block, a node without is a Stimulation. The kind is read off the
//! child list every time ([`NodeEntry::kind`]); the only thing kept in sync is whether Block
//! parameters are recorded, which [`BaseProtocol::add_child`] and [`BaseProtocol::delete`] do.
//!
//! ## Editing
//! Behavior lives in the [`BaseProtocol`] trait through default methods, and [`Protocol`]
//! supplies the field accessors. Every operation takes its target explicitly (there is no
//! ambient "current node"), validates first and mutates second, so a failed call leaves the
//! protocol exactly as it was.
//!
//! Synthesis never reads the arena directly: it works on a [`ProtocolTree`] snapshot obtained
//! from [`BaseProtocol::snapshot`], a deep copy that does not borrow the protocol.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{ProtocolError, Result};
use crate::node::*;

/// Handle to a node of a [`Protocol`]. Ids are never reused within one protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub fn from_raw(raw: u64) -> Self {
        NodeId(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Arena record of one node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeEntry {
    attrs: NodeAttrs,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeEntry {
    fn new_leaf(parent: Option<NodeId>, name: NodeName) -> Self {
        Self {
            attrs: NodeAttrs {
                name,
                ..Default::default()
            },
            parent,
            children: Vec::new(),
        }
    }

    pub fn attrs(&self) -> &NodeAttrs {
        &self.attrs
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn kind(&self) -> NodeKind {
        if self.children.is_empty() {
            NodeKind::Stimulation
        } else {
            NodeKind::Block
        }
    }
}

/// Deep copy of the whole forest, in playback order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProtocolTree {
    pub roots: Vec<ProtocolNode>,
}

impl ProtocolTree {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn leaf_count(&self) -> usize {
        self.roots.iter().map(|n| n.leaf_count()).sum()
    }
}

impl From<ProtocolNode> for ProtocolTree {
    fn from(node: ProtocolNode) -> Self {
        ProtocolTree { roots: vec![node] }
    }
}

/// Editing behavior of a protocol tree. See the [module documentation](self) for the model.
///
/// Trait methods fall into three groups:
/// 1. Field methods supplied by the implementor: [`entries`](BaseProtocol::entries),
///    [`entries_`](BaseProtocol::entries_), [`top_level`](BaseProtocol::top_level),
///    [`top_level_`](BaseProtocol::top_level_), [`alloc_id_`](BaseProtocol::alloc_id_).
/// 2. Structural edits: [`create_root_node`](BaseProtocol::create_root_node),
///    [`add_sibling`](BaseProtocol::add_sibling), [`add_child`](BaseProtocol::add_child),
///    [`delete`](BaseProtocol::delete).
/// 3. Attribute edits and reads: [`set_attribute`](BaseProtocol::set_attribute),
///    [`get_subtree`](BaseProtocol::get_subtree), [`snapshot`](BaseProtocol::snapshot).
pub trait BaseProtocol {
    // Field methods
    fn entries(&self) -> &IndexMap<NodeId, NodeEntry>;
    fn top_level(&self) -> &Vec<NodeId>;
    // Mutable field references
    fn entries_(&mut self) -> &mut IndexMap<NodeId, NodeEntry>;
    fn top_level_(&mut self) -> &mut Vec<NodeId>;
    /// Hands out a fresh, never used id.
    fn alloc_id_(&mut self) -> NodeId;

    fn is_empty(&self) -> bool {
        self.top_level().is_empty()
    }

    /// Number of nodes in the protocol.
    fn len(&self) -> usize {
        self.entries().len()
    }

    fn contains(&self, id: NodeId) -> bool {
        self.entries().contains_key(&id)
    }

    /// Looks up the entry of a selected node. A missing or stale selection is `NoSelection`.
    fn entry(&self, id: Option<NodeId>) -> Result<&NodeEntry> {
        id.and_then(|id| self.entries().get(&id))
            .ok_or(ProtocolError::NoSelection)
    }

    fn kind(&self, id: Option<NodeId>) -> Result<NodeKind> {
        Ok(self.entry(id)?.kind())
    }

    /// Child list of `parent`, or the top-level list for `None`.
    fn siblings_(&mut self, parent: Option<NodeId>) -> &mut Vec<NodeId> {
        match parent {
            Some(parent) => {
                &mut self
                    .entries_()
                    .get_mut(&parent)
                    .expect("parent of a live node is live")
                    .children
            }
            None => self.top_level_(),
        }
    }

    /// Inserts a new leaf into the arena without linking it to a sibling list.
    fn insert_leaf_(&mut self, parent: Option<NodeId>, name: NodeName) -> NodeId {
        let id = self.alloc_id_();
        self.entries_().insert(id, NodeEntry::new_leaf(parent, name));
        id
    }

    /// Appends a new top-level Stimulation node. Several top-level nodes may coexist; they
    /// play one after the other.
    ///
    /// # Example
    /// ```
    /// use stimcompiler_backend::*;
    ///
    /// let mut protocol = Protocol::new();
    /// let first = protocol.create_root_node(NodeName::Unnamed);
    /// let second = protocol.create_root_node(NodeName::new("baseline"));
    /// assert_eq!(protocol.top_level(), &vec![first, second]);
    /// ```
    fn create_root_node(&mut self, name: NodeName) -> NodeId {
        let id = self.insert_leaf_(None, name);
        self.top_level_().push(id);
        id
    }

    /// Inserts a new Stimulation node right after `anchor`, under the same parent.
    ///
    /// # Errors
    /// `NoSelection` if `anchor` is `None` or no longer exists.
    fn add_sibling(&mut self, anchor: Option<NodeId>) -> Result<NodeId> {
        let parent = self.entry(anchor)?.parent();
        let anchor = anchor.ok_or(ProtocolError::NoSelection)?;
        let id = self.insert_leaf_(parent, NodeName::Unnamed);
        let siblings = self.siblings_(parent);
        let pos = siblings
            .iter()
            .position(|&s| s == anchor)
            .expect("live node is listed by its parent");
        siblings.insert(pos + 1, id);
        Ok(id)
    }

    /// Appends a new Stimulation node as the last child of `anchor`, making `anchor` a Block.
    /// Block parameters are defaulted (`iterations = 1`) if the anchor had none.
    ///
    /// # Example
    /// ```
    /// use stimcompiler_backend::*;
    ///
    /// let mut protocol = Protocol::new();
    /// let block = protocol.create_root_node(NodeName::Unnamed);
    /// let leaf = protocol.add_child(Some(block)).unwrap();
    /// assert_eq!(protocol.kind(Some(block)).unwrap(), NodeKind::Block);
    /// assert_eq!(protocol.kind(Some(leaf)).unwrap(), NodeKind::Stimulation);
    /// assert!(protocol.add_child(None).is_err());
    /// ```
    fn add_child(&mut self, anchor: Option<NodeId>) -> Result<NodeId> {
        self.entry(anchor)?;
        let anchor = anchor.ok_or(ProtocolError::NoSelection)?;
        let id = self.insert_leaf_(Some(anchor), NodeName::Unnamed);
        let entry = self
            .entries_()
            .get_mut(&anchor)
            .expect("anchor was checked above");
        entry.children.push(id);
        entry.attrs.block.get_or_insert_with(BlockParams::default);
        Ok(id)
    }

    /// Removes `node` and its whole subtree. A parent left without children turns back into a
    /// Stimulation: its Block parameters are dropped and its Stimulation parameters, which
    /// were retained all along, apply again.
    ///
    /// # Errors
    /// `NoSelection` if `node` is `None` or no longer exists.
    fn delete(&mut self, node: Option<NodeId>) -> Result<()> {
        let parent = self.entry(node)?.parent();
        let node = node.ok_or(ProtocolError::NoSelection)?;

        self.siblings_(parent).retain(|&s| s != node);
        if let Some(parent) = parent {
            let entry = self
                .entries_()
                .get_mut(&parent)
                .expect("parent of a live node is live");
            if entry.children.is_empty() {
                entry.attrs.block = None;
                log::debug!("node {} has no children left and reverts to a stimulation", parent);
            }
        }

        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(entry) = self.entries_().swap_remove(&id) {
                stack.extend(entry.children);
            }
        }
        Ok(())
    }

    /// Validates `attr` and writes it into `node`. Nothing is written on error.
    ///
    /// # Errors
    /// - `NoSelection` if `node` is `None` or no longer exists.
    /// - `InvalidValue` if the value breaks the attribute's constraint, or a Block-only
    ///   attribute targets a Stimulation.
    ///
    /// # Example
    /// ```
    /// use stimcompiler_backend::*;
    ///
    /// let mut protocol = Protocol::new();
    /// let leaf = protocol.create_root_node(NodeName::Unnamed);
    /// protocol.set_attribute(Some(leaf), &Attribute::Duty(0.4)).unwrap();
    /// assert!(protocol.set_attribute(Some(leaf), &Attribute::Duty(1.5)).is_err());
    /// assert_eq!(protocol.entry(Some(leaf)).unwrap().attrs().stim.duty, 0.4);
    /// ```
    fn set_attribute(&mut self, node: Option<NodeId>, attr: &Attribute) -> Result<()> {
        self.entry(node)?;
        let node = node.ok_or(ProtocolError::NoSelection)?;
        let entry = self
            .entries_()
            .get_mut(&node)
            .expect("node was checked above");
        attr.apply(&mut entry.attrs)
    }

    /// Deep, read-only copy of the subtree rooted at `node`.
    fn get_subtree(&self, node: Option<NodeId>) -> Result<ProtocolNode> {
        let entry = self.entry(node)?;
        let id = node.ok_or(ProtocolError::NoSelection)?;
        let children = entry
            .children()
            .iter()
            .map(|&child| self.get_subtree(Some(child)))
            .collect::<Result<Vec<_>>>()?;
        Ok(ProtocolNode {
            id,
            attrs: entry.attrs().clone(),
            children,
        })
    }

    /// Deep copy of every top-level node, in playback order.
    fn snapshot(&self) -> ProtocolTree {
        let roots = self
            .top_level()
            .iter()
            .filter_map(|&id| self.get_subtree(Some(id)).ok())
            .collect();
        ProtocolTree { roots }
    }

    /// All node ids in depth-first pre-order, i.e. the order of the editor's tree view.
    fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.len());
        let mut stack: Vec<NodeId> = self.top_level().iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(entry) = self.entries().get(&id) {
                stack.extend(entry.children().iter().rev());
            }
        }
        order
    }
}

/// A protocol being edited. Implements [`BaseProtocol`] by supplying its fields.
#[derive(Clone, Debug, Default)]
pub struct Protocol {
    entries: IndexMap<NodeId, NodeEntry>,
    top_level: Vec<NodeId>,
    next_id: u64,
}

impl BaseProtocol for Protocol {
    fn entries(&self) -> &IndexMap<NodeId, NodeEntry> {
        &self.entries
    }
    fn top_level(&self) -> &Vec<NodeId> {
        &self.top_level
    }
    fn entries_(&mut self) -> &mut IndexMap<NodeId, NodeEntry> {
        &mut self.entries
    }
    fn top_level_(&mut self) -> &mut Vec<NodeId> {
        &mut self.top_level
    }
    fn alloc_id_(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl Protocol {
    pub fn new() -> Self {
        Self::default()
    }
}
