//! Syntax tree model for the schema language.
//!
//! The tree is produced by an external parser (or by [`build`] in tests and
//! tooling) and is immutable once constructed. Every node lives in a single
//! [`SyntaxTree`] arena and is addressed by [`NodeId`]; node ids are assigned
//! in pre-order so a parent always precedes its children.

pub mod build;
mod kind;

pub use kind::MemberSelector;
pub use kind::ModifierFlags;
pub use kind::NodeKind;

use bitflags::bitflags;
use diagnostics::FileId;
use diagnostics::Span;
use diagnostics::TextRange;
use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Debug)]
pub struct NodeId(pub u32);

impl NodeId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

bitflags! {
  #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
  pub struct NodeFlags: u8 {
    const DESCENDANT_ERRORS_EXAMINED = 1 << 0;
    /// The parser reported an error for this node.
    const THIS_NODE_HAS_ERROR = 1 << 1;
    const DESCENDANT_HAS_ERROR = 1 << 2;
    /// Created by tooling rather than parsed from source text.
    const SYNTHETIC = 1 << 3;
  }
}

#[derive(Clone, Debug)]
pub struct Node {
  pub kind: NodeKind<NodeId>,
  pub file: FileId,
  pub range: TextRange,
  pub flags: NodeFlags,
  pub parent: Option<NodeId>,
  /// `#suppress`/`#deprecated` directive expressions attached to this node.
  pub directives: Vec<NodeId>,
}

impl Node {
  pub fn span(&self) -> Span {
    Span {
      file: self.file,
      range: self.range,
    }
  }

  pub fn has_parse_error(&self) -> bool {
    self
      .flags
      .intersects(NodeFlags::THIS_NODE_HAS_ERROR | NodeFlags::DESCENDANT_HAS_ERROR)
  }
}

#[derive(Clone, Debug, Default)]
pub struct SyntaxTree {
  nodes: Vec<Node>,
  scripts: Vec<NodeId>,
}

impl SyntaxTree {
  pub fn builder() -> build::TreeBuilder {
    build::TreeBuilder::default()
  }

  pub fn node(&self, id: NodeId) -> &Node {
    &self.nodes[id.index()]
  }

  pub fn kind(&self, id: NodeId) -> &NodeKind<NodeId> {
    &self.nodes[id.index()].kind
  }

  pub fn get(&self, id: NodeId) -> Option<&Node> {
    self.nodes.get(id.index())
  }

  pub fn parent(&self, id: NodeId) -> Option<NodeId> {
    self.nodes[id.index()].parent
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Every script root, in the order they were added.
  pub fn scripts(&self) -> &[NodeId] {
    &self.scripts
  }

  /// The node itself followed by each enclosing node up to the script.
  pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
    Ancestors {
      tree: self,
      next: Some(id),
    }
  }

  /// Text of an identifier node, or `None` for any other kind.
  pub fn identifier(&self, id: NodeId) -> Option<&str> {
    match self.kind(id) {
      NodeKind::Identifier { sv } => Some(sv.as_str()),
      _ => None,
    }
  }

  /// Name of a declaration node via its identifier child.
  pub fn declaration_name(&self, id: NodeId) -> Option<&str> {
    let ident = self.kind(id).declaration_id()?;
    self.identifier(*ident)
  }

  /// The script that contains `id`.
  pub fn script_of(&self, id: NodeId) -> Option<NodeId> {
    self
      .ancestors(id)
      .find(|&n| matches!(self.kind(n), NodeKind::Script { .. }))
  }
}

pub struct Ancestors<'a> {
  tree: &'a SyntaxTree,
  next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
  type Item = NodeId;

  fn next(&mut self) -> Option<NodeId> {
    let current = self.next?;
    self.next = self.tree.parent(current);
    Some(current)
  }
}
