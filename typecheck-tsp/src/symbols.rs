//! Symbols and symbol tables.
//!
//! A [`Sym`] is a name binding, not a type. Symbols and their tables live in
//! a single [`SymbolArena`]; tables are addressed by [`TableId`] so a table
//! can be updated while other symbols are read.

use crate::ids::ImplementationId;
use crate::ids::NodeId;
use crate::ids::SymbolId;
use crate::ids::TableId;
use crate::ids::TypeId;
use crate::rekey::RekeyableMap;
use ahash::AHashMap;
use bitflags::bitflags;

bitflags! {
  #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
  pub struct SymbolFlags: u32 {
    const MODEL = 1 << 1;
    const SCALAR = 1 << 2;
    const OPERATION = 1 << 3;
    const ENUM = 1 << 4;
    const INTERFACE = 1 << 5;
    const UNION = 1 << 6;
    const ALIAS = 1 << 7;
    const NAMESPACE = 1 << 8;
    const DECORATOR = 1 << 9;
    const TEMPLATE_PARAMETER = 1 << 10;
    const FUNCTION = 1 << 11;
    const FUNCTION_PARAMETER = 1 << 12;
    const USING = 1 << 13;
    const DUPLICATE_USING = 1 << 14;
    const SOURCE_FILE = 1 << 15;
    const MEMBER = 1 << 16;
    const CONST = 1 << 17;
    /// Declared in source.
    const DECLARATION = 1 << 20;
    /// Backed by a host-supplied implementation.
    const IMPLEMENTATION = 1 << 21;
    /// Discovered during checking rather than binding.
    const LATE_BOUND = 1 << 22;

    const EXPORT_CONTAINER = Self::NAMESPACE.bits() | Self::SOURCE_FILE.bits();
    const MEMBER_CONTAINER = Self::MODEL.bits()
      | Self::ENUM.bits()
      | Self::UNION.bits()
      | Self::INTERFACE.bits()
      | Self::SCALAR.bits();
  }
}

#[derive(Clone, Debug)]
pub struct Sym {
  pub name: String,
  pub flags: SymbolFlags,
  /// Declaring nodes; merged namespaces accumulate one per occurrence.
  pub declarations: Vec<NodeId>,
  /// Originating node of a symbol that has no declaration (usings).
  pub node: Option<NodeId>,
  pub parent: Option<SymbolId>,
  pub exports: Option<TableId>,
  pub members: Option<TableId>,
  /// Target of a `using` entry.
  pub symbol_source: Option<SymbolId>,
  /// Type denoted by a late-bound symbol.
  pub late_type: Option<TypeId>,
  pub implementation: Option<ImplementationId>,
  pub has_unknown_members: bool,
  pub members_bound: bool,
  /// Symbol of the base model, set once `extends` is checked.
  pub(crate) base: Option<SymbolId>,
  /// Late-resolved target of an alias whose value is not a plain reference.
  pub(crate) alias_target: Option<SymbolId>,
}

impl Sym {
  pub fn new(name: impl Into<String>, flags: SymbolFlags) -> Self {
    Sym {
      name: name.into(),
      flags,
      declarations: Vec::new(),
      node: None,
      parent: None,
      exports: None,
      members: None,
      symbol_source: None,
      late_type: None,
      implementation: None,
      has_unknown_members: false,
      members_bound: false,
      base: None,
      alias_target: None,
    }
  }

  pub fn with_declaration(mut self, node: NodeId) -> Self {
    self.declarations.push(node);
    self
  }

  pub fn with_parent(mut self, parent: Option<SymbolId>) -> Self {
    self.parent = parent;
    self
  }

  pub fn first_declaration(&self) -> Option<NodeId> {
    self.declarations.first().copied().or(self.node)
  }
}

/// Insertion-ordered name table with duplicate tracking.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
  entries: RekeyableMap<String, SymbolId>,
  duplicates: AHashMap<SymbolId, Vec<SymbolId>>,
}

impl SymbolTable {
  pub fn get(&self, name: &str) -> Option<SymbolId> {
    self.entries.get(name).copied()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, SymbolId)> + '_ {
    self.entries.iter().map(|(k, v)| (k.as_str(), *v))
  }

  /// Every symbol that collided with `sym` under the same name, `sym`
  /// included. Empty when there was no collision.
  pub fn duplicates_of(&self, sym: SymbolId) -> &[SymbolId] {
    self.duplicates.get(&sym).map(|d| d.as_slice()).unwrap_or(&[])
  }

  /// Duplicate groups in table order.
  pub fn duplicate_groups(&self) -> impl Iterator<Item = &[SymbolId]> + '_ {
    self
      .entries
      .values()
      .filter_map(|sym| self.duplicates.get(sym).map(|d| d.as_slice()))
  }

  fn record_duplicate(&mut self, existing: SymbolId, sym: SymbolId) {
    let group = self.duplicates.entry(existing).or_insert_with(|| vec![existing]);
    if !group.contains(&sym) {
      group.push(sym);
    }
  }
}

#[derive(Clone, Debug, Default)]
pub struct SymbolArena {
  syms: Vec<Sym>,
  tables: Vec<SymbolTable>,
}

impl SymbolArena {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn alloc(&mut self, sym: Sym) -> SymbolId {
    let id = SymbolId(self.syms.len() as u32);
    self.syms.push(sym);
    id
  }

  pub fn get(&self, id: SymbolId) -> &Sym {
    &self.syms[id.index()]
  }

  pub(crate) fn get_mut(&mut self, id: SymbolId) -> &mut Sym {
    &mut self.syms[id.index()]
  }

  pub fn len(&self) -> usize {
    self.syms.len()
  }

  pub fn is_empty(&self) -> bool {
    self.syms.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Sym)> + '_ {
    self
      .syms
      .iter()
      .enumerate()
      .map(|(i, sym)| (SymbolId(i as u32), sym))
  }

  pub fn new_table(&mut self) -> TableId {
    let id = TableId(self.tables.len() as u32);
    self.tables.push(SymbolTable::default());
    id
  }

  pub fn table(&self, id: TableId) -> &SymbolTable {
    &self.tables[id.index()]
  }

  pub fn tables(&self) -> impl Iterator<Item = (TableId, &SymbolTable)> + '_ {
    self
      .tables
      .iter()
      .enumerate()
      .map(|(i, t)| (TableId(i as u32), t))
  }

  pub fn lookup(&self, table: TableId, name: &str) -> Option<SymbolId> {
    self.tables[table.index()].get(name)
  }

  pub fn exports_of(&self, sym: SymbolId) -> Option<TableId> {
    self.get(sym).exports
  }

  pub fn members_of(&self, sym: SymbolId) -> Option<TableId> {
    self.get(sym).members
  }

  /// Inserts `sym` under `name`. A collision keeps the first symbol in place
  /// and records the newcomer as a duplicate. Two `using` entries with the
  /// same source are a no-op; with different sources the existing entry is
  /// flagged [`SymbolFlags::DUPLICATE_USING`].
  pub fn set(&mut self, table: TableId, name: &str, sym: SymbolId) {
    let Some(existing) = self.tables[table.index()].get(name) else {
      self.tables[table.index()]
        .entries
        .insert(name.to_string(), sym);
      return;
    };
    if existing == sym {
      return;
    }
    let (old, new) = (&self.syms[existing.index()], &self.syms[sym.index()]);
    if old.flags.contains(SymbolFlags::USING) && new.flags.contains(SymbolFlags::USING) {
      if old.symbol_source == new.symbol_source {
        return;
      }
      self.syms[existing.index()].flags |= SymbolFlags::DUPLICATE_USING;
    }
    self.tables[table.index()].record_duplicate(existing, sym);
  }

  /// Overwrites the entry stored under `name`, keeping its position.
  pub fn replace(&mut self, table: TableId, name: &str, sym: SymbolId) -> Option<SymbolId> {
    self.tables[table.index()]
      .entries
      .insert(name.to_string(), sym)
  }

  pub fn rekey(&mut self, table: TableId, existing: &str, new_name: &str) -> bool {
    self.tables[table.index()]
      .entries
      .rekey(existing, new_name.to_string())
  }

  /// Copies every entry of `source` into `target`. When `parent` is given
  /// each copied symbol is cloned and re-parented to it.
  pub fn include(&mut self, target: TableId, source: TableId, parent: Option<SymbolId>) {
    let entries: Vec<(String, SymbolId)> = self.tables[source.index()]
      .iter()
      .map(|(k, v)| (k.to_string(), v))
      .collect();
    for (name, sym) in entries {
      let sym = match parent {
        Some(parent) => {
          let mut copy = self.get(sym).clone();
          copy.parent = Some(parent);
          self.alloc(copy)
        }
        None => sym,
      };
      self.set(target, &name, sym);
    }
  }

  /// Dotted name from the outermost named namespace down to `sym`.
  pub fn qualified_name(&self, sym: SymbolId) -> String {
    let mut parts = Vec::new();
    let mut current = Some(sym);
    while let Some(id) = current {
      let s = self.get(id);
      if !s.name.is_empty() && !s.flags.contains(SymbolFlags::SOURCE_FILE) {
        parts.push(s.name.as_str());
      }
      current = s.parent;
    }
    parts.reverse();
    parts.join(".")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn arena_with_table() -> (SymbolArena, TableId) {
    let mut arena = SymbolArena::new();
    let table = arena.new_table();
    (arena, table)
  }

  #[test]
  fn duplicates_keep_first_entry() {
    let (mut arena, table) = arena_with_table();
    let a1 = arena.alloc(Sym::new("A", SymbolFlags::MODEL | SymbolFlags::DECLARATION));
    let a2 = arena.alloc(Sym::new("A", SymbolFlags::MODEL | SymbolFlags::DECLARATION));
    arena.set(table, "A", a1);
    arena.set(table, "A", a2);
    assert_eq!(arena.lookup(table, "A"), Some(a1));
    assert_eq!(arena.table(table).duplicates_of(a1), &[a1, a2]);
    assert_eq!(arena.table(table).duplicate_groups().count(), 1);
  }

  #[test]
  fn usings_of_same_source_do_not_collide() {
    let (mut arena, table) = arena_with_table();
    let target = arena.alloc(Sym::new("Foo", SymbolFlags::MODEL));
    let other = arena.alloc(Sym::new("Foo", SymbolFlags::MODEL));
    let mut u1 = Sym::new("Foo", SymbolFlags::USING);
    u1.symbol_source = Some(target);
    let mut u2 = u1.clone();
    let u1 = arena.alloc(u1);
    let u2_same = arena.alloc(u2.clone());
    arena.set(table, "Foo", u1);
    arena.set(table, "Foo", u2_same);
    assert!(arena.table(table).duplicates_of(u1).is_empty());

    u2.symbol_source = Some(other);
    let u2 = arena.alloc(u2);
    arena.set(table, "Foo", u2);
    assert!(arena.get(u1).flags.contains(SymbolFlags::DUPLICATE_USING));
    assert_eq!(arena.table(table).duplicates_of(u1), &[u1, u2]);
  }

  #[test]
  fn include_reparents_copies_in_order() {
    let (mut arena, source) = arena_with_table();
    let target = arena.new_table();
    let owner = arena.alloc(Sym::new("I", SymbolFlags::INTERFACE));
    let a = arena.alloc(Sym::new("a", SymbolFlags::MEMBER));
    let b = arena.alloc(Sym::new("b", SymbolFlags::MEMBER));
    arena.set(source, "a", a);
    arena.set(source, "b", b);
    arena.include(target, source, Some(owner));
    let names: Vec<&str> = arena.table(target).iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["a", "b"]);
    let copied = arena.lookup(target, "a").unwrap();
    assert_ne!(copied, a);
    assert_eq!(arena.get(copied).parent, Some(owner));
    assert_eq!(arena.get(a).parent, None);
  }

  #[test]
  fn rekey_preserves_member_order() {
    let (mut arena, table) = arena_with_table();
    for name in ["a", "b", "c"] {
      let sym = arena.alloc(Sym::new(name, SymbolFlags::MEMBER));
      arena.set(table, name, sym);
    }
    assert!(arena.rekey(table, "b", "b2"));
    let names: Vec<&str> = arena.table(table).iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["a", "b2", "c"]);
  }
}
