//! Binding: one pass over the syntax tree that creates a symbol for every
//! declaration.
//!
//! Exported declarations land in the enclosing namespace's `exports`;
//! members of models, scalars, enums, unions and interfaces land in the
//! container's `members`. Template parameters and `using` imports live in
//! per-node `locals` tables so they never leak into the outer scope.
//! `using` imports are registered later by
//! [`NameResolver::bind_usings`](crate::resolve::NameResolver::bind_usings)
//! because their targets have to be resolved first.

use crate::codes;
use crate::diagnostic::DiagnosticCollector;
use crate::diagnostic::DiagnosticTarget;
use crate::ids::ImplementationId;
use crate::ids::NodeId;
use crate::ids::SymbolId;
use crate::ids::TableId;
use crate::symbols::Sym;
use crate::symbols::SymbolArena;
use crate::symbols::SymbolFlags;
use ahash::AHashMap;
use syntax_tsp::NodeKind;
use syntax_tsp::SyntaxTree;

/// Output of binding, consumed by the resolver and checker.
#[derive(Clone, Debug)]
pub struct Binding {
  pub symbols: SymbolArena,
  /// The global namespace symbol.
  pub global: SymbolId,
  pub(crate) node_symbols: AHashMap<NodeId, SymbolId>,
  /// Template parameters of template declarations and `using` entries of
  /// scripts and namespace blocks, keyed by the owning node.
  pub(crate) locals: AHashMap<NodeId, TableId>,
  pub(crate) usings: Vec<NodeId>,
  pub(crate) augments: Vec<NodeId>,
}

impl Binding {
  pub fn symbol_of(&self, node: NodeId) -> Option<SymbolId> {
    self.node_symbols.get(&node).copied()
  }

  pub fn locals_of(&self, node: NodeId) -> Option<TableId> {
    self.locals.get(&node).copied()
  }
}

/// A host-supplied decorator implementation to expose as a symbol.
#[derive(Clone, Debug)]
pub struct ImplementationSymbol<'a> {
  /// Dotted namespace path; empty for the global namespace.
  pub namespace: &'a str,
  pub name: &'a str,
  pub id: ImplementationId,
}

pub fn bind(
  tree: &SyntaxTree,
  implementations: &[ImplementationSymbol<'_>],
  diagnostics: &mut DiagnosticCollector,
) -> Binding {
  let _span = tracing::debug_span!("bind", scripts = tree.scripts().len()).entered();
  let mut symbols = SymbolArena::new();
  let mut global = Sym::new("", SymbolFlags::NAMESPACE);
  global.exports = Some(symbols.new_table());
  let global = symbols.alloc(global);
  let mut binder = Binder {
    tree,
    binding: Binding {
      symbols,
      global,
      node_symbols: AHashMap::default(),
      locals: AHashMap::default(),
      usings: Vec::new(),
      augments: Vec::new(),
    },
  };
  for implementation in implementations {
    binder.bind_implementation(implementation);
  }
  for &script in tree.scripts() {
    binder.bind_script(script);
  }
  binder.report_duplicates(diagnostics);
  tracing::debug!(symbols = binder.binding.symbols.len(), "bound");
  binder.binding
}

struct Binder<'a> {
  tree: &'a SyntaxTree,
  binding: Binding,
}

impl<'a> Binder<'a> {
  fn exports(&self, ns: SymbolId) -> Option<TableId> {
    self.binding.symbols.get(ns).exports
  }

  fn namespace_child(&mut self, parent: SymbolId, name: &str) -> SymbolId {
    if let Some(exports) = self.exports(parent) {
      if let Some(existing) = self.binding.symbols.lookup(exports, name) {
        if self
          .binding
          .symbols
          .get(existing)
          .flags
          .contains(SymbolFlags::NAMESPACE)
        {
          return existing;
        }
      }
    }
    let mut sym = Sym::new(name, SymbolFlags::NAMESPACE).with_parent(Some(parent));
    sym.exports = Some(self.binding.symbols.new_table());
    let sym = self.binding.symbols.alloc(sym);
    if let Some(exports) = self.exports(parent) {
      self.binding.symbols.set(exports, name, sym);
    }
    sym
  }

  fn bind_implementation(&mut self, implementation: &ImplementationSymbol<'_>) {
    let mut ns = self.binding.global;
    for part in implementation.namespace.split('.').filter(|p| !p.is_empty()) {
      ns = self.namespace_child(ns, part);
    }
    let name = format!("@{}", implementation.name);
    let mut sym = Sym::new(
      name.clone(),
      SymbolFlags::DECORATOR | SymbolFlags::IMPLEMENTATION,
    )
    .with_parent(Some(ns));
    sym.implementation = Some(implementation.id);
    let sym = self.binding.symbols.alloc(sym);
    if let Some(exports) = self.exports(ns) {
      self.binding.symbols.set(exports, &name, sym);
    }
  }

  fn bind_script(&mut self, script: NodeId) {
    let tree = self.tree;
    let NodeKind::Script { statements, .. } = tree.kind(script) else {
      return;
    };
    let sym = self.binding.symbols.alloc(
      Sym::new("", SymbolFlags::SOURCE_FILE).with_declaration(script),
    );
    self.binding.node_symbols.insert(script, sym);
    let locals = self.binding.symbols.new_table();
    self.binding.locals.insert(script, locals);
    for &stmt in statements {
      self.bind_statement(stmt, self.binding.global);
    }
  }

  fn bind_statement(&mut self, node: NodeId, ns: SymbolId) {
    let tree = self.tree;
    match tree.kind(node) {
      NodeKind::NamespaceStatement { statements, .. } => {
        let name = tree.declaration_name(node).unwrap_or("");
        let sym = self.namespace_child(ns, name);
        self.binding.symbols.get_mut(sym).declarations.push(node);
        self.binding.node_symbols.insert(node, sym);
        let locals = self.binding.symbols.new_table();
        self.binding.locals.insert(node, locals);
        for &stmt in statements {
          self.bind_statement(stmt, sym);
        }
      }
      NodeKind::ModelStatement {
        extends,
        is,
        properties,
        ..
      } => {
        let sym = self.declare(node, SymbolFlags::MODEL, ns);
        self.bind_template_parameters(node, sym);
        let members = self.member_table(sym);
        let mut unknown = extends.is_some() || is.is_some();
        for &property in properties {
          match tree.kind(property) {
            NodeKind::ModelProperty { .. } => self.declare_member(property, sym, members),
            _ => unknown = true,
          }
        }
        self.binding.symbols.get_mut(sym).has_unknown_members = unknown;
      }
      NodeKind::ScalarStatement { members, .. } => {
        let sym = self.declare(node, SymbolFlags::SCALAR, ns);
        self.bind_template_parameters(node, sym);
        let table = self.member_table(sym);
        for &member in members {
          self.declare_member(member, sym, table);
          let ctor = self.binding.symbols.get_mut(self.binding.node_symbols[&member]);
          ctor.flags |= SymbolFlags::FUNCTION;
        }
      }
      NodeKind::InterfaceStatement {
        extends,
        operations,
        ..
      } => {
        let sym = self.declare(node, SymbolFlags::INTERFACE, ns);
        self.bind_template_parameters(node, sym);
        let table = self.member_table(sym);
        for &operation in operations {
          self.declare_member(operation, sym, table);
          let op = self.binding.node_symbols[&operation];
          self.binding.symbols.get_mut(op).flags |= SymbolFlags::OPERATION;
          self.bind_template_parameters(operation, op);
        }
        self.binding.symbols.get_mut(sym).has_unknown_members = !extends.is_empty();
      }
      NodeKind::OperationStatement { .. } => {
        let sym = self.declare(node, SymbolFlags::OPERATION, ns);
        self.bind_template_parameters(node, sym);
      }
      NodeKind::UnionStatement { options, .. } => {
        let sym = self.declare(node, SymbolFlags::UNION, ns);
        self.bind_template_parameters(node, sym);
        let table = self.member_table(sym);
        for &option in options {
          if tree.declaration_name(option).is_some() {
            self.declare_member(option, sym, table);
          }
        }
      }
      NodeKind::EnumStatement { members, .. } => {
        let sym = self.declare(node, SymbolFlags::ENUM, ns);
        let table = self.member_table(sym);
        let mut unknown = false;
        for &member in members {
          match tree.kind(member) {
            NodeKind::EnumMember { .. } => self.declare_member(member, sym, table),
            _ => unknown = true,
          }
        }
        self.binding.symbols.get_mut(sym).has_unknown_members = unknown;
      }
      NodeKind::AliasStatement { .. } => {
        let sym = self.declare(node, SymbolFlags::ALIAS, ns);
        self.bind_template_parameters(node, sym);
      }
      NodeKind::ConstStatement { .. } => {
        self.declare(node, SymbolFlags::CONST, ns);
      }
      NodeKind::DecoratorDeclarationStatement { .. } => self.bind_decorator_declaration(node, ns),
      NodeKind::UsingStatement { .. } => self.binding.usings.push(node),
      NodeKind::AugmentDecoratorStatement { .. } => self.binding.augments.push(node),
      _ => {}
    }
  }

  fn declare(&mut self, node: NodeId, flags: SymbolFlags, ns: SymbolId) -> SymbolId {
    let name = self.tree.declaration_name(node).unwrap_or("");
    let sym = self.binding.symbols.alloc(
      Sym::new(name, flags | SymbolFlags::DECLARATION)
        .with_declaration(node)
        .with_parent(Some(ns)),
    );
    if let Some(exports) = self.exports(ns) {
      self.binding.symbols.set(exports, name, sym);
    }
    self.binding.node_symbols.insert(node, sym);
    sym
  }

  fn member_table(&mut self, container: SymbolId) -> TableId {
    let table = self.binding.symbols.new_table();
    self.binding.symbols.get_mut(container).members = Some(table);
    table
  }

  fn declare_member(&mut self, node: NodeId, container: SymbolId, table: TableId) {
    let name = self.tree.declaration_name(node).unwrap_or("");
    let sym = self.binding.symbols.alloc(
      Sym::new(name, SymbolFlags::MEMBER | SymbolFlags::DECLARATION)
        .with_declaration(node)
        .with_parent(Some(container)),
    );
    self.binding.symbols.set(table, name, sym);
    self.binding.node_symbols.insert(node, sym);
  }

  fn bind_template_parameters(&mut self, node: NodeId, owner: SymbolId) {
    let params = self.tree.kind(node).template_parameters();
    if params.is_empty() {
      return;
    }
    let table = self.binding.symbols.new_table();
    self.binding.locals.insert(node, table);
    for &param in params {
      let name = self.tree.declaration_name(param).unwrap_or("");
      let sym = self.binding.symbols.alloc(
        Sym::new(
          name,
          SymbolFlags::TEMPLATE_PARAMETER | SymbolFlags::DECLARATION,
        )
        .with_declaration(param)
        .with_parent(Some(owner)),
      );
      self.binding.symbols.set(table, name, sym);
      self.binding.node_symbols.insert(param, sym);
    }
  }

  /// `extern dec foo` merges into the implementation symbol `@foo` of the
  /// same namespace when the host registered one.
  fn bind_decorator_declaration(&mut self, node: NodeId, ns: SymbolId) {
    let name = format!("@{}", self.tree.declaration_name(node).unwrap_or(""));
    let existing = self
      .exports(ns)
      .and_then(|exports| self.binding.symbols.lookup(exports, &name))
      .filter(|&sym| {
        let sym = self.binding.symbols.get(sym);
        sym.flags.contains(SymbolFlags::IMPLEMENTATION) && sym.declarations.is_empty()
      });
    let sym = match existing {
      Some(sym) => {
        let merged = self.binding.symbols.get_mut(sym);
        merged.flags |= SymbolFlags::DECLARATION;
        merged.declarations.push(node);
        sym
      }
      None => {
        let sym = self.binding.symbols.alloc(
          Sym::new(
            name.clone(),
            SymbolFlags::DECORATOR | SymbolFlags::DECLARATION,
          )
          .with_declaration(node)
          .with_parent(Some(ns)),
        );
        if let Some(exports) = self.exports(ns) {
          self.binding.symbols.set(exports, &name, sym);
        }
        sym
      }
    };
    self.binding.node_symbols.insert(node, sym);
  }

  /// Export-level collisions. Member collisions are reported by the checker,
  /// which also sees members introduced through composition.
  fn report_duplicates(&self, diagnostics: &mut DiagnosticCollector) {
    let symbols = &self.binding.symbols;
    for (_, table) in symbols.tables() {
      for group in table.duplicate_groups() {
        let exported = group.iter().all(|&sym| {
          let flags = symbols.get(sym).flags;
          !flags.intersects(
            SymbolFlags::MEMBER | SymbolFlags::USING | SymbolFlags::TEMPLATE_PARAMETER,
          )
        });
        let params = group
          .iter()
          .all(|&sym| symbols.get(sym).flags.contains(SymbolFlags::TEMPLATE_PARAMETER));
        if !exported && !params {
          continue;
        }
        for &sym in group {
          let s = symbols.get(sym);
          let target = s
            .first_declaration()
            .map(DiagnosticTarget::Node)
            .unwrap_or(DiagnosticTarget::Symbol(sym));
          diagnostics.push(codes::DUPLICATE_SYMBOL.error(
            format!("Duplicate name: \"{}\"", s.name.trim_start_matches('@')),
            target,
          ));
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use diagnostics::FileId;
  use syntax_tsp::build::*;

  fn bind_sources(sources: Vec<Vec<Syn>>) -> (SyntaxTree, Binding, DiagnosticCollector) {
    let mut builder = SyntaxTree::builder();
    for (i, stmts) in sources.into_iter().enumerate() {
      builder.add_script(FileId(i as u32), stmts);
    }
    let tree = builder.finish();
    let mut diagnostics = DiagnosticCollector::new();
    let binding = bind(&tree, &[], &mut diagnostics);
    (tree, binding, diagnostics)
  }

  #[test]
  fn namespaces_merge_across_files() {
    let (_, binding, diagnostics) = bind_sources(vec![
      vec![namespace("Foo", vec![model("A", vec![])])],
      vec![namespace("Foo", vec![model("B", vec![])])],
    ]);
    assert!(diagnostics.is_empty());
    let symbols = &binding.symbols;
    let globals = symbols.exports_of(binding.global).unwrap();
    let foo = symbols.lookup(globals, "Foo").unwrap();
    assert_eq!(symbols.get(foo).declarations.len(), 2);
    let exports = symbols.exports_of(foo).unwrap();
    let names: Vec<&str> = symbols.table(exports).iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["A", "B"]);
  }

  #[test]
  fn template_parameters_stay_local() {
    let (tree, binding, _) = bind_sources(vec![vec![
      model("Box", vec![prop("v", reference("T"))]).templated(vec![template_param("T")]),
    ]]);
    let symbols = &binding.symbols;
    let globals = symbols.exports_of(binding.global).unwrap();
    assert!(symbols.lookup(globals, "T").is_none());
    let script = tree.scripts()[0];
    let NodeKind::Script { statements, .. } = tree.kind(script) else {
      panic!();
    };
    let locals = binding.locals_of(statements[0]).unwrap();
    let t = symbols.lookup(locals, "T").unwrap();
    assert!(symbols.get(t).flags.contains(SymbolFlags::TEMPLATE_PARAMETER));
  }

  #[test]
  fn spreads_defer_member_binding() {
    let (_, binding, _) = bind_sources(vec![vec![
      model("A", vec![prop("x", reference("string"))]),
      model("B", vec![spread("A"), prop("y", reference("string"))]),
    ]]);
    let symbols = &binding.symbols;
    let globals = symbols.exports_of(binding.global).unwrap();
    let a = symbols.lookup(globals, "A").unwrap();
    let b = symbols.lookup(globals, "B").unwrap();
    assert!(!symbols.get(a).has_unknown_members);
    assert!(symbols.get(b).has_unknown_members);
    let members = symbols.members_of(b).unwrap();
    assert_eq!(symbols.table(members).len(), 1);
  }

  #[test]
  fn duplicate_declarations_are_reported_not_replaced() {
    let (_, binding, diagnostics) = bind_sources(vec![vec![model("A", vec![]), scalar("A")]]);
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics
      .diagnostics()
      .iter()
      .all(|d| d.code == codes::DUPLICATE_SYMBOL.id));
    let symbols = &binding.symbols;
    let a = symbols
      .lookup(symbols.exports_of(binding.global).unwrap(), "A")
      .unwrap();
    assert!(symbols.get(a).flags.contains(SymbolFlags::MODEL));
  }

  #[test]
  fn extern_declarations_merge_with_implementations() {
    let mut builder = SyntaxTree::builder();
    builder.add_script(
      FileId(0),
      vec![namespace(
        "Lib",
        vec![extern_dec("tag", reference("unknown"), vec![])],
      )],
    );
    let tree = builder.finish();
    let mut diagnostics = DiagnosticCollector::new();
    let binding = bind(
      &tree,
      &[ImplementationSymbol {
        namespace: "Lib",
        name: "tag",
        id: ImplementationId(0),
      }],
      &mut diagnostics,
    );
    let symbols = &binding.symbols;
    let lib = symbols
      .lookup(symbols.exports_of(binding.global).unwrap(), "Lib")
      .unwrap();
    let exports = symbols.exports_of(lib).unwrap();
    assert_eq!(symbols.table(exports).len(), 1);
    let tag = symbols.lookup(exports, "@tag").unwrap();
    let tag = symbols.get(tag);
    assert!(tag
      .flags
      .contains(SymbolFlags::IMPLEMENTATION | SymbolFlags::DECLARATION));
    assert_eq!(tag.implementation, Some(ImplementationId(0)));
    assert!(diagnostics.is_empty());
  }
}
