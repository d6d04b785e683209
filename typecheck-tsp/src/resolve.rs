//! Name resolution.
//!
//! Identifiers are resolved by walking lexical scopes outward from the
//! reference: template parameters of enclosing declarations, then each
//! enclosing namespace's exports and `using` imports, then the script's
//! imports, the global namespace and finally `TypeSpec`. Member chains
//! resolve their base first and then look the member up in the base's
//! exports or members. Results are cached per node.

use crate::binder::Binding;
use crate::codes;
use crate::diagnostic::DiagnosticCollector;
use crate::diagnostic::DiagnosticTarget;
use crate::ids::NodeId;
use crate::ids::SymbolId;
use crate::symbols::Sym;
use crate::symbols::SymbolArena;
use crate::symbols::SymbolFlags;
use ahash::AHashMap;
use ahash::AHashSet;
use diagnostics::CodeFix;
use diagnostics::TextEdit;
use std::sync::Arc;
use syntax_tsp::MemberSelector;
use syntax_tsp::NodeKind;
use syntax_tsp::SyntaxTree;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResolutionKind {
  Resolved,
  /// The container may gain the member during checking; not an error yet.
  Unknown,
  Ambiguous,
  NotFound,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolutionResult {
  pub kind: ResolutionKind,
  /// The symbol named by the reference. Aliases stay aliases here.
  pub resolved_symbol: Option<SymbolId>,
  /// `resolved_symbol` with aliases followed.
  pub final_symbol: Option<SymbolId>,
  pub ambiguous_symbols: Vec<SymbolId>,
  /// Container whose late-bound members have to be linked before retrying.
  pub(crate) unknown_container: Option<SymbolId>,
  /// Segment of the chain where resolution stopped.
  pub(crate) failed_at: Option<NodeId>,
}

impl ResolutionResult {
  fn resolved(symbol: SymbolId, final_symbol: SymbolId) -> Self {
    ResolutionResult {
      kind: ResolutionKind::Resolved,
      resolved_symbol: Some(symbol),
      final_symbol: Some(final_symbol),
      ambiguous_symbols: Vec::new(),
      unknown_container: None,
      failed_at: None,
    }
  }

  fn failed(kind: ResolutionKind, at: NodeId) -> Self {
    ResolutionResult {
      kind,
      resolved_symbol: None,
      final_symbol: None,
      ambiguous_symbols: Vec::new(),
      unknown_container: None,
      failed_at: Some(at),
    }
  }

  fn unknown(container: Option<SymbolId>, at: NodeId) -> Self {
    ResolutionResult {
      unknown_container: container,
      ..Self::failed(ResolutionKind::Unknown, at)
    }
  }

  fn ambiguous(candidates: Vec<SymbolId>, at: NodeId) -> Self {
    ResolutionResult {
      ambiguous_symbols: candidates,
      ..Self::failed(ResolutionKind::Ambiguous, at)
    }
  }

  pub fn is_resolved(&self) -> bool {
    self.kind == ResolutionKind::Resolved
  }
}

pub struct NameResolver {
  tree: Arc<SyntaxTree>,
  pub(crate) binding: Binding,
  cache: AHashMap<NodeId, ResolutionResult>,
  /// Guards alias chains that loop back on themselves.
  resolving: AHashSet<NodeId>,
  std_namespace: Option<SymbolId>,
}

impl NameResolver {
  pub fn new(tree: Arc<SyntaxTree>, binding: Binding) -> Self {
    let std_namespace = binding
      .symbols
      .exports_of(binding.global)
      .and_then(|exports| binding.symbols.lookup(exports, "TypeSpec"));
    NameResolver {
      tree,
      binding,
      cache: AHashMap::default(),
      resolving: AHashSet::default(),
      std_namespace,
    }
  }

  pub fn symbols(&self) -> &SymbolArena {
    &self.binding.symbols
  }

  pub(crate) fn symbols_mut(&mut self) -> &mut SymbolArena {
    &mut self.binding.symbols
  }

  pub fn binding(&self) -> &Binding {
    &self.binding
  }

  pub fn global(&self) -> SymbolId {
    self.binding.global
  }

  pub fn std_namespace(&self) -> Option<SymbolId> {
    self.std_namespace
  }

  /// Cached result for a reference that has already been resolved.
  pub fn result(&self, node: NodeId) -> Option<&ResolutionResult> {
    self.cache.get(&self.reference_target(node))
  }

  fn reference_target(&self, node: NodeId) -> NodeId {
    match self.tree.kind(node) {
      NodeKind::TypeReference { target, .. } => *target,
      _ => node,
    }
  }

  /// Drops cached results for a reference chain so it can be retried once
  /// late-bound members are linked.
  pub(crate) fn forget(&mut self, node: NodeId) {
    let mut next = Some(self.reference_target(node));
    while let Some(current) = next {
      self.cache.remove(&current);
      next = match self.tree.kind(current) {
        NodeKind::MemberExpression { base, .. } => Some(*base),
        _ => None,
      };
    }
  }

  /// Resolves an identifier, member expression or type reference.
  pub fn resolve_reference(&mut self, node: NodeId) -> ResolutionResult {
    let target = self.reference_target(node);
    if let Some(cached) = self.cache.get(&target) {
      return cached.clone();
    }
    let result = self.resolve_uncached(target, false);
    self.cache.insert(target, result.clone());
    result
  }

  /// Resolves the target of `@dec` or `@@dec`; the last segment is looked up
  /// with its `@` prefix.
  pub fn resolve_decorator(&mut self, node: NodeId) -> ResolutionResult {
    if let Some(cached) = self.cache.get(&node) {
      return cached.clone();
    }
    let result = self.resolve_uncached(node, true);
    self.cache.insert(node, result.clone());
    result
  }

  fn resolve_uncached(&mut self, node: NodeId, decorator: bool) -> ResolutionResult {
    let tree = Arc::clone(&self.tree);
    match tree.kind(node) {
      NodeKind::Identifier { sv } => {
        let name = if decorator {
          format!("@{sv}")
        } else {
          sv.clone()
        };
        self.resolve_identifier(node, &name)
      }
      NodeKind::MemberExpression { base, id, selector } => {
        if *selector == MemberSelector::DoubleColon {
          // Meta-members are type-level and handled by the checker.
          return ResolutionResult::unknown(None, node);
        }
        let base_result = self.resolve_reference(*base);
        let Some(container) = base_result.final_symbol.filter(|_| base_result.is_resolved())
        else {
          return base_result;
        };
        let Some(name) = tree.identifier(*id) else {
          return ResolutionResult::failed(ResolutionKind::NotFound, *id);
        };
        let name = if decorator {
          format!("@{name}")
        } else {
          name.to_string()
        };
        self.resolve_member_at(container, &name, *id)
      }
      _ => ResolutionResult::failed(ResolutionKind::NotFound, node),
    }
  }

  fn resolve_identifier(&mut self, node: NodeId, name: &str) -> ResolutionResult {
    let tree = Arc::clone(&self.tree);
    for scope in tree.ancestors(node).skip(1) {
      match tree.kind(scope) {
        NodeKind::Script { .. } => {
          // Global declarations shadow the file's `using` imports.
          let global = self
            .binding
            .symbols
            .exports_of(self.binding.global)
            .and_then(|exports| self.binding.symbols.lookup(exports, name));
          if let Some(sym) = global {
            return self.resolved(sym);
          }
          if let Some(found) = self.lookup_locals(scope, name, node) {
            return found;
          }
          break;
        }
        NodeKind::NamespaceStatement { .. } => {
          let found = self
            .binding
            .symbol_of(scope)
            .and_then(|ns| self.binding.symbols.exports_of(ns))
            .and_then(|exports| self.binding.symbols.lookup(exports, name));
          if let Some(sym) = found {
            return self.resolved(sym);
          }
          if let Some(found) = self.lookup_locals(scope, name, node) {
            return found;
          }
        }
        kind if !kind.template_parameters().is_empty() => {
          if let Some(found) = self.lookup_locals(scope, name, node) {
            return found;
          }
        }
        _ => {}
      }
    }
    let mut roots = vec![self.binding.global];
    roots.extend(self.std_namespace);
    for root in roots {
      let found = self
        .binding
        .symbols
        .exports_of(root)
        .and_then(|exports| self.binding.symbols.lookup(exports, name));
      if let Some(sym) = found {
        return self.resolved(sym);
      }
    }
    ResolutionResult::failed(ResolutionKind::NotFound, node)
  }

  fn lookup_locals(&mut self, scope: NodeId, name: &str, at: NodeId) -> Option<ResolutionResult> {
    let table = self.binding.locals_of(scope)?;
    let sym = self.binding.symbols.lookup(table, name)?;
    let entry = self.binding.symbols.get(sym);
    if !entry.flags.contains(SymbolFlags::USING) {
      return Some(self.resolved(sym));
    }
    if entry.flags.contains(SymbolFlags::DUPLICATE_USING) {
      let candidates = self
        .binding
        .symbols
        .table(table)
        .duplicates_of(sym)
        .iter()
        .filter_map(|&dup| self.binding.symbols.get(dup).symbol_source)
        .collect();
      return Some(ResolutionResult::ambiguous(candidates, at));
    }
    let source = entry.symbol_source?;
    Some(self.resolved(source))
  }

  fn resolved(&mut self, sym: SymbolId) -> ResolutionResult {
    let final_symbol = self.alias_final(sym).unwrap_or(sym);
    ResolutionResult::resolved(sym, final_symbol)
  }

  /// Target of an alias. Plain-reference aliases are followed here; others
  /// only once the checker recorded their target.
  fn alias_final(&mut self, sym: SymbolId) -> Option<SymbolId> {
    let entry = self.binding.symbols.get(sym);
    if !entry.flags.contains(SymbolFlags::ALIAS) {
      return Some(sym);
    }
    if let Some(target) = entry.alias_target {
      return Some(target);
    }
    let decl = entry.first_declaration()?;
    let NodeKind::AliasStatement {
      value,
      template_parameters,
      ..
    } = self.tree.kind(decl)
    else {
      return None;
    };
    if !template_parameters.is_empty() {
      return None;
    }
    let value = *value;
    let NodeKind::TypeReference { arguments, .. } = self.tree.kind(value) else {
      return None;
    };
    if !arguments.is_empty() || !self.resolving.insert(value) {
      return None;
    }
    let result = self.resolve_reference(value);
    self.resolving.remove(&value);
    result.final_symbol.filter(|_| result.is_resolved())
  }

  fn resolve_member_at(&mut self, container: SymbolId, name: &str, at: NodeId) -> ResolutionResult {
    let mut container = container;
    for _ in 0..self.binding.symbols.len() {
      let entry = self.binding.symbols.get(container);
      if entry.flags.contains(SymbolFlags::USING) {
        match entry.symbol_source {
          Some(source) => container = source,
          None => break,
        }
        continue;
      }
      if entry.flags.contains(SymbolFlags::ALIAS) {
        match self.alias_final(container) {
          Some(target) if target != container => {
            container = target;
            continue;
          }
          _ => return ResolutionResult::unknown(Some(container), at),
        }
      }
      break;
    }
    let entry = self.binding.symbols.get(container);
    if entry.flags.intersects(SymbolFlags::EXPORT_CONTAINER) {
      let found = entry
        .exports
        .and_then(|exports| self.binding.symbols.lookup(exports, name));
      return match found {
        Some(sym) => self.resolved(sym),
        None => ResolutionResult::failed(ResolutionKind::NotFound, at),
      };
    }
    if entry.flags.contains(SymbolFlags::TEMPLATE_PARAMETER) {
      return ResolutionResult::unknown(None, at);
    }
    if !entry.flags.intersects(SymbolFlags::MEMBER_CONTAINER) {
      return ResolutionResult::failed(ResolutionKind::NotFound, at);
    }
    let mut current = Some(container);
    let mut steps = 0;
    while let Some(owner) = current {
      steps += 1;
      if steps > self.binding.symbols.len() {
        break;
      }
      let entry = self.binding.symbols.get(owner);
      let found = entry
        .members
        .and_then(|members| self.binding.symbols.lookup(members, name));
      if let Some(sym) = found {
        return self.resolved(sym);
      }
      if entry.has_unknown_members && !entry.members_bound {
        return ResolutionResult::unknown(Some(owner), at);
      }
      current = entry.base;
    }
    ResolutionResult::failed(ResolutionKind::NotFound, at)
  }

  /// Looks a member up on an already resolved container symbol.
  pub fn resolve_member(&mut self, container: SymbolId, name: &str, at: NodeId) -> ResolutionResult {
    self.resolve_member_at(container, name, at)
  }

  /// Resolves a dotted path such as `A.B.C` from the global namespace.
  pub fn resolve_path(&mut self, path: &str) -> Option<SymbolId> {
    let mut current = self.binding.global;
    for segment in path.split('.') {
      let entry = self.binding.symbols.get(current);
      let table = entry.exports.or(entry.members)?;
      let next = self
        .binding
        .symbols
        .lookup(table, segment)
        .or_else(|| {
          let base = self.binding.symbols.get(current).base?;
          let members = self.binding.symbols.members_of(base)?;
          self.binding.symbols.lookup(members, segment)
        })?;
      current = self.alias_final(next).unwrap_or(next);
    }
    Some(current)
  }

  /// Registers every `using` import into its scope's locals.
  pub(crate) fn bind_usings(&mut self, diagnostics: &mut DiagnosticCollector) {
    let usings = self.binding.usings.clone();
    let _span = tracing::debug_span!("bind_usings", usings = usings.len()).entered();
    let tree = Arc::clone(&self.tree);
    let mut imported: AHashMap<NodeId, Vec<SymbolId>> = AHashMap::default();
    for using in usings {
      let NodeKind::UsingStatement { name } = tree.kind(using) else {
        continue;
      };
      let Some(scope) = tree.parent(using) else {
        continue;
      };
      let Some(table) = self.binding.locals_of(scope) else {
        continue;
      };
      let result = self.resolve_reference(*name);
      let target = match result.kind {
        ResolutionKind::Resolved => result.final_symbol,
        ResolutionKind::NotFound => {
          diagnostics.push(codes::INVALID_REF.error(
            format!("Unknown identifier {}", reference_text(&tree, *name)),
            DiagnosticTarget::Node(result.failed_at.unwrap_or(*name)),
          ));
          None
        }
        ResolutionKind::Ambiguous | ResolutionKind::Unknown => None,
      };
      let Some(target) = target else {
        continue;
      };
      if !self
        .binding
        .symbols
        .get(target)
        .flags
        .contains(SymbolFlags::NAMESPACE)
      {
        diagnostics.push(codes::USING_INVALID_REF.error(
          "Using must refer to a namespace",
          DiagnosticTarget::Node(*name),
        ));
        continue;
      }
      let seen = imported.entry(scope).or_default();
      if seen.contains(&target) {
        let qualified = self.binding.symbols.qualified_name(target);
        let node = tree.node(using);
        let fix = CodeFix::new("remove-unused-code", "Remove duplicate using").with_edit(
          TextEdit::ReplaceText {
            file: node.file,
            range: node.range,
            text: String::new(),
          },
        );
        diagnostics.push(
          codes::DUPLICATE_USING
            .warning(
              format!("duplicate using of \"{qualified}\" namespace"),
              DiagnosticTarget::Node(using),
            )
            .with_codefix(fix),
        );
        continue;
      }
      seen.push(target);
      let Some(exports) = self.binding.symbols.exports_of(target) else {
        continue;
      };
      let entries: Vec<(String, SymbolId)> = self
        .binding
        .symbols
        .table(exports)
        .iter()
        .map(|(name, sym)| (name.to_string(), sym))
        .collect();
      tracing::trace!(using = using.0, imported = entries.len(), "using bound");
      for (name, source) in entries {
        let mut entry = Sym::new(name.clone(), SymbolFlags::USING);
        entry.node = Some(using);
        entry.symbol_source = Some(source);
        let entry = self.binding.symbols.alloc(entry);
        self.binding.symbols.set(table, &name, entry);
      }
    }
  }
}

/// Source text of an identifier chain, for messages.
pub(crate) fn reference_text(tree: &SyntaxTree, node: NodeId) -> String {
  match tree.kind(node) {
    NodeKind::Identifier { sv } => sv.clone(),
    NodeKind::TypeReference { target, .. } => reference_text(tree, *target),
    NodeKind::MemberExpression { base, id, selector } => {
      let sep = match selector {
        MemberSelector::Dot => ".",
        MemberSelector::DoubleColon => "::",
      };
      format!("{}{sep}{}", reference_text(tree, *base), reference_text(tree, *id))
    }
    _ => String::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::binder::bind;
  use diagnostics::FileId;
  use syntax_tsp::build::*;

  fn resolver_for(sources: Vec<Vec<Syn>>) -> (Arc<SyntaxTree>, NameResolver, DiagnosticCollector) {
    let mut builder = SyntaxTree::builder();
    for (i, stmts) in sources.into_iter().enumerate() {
      builder.add_script(FileId(i as u32), stmts);
    }
    let tree = Arc::new(builder.finish());
    let mut diagnostics = DiagnosticCollector::new();
    let binding = bind(&tree, &[], &mut diagnostics);
    let mut resolver = NameResolver::new(Arc::clone(&tree), binding);
    resolver.bind_usings(&mut diagnostics);
    (tree, resolver, diagnostics)
  }

  /// Every identifier reference target in the tree, with its text.
  fn references(tree: &SyntaxTree) -> Vec<(NodeId, String)> {
    (0..tree.len() as u32)
      .map(NodeId)
      .filter_map(|n| match tree.kind(n) {
        NodeKind::TypeReference { target, .. } => Some((*target, reference_text(tree, *target))),
        _ => None,
      })
      .collect()
  }

  fn find_reference(tree: &SyntaxTree, text: &str) -> NodeId {
    references(tree)
      .into_iter()
      .find(|(_, t)| t == text)
      .map(|(n, _)| n)
      .unwrap()
  }

  #[test]
  fn template_parameters_shadow_namespace_members() {
    let (tree, mut resolver, _) = resolver_for(vec![vec![
      model("T", vec![]),
      model("Box", vec![prop("v", reference("T"))]).templated(vec![template_param("T")]),
    ]]);
    let node = find_reference(&tree, "T");
    let result = resolver.resolve_reference(node);
    assert!(result.is_resolved());
    let sym = resolver.symbols().get(result.final_symbol.unwrap());
    assert!(sym.flags.contains(SymbolFlags::TEMPLATE_PARAMETER));
  }

  #[test]
  fn two_usings_make_a_name_ambiguous() {
    let (tree, mut resolver, diagnostics) = resolver_for(vec![vec![
      namespace("A", vec![model("Foo", vec![])]),
      namespace("B", vec![model("Foo", vec![])]),
      using("A"),
      using("B"),
      model("Use", vec![prop("f", reference("Foo"))]),
    ]]);
    assert!(diagnostics.is_empty());
    let result = resolver.resolve_reference(find_reference(&tree, "Foo"));
    assert_eq!(result.kind, ResolutionKind::Ambiguous);
    let names: Vec<String> = result
      .ambiguous_symbols
      .iter()
      .map(|&s| resolver.symbols().qualified_name(s))
      .collect();
    assert_eq!(names, vec!["A.Foo".to_string(), "B.Foo".to_string()]);
  }

  #[test]
  fn local_declarations_win_over_usings() {
    let (tree, mut resolver, _) = resolver_for(vec![vec![
      namespace("A", vec![model("Foo", vec![])]),
      namespace(
        "Main",
        vec![
          using("A"),
          model("Foo", vec![]),
          model("Use", vec![prop("f", reference("Foo"))]),
        ],
      ),
    ]]);
    let result = resolver.resolve_reference(find_reference(&tree, "Foo"));
    assert_eq!(
      resolver.symbols().qualified_name(result.final_symbol.unwrap()),
      "Main.Foo"
    );
  }

  #[test]
  fn global_declarations_win_over_file_usings() {
    let (tree, mut resolver, diagnostics) = resolver_for(vec![vec![
      namespace("A", vec![model("Foo", vec![])]),
      using("A"),
      model("Foo", vec![]),
      model("Use", vec![prop("f", reference("Foo"))]),
    ]]);
    assert!(diagnostics.is_empty());
    let result = resolver.resolve_reference(find_reference(&tree, "Foo"));
    assert!(result.is_resolved());
    assert_eq!(
      resolver.symbols().qualified_name(result.final_symbol.unwrap()),
      "Foo"
    );
  }

  #[test]
  fn file_usings_fill_in_missing_names() {
    let (tree, mut resolver, _) = resolver_for(vec![vec![
      namespace("A", vec![model("Foo", vec![])]),
      using("A"),
      model("Use", vec![prop("f", reference("Foo"))]),
    ]]);
    let result = resolver.resolve_reference(find_reference(&tree, "Foo"));
    assert_eq!(
      resolver.symbols().qualified_name(result.final_symbol.unwrap()),
      "A.Foo"
    );
  }

  #[test]
  fn spread_containers_report_unknown_members() {
    let (tree, mut resolver, _) = resolver_for(vec![vec![
      model("A", vec![prop("x", reference("string"))]),
      model("B", vec![spread("A")]),
      alias("X", reference("B.x")),
      alias("Y", reference("A.y")),
    ]]);
    let unknown = resolver.resolve_reference(find_reference(&tree, "B.x"));
    assert_eq!(unknown.kind, ResolutionKind::Unknown);
    assert!(unknown.unknown_container.is_some());
    let missing = resolver.resolve_reference(find_reference(&tree, "A.y"));
    assert_eq!(missing.kind, ResolutionKind::NotFound);
  }

  #[test]
  fn aliases_resolve_through_to_their_target() {
    let (tree, mut resolver, _) = resolver_for(vec![vec![
      namespace("N", vec![model("Target", vec![])]),
      alias("A", reference("N.Target")),
      model("Use", vec![prop("a", reference("A"))]),
    ]]);
    let result = resolver.resolve_reference(find_reference(&tree, "A"));
    let resolved = result.resolved_symbol.unwrap();
    assert!(resolver
      .symbols()
      .get(resolved)
      .flags
      .contains(SymbolFlags::ALIAS));
    assert_eq!(
      resolver.symbols().qualified_name(result.final_symbol.unwrap()),
      "N.Target"
    );
  }

  #[test]
  fn duplicate_using_suggests_removal() {
    let (_, _, diagnostics) = resolver_for(vec![vec![
      namespace("A", vec![]),
      using("A"),
      using("A"),
    ]]);
    let diag = &diagnostics.diagnostics()[0];
    assert_eq!(diag.code, codes::DUPLICATE_USING.id);
    assert_eq!(diag.codefixes.len(), 1);
  }

  #[test]
  fn using_a_model_is_rejected() {
    let (_, _, diagnostics) = resolver_for(vec![vec![model("M", vec![]), using("M")]]);
    assert_eq!(diagnostics.diagnostics()[0].code, codes::USING_INVALID_REF.id);
  }
}
