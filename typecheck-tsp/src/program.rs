use crate::binder;
use crate::check::Checker;
use crate::decorators::DecoratorRegistry;
use crate::decorators::MarshalledValue;
use crate::decorators::ProgramState;
use crate::diagnostic::Diagnostic;
use crate::diagnostic::DiagnosticCollector;
use crate::diagnostic::DiagnosticRecord;
use crate::diagnostic::DiagnosticTarget;
use crate::error::FatalError;
use crate::error::Ice;
use crate::ids::NodeId;
use crate::ids::TypeId;
use crate::ids::ValueId;
use crate::instantiate::InstantiationStats;
use crate::library::Library;
use crate::library::LibraryDef;
use crate::library::LibraryInstance;
use crate::options::CheckerOptions;
use crate::resolve::NameResolver;
use crate::stdlib;
use crate::symbols::SymbolArena;
use crate::types::Entity;
use crate::types::TypeStore;
use diagnostics::render::render_diagnostic;
use diagnostics::render::SourceProvider;
use diagnostics::FileId;
use diagnostics::Span;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use syntax_tsp::build::Syn;
use syntax_tsp::build::TreeBuilder;
use syntax_tsp::NodeKind;
use syntax_tsp::SyntaxTree;

/// Stages sources and libraries for one compilation. The standard library
/// prelude is staged first.
pub struct ProgramBuilder {
  tree: TreeBuilder,
  registry: DecoratorRegistry,
  libraries: Vec<LibraryInstance>,
}

impl Default for ProgramBuilder {
  fn default() -> Self {
    Self::new()
  }
}

impl ProgramBuilder {
  pub fn new() -> Self {
    let mut tree = SyntaxTree::builder();
    tree.add_script(stdlib::STDLIB_FILE, stdlib::prelude());
    ProgramBuilder {
      tree,
      registry: stdlib::registry(),
      libraries: Vec::new(),
    }
  }

  /// Adds a source file; returns its script node.
  pub fn add_source(&mut self, file: FileId, statements: Vec<Syn>) -> NodeId {
    self.tree.add_script(file, statements)
  }

  /// Adds a library's entrypoint and decorators; returns the entrypoint
  /// script node.
  pub fn add_library(&mut self, library: Library) -> NodeId {
    let Library {
      metadata,
      definition,
      statements,
      decorators,
    } = library;
    let file = FileId(u32::MAX - 1 - self.libraries.len() as u32);
    let entrypoint = self.tree.add_script(file, statements);
    self.registry.merge(&decorators);
    self.libraries.push(LibraryInstance {
      metadata,
      definition,
      entrypoint: Some(entrypoint),
    });
    entrypoint
  }

  pub fn decorators_mut(&mut self) -> &mut DecoratorRegistry {
    &mut self.registry
  }

  pub fn compile(self, options: CheckerOptions) -> Result<Program, FatalError> {
    let tree = Arc::new(self.tree.finish());
    Program::compile(tree, self.registry, self.libraries, options)
  }
}

/// A checked compilation: the entity graph, symbols and diagnostics.
pub struct Program {
  checker: Checker,
  libraries: Vec<LibraryInstance>,
}

impl Program {
  /// Binds and checks every script of `tree`.
  pub fn compile(
    tree: Arc<SyntaxTree>,
    registry: DecoratorRegistry,
    libraries: Vec<LibraryInstance>,
    options: CheckerOptions,
  ) -> Result<Program, FatalError> {
    let span = tracing::debug_span!(
      "compile",
      files = tree.scripts().len() as u64,
      libraries = libraries.len() as u64,
      diagnostics = tracing::field::Empty,
      duration_ms = tracing::field::Empty,
    );
    let _guard = span.enter();
    let start = Instant::now();
    for &script in tree.scripts() {
      if !matches!(tree.kind(script), NodeKind::Script { .. }) {
        return Err(
          Ice::new("source root is not a script")
            .with_context("node", script.0.to_string())
            .with_context("kind", tree.kind(script).name())
            .into(),
        );
      }
    }
    let mut diagnostics = DiagnosticCollector::new();
    let binding = binder::bind(&tree, &registry.symbols(), &mut diagnostics);
    let definitions: Vec<LibraryDef> = libraries.iter().map(|l| l.definition.clone()).collect();
    let mut checker = Checker::new(tree, binding, registry, definitions, options, diagnostics);
    checker.check_program();
    span.record("diagnostics", checker.diagnostics.len() as u64);
    span.record("duration_ms", start.elapsed().as_secs_f64() * 1000.0);
    Ok(Program { checker, libraries })
  }

  pub fn tree(&self) -> &SyntaxTree {
    &self.checker.tree
  }

  pub fn global_namespace(&self) -> TypeId {
    self.checker.global_namespace()
  }

  pub fn store(&self) -> &TypeStore {
    &self.checker.store
  }

  pub fn symbols(&self) -> &SymbolArena {
    self.checker.resolver.symbols()
  }

  pub fn resolver(&self) -> &NameResolver {
    &self.checker.resolver
  }

  pub fn libraries(&self) -> &[LibraryInstance] {
    &self.libraries
  }

  pub fn diagnostics(&self) -> &[Diagnostic] {
    self.checker.diagnostics.diagnostics()
  }

  pub fn has_errors(&self) -> bool {
    self.checker.diagnostics.has_errors()
  }

  pub fn state(&self) -> &ProgramState {
    &self.checker.state
  }

  pub fn state_map(&self, key: &str) -> Option<&BTreeMap<TypeId, MarshalledValue>> {
    self.checker.state.map(key)
  }

  pub fn state_set(&self, key: &str) -> Option<&BTreeSet<TypeId>> {
    self.checker.state.set(key)
  }

  /// Text recorded by `@doc`.
  pub fn doc(&self, ty: TypeId) -> Option<&str> {
    self.checker.state.get(stdlib::DOC_KEY, ty)?.as_str()
  }

  /// Type declared at a dotted path such as `My.Service.Widget`.
  pub fn resolve_type_path(&mut self, path: &str) -> Option<TypeId> {
    let sym = self.checker.resolver.resolve_path(path)?;
    self.checker.type_of_symbol(sym)
  }

  /// Value of the `const` declared at a dotted path.
  pub fn resolve_value_path(&mut self, path: &str) -> Option<ValueId> {
    let sym = self.checker.resolver.resolve_path(path)?;
    let decl = self.symbols().get(sym).first_declaration()?;
    self.checker.check_node(decl, None).as_value()
  }

  /// Entity checked for `node` outside any instantiation.
  pub fn type_of_node(&self, node: NodeId) -> Option<Entity> {
    self.checker.cached_node(node, None)
  }

  pub fn instantiation_stats(&self) -> InstantiationStats {
    self.checker.instantiations.stats
  }

  /// Number of memoized instantiations.
  pub fn instantiation_count(&self) -> usize {
    self.checker.instantiations.len()
  }

  pub fn walk_properties_inherited(&self, model: TypeId) -> Vec<TypeId> {
    self.checker.walk_properties_inherited(model)
  }

  pub fn is_type_assignable(&self, source: TypeId, target: TypeId) -> bool {
    self.checker.is_type_assignable(source, target)
  }

  pub fn display(&self, ty: TypeId) -> String {
    self.checker.display(ty)
  }

  /// Source location of a diagnostic target. Nodes inside a template body
  /// reported for one instantiation are located at the reference that
  /// requested the instantiation.
  pub fn locate(&self, target: DiagnosticTarget) -> Option<Span> {
    let tree = &self.checker.tree;
    match target {
      DiagnosticTarget::Node(node) => Some(tree.node(node).span()),
      DiagnosticTarget::TemplateInstance { node, mapper } => {
        let mut current = Some(mapper);
        while let Some(id) = current {
          let mapper = self.checker.store.mapper(id);
          if let Some(source) = mapper.source {
            return Some(tree.node(source).span());
          }
          current = mapper.parent;
        }
        Some(tree.node(node).span())
      }
      DiagnosticTarget::Entity(Entity::Type(ty)) | DiagnosticTarget::Entity(Entity::Indeterminate(ty)) => {
        let data = self.checker.store.get(ty);
        match data.template_mapper {
          Some(mapper) => self.locate(DiagnosticTarget::TemplateInstance {
            node: data.node?,
            mapper,
          }),
          None => data.node.map(|node| tree.node(node).span()),
        }
      }
      DiagnosticTarget::Entity(Entity::Value(value)) => {
        let node = self.checker.store.value(value).node?;
        Some(tree.node(node).span())
      }
      DiagnosticTarget::Entity(Entity::Constraint(constraint)) => {
        constraint.node.map(|node| tree.node(node).span())
      }
      DiagnosticTarget::Symbol(sym) => {
        let decl = self.symbols().get(sym).first_declaration()?;
        Some(tree.node(decl).span())
      }
      DiagnosticTarget::Span(span) => Some(span),
      DiagnosticTarget::NoTarget => None,
    }
  }

  /// Located diagnostics, ready for rendering.
  pub fn located_diagnostics(&self) -> Vec<diagnostics::Diagnostic> {
    self
      .diagnostics()
      .iter()
      .map(|d| {
        let mut located =
          diagnostics::Diagnostic::new(d.severity, d.code.clone(), d.message.clone(), self.locate(d.target));
        located.codefixes = d.codefixes.clone();
        located
      })
      .collect()
  }

  pub fn render_diagnostics(&self, provider: &dyn SourceProvider) -> String {
    self
      .located_diagnostics()
      .iter()
      .map(|d| render_diagnostic(provider, d))
      .collect()
  }

  /// Serializable form of the diagnostics, in report order.
  pub fn to_records(&self) -> Vec<DiagnosticRecord> {
    self
      .diagnostics()
      .iter()
      .map(|d| DiagnosticRecord {
        code: d.code.to_string(),
        severity: d.severity,
        message: d.message.clone(),
        span: self.locate(d.target),
        codefixes: d.codefixes.clone(),
      })
      .collect()
  }
}
