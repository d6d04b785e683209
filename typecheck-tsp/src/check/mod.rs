//! The checker: turns bound syntax into the entity graph.
//!
//! Entities are produced on demand. A reference to a declaration checks that
//! declaration first, so dependency order falls out of the traversal instead
//! of a separate pass. Every declaration type is registered before its body
//! is checked, which lets non-template declarations refer to themselves.
//!
//! Results are memoized per `(node, mapper)` and per symbol. A type finishes
//! once its decorators ran, and never under a template declaration or a
//! partial mapper.

mod declarations;
mod expressions;
mod members;
mod relate;
mod values;

use crate::binder::Binding;
use crate::codes;
use crate::decorators::DecoratorRegistry;
use crate::decorators::ProgramState;
use crate::diagnostic::Diagnostic;
use crate::diagnostic::DiagnosticCollector;
use crate::diagnostic::DiagnosticTarget;
use crate::ids::MapperId;
use crate::ids::NodeId;
use crate::ids::SymbolId;
use crate::ids::TypeId;
use crate::ids::ValueId;
use crate::instantiate::Instantiations;
use crate::library::LibraryDef;
use crate::options::CheckerOptions;
use crate::resolve::NameResolver;
use crate::symbols::SymbolFlags;
use crate::types::Entity;
use crate::types::EntityDisplay;
use crate::types::Namespace;
use crate::types::TypeDisplay;
use crate::types::TypeKind;
use crate::types::TypeStore;
use ahash::AHashMap;
use ahash::AHashSet;
use diagnostics::Severity;
use std::sync::Arc;
use syntax_tsp::NodeKind;
use syntax_tsp::SyntaxTree;

pub(crate) struct Checker {
  pub(crate) tree: Arc<SyntaxTree>,
  pub(crate) options: CheckerOptions,
  pub(crate) resolver: NameResolver,
  pub(crate) store: TypeStore,
  pub(crate) diagnostics: DiagnosticCollector,
  pub(crate) registry: DecoratorRegistry,
  pub(crate) libraries: Vec<LibraryDef>,
  pub(crate) state: ProgramState,
  pub(crate) instantiations: Instantiations,
  /// Helper-decorator delegation in progress, innermost last.
  pub(crate) decorator_stack: Vec<(String, String)>,
  node_entities: AHashMap<(NodeId, Option<MapperId>), Entity>,
  symbol_entities: AHashMap<SymbolId, Entity>,
  namespace_types: AHashMap<SymbolId, TypeId>,
  namespace_order: Vec<SymbolId>,
  template_params: AHashMap<NodeId, TypeId>,
  /// Aliases and consts being checked; re-entry is a cycle.
  pending: AHashSet<SymbolId>,
  /// Declarations whose `extends`/`is` clause is being checked.
  resolving_bases: AHashSet<SymbolId>,
  augments: AHashMap<SymbolId, Vec<NodeId>>,
  forced_values: AHashMap<TypeId, ValueId>,
  global_namespace: TypeId,
}

impl Checker {
  pub(crate) fn new(
    tree: Arc<SyntaxTree>,
    binding: Binding,
    registry: DecoratorRegistry,
    libraries: Vec<LibraryDef>,
    options: CheckerOptions,
    diagnostics: DiagnosticCollector,
  ) -> Self {
    let global = binding.global;
    let mut resolver = NameResolver::new(Arc::clone(&tree), binding);
    let mut diagnostics = diagnostics;
    resolver.bind_usings(&mut diagnostics);
    let mut store = TypeStore::new();
    let global_namespace = store.alloc(
      TypeKind::Namespace(Namespace {
        symbol: Some(global),
        ..Namespace::default()
      }),
      None,
    );
    let mut namespace_types = AHashMap::default();
    namespace_types.insert(global, global_namespace);
    Checker {
      tree,
      options,
      resolver,
      store,
      diagnostics,
      registry,
      libraries,
      state: ProgramState::default(),
      instantiations: Instantiations::default(),
      decorator_stack: Vec::new(),
      node_entities: AHashMap::default(),
      symbol_entities: AHashMap::default(),
      namespace_types,
      namespace_order: vec![global],
      template_params: AHashMap::default(),
      pending: AHashSet::default(),
      resolving_bases: AHashSet::default(),
      augments: AHashMap::default(),
      forced_values: AHashMap::default(),
      global_namespace,
    }
  }

  pub(crate) fn global_namespace(&self) -> TypeId {
    self.global_namespace
  }

  pub(crate) fn check_program(&mut self) {
    let scripts = self.tree.scripts().to_vec();
    let _span = tracing::debug_span!("check_program", scripts = scripts.len()).entered();
    self.collect_augments();
    let tree = Arc::clone(&self.tree);
    for script in scripts {
      if let NodeKind::Script { statements, .. } = tree.kind(script) {
        for &stmt in statements {
          self.check_statement(stmt);
        }
      }
    }
    self.finish_namespaces();
    tracing::debug!(
      types = self.store.len(),
      diagnostics = self.diagnostics.len(),
      "checked"
    );
  }

  fn check_statement(&mut self, node: NodeId) {
    self.check_directives(node);
    let tree = Arc::clone(&self.tree);
    match tree.kind(node) {
      NodeKind::NamespaceStatement { statements, .. } => {
        if let Some(sym) = self.resolver.binding.symbol_of(node) {
          self.namespace_type(sym);
        }
        for &stmt in statements {
          self.check_statement(stmt);
        }
      }
      NodeKind::ModelStatement { .. }
      | NodeKind::ScalarStatement { .. }
      | NodeKind::InterfaceStatement { .. }
      | NodeKind::UnionStatement { .. }
      | NodeKind::EnumStatement { .. }
      | NodeKind::OperationStatement { .. }
      | NodeKind::AliasStatement { .. }
      | NodeKind::ConstStatement { .. }
      | NodeKind::DecoratorDeclarationStatement { .. } => {
        self.check_node(node, None);
      }
      _ => {}
    }
  }

  /// Entity of any checkable node, memoized per mapper.
  pub(crate) fn check_node(&mut self, node: NodeId, mapper: Option<MapperId>) -> Entity {
    if let Some(&cached) = self.node_entities.get(&(node, mapper)) {
      return cached;
    }
    let entity = self.check_node_uncached(node, mapper);
    self.node_entities.insert((node, mapper), entity);
    entity
  }

  pub(crate) fn cache_node(&mut self, node: NodeId, mapper: Option<MapperId>, entity: Entity) {
    self.node_entities.insert((node, mapper), entity);
  }

  pub(crate) fn cached_node(&self, node: NodeId, mapper: Option<MapperId>) -> Option<Entity> {
    self.node_entities.get(&(node, mapper)).copied()
  }

  fn check_node_uncached(&mut self, node: NodeId, mapper: Option<MapperId>) -> Entity {
    let tree = Arc::clone(&self.tree);
    match tree.kind(node) {
      NodeKind::ModelStatement { .. } => Entity::Type(self.check_model_statement(node, mapper)),
      NodeKind::ScalarStatement { .. } => Entity::Type(self.check_scalar(node, mapper)),
      NodeKind::InterfaceStatement { .. } => Entity::Type(self.check_interface(node, mapper)),
      NodeKind::UnionStatement { .. } => Entity::Type(self.check_union_statement(node, mapper)),
      NodeKind::EnumStatement { .. } => Entity::Type(self.check_enum(node)),
      NodeKind::OperationStatement { .. } => match tree.parent(node).map(|p| tree.kind(p)) {
        Some(NodeKind::InterfaceStatement { .. }) => self.check_member_node(node, mapper),
        _ => Entity::Type(self.check_operation(node, None, mapper)),
      },
      NodeKind::AliasStatement { .. } => self.check_alias(node, mapper),
      NodeKind::ConstStatement { .. } => Entity::Value(self.check_const(node)),
      NodeKind::DecoratorDeclarationStatement { .. } => {
        Entity::Type(self.check_decorator_declaration(node))
      }
      NodeKind::NamespaceStatement { .. } => match self.resolver.binding.symbol_of(node) {
        Some(sym) => Entity::Type(self.namespace_type(sym)),
        None => Entity::Type(self.store.error_type()),
      },
      NodeKind::TemplateParameterDeclaration { .. } => {
        let param = self.template_parameter_type(node);
        match mapper.and_then(|m| self.store.mapper(m).get(param)) {
          Some(entity) => entity,
          None => Entity::Type(param),
        }
      }
      NodeKind::ModelProperty { .. }
      | NodeKind::ScalarConstructor { .. }
      | NodeKind::EnumMember { .. }
      | NodeKind::UnionVariant { .. } => self.check_member_node(node, mapper),
      NodeKind::OperationSignatureDeclaration { .. }
      | NodeKind::OperationSignatureReference { .. } => Entity::Type(self.store.error_type()),
      NodeKind::TypeReference { .. }
      | NodeKind::Identifier { .. }
      | NodeKind::MemberExpression { .. } => self.check_reference(node, mapper),
      NodeKind::StringLiteral { value } => {
        Entity::Indeterminate(self.store.string_literal(value, Some(node)))
      }
      NodeKind::NumericLiteral {
        value,
        value_as_string,
      } => {
        let numeric = crate::types::Numeric::new(value_as_string.clone(), *value);
        Entity::Indeterminate(self.store.number_literal(numeric, Some(node)))
      }
      NodeKind::BooleanLiteral { value } => {
        Entity::Indeterminate(self.store.boolean_literal(*value))
      }
      NodeKind::StringTemplateExpression { .. } => self.check_string_template(node, mapper),
      NodeKind::VoidKeyword => Entity::Type(self.store.intrinsics().void),
      NodeKind::NeverKeyword => Entity::Type(self.store.intrinsics().never),
      NodeKind::UnknownKeyword => Entity::Type(self.store.intrinsics().unknown),
      NodeKind::NullKeyword => Entity::Indeterminate(self.store.intrinsics().null),
      NodeKind::ModelExpression { .. } => Entity::Type(self.check_model_expression(node, mapper)),
      NodeKind::UnionExpression { .. } => Entity::Type(self.check_union_expression(node, mapper)),
      NodeKind::IntersectionExpression { .. } => {
        Entity::Type(self.check_intersection(node, mapper))
      }
      NodeKind::TupleExpression { .. } => Entity::Type(self.check_tuple(node, mapper)),
      NodeKind::ArrayExpression { element_type } => {
        Entity::Type(self.check_array_expression(node, *element_type, mapper))
      }
      NodeKind::ValueOfExpression { .. } => Entity::Constraint(self.check_constraint(node, mapper)),
      NodeKind::TypeOfExpression { target } => {
        let value = self.check_value(*target, mapper, None);
        Entity::Type(self.store.value(value).ty)
      }
      NodeKind::CallExpression { .. } => Entity::Value(self.check_call(node, mapper)),
      NodeKind::ObjectLiteral { .. } => Entity::Value(self.check_object_literal(node, mapper)),
      NodeKind::ArrayLiteral { .. } => Entity::Value(self.check_array_literal(node, mapper)),
      _ => Entity::Type(self.store.error_type()),
    }
  }

  /// The node's entity in a type position.
  pub(crate) fn check_type(&mut self, node: NodeId, mapper: Option<MapperId>) -> TypeId {
    match self.check_node(node, mapper) {
      Entity::Type(ty) | Entity::Indeterminate(ty) => ty,
      Entity::Value(_) => {
        let target = self.target_at(node, mapper);
        self.report(codes::VALUE_IN_TYPE.error("A value cannot be used as a type.", target));
        self.store.error_type()
      }
      Entity::Constraint(_) => {
        let target = self.target_at(node, mapper);
        self.report(codes::VALUE_IN_TYPE.error(
          "A `valueof` constraint cannot be used as a type.",
          target,
        ));
        self.store.error_type()
      }
    }
  }

  pub(crate) fn symbol_of(&self, node: NodeId) -> Option<SymbolId> {
    self.resolver.binding.symbol_of(node)
  }

  pub(crate) fn symbol_entity_cached(&self, sym: SymbolId) -> Option<Entity> {
    self.symbol_entities.get(&sym).copied()
  }

  pub(crate) fn register_symbol_entity(&mut self, sym: SymbolId, entity: Entity) {
    self.symbol_entities.insert(sym, entity);
  }

  /// Declared type of a resolved symbol, without checking anything new.
  pub(crate) fn declared_type_of_symbol(&self, sym: SymbolId) -> Option<TypeId> {
    let entry = self.resolver.symbols().get(sym);
    if let Some(ty) = entry.late_type {
      return Some(ty);
    }
    if entry.flags.contains(SymbolFlags::NAMESPACE) {
      return self.namespace_types.get(&sym).copied();
    }
    if let Some(entity) = self.symbol_entities.get(&sym) {
      return entity.as_type();
    }
    let decl = entry.first_declaration()?;
    self.cached_node(decl, None).and_then(Entity::as_type)
  }

  /// Type of a symbol, checking its declaration if needed.
  pub(crate) fn type_of_symbol(&mut self, sym: SymbolId) -> Option<TypeId> {
    if let Some(ty) = self.declared_type_of_symbol(sym) {
      return Some(ty);
    }
    let entry = self.resolver.symbols().get(sym);
    if entry.flags.contains(SymbolFlags::NAMESPACE) {
      return Some(self.namespace_type(sym));
    }
    let decl = entry.first_declaration()?;
    self.check_node(decl, None).as_type()
  }

  pub(crate) fn namespace_type(&mut self, sym: SymbolId) -> TypeId {
    if let Some(&ty) = self.namespace_types.get(&sym) {
      return ty;
    }
    let entry = self.resolver.symbols().get(sym);
    let name = entry.name.clone();
    let parent = entry.parent;
    let decl = entry.first_declaration();
    let parent_type = parent.map(|p| self.namespace_type(p));
    let ty = self.store.alloc(
      TypeKind::Namespace(Namespace {
        name: name.clone(),
        namespace: parent_type,
        symbol: Some(sym),
        ..Namespace::default()
      }),
      decl,
    );
    self.namespace_types.insert(sym, ty);
    self.namespace_order.push(sym);
    if let Some(parent_type) = parent_type {
      if let TypeKind::Namespace(parent) = &mut self.store.get_mut(parent_type).kind {
        parent.namespaces.insert(name, ty);
      }
    }
    ty
  }

  /// Namespace declaring `node`, by lexical nesting.
  pub(crate) fn enclosing_namespace(&mut self, node: NodeId) -> TypeId {
    let tree = Arc::clone(&self.tree);
    for ancestor in tree.ancestors(node).skip(1) {
      if let NodeKind::NamespaceStatement { .. } = tree.kind(ancestor) {
        if let Some(sym) = self.symbol_of(ancestor) {
          return self.namespace_type(sym);
        }
      }
    }
    self.global_namespace
  }

  /// Registers a named declaration on its namespace.
  pub(crate) fn register_in_namespace(&mut self, namespace: TypeId, ty: TypeId) {
    let data = self.store.get(ty);
    let Some(name) = data.name().map(str::to_string) else {
      return;
    };
    let kind = data.kind.kind_name();
    let TypeKind::Namespace(ns) = &mut self.store.get_mut(namespace).kind else {
      return;
    };
    let collection = match kind {
      "Model" => &mut ns.models,
      "Scalar" => &mut ns.scalars,
      "Operation" => &mut ns.operations,
      "Interface" => &mut ns.interfaces,
      "Enum" => &mut ns.enums,
      "Union" => &mut ns.unions,
      "Decorator" => &mut ns.decorator_declarations,
      _ => return,
    };
    if !collection.contains_key(&name) {
      collection.insert(name, ty);
    }
  }

  /// Whether a type created for `node` under `mapper` depends on unbound
  /// template parameters.
  pub(crate) fn in_template(&mut self, node: NodeId, mapper: Option<MapperId>) -> bool {
    if let Some(m) = mapper {
      let data = self.store.mapper(m);
      if data.partial || data.args.iter().any(|&arg| self.is_template_dependent(arg)) {
        return true;
      }
    }
    let tree = Arc::clone(&self.tree);
    for ancestor in tree.ancestors(node) {
      let params = tree.kind(ancestor).template_parameters();
      for &param in params {
        let param_type = self.template_parameter_type(param);
        let bound = mapper
          .map(|m| self.store.mapper(m).get(param_type).is_some())
          .unwrap_or(false);
        if !bound {
          return true;
        }
      }
    }
    false
  }

  pub(crate) fn is_template_dependent(&self, entity: Entity) -> bool {
    match entity {
      Entity::Type(ty) | Entity::Indeterminate(ty) => {
        let data = self.store.get(ty);
        data.in_template || matches!(data.kind, TypeKind::TemplateParameter(_))
      }
      Entity::Value(_) => false,
      Entity::Constraint(c) => {
        c.ty.is_some_and(|t| self.is_template_dependent(Entity::Type(t)))
          || c
            .value_type
            .is_some_and(|t| self.is_template_dependent(Entity::Type(t)))
      }
    }
  }

  /// Stamps instantiation metadata on a freshly allocated type.
  pub(crate) fn init_type(&mut self, ty: TypeId, node: NodeId, mapper: Option<MapperId>) {
    let in_template = self.in_template(node, mapper);
    let data = self.store.get_mut(ty);
    data.in_template = in_template;
    if let Some(mapper) = mapper {
      data.template_mapper = Some(mapper);
      data.template_node = Some(node);
    }
  }

  /// Runs decorators and marks the type finished.
  pub(crate) fn finish_type(&mut self, ty: TypeId) {
    let data = self.store.get(ty);
    if data.is_finished || data.in_template {
      return;
    }
    let applications = data.decorators.clone();
    for application in &applications {
      self.apply_decorator(ty, application);
    }
    self.store.get_mut(ty).is_finished = true;
  }

  fn finish_namespaces(&mut self) {
    let order = self.namespace_order.clone();
    let tree = Arc::clone(&self.tree);
    for sym in order {
      let ty = self.namespace_type(sym);
      let declarations = self.resolver.symbols().get(sym).declarations.clone();
      let mut applications = Vec::new();
      for decl in declarations {
        for &decorator in tree.kind(decl).decorators() {
          applications.extend(self.check_decorator_application(decorator, None));
        }
      }
      applications.extend(self.augment_applications(sym));
      self.store.get_mut(ty).decorators.extend(applications);
      self.finish_type(ty);
    }
  }

  pub(crate) fn display(&self, ty: TypeId) -> String {
    TypeDisplay::new(&self.store, ty).to_string()
  }

  pub(crate) fn display_entity(&self, entity: Entity) -> String {
    EntityDisplay::new(&self.store, entity).to_string()
  }

  /// Diagnostic target for `node`, attributed to the instantiation when the
  /// node belongs to the template being instantiated.
  pub(crate) fn target_at(&self, node: NodeId, mapper: Option<MapperId>) -> DiagnosticTarget {
    let Some(mapper) = mapper else {
      return DiagnosticTarget::Node(node);
    };
    let declaration = self.store.mapper(mapper).declaration;
    let decl_nodes = &self.resolver.symbols().get(declaration).declarations;
    let inside = self
      .tree
      .ancestors(node)
      .any(|ancestor| decl_nodes.contains(&ancestor));
    if inside {
      DiagnosticTarget::TemplateInstance { node, mapper }
    } else {
      DiagnosticTarget::Node(node)
    }
  }

  /// Reports through suppression directives and severity options.
  pub(crate) fn report(&mut self, mut diagnostic: Diagnostic) {
    if self.options.suppress_directives {
      if let Some(site) = self.site_of(diagnostic.target) {
        if let Some(directive) = self.find_suppression(site, &diagnostic.code) {
          if diagnostic.severity == Severity::Warning {
            return;
          }
          self.diagnostics.push(codes::SUPPRESS_ERROR.error(
            "Errors cannot be suppressed.",
            DiagnosticTarget::Node(directive),
          ));
        }
      }
    }
    if self.options.warnings_as_errors {
      diagnostic.severity = Severity::Error;
    }
    self.diagnostics.push(diagnostic);
  }

  fn site_of(&self, target: DiagnosticTarget) -> Option<NodeId> {
    match target {
      DiagnosticTarget::Node(node) | DiagnosticTarget::TemplateInstance { node, .. } => Some(node),
      DiagnosticTarget::Entity(Entity::Type(ty)) | DiagnosticTarget::Entity(Entity::Indeterminate(ty)) => {
        self.store.get(ty).node
      }
      DiagnosticTarget::Entity(Entity::Value(value)) => self.store.value(value).node,
      DiagnosticTarget::Symbol(sym) => self.resolver.symbols().get(sym).first_declaration(),
      _ => None,
    }
  }

  fn find_suppression(&self, site: NodeId, code: &str) -> Option<NodeId> {
    for ancestor in self.tree.ancestors(site) {
      for &directive in &self.tree.node(ancestor).directives {
        let NodeKind::DirectiveExpression { target, arguments } = self.tree.kind(directive) else {
          continue;
        };
        if self.tree.identifier(*target) != Some("suppress") {
          continue;
        }
        let suppressed = arguments.first().and_then(|&arg| match self.tree.kind(arg) {
          NodeKind::StringLiteral { value } => Some(value.as_str()),
          _ => None,
        });
        if suppressed == Some(code) {
          return Some(directive);
        }
      }
    }
    None
  }

  fn check_directives(&mut self, node: NodeId) {
    let tree = Arc::clone(&self.tree);
    for &directive in &tree.node(node).directives {
      let NodeKind::DirectiveExpression { target, arguments } = tree.kind(directive) else {
        continue;
      };
      let name = tree.identifier(*target).unwrap_or("");
      let first_is_string = arguments
        .first()
        .is_some_and(|&arg| matches!(tree.kind(arg), NodeKind::StringLiteral { .. }));
      match name {
        "suppress" | "deprecated" if first_is_string => {}
        "suppress" | "deprecated" => self.report(codes::INVALID_DIRECTIVE.error(
          format!("#{name} directive expects a string argument."),
          DiagnosticTarget::Node(directive),
        )),
        _ => self.report(codes::INVALID_DIRECTIVE.error(
          format!("Unknown directive '#{name}'"),
          DiagnosticTarget::Node(directive),
        )),
      }
    }
  }

  /// Message of a `#deprecated` directive on `decl`.
  pub(crate) fn deprecation_of(&self, decl: NodeId) -> Option<String> {
    self.tree.node(decl).directives.iter().find_map(|&directive| {
      let NodeKind::DirectiveExpression { target, arguments } = self.tree.kind(directive) else {
        return None;
      };
      if self.tree.identifier(*target) != Some("deprecated") {
        return None;
      }
      match self.tree.kind(*arguments.first()?) {
        NodeKind::StringLiteral { value } => Some(value.clone()),
        _ => None,
      }
    })
  }

  /// Warns at a reference to a deprecated symbol, unless the reference sits
  /// inside deprecated code itself.
  pub(crate) fn check_deprecated(&mut self, sym: SymbolId, reference: NodeId, mapper: Option<MapperId>) {
    let Some(decl) = self.resolver.symbols().get(sym).first_declaration() else {
      return;
    };
    let Some(message) = self.deprecation_of(decl) else {
      return;
    };
    let within_deprecated = self
      .tree
      .ancestors(reference)
      .any(|ancestor| self.deprecation_of(ancestor).is_some());
    if within_deprecated {
      return;
    }
    let target = self.target_at(reference, mapper);
    self.report(codes::DEPRECATED.warning(message, target));
  }

  fn collect_augments(&mut self) {
    let augments = self.resolver.binding.augments.clone();
    let tree = Arc::clone(&self.tree);
    for augment in augments {
      let NodeKind::AugmentDecoratorStatement { target_type, .. } = tree.kind(augment) else {
        continue;
      };
      let target = match tree.kind(*target_type) {
        NodeKind::TypeReference { target, .. } => *target,
        _ => *target_type,
      };
      let result = self.resolve_with_late_binding(target);
      let Some(sym) = result.final_symbol.filter(|_| result.is_resolved()) else {
        self.report_resolution_failure(target, &result);
        continue;
      };
      let entry = self.resolver.symbols().get(sym);
      if entry.flags.contains(SymbolFlags::TEMPLATE_PARAMETER) {
        self.report(codes::AUGMENT_TARGET.error(
          "Cannot augment a template parameter.",
          DiagnosticTarget::Node(*target_type),
        ));
        continue;
      }
      match entry.late_type {
        // Late-bound members are already finished; decorate them in place.
        Some(ty) => {
          if let Some(application) = self.check_decorator_application(augment, None) {
            self.store.get_mut(ty).decorators.push(application.clone());
            self.apply_decorator(ty, &application);
          }
        }
        None => self.augments.entry(sym).or_default().push(augment),
      }
    }
  }

  /// Applications of `@@` decorators targeting `sym`.
  pub(crate) fn augment_applications(
    &mut self,
    sym: SymbolId,
  ) -> Vec<crate::decorators::DecoratorApplication> {
    let Some(nodes) = self.augments.get(&sym).cloned() else {
      return Vec::new();
    };
    nodes
      .into_iter()
      .filter_map(|node| self.check_decorator_application(node, None))
      .collect()
  }
}
