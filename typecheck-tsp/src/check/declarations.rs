use super::Checker;
use crate::codes;
use crate::decorators::DecoratorApplication;
use crate::diagnostic::DiagnosticTarget;
use crate::ids::MapperId;
use crate::ids::NodeId;
use crate::ids::SymbolId;
use crate::ids::TypeId;
use crate::ids::ValueId;
use crate::types::Decorator;
use crate::types::Entity;
use crate::types::Enum;
use crate::types::EnumMember;
use crate::types::EnumMemberValue;
use crate::types::FunctionParameter;
use crate::types::FunctionParameterType;
use crate::types::Interface;
use crate::types::MixedParameterConstraint;
use crate::types::Model;
use crate::types::ModelProperty;
use crate::types::Numeric;
use crate::types::Operation;
use crate::types::Scalar;
use crate::types::ScalarConstructor;
use crate::types::SourceModel;
use crate::types::SourceModelUsage;
use crate::types::TemplateParameter;
use crate::types::TypeKind;
use crate::types::Union;
use crate::types::UnionVariant;
use crate::types::VariantKey;
use ahash::AHashSet;
use std::sync::Arc;
use syntax_tsp::ModifierFlags;
use syntax_tsp::NodeKind;

impl Checker {
  fn declared(&self, node: NodeId, mapper: Option<MapperId>) -> Option<TypeId> {
    if mapper.is_some() {
      return None;
    }
    let sym = self.symbol_of(node)?;
    self.symbol_entity_cached(sym).and_then(Entity::as_type)
  }

  /// Common bookkeeping for a freshly allocated declaration type.
  fn declare_type(&mut self, ty: TypeId, node: NodeId, mapper: Option<MapperId>, namespace: Option<TypeId>) {
    self.init_type(ty, node, mapper);
    self.cache_node(node, mapper, Entity::Type(ty));
    if mapper.is_some() {
      return;
    }
    if let Some(sym) = self.symbol_of(node) {
      self.register_symbol_entity(sym, Entity::Type(ty));
    }
    if let Some(namespace) = namespace {
      self.register_in_namespace(namespace, ty);
    }
    let tree = Arc::clone(&self.tree);
    for &param in tree.kind(node).template_parameters() {
      self.template_parameter_type(param);
    }
  }

  fn name_of(&self, node: NodeId) -> String {
    self.tree.declaration_name(node).unwrap_or("").to_string()
  }

  /// Inline decorators of `node` followed by `@@` augments of its symbol.
  pub(crate) fn check_decorators(
    &mut self,
    node: NodeId,
    mapper: Option<MapperId>,
  ) -> Vec<DecoratorApplication> {
    let tree = Arc::clone(&self.tree);
    let mut applications: Vec<DecoratorApplication> = tree
      .kind(node)
      .decorators()
      .iter()
      .filter_map(|&decorator| self.check_decorator_application(decorator, mapper))
      .collect();
    if let Some(sym) = self.symbol_of(node) {
      applications.extend(self.augment_applications(sym));
    }
    applications
  }

  pub(crate) fn check_model_statement(&mut self, node: NodeId, mapper: Option<MapperId>) -> TypeId {
    if let Some(ty) = self.declared(node, mapper) {
      return ty;
    }
    let tree = Arc::clone(&self.tree);
    let NodeKind::ModelStatement {
      extends,
      is,
      properties,
      ..
    } = tree.kind(node)
    else {
      return self.store.error_type();
    };
    let sym = self.symbol_of(node);
    let namespace = self.enclosing_namespace(node);
    let ty = self.store.alloc(
      TypeKind::Model(Model {
        name: self.name_of(node),
        namespace: Some(namespace),
        symbol: sym,
        ..Model::default()
      }),
      Some(node),
    );
    self.declare_type(ty, node, mapper, Some(namespace));

    let mut applications = Vec::new();
    if let Some(is) = *is {
      applications.extend(self.check_model_is(ty, sym, is, mapper));
    }
    if let Some(extends) = *extends {
      self.check_model_extends(ty, sym, extends, mapper);
    }
    applications.extend(self.check_decorators(node, mapper));
    self.store.get_mut(ty).decorators = applications;
    self.check_model_members(ty, properties, mapper);
    self.check_indexer_compatibility(ty);
    if mapper.is_none() {
      if let Some(sym) = sym {
        self.link_members(sym, ty);
      }
    }
    self.finish_type(ty);
    ty
  }

  pub(crate) fn check_model_expression(&mut self, node: NodeId, mapper: Option<MapperId>) -> TypeId {
    let tree = Arc::clone(&self.tree);
    let NodeKind::ModelExpression { properties } = tree.kind(node) else {
      return self.store.error_type();
    };
    let ty = self.store.alloc(TypeKind::Model(Model::default()), Some(node));
    self.init_type(ty, node, mapper);
    self.cache_node(node, mapper, Entity::Type(ty));
    self.check_model_members(ty, properties, mapper);
    self.check_indexer_compatibility(ty);
    self.finish_type(ty);
    ty
  }

  /// Resolves an `extends`/`is` target while watching for heritage cycles.
  /// Returns `None` when the clause has to be ignored.
  fn check_heritage(
    &mut self,
    sym: Option<SymbolId>,
    node: NodeId,
    mapper: Option<MapperId>,
  ) -> Option<TypeId> {
    let inserted = sym.is_some_and(|s| self.resolving_bases.insert(s));
    let target = self.check_type(node, mapper);
    if inserted {
      if let Some(s) = sym {
        self.resolving_bases.remove(&s);
      }
    }
    if self.store.is_error_type(target) || self.is_template_dependent(Entity::Type(target)) {
      return None;
    }
    let target_sym = self.store.get(target).symbol();
    if target_sym.is_some_and(|s| self.resolving_bases.contains(&s)) || target_sym == sym && sym.is_some() {
      let message = format!(
        "Type '{}' recursively references itself as a base type.",
        self.display(target)
      );
      let at = self.target_at(node, mapper);
      self.report(codes::CIRCULAR_BASE_TYPE.error(message, at));
      return None;
    }
    Some(target)
  }

  fn check_model_is(
    &mut self,
    ty: TypeId,
    sym: Option<SymbolId>,
    node: NodeId,
    mapper: Option<MapperId>,
  ) -> Vec<DecoratorApplication> {
    let Some(source) = self.check_heritage(sym, node, mapper) else {
      return Vec::new();
    };
    let Some(model) = self.store.get(source).as_model().cloned() else {
      let at = self.target_at(node, mapper);
      self.report(codes::EXTEND_MODEL.error("Model `is` must specify another model.", at));
      return Vec::new();
    };
    for &prop in model.properties.values() {
      let copy = self.clone_property(prop, ty);
      self.add_property(ty, copy, node, mapper);
    }
    if let Some(base) = model.base_model {
      self.store.set_base_model(ty, base);
      if mapper.is_none() {
        if let (Some(sym), Some(base_sym)) = (sym, self.store.get(base).symbol()) {
          self.resolver.symbols_mut().get_mut(sym).base = Some(base_sym);
        }
      }
    }
    if let TypeKind::Model(target) = &mut self.store.get_mut(ty).kind {
      target.indexer = model.indexer;
      target.source_model = Some(source);
      target.source_models.push(SourceModel {
        usage: SourceModelUsage::Is,
        model: source,
      });
    }
    self.store.get(source).decorators.clone()
  }

  fn check_model_extends(
    &mut self,
    ty: TypeId,
    sym: Option<SymbolId>,
    node: NodeId,
    mapper: Option<MapperId>,
  ) {
    let Some(base) = self.check_heritage(sym, node, mapper) else {
      return;
    };
    let named_model = self
      .store
      .get(base)
      .as_model()
      .is_some_and(|m| !m.name.is_empty());
    if !named_model {
      let at = self.target_at(node, mapper);
      self.report(codes::EXTEND_MODEL.error("Models cannot extend non-models or model expressions.", at));
      return;
    }
    if self.store.model_chain(base).any(|m| m == ty) {
      let message = format!(
        "Type '{}' recursively references itself as a base type.",
        self.display(ty)
      );
      let at = self.target_at(node, mapper);
      self.report(codes::CIRCULAR_BASE_TYPE.error(message, at));
      return;
    }
    self.store.set_base_model(ty, base);
    if mapper.is_none() {
      if let (Some(sym), Some(base_sym)) = (sym, self.store.get(base).symbol()) {
        self.resolver.symbols_mut().get_mut(sym).base = Some(base_sym);
      }
    }
  }

  fn check_model_members(&mut self, ty: TypeId, members: &[NodeId], mapper: Option<MapperId>) {
    let tree = Arc::clone(&self.tree);
    for &member in members {
      match tree.kind(member) {
        NodeKind::ModelProperty { .. } => {
          let prop = self.check_model_property(member, ty, mapper);
          self.add_property(ty, prop, member, mapper);
        }
        NodeKind::ModelSpreadProperty { target } => self.check_spread(ty, member, *target, mapper),
        _ => {}
      }
    }
  }

  fn check_model_property(&mut self, node: NodeId, model: TypeId, mapper: Option<MapperId>) -> TypeId {
    if let Some(Entity::Type(ty)) = self.cached_node(node, mapper) {
      return ty;
    }
    let tree = Arc::clone(&self.tree);
    let NodeKind::ModelProperty {
      value,
      optional,
      default,
      ..
    } = tree.kind(node)
    else {
      return self.store.error_type();
    };
    let value_type = self.check_type(*value, mapper);
    let ty = self.store.alloc(
      TypeKind::ModelProperty(ModelProperty {
        name: self.name_of(node),
        ty: value_type,
        source_property: None,
        optional: *optional,
        default_value: None,
        model: Some(model),
      }),
      Some(node),
    );
    self.init_type(ty, node, mapper);
    self.cache_node(node, mapper, Entity::Type(ty));
    if let Some(default) = *default {
      let value = self.check_value_with(default, mapper, Some(value_type), codes::INVALID_DEFAULT);
      if let TypeKind::ModelProperty(prop) = &mut self.store.get_mut(ty).kind {
        prop.default_value = Some(value);
      }
    }
    let applications = self.check_decorators(node, mapper);
    self.store.get_mut(ty).decorators = applications;
    self.finish_type(ty);
    ty
  }

  fn check_spread(&mut self, ty: TypeId, member: NodeId, target: NodeId, mapper: Option<MapperId>) {
    let source = self.check_type(target, mapper);
    if self.store.is_error_type(source) || self.is_template_dependent(Entity::Type(source)) {
      return;
    }
    let Some(indexer) = self.store.get(source).as_model().map(|m| m.indexer) else {
      let at = self.target_at(target, mapper);
      self.report(codes::SPREAD_MODEL.error("Cannot spread properties of non-model type.", at));
      return;
    };
    if source == ty {
      let at = self.target_at(target, mapper);
      self.report(codes::SPREAD_MODEL.error("Cannot spread type within its own declaration.", at));
      return;
    }
    for prop in self.walk_properties_inherited(source) {
      let copy = self.clone_property(prop, ty);
      self.add_property(ty, copy, member, mapper);
    }
    if let Some(indexer) = indexer {
      let at = self.target_at(target, mapper);
      let _ = self.merge_indexer(ty, indexer, at);
    }
    if let TypeKind::Model(model) = &mut self.store.get_mut(ty).kind {
      model.source_models.push(SourceModel {
        usage: SourceModelUsage::Spread,
        model: source,
      });
    }
  }

  /// Copy of `prop` owned by `model`, keeping provenance.
  pub(crate) fn clone_property(&mut self, prop: TypeId, model: TypeId) -> TypeId {
    let mut data = self.store.get(prop).clone();
    if let TypeKind::ModelProperty(p) = &mut data.kind {
      p.source_property = Some(prop);
      p.model = Some(model);
    }
    data.is_finished = false;
    data.in_template = self.store.get(model).in_template;
    let copy = self.store.alloc_data(data);
    self.finish_type(copy);
    copy
  }

  pub(crate) fn add_property(&mut self, model: TypeId, prop: TypeId, site: NodeId, mapper: Option<MapperId>) {
    let name = self.store.get(prop).name().unwrap_or("").to_string();
    let exists = self
      .store
      .get(model)
      .as_model()
      .is_some_and(|m| m.properties.contains_key(&name));
    if exists {
      let at = self.target_at(site, mapper);
      self.report(codes::DUPLICATE_PROPERTY.error(
        format!("Model already has a property named {name}"),
        at,
      ));
      return;
    }
    if let TypeKind::Model(m) = &mut self.store.get_mut(model).kind {
      m.properties.insert(name, prop);
    }
  }

  fn check_indexer_compatibility(&mut self, ty: TypeId) {
    let Some(model) = self.store.get(ty).as_model() else {
      return;
    };
    let Some(indexer) = model.indexer else {
      return;
    };
    if self.is_integer_like(indexer.key) {
      return;
    }
    let props: Vec<TypeId> = model.properties.values().copied().collect();
    for prop in props {
      let Some(p) = self.store.get(prop).as_property() else {
        continue;
      };
      let (prop_type, name) = (p.ty, p.name.clone());
      if self.is_type_assignable(prop_type, indexer.value) {
        continue;
      }
      let message = format!(
        "Property '{name}' is incompatible with indexer: type '{}' is not assignable to '{}'",
        self.display(prop_type),
        self.display(indexer.value)
      );
      self.report(codes::INCOMPATIBLE_INDEXER.error(message, DiagnosticTarget::Entity(Entity::Type(prop))));
    }
  }

  pub(crate) fn check_scalar(&mut self, node: NodeId, mapper: Option<MapperId>) -> TypeId {
    if let Some(ty) = self.declared(node, mapper) {
      return ty;
    }
    let tree = Arc::clone(&self.tree);
    let NodeKind::ScalarStatement {
      extends, members, ..
    } = tree.kind(node)
    else {
      return self.store.error_type();
    };
    let sym = self.symbol_of(node);
    let namespace = self.enclosing_namespace(node);
    let ty = self.store.alloc(
      TypeKind::Scalar(Scalar {
        name: self.name_of(node),
        namespace: Some(namespace),
        symbol: sym,
        ..Scalar::default()
      }),
      Some(node),
    );
    self.declare_type(ty, node, mapper, Some(namespace));
    if let Some(extends) = *extends {
      if let Some(base) = self.check_heritage(sym, extends, mapper) {
        if self.store.get(base).as_scalar().is_none() {
          let at = self.target_at(extends, mapper);
          self.report(codes::EXTEND_SCALAR.error("Scalar must extend other scalars.", at));
        } else if self.store.scalar_chain(base).any(|s| s == ty) {
          let message = format!(
            "Type '{}' recursively references itself as a base type.",
            self.display(ty)
          );
          let at = self.target_at(extends, mapper);
          self.report(codes::CIRCULAR_BASE_TYPE.error(message, at));
        } else {
          self.store.set_base_scalar(ty, base);
          if mapper.is_none() {
            if let (Some(sym), Some(base_sym)) = (sym, self.store.get(base).symbol()) {
              self.resolver.symbols_mut().get_mut(sym).base = Some(base_sym);
            }
          }
        }
      }
    }
    let applications = self.check_decorators(node, mapper);
    self.store.get_mut(ty).decorators = applications;
    for &member in members {
      let ctor = self.check_scalar_constructor(member, ty, mapper);
      let name = self.name_of(member);
      let TypeKind::Scalar(scalar) = &mut self.store.get_mut(ty).kind else {
        continue;
      };
      if scalar.constructors.contains_key(&name) {
        let at = self.target_at(member, mapper);
        self.report(codes::DUPLICATE_MEMBER.error(format!("Scalar already has a constructor named {name}"), at));
      } else {
        scalar.constructors.insert(name, ctor);
      }
    }
    self.finish_type(ty);
    ty
  }

  fn check_scalar_constructor(&mut self, node: NodeId, scalar: TypeId, mapper: Option<MapperId>) -> TypeId {
    if let Some(Entity::Type(ty)) = self.cached_node(node, mapper) {
      return ty;
    }
    let tree = Arc::clone(&self.tree);
    let NodeKind::ScalarConstructor { parameters, .. } = tree.kind(node) else {
      return self.store.error_type();
    };
    let parameters = parameters
      .iter()
      .map(|&param| self.check_function_parameter(param, mapper))
      .collect();
    let ty = self.store.alloc(
      TypeKind::ScalarConstructor(ScalarConstructor {
        name: self.name_of(node),
        scalar,
        parameters,
      }),
      Some(node),
    );
    self.init_type(ty, node, mapper);
    self.cache_node(node, mapper, Entity::Type(ty));
    self.finish_type(ty);
    ty
  }

  pub(crate) fn check_function_parameter(&mut self, node: NodeId, mapper: Option<MapperId>) -> TypeId {
    if let Some(Entity::Type(ty)) = self.cached_node(node, mapper) {
      return ty;
    }
    let tree = Arc::clone(&self.tree);
    let NodeKind::FunctionParameter {
      type_annotation,
      optional,
      rest,
      ..
    } = tree.kind(node)
    else {
      return self.store.error_type();
    };
    let constraint = match *type_annotation {
      Some(annotation) => self.check_constraint(annotation, mapper),
      None => MixedParameterConstraint {
        node: None,
        ty: Some(self.store.intrinsics().unknown),
        value_type: None,
      },
    };
    let ty = self.store.alloc(
      TypeKind::FunctionParameter(FunctionParameter {
        name: self.name_of(node),
        ty: FunctionParameterType::Mixed(constraint),
        optional: *optional,
        rest: *rest,
      }),
      Some(node),
    );
    self.init_type(ty, node, mapper);
    self.cache_node(node, mapper, Entity::Type(ty));
    self.finish_type(ty);
    ty
  }

  pub(crate) fn check_interface(&mut self, node: NodeId, mapper: Option<MapperId>) -> TypeId {
    if let Some(ty) = self.declared(node, mapper) {
      return ty;
    }
    let tree = Arc::clone(&self.tree);
    let NodeKind::InterfaceStatement {
      extends,
      operations,
      ..
    } = tree.kind(node)
    else {
      return self.store.error_type();
    };
    let sym = self.symbol_of(node);
    let namespace = self.enclosing_namespace(node);
    let ty = self.store.alloc(
      TypeKind::Interface(Interface {
        name: self.name_of(node),
        namespace: Some(namespace),
        symbol: sym,
        ..Interface::default()
      }),
      Some(node),
    );
    self.declare_type(ty, node, mapper, Some(namespace));
    for &base in extends {
      let Some(source) = self.check_heritage(sym, base, mapper) else {
        continue;
      };
      let Some(inherited) = self.store.get(source).as_interface().map(|i| i.operations.clone()) else {
        let at = self.target_at(base, mapper);
        self.report(codes::EXTENDS_INTERFACE.error("Interfaces can only extend other interfaces", at));
        continue;
      };
      for (name, &op) in inherited.iter() {
        let taken = self
          .store
          .get(ty)
          .as_interface()
          .is_some_and(|interface| interface.operations.contains_key(name));
        if taken {
          let at = self.target_at(base, mapper);
          self.report(codes::EXTENDS_INTERFACE_DUPLICATE.error(
            format!(
              "Interface extends cannot have multiple operations with the same name. Operation '{name}' is duplicated."
            ),
            at,
          ));
          continue;
        }
        let copy = self.clone_operation(op, ty);
        if let TypeKind::Interface(interface) = &mut self.store.get_mut(ty).kind {
          interface.operations.insert(name.clone(), copy);
        }
      }
      if let TypeKind::Interface(interface) = &mut self.store.get_mut(ty).kind {
        interface.source_interfaces.push(source);
      }
    }
    let applications = self.check_decorators(node, mapper);
    self.store.get_mut(ty).decorators = applications;
    let mut own = AHashSet::new();
    for &operation in operations {
      let op = self.check_operation(operation, Some(ty), mapper);
      let name = self.name_of(operation);
      if !own.insert(name.clone()) {
        let at = self.target_at(operation, mapper);
        self.report(codes::DUPLICATE_MEMBER.error(
          format!("Interface already has a member named {name}"),
          at,
        ));
        continue;
      }
      if let TypeKind::Interface(interface) = &mut self.store.get_mut(ty).kind {
        // Own operations override inherited ones in place.
        interface.operations.insert(name, op);
      }
    }
    if mapper.is_none() {
      if let Some(sym) = sym {
        self.link_members(sym, ty);
      }
    }
    self.finish_type(ty);
    ty
  }

  fn clone_operation(&mut self, op: TypeId, interface: TypeId) -> TypeId {
    let mut data = self.store.get(op).clone();
    if let TypeKind::Operation(o) = &mut data.kind {
      o.source_operation = Some(op);
      o.interface = Some(interface);
    }
    data.is_finished = false;
    data.in_template = self.store.get(interface).in_template || data.in_template;
    let copy = self.store.alloc_data(data);
    self.finish_type(copy);
    copy
  }

  pub(crate) fn check_operation(
    &mut self,
    node: NodeId,
    interface: Option<TypeId>,
    mapper: Option<MapperId>,
  ) -> TypeId {
    if interface.is_none() {
      if let Some(ty) = self.declared(node, mapper) {
        return ty;
      }
    }
    if let Some(Entity::Type(ty)) = self.cached_node(node, mapper) {
      return ty;
    }
    let tree = Arc::clone(&self.tree);
    let NodeKind::OperationStatement { signature, .. } = tree.kind(node) else {
      return self.store.error_type();
    };
    let sym = self.symbol_of(node);
    let namespace = match interface {
      Some(_) => None,
      None => Some(self.enclosing_namespace(node)),
    };
    let error = self.store.error_type();
    let ty = self.store.alloc(
      TypeKind::Operation(Operation {
        name: self.name_of(node),
        namespace,
        interface,
        parameters: error,
        return_type: error,
        source_operation: None,
      }),
      Some(node),
    );
    if interface.is_some() {
      self.init_type(ty, node, mapper);
      self.cache_node(node, mapper, Entity::Type(ty));
      if mapper.is_none() {
        for &param in tree.kind(node).template_parameters() {
          self.template_parameter_type(param);
        }
      }
    } else {
      self.declare_type(ty, node, mapper, namespace);
    }
    let mut applications = Vec::new();
    let (parameters, return_type, source) = match tree.kind(*signature) {
      NodeKind::OperationSignatureDeclaration {
        parameters,
        return_type,
      } => (
        self.check_type(*parameters, mapper),
        self.check_type(*return_type, mapper),
        None,
      ),
      NodeKind::OperationSignatureReference { base_operation } => {
        match self.check_heritage(sym, *base_operation, mapper) {
          Some(base) => match self.store.get(base).as_operation() {
            Some(base_op) => {
              let signature = (base_op.parameters, base_op.return_type, Some(base));
              applications.extend(self.store.get(base).decorators.iter().cloned());
              signature
            }
            None => {
              let at = self.target_at(*base_operation, mapper);
              self.report(codes::IS_OPERATION.error("Operation can only reuse the signature of another operation.", at));
              (error, error, None)
            }
          },
          None => (error, error, None),
        }
      }
      _ => (error, error, None),
    };
    if let TypeKind::Operation(op) = &mut self.store.get_mut(ty).kind {
      op.parameters = parameters;
      op.return_type = return_type;
      op.source_operation = source;
    }
    applications.extend(self.check_decorators(node, mapper));
    self.store.get_mut(ty).decorators = applications;
    self.finish_type(ty);
    ty
  }

  pub(crate) fn check_union_statement(&mut self, node: NodeId, mapper: Option<MapperId>) -> TypeId {
    if let Some(ty) = self.declared(node, mapper) {
      return ty;
    }
    let tree = Arc::clone(&self.tree);
    let NodeKind::UnionStatement { options, .. } = tree.kind(node) else {
      return self.store.error_type();
    };
    let namespace = self.enclosing_namespace(node);
    let ty = self.store.alloc(
      TypeKind::Union(Union {
        name: Some(self.name_of(node)),
        namespace: Some(namespace),
        symbol: self.symbol_of(node),
        ..Union::default()
      }),
      Some(node),
    );
    self.declare_type(ty, node, mapper, Some(namespace));
    let applications = self.check_decorators(node, mapper);
    self.store.get_mut(ty).decorators = applications;
    for (index, &option) in options.iter().enumerate() {
      let variant = self.check_union_variant(option, ty, index as u32, mapper);
      let key = match self.store.get(variant).as_variant() {
        Some(v) => v.name.clone(),
        None => continue,
      };
      let TypeKind::Union(union) = &mut self.store.get_mut(ty).kind else {
        continue;
      };
      if union.variants.contains_key(&key) {
        let name = key.name().unwrap_or("").to_string();
        let at = self.target_at(option, mapper);
        self.report(codes::DUPLICATE_MEMBER.error(format!("Union already has a variant named {name}"), at));
      } else {
        union.variants.insert(key, variant);
      }
    }
    self.finish_type(ty);
    ty
  }

  fn check_union_variant(
    &mut self,
    node: NodeId,
    union: TypeId,
    index: u32,
    mapper: Option<MapperId>,
  ) -> TypeId {
    if let Some(Entity::Type(ty)) = self.cached_node(node, mapper) {
      return ty;
    }
    let tree = Arc::clone(&self.tree);
    let NodeKind::UnionVariant { value, .. } = tree.kind(node) else {
      return self.store.error_type();
    };
    let name = match tree.declaration_name(node) {
      Some(name) => VariantKey::Named(name.to_string()),
      None => VariantKey::Anonymous(index),
    };
    let variant_type = self.check_type(*value, mapper);
    let ty = self.store.alloc(
      TypeKind::UnionVariant(UnionVariant {
        name,
        ty: variant_type,
        union_type: Some(union),
      }),
      Some(node),
    );
    self.init_type(ty, node, mapper);
    self.cache_node(node, mapper, Entity::Type(ty));
    let applications = self.check_decorators(node, mapper);
    self.store.get_mut(ty).decorators = applications;
    self.finish_type(ty);
    ty
  }

  pub(crate) fn check_enum(&mut self, node: NodeId) -> TypeId {
    if let Some(ty) = self.declared(node, None) {
      return ty;
    }
    let tree = Arc::clone(&self.tree);
    let NodeKind::EnumStatement { members, .. } = tree.kind(node) else {
      return self.store.error_type();
    };
    let sym = self.symbol_of(node);
    let namespace = self.enclosing_namespace(node);
    let ty = self.store.alloc(
      TypeKind::Enum(Enum {
        name: self.name_of(node),
        namespace: Some(namespace),
        symbol: sym,
        ..Enum::default()
      }),
      Some(node),
    );
    self.declare_type(ty, node, None, Some(namespace));
    let applications = self.check_decorators(node, None);
    self.store.get_mut(ty).decorators = applications;
    for &member in members {
      match tree.kind(member) {
        NodeKind::EnumMember { .. } => {
          let m = self.check_enum_member(member, ty);
          self.add_enum_member(ty, m, member);
        }
        NodeKind::EnumSpreadMember { target } => {
          let source = self.check_type(*target, None);
          if self.store.is_error_type(source) {
            continue;
          }
          let Some(source_members) = self.store.get(source).as_enum().map(|e| e.members.clone()) else {
            self.report(codes::SPREAD_ENUM.error(
              "Cannot spread members of non-enum type.",
              DiagnosticTarget::Node(*target),
            ));
            continue;
          };
          for &source_member in source_members.values() {
            let mut data = self.store.get(source_member).clone();
            if let TypeKind::EnumMember(m) = &mut data.kind {
              m.enum_type = ty;
              m.source_member = Some(source_member);
            }
            data.is_finished = false;
            let copy = self.store.alloc_data(data);
            self.finish_type(copy);
            self.add_enum_member(ty, copy, member);
          }
        }
        _ => {}
      }
    }
    if let Some(sym) = sym {
      self.link_members(sym, ty);
    }
    self.finish_type(ty);
    ty
  }

  fn add_enum_member(&mut self, ty: TypeId, member: TypeId, site: NodeId) {
    let name = self.store.get(member).name().unwrap_or("").to_string();
    let TypeKind::Enum(e) = &mut self.store.get_mut(ty).kind else {
      return;
    };
    if e.members.contains_key(&name) {
      self.report(codes::DUPLICATE_MEMBER.error(
        format!("Enum already has a member named {name}"),
        DiagnosticTarget::Node(site),
      ));
      return;
    }
    e.members.insert(name, member);
  }

  fn check_enum_member(&mut self, node: NodeId, enum_type: TypeId) -> TypeId {
    if let Some(Entity::Type(ty)) = self.cached_node(node, None) {
      return ty;
    }
    let tree = Arc::clone(&self.tree);
    let NodeKind::EnumMember { value, .. } = tree.kind(node) else {
      return self.store.error_type();
    };
    let value = match value.map(|v| (v, tree.kind(v))) {
      None => None,
      Some((_, NodeKind::StringLiteral { value })) => Some(EnumMemberValue::String(value.clone())),
      Some((
        _,
        NodeKind::NumericLiteral {
          value,
          value_as_string,
        },
      )) => Some(EnumMemberValue::Number(Numeric::new(value_as_string.clone(), *value))),
      Some((other, _)) => {
        self.report(codes::INVALID_ENUM_VALUE.error(
          "Enum member value must be a string or numeric literal.",
          DiagnosticTarget::Node(other),
        ));
        None
      }
    };
    let ty = self.store.alloc(
      TypeKind::EnumMember(EnumMember {
        name: self.name_of(node),
        enum_type,
        value,
        source_member: None,
      }),
      Some(node),
    );
    self.cache_node(node, None, Entity::Type(ty));
    let applications = self.check_decorators(node, None);
    self.store.get_mut(ty).decorators = applications;
    self.finish_type(ty);
    ty
  }

  pub(crate) fn check_alias(&mut self, node: NodeId, mapper: Option<MapperId>) -> Entity {
    let sym = self.symbol_of(node);
    if mapper.is_none() {
      if let Some(entity) = sym.and_then(|s| self.symbol_entity_cached(s)) {
        return entity;
      }
    }
    let tree = Arc::clone(&self.tree);
    let NodeKind::AliasStatement { value, .. } = tree.kind(node) else {
      return Entity::Type(self.store.error_type());
    };
    let guard = match (mapper, sym) {
      (None, Some(sym)) => {
        if !self.pending.insert(sym) {
          let message = format!("Alias type '{}' recursively references itself.", self.name_of(node));
          self.report(codes::CIRCULAR_ALIAS.error(message, DiagnosticTarget::Node(node)));
          return Entity::Type(self.store.error_type());
        }
        for &param in tree.kind(node).template_parameters() {
          self.template_parameter_type(param);
        }
        Some(sym)
      }
      _ => None,
    };
    let entity = self.check_node(*value, mapper);
    if let Some(sym) = guard {
      self.pending.remove(&sym);
      if let Some(existing) = self.symbol_entity_cached(sym) {
        // A cycle through this alias already settled it.
        return existing;
      }
      self.register_symbol_entity(sym, entity);
      if let Some(ty) = entity.as_type() {
        let data = self.store.get(ty);
        if data.template_mapper.is_none() {
          if let Some(target) = data.symbol() {
            self.resolver.symbols_mut().get_mut(sym).alias_target = Some(target);
          }
        }
      }
    }
    entity
  }

  pub(crate) fn check_const(&mut self, node: NodeId) -> ValueId {
    let Some(sym) = self.symbol_of(node) else {
      return self.store.error_value();
    };
    if let Some(Entity::Value(value)) = self.symbol_entity_cached(sym) {
      return value;
    }
    if !self.pending.insert(sym) {
      let message = format!("const '{}' recursively references itself.", self.name_of(node));
      self.report(codes::CIRCULAR_CONST.error(message, DiagnosticTarget::Node(node)));
      return self.store.error_value();
    }
    let tree = Arc::clone(&self.tree);
    let value = match tree.kind(node) {
      NodeKind::ConstStatement {
        type_annotation,
        value,
        ..
      } => {
        let expected = type_annotation.map(|annotation| self.check_type(annotation, None));
        self.check_value(*value, None, expected)
      }
      _ => self.store.error_value(),
    };
    self.pending.remove(&sym);
    if let Some(Entity::Value(existing)) = self.symbol_entity_cached(sym) {
      return existing;
    }
    self.register_symbol_entity(sym, Entity::Value(value));
    value
  }

  pub(crate) fn check_decorator_declaration(&mut self, node: NodeId) -> TypeId {
    if let Some(ty) = self.declared(node, None) {
      return ty;
    }
    let tree = Arc::clone(&self.tree);
    let NodeKind::DecoratorDeclarationStatement {
      modifiers,
      target,
      parameters,
      ..
    } = tree.kind(node)
    else {
      return self.store.error_type();
    };
    let sym = self.symbol_of(node);
    let name = format!("@{}", self.name_of(node));
    if !modifiers.contains(ModifierFlags::EXTERN) {
      self.report(codes::DECORATOR_EXTERN.error(
        "A decorator declaration must be prefixed with the 'extern' modifier.",
        DiagnosticTarget::Node(node),
      ));
    }
    let implementation = sym.and_then(|s| self.resolver.symbols().get(s).implementation);
    if implementation.is_none() {
      self.report(codes::MISSING_IMPLEMENTATION.error(
        format!("Extern declaration {name} has no implementation."),
        DiagnosticTarget::Node(node),
      ));
    }
    let target = self.check_function_parameter(*target, None);
    let parameters = parameters
      .iter()
      .map(|&param| self.check_function_parameter(param, None))
      .collect();
    let namespace = self.enclosing_namespace(node);
    let ty = self.store.alloc(
      TypeKind::Decorator(Decorator {
        name,
        namespace: Some(namespace),
        target,
        parameters,
        implementation,
      }),
      Some(node),
    );
    self.declare_type(ty, node, None, Some(namespace));
    self.finish_type(ty);
    ty
  }

  /// Declared type of a template parameter, shared by every instantiation.
  pub(crate) fn template_parameter_type(&mut self, node: NodeId) -> TypeId {
    if let Some(&ty) = self.template_params.get(&node) {
      return ty;
    }
    let tree = Arc::clone(&self.tree);
    let ty = self.store.alloc(
      TypeKind::TemplateParameter(TemplateParameter {
        name: self.name_of(node),
        constraint: None,
        default: None,
      }),
      Some(node),
    );
    self.store.get_mut(ty).in_template = true;
    self.template_params.insert(node, ty);
    if let NodeKind::TemplateParameterDeclaration {
      constraint,
      default,
      ..
    } = tree.kind(node)
    {
      if let Some(constraint) = *constraint {
        let constraint = self.check_constraint(constraint, None);
        if let TypeKind::TemplateParameter(param) = &mut self.store.get_mut(ty).kind {
          param.constraint = Some(constraint);
        }
      }
      if let Some(default) = *default {
        let entity = self.check_node(default, None);
        if let TypeKind::TemplateParameter(param) = &mut self.store.get_mut(ty).kind {
          param.default = Some(entity);
        }
      }
    }
    ty
  }

  /// Entity of a member declaration node, checked through its container.
  pub(crate) fn check_member_node(&mut self, node: NodeId, mapper: Option<MapperId>) -> Entity {
    if let Some(entity) = self.cached_node(node, mapper) {
      return entity;
    }
    let Some(parent) = self.tree.parent(node) else {
      return Entity::Type(self.store.error_type());
    };
    let container = self.check_node(parent, mapper);
    if let Some(entity) = self.cached_node(node, mapper) {
      return entity;
    }
    // The container is still being checked and has not reached this
    // property yet.
    let tree = Arc::clone(&self.tree);
    match (tree.kind(node), container.as_type()) {
      (NodeKind::ModelProperty { .. }, Some(model)) if self.store.get(model).as_model().is_some() => {
        Entity::Type(self.check_model_property(node, model, mapper))
      }
      (NodeKind::OperationStatement { .. }, Some(interface))
        if self.store.get(interface).as_interface().is_some() =>
      {
        Entity::Type(self.check_operation(node, Some(interface), mapper))
      }
      _ => Entity::Type(self.store.error_type()),
    }
  }
}
