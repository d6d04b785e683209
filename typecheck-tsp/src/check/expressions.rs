use super::Checker;
use crate::codes;
use crate::diagnostic::DiagnosticTarget;
use crate::ids::MapperId;
use crate::ids::NodeId;
use crate::ids::SymbolId;
use crate::ids::TypeId;
use crate::resolve::reference_text;
use crate::resolve::ResolutionKind;
use crate::resolve::ResolutionResult;
use crate::symbols::SymbolFlags;
use crate::types::Entity;
use crate::types::MixedParameterConstraint;
use crate::types::Model;
use crate::types::SourceModel;
use crate::types::SourceModelUsage;
use crate::types::StringTemplate;
use crate::types::StringTemplateSpan;
use crate::types::Tuple;
use crate::types::TypeKind;
use crate::types::Union;
use crate::types::UnionVariant;
use crate::types::VariantKey;
use smallvec::smallvec;
use std::sync::Arc;
use syntax_tsp::MemberSelector;
use syntax_tsp::NodeKind;

impl Checker {
  /// Resolves a reference, linking late-bound members of the container the
  /// resolver could not see into.
  pub(crate) fn resolve_with_late_binding(&mut self, node: NodeId) -> ResolutionResult {
    let result = self.resolver.resolve_reference(node);
    if result.kind != ResolutionKind::Unknown {
      return result;
    }
    let Some(container) = result.unknown_container else {
      return result;
    };
    self.late_bind_container(container);
    self.resolver.forget(node);
    self.resolver.resolve_reference(node)
  }

  /// Checks the declaration behind `container` so its members are linked.
  pub(crate) fn late_bind_container(&mut self, container: SymbolId) {
    let entry = self.resolver.symbols().get(container);
    if entry.members_bound {
      return;
    }
    if let Some(decl) = entry.first_declaration() {
      tracing::trace!(container = %entry.name, "late binding members");
      self.check_node(decl, None);
    }
  }

  pub(crate) fn report_resolution_failure(&mut self, node: NodeId, result: &ResolutionResult) {
    let tree = Arc::clone(&self.tree);
    match result.kind {
      ResolutionKind::Ambiguous => {
        let name = reference_text(&tree, node);
        let candidates: Vec<String> = result
          .ambiguous_symbols
          .iter()
          .map(|&sym| self.resolver.symbols().qualified_name(sym))
          .collect();
        let message = format!(
          "\"{name}\" is an ambiguous name between {}. Try using fully qualified name instead: {}",
          candidates.join(", "),
          candidates.join(", ")
        );
        self.report(codes::AMBIGUOUS_SYMBOL.error(message, DiagnosticTarget::Node(node)));
      }
      ResolutionKind::NotFound | ResolutionKind::Unknown => {
        let at = result.failed_at.unwrap_or(node);
        let text = match tree.parent(at).map(|p| (p, tree.kind(p))) {
          Some((parent, NodeKind::MemberExpression { .. })) => reference_text(&tree, parent),
          _ => reference_text(&tree, at),
        };
        self.report(codes::INVALID_REF.error(
          format!("Unknown identifier {text}"),
          DiagnosticTarget::Node(node),
        ));
      }
      ResolutionKind::Resolved => {}
    }
  }

  /// Wraps a referenced type the way consumers expect to see it.
  fn reference_entity(&self, ty: TypeId) -> Entity {
    match self.store.kind(ty) {
      TypeKind::EnumMember(_) | TypeKind::UnionVariant(_) => Entity::Indeterminate(ty),
      _ => Entity::Type(ty),
    }
  }

  pub(crate) fn check_reference(&mut self, node: NodeId, mapper: Option<MapperId>) -> Entity {
    let tree = Arc::clone(&self.tree);
    let (target, arguments) = match tree.kind(node) {
      NodeKind::TypeReference { target, arguments } => (*target, arguments.as_slice()),
      _ => (node, &[][..]),
    };
    let error = Entity::Type(self.store.error_type());
    if let NodeKind::MemberExpression {
      base,
      id,
      selector: MemberSelector::DoubleColon,
    } = tree.kind(target)
    {
      return self.check_meta_member(*base, *id, mapper);
    }

    let result = self.resolve_with_late_binding(target);
    let (resolved, sym) = match (result.kind, result.resolved_symbol, result.final_symbol) {
      (ResolutionKind::Resolved, Some(resolved), Some(sym)) => (resolved, sym),
      (ResolutionKind::Unknown, ..) => {
        if let Some(entity) = self.check_member_by_type(target, mapper) {
          return entity;
        }
        if result.unknown_container.is_none() {
          // Members of an unbound template parameter.
          return error;
        }
        self.report_resolution_failure(target, &result);
        return error;
      }
      _ => {
        self.report_resolution_failure(target, &result);
        return error;
      }
    };
    self.check_deprecated(resolved, target, mapper);
    if sym != resolved {
      self.check_deprecated(sym, target, mapper);
    }

    let entry = self.resolver.symbols().get(sym);
    let flags = entry.flags;
    let late_type = entry.late_type;
    let decl = entry.first_declaration();

    if flags.contains(SymbolFlags::TEMPLATE_PARAMETER) {
      if !arguments.is_empty() {
        self.report(codes::INVALID_TEMPLATE_ARGS.error(
          "Template parameter cannot have template arguments.",
          self.target_at(node, mapper),
        ));
      }
      let Some(decl) = decl else {
        return error;
      };
      let param = self.template_parameter_type(decl);
      return mapper
        .and_then(|m| self.store.mapper(m).get(param))
        .unwrap_or(Entity::Type(param));
    }
    if flags.contains(SymbolFlags::NAMESPACE) {
      return Entity::Type(self.namespace_type(sym));
    }
    if flags.contains(SymbolFlags::MEMBER) || flags.contains(SymbolFlags::LATE_BOUND) {
      if let Some(entity) = self.check_member_by_type(target, mapper) {
        return entity;
      }
      if let Some(ty) = late_type {
        return self.reference_entity(ty);
      }
    }
    let Some(decl) = decl else {
      return error;
    };
    if !tree.kind(decl).template_parameters().is_empty() {
      return self.instantiate(sym, decl, arguments, node, mapper);
    }
    if !arguments.is_empty() {
      let name = reference_text(&tree, target);
      self.report(codes::INVALID_TEMPLATE_ARGS.error(
        format!("Can't pass template arguments to non-templated type {name}"),
        self.target_at(node, mapper),
      ));
    }
    match self.check_node(decl, None) {
      Entity::Type(ty) => self.reference_entity(ty),
      entity => entity,
    }
  }

  /// `base.member` looked up on the base's checked type. Returns `None`
  /// when `target` is not a member expression or the member is missing.
  fn check_member_by_type(&mut self, target: NodeId, mapper: Option<MapperId>) -> Option<Entity> {
    let tree = Arc::clone(&self.tree);
    let NodeKind::MemberExpression {
      base,
      id,
      selector: MemberSelector::Dot,
    } = tree.kind(target)
    else {
      return None;
    };
    let name = tree.identifier(*id)?;
    let base_type = self.check_node(*base, mapper).as_type()?;
    let member = self.member_of_type(base_type, name)?;
    Some(self.reference_entity(member))
  }

  /// Named member of a container type.
  pub(crate) fn member_of_type(&self, ty: TypeId, name: &str) -> Option<TypeId> {
    match self.store.kind(ty) {
      TypeKind::Model(_) => self
        .walk_properties_inherited(ty)
        .into_iter()
        .find(|&prop| self.store.get(prop).name() == Some(name)),
      TypeKind::Scalar(_) => self.store.scalar_chain(ty).find_map(|scalar| {
        self
          .store
          .get(scalar)
          .as_scalar()
          .and_then(|s| s.constructors.get(name).copied())
      }),
      TypeKind::Interface(interface) => interface.operations.get(name).copied(),
      TypeKind::Enum(e) => e.members.get(name).copied(),
      TypeKind::Union(union) => union.variants.get(&VariantKey::Named(name.to_string())).copied(),
      TypeKind::Namespace(ns) => [
        &ns.models,
        &ns.scalars,
        &ns.operations,
        &ns.namespaces,
        &ns.interfaces,
        &ns.enums,
        &ns.unions,
      ]
      .into_iter()
      .find_map(|collection| collection.get(name).copied()),
      _ => None,
    }
  }

  fn check_meta_member(&mut self, base: NodeId, id: NodeId, mapper: Option<MapperId>) -> Entity {
    let base_type = self.check_type(base, mapper);
    if self.store.is_error_type(base_type) {
      return Entity::Type(base_type);
    }
    let name = self.tree.identifier(id).unwrap_or("").to_string();
    let found = match (self.store.kind(base_type), name.as_str()) {
      (TypeKind::Operation(op), "parameters") => Some(op.parameters),
      (TypeKind::Operation(op), "returnType") => Some(op.return_type),
      (TypeKind::ModelProperty(prop), "type") => Some(prop.ty),
      _ => None,
    };
    match found {
      Some(ty) => Entity::Type(ty),
      None => {
        let message = format!(
          "{} doesn't have meta property {name}",
          self.display(base_type)
        );
        self.report(codes::INVALID_REF.error(message, self.target_at(id, mapper)));
        Entity::Type(self.store.error_type())
      }
    }
  }

  pub(crate) fn check_string_template(&mut self, node: NodeId, mapper: Option<MapperId>) -> Entity {
    let tree = Arc::clone(&self.tree);
    let NodeKind::StringTemplateExpression { head, spans } = tree.kind(node) else {
      return Entity::Type(self.store.error_type());
    };
    let mut span_types = Vec::new();
    let mut text = Some(head.clone());
    if !head.is_empty() {
      span_types.push(self.store.alloc(
        TypeKind::StringTemplateSpan(StringTemplateSpan::Literal(head.clone())),
        Some(node),
      ));
    }
    for &span in spans {
      let NodeKind::StringTemplateSpan {
        expression,
        literal,
      } = tree.kind(span)
      else {
        continue;
      };
      let entity = self.check_node(*expression, mapper);
      let piece = match entity.as_type().map(|ty| self.store.kind(ty)) {
        Some(TypeKind::String(value)) => Some(value.clone()),
        Some(TypeKind::Number(value)) => Some(value.to_string()),
        Some(TypeKind::Boolean(value)) => Some(value.to_string()),
        Some(TypeKind::StringTemplate(inner)) => inner.string_value.clone(),
        _ => None,
      };
      text = match (text, piece) {
        (Some(mut acc), Some(piece)) => {
          acc.push_str(&piece);
          acc.push_str(literal);
          Some(acc)
        }
        _ => None,
      };
      span_types.push(self.store.alloc(
        TypeKind::StringTemplateSpan(StringTemplateSpan::Interpolated(entity)),
        Some(*expression),
      ));
      if !literal.is_empty() {
        span_types.push(self.store.alloc(
          TypeKind::StringTemplateSpan(StringTemplateSpan::Literal(literal.clone())),
          Some(span),
        ));
      }
    }
    let literal_only = text.is_some();
    let ty = self.store.alloc(
      TypeKind::StringTemplate(StringTemplate {
        string_value: text,
        spans: span_types,
      }),
      Some(node),
    );
    self.init_type(ty, node, mapper);
    self.finish_type(ty);
    if literal_only {
      Entity::Indeterminate(ty)
    } else {
      Entity::Type(ty)
    }
  }

  pub(crate) fn check_union_expression(&mut self, node: NodeId, mapper: Option<MapperId>) -> TypeId {
    let tree = Arc::clone(&self.tree);
    let NodeKind::UnionExpression { options } = tree.kind(node) else {
      return self.store.error_type();
    };
    let types: Vec<(TypeId, NodeId)> = options
      .iter()
      .map(|&option| (self.check_type(option, mapper), option))
      .collect();
    let ty = self.union_of(&types, node, mapper);
    self.cache_node(node, mapper, Entity::Type(ty));
    ty
  }

  /// Anonymous union over `options`, each tagged with its source node.
  pub(crate) fn union_of(
    &mut self,
    options: &[(TypeId, NodeId)],
    node: NodeId,
    mapper: Option<MapperId>,
  ) -> TypeId {
    let ty = self.store.alloc(
      TypeKind::Union(Union {
        expression: true,
        ..Union::default()
      }),
      Some(node),
    );
    self.init_type(ty, node, mapper);
    let in_template = self.store.get(ty).in_template;
    for (index, &(option, option_node)) in options.iter().enumerate() {
      let key = VariantKey::Anonymous(index as u32);
      let variant = self.store.alloc(
        TypeKind::UnionVariant(UnionVariant {
          name: key.clone(),
          ty: option,
          union_type: Some(ty),
        }),
        Some(option_node),
      );
      self.store.get_mut(variant).in_template = in_template;
      self.finish_type(variant);
      if let TypeKind::Union(union) = &mut self.store.get_mut(ty).kind {
        union.variants.insert(key, variant);
      }
    }
    self.finish_type(ty);
    ty
  }

  pub(crate) fn check_intersection(&mut self, node: NodeId, mapper: Option<MapperId>) -> TypeId {
    let tree = Arc::clone(&self.tree);
    let NodeKind::IntersectionExpression { options } = tree.kind(node) else {
      return self.store.error_type();
    };
    let ty = self.store.alloc(TypeKind::Model(Model::default()), Some(node));
    self.init_type(ty, node, mapper);
    self.cache_node(node, mapper, Entity::Type(ty));
    for &option in options {
      let source = self.check_type(option, mapper);
      if self.store.is_error_type(source) || self.is_template_dependent(Entity::Type(source)) {
        continue;
      }
      let Some(indexer) = self.store.get(source).as_model().map(|m| m.indexer) else {
        self.report(codes::INTERSECT_NON_MODEL.error(
          "Cannot intersect non-model types (including union types).",
          self.target_at(option, mapper),
        ));
        continue;
      };
      for prop in self.walk_properties_inherited(source) {
        let Some(p) = self.store.get(prop).as_property() else {
          continue;
        };
        let (name, prop_type) = (p.name.clone(), p.ty);
        let existing = self
          .store
          .get(ty)
          .as_model()
          .and_then(|m| m.properties.get(&name).copied());
        match existing.and_then(|e| self.store.get(e).as_property().map(|p| p.ty)) {
          Some(existing_type) if existing_type == prop_type => {}
          Some(_) => self.report(codes::INTERSECT_DUPLICATE_PROPERTY.error(
            format!("Intersection contains duplicate property definitions for {name}"),
            self.target_at(node, mapper),
          )),
          None => {
            let copy = self.clone_property(prop, ty);
            if let TypeKind::Model(model) = &mut self.store.get_mut(ty).kind {
              model.properties.insert(name, copy);
            }
          }
        }
      }
      if let Some(indexer) = indexer {
        let at = self.target_at(node, mapper);
        let _ = self.merge_indexer(ty, indexer, at);
      }
      if let TypeKind::Model(model) = &mut self.store.get_mut(ty).kind {
        model.source_models.push(SourceModel {
          usage: SourceModelUsage::Intersection,
          model: source,
        });
      }
    }
    self.finish_type(ty);
    ty
  }

  pub(crate) fn check_tuple(&mut self, node: NodeId, mapper: Option<MapperId>) -> TypeId {
    let tree = Arc::clone(&self.tree);
    let NodeKind::TupleExpression { values } = tree.kind(node) else {
      return self.store.error_type();
    };
    let values = values
      .iter()
      .map(|&value| self.check_type(value, mapper))
      .collect();
    let ty = self.store.alloc(TypeKind::Tuple(Tuple { values }), Some(node));
    self.init_type(ty, node, mapper);
    self.finish_type(ty);
    ty
  }

  /// `T[]` is sugar for `TypeSpec.Array<T>`.
  pub(crate) fn check_array_expression(
    &mut self,
    node: NodeId,
    element: NodeId,
    mapper: Option<MapperId>,
  ) -> TypeId {
    let element = self.check_type(element, mapper);
    let Some(array) = self.resolver.resolve_path("TypeSpec.Array") else {
      return self.store.error_type();
    };
    let Some(decl) = self.resolver.symbols().get(array).first_declaration() else {
      return self.store.error_type();
    };
    self
      .instantiate_entities(array, decl, smallvec![Entity::Type(element)], Some(node), mapper)
      .as_type()
      .unwrap_or(self.store.error_type())
  }

  /// Parameter constraint written as a type, `valueof T`, or a union mixing
  /// both.
  pub(crate) fn check_constraint(&mut self, node: NodeId, mapper: Option<MapperId>) -> MixedParameterConstraint {
    let tree = Arc::clone(&self.tree);
    match tree.kind(node) {
      NodeKind::ValueOfExpression { target } => MixedParameterConstraint {
        node: Some(node),
        ty: None,
        value_type: Some(self.check_type(*target, mapper)),
      },
      NodeKind::UnionExpression { options }
        if options
          .iter()
          .any(|&o| matches!(tree.kind(o), NodeKind::ValueOfExpression { .. })) =>
      {
        let mut types = Vec::new();
        let mut values = Vec::new();
        for &option in options {
          match tree.kind(option) {
            NodeKind::ValueOfExpression { target } => {
              values.push((self.check_type(*target, mapper), option))
            }
            _ => types.push((self.check_type(option, mapper), option)),
          }
        }
        MixedParameterConstraint {
          node: Some(node),
          ty: self.collapse_union(&types, node, mapper),
          value_type: self.collapse_union(&values, node, mapper),
        }
      }
      _ => MixedParameterConstraint {
        node: Some(node),
        ty: Some(self.check_type(node, mapper)),
        value_type: None,
      },
    }
  }

  fn collapse_union(
    &mut self,
    options: &[(TypeId, NodeId)],
    node: NodeId,
    mapper: Option<MapperId>,
  ) -> Option<TypeId> {
    match options {
      [] => None,
      [(single, _)] => Some(*single),
      _ => Some(self.union_of(options, node, mapper)),
    }
  }
}
