//! Template instantiation.
//!
//! An instantiation is keyed by the template's symbol, the enclosing
//! mapper (only for templates nested inside another template) and the
//! argument entities. Completed instantiations are memoized, so
//! `Foo<string>` written twice denotes the same type. Keys under
//! construction are tracked to stop a template from instantiating itself
//! with the same arguments.

use crate::check::Checker;
use crate::codes;
use crate::ids::MapperId;
use crate::ids::NodeId;
use crate::ids::SymbolId;
use crate::ids::TypeId;
use crate::types::Entity;
use crate::types::TypeMapper;
use ahash::AHashMap;
use ahash::AHashSet;
use serde::Serialize;
use smallvec::SmallVec;
use std::sync::Arc;
use syntax_tsp::NodeKind;

pub(crate) type Arguments = SmallVec<[Entity; 4]>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct InstantiationKey {
  declaration: SymbolId,
  scope: Option<MapperId>,
  args: Arguments,
}

/// Memoization counters of the instantiation cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InstantiationStats {
  pub hits: u64,
  pub misses: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Instantiations {
  cache: AHashMap<InstantiationKey, Entity>,
  in_progress: AHashSet<InstantiationKey>,
  depth: usize,
  pub(crate) stats: InstantiationStats,
}

impl Instantiations {
  pub(crate) fn len(&self) -> usize {
    self.cache.len()
  }
}

struct BoundArgument {
  entity: Entity,
  node: NodeId,
}

impl Checker {
  /// Instantiates the template `sym` declared at `decl` with the template
  /// argument nodes of `source`.
  pub(crate) fn instantiate(
    &mut self,
    sym: SymbolId,
    decl: NodeId,
    arguments: &[NodeId],
    source: NodeId,
    mapper: Option<MapperId>,
  ) -> Entity {
    let tree = Arc::clone(&self.tree);
    let params = tree.kind(decl).template_parameters().to_vec();
    let param_types: Vec<TypeId> = params
      .iter()
      .map(|&param| self.template_parameter_type(param))
      .collect();
    let mut bound: Vec<Option<BoundArgument>> = params.iter().map(|_| None).collect();
    let mut seen_named = false;
    let mut position = 0;

    for &argument in arguments {
      let (name, value) = match tree.kind(argument) {
        NodeKind::TemplateArgument { name, argument } => (*name, *argument),
        _ => (None, argument),
      };
      let index = match name {
        Some(name) => {
          seen_named = true;
          let text = tree.identifier(name).unwrap_or("");
          let found = params
            .iter()
            .position(|&param| tree.declaration_name(param) == Some(text));
          match found {
            Some(index) if bound[index].is_some() => {
              self.report(codes::INVALID_TEMPLATE_ARGS.error(
                format!("Cannot specify template argument '{text}' again."),
                self.target_at(argument, mapper),
              ));
              continue;
            }
            Some(index) => index,
            None => {
              self.report(codes::INVALID_TEMPLATE_ARGS.error(
                format!("No parameter named '{text}' exists in the target template."),
                self.target_at(argument, mapper),
              ));
              continue;
            }
          }
        }
        None => {
          if seen_named {
            self.report(codes::INVALID_TEMPLATE_ARGS.error(
              "Positional template arguments cannot follow named arguments in the same argument list.",
              self.target_at(argument, mapper),
            ));
            continue;
          }
          if position >= params.len() {
            self.report(codes::INVALID_TEMPLATE_ARGS.error(
              "Too many template arguments.",
              self.target_at(argument, mapper),
            ));
            continue;
          }
          position += 1;
          position - 1
        }
      };
      let entity = self.check_node(value, mapper);
      bound[index] = Some(BoundArgument {
        entity,
        node: value,
      });
    }

    let scope = self.instantiation_scope(decl, mapper);
    let mut map: AHashMap<TypeId, Entity> = scope
      .map(|m| self.store.mapper(m).map.clone())
      .unwrap_or_default();
    let mut args = Arguments::new();
    for (index, &param) in param_types.iter().enumerate() {
      let entity = match bound[index].take() {
        Some(argument) => self.check_argument_constraint(param, argument, mapper),
        None => match self.default_argument(sym, params[index], param, &map, scope) {
          Some(entity) => entity,
          None => {
            let name = self.store.get(param).name().unwrap_or("").to_string();
            self.report(codes::INVALID_TEMPLATE_ARGS.error(
              format!("Template argument '{name}' is required and not specified."),
              self.target_at(source, mapper),
            ));
            Entity::Type(self.store.error_type())
          }
        },
      };
      map.insert(param, entity);
      args.push(entity);
    }
    self.instantiate_entities(sym, decl, args, Some(source), mapper)
  }

  /// Mapper whose bindings an instantiation of `decl` inherits: the context
  /// mapper when `decl` is nested inside another template.
  fn instantiation_scope(&self, decl: NodeId, mapper: Option<MapperId>) -> Option<MapperId> {
    let nested = self
      .tree
      .ancestors(decl)
      .skip(1)
      .any(|ancestor| !self.tree.kind(ancestor).template_parameters().is_empty());
    mapper.filter(|_| nested)
  }

  fn default_argument(
    &mut self,
    sym: SymbolId,
    param_node: NodeId,
    param: TypeId,
    map: &AHashMap<TypeId, Entity>,
    scope: Option<MapperId>,
  ) -> Option<Entity> {
    let default = self.store.get(param).as_template_parameter()?.default?;
    if !self.is_template_dependent(default) {
      return Some(default);
    }
    // Defaults may refer to earlier parameters; evaluate them under the
    // bindings collected so far.
    let NodeKind::TemplateParameterDeclaration {
      default: Some(default_node),
      ..
    } = self.tree.kind(param_node)
    else {
      return Some(default);
    };
    let default_node = *default_node;
    let partial = map.values().any(|&e| self.is_template_dependent(e));
    let temporary = self.store.alloc_mapper(TypeMapper {
      partial,
      args: map.values().copied().collect(),
      map: map.clone(),
      declaration: sym,
      source: None,
      parent: scope,
    });
    Some(self.check_node(default_node, Some(temporary)))
  }

  /// Validates an argument against its parameter's constraint. A mismatch
  /// is reported and replaced by the error type.
  fn check_argument_constraint(
    &mut self,
    param: TypeId,
    argument: BoundArgument,
    mapper: Option<MapperId>,
  ) -> Entity {
    let error = Entity::Type(self.store.error_type());
    let constraint = self
      .store
      .get(param)
      .as_template_parameter()
      .and_then(|p| p.constraint);
    let BoundArgument { entity, node } = argument;
    if self.is_template_dependent(entity) {
      return entity;
    }
    let Some(constraint) = constraint else {
      return match entity {
        Entity::Value(_) | Entity::Constraint(_) => {
          self.argument_kind_mismatch(node, mapper, false);
          error
        }
        Entity::Indeterminate(ty) => Entity::Type(ty),
        entity => entity,
      };
    };
    let accepts_type = constraint.ty.is_some();
    if let Some(value_type) = constraint.value_type {
      let as_value = match entity {
        Entity::Value(_) => true,
        Entity::Indeterminate(_) => true,
        _ => !accepts_type,
      };
      if as_value {
        return match self.value_of_entity(entity, node, mapper) {
          Some(value) if self.store.is_error_value(value) => error,
          Some(value) => {
            if self.is_template_dependent(Entity::Type(value_type)) || self.is_value_assignable(value, value_type) {
              Entity::Value(value)
            } else {
              self.report_unassignable(self.store.value(value).ty, value_type, node, mapper);
              error
            }
          }
          None => error,
        };
      }
    }
    let Some(ty) = entity.as_type() else {
      self.argument_kind_mismatch(node, mapper, false);
      return error;
    };
    match constraint.ty {
      Some(expected) if !self.is_type_assignable(ty, expected) => {
        self.report_unassignable(ty, expected, node, mapper);
        error
      }
      _ => Entity::Type(ty),
    }
  }

  fn report_unassignable(&mut self, source: TypeId, target: TypeId, node: NodeId, mapper: Option<MapperId>) {
    let message = format!(
      "Type '{}' is not assignable to type '{}'",
      self.display(source),
      self.display(target)
    );
    self.report(codes::INVALID_TEMPLATE_ARGS.error(message, self.target_at(node, mapper)));
  }

  /// Instantiates with already matched argument entities.
  pub(crate) fn instantiate_entities(
    &mut self,
    sym: SymbolId,
    decl: NodeId,
    args: Arguments,
    source: Option<NodeId>,
    mapper: Option<MapperId>,
  ) -> Entity {
    let tree = Arc::clone(&self.tree);
    let params = tree.kind(decl).template_parameters().to_vec();
    let param_types: Vec<TypeId> = params
      .iter()
      .map(|&param| self.template_parameter_type(param))
      .collect();
    // `Foo<T>` inside `Foo` itself denotes the declaration.
    let declared_params = args.len() == param_types.len()
      && args
        .iter()
        .zip(&param_types)
        .all(|(&arg, &param)| arg == Entity::Type(param));
    if declared_params {
      return self.check_node(decl, None);
    }

    let scope = self.instantiation_scope(decl, mapper);
    let key = InstantiationKey {
      declaration: sym,
      scope,
      args: args.clone(),
    };
    let name = self.resolver.symbols().get(sym).name.clone();
    if let Some(&cached) = self.instantiations.cache.get(&key) {
      self.instantiations.stats.hits += 1;
      tracing::trace!(template = %name, cache = "hit", "instantiate");
      return cached;
    }
    let error = Entity::Type(self.store.error_type());
    if self.instantiations.in_progress.contains(&key) {
      let message = format!("Template '{name}' recursively instantiates itself with the same arguments.");
      if let Some(source) = source {
        self.report(codes::RECURSIVE_TEMPLATE.error(message, self.target_at(source, mapper)));
      }
      return error;
    }
    if self.instantiations.depth >= self.options.max_instantiation_depth {
      let message = format!(
        "Instantiating '{name}' exceeded the maximum depth of {}.",
        self.options.max_instantiation_depth
      );
      if let Some(source) = source {
        self.report(codes::INSTANTIATION_DEPTH.error(message, self.target_at(source, mapper)));
      }
      return error;
    }
    self.instantiations.stats.misses += 1;
    tracing::trace!(template = %name, cache = "miss", "instantiate");

    let mut map: AHashMap<TypeId, Entity> = scope
      .map(|m| self.store.mapper(m).map.clone())
      .unwrap_or_default();
    for (&param, &arg) in param_types.iter().zip(&args) {
      map.insert(param, arg);
    }
    let partial = args.iter().any(|&arg| self.is_template_dependent(arg))
      || scope.is_some_and(|m| self.store.mapper(m).partial);
    let instance_mapper = self.store.alloc_mapper(TypeMapper {
      partial,
      args,
      map,
      declaration: sym,
      source,
      parent: scope,
    });

    self.instantiations.in_progress.insert(key.clone());
    self.instantiations.depth += 1;
    let entity = self.check_node(decl, Some(instance_mapper));
    self.instantiations.depth -= 1;
    self.instantiations.in_progress.remove(&key);
    if !partial {
      self.instantiations.cache.insert(key, entity);
    }
    entity
  }
}
