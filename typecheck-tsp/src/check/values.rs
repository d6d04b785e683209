use super::Checker;
use crate::codes;
use crate::codes::Code;
use crate::ids::MapperId;
use crate::ids::NodeId;
use crate::ids::TypeId;
use crate::ids::ValueId;
use crate::rekey::RekeyableMap;
use crate::types::Entity;
use crate::types::FunctionParameterType;
use crate::types::IntrinsicKind;
use crate::types::Model;
use crate::types::ModelProperty;
use crate::types::ObjectValueProperty;
use crate::types::ScalarValue;
use crate::types::Tuple;
use crate::types::TypeKind;
use crate::types::ValueData;
use crate::types::ValueKind;
use std::sync::Arc;
use syntax_tsp::NodeKind;

impl Checker {
  pub(crate) fn check_value(&mut self, node: NodeId, mapper: Option<MapperId>, expected: Option<TypeId>) -> ValueId {
    self.check_value_with(node, mapper, expected, codes::UNASSIGNABLE)
  }

  /// Checks `node` in a value position and coerces it to `expected`,
  /// reporting mismatches under `code`.
  pub(crate) fn check_value_with(
    &mut self,
    node: NodeId,
    mapper: Option<MapperId>,
    expected: Option<TypeId>,
    code: Code,
  ) -> ValueId {
    let entity = self.check_node(node, mapper);
    let Some(value) = self.value_of_entity(entity, node, mapper) else {
      return self.store.error_value();
    };
    match expected {
      Some(expected)
        if !self.store.is_error_value(value)
          && !self.is_template_dependent(Entity::Type(expected)) =>
      {
        self.coerce_value(value, expected, node, mapper, code)
      }
      _ => value,
    }
  }

  /// Value denoted by an entity in a value position, reporting when the
  /// entity can only be a type.
  pub(crate) fn value_of_entity(&mut self, entity: Entity, node: NodeId, mapper: Option<MapperId>) -> Option<ValueId> {
    match entity {
      Entity::Value(value) => Some(value),
      Entity::Indeterminate(ty) | Entity::Type(ty) => {
        if self.store.is_error_type(ty) {
          return Some(self.store.error_value());
        }
        if let Some(value) = self.force_value(ty, node) {
          return Some(value);
        }
        let message = format!(
          "{} refers to a type, but is being used as a value here.",
          self.display(ty)
        );
        self.report(codes::EXPECT_VALUE.error(message, self.target_at(node, mapper)));
        None
      }
      Entity::Constraint(_) => {
        self.report(codes::EXPECT_VALUE.error(
          "A constraint cannot be used as a value.",
          self.target_at(node, mapper),
        ));
        None
      }
    }
  }

  /// Value form of a literal, enum member or `null` type.
  pub(crate) fn force_value(&mut self, ty: TypeId, node: NodeId) -> Option<ValueId> {
    if let Some(&value) = self.forced_values.get(&ty) {
      return Some(value);
    }
    let (kind, value_type) = match self.store.kind(ty) {
      TypeKind::String(value) => (
        ValueKind::String {
          value: value.clone(),
          scalar: None,
        },
        ty,
      ),
      TypeKind::Number(value) => (
        ValueKind::Numeric {
          value: value.clone(),
          scalar: None,
        },
        ty,
      ),
      TypeKind::Boolean(value) => (
        ValueKind::Boolean {
          value: *value,
          scalar: None,
        },
        ty,
      ),
      TypeKind::Intrinsic(IntrinsicKind::Null) => (ValueKind::Null, ty),
      TypeKind::EnumMember(_) => (ValueKind::Enum(ty), ty),
      TypeKind::StringTemplate(template) => {
        let text = template.string_value.clone()?;
        let literal = self.store.string_literal(&text, Some(node));
        (
          ValueKind::String {
            value: text,
            scalar: None,
          },
          literal,
        )
      }
      _ => return None,
    };
    let value = self.store.alloc_value(ValueData {
      ty: value_type,
      node: Some(node),
      kind,
    });
    self.forced_values.insert(ty, value);
    Some(value)
  }

  fn coerce_value(
    &mut self,
    value: ValueId,
    expected: TypeId,
    node: NodeId,
    mapper: Option<MapperId>,
    code: Code,
  ) -> ValueId {
    if !self.is_value_assignable(value, expected) {
      let message = format!(
        "Type '{}' is not assignable to type '{}'",
        self.display_value_type(value),
        self.display(expected)
      );
      self.report(code.error(message, self.target_at(node, mapper)));
      return self.store.error_value();
    }
    let mut data = self.store.value(value).clone();
    let scalar = self.infer_scalar(value, expected);
    match &mut data.kind {
      ValueKind::String { scalar: s, .. }
      | ValueKind::Numeric { scalar: s, .. }
      | ValueKind::Boolean { scalar: s, .. } => {
        if s.is_none() {
          *s = scalar;
        }
      }
      _ => {}
    }
    if data.ty == expected {
      return value;
    }
    data.ty = expected;
    self.store.alloc_value(data)
  }

  fn display_value_type(&self, value: ValueId) -> String {
    let data = self.store.value(value);
    match &data.kind {
      ValueKind::String { .. } | ValueKind::Numeric { .. } | ValueKind::Boolean { .. } => {
        self.display_entity(Entity::Value(value))
      }
      _ => self.display(data.ty),
    }
  }

  /// Scalar a primitive value is typed as once assigned to `expected`.
  fn infer_scalar(&self, value: ValueId, expected: TypeId) -> Option<TypeId> {
    match self.store.kind(expected) {
      TypeKind::Scalar(_) => Some(expected),
      TypeKind::Union(union) => union.variants.values().find_map(|&variant| {
        let ty = self.store.get(variant).as_variant()?.ty;
        let is_scalar = self.store.get(ty).as_scalar().is_some();
        (is_scalar && self.is_value_assignable(value, ty)).then_some(ty)
      }),
      _ => None,
    }
  }

  pub(crate) fn check_object_literal(&mut self, node: NodeId, mapper: Option<MapperId>) -> ValueId {
    let tree = Arc::clone(&self.tree);
    let NodeKind::ObjectLiteral { properties } = tree.kind(node) else {
      return self.store.error_value();
    };
    let mut entries: RekeyableMap<String, ObjectValueProperty> = RekeyableMap::new();
    for &property in properties {
      match tree.kind(property) {
        NodeKind::ObjectLiteralProperty { id, value } => {
          let name = tree.identifier(*id).unwrap_or("").to_string();
          let value = self.check_value(*value, mapper, None);
          if entries.contains_key(&name) {
            self.report(codes::DUPLICATE_PROPERTY.error(
              format!("Object value may only specify known properties, and '{name}' was specified twice."),
              self.target_at(property, mapper),
            ));
            continue;
          }
          entries.insert(
            name.clone(),
            ObjectValueProperty {
              name,
              value,
              node: Some(property),
            },
          );
        }
        NodeKind::ObjectLiteralSpreadProperty { target } => {
          let value = self.check_value(*target, mapper, None);
          if self.store.is_error_value(value) {
            continue;
          }
          let ValueKind::Object(source) = &self.store.value(value).kind else {
            self.report(codes::SPREAD_MODEL.error(
              "Cannot spread a non-object value.",
              self.target_at(*target, mapper),
            ));
            continue;
          };
          for (name, entry) in source.iter() {
            entries.insert(name.clone(), entry.clone());
          }
        }
        _ => {}
      }
    }
    let model = self.store.alloc(TypeKind::Model(Model::default()), Some(node));
    for entry in entries.values() {
      let ty = self.store.value(entry.value).ty;
      let prop = self.store.alloc(
        TypeKind::ModelProperty(ModelProperty {
          name: entry.name.clone(),
          ty,
          source_property: None,
          optional: false,
          default_value: None,
          model: Some(model),
        }),
        entry.node,
      );
      self.store.get_mut(prop).is_finished = true;
      if let TypeKind::Model(m) = &mut self.store.get_mut(model).kind {
        m.properties.insert(entry.name.clone(), prop);
      }
    }
    self.store.get_mut(model).is_finished = true;
    self.store.alloc_value(ValueData {
      ty: model,
      node: Some(node),
      kind: ValueKind::Object(entries),
    })
  }

  pub(crate) fn check_array_literal(&mut self, node: NodeId, mapper: Option<MapperId>) -> ValueId {
    let tree = Arc::clone(&self.tree);
    let NodeKind::ArrayLiteral { values } = tree.kind(node) else {
      return self.store.error_value();
    };
    let items: Vec<ValueId> = values
      .iter()
      .map(|&value| self.check_value(value, mapper, None))
      .collect();
    let values = items.iter().map(|&item| self.store.value(item).ty).collect();
    let tuple = self.store.alloc(TypeKind::Tuple(Tuple { values }), Some(node));
    self.store.get_mut(tuple).is_finished = true;
    self.store.alloc_value(ValueData {
      ty: tuple,
      node: Some(node),
      kind: ValueKind::Array(items),
    })
  }

  /// `scalar.ctor(args)` and `scalar(arg)` calls.
  pub(crate) fn check_call(&mut self, node: NodeId, mapper: Option<MapperId>) -> ValueId {
    let tree = Arc::clone(&self.tree);
    let NodeKind::CallExpression { target, arguments } = tree.kind(node) else {
      return self.store.error_value();
    };
    let callee = self.check_node(*target, mapper).as_type();
    let error = self.store.error_value();
    let Some(callee) = callee.filter(|&ty| !self.store.is_error_type(ty)) else {
      return error;
    };
    match self.store.kind(callee) {
      TypeKind::ScalarConstructor(ctor) => {
        let (scalar, name, parameters) = (ctor.scalar, ctor.name.clone(), ctor.parameters.clone());
        let Some(args) = self.check_call_arguments(node, &parameters, arguments, mapper) else {
          return error;
        };
        self.store.alloc_value(ValueData {
          ty: scalar,
          node: Some(node),
          kind: ValueKind::Scalar(ScalarValue { scalar, name, args }),
        })
      }
      TypeKind::Scalar(_) => {
        let [argument] = arguments.as_slice() else {
          let message = format!("Expected 1 argument, but got {}.", arguments.len());
          self.report(codes::INVALID_ARGUMENT_COUNT.error(message, self.target_at(node, mapper)));
          return error;
        };
        self.check_value(*argument, mapper, Some(callee))
      }
      _ => {
        let message = format!("Type {} is not callable.", self.display(callee));
        self.report(codes::NON_CALLABLE.error(message, self.target_at(*target, mapper)));
        error
      }
    }
  }

  fn check_call_arguments(
    &mut self,
    node: NodeId,
    parameters: &[TypeId],
    arguments: &[NodeId],
    mapper: Option<MapperId>,
  ) -> Option<Vec<ValueId>> {
    let signature: Vec<(Option<TypeId>, bool, bool)> = parameters
      .iter()
      .filter_map(|&param| {
        let p = self.store.get(param).as_function_parameter()?;
        let value_type = match &p.ty {
          FunctionParameterType::Mixed(constraint) => constraint.value_type.or(constraint.ty),
          FunctionParameterType::Signature(ty) => Some(*ty),
        };
        Some((value_type, p.optional, p.rest))
      })
      .collect();
    let required = signature.iter().filter(|(_, optional, rest)| !optional && !rest).count();
    let has_rest = signature.iter().any(|(_, _, rest)| *rest);
    if arguments.len() < required || (!has_rest && arguments.len() > signature.len()) {
      let message = if has_rest || required != signature.len() {
        format!("Expected at least {required} arguments, but got {}.", arguments.len())
      } else {
        format!("Expected {required} arguments, but got {}.", arguments.len())
      };
      self.report(codes::INVALID_ARGUMENT_COUNT.error(message, self.target_at(node, mapper)));
      return None;
    }
    let mut values = Vec::with_capacity(arguments.len());
    for (index, &argument) in arguments.iter().enumerate() {
      let expected = match signature.get(index).or(signature.last()) {
        Some((ty, _, true)) => ty.map(|ty| self.rest_element_type(ty)),
        Some((ty, _, false)) => *ty,
        None => None,
      };
      let value = self.check_value_with(argument, mapper, expected, codes::INVALID_ARGUMENT);
      if self.store.is_error_value(value) {
        return None;
      }
      values.push(value);
    }
    Some(values)
  }

  /// Element type of a rest parameter declared as `T[]`.
  pub(crate) fn rest_element_type(&self, ty: TypeId) -> TypeId {
    match self.store.get(ty).as_model().and_then(|m| m.indexer) {
      Some(indexer) if self.is_integer_like(indexer.key) => indexer.value,
      _ => ty,
    }
  }

  /// Reports a value argument that a type parameter received, or the
  /// reverse.
  pub(crate) fn argument_kind_mismatch(&mut self, node: NodeId, mapper: Option<MapperId>, expected_value: bool) {
    let message = if expected_value {
      "Expected a value but got a type."
    } else {
      "Expected a type but got a value."
    };
    let code = if expected_value {
      codes::EXPECT_VALUE
    } else {
      codes::VALUE_IN_TYPE
    };
    self.report(code.error(message, self.target_at(node, mapper)));
  }
}
