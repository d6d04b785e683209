use crate::ids::TypeId;
use crate::ids::ValueId;
use crate::types::Entity;
use crate::types::MixedParameterConstraint;
use crate::types::Numeric;
use crate::types::TypeStore;
use crate::types::ValueKind;

/// Host-side projection of a decorator argument.
///
/// Primitive values unwrap to Rust values and object/array values to
/// ordered containers. Types, scalar values and enum values are handed over
/// as ids.
#[derive(Clone, Debug, PartialEq)]
pub enum MarshalledValue {
  Type(TypeId),
  Value(ValueId),
  Constraint(MixedParameterConstraint),
  Number(Numeric),
  String(String),
  Boolean(bool),
  /// Properties in declaration order.
  Object(Vec<(String, MarshalledValue)>),
  Array(Vec<MarshalledValue>),
  Null,
}

impl MarshalledValue {
  pub fn from_entity(store: &TypeStore, entity: Entity) -> Self {
    match entity {
      Entity::Type(ty) | Entity::Indeterminate(ty) => MarshalledValue::Type(ty),
      Entity::Constraint(constraint) => MarshalledValue::Constraint(constraint),
      Entity::Value(value) => Self::from_value(store, value),
    }
  }

  pub fn from_value(store: &TypeStore, value: ValueId) -> Self {
    match &store.value(value).kind {
      ValueKind::Numeric { value, .. } => MarshalledValue::Number(value.clone()),
      ValueKind::String { value, .. } => MarshalledValue::String(value.clone()),
      ValueKind::Boolean { value, .. } => MarshalledValue::Boolean(*value),
      ValueKind::Null => MarshalledValue::Null,
      ValueKind::Object(entries) => MarshalledValue::Object(
        entries
          .iter()
          .map(|(name, entry)| (name.clone(), Self::from_value(store, entry.value)))
          .collect(),
      ),
      ValueKind::Array(items) => {
        MarshalledValue::Array(items.iter().map(|&item| Self::from_value(store, item)).collect())
      }
      ValueKind::Scalar(_) | ValueKind::Enum(_) => MarshalledValue::Value(value),
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      MarshalledValue::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      MarshalledValue::Number(n) => Some(n.as_f64()),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      MarshalledValue::Boolean(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_type(&self) -> Option<TypeId> {
    match self {
      MarshalledValue::Type(ty) => Some(*ty),
      _ => None,
    }
  }

  pub fn as_array(&self) -> Option<&[MarshalledValue]> {
    match self {
      MarshalledValue::Array(items) => Some(items),
      _ => None,
    }
  }

  /// Property of an object value.
  pub fn get(&self, key: &str) -> Option<&MarshalledValue> {
    match self {
      MarshalledValue::Object(entries) => entries.iter().find(|(name, _)| name == key).map(|(_, v)| v),
      _ => None,
    }
  }
}
