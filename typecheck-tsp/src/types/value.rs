use super::Numeric;
use crate::ids::NodeId;
use crate::ids::TypeId;
use crate::ids::ValueId;
use crate::rekey::RekeyableMap;

#[derive(Clone, Debug)]
pub struct ObjectValueProperty {
  pub name: String,
  pub value: ValueId,
  pub node: Option<NodeId>,
}

#[derive(Clone, Debug)]
pub struct ScalarValue {
  pub scalar: TypeId,
  /// Constructor name used to build the value.
  pub name: String,
  pub args: Vec<ValueId>,
}

#[derive(Clone, Debug)]
pub enum ValueKind {
  Object(RekeyableMap<String, ObjectValueProperty>),
  Array(Vec<ValueId>),
  Scalar(ScalarValue),
  Numeric {
    value: Numeric,
    scalar: Option<TypeId>,
  },
  String {
    value: String,
    scalar: Option<TypeId>,
  },
  Boolean {
    value: bool,
    scalar: Option<TypeId>,
  },
  /// Refers to the enum member type.
  Enum(TypeId),
  Null,
}

impl ValueKind {
  pub fn kind_name(&self) -> &'static str {
    match self {
      ValueKind::Object(_) => "ObjectValue",
      ValueKind::Array(_) => "ArrayValue",
      ValueKind::Scalar(_) => "ScalarValue",
      ValueKind::Numeric { .. } => "NumericValue",
      ValueKind::String { .. } => "StringValue",
      ValueKind::Boolean { .. } => "BooleanValue",
      ValueKind::Enum(_) => "EnumValue",
      ValueKind::Null => "NullValue",
    }
  }
}

/// A fully evaluated constant.
///
/// `ty` is the static type the value was declared or coerced to, which may
/// be wider than the value's own literal type.
#[derive(Clone, Debug)]
pub struct ValueData {
  pub ty: TypeId,
  pub node: Option<NodeId>,
  pub kind: ValueKind,
}
