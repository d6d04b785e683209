//! The entity graph: types, values, mixed constraints and indeterminate
//! entities.
//!
//! All entities live in a [`TypeStore`] and reference each other by id.
//! Relations that have a reverse side (`base_model`/`derived_models`,
//! `base_scalar`/`derived_scalars`) are only written through the store so
//! both directions stay in sync.

mod display;
mod mapper;
mod numeric;
mod store;
mod value;

pub use display::EntityDisplay;
pub use display::TypeDisplay;
pub use mapper::TypeMapper;
pub use numeric::Numeric;
pub(crate) use numeric::integer_bounds;
pub use store::Intrinsics;
pub use store::TypeStore;
pub use value::ObjectValueProperty;
pub use value::ScalarValue;
pub use value::ValueData;
pub use value::ValueKind;

use crate::decorators::DecoratorApplication;
use crate::ids::ImplementationId;
use crate::ids::MapperId;
use crate::ids::NodeId;
use crate::ids::SymbolId;
use crate::ids::TypeId;
use crate::ids::ValueId;
use crate::rekey::RekeyableMap;

/// Anything the checker can produce from syntax.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Entity {
  Type(TypeId),
  Value(ValueId),
  Constraint(MixedParameterConstraint),
  /// A literal, enum member, union variant or `null` whose type-or-value
  /// role is decided by the consumer.
  Indeterminate(TypeId),
}

impl Entity {
  pub fn as_type(self) -> Option<TypeId> {
    match self {
      Entity::Type(t) | Entity::Indeterminate(t) => Some(t),
      _ => None,
    }
  }

  pub fn as_value(self) -> Option<ValueId> {
    match self {
      Entity::Value(v) => Some(v),
      _ => None,
    }
  }
}

/// A parameter that may accept a type, a value, or either.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MixedParameterConstraint {
  pub node: Option<NodeId>,
  /// Required type for type arguments.
  pub ty: Option<TypeId>,
  /// Required static type for value arguments (`valueof T`).
  pub value_type: Option<TypeId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntrinsicKind {
  Error,
  Void,
  Never,
  Unknown,
  Null,
}

impl IntrinsicKind {
  pub fn name(self) -> &'static str {
    match self {
      IntrinsicKind::Error => "ErrorType",
      IntrinsicKind::Void => "void",
      IntrinsicKind::Never => "never",
      IntrinsicKind::Unknown => "unknown",
      IntrinsicKind::Null => "null",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelIndexer {
  pub key: TypeId,
  pub value: TypeId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceModelUsage {
  Is,
  Spread,
  Intersection,
}

impl SourceModelUsage {
  pub fn as_str(self) -> &'static str {
    match self {
      SourceModelUsage::Is => "is",
      SourceModelUsage::Spread => "spread",
      SourceModelUsage::Intersection => "intersection",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceModel {
  pub usage: SourceModelUsage,
  pub model: TypeId,
}

#[derive(Clone, Debug, Default)]
pub struct Model {
  /// Empty for model expressions and intersections.
  pub name: String,
  pub namespace: Option<TypeId>,
  pub indexer: Option<ModelIndexer>,
  pub properties: RekeyableMap<String, TypeId>,
  pub base_model: Option<TypeId>,
  pub derived_models: Vec<TypeId>,
  /// Model this one was created from via `is`.
  pub source_model: Option<TypeId>,
  pub source_models: Vec<SourceModel>,
  pub symbol: Option<SymbolId>,
}

#[derive(Clone, Debug)]
pub struct ModelProperty {
  pub name: String,
  pub ty: TypeId,
  pub source_property: Option<TypeId>,
  pub optional: bool,
  pub default_value: Option<ValueId>,
  pub model: Option<TypeId>,
}

#[derive(Clone, Debug, Default)]
pub struct Scalar {
  pub name: String,
  pub namespace: Option<TypeId>,
  pub base_scalar: Option<TypeId>,
  pub derived_scalars: Vec<TypeId>,
  pub constructors: RekeyableMap<String, TypeId>,
  pub symbol: Option<SymbolId>,
}

#[derive(Clone, Debug)]
pub struct ScalarConstructor {
  pub name: String,
  pub scalar: TypeId,
  pub parameters: Vec<TypeId>,
}

#[derive(Clone, Debug, Default)]
pub struct Interface {
  pub name: String,
  pub namespace: Option<TypeId>,
  pub source_interfaces: Vec<TypeId>,
  pub operations: RekeyableMap<String, TypeId>,
  pub symbol: Option<SymbolId>,
}

#[derive(Clone, Debug, Default)]
pub struct Enum {
  pub name: String,
  pub namespace: Option<TypeId>,
  pub members: RekeyableMap<String, TypeId>,
  pub symbol: Option<SymbolId>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EnumMemberValue {
  String(String),
  Number(Numeric),
}

#[derive(Clone, Debug)]
pub struct EnumMember {
  pub name: String,
  pub enum_type: TypeId,
  pub value: Option<EnumMemberValue>,
  pub source_member: Option<TypeId>,
}

#[derive(Clone, Debug)]
pub struct Operation {
  pub name: String,
  pub namespace: Option<TypeId>,
  pub interface: Option<TypeId>,
  pub parameters: TypeId,
  pub return_type: TypeId,
  pub source_operation: Option<TypeId>,
}

#[derive(Clone, Debug, Default)]
pub struct Namespace {
  pub name: String,
  pub namespace: Option<TypeId>,
  pub models: RekeyableMap<String, TypeId>,
  pub scalars: RekeyableMap<String, TypeId>,
  pub operations: RekeyableMap<String, TypeId>,
  pub namespaces: RekeyableMap<String, TypeId>,
  pub interfaces: RekeyableMap<String, TypeId>,
  pub enums: RekeyableMap<String, TypeId>,
  pub unions: RekeyableMap<String, TypeId>,
  pub decorator_declarations: RekeyableMap<String, TypeId>,
  pub symbol: Option<SymbolId>,
}

#[derive(Clone, Debug)]
pub struct StringTemplate {
  /// Set when every span is a literal.
  pub string_value: Option<String>,
  pub spans: Vec<TypeId>,
}

#[derive(Clone, Debug)]
pub enum StringTemplateSpan {
  Literal(String),
  Interpolated(Entity),
}

#[derive(Clone, Debug)]
pub struct Tuple {
  pub values: Vec<TypeId>,
}

/// Key of a union variant; variants without a name get an anonymous key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum VariantKey {
  Named(String),
  Anonymous(u32),
}

impl VariantKey {
  pub fn name(&self) -> Option<&str> {
    match self {
      VariantKey::Named(name) => Some(name),
      VariantKey::Anonymous(_) => None,
    }
  }
}

#[derive(Clone, Debug, Default)]
pub struct Union {
  pub name: Option<String>,
  pub namespace: Option<TypeId>,
  pub variants: RekeyableMap<VariantKey, TypeId>,
  /// Created from `A | B` syntax rather than a `union` statement.
  pub expression: bool,
  pub symbol: Option<SymbolId>,
}

#[derive(Clone, Debug)]
pub struct UnionVariant {
  pub name: VariantKey,
  pub ty: TypeId,
  pub union_type: Option<TypeId>,
}

#[derive(Clone, Debug)]
pub struct TemplateParameter {
  pub name: String,
  pub constraint: Option<MixedParameterConstraint>,
  pub default: Option<Entity>,
}

#[derive(Clone, Debug)]
pub struct Decorator {
  /// Includes the leading `@`.
  pub name: String,
  pub namespace: Option<TypeId>,
  pub target: TypeId,
  pub parameters: Vec<TypeId>,
  pub implementation: Option<ImplementationId>,
}

#[derive(Clone, Debug)]
pub enum FunctionParameterType {
  Mixed(MixedParameterConstraint),
  Signature(TypeId),
}

#[derive(Clone, Debug)]
pub struct FunctionParameter {
  pub name: String,
  pub ty: FunctionParameterType,
  pub optional: bool,
  pub rest: bool,
}

#[derive(Clone, Debug)]
pub enum TypeKind {
  Intrinsic(IntrinsicKind),
  Model(Model),
  ModelProperty(ModelProperty),
  Scalar(Scalar),
  ScalarConstructor(ScalarConstructor),
  Interface(Interface),
  Enum(Enum),
  EnumMember(EnumMember),
  Operation(Operation),
  Namespace(Namespace),
  String(String),
  Number(Numeric),
  Boolean(bool),
  StringTemplate(StringTemplate),
  StringTemplateSpan(StringTemplateSpan),
  Tuple(Tuple),
  Union(Union),
  UnionVariant(UnionVariant),
  TemplateParameter(TemplateParameter),
  Decorator(Decorator),
  FunctionParameter(FunctionParameter),
}

impl TypeKind {
  pub fn kind_name(&self) -> &'static str {
    match self {
      TypeKind::Intrinsic(_) => "Intrinsic",
      TypeKind::Model(_) => "Model",
      TypeKind::ModelProperty(_) => "ModelProperty",
      TypeKind::Scalar(_) => "Scalar",
      TypeKind::ScalarConstructor(_) => "ScalarConstructor",
      TypeKind::Interface(_) => "Interface",
      TypeKind::Enum(_) => "Enum",
      TypeKind::EnumMember(_) => "EnumMember",
      TypeKind::Operation(_) => "Operation",
      TypeKind::Namespace(_) => "Namespace",
      TypeKind::String(_) => "String",
      TypeKind::Number(_) => "Number",
      TypeKind::Boolean(_) => "Boolean",
      TypeKind::StringTemplate(_) => "StringTemplate",
      TypeKind::StringTemplateSpan(_) => "StringTemplateSpan",
      TypeKind::Tuple(_) => "Tuple",
      TypeKind::Union(_) => "Union",
      TypeKind::UnionVariant(_) => "UnionVariant",
      TypeKind::TemplateParameter(_) => "TemplateParameter",
      TypeKind::Decorator(_) => "Decorator",
      TypeKind::FunctionParameter(_) => "FunctionParameter",
    }
  }

  /// Declared name, if this kind carries one.
  pub fn name(&self) -> Option<&str> {
    match self {
      TypeKind::Model(m) if !m.name.is_empty() => Some(&m.name),
      TypeKind::ModelProperty(p) => Some(&p.name),
      TypeKind::Scalar(s) => Some(&s.name),
      TypeKind::ScalarConstructor(c) => Some(&c.name),
      TypeKind::Interface(i) => Some(&i.name),
      TypeKind::Enum(e) => Some(&e.name),
      TypeKind::EnumMember(m) => Some(&m.name),
      TypeKind::Operation(o) => Some(&o.name),
      TypeKind::Namespace(n) => Some(&n.name),
      TypeKind::Union(u) => u.name.as_deref(),
      TypeKind::UnionVariant(v) => v.name.name(),
      TypeKind::TemplateParameter(p) => Some(&p.name),
      TypeKind::Decorator(d) => Some(&d.name),
      TypeKind::FunctionParameter(p) => Some(&p.name),
      _ => None,
    }
  }
}

#[derive(Clone, Debug)]
pub struct TypeData {
  pub kind: TypeKind,
  /// Absent for synthesized types.
  pub node: Option<NodeId>,
  pub is_finished: bool,
  /// Mapper this type was instantiated with.
  pub template_mapper: Option<MapperId>,
  /// Declaration this type was instantiated from.
  pub template_node: Option<NodeId>,
  pub decorators: Vec<DecoratorApplication>,
  /// Created while checking a template declaration or under a partial
  /// mapper; such types never finish.
  pub(crate) in_template: bool,
}

macro_rules! kind_accessors {
  ($($fn:ident => $variant:ident($ty:ty);)*) => {
    impl TypeData {
      $(
        pub fn $fn(&self) -> Option<&$ty> {
          match &self.kind {
            TypeKind::$variant(inner) => Some(inner),
            _ => None,
          }
        }
      )*
    }
  };
}

kind_accessors! {
  as_model => Model(Model);
  as_property => ModelProperty(ModelProperty);
  as_scalar => Scalar(Scalar);
  as_scalar_constructor => ScalarConstructor(ScalarConstructor);
  as_interface => Interface(Interface);
  as_enum => Enum(Enum);
  as_enum_member => EnumMember(EnumMember);
  as_operation => Operation(Operation);
  as_namespace => Namespace(Namespace);
  as_union => Union(Union);
  as_variant => UnionVariant(UnionVariant);
  as_template_parameter => TemplateParameter(TemplateParameter);
  as_decorator => Decorator(Decorator);
  as_function_parameter => FunctionParameter(FunctionParameter);
  as_tuple => Tuple(Tuple);
}

impl TypeData {
  pub fn new(kind: TypeKind, node: Option<NodeId>) -> Self {
    TypeData {
      kind,
      node,
      is_finished: false,
      template_mapper: None,
      template_node: None,
      decorators: Vec::new(),
      in_template: false,
    }
  }

  pub fn is_error(&self) -> bool {
    matches!(self.kind, TypeKind::Intrinsic(IntrinsicKind::Error))
  }

  pub fn name(&self) -> Option<&str> {
    self.kind.name()
  }

  /// Symbol holding this type's members, for member containers.
  pub fn symbol(&self) -> Option<SymbolId> {
    match &self.kind {
      TypeKind::Model(m) => m.symbol,
      TypeKind::Scalar(s) => s.symbol,
      TypeKind::Interface(i) => i.symbol,
      TypeKind::Enum(e) => e.symbol,
      TypeKind::Union(u) => u.symbol,
      TypeKind::Namespace(n) => n.symbol,
      _ => None,
    }
  }

  /// Namespace declaring this type.
  pub fn namespace(&self) -> Option<TypeId> {
    match &self.kind {
      TypeKind::Model(m) => m.namespace,
      TypeKind::Scalar(s) => s.namespace,
      TypeKind::Interface(i) => i.namespace,
      TypeKind::Enum(e) => e.namespace,
      TypeKind::Union(u) => u.namespace,
      TypeKind::Operation(o) => o.namespace,
      TypeKind::Namespace(n) => n.namespace,
      TypeKind::Decorator(d) => d.namespace,
      _ => None,
    }
  }
}
