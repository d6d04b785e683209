use super::Entity;
use super::StringTemplateSpan;
use super::TypeKind;
use super::TypeStore;
use super::ValueKind;
use crate::ids::TypeId;
use crate::ids::ValueId;
use std::fmt;

const MAX_DEPTH: usize = 6;

/// Human-readable rendering of a type for diagnostic messages.
///
/// Declarations are qualified by their namespace, except the global and
/// `TypeSpec` namespaces. Instances show their template arguments.
pub struct TypeDisplay<'a> {
  store: &'a TypeStore,
  ty: TypeId,
}

impl<'a> TypeDisplay<'a> {
  pub fn new(store: &'a TypeStore, ty: TypeId) -> Self {
    TypeDisplay { store, ty }
  }
}

impl fmt::Display for TypeDisplay<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write_type(self.store, self.ty, f, 0)
  }
}

pub struct EntityDisplay<'a> {
  store: &'a TypeStore,
  entity: Entity,
}

impl<'a> EntityDisplay<'a> {
  pub fn new(store: &'a TypeStore, entity: Entity) -> Self {
    EntityDisplay { store, entity }
  }
}

impl fmt::Display for EntityDisplay<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write_entity(self.store, self.entity, f, 0)
  }
}

fn write_entity(
  store: &TypeStore,
  entity: Entity,
  f: &mut fmt::Formatter<'_>,
  depth: usize,
) -> fmt::Result {
  match entity {
    Entity::Type(ty) | Entity::Indeterminate(ty) => write_type(store, ty, f, depth),
    Entity::Value(value) => write_value(store, value, f, depth),
    Entity::Constraint(constraint) => {
      let mut first = true;
      if let Some(ty) = constraint.ty {
        write_type(store, ty, f, depth)?;
        first = false;
      }
      if let Some(ty) = constraint.value_type {
        if !first {
          f.write_str(" | ")?;
        }
        f.write_str("valueof ")?;
        write_type(store, ty, f, depth)?;
      }
      Ok(())
    }
  }
}

fn write_namespace_prefix(
  store: &TypeStore,
  namespace: Option<TypeId>,
  f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
  let mut parts = Vec::new();
  let mut current = namespace;
  while let Some(ns) = current {
    let Some(data) = store.get(ns).as_namespace() else {
      break;
    };
    if data.name.is_empty() {
      break;
    }
    parts.push(data.name.as_str());
    current = data.namespace;
    if parts.len() > MAX_DEPTH * 4 {
      break;
    }
  }
  parts.reverse();
  if parts.is_empty() || parts == ["TypeSpec"] {
    return Ok(());
  }
  write!(f, "{}.", parts.join("."))
}

fn write_template_args(
  store: &TypeStore,
  ty: TypeId,
  f: &mut fmt::Formatter<'_>,
  depth: usize,
) -> fmt::Result {
  let Some(mapper) = store.get(ty).template_mapper else {
    return Ok(());
  };
  let args = &store.mapper(mapper).args;
  if args.is_empty() {
    return Ok(());
  }
  f.write_str("<")?;
  for (i, arg) in args.iter().enumerate() {
    if i > 0 {
      f.write_str(", ")?;
    }
    write_entity(store, *arg, f, depth + 1)?;
  }
  f.write_str(">")
}

fn write_type(
  store: &TypeStore,
  ty: TypeId,
  f: &mut fmt::Formatter<'_>,
  depth: usize,
) -> fmt::Result {
  if depth > MAX_DEPTH {
    return f.write_str("...");
  }
  let data = store.get(ty);
  match &data.kind {
    TypeKind::Intrinsic(kind) => f.write_str(kind.name()),
    TypeKind::String(value) => write!(f, "{value:?}"),
    TypeKind::Number(value) => write!(f, "{value}"),
    TypeKind::Boolean(value) => write!(f, "{value}"),
    TypeKind::Model(model) if model.name.is_empty() => {
      if let Some(indexer) = model.indexer.filter(|_| model.properties.is_empty()) {
        write_type(store, indexer.value, f, depth + 1)?;
        return f.write_str("[]");
      }
      f.write_str("{ ")?;
      for (i, prop) in model.properties.values().enumerate() {
        if i > 0 {
          f.write_str(", ")?;
        }
        write_type(store, *prop, f, depth + 1)?;
      }
      f.write_str(" }")
    }
    TypeKind::ModelProperty(prop) => {
      if depth == 0 {
        if let Some(model) = prop.model {
          write_type(store, model, f, depth + 1)?;
          f.write_str(".")?;
          return f.write_str(&prop.name);
        }
      }
      write!(f, "{}{}: ", prop.name, if prop.optional { "?" } else { "" })?;
      write_type(store, prop.ty, f, depth + 1)
    }
    TypeKind::Union(union) if union.name.is_none() => {
      for (i, variant) in union.variants.values().enumerate() {
        if i > 0 {
          f.write_str(" | ")?;
        }
        let inner = store.get(*variant).as_variant().map(|v| v.ty).unwrap_or(*variant);
        write_type(store, inner, f, depth + 1)?;
      }
      Ok(())
    }
    TypeKind::UnionVariant(variant) => {
      if let (Some(union), Some(name)) = (variant.union_type, variant.name.name()) {
        write_type(store, union, f, depth + 1)?;
        return write!(f, ".{name}");
      }
      write_type(store, variant.ty, f, depth + 1)
    }
    TypeKind::EnumMember(member) => {
      write_type(store, member.enum_type, f, depth + 1)?;
      write!(f, ".{}", member.name)
    }
    TypeKind::Tuple(tuple) => {
      f.write_str("[")?;
      for (i, value) in tuple.values.iter().enumerate() {
        if i > 0 {
          f.write_str(", ")?;
        }
        write_type(store, *value, f, depth + 1)?;
      }
      f.write_str("]")
    }
    TypeKind::StringTemplate(template) => {
      if let Some(value) = &template.string_value {
        return write!(f, "{value:?}");
      }
      f.write_str("string template")
    }
    TypeKind::StringTemplateSpan(StringTemplateSpan::Literal(text)) => write!(f, "{text:?}"),
    TypeKind::StringTemplateSpan(StringTemplateSpan::Interpolated(entity)) => {
      write_entity(store, *entity, f, depth + 1)
    }
    TypeKind::Operation(op) => {
      if let Some(interface) = op.interface {
        write_type(store, interface, f, depth + 1)?;
        f.write_str(".")?;
      } else {
        write_namespace_prefix(store, op.namespace, f)?;
      }
      f.write_str(&op.name)?;
      write_template_args(store, ty, f, depth)
    }
    TypeKind::Namespace(ns) => {
      write_namespace_prefix(store, ns.namespace, f)?;
      if ns.name.is_empty() {
        return f.write_str("global");
      }
      f.write_str(&ns.name)
    }
    TypeKind::Decorator(dec) => {
      write_namespace_prefix(store, dec.namespace, f)?;
      f.write_str(&dec.name)
    }
    TypeKind::ScalarConstructor(ctor) => {
      write_type(store, ctor.scalar, f, depth + 1)?;
      write!(f, ".{}", ctor.name)
    }
    TypeKind::TemplateParameter(param) => f.write_str(&param.name),
    TypeKind::FunctionParameter(param) => f.write_str(&param.name),
    kind => {
      write_namespace_prefix(store, data.namespace(), f)?;
      f.write_str(kind.name().unwrap_or(kind.kind_name()))?;
      write_template_args(store, ty, f, depth)
    }
  }
}

fn write_value(
  store: &TypeStore,
  value: ValueId,
  f: &mut fmt::Formatter<'_>,
  depth: usize,
) -> fmt::Result {
  if depth > MAX_DEPTH {
    return f.write_str("...");
  }
  match &store.value(value).kind {
    ValueKind::String { value, .. } => write!(f, "{value:?}"),
    ValueKind::Numeric { value, .. } => write!(f, "{value}"),
    ValueKind::Boolean { value, .. } => write!(f, "{value}"),
    ValueKind::Null => f.write_str("null"),
    ValueKind::Enum(member) => write_type(store, *member, f, depth + 1),
    ValueKind::Scalar(scalar) => {
      write_type(store, scalar.scalar, f, depth + 1)?;
      write!(f, ".{}(", scalar.name)?;
      for (i, arg) in scalar.args.iter().enumerate() {
        if i > 0 {
          f.write_str(", ")?;
        }
        write_value(store, *arg, f, depth + 1)?;
      }
      f.write_str(")")
    }
    ValueKind::Object(props) => {
      f.write_str("#{")?;
      for (i, prop) in props.values().enumerate() {
        if i > 0 {
          f.write_str(", ")?;
        }
        write!(f, "{}: ", prop.name)?;
        write_value(store, prop.value, f, depth + 1)?;
      }
      f.write_str("}")
    }
    ValueKind::Array(items) => {
      f.write_str("#[")?;
      for (i, item) in items.iter().enumerate() {
        if i > 0 {
          f.write_str(", ")?;
        }
        write_value(store, *item, f, depth + 1)?;
      }
      f.write_str("]")
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::Model;
  use crate::types::Namespace;
  use crate::types::Union;
  use crate::types::UnionVariant;
  use crate::types::VariantKey;

  #[test]
  fn qualifies_outside_the_std_namespace() {
    let mut store = TypeStore::new();
    let global = store.alloc(TypeKind::Namespace(Namespace::default()), None);
    let std = store.alloc(
      TypeKind::Namespace(Namespace {
        name: "TypeSpec".into(),
        namespace: Some(global),
        ..Namespace::default()
      }),
      None,
    );
    let lib = store.alloc(
      TypeKind::Namespace(Namespace {
        name: "Lib".into(),
        namespace: Some(global),
        ..Namespace::default()
      }),
      None,
    );
    let array = store.alloc(
      TypeKind::Model(Model {
        name: "Array".into(),
        namespace: Some(std),
        ..Model::default()
      }),
      None,
    );
    let pet = store.alloc(
      TypeKind::Model(Model {
        name: "Pet".into(),
        namespace: Some(lib),
        ..Model::default()
      }),
      None,
    );
    assert_eq!(TypeDisplay::new(&store, array).to_string(), "Array");
    assert_eq!(TypeDisplay::new(&store, pet).to_string(), "Lib.Pet");
  }

  #[test]
  fn union_expressions_join_variants() {
    let mut store = TypeStore::new();
    let a = store.string_literal("a", None);
    let union = store.alloc(
      TypeKind::Union(Union {
        expression: true,
        ..Union::default()
      }),
      None,
    );
    let va = store.alloc(
      TypeKind::UnionVariant(UnionVariant {
        name: VariantKey::Anonymous(0),
        ty: a,
        union_type: Some(union),
      }),
      None,
    );
    let null = store.intrinsics().null;
    let vn = store.alloc(
      TypeKind::UnionVariant(UnionVariant {
        name: VariantKey::Anonymous(1),
        ty: null,
        union_type: Some(union),
      }),
      None,
    );
    if let TypeKind::Union(u) = &mut store.get_mut(union).kind {
      u.variants.insert(VariantKey::Anonymous(0), va);
      u.variants.insert(VariantKey::Anonymous(1), vn);
    }
    assert_eq!(TypeDisplay::new(&store, union).to_string(), "\"a\" | null");
  }
}
