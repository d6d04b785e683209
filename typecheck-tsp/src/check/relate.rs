//! Assignability between types, and of values to types.

use super::Checker;
use crate::ids::TypeId;
use crate::ids::ValueId;
use crate::types::integer_bounds;
use crate::types::Entity;
use crate::types::IntrinsicKind;
use crate::types::Numeric;
use crate::types::TypeKind;
use crate::types::ValueKind;

const MAX_RELATION_DEPTH: usize = 32;

impl Checker {
  pub(crate) fn is_type_assignable(&self, source: TypeId, target: TypeId) -> bool {
    self.type_assignable(source, target, 0)
  }

  pub(crate) fn is_value_assignable(&self, value: ValueId, target: TypeId) -> bool {
    self.value_assignable(value, target, 0)
  }

  /// Name of the first standard-library scalar in `ty`'s base chain.
  pub(crate) fn std_scalar_name(&self, ty: TypeId) -> Option<&str> {
    self
      .store
      .scalar_chain(ty)
      .find(|&scalar| self.is_std_declaration(scalar))
      .and_then(|scalar| self.store.get(scalar).name())
  }

  /// Whether `ty` is or extends the standard scalar `name`.
  fn extends_std_scalar(&self, ty: TypeId, name: &str) -> bool {
    self
      .store
      .scalar_chain(ty)
      .any(|scalar| self.store.get(scalar).name() == Some(name) && self.is_std_declaration(scalar))
  }

  fn is_std_declaration(&self, ty: TypeId) -> bool {
    let Some(ns) = self.store.get(ty).namespace() else {
      return false;
    };
    let Some(namespace) = self.store.get(ns).as_namespace() else {
      return false;
    };
    namespace.name == "TypeSpec"
      && namespace
        .namespace
        .and_then(|parent| self.store.get(parent).as_namespace())
        .is_some_and(|parent| parent.name.is_empty())
  }

  /// Whether an indexer key denotes array positions rather than names.
  pub(crate) fn is_integer_like(&self, key: TypeId) -> bool {
    matches!(self.std_scalar_name(key), Some("integer"))
      || self
        .std_scalar_name(key)
        .is_some_and(|name| integer_bounds(name).is_some())
  }

  fn scalar_extends(&self, source: TypeId, target: TypeId) -> bool {
    self.store.scalar_chain(source).any(|s| s == target)
  }

  /// `TypeSpec.Reflection.<Kind>` accepts any type of that kind.
  fn reflection_kind(&self, target: TypeId) -> Option<&str> {
    let data = self.store.get(target);
    let model = data.as_model()?;
    let ns = self.store.get(model.namespace?).as_namespace()?;
    if ns.name != "Reflection" {
      return None;
    }
    let parent = self.store.get(ns.namespace?).as_namespace()?;
    (parent.name == "TypeSpec").then_some(model.name.as_str())
  }

  fn numeric_fits(&self, value: &Numeric, target: TypeId) -> bool {
    let Some(name) = self.std_scalar_name(target) else {
      return false;
    };
    match name {
      "numeric" | "float" | "float32" | "float64" | "decimal" | "decimal128" => true,
      "integer" => value.is_integer(),
      name => match (integer_bounds(name), value.as_bigint()) {
        (Some((min, max)), Some(n)) => value.is_integer() && min <= n && n <= max,
        _ => false,
      },
    }
  }

  fn type_assignable(&self, source: TypeId, target: TypeId, depth: usize) -> bool {
    if source == target || depth > MAX_RELATION_DEPTH {
      return true;
    }
    if self.store.is_error_type(source) || self.store.is_error_type(target) {
      return true;
    }
    if self.is_template_dependent(Entity::Type(source)) || self.is_template_dependent(Entity::Type(target)) {
      return true;
    }
    let depth = depth + 1;
    match (self.store.kind(source), self.store.kind(target)) {
      (_, TypeKind::Intrinsic(IntrinsicKind::Unknown)) => true,
      (TypeKind::Intrinsic(IntrinsicKind::Never), _) => true,
      (TypeKind::UnionVariant(variant), _) => self.type_assignable(variant.ty, target, depth),
      (_, TypeKind::UnionVariant(variant)) => self.type_assignable(source, variant.ty, depth),
      (TypeKind::Union(source_union), _) => source_union.variants.values().all(|&variant| {
        self.type_assignable(variant, target, depth)
      }),
      (_, TypeKind::Union(target_union)) => target_union.variants.values().any(|&variant| {
        self.type_assignable(source, variant, depth)
      }),
      (_, TypeKind::Model(_)) if self.reflection_kind(target).is_some() => {
        self.reflection_kind(target) == Some(self.store.kind(source).kind_name())
      }
      (TypeKind::Scalar(_), TypeKind::Scalar(_)) => self.scalar_extends(source, target),
      (TypeKind::String(_), TypeKind::Scalar(_)) | (TypeKind::StringTemplate(_), TypeKind::Scalar(_)) => {
        self.extends_std_scalar(target, "string")
      }
      (TypeKind::Boolean(_), TypeKind::Scalar(_)) => self.extends_std_scalar(target, "boolean"),
      (TypeKind::Number(value), TypeKind::Scalar(_)) => self.numeric_fits(value, target),
      (TypeKind::Enum(_), TypeKind::Enum(_)) => false,
      (TypeKind::EnumMember(member), TypeKind::Enum(_)) => member.enum_type == target,
      (TypeKind::Tuple(source_tuple), TypeKind::Tuple(target_tuple)) => {
        source_tuple.values.len() == target_tuple.values.len()
          && source_tuple
            .values
            .iter()
            .zip(&target_tuple.values)
            .all(|(&s, &t)| self.type_assignable(s, t, depth))
      }
      (TypeKind::Tuple(tuple), TypeKind::Model(model)) => match model.indexer {
        Some(indexer) if self.is_integer_like(indexer.key) => tuple
          .values
          .iter()
          .all(|&value| self.type_assignable(value, indexer.value, depth)),
        _ => false,
      },
      (TypeKind::Model(_), TypeKind::Model(_)) => self.model_assignable(source, target, depth),
      _ => false,
    }
  }

  fn model_assignable(&self, source: TypeId, target: TypeId, depth: usize) -> bool {
    if self.store.model_chain(source).any(|m| m == target) {
      return true;
    }
    let (Some(source_model), Some(target_model)) =
      (self.store.get(source).as_model(), self.store.get(target).as_model())
    else {
      return false;
    };
    if let Some(indexer) = target_model.indexer {
      if self.is_integer_like(indexer.key) {
        return source_model
          .indexer
          .is_some_and(|s| self.is_integer_like(s.key) && self.type_assignable(s.value, indexer.value, depth));
      }
      let properties_fit = self
        .walk_properties_inherited(source)
        .into_iter()
        .all(|prop| {
          self
            .store
            .get(prop)
            .as_property()
            .is_some_and(|p| self.type_assignable(p.ty, indexer.value, depth))
        });
      let indexer_fits = source_model
        .indexer
        .map_or(true, |s| self.type_assignable(s.value, indexer.value, depth));
      return properties_fit && indexer_fits;
    }
    if !target_model.name.is_empty() {
      return false;
    }
    // Anonymous targets are matched structurally.
    let source_props = self.walk_properties_inherited(source);
    self.walk_properties_inherited(target).into_iter().all(|target_prop| {
      let Some(t) = self.store.get(target_prop).as_property() else {
        return false;
      };
      let found = source_props
        .iter()
        .filter_map(|&prop| self.store.get(prop).as_property())
        .find(|p| p.name == t.name);
      match found {
        Some(s) => (!s.optional || t.optional) && self.type_assignable(s.ty, t.ty, depth),
        None => t.optional,
      }
    })
  }

  fn value_assignable(&self, value: ValueId, target: TypeId, depth: usize) -> bool {
    if depth > MAX_RELATION_DEPTH || self.store.is_error_value(value) || self.store.is_error_type(target) {
      return true;
    }
    let depth = depth + 1;
    let data = self.store.value(value);
    match (&data.kind, self.store.kind(target)) {
      (_, TypeKind::Intrinsic(IntrinsicKind::Unknown)) => true,
      (_, TypeKind::UnionVariant(variant)) => self.value_assignable(value, variant.ty, depth),
      (_, TypeKind::Union(union)) => union
        .variants
        .values()
        .any(|&variant| self.value_assignable(value, variant, depth)),
      (ValueKind::Null, TypeKind::Intrinsic(IntrinsicKind::Null)) => true,
      (ValueKind::Null, _) => false,
      (ValueKind::String { value: text, .. }, _) => match self.store.kind(target) {
        TypeKind::String(expected) => expected == text,
        TypeKind::Scalar(_) => self.extends_std_scalar(target, "string"),
        _ => false,
      },
      (ValueKind::Numeric { value: number, .. }, _) => match self.store.kind(target) {
        TypeKind::Number(expected) => expected.as_f64() == number.as_f64(),
        TypeKind::Scalar(_) => self.numeric_fits(number, target),
        _ => false,
      },
      (ValueKind::Boolean { value: flag, .. }, _) => match self.store.kind(target) {
        TypeKind::Boolean(expected) => expected == flag,
        TypeKind::Scalar(_) => self.extends_std_scalar(target, "boolean"),
        _ => false,
      },
      (ValueKind::Enum(member), _) => self.type_assignable(*member, target, depth),
      (ValueKind::Scalar(scalar), TypeKind::Scalar(_)) => self.scalar_extends(scalar.scalar, target),
      (ValueKind::Scalar(_), _) => false,
      (ValueKind::Array(items), TypeKind::Tuple(tuple)) => {
        items.len() == tuple.values.len()
          && items
            .iter()
            .zip(&tuple.values)
            .all(|(&item, &ty)| self.value_assignable(item, ty, depth))
      }
      (ValueKind::Array(items), TypeKind::Model(model)) => match model.indexer {
        Some(indexer) if self.is_integer_like(indexer.key) => items
          .iter()
          .all(|&item| self.value_assignable(item, indexer.value, depth)),
        _ => false,
      },
      (ValueKind::Object(entries), TypeKind::Model(model)) => {
        if let Some(indexer) = model.indexer.filter(|i| !self.is_integer_like(i.key)) {
          return entries
            .values()
            .all(|entry| self.value_assignable(entry.value, indexer.value, depth));
        }
        let props = self.walk_properties_inherited(target);
        let known = entries.keys().all(|name| {
          props
            .iter()
            .any(|&prop| self.store.get(prop).name() == Some(name.as_str()))
        });
        known
          && props.into_iter().all(|prop| {
            let Some(p) = self.store.get(prop).as_property() else {
              return false;
            };
            match entries.get(&p.name) {
              Some(entry) => self.value_assignable(entry.value, p.ty, depth),
              None => p.optional || p.default_value.is_some(),
            }
          })
      }
      _ => false,
    }
  }
}
