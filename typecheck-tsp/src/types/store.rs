use super::IntrinsicKind;
use super::Numeric;
use super::TypeData;
use super::TypeKind;
use super::TypeMapper;
use super::ValueData;
use crate::ids::MapperId;
use crate::ids::NodeId;
use crate::ids::TypeId;
use crate::ids::ValueId;
use ahash::AHashMap;
use ordered_float::OrderedFloat;

#[derive(Clone, Copy, Debug)]
pub struct Intrinsics {
  pub error: TypeId,
  pub void: TypeId,
  pub never: TypeId,
  pub unknown: TypeId,
  pub null: TypeId,
}

/// Arena owning every type, value and mapper of one compilation.
#[derive(Clone, Debug)]
pub struct TypeStore {
  types: Vec<TypeData>,
  values: Vec<ValueData>,
  mappers: Vec<TypeMapper>,
  strings: AHashMap<String, TypeId>,
  numbers: AHashMap<OrderedFloat<f64>, TypeId>,
  booleans: [TypeId; 2],
  intrinsics: Intrinsics,
  error_value: ValueId,
}

impl Default for TypeStore {
  fn default() -> Self {
    Self::new()
  }
}

impl TypeStore {
  pub fn new() -> Self {
    let mut store = TypeStore {
      types: Vec::new(),
      values: Vec::new(),
      mappers: Vec::new(),
      strings: AHashMap::default(),
      numbers: AHashMap::default(),
      booleans: [TypeId(0), TypeId(0)],
      intrinsics: Intrinsics {
        error: TypeId(0),
        void: TypeId(0),
        never: TypeId(0),
        unknown: TypeId(0),
        null: TypeId(0),
      },
      error_value: ValueId(0),
    };
    let error = store.finished_literal(TypeKind::Intrinsic(IntrinsicKind::Error));
    let void = store.finished_literal(TypeKind::Intrinsic(IntrinsicKind::Void));
    let never = store.finished_literal(TypeKind::Intrinsic(IntrinsicKind::Never));
    let unknown = store.finished_literal(TypeKind::Intrinsic(IntrinsicKind::Unknown));
    let null = store.finished_literal(TypeKind::Intrinsic(IntrinsicKind::Null));
    store.intrinsics = Intrinsics {
      error,
      void,
      never,
      unknown,
      null,
    };
    let no = store.finished_literal(TypeKind::Boolean(false));
    let yes = store.finished_literal(TypeKind::Boolean(true));
    store.booleans = [no, yes];
    store.error_value = store.alloc_value(ValueData {
      ty: error,
      node: None,
      kind: super::ValueKind::Null,
    });
    store
  }

  pub fn intrinsics(&self) -> Intrinsics {
    self.intrinsics
  }

  pub fn error_type(&self) -> TypeId {
    self.intrinsics.error
  }

  /// The error placeholder among values; its static type is the error type.
  pub fn error_value(&self) -> ValueId {
    self.error_value
  }

  pub fn is_error_type(&self, id: TypeId) -> bool {
    id == self.intrinsics.error
  }

  pub fn is_error_value(&self, id: ValueId) -> bool {
    self.values[id.index()].ty == self.intrinsics.error
  }

  pub fn get(&self, id: TypeId) -> &TypeData {
    &self.types[id.index()]
  }

  pub(crate) fn get_mut(&mut self, id: TypeId) -> &mut TypeData {
    &mut self.types[id.index()]
  }

  pub fn kind(&self, id: TypeId) -> &TypeKind {
    &self.types[id.index()].kind
  }

  pub fn len(&self) -> usize {
    self.types.len()
  }

  pub fn is_empty(&self) -> bool {
    self.types.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeData)> + '_ {
    self
      .types
      .iter()
      .enumerate()
      .map(|(i, t)| (TypeId(i as u32), t))
  }

  pub(crate) fn alloc(&mut self, kind: TypeKind, node: Option<NodeId>) -> TypeId {
    self.alloc_data(TypeData::new(kind, node))
  }

  pub(crate) fn alloc_data(&mut self, data: TypeData) -> TypeId {
    let id = TypeId(self.types.len() as u32);
    self.types.push(data);
    id
  }

  fn finished_literal(&mut self, kind: TypeKind) -> TypeId {
    let id = self.alloc(kind, None);
    self.types[id.index()].is_finished = true;
    id
  }

  /// Interned string literal type.
  pub(crate) fn string_literal(&mut self, value: &str, node: Option<NodeId>) -> TypeId {
    if let Some(&id) = self.strings.get(value) {
      return id;
    }
    let id = self.alloc(TypeKind::String(value.to_string()), node);
    self.types[id.index()].is_finished = true;
    self.strings.insert(value.to_string(), id);
    id
  }

  /// Interned numeric literal type, keyed by numeric value.
  pub(crate) fn number_literal(&mut self, value: Numeric, node: Option<NodeId>) -> TypeId {
    if let Some(&id) = self.numbers.get(&value.key()) {
      return id;
    }
    let key = value.key();
    let id = self.alloc(TypeKind::Number(value), node);
    self.types[id.index()].is_finished = true;
    self.numbers.insert(key, id);
    id
  }

  pub(crate) fn boolean_literal(&self, value: bool) -> TypeId {
    self.booleans[value as usize]
  }

  pub fn value(&self, id: ValueId) -> &ValueData {
    &self.values[id.index()]
  }

  pub(crate) fn alloc_value(&mut self, value: ValueData) -> ValueId {
    let id = ValueId(self.values.len() as u32);
    self.values.push(value);
    id
  }

  pub fn mapper(&self, id: MapperId) -> &TypeMapper {
    &self.mappers[id.index()]
  }

  pub(crate) fn alloc_mapper(&mut self, mapper: TypeMapper) -> MapperId {
    let id = MapperId(self.mappers.len() as u32);
    self.mappers.push(mapper);
    id
  }

  /// Sets `derived.base_model` and registers the reverse link.
  pub(crate) fn set_base_model(&mut self, derived: TypeId, base: TypeId) {
    let previous = match &mut self.types[derived.index()].kind {
      TypeKind::Model(m) => m.base_model.replace(base),
      _ => return,
    };
    if let Some(previous) = previous {
      if let TypeKind::Model(m) = &mut self.types[previous.index()].kind {
        m.derived_models.retain(|&d| d != derived);
      }
    }
    if let TypeKind::Model(m) = &mut self.types[base.index()].kind {
      if !m.derived_models.contains(&derived) {
        m.derived_models.push(derived);
      }
    }
  }

  /// Sets `derived.base_scalar` and registers the reverse link.
  pub(crate) fn set_base_scalar(&mut self, derived: TypeId, base: TypeId) {
    let previous = match &mut self.types[derived.index()].kind {
      TypeKind::Scalar(s) => s.base_scalar.replace(base),
      _ => return,
    };
    if let Some(previous) = previous {
      if let TypeKind::Scalar(s) = &mut self.types[previous.index()].kind {
        s.derived_scalars.retain(|&d| d != derived);
      }
    }
    if let TypeKind::Scalar(s) = &mut self.types[base.index()].kind {
      if !s.derived_scalars.contains(&derived) {
        s.derived_scalars.push(derived);
      }
    }
  }

  /// Walks `base_model` links starting at `model` itself.
  pub fn model_chain(&self, model: TypeId) -> impl Iterator<Item = TypeId> + '_ {
    let mut next = Some(model);
    let mut steps = 0usize;
    std::iter::from_fn(move || {
      let current = next?;
      steps += 1;
      // Cycles are rejected while checking; the bound keeps a corrupted
      // chain from looping forever.
      next = if steps > self.types.len() {
        None
      } else {
        self.get(current).as_model().and_then(|m| m.base_model)
      };
      Some(current)
    })
  }

  /// Walks `base_scalar` links starting at `scalar` itself.
  pub fn scalar_chain(&self, scalar: TypeId) -> impl Iterator<Item = TypeId> + '_ {
    let mut next = Some(scalar);
    let mut steps = 0usize;
    std::iter::from_fn(move || {
      let current = next?;
      steps += 1;
      next = if steps > self.types.len() {
        None
      } else {
        self.get(current).as_scalar().and_then(|s| s.base_scalar)
      };
      Some(current)
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::Model;

  #[test]
  fn literals_are_interned() {
    let mut store = TypeStore::new();
    let a = store.string_literal("a", None);
    assert_eq!(store.string_literal("a", None), a);
    assert_ne!(store.string_literal("b", None), a);
    let one = store.number_literal(Numeric::new("1", 1.0), None);
    assert_eq!(store.number_literal(Numeric::new("1.0", 1.0), None), one);
    assert_eq!(store.boolean_literal(true), store.boolean_literal(true));
    assert!(store.get(a).is_finished);
  }

  #[test]
  fn base_links_stay_bidirectional() {
    let mut store = TypeStore::new();
    let a = store.alloc(TypeKind::Model(Model::default()), None);
    let b = store.alloc(TypeKind::Model(Model::default()), None);
    let c = store.alloc(TypeKind::Model(Model::default()), None);
    store.set_base_model(c, a);
    assert_eq!(store.get(a).as_model().unwrap().derived_models, vec![c]);
    store.set_base_model(c, b);
    assert!(store.get(a).as_model().unwrap().derived_models.is_empty());
    assert_eq!(store.get(b).as_model().unwrap().derived_models, vec![c]);
    assert_eq!(store.model_chain(c).collect::<Vec<_>>(), vec![c, b]);
  }

  #[test]
  fn error_value_is_recognizable() {
    let store = TypeStore::new();
    assert!(store.is_error_value(store.error_value()));
    assert!(store.get(store.error_type()).is_error());
  }
}
