//! Decorator dispatch.
//!
//! Decorators are host functions registered under `(namespace, name)` in a
//! [`DecoratorRegistry`]. The binder exposes every registration as an
//! implementation symbol, so `extern dec` declarations and `@dec`
//! references resolve to it like any other declaration. The checker
//! collects a [`DecoratorApplication`] per use and runs it right before the
//! decorated type finishes.

mod apply;
mod context;
mod marshal;

pub use context::DecoratorContext;
pub use marshal::MarshalledValue;

use crate::binder::ImplementationSymbol;
use crate::error::DecoratorError;
use crate::ids::ImplementationId;
use crate::ids::MapperId;
use crate::ids::NodeId;
use crate::ids::TypeId;
use crate::types::Entity;
use ahash::AHashMap;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// A host-supplied decorator implementation.
pub trait DecoratorImpl: Send + Sync {
  fn apply(
    &self,
    ctx: &mut DecoratorContext<'_>,
    target: TypeId,
    args: &[DecoratorArgument],
  ) -> Result<(), DecoratorError>;
}

impl<F> DecoratorImpl for F
where
  F: Fn(&mut DecoratorContext<'_>, TypeId, &[DecoratorArgument]) -> Result<(), DecoratorError> + Send + Sync,
{
  fn apply(
    &self,
    ctx: &mut DecoratorContext<'_>,
    target: TypeId,
    args: &[DecoratorArgument],
  ) -> Result<(), DecoratorError> {
    self(ctx, target, args)
  }
}

#[derive(Clone, Debug)]
pub struct DecoratorArgument {
  pub value: Entity,
  pub marshalled: MarshalledValue,
  pub node: NodeId,
}

/// One use of a decorator on a declaration.
#[derive(Clone, Debug)]
pub struct DecoratorApplication {
  /// The `extern dec` declaration, when there is one.
  pub definition: Option<TypeId>,
  pub implementation: Option<ImplementationId>,
  /// Without the leading `@`.
  pub name: String,
  /// Dotted namespace the decorator is declared in.
  pub namespace: String,
  pub args: Vec<DecoratorArgument>,
  /// The `@dec(...)` or `@@dec(...)` node.
  pub node: NodeId,
  pub(crate) mapper: Option<MapperId>,
}

struct Registered {
  namespace: String,
  name: String,
  implementation: Arc<dyn DecoratorImpl>,
}

#[derive(Default)]
pub struct DecoratorRegistry {
  entries: Vec<Registered>,
  by_name: AHashMap<(String, String), ImplementationId>,
}

impl DecoratorRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers `implementation` as `@namespace.name`. Registering a name
  /// again replaces the implementation and keeps its id.
  pub fn register(
    &mut self,
    namespace: &str,
    name: &str,
    implementation: impl DecoratorImpl + 'static,
  ) -> ImplementationId {
    self.insert(namespace, name, Arc::new(implementation))
  }

  /// Registers a closure; spelled out so closure signatures infer.
  pub fn register_fn<F>(&mut self, namespace: &str, name: &str, f: F) -> ImplementationId
  where
    F: Fn(&mut DecoratorContext<'_>, TypeId, &[DecoratorArgument]) -> Result<(), DecoratorError>
      + Send
      + Sync
      + 'static,
  {
    self.insert(namespace, name, Arc::new(f))
  }

  fn insert(&mut self, namespace: &str, name: &str, implementation: Arc<dyn DecoratorImpl>) -> ImplementationId {
    let key = (namespace.to_string(), name.to_string());
    if let Some(&id) = self.by_name.get(&key) {
      self.entries[id.index()].implementation = implementation;
      return id;
    }
    let id = ImplementationId(self.entries.len() as u32);
    self.entries.push(Registered {
      namespace: key.0.clone(),
      name: key.1.clone(),
      implementation,
    });
    self.by_name.insert(key, id);
    id
  }

  pub fn lookup(&self, namespace: &str, name: &str) -> Option<ImplementationId> {
    self
      .by_name
      .get(&(namespace.to_string(), name.to_string()))
      .copied()
  }

  pub fn get(&self, id: ImplementationId) -> Option<Arc<dyn DecoratorImpl>> {
    self.entries.get(id.index()).map(|e| Arc::clone(&e.implementation))
  }

  /// Copies every registration of `other`; later registrations win.
  pub fn merge(&mut self, other: &DecoratorRegistry) {
    for entry in &other.entries {
      self.insert(&entry.namespace, &entry.name, Arc::clone(&entry.implementation));
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub(crate) fn symbols(&self) -> Vec<ImplementationSymbol<'_>> {
    self
      .entries
      .iter()
      .enumerate()
      .map(|(index, entry)| ImplementationSymbol {
        namespace: &entry.namespace,
        name: &entry.name,
        id: ImplementationId(index as u32),
      })
      .collect()
  }
}

impl fmt::Debug for DecoratorRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list()
      .entries(self.entries.iter().map(|e| format!("@{}.{}", e.namespace, e.name)))
      .finish()
  }
}

/// State written by decorators, keyed by a state name such as
/// `"TypeSpec.doc"`.
#[derive(Clone, Debug, Default)]
pub struct ProgramState {
  maps: AHashMap<String, BTreeMap<TypeId, MarshalledValue>>,
  sets: AHashMap<String, BTreeSet<TypeId>>,
}

impl ProgramState {
  pub fn map(&self, key: &str) -> Option<&BTreeMap<TypeId, MarshalledValue>> {
    self.maps.get(key)
  }

  pub fn set(&self, key: &str) -> Option<&BTreeSet<TypeId>> {
    self.sets.get(key)
  }

  pub fn get(&self, key: &str, ty: TypeId) -> Option<&MarshalledValue> {
    self.maps.get(key)?.get(&ty)
  }

  pub fn contains(&self, key: &str, ty: TypeId) -> bool {
    self.sets.get(key).is_some_and(|set| set.contains(&ty))
  }

  pub(crate) fn insert(&mut self, key: &str, ty: TypeId, value: MarshalledValue) {
    self.maps.entry(key.to_string()).or_default().insert(ty, value);
  }

  pub(crate) fn add(&mut self, key: &str, ty: TypeId) {
    self.sets.entry(key.to_string()).or_default().insert(ty);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn noop(_: &mut DecoratorContext<'_>, _: TypeId, _: &[DecoratorArgument]) -> Result<(), DecoratorError> {
    Ok(())
  }

  #[test]
  fn reregistering_keeps_the_id() {
    let mut registry = DecoratorRegistry::new();
    let first = registry.register_fn("My.Lib", "tag", noop);
    let other = registry.register_fn("", "tag", noop);
    let again = registry.register_fn("My.Lib", "tag", |_, _, _| Err(DecoratorError::failed("replaced")));
    assert_eq!(first, again);
    assert_ne!(first, other);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.lookup("My.Lib", "tag"), Some(first));
    assert_eq!(registry.lookup("My", "tag"), None);
  }

  #[test]
  fn merged_registrations_are_exposed_as_symbols() {
    let mut library = DecoratorRegistry::new();
    library.register_fn("Lib", "a", noop);
    library.register_fn("Lib", "b", noop);
    let mut registry = DecoratorRegistry::new();
    registry.register_fn("", "c", noop);
    registry.merge(&library);
    let names: Vec<_> = registry
      .symbols()
      .iter()
      .map(|s| format!("{}.{}", s.namespace, s.name))
      .collect();
    assert_eq!(names, [".c", "Lib.a", "Lib.b"]);
  }

  #[test]
  fn state_is_keyed_by_name_and_type() {
    let mut state = ProgramState::default();
    state.insert("Lib.doc", TypeId(3), MarshalledValue::String("x".into()));
    state.add("Lib.flag", TypeId(3));
    assert_eq!(state.get("Lib.doc", TypeId(3)).and_then(|v| v.as_str()), Some("x"));
    assert!(state.get("Lib.doc", TypeId(4)).is_none());
    assert!(state.contains("Lib.flag", TypeId(3)));
    assert!(!state.contains("Lib.other", TypeId(3)));
  }
}
