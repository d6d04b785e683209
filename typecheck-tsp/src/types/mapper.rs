use super::Entity;
use crate::ids::MapperId;
use crate::ids::NodeId;
use crate::ids::SymbolId;
use crate::ids::TypeId;
use ahash::AHashMap;
use smallvec::SmallVec;

/// Binding of a declaration's template parameters to argument entities.
#[derive(Clone, Debug)]
pub struct TypeMapper {
  /// Some parameter is still bound to itself.
  pub partial: bool,
  /// Arguments in parameter order.
  pub args: SmallVec<[Entity; 4]>,
  /// Template parameter type to entity. Includes the parent's bindings.
  pub(crate) map: AHashMap<TypeId, Entity>,
  pub declaration: SymbolId,
  /// Reference that requested this instantiation.
  pub source: Option<NodeId>,
  pub parent: Option<MapperId>,
}

impl TypeMapper {
  pub fn get(&self, param: TypeId) -> Option<Entity> {
    self.map.get(&param).copied()
  }
}
