use super::Checker;
use crate::codes;
use crate::diagnostic::DiagnosticTarget;
use crate::error::MutationError;
use crate::ids::SymbolId;
use crate::ids::TypeId;
use crate::options::MemberPrecedence;
use crate::symbols::Sym;
use crate::symbols::SymbolFlags;
use crate::types::Entity;
use crate::types::ModelIndexer;
use crate::types::ModelProperty;
use crate::types::TypeKind;
use crate::types::VariantKey;
use ahash::AHashSet;

impl Checker {
  /// Own properties first, then each base's, skipping overridden names.
  pub(crate) fn walk_properties_inherited(&self, model: TypeId) -> Vec<TypeId> {
    let mut seen = AHashSet::new();
    let mut out = Vec::new();
    for current in self.store.model_chain(model) {
      let Some(m) = self.store.get(current).as_model() else {
        break;
      };
      for (name, &prop) in m.properties.iter() {
        if seen.insert(name.clone()) {
          out.push(prop);
        }
      }
    }
    out
  }

  /// Creates late-bound symbols for members the binder could not see, then
  /// marks the container's members as complete.
  pub(crate) fn link_members(&mut self, sym: SymbolId, ty: TypeId) {
    let members: Vec<(String, TypeId)> = match self.store.kind(ty) {
      TypeKind::Model(m) => m.properties.iter().map(|(k, &v)| (k.clone(), v)).collect(),
      TypeKind::Interface(i) => i.operations.iter().map(|(k, &v)| (k.clone(), v)).collect(),
      TypeKind::Enum(e) => e.members.iter().map(|(k, &v)| (k.clone(), v)).collect(),
      _ => Vec::new(),
    };
    for (name, member) in members {
      self.bind_late_member(sym, &name, member, false);
    }
    self.resolver.symbols_mut().get_mut(sym).members_bound = true;
  }

  fn bind_late_member(&mut self, container: SymbolId, name: &str, member: TypeId, replace: bool) {
    let symbols = self.resolver.symbols_mut();
    let table = match symbols.members_of(container) {
      Some(table) => table,
      None => {
        let table = symbols.new_table();
        symbols.get_mut(container).members = Some(table);
        table
      }
    };
    if !replace && symbols.lookup(table, name).is_some() {
      return;
    }
    let mut late = Sym::new(name, SymbolFlags::MEMBER | SymbolFlags::LATE_BOUND).with_parent(Some(container));
    late.late_type = Some(member);
    let late = symbols.alloc(late);
    if replace {
      symbols.replace(table, name, late);
    } else {
      symbols.set(table, name, late);
    }
  }

  fn mutable_model(&self, model: TypeId) -> Result<(), MutationError> {
    let data = self.store.get(model);
    if data.as_model().is_none() {
      return Err(MutationError::NotAContainer);
    }
    if data.is_finished {
      return Err(MutationError::Finished);
    }
    Ok(())
  }

  /// Adds a synthesized property to a model that is still being finished.
  ///
  /// A name that already exists is settled by
  /// [`CheckerOptions::late_bound_conflicts`](crate::CheckerOptions).
  pub(crate) fn add_model_property(
    &mut self,
    model: TypeId,
    name: &str,
    ty: TypeId,
  ) -> Result<TypeId, MutationError> {
    self.mutable_model(model)?;
    let existing = self
      .store
      .get(model)
      .as_model()
      .and_then(|m| m.properties.get(name).copied());
    if let Some(existing) = existing {
      match self.options.late_bound_conflicts {
        MemberPrecedence::KeepDeclared => return Ok(existing),
        MemberPrecedence::Report => {
          self.report(codes::DUPLICATE_PROPERTY.error(
            format!("Model already has a property named {name}"),
            DiagnosticTarget::Entity(Entity::Type(model)),
          ));
          return Err(MutationError::Conflict {
            name: name.to_string(),
          });
        }
        MemberPrecedence::PreferSynthesized => {}
      }
    }
    let prop = self.store.alloc(
      TypeKind::ModelProperty(ModelProperty {
        name: name.to_string(),
        ty,
        source_property: None,
        optional: false,
        default_value: None,
        model: Some(model),
      }),
      None,
    );
    self.store.get_mut(prop).is_finished = true;
    if let TypeKind::Model(m) = &mut self.store.get_mut(model).kind {
      m.properties.insert(name.to_string(), prop);
    }
    let data = self.store.get(model);
    if let (Some(sym), None) = (data.symbol(), data.template_mapper) {
      self.bind_late_member(sym, name, prop, existing.is_some());
    }
    tracing::debug!(property = name, "synthesized model property");
    Ok(prop)
  }

  /// Renames a member in place, keeping its position.
  pub(crate) fn rename_member(&mut self, container: TypeId, old: &str, new: &str) -> Result<TypeId, MutationError> {
    if self.store.get(container).is_finished {
      return Err(MutationError::Finished);
    }
    let conflict = || MutationError::Conflict { name: new.to_string() };
    let member = match &mut self.store.get_mut(container).kind {
      TypeKind::Model(m) => rekey_entry(&mut m.properties, old, new).ok_or_else(conflict)?,
      TypeKind::Interface(i) => rekey_entry(&mut i.operations, old, new).ok_or_else(conflict)?,
      TypeKind::Enum(e) => rekey_entry(&mut e.members, old, new).ok_or_else(conflict)?,
      TypeKind::Union(u) => {
        let old_key = VariantKey::Named(old.to_string());
        let new_key = VariantKey::Named(new.to_string());
        if u.variants.contains_key(&new_key) {
          return Err(conflict());
        }
        let member = u.variants.get(&old_key).copied().ok_or_else(conflict)?;
        if !u.variants.rekey(&old_key, new_key) {
          return Err(conflict());
        }
        member
      }
      _ => return Err(MutationError::NotAContainer),
    };
    match &mut self.store.get_mut(member).kind {
      TypeKind::ModelProperty(p) => p.name = new.to_string(),
      TypeKind::Operation(o) => o.name = new.to_string(),
      TypeKind::EnumMember(e) => e.name = new.to_string(),
      TypeKind::UnionVariant(v) => v.name = VariantKey::Named(new.to_string()),
      _ => {}
    }
    // Instances share their declaration's symbol; only declarations own it.
    let data = self.store.get(container);
    if let (Some(sym), None) = (data.symbol(), data.template_mapper) {
      let symbols = self.resolver.symbols_mut();
      if let Some(table) = symbols.members_of(sym) {
        if symbols.rekey(table, old, new) {
          if let Some(renamed) = symbols.lookup(table, new) {
            symbols.get_mut(renamed).name = new.to_string();
          }
        }
      }
    }
    Ok(member)
  }

  /// Sets the model's indexer; a different existing indexer is a conflict.
  pub(crate) fn set_indexer(&mut self, model: TypeId, key: TypeId, value: TypeId) -> Result<(), MutationError> {
    self.mutable_model(model)?;
    let at = DiagnosticTarget::Entity(Entity::Type(model));
    self.merge_indexer(model, ModelIndexer { key, value }, at)
  }

  /// Indexer brought in by composition. A conflict is reported at `at`.
  pub(crate) fn merge_indexer(
    &mut self,
    model: TypeId,
    indexer: ModelIndexer,
    at: DiagnosticTarget,
  ) -> Result<(), MutationError> {
    let existing = self.store.get(model).as_model().and_then(|m| m.indexer);
    match existing {
      Some(current) if current != indexer => {
        self.report(codes::CONFLICTING_INDEXER.error(
          format!("Model {} already has an indexer.", self.display(model)),
          at,
        ));
        Err(MutationError::Conflict {
          name: "indexer".to_string(),
        })
      }
      _ => {
        if let TypeKind::Model(m) = &mut self.store.get_mut(model).kind {
          m.indexer = Some(indexer);
        }
        Ok(())
      }
    }
  }
}

fn rekey_entry(
  map: &mut crate::rekey::RekeyableMap<String, TypeId>,
  old: &str,
  new: &str,
) -> Option<TypeId> {
  if map.contains_key(new) {
    return None;
  }
  let member = map.get(old).copied()?;
  map.rekey(old, new.to_string()).then_some(member)
}
