use super::DecoratorApplication;
use super::DecoratorArgument;
use super::MarshalledValue;
use crate::check::Checker;
use crate::diagnostic::Diagnostic;
use crate::diagnostic::DiagnosticTarget;
use crate::error::DecoratorError;
use crate::error::MutationError;
use crate::ids::TypeId;
use crate::ids::ValueId;
use crate::types::TypeStore;

/// What a running decorator can see and change.
///
/// Diagnostics reported through the context are anchored at the decorator
/// application by default, including from decorators reached through
/// [`call`](Self::call).
pub struct DecoratorContext<'a> {
  checker: &'a mut Checker,
  application: &'a DecoratorApplication,
  target: TypeId,
}

impl<'a> DecoratorContext<'a> {
  pub(crate) fn new(checker: &'a mut Checker, application: &'a DecoratorApplication, target: TypeId) -> Self {
    DecoratorContext {
      checker,
      application,
      target,
    }
  }

  /// The decorated type.
  pub fn target(&self) -> TypeId {
    self.target
  }

  pub fn decorator_name(&self) -> &str {
    &self.application.name
  }

  pub fn decorator_namespace(&self) -> &str {
    &self.application.namespace
  }

  pub fn store(&self) -> &TypeStore {
    &self.checker.store
  }

  pub fn display(&self, ty: TypeId) -> String {
    self.checker.display(ty)
  }

  /// The decorator expression.
  pub fn decorator_target(&self) -> DiagnosticTarget {
    self
      .checker
      .target_at(self.application.node, self.application.mapper)
  }

  /// Source of argument `index`, or the decorator expression when there is
  /// no such argument.
  pub fn argument_target(&self, index: usize) -> DiagnosticTarget {
    match self.application.args.get(index) {
      Some(arg) => self.checker.target_at(arg.node, self.application.mapper),
      None => self.decorator_target(),
    }
  }

  pub fn report(&mut self, diagnostic: Diagnostic) {
    self.checker.report(diagnostic);
  }

  /// Reports `code` from the catalog of `library`, filling `${name}`
  /// placeholders of the message from `params`.
  pub fn report_library(
    &mut self,
    library: &str,
    code: &str,
    params: &[(&str, &str)],
    target: DiagnosticTarget,
  ) -> Result<(), DecoratorError> {
    let def = self
      .checker
      .libraries
      .iter()
      .find(|def| def.name == library)
      .ok_or_else(|| DecoratorError::failed(format!("library '{library}' is not loaded")))?;
    let diagnostic = def
      .create_diagnostic(code, None, params, target)
      .ok_or_else(|| DecoratorError::failed(format!("library '{library}' has no diagnostic '{code}'")))?;
    self.checker.report(diagnostic);
    Ok(())
  }

  pub fn state(&self, key: &str, ty: TypeId) -> Option<&MarshalledValue> {
    self.checker.state.get(key, ty)
  }

  pub fn set_state(&mut self, key: &str, ty: TypeId, value: MarshalledValue) {
    self.checker.state.insert(key, ty, value);
  }

  pub fn in_state_set(&self, key: &str, ty: TypeId) -> bool {
    self.checker.state.contains(key, ty)
  }

  pub fn add_to_state_set(&mut self, key: &str, ty: TypeId) {
    self.checker.state.add(key, ty);
  }

  pub fn is_type_assignable(&self, source: TypeId, target: TypeId) -> bool {
    self.checker.is_type_assignable(source, target)
  }

  pub fn is_value_assignable(&self, value: ValueId, target: TypeId) -> bool {
    self.checker.is_value_assignable(value, target)
  }

  /// Type declared at a dotted path such as `TypeSpec.string`.
  pub fn resolve_type(&mut self, path: &str) -> Option<TypeId> {
    let sym = self.checker.resolver.resolve_path(path)?;
    self.checker.type_of_symbol(sym)
  }

  /// Synthesizes a property on the model being decorated, binding it as a
  /// late-bound member.
  pub fn add_model_property(&mut self, model: TypeId, name: &str, ty: TypeId) -> Result<TypeId, MutationError> {
    self.checker.add_model_property(model, name, ty)
  }

  /// Renames a member in place, keeping its position.
  pub fn rename_member(&mut self, container: TypeId, old: &str, new: &str) -> Result<TypeId, MutationError> {
    self.checker.rename_member(container, old, new)
  }

  pub fn set_indexer(&mut self, model: TypeId, key: TypeId, value: TypeId) -> Result<(), MutationError> {
    self.checker.set_indexer(model, key, value)
  }

  /// Runs another registered decorator on `target`. Its diagnostics stay
  /// anchored at this application.
  pub fn call(
    &mut self,
    namespace: &str,
    name: &str,
    target: TypeId,
    args: &[DecoratorArgument],
  ) -> Result<(), DecoratorError> {
    let unknown = || DecoratorError::UnknownDecorator {
      namespace: namespace.to_string(),
      name: name.to_string(),
    };
    let id = self.checker.registry.lookup(namespace, name).ok_or_else(unknown)?;
    let implementation = self.checker.registry.get(id).ok_or_else(unknown)?;
    let key = (namespace.to_string(), name.to_string());
    if self.checker.decorator_stack.contains(&key) {
      return Err(DecoratorError::failed(format!(
        "@{name} calls itself through a helper decorator"
      )));
    }
    self.checker.decorator_stack.push(key);
    let result = implementation.apply(self, target, args);
    self.checker.decorator_stack.pop();
    result
  }
}
