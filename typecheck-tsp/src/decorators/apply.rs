use super::DecoratorApplication;
use super::DecoratorArgument;
use super::DecoratorContext;
use super::MarshalledValue;
use crate::check::Checker;
use crate::codes;
use crate::ids::MapperId;
use crate::ids::NodeId;
use crate::ids::SymbolId;
use crate::ids::TypeId;
use crate::resolve::reference_text;
use crate::resolve::ResolutionKind;
use crate::symbols::SymbolFlags;
use crate::types::Entity;
use crate::types::FunctionParameterType;
use crate::types::MixedParameterConstraint;
use std::any::Any;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use syntax_tsp::NodeKind;

struct ParameterSignature {
  constraint: MixedParameterConstraint,
  optional: bool,
  rest: bool,
}

impl Checker {
  /// Resolves and validates a `@dec(...)` or `@@dec(...)` node. Returns
  /// `None` when anything was reported, in which case the decorator does not
  /// run.
  pub(crate) fn check_decorator_application(
    &mut self,
    node: NodeId,
    mapper: Option<MapperId>,
  ) -> Option<DecoratorApplication> {
    let tree = Arc::clone(&self.tree);
    let (target, arguments) = match tree.kind(node) {
      NodeKind::DecoratorExpression { target, arguments }
      | NodeKind::AugmentDecoratorStatement {
        target, arguments, ..
      } => (*target, arguments.as_slice()),
      _ => return None,
    };
    let result = self.resolver.resolve_decorator(target);
    let sym = match result.kind {
      ResolutionKind::Resolved => result.final_symbol?,
      ResolutionKind::Ambiguous => {
        self.report_resolution_failure(target, &result);
        return None;
      }
      ResolutionKind::NotFound | ResolutionKind::Unknown => {
        let message = format!("Unknown decorator @{}", reference_text(&tree, target));
        self.report(codes::INVALID_REF.error(message, self.target_at(target, mapper)));
        return None;
      }
    };
    let symbols = self.resolver.symbols();
    let entry = symbols.get(sym);
    if !entry.flags.contains(SymbolFlags::DECORATOR) {
      let message = format!("{} is not a decorator", symbols.qualified_name(sym));
      self.report(codes::INVALID_DECORATOR.error(message, self.target_at(target, mapper)));
      return None;
    }
    let name = entry.name.trim_start_matches('@').to_string();
    let implementation = entry.implementation;
    let namespace = entry
      .parent
      .map(|parent| symbols.qualified_name(parent))
      .unwrap_or_default();
    let definition = self.decorator_definition(sym);

    let signature = definition.map(|decorator| self.decorator_signature(decorator));
    if let Some(signature) = &signature {
      if !self.check_decorator_arity(signature, arguments.len(), node, mapper) {
        return None;
      }
    }
    let mut args = Vec::with_capacity(arguments.len());
    let mut valid = true;
    for (index, &argument) in arguments.iter().enumerate() {
      let parameter = signature
        .as_ref()
        .and_then(|signature| signature.get(index).or_else(|| signature.last().filter(|p| p.rest)));
      match self.check_decorator_argument(parameter, argument, mapper) {
        Some(value) => args.push(DecoratorArgument {
          value,
          marshalled: MarshalledValue::from_entity(&self.store, value),
          node: argument,
        }),
        None => valid = false,
      }
    }
    valid.then_some(DecoratorApplication {
      definition,
      implementation,
      name,
      namespace,
      args,
      node,
      mapper,
    })
  }

  fn decorator_definition(&mut self, sym: SymbolId) -> Option<TypeId> {
    let declaration = self
      .resolver
      .symbols()
      .get(sym)
      .declarations
      .iter()
      .copied()
      .find(|&decl| matches!(self.tree.kind(decl), NodeKind::DecoratorDeclarationStatement { .. }))?;
    Some(self.check_decorator_declaration(declaration))
  }

  fn decorator_signature(&self, decorator: TypeId) -> Vec<ParameterSignature> {
    let Some(decorator) = self.store.get(decorator).as_decorator() else {
      return Vec::new();
    };
    decorator
      .parameters
      .iter()
      .filter_map(|&param| self.store.get(param).as_function_parameter())
      .map(|param| {
        let constraint = match &param.ty {
          FunctionParameterType::Mixed(constraint) => *constraint,
          FunctionParameterType::Signature(ty) => MixedParameterConstraint {
            node: None,
            ty: Some(*ty),
            value_type: None,
          },
        };
        ParameterSignature {
          constraint,
          optional: param.optional,
          rest: param.rest,
        }
      })
      .collect()
  }

  fn check_decorator_arity(
    &mut self,
    signature: &[ParameterSignature],
    count: usize,
    node: NodeId,
    mapper: Option<MapperId>,
  ) -> bool {
    let required = signature.iter().filter(|p| !p.optional && !p.rest).count();
    let has_rest = signature.iter().any(|p| p.rest);
    if count >= required && (has_rest || count <= signature.len()) {
      return true;
    }
    let message = if has_rest || required != signature.len() {
      format!("Expected at least {required} arguments, but got {count}.")
    } else {
      format!("Expected {required} arguments, but got {count}.")
    };
    self.report(codes::INVALID_ARGUMENT_COUNT.error(message, self.target_at(node, mapper)));
    false
  }

  fn check_decorator_argument(
    &mut self,
    parameter: Option<&ParameterSignature>,
    node: NodeId,
    mapper: Option<MapperId>,
  ) -> Option<Entity> {
    let entity = self.check_node(node, mapper);
    if self.is_template_dependent(entity) {
      return Some(entity);
    }
    let Some(parameter) = parameter else {
      // Without a declaration, arguments are passed as checked.
      return match entity {
        Entity::Constraint(_) => {
          self.argument_kind_mismatch(node, mapper, false);
          None
        }
        Entity::Indeterminate(ty) => Some(Entity::Type(ty)),
        entity => Some(entity),
      };
    };
    let element = |checker: &Self, ty: TypeId| {
      if parameter.rest {
        checker.rest_element_type(ty)
      } else {
        ty
      }
    };
    let constraint = parameter.constraint;
    if let Some(value_type) = constraint.value_type {
      let as_value = match entity {
        Entity::Value(_) | Entity::Indeterminate(_) => true,
        _ => constraint.ty.is_none(),
      };
      if as_value {
        let expected = element(self, value_type);
        let value = self.check_value_with(node, mapper, Some(expected), codes::INVALID_ARGUMENT);
        return (!self.store.is_error_value(value)).then_some(Entity::Value(value));
      }
    }
    let ty = match entity {
      Entity::Type(ty) | Entity::Indeterminate(ty) => ty,
      Entity::Value(_) | Entity::Constraint(_) => {
        self.argument_kind_mismatch(node, mapper, false);
        return None;
      }
    };
    if self.store.is_error_type(ty) {
      return None;
    }
    if let Some(expected) = constraint.ty.map(|t| element(self, t)) {
      if !self.is_type_assignable(ty, expected) {
        let message = format!(
          "Argument of type '{}' is not assignable to parameter of type '{}'",
          self.display(ty),
          self.display(expected)
        );
        self.report(codes::INVALID_ARGUMENT.error(message, self.target_at(node, mapper)));
        return None;
      }
    }
    Some(Entity::Type(ty))
  }

  /// Runs one decorator on `ty`. Failures, returned or panicked, become a
  /// `decorator-fail` diagnostic and never abort checking.
  pub(crate) fn apply_decorator(&mut self, ty: TypeId, application: &DecoratorApplication) {
    let _span = tracing::debug_span!(
      "apply_decorator",
      decorator = %application.name,
      namespace = %application.namespace
    )
    .entered();
    if !self.decorator_accepts(ty, application) {
      return;
    }
    let Some(implementation) = application.implementation.and_then(|id| self.registry.get(id)) else {
      return;
    };
    let key = (application.namespace.clone(), application.name.clone());
    // A panicking helper unwinds past its own pop.
    let depth = self.decorator_stack.len();
    self.decorator_stack.push(key);
    let outcome = {
      let mut ctx = DecoratorContext::new(self, application, ty);
      catch_unwind(AssertUnwindSafe(|| {
        implementation.apply(&mut ctx, ty, &application.args)
      }))
    };
    self.decorator_stack.truncate(depth);
    let message = match outcome {
      Ok(Ok(())) => return,
      Ok(Err(err)) => err.to_string(),
      Err(payload) => panic_message(payload.as_ref()),
    };
    tracing::warn!(
      decorator = %application.name,
      namespace = %application.namespace,
      error = %message,
      "decorator failed"
    );
    let namespace = if application.namespace.is_empty() {
      "global"
    } else {
      application.namespace.as_str()
    };
    let message = format!("Decorator @{} ({namespace}) failed: {message}", application.name);
    let target = self.target_at(application.node, application.mapper);
    self.report(codes::DECORATOR_FAIL.error(message, target));
  }

  /// Checks the decorated type against the declaration's target parameter.
  fn decorator_accepts(&mut self, ty: TypeId, application: &DecoratorApplication) -> bool {
    let Some(definition) = application.definition else {
      return true;
    };
    let expected = self
      .store
      .get(definition)
      .as_decorator()
      .and_then(|decorator| self.store.get(decorator.target).as_function_parameter())
      .and_then(|target| match &target.ty {
        FunctionParameterType::Mixed(constraint) => constraint.ty,
        FunctionParameterType::Signature(ty) => Some(*ty),
      });
    let Some(expected) = expected else {
      return true;
    };
    if self.is_type_assignable(ty, expected) {
      return true;
    }
    let message = format!(
      "Cannot apply @{} decorator to {} since it is not assignable to {}",
      application.name,
      self.display(ty),
      self.display(expected)
    );
    let target = self.target_at(application.node, application.mapper);
    self.report(codes::DECORATOR_WRONG_TARGET.error(message, target));
    false
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    (*message).to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "decorator panicked".to_string()
  }
}
