use std::error::Error;
use std::fmt;

/// Internal compiler error: a broken invariant rather than a user problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ice {
  pub message: String,
  pub context: Vec<(String, String)>,
}

impl Ice {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      context: Vec::new(),
    }
  }

  pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.context.push((key.into(), value.into()));
    self
  }
}

impl fmt::Display for Ice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.message)?;
    for (key, value) in &self.context {
      write!(f, " ({key}: {value})")?;
    }
    Ok(())
  }
}

impl Error for Ice {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
  Ice(Ice),
}

impl From<Ice> for FatalError {
  fn from(value: Ice) -> Self {
    FatalError::Ice(value)
  }
}

impl fmt::Display for FatalError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FatalError::Ice(ice) => write!(f, "internal error: {ice}"),
    }
  }
}

impl Error for FatalError {}

/// Failure returned by a decorator implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoratorError {
  /// Free-form failure message.
  Failed(String),
  /// A graph mutation was refused.
  Mutation(MutationError),
  /// `call` named a decorator that is not registered.
  UnknownDecorator { namespace: String, name: String },
}

impl DecoratorError {
  pub fn failed(message: impl Into<String>) -> Self {
    DecoratorError::Failed(message.into())
  }
}

impl From<MutationError> for DecoratorError {
  fn from(value: MutationError) -> Self {
    DecoratorError::Mutation(value)
  }
}

impl fmt::Display for DecoratorError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DecoratorError::Failed(message) => f.write_str(message),
      DecoratorError::Mutation(err) => write!(f, "{err}"),
      DecoratorError::UnknownDecorator { namespace, name } => {
        if namespace.is_empty() {
          write!(f, "unknown decorator @{name}")
        } else {
          write!(f, "unknown decorator @{namespace}.{name}")
        }
      }
    }
  }
}

impl Error for DecoratorError {}

/// Refused mutation of the entity graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
  /// The entity already finished and is read-only.
  Finished,
  /// A member with the requested name already exists.
  Conflict { name: String },
  /// The entity has no member collection of the requested kind.
  NotAContainer,
}

impl fmt::Display for MutationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MutationError::Finished => f.write_str("entity is already finished"),
      MutationError::Conflict { name } => write!(f, "member '{name}' already exists"),
      MutationError::NotAContainer => f.write_str("entity is not a member container"),
    }
  }
}

impl Error for MutationError {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ice_display_includes_context() {
    let ice = Ice::new("script expected").with_context("node", "12");
    assert_eq!(ice.to_string(), "script expected (node: 12)");
    let fatal: FatalError = ice.into();
    assert_eq!(fatal.to_string(), "internal error: script expected (node: 12)");
  }

  #[test]
  fn mutation_errors_convert() {
    let err: DecoratorError = MutationError::Conflict { name: "x".into() }.into();
    assert_eq!(err.to_string(), "member 'x' already exists");
  }
}
