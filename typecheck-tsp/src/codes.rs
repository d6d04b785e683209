//! Registry of diagnostic codes emitted by the checker.
//!
//! Each [`Code`] records a short description and where the diagnostic is
//! anchored, so callers and tests can refer to codes by constant instead of
//! by string.

use crate::diagnostic::Diagnostic;
use crate::diagnostic::DiagnosticTarget;
use diagnostics::Severity;

/// Metadata describing a diagnostic code.
#[derive(Clone, Copy, Debug)]
pub struct Code {
  /// Stable identifier, e.g. `invalid-ref`.
  pub id: &'static str,
  pub description: &'static str,
  /// Guidance for what the diagnostic target should be.
  pub target: &'static str,
}

impl Code {
  pub const fn new(id: &'static str, description: &'static str, target: &'static str) -> Self {
    Code {
      id,
      description,
      target,
    }
  }

  pub const fn as_str(&self) -> &'static str {
    self.id
  }

  pub fn error(&self, message: impl Into<String>, target: DiagnosticTarget) -> Diagnostic {
    Diagnostic::new(Severity::Error, self.id, message, target)
  }

  pub fn warning(&self, message: impl Into<String>, target: DiagnosticTarget) -> Diagnostic {
    Diagnostic::new(Severity::Warning, self.id, message, target)
  }
}

impl PartialEq<str> for Code {
  fn eq(&self, other: &str) -> bool {
    self.id == other
  }
}

/// Two declarations share a name in one scope.
pub const DUPLICATE_SYMBOL: Code = Code::new(
  "duplicate-symbol",
  "duplicate name in scope",
  "each colliding declaration",
);

/// A name is introduced by several `using` imports with different targets.
pub const AMBIGUOUS_SYMBOL: Code = Code::new(
  "ambiguous-symbol",
  "ambiguous name",
  "the reference being resolved",
);

/// A reference resolves to nothing, or to the wrong kind of symbol.
pub const INVALID_REF: Code = Code::new(
  "invalid-ref",
  "unknown identifier",
  "the identifier or member expression",
);

/// Template arguments do not fit the declaration's parameters.
pub const INVALID_TEMPLATE_ARGS: Code = Code::new(
  "invalid-template-args",
  "invalid template arguments",
  "the offending argument, or the reference when one is missing",
);

/// A type or value does not satisfy its constraint or declared type.
pub const UNASSIGNABLE: Code = Code::new(
  "unassignable",
  "type is not assignable",
  "the source expression",
);

/// A template refers to itself with the same arguments while being
/// instantiated.
pub const RECURSIVE_TEMPLATE: Code = Code::new(
  "recursive-template-instantiation",
  "template instantiates itself recursively",
  "the self-referencing reference",
);

/// Nested instantiation went past the configured depth.
pub const INSTANTIATION_DEPTH: Code = Code::new(
  "instantiation-depth",
  "template instantiation too deep",
  "the reference that exceeded the depth",
);

pub const CIRCULAR_BASE_TYPE: Code = Code::new(
  "circular-base-type",
  "type is its own base",
  "the `extends`/`is` expression closing the cycle",
);

pub const CIRCULAR_ALIAS: Code = Code::new(
  "circular-alias-type",
  "alias refers to itself",
  "the alias value closing the cycle",
);

pub const EXTEND_MODEL: Code = Code::new(
  "extend-model",
  "models can only extend models",
  "the `extends`/`is` expression",
);

pub const SPREAD_MODEL: Code = Code::new(
  "spread-model",
  "only models can be spread",
  "the spread target",
);

pub const INTERSECT_NON_MODEL: Code = Code::new(
  "intersect-non-model",
  "only models can be intersected",
  "the offending intersection option",
);

pub const INTERSECT_DUPLICATE_PROPERTY: Code = Code::new(
  "intersect-duplicate-property",
  "intersection has incompatible properties of the same name",
  "the intersection expression",
);

pub const DUPLICATE_PROPERTY: Code = Code::new(
  "duplicate-property",
  "model property declared twice",
  "the later property, or the spread introducing it",
);

pub const DUPLICATE_MEMBER: Code = Code::new(
  "duplicate-member",
  "enum member, union variant or operation declared twice",
  "the later member",
);

pub const EXTENDS_INTERFACE: Code = Code::new(
  "extends-interface",
  "interfaces can only extend interfaces",
  "the extends expression",
);

pub const EXTENDS_INTERFACE_DUPLICATE: Code = Code::new(
  "extends-interface-duplicate",
  "two extended interfaces contribute an operation with the same name",
  "the extends expression bringing in the second operation",
);

pub const EXTEND_SCALAR: Code = Code::new(
  "extend-scalar",
  "scalars can only extend scalars",
  "the extends expression",
);

pub const INVALID_DECORATOR: Code = Code::new(
  "invalid-decorator",
  "reference is not a decorator",
  "the decorator expression",
);

pub const DECORATOR_WRONG_TARGET: Code = Code::new(
  "decorator-wrong-target",
  "decorator cannot be applied to this target",
  "the decorator expression",
);

pub const INVALID_ARGUMENT_COUNT: Code = Code::new(
  "invalid-argument-count",
  "wrong number of arguments",
  "the decorator or call expression",
);

pub const INVALID_ARGUMENT: Code = Code::new(
  "invalid-argument",
  "argument does not match parameter",
  "the argument",
);

pub const EXPECT_VALUE: Code = Code::new(
  "expect-value",
  "a value was expected but a type was given",
  "the expression",
);

pub const VALUE_IN_TYPE: Code = Code::new(
  "value-in-type",
  "a type was expected but a value was given",
  "the expression",
);

pub const MISSING_IMPLEMENTATION: Code = Code::new(
  "missing-implementation",
  "extern decorator has no implementation",
  "the decorator declaration",
);

pub const DECORATOR_EXTERN: Code = Code::new(
  "decorator-extern",
  "decorator declarations must be extern",
  "the decorator declaration",
);

pub const DECORATOR_FAIL: Code = Code::new(
  "decorator-fail",
  "decorator implementation failed",
  "the decorator application",
);

pub const DUPLICATE_USING: Code = Code::new(
  "duplicate-using",
  "namespace imported twice in one scope",
  "the later using statement",
);

pub const USING_INVALID_REF: Code = Code::new(
  "using-invalid-ref",
  "using must refer to a namespace",
  "the using statement name",
);

pub const DEPRECATED: Code = Code::new(
  "deprecated",
  "reference to a deprecated declaration",
  "the reference",
);

pub const SUPPRESS_ERROR: Code = Code::new(
  "suppress-error",
  "errors cannot be suppressed",
  "the suppressed error's site",
);

pub const INVALID_DIRECTIVE: Code = Code::new(
  "invalid-directive",
  "unknown or malformed directive",
  "the directive expression",
);

pub const CONFLICTING_INDEXER: Code = Code::new(
  "conflicting-indexer",
  "model declares two different indexers",
  "the decorated model",
);

pub const INCOMPATIBLE_INDEXER: Code = Code::new(
  "incompatible-indexer",
  "property is not assignable to the model's indexer",
  "the property",
);

pub const INVALID_DEFAULT: Code = Code::new(
  "invalid-default",
  "default is not assignable to the declared type",
  "the default expression",
);

pub const NON_CALLABLE: Code = Code::new(
  "non-callable",
  "expression cannot be called",
  "the call target",
);

pub const AUGMENT_TARGET: Code = Code::new(
  "augment-decorator-target",
  "augment decorator target is not a declaration",
  "the augment target expression",
);

pub const INVALID_ENUM_VALUE: Code = Code::new(
  "enum-value-kind",
  "enum member values must be string or numeric literals",
  "the member value",
);

pub const SPREAD_ENUM: Code = Code::new(
  "spread-enum",
  "only enums can be spread into enums",
  "the spread target",
);

/// `op x is y` where `y` is not an operation.
pub const IS_OPERATION: Code = Code::new(
  "is-operation",
  "operations can only reuse operation signatures",
  "the `is` expression",
);

pub const CIRCULAR_CONST: Code = Code::new(
  "circular-const",
  "const refers to itself",
  "the const declaration",
);
