//! Semantic core of the schema language compiler.
//!
//! Checking runs in one synchronous pass per [`Program`]: the
//! [binder](binder) creates symbols, the [resolver](resolve) links
//! references to them, and the checker produces the entity graph on
//! demand, instantiating templates and running decorators as it goes.
//! User-facing problems are reported as [`Diagnostic`]s; only broken
//! internal invariants surface as [`FatalError`].

pub mod binder;
mod check;
pub mod codes;
pub mod decorators;
mod diagnostic;
mod error;
pub mod ids;
mod instantiate;
pub mod library;
mod options;
mod program;
pub mod rekey;
pub mod resolve;
pub mod stdlib;
pub mod symbols;
pub mod types;

pub use decorators::{
  DecoratorApplication, DecoratorArgument, DecoratorContext, DecoratorImpl, DecoratorRegistry,
  MarshalledValue, ProgramState,
};
pub use diagnostic::{Diagnostic, DiagnosticCollector, DiagnosticRecord, DiagnosticTarget};
pub use error::{DecoratorError, FatalError, Ice, MutationError};
pub use ids::{ImplementationId, MapperId, NodeId, SymbolId, TableId, TypeId, ValueId};
pub use instantiate::InstantiationStats;
pub use library::{Library, LibraryDef, LibraryInstance, LibraryMetadata};
pub use options::{CheckerOptions, MemberPrecedence};
pub use program::{Program, ProgramBuilder};
pub use types::{Entity, TypeKind, TypeStore};
