//! Checker diagnostics.
//!
//! A [`Diagnostic`] names its [`DiagnosticTarget`] rather than a source
//! span; spans are computed afterwards through
//! [`Program::locate`](crate::Program::locate) so synthetic entities can be
//! reported without inventing locations.

use crate::ids::MapperId;
use crate::ids::NodeId;
use crate::ids::SymbolId;
use crate::types::Entity;
use ahash::AHashSet;
use diagnostics::CodeFix;
use diagnostics::Severity;
use diagnostics::Span;
use serde::Deserialize;
use serde::Serialize;
use std::borrow::Cow;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticTarget {
  Node(NodeId),
  Entity(Entity),
  Symbol(SymbolId),
  /// A node inside a template body, reported for one instantiation.
  TemplateInstance {
    node: NodeId,
    mapper: MapperId,
  },
  Span(Span),
  NoTarget,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
  pub code: Cow<'static, str>,
  pub severity: Severity,
  pub message: String,
  pub target: DiagnosticTarget,
  pub codefixes: Vec<CodeFix>,
}

impl Diagnostic {
  pub fn new(
    severity: Severity,
    code: impl Into<Cow<'static, str>>,
    message: impl Into<String>,
    target: DiagnosticTarget,
  ) -> Self {
    Diagnostic {
      code: code.into(),
      severity,
      message: message.into(),
      target,
      codefixes: Vec::new(),
    }
  }

  pub fn with_codefix(mut self, fix: CodeFix) -> Self {
    self.codefixes.push(fix);
    self
  }

  pub fn is_error(&self) -> bool {
    self.severity == Severity::Error
  }
}

/// Append-only sink for one compilation.
///
/// Reports are deduplicated on code, site and message so a failure seen by
/// several consumers is reported once.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
  diagnostics: Vec<Diagnostic>,
  seen: AHashSet<(Cow<'static, str>, DiagnosticTarget, String)>,
}

impl DiagnosticCollector {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns `false` when an identical diagnostic was already recorded.
  pub fn push(&mut self, diagnostic: Diagnostic) -> bool {
    let key = (
      diagnostic.code.clone(),
      diagnostic.target,
      diagnostic.message.clone(),
    );
    if !self.seen.insert(key) {
      return false;
    }
    self.diagnostics.push(diagnostic);
    true
  }

  pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
    for diagnostic in diagnostics {
      self.push(diagnostic);
    }
  }

  pub fn diagnostics(&self) -> &[Diagnostic] {
    &self.diagnostics
  }

  pub fn len(&self) -> usize {
    self.diagnostics.len()
  }

  pub fn is_empty(&self) -> bool {
    self.diagnostics.is_empty()
  }

  pub fn has_errors(&self) -> bool {
    self.diagnostics.iter().any(Diagnostic::is_error)
  }

  pub fn into_vec(self) -> Vec<Diagnostic> {
    self.diagnostics
  }
}

/// Serializable projection of a located diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
  pub code: String,
  pub severity: Severity,
  pub message: String,
  pub span: Option<Span>,
  pub codefixes: Vec<CodeFix>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn duplicate_reports_collapse() {
    let mut collector = DiagnosticCollector::new();
    let diag = Diagnostic::new(
      Severity::Error,
      "invalid-ref",
      "Unknown identifier Foo",
      DiagnosticTarget::Node(NodeId(4)),
    );
    assert!(collector.push(diag.clone()));
    assert!(!collector.push(diag.clone()));
    let mut elsewhere = diag;
    elsewhere.target = DiagnosticTarget::Node(NodeId(5));
    assert!(collector.push(elsewhere));
    assert_eq!(collector.len(), 2);
    assert!(collector.has_errors());
  }
}
