//! Libraries: extra sources, decorator implementations and a diagnostic
//! catalog loaded alongside user code.

use crate::decorators::DecoratorRegistry;
use crate::diagnostic::Diagnostic;
use crate::diagnostic::DiagnosticTarget;
use crate::ids::NodeId;
use diagnostics::Severity;
use serde::Serialize;
use syntax_tsp::build::Syn;

/// A diagnostic a library can report. Messages are templates with
/// `${param}` placeholders; the message named `default` is used unless
/// another is requested.
#[derive(Clone, Debug)]
pub struct LibraryDiagnostic {
  pub code: String,
  pub severity: Severity,
  pub messages: Vec<(String, String)>,
}

#[derive(Clone, Debug, Default)]
pub struct LibraryDef {
  pub name: String,
  pub diagnostics: Vec<LibraryDiagnostic>,
}

impl LibraryDef {
  pub fn new(name: impl Into<String>) -> Self {
    LibraryDef {
      name: name.into(),
      diagnostics: Vec::new(),
    }
  }

  pub fn with_diagnostic(mut self, code: &str, severity: Severity, message: &str) -> Self {
    self.diagnostics.push(LibraryDiagnostic {
      code: code.to_string(),
      severity,
      messages: vec![("default".to_string(), message.to_string())],
    });
    self
  }

  /// Adds a named alternative message to an already declared code.
  pub fn with_message(mut self, code: &str, id: &str, message: &str) -> Self {
    if let Some(diagnostic) = self.diagnostics.iter_mut().find(|d| d.code == code) {
      diagnostic.messages.push((id.to_string(), message.to_string()));
    }
    self
  }

  /// Builds the diagnostic `"<library>/<code>"`, or `None` when the catalog
  /// has no such code or message.
  pub fn create_diagnostic(
    &self,
    code: &str,
    message_id: Option<&str>,
    params: &[(&str, &str)],
    target: DiagnosticTarget,
  ) -> Option<Diagnostic> {
    let entry = self.diagnostics.iter().find(|d| d.code == code)?;
    let message_id = message_id.unwrap_or("default");
    let (_, template) = entry.messages.iter().find(|(id, _)| id == message_id)?;
    Some(Diagnostic::new(
      entry.severity,
      format!("{}/{}", self.name, code),
      interpolate(template, params),
      target,
    ))
  }
}

fn interpolate(template: &str, params: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(template.len());
  let mut rest = template;
  while let Some(start) = rest.find("${") {
    out.push_str(&rest[..start]);
    let after = &rest[start + 2..];
    let Some(end) = after.find('}') else {
      out.push_str(&rest[start..]);
      return out;
    };
    let name = &after[..end];
    match params.iter().find(|(key, _)| *key == name) {
      Some((_, value)) => out.push_str(value),
      None => out.push_str(&rest[start..start + 3 + end]),
    }
    rest = &after[end + 1..];
  }
  out.push_str(rest);
  out
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LibraryMetadata {
  pub name: String,
  pub version: Option<String>,
}

/// A loaded library ready to be added to a program.
#[derive(Debug, Default)]
pub struct Library {
  pub metadata: LibraryMetadata,
  pub definition: LibraryDef,
  /// Statements of the library's entrypoint, bound like a source file.
  pub statements: Vec<Syn>,
  pub decorators: DecoratorRegistry,
}

impl Library {
  pub fn new(name: &str) -> Self {
    Library {
      metadata: LibraryMetadata {
        name: name.to_string(),
        version: None,
      },
      definition: LibraryDef::new(name),
      statements: Vec::new(),
      decorators: DecoratorRegistry::new(),
    }
  }
}

/// A library as registered in a compiled program.
#[derive(Clone, Debug)]
pub struct LibraryInstance {
  pub metadata: LibraryMetadata,
  pub definition: LibraryDef,
  pub entrypoint: Option<NodeId>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn catalog() -> LibraryDef {
    LibraryDef::new("my-lib")
      .with_diagnostic("bad-name", Severity::Error, "Name '${name}' is not allowed.")
      .with_message("bad-name", "short", "Bad name ${name} (${missing})")
  }

  #[test]
  fn messages_are_interpolated_under_the_library_code() {
    let diagnostic = catalog()
      .create_diagnostic("bad-name", None, &[("name", "x")], DiagnosticTarget::Node(NodeId(1)))
      .unwrap();
    assert_eq!(diagnostic.code, "my-lib/bad-name");
    assert_eq!(diagnostic.message, "Name 'x' is not allowed.");
    assert!(diagnostic.is_error());
  }

  #[test]
  fn unknown_placeholders_are_kept() {
    let diagnostic = catalog()
      .create_diagnostic("bad-name", Some("short"), &[("name", "x")], DiagnosticTarget::NoTarget)
      .unwrap();
    assert_eq!(diagnostic.message, "Bad name x (${missing})");
  }

  #[test]
  fn unknown_codes_are_refused() {
    let def = catalog();
    assert!(def
      .create_diagnostic("other", None, &[], DiagnosticTarget::NoTarget)
      .is_none());
    assert!(def
      .create_diagnostic("bad-name", Some("long"), &[], DiagnosticTarget::NoTarget)
      .is_none());
  }
}
