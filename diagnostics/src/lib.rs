//! Shared source-location and diagnostic model.
//!
//! Everything the checker reports is eventually projected onto these types
//! once a diagnostic target has been located in a file. Rendering lives in
//! [`render`]; an in-memory [`SourceProvider`](render::SourceProvider) lives
//! in [`files`].
//!
//! ```
//! use diagnostics::files::SourceFiles;
//! use diagnostics::render::render_diagnostic;
//! use diagnostics::{Diagnostic, Span, TextRange};
//!
//! let mut files = SourceFiles::new();
//! let file = files.add("main.tsp", "model Foo {}");
//! let diag = Diagnostic::error(
//!   "invalid-ref",
//!   "Unknown identifier Foo",
//!   Span {
//!     file,
//!     range: TextRange::new(6, 9),
//!   },
//! );
//!
//! let rendered = render_diagnostic(&files, &diag);
//! assert!(rendered.contains("error[invalid-ref]"));
//! assert!(rendered.contains("--> main.tsp:1:7"));
//! ```

pub mod files;
pub mod render;

use serde::Deserialize;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt::Display;
use std::fmt::Formatter;

/// A stable identifier for a source file in a compilation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u32);

/// A byte range in a file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct TextRange {
  pub start: u32,
  pub end: u32,
}

impl TextRange {
  pub const fn new(start: u32, end: u32) -> Self {
    Self { start, end }
  }

  pub fn len(&self) -> u32 {
    self.end.saturating_sub(self.start)
  }

  pub fn is_empty(&self) -> bool {
    self.start >= self.end
  }

  /// Smallest range covering both `self` and `other`.
  pub fn cover(self, other: TextRange) -> TextRange {
    TextRange::new(self.start.min(other.start), self.end.max(other.end))
  }

  pub fn contains(&self, offset: u32) -> bool {
    self.start <= offset && offset < self.end
  }
}

/// A range inside a specific file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Span {
  pub file: FileId,
  pub range: TextRange,
}

/// Diagnostic severity, as reported to users.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
  Error,
  Warning,
}

impl Severity {
  pub const fn as_str(&self) -> &'static str {
    match self {
      Severity::Error => "error",
      Severity::Warning => "warning",
    }
  }
}

impl Display for Severity {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A label attached to a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
  pub span: Span,
  pub message: String,
  pub is_primary: bool,
}

impl Label {
  pub fn new(span: Span, message: impl Into<String>, is_primary: bool) -> Self {
    Self {
      span,
      message: message.into(),
      is_primary,
    }
  }

  pub fn primary(span: Span, message: impl Into<String>) -> Self {
    Self::new(span, message, true)
  }

  pub fn secondary(span: Span, message: impl Into<String>) -> Self {
    Self::new(span, message, false)
  }
}

/// One edit proposed by a [`CodeFix`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TextEdit {
  InsertText { file: FileId, pos: u32, text: String },
  ReplaceText { file: FileId, range: TextRange, text: String },
}

impl TextEdit {
  pub fn file(&self) -> FileId {
    match self {
      TextEdit::InsertText { file, .. } | TextEdit::ReplaceText { file, .. } => *file,
    }
  }
}

/// A suggested fix attached to a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFix {
  pub id: Cow<'static, str>,
  pub label: String,
  pub edits: Vec<TextEdit>,
}

impl CodeFix {
  pub fn new(id: impl Into<Cow<'static, str>>, label: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      label: label.into(),
      edits: Vec::new(),
    }
  }

  pub fn with_edit(mut self, edit: TextEdit) -> Self {
    self.edits.push(edit);
    self
  }
}

/// A located, user-facing diagnostic ready for rendering.
///
/// `primary` is `None` when the reported entity has no source location, for
/// example a synthesized type or a diagnostic reported with no target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
  pub code: Cow<'static, str>,
  pub severity: Severity,
  pub message: String,
  pub primary: Option<Span>,
  pub labels: Vec<Label>,
  pub notes: Vec<String>,
  pub codefixes: Vec<CodeFix>,
}

impl Diagnostic {
  pub fn new(
    severity: Severity,
    code: impl Into<Cow<'static, str>>,
    message: impl Into<String>,
    primary: Option<Span>,
  ) -> Self {
    Self {
      code: code.into(),
      severity,
      message: message.into(),
      primary,
      labels: Vec::new(),
      notes: Vec::new(),
      codefixes: Vec::new(),
    }
  }

  pub fn error(code: impl Into<Cow<'static, str>>, message: impl Into<String>, primary: Span) -> Self {
    Self::new(Severity::Error, code, message, Some(primary))
  }

  pub fn warning(
    code: impl Into<Cow<'static, str>>,
    message: impl Into<String>,
    primary: Span,
  ) -> Self {
    Self::new(Severity::Warning, code, message, Some(primary))
  }

  pub fn with_label(mut self, label: Label) -> Self {
    self.labels.push(label);
    self
  }

  pub fn with_note(mut self, note: impl Into<String>) -> Self {
    self.notes.push(note.into());
    self
  }

  pub fn with_codefix(mut self, fix: CodeFix) -> Self {
    self.codefixes.push(fix);
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn range_cover_and_contains() {
    let a = TextRange::new(4, 8);
    let b = TextRange::new(2, 5);
    assert_eq!(a.cover(b), TextRange::new(2, 8));
    assert!(a.contains(4));
    assert!(!a.contains(8));
    assert!(TextRange::new(3, 3).is_empty());
  }

  #[test]
  fn builders_accumulate() {
    let span = Span {
      file: FileId(0),
      range: TextRange::new(0, 1),
    };
    let diag = Diagnostic::warning("deprecated", "old", span)
      .with_note("use new")
      .with_codefix(CodeFix::new("remove", "Remove").with_edit(TextEdit::ReplaceText {
        file: FileId(0),
        range: TextRange::new(0, 1),
        text: String::new(),
      }));
    assert_eq!(diag.severity, Severity::Warning);
    assert_eq!(diag.notes, vec!["use new".to_string()]);
    assert_eq!(diag.codefixes[0].edits[0].file(), FileId(0));
  }

  #[test]
  fn text_edit_serializes_with_kind_tag() {
    let edit = TextEdit::InsertText {
      file: FileId(2),
      pos: 7,
      text: "x".into(),
    };
    let json = serde_json::to_value(&edit).unwrap();
    assert_eq!(json["kind"], "insert-text");
    assert_eq!(json["pos"], 7);
  }
}
