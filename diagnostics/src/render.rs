use crate::Diagnostic;
use crate::FileId;
use crate::Label;
use std::fmt::Write;

/// Source metadata used during rendering.
pub struct SourceFile<'a> {
  pub name: &'a str,
  pub text: &'a str,
}

/// Provides access to source text for rendering diagnostics.
pub trait SourceProvider {
  fn file_name(&self, file: FileId) -> Option<&str>;
  fn file_text(&self, file: FileId) -> Option<&str>;

  fn source(&self, file: FileId) -> Option<SourceFile<'_>> {
    Some(SourceFile {
      name: self.file_name(file)?,
      text: self.file_text(file)?,
    })
  }
}

/// Options to control diagnostic rendering.
#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
  pub render_secondary_files: bool,
  pub render_codefixes: bool,
}

impl Default for RenderOptions {
  fn default() -> Self {
    Self {
      render_secondary_files: true,
      render_codefixes: true,
    }
  }
}

/// Render a diagnostic into a human-readable string with caret highlighting.
pub fn render_diagnostic(provider: &dyn SourceProvider, diagnostic: &Diagnostic) -> String {
  render_diagnostic_with_options(provider, diagnostic, RenderOptions::default())
}

pub fn render_diagnostic_with_options(
  provider: &dyn SourceProvider,
  diagnostic: &Diagnostic,
  options: RenderOptions,
) -> String {
  let mut output = String::new();
  writeln!(
    output,
    "{}[{}]: {}",
    diagnostic.severity, diagnostic.code, diagnostic.message
  )
  .unwrap();

  let mut labels = Vec::with_capacity(diagnostic.labels.len() + 1);
  if let Some(primary) = diagnostic.primary {
    labels.push(Label::primary(primary, diagnostic.message.clone()));
  }
  labels.extend(diagnostic.labels.iter().cloned());
  labels.sort_by(|a, b| {
    b.is_primary
      .cmp(&a.is_primary)
      .then(a.span.file.cmp(&b.span.file))
      .then(a.span.range.start.cmp(&b.span.range.start))
      .then(a.message.cmp(&b.message))
  });
  if !options.render_secondary_files {
    if let Some(primary) = diagnostic.primary {
      labels.retain(|label| label.span.file == primary.file);
    }
  }

  for label in &labels {
    render_label(provider, &mut output, label);
  }
  for note in &diagnostic.notes {
    writeln!(output, "= note: {}", note).unwrap();
  }
  if options.render_codefixes {
    for fix in &diagnostic.codefixes {
      writeln!(output, "= fix: {}", fix.label).unwrap();
    }
  }
  output
}

fn render_label(provider: &dyn SourceProvider, output: &mut String, label: &Label) {
  let name = provider
    .file_name(label.span.file)
    .unwrap_or("<unknown file>");
  let Some(text) = provider.file_text(label.span.file) else {
    writeln!(output, " --> {}:?:?", name).unwrap();
    writeln!(output, "  | (source unavailable)").unwrap();
    return;
  };
  let start = clamp_to_char_boundary(text, label.span.range.start as usize);
  let end = clamp_to_char_boundary(text, label.span.range.end as usize).max(start);
  let (line_no, line_start) = line_of(text, start);
  let line_end = text[line_start..]
    .find('\n')
    .map(|i| line_start + i)
    .unwrap_or(text.len());
  let line = text[line_start..line_end].trim_end_matches('\r');
  let col = text[line_start..start].chars().count() + 1;
  let gutter = (line_no + 1).to_string();
  let pad = " ".repeat(gutter.len());

  writeln!(output, "{} --> {}:{}:{}", &pad[1..], name, line_no + 1, col).unwrap();
  writeln!(output, "{} |", pad).unwrap();
  writeln!(output, "{} | {}", gutter, line).unwrap();
  let caret_end = end.min(line_start + line.len());
  let width = text[start..caret_end.max(start)].chars().count().max(1);
  let mut marker = format!("{} | {}{}", pad, " ".repeat(col - 1), "^".repeat(width));
  let marker_char = if label.is_primary { '^' } else { '-' };
  if !label.is_primary {
    marker = marker.replace('^', &marker_char.to_string());
  }
  if label.message.is_empty() {
    writeln!(output, "{}", marker).unwrap();
  } else {
    writeln!(output, "{} {}", marker, label.message).unwrap();
  }
}

fn line_of(text: &str, offset: usize) -> (usize, usize) {
  let mut line = 0;
  let mut line_start = 0;
  for (idx, ch) in text[..offset].char_indices() {
    if ch == '\n' {
      line += 1;
      line_start = idx + 1;
    }
  }
  (line, line_start)
}

fn clamp_to_char_boundary(text: &str, offset: usize) -> usize {
  let mut offset = offset.min(text.len());
  while !text.is_char_boundary(offset) {
    offset -= 1;
  }
  offset
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::files::SourceFiles;
  use crate::CodeFix;
  use crate::Severity;
  use crate::Span;
  use crate::TextRange;

  #[test]
  fn renders_single_line_span() {
    let mut files = SourceFiles::new();
    let file = files.add("main.tsp", "model A { x: Foo }");
    let diag = Diagnostic::error("invalid-ref", "Unknown identifier Foo", Span {
      file,
      range: TextRange::new(13, 16),
    });
    let rendered = render_diagnostic(&files, &diag);
    let expected = concat!(
      "error[invalid-ref]: Unknown identifier Foo\n",
      " --> main.tsp:1:14\n",
      "  |\n",
      "1 | model A { x: Foo }\n",
      "  |              ^^^ Unknown identifier Foo\n",
    );
    assert_eq!(rendered, expected);
  }

  #[test]
  fn renders_second_line_and_codefix() {
    let mut files = SourceFiles::new();
    let file = files.add("a.tsp", "using A;\nusing A;\n");
    let diag = Diagnostic::error("duplicate-using", "duplicate", Span {
      file,
      range: TextRange::new(9, 17),
    })
    .with_codefix(CodeFix::new("remove-using", "Remove using"));
    let rendered = render_diagnostic(&files, &diag);
    assert!(rendered.contains(" --> a.tsp:2:1"));
    assert!(rendered.contains("= fix: Remove using"));
  }

  #[test]
  fn renders_without_location() {
    let files = SourceFiles::new();
    let diag = Diagnostic::new(Severity::Warning, "no-target", "global", None);
    assert_eq!(
      render_diagnostic(&files, &diag),
      "warning[no-target]: global\n"
    );
  }
}
