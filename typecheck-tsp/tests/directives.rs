mod common;

use common::assert_clean;
use common::codes;
use common::compile;
use common::compile_with;
use diagnostics::Severity;
use syntax_tsp::build::*;
use typecheck_tsp::CheckerOptions;

fn old_widget() -> Syn {
  model("OldWidget", Vec::new()).directive(deprecated("use Widget instead"))
}

#[test]
fn deprecated_references_warn() {
  let program = compile(vec![
    old_widget(),
    model("Order", vec![prop("item", reference("OldWidget"))]),
  ]);
  assert_eq!(codes(&program), ["deprecated"]);
  let warning = &program.diagnostics()[0];
  assert_eq!(warning.severity, Severity::Warning);
  assert_eq!(warning.message, "use Widget instead");
  assert!(!program.has_errors());
}

#[test]
fn deprecated_code_may_use_deprecated_code() {
  let program = compile(vec![
    old_widget(),
    model("OldOrder", vec![prop("item", reference("OldWidget"))])
      .directive(deprecated("use Order instead")),
  ]);
  assert_clean(&program);
}

#[test]
fn suppress_silences_warnings_beneath_it() {
  let program = compile(vec![
    old_widget(),
    model("Order", vec![prop("item", reference("OldWidget"))])
      .directive(suppress("deprecated", "migrating next release")),
  ]);
  assert_clean(&program);
}

#[test]
fn suppress_only_matches_its_code() {
  let program = compile(vec![
    old_widget(),
    model("Order", vec![prop("item", reference("OldWidget"))])
      .directive(suppress("invalid-ref", "wrong code")),
  ]);
  assert_eq!(codes(&program), ["deprecated"]);
}

#[test]
fn errors_cannot_be_suppressed() {
  let program = compile(vec![model("Order", vec![prop("item", reference("Missing"))])
    .directive(suppress("invalid-ref", "not yet written"))]);
  assert_eq!(codes(&program), ["suppress-error", "invalid-ref"]);
  assert_eq!(program.diagnostics()[0].message, "Errors cannot be suppressed.");
}

#[test]
fn suppression_can_be_turned_off() {
  let options = CheckerOptions {
    suppress_directives: false,
    ..CheckerOptions::default()
  };
  let program = compile_with(
    vec![
      old_widget(),
      model("Order", vec![prop("item", reference("OldWidget"))])
        .directive(suppress("deprecated", "ignored")),
    ],
    options,
  );
  assert_eq!(codes(&program), ["deprecated"]);
}

#[test]
fn warnings_as_errors_promotes_severity() {
  let options = CheckerOptions {
    warnings_as_errors: true,
    ..CheckerOptions::default()
  };
  let program = compile_with(
    vec![
      old_widget(),
      model("Order", vec![prop("item", reference("OldWidget"))]),
    ],
    options,
  );
  assert_eq!(codes(&program), ["deprecated"]);
  assert_eq!(program.diagnostics()[0].severity, Severity::Error);
  assert!(program.has_errors());
}

#[test]
fn unknown_directives_are_reported() {
  let program = compile(vec![
    model("Widget", Vec::new()).directive(directive("nope", Vec::new()))
  ]);
  assert_eq!(codes(&program), ["invalid-directive"]);
  assert_eq!(program.diagnostics()[0].message, "Unknown directive '#nope'");
}

#[test]
fn directives_need_a_string_argument() {
  let program = compile(vec![
    model("Widget", Vec::new()).directive(directive("deprecated", vec![number("1")]))
  ]);
  assert_eq!(codes(&program), ["invalid-directive"]);
  assert_eq!(
    program.diagnostics()[0].message,
    "#deprecated directive expects a string argument."
  );
}
