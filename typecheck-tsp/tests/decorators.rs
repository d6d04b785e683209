mod common;

use common::assert_clean;
use common::codes;
use common::property_names;
use common::property_type;
use common::ty;
use diagnostics::FileId;
use diagnostics::Severity;
use std::sync::Arc;
use std::sync::Mutex;
use syntax_tsp::build::*;
use typecheck_tsp::CheckerOptions;
use typecheck_tsp::DecoratorError;
use typecheck_tsp::DecoratorRegistry;
use typecheck_tsp::Library;
use typecheck_tsp::LibraryDef;
use typecheck_tsp::MarshalledValue;
use typecheck_tsp::MemberPrecedence;
use typecheck_tsp::Program;
use typecheck_tsp::ProgramBuilder;

fn compile_with_decorators(
  statements: Vec<Syn>,
  options: CheckerOptions,
  register: impl FnOnce(&mut DecoratorRegistry),
) -> Program {
  let mut builder = ProgramBuilder::new();
  register(builder.decorators_mut());
  builder.add_source(FileId(0), statements);
  builder.compile(options).expect("compile")
}

fn compile_decorated(statements: Vec<Syn>, register: impl FnOnce(&mut DecoratorRegistry)) -> Program {
  compile_with_decorators(statements, CheckerOptions::default(), register)
}

#[test]
fn arguments_are_marshalled_shallowly() {
  let seen: Arc<Mutex<Vec<MarshalledValue>>> = Arc::default();
  let sink = Arc::clone(&seen);
  let mut program = compile_decorated(
    vec![model("Widget", Vec::new()).decorate(decorator(
      "capture",
      vec![
        object(vec![("a", number("1")), ("b", string("s"))]),
        array(vec![boolean(true), null()]),
        reference("string"),
      ],
    ))],
    move |registry| {
      registry.register_fn("", "capture", move |_ctx, _target, args| {
        let mut sink = sink.lock().unwrap();
        sink.extend(args.iter().map(|arg| arg.marshalled.clone()));
        Ok(())
      });
    },
  );
  assert_clean(&program);
  let string = ty(&mut program, "TypeSpec.string");
  let seen = seen.lock().unwrap();
  assert_eq!(seen.len(), 3);

  let object = &seen[0];
  assert_eq!(object.get("a").and_then(MarshalledValue::as_f64), Some(1.0));
  assert_eq!(object.get("b").and_then(MarshalledValue::as_str), Some("s"));
  let array = seen[1].as_array().unwrap();
  assert_eq!(array[0], MarshalledValue::Boolean(true));
  assert_eq!(array[1], MarshalledValue::Null);
  assert_eq!(seen[2].as_type(), Some(string));
}

#[test]
fn decorators_run_once_per_finished_type() {
  let calls: Arc<Mutex<Vec<String>>> = Arc::default();
  let sink = Arc::clone(&calls);
  let program = compile_decorated(
    vec![
      model("Box", vec![prop("value", reference("T"))])
        .templated(vec![template_param("T")])
        .decorate(decorator("track", Vec::new())),
      model(
        "Uses",
        vec![
          prop("a", reference_with("Box", vec![reference("string")])),
          prop("b", reference_with("Box", vec![reference("string")])),
        ],
      ),
    ],
    move |registry| {
      registry.register_fn("", "track", move |ctx, target, _args| {
        sink.lock().unwrap().push(ctx.display(target));
        Ok(())
      });
    },
  );
  assert_clean(&program);
  assert_eq!(*calls.lock().unwrap(), ["Box<string>"]);
}

#[test]
fn returned_failures_become_diagnostics() {
  let program = compile_decorated(
    vec![model("Widget", Vec::new()).decorate(decorator("boom", Vec::new()))],
    |registry| {
      registry.register_fn("", "boom", |_ctx, _target, _args| {
        Err(DecoratorError::failed("no widgets today"))
      });
    },
  );
  assert_eq!(codes(&program), ["decorator-fail"]);
  assert_eq!(
    program.diagnostics()[0].message,
    "Decorator @boom (global) failed: no widgets today"
  );
}

#[test]
fn panics_become_diagnostics_and_checking_continues() {
  let program = compile_decorated(
    vec![
      namespace(
        "Acme",
        vec![extern_dec("explode", fn_param("target", unknown()), Vec::new())],
      ),
      model("Widget", Vec::new()).decorate(decorator("Acme.explode", Vec::new())),
      model("After", vec![prop("x", reference("Missing"))]),
    ],
    |registry| {
      registry.register_fn("Acme", "explode", |_ctx, _target, _args| {
        panic!("kaboom");
      });
    },
  );
  assert_eq!(codes(&program), ["decorator-fail", "invalid-ref"]);
  assert_eq!(
    program.diagnostics()[0].message,
    "Decorator @explode (Acme) failed: kaboom"
  );
}

#[test]
fn doc_is_recorded_inline_and_by_augment() {
  let mut program = compile_decorated(
    vec![
      model("Inline", Vec::new()).decorate(decorator("doc", vec![string("inline docs")])),
      model("Later", Vec::new()),
      augment("doc", reference("Later"), vec![string("augmented docs")]),
    ],
    |_| {},
  );
  assert_clean(&program);
  let inline = ty(&mut program, "Inline");
  let later = ty(&mut program, "Later");
  assert_eq!(program.doc(inline), Some("inline docs"));
  assert_eq!(program.doc(later), Some("augmented docs"));
}

#[test]
fn augments_run_after_inline_decorators() {
  let order: Arc<Mutex<Vec<String>>> = Arc::default();
  let sink = Arc::clone(&order);
  let program = compile_decorated(
    vec![
      augment("mark", reference("Widget"), vec![string("augment")]),
      model("Widget", Vec::new()).decorate(decorator("mark", vec![string("inline")])),
    ],
    move |registry| {
      registry.register_fn("", "mark", move |ctx, _target, args| {
        let label = args[0].marshalled.as_type().map(|ty| ctx.display(ty));
        sink.lock().unwrap().push(label.unwrap_or_default());
        Ok(())
      });
    },
  );
  assert_clean(&program);
  assert_eq!(*order.lock().unwrap(), ["\"inline\"", "\"augment\""]);
}

#[test]
fn declared_targets_are_enforced() {
  let program = compile_decorated(
    vec![scalar("Code").decorate(decorator(
      "indexer",
      vec![reference("string"), reference("string")],
    ))],
    |_| {},
  );
  assert_eq!(codes(&program), ["decorator-wrong-target"]);
  assert_eq!(
    program.diagnostics()[0].message,
    "Cannot apply @indexer decorator to Code since it is not assignable to TypeSpec.Reflection.Model"
  );
}

#[test]
fn declared_arity_is_enforced() {
  let mut program = compile_decorated(
    vec![model("Widget", Vec::new()).decorate(decorator("doc", Vec::new()))],
    |_| {},
  );
  assert_eq!(codes(&program), ["invalid-argument-count"]);
  assert_eq!(program.diagnostics()[0].message, "Expected 1 arguments, but got 0.");
  let widget = ty(&mut program, "Widget");
  assert_eq!(program.doc(widget), None);
}

#[test]
fn unknown_decorators_are_reported() {
  let program = compile_decorated(
    vec![model("Widget", Vec::new()).decorate(decorator("nope", Vec::new()))],
    |_| {},
  );
  assert_eq!(codes(&program), ["invalid-ref"]);
  assert_eq!(program.diagnostics()[0].message, "Unknown decorator @nope");
}

#[test]
fn extern_declarations_need_an_implementation() {
  let program = compile_decorated(
    vec![extern_dec("orphan", fn_param("target", unknown()), Vec::new())],
    |_| {},
  );
  assert_eq!(codes(&program), ["missing-implementation"]);
}

#[test]
fn helper_decorators_share_state() {
  let program = compile_decorated(
    vec![model("Widget", Vec::new()).decorate(decorator("outer", Vec::new()))],
    |registry| {
      registry.register_fn("", "inner", |ctx, target, _args| {
        ctx.add_to_state_set("inner.ran", target);
        Ok(())
      });
      registry.register_fn("", "outer", |ctx, target, _args| ctx.call("", "inner", target, &[]));
    },
  );
  assert_clean(&program);
  assert_eq!(program.state_set("inner.ran").map(|set| set.len()), Some(1));
}

#[test]
fn helper_recursion_is_refused() {
  let program = compile_decorated(
    vec![model("Widget", Vec::new()).decorate(decorator("spin", Vec::new()))],
    |registry| {
      registry.register_fn("", "spin", |ctx, target, args| ctx.call("", "spin", target, args));
    },
  );
  assert_eq!(codes(&program), ["decorator-fail"]);
  assert_eq!(
    program.diagnostics()[0].message,
    "Decorator @spin (global) failed: @spin calls itself through a helper decorator"
  );
}

#[test]
fn a_panicking_helper_does_not_poison_later_calls() {
  let program = compile_decorated(
    vec![
      model("First", Vec::new()).decorate(decorator("outer", Vec::new())),
      model("Second", Vec::new()).decorate(decorator("user", Vec::new())),
    ],
    |registry| {
      registry.register_fn("", "inner", |ctx, target, _args| {
        if ctx.display(target) == "First" {
          panic!("inner exploded");
        }
        ctx.add_to_state_set("inner.ran", target);
        Ok(())
      });
      registry.register_fn("", "outer", |ctx, target, _args| ctx.call("", "inner", target, &[]));
      registry.register_fn("", "user", |ctx, target, _args| ctx.call("", "outer", target, &[]));
    },
  );
  assert_eq!(codes(&program), ["decorator-fail"]);
  assert_eq!(
    program.diagnostics()[0].message,
    "Decorator @outer (global) failed: inner exploded"
  );
  assert_eq!(program.state_set("inner.ran").map(|set| set.len()), Some(1));
}

#[test]
fn renaming_an_instance_member_keeps_the_declaration_symbols() {
  let mut program = compile_decorated(
    vec![
      model("Box", vec![prop("x", reference("T"))])
        .templated(vec![template_param("T")])
        .decorate(decorator("rename", Vec::new())),
      model(
        "Uses",
        vec![
          prop("a", reference_with("Box", vec![reference("int32")])),
          prop("b", reference_with("Box", vec![reference("string")])),
        ],
      ),
    ],
    |registry| {
      registry.register_fn("", "rename", |ctx, target, _args| {
        ctx.rename_member(target, "x", "y")?;
        Ok(())
      });
    },
  );
  assert_clean(&program);
  let declaration = ty(&mut program, "Box");
  let uses = ty(&mut program, "Uses");
  let first = property_type(&program, uses, "a");
  let second = property_type(&program, uses, "b");
  assert_eq!(property_names(&program, first), ["y"]);
  assert_eq!(property_names(&program, second), ["y"]);
  assert_eq!(property_names(&program, declaration), ["x"]);

  let symbols = program.symbols();
  let sym = program.store().get(declaration).symbol().unwrap();
  let members = symbols.members_of(sym).unwrap();
  let x = symbols.lookup(members, "x").expect("x still bound");
  assert_eq!(symbols.get(x).name, "x");
  assert!(symbols.lookup(members, "y").is_none());
}

#[test]
fn renamed_members_keep_their_position_and_resolve() {
  let mut program = compile_decorated(
    vec![
      extern_dec(
        "rename",
        fn_param("target", reference("Reflection.Model")),
        vec![
          fn_param("from", valueof(reference("string"))),
          fn_param("to", valueof(reference("string"))),
        ],
      ),
      model(
        "Widget",
        vec![
          prop("first", reference("string")),
          prop("old", reference("int32")),
          prop("last", reference("string")),
        ],
      )
      .decorate(decorator("rename", vec![string("old"), string("renamed")])),
      model("User", vec![prop("copy", reference("Widget.renamed"))]),
    ],
    |registry| {
      registry.register_fn("", "rename", |ctx, target, args| {
        let from = args[0].marshalled.as_str().unwrap_or_default().to_string();
        let to = args[1].marshalled.as_str().unwrap_or_default().to_string();
        ctx.rename_member(target, &from, &to)?;
        Ok(())
      });
    },
  );
  assert_clean(&program);
  let widget = ty(&mut program, "Widget");
  let user = ty(&mut program, "User");
  assert_eq!(property_names(&program, widget), ["first", "renamed", "last"]);
  let renamed = *program
    .store()
    .get(widget)
    .as_model()
    .unwrap()
    .properties
    .get("renamed")
    .unwrap();
  assert_eq!(program.store().get(renamed).name(), Some("renamed"));
  assert_eq!(property_type(&program, user, "copy"), renamed);
}

fn synthesize_id(precedence: MemberPrecedence) -> Program {
  compile_with_decorators(
    vec![
      model(
        "Widget",
        vec![prop("name", reference("string")), prop("id", reference("int32"))],
      )
      .decorate(decorator("withId", Vec::new())),
      model("Ref", vec![prop("id", reference("Widget.id"))]),
    ],
    CheckerOptions {
      late_bound_conflicts: precedence,
      ..CheckerOptions::default()
    },
    |registry| {
      registry.register_fn("", "withId", |ctx, target, _args| {
        let string = ctx
          .resolve_type("TypeSpec.string")
          .ok_or_else(|| DecoratorError::failed("no string"))?;
        ctx.add_model_property(target, "id", string)?;
        ctx.add_model_property(target, "extra", string)?;
        Ok(())
      });
    },
  )
}

#[test]
fn declared_members_win_by_default() {
  let mut program = synthesize_id(MemberPrecedence::KeepDeclared);
  assert_clean(&program);
  let widget = ty(&mut program, "Widget");
  let int32 = ty(&mut program, "TypeSpec.int32");
  assert_eq!(property_names(&program, widget), ["name", "id", "extra"]);
  assert_eq!(property_type(&program, widget, "id"), int32);
}

#[test]
fn synthesized_members_can_replace_declared_ones() {
  let mut program = synthesize_id(MemberPrecedence::PreferSynthesized);
  assert_clean(&program);
  let widget = ty(&mut program, "Widget");
  let string = ty(&mut program, "TypeSpec.string");
  assert_eq!(property_names(&program, widget), ["name", "id", "extra"]);
  assert_eq!(property_type(&program, widget, "id"), string);
}

#[test]
fn member_conflicts_can_be_reported() {
  let mut program = synthesize_id(MemberPrecedence::Report);
  assert_eq!(codes(&program), ["duplicate-property", "decorator-fail"]);
  let widget = ty(&mut program, "Widget");
  assert_eq!(property_names(&program, widget), ["name", "id"]);
}

#[test]
fn synthesized_members_resolve_by_reference() {
  let mut program = synthesize_id(MemberPrecedence::PreferSynthesized);
  let widget = ty(&mut program, "Widget");
  let reference = ty(&mut program, "Ref");
  let id = *program
    .store()
    .get(widget)
    .as_model()
    .unwrap()
    .properties
    .get("id")
    .unwrap();
  assert_eq!(property_type(&program, reference, "id"), id);
  let extra = program.resolve_type_path("Widget.extra").expect("late-bound member");
  assert_eq!(program.store().get(extra).name(), Some("extra"));
}

#[test]
fn libraries_report_from_their_catalog() {
  let mut library = Library::new("acme-lib");
  library.definition = LibraryDef::new("acme-lib").with_diagnostic(
    "no-widgets",
    Severity::Warning,
    "Widgets like '${name}' are discouraged.",
  );
  library.statements = vec![namespace(
    "Acme",
    vec![extern_dec("audit", fn_param("target", reference("Reflection.Model")), Vec::new())],
  )];
  library.decorators.register_fn("Acme", "audit", |ctx, target, _args| {
    let name = ctx.display(target);
    let at = ctx.decorator_target();
    ctx.report_library("acme-lib", "no-widgets", &[("name", name.as_str())], at)
  });

  let mut builder = ProgramBuilder::new();
  builder.add_library(library);
  builder.add_source(
    FileId(0),
    vec![
      using("Acme"),
      model("Widget", Vec::new()).decorate(decorator("audit", Vec::new())),
    ],
  );
  let program = builder.compile(CheckerOptions::default()).expect("compile");
  assert_eq!(codes(&program), ["acme-lib/no-widgets"]);
  let diagnostic = &program.diagnostics()[0];
  assert_eq!(diagnostic.severity, Severity::Warning);
  assert_eq!(diagnostic.message, "Widgets like 'Widget' are discouraged.");
  assert_eq!(program.libraries()[0].metadata.name, "acme-lib");
  assert!(!program.has_errors());
}
