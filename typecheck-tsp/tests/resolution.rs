mod common;

use common::assert_clean;
use common::codes;
use common::compile;
use common::compile_files;
use common::property_type;
use common::ty;
use syntax_tsp::build::*;

#[test]
fn two_usings_make_a_reference_ambiguous() {
  let program = compile(vec![
    namespace("A", vec![model("Shared", Vec::new())]),
    namespace("B", vec![model("Shared", Vec::new())]),
    namespace(
      "C",
      vec![
        using("A"),
        using("B"),
        model("Uses", vec![prop("s", reference("Shared"))]),
      ],
    ),
  ]);
  assert_eq!(codes(&program), ["ambiguous-symbol"]);
  assert_eq!(
    program.diagnostics()[0].message,
    "\"Shared\" is an ambiguous name between A.Shared, B.Shared. Try using fully qualified name instead: A.Shared, B.Shared"
  );
}

#[test]
fn qualified_references_bypass_ambiguity() {
  let mut program = compile(vec![
    namespace("A", vec![model("Shared", Vec::new())]),
    namespace("B", vec![model("Shared", Vec::new())]),
    namespace(
      "C",
      vec![
        using("A"),
        using("B"),
        model("Uses", vec![prop("s", reference("B.Shared"))]),
      ],
    ),
  ]);
  assert_clean(&program);
  let uses = ty(&mut program, "C.Uses");
  let shared = ty(&mut program, "B.Shared");
  assert_eq!(property_type(&program, uses, "s"), shared);
}

#[test]
fn namespaces_merge_across_files() {
  let mut program = compile_files(vec![
    vec![namespace("Shop.Api", vec![model("Order", Vec::new())])],
    vec![namespace(
      "Shop.Api",
      vec![model("Invoice", vec![prop("order", reference("Order"))])],
    )],
  ]);
  assert_clean(&program);
  let api = ty(&mut program, "Shop.Api");
  let order = ty(&mut program, "Shop.Api.Order");
  let invoice = ty(&mut program, "Shop.Api.Invoice");
  assert_eq!(property_type(&program, invoice, "order"), order);

  let namespace = program.store().get(api).as_namespace().unwrap();
  let models: Vec<_> = namespace.models.keys().cloned().collect();
  assert_eq!(models, ["Order", "Invoice"]);
  let shop = namespace.namespace.unwrap();
  assert_eq!(program.store().get(shop).name(), Some("Shop"));
  assert_eq!(program.display(order), "Shop.Api.Order");
}

#[test]
fn unknown_identifiers_are_reported_and_replaced() {
  let mut program = compile(vec![model(
    "A",
    vec![prop("x", reference("Missing")), prop("y", reference("string"))],
  )]);
  assert_eq!(codes(&program), ["invalid-ref"]);
  assert_eq!(program.diagnostics()[0].message, "Unknown identifier Missing");
  let a = ty(&mut program, "A");
  assert!(program.store().is_error_type(property_type(&program, a, "x")));
}

#[test]
fn unknown_members_name_the_full_path() {
  let program = compile(vec![
    namespace("Lib", vec![model("Known", Vec::new())]),
    model("A", vec![prop("x", reference("Lib.Unknown"))]),
  ]);
  assert_eq!(codes(&program), ["invalid-ref"]);
  assert_eq!(program.diagnostics()[0].message, "Unknown identifier Lib.Unknown");
}

#[test]
fn members_resolve_through_types() {
  let mut program = compile(vec![
    model("Pet", vec![prop("name", reference("string"))]),
    model("Dog", Vec::new()).extends(reference("Pet")),
    model("Tag", vec![prop("label", reference("Dog.name"))]),
    enum_("Color", vec![member("red"), member("blue")]),
    model("Paint", vec![prop("color", reference("Color.red"))]),
  ]);
  assert_clean(&program);
  let pet = ty(&mut program, "Pet");
  let tag = ty(&mut program, "Tag");
  let paint = ty(&mut program, "Paint");
  let name = *program
    .store()
    .get(pet)
    .as_model()
    .unwrap()
    .properties
    .get("name")
    .unwrap();
  assert_eq!(property_type(&program, tag, "label"), name);
  let red = property_type(&program, paint, "color");
  assert_eq!(program.display(red), "Color.red");
}

#[test]
fn using_a_non_namespace_is_rejected() {
  let program = compile(vec![model("M", Vec::new()), using("M")]);
  assert_eq!(codes(&program), ["using-invalid-ref"]);
}

#[test]
fn duplicate_declarations_are_reported_on_each() {
  let program = compile(vec![model("A", Vec::new()), model("A", Vec::new())]);
  assert_eq!(codes(&program), ["duplicate-symbol", "duplicate-symbol"]);
}

#[test]
fn blockless_namespaces_scope_later_statements() {
  let mut program = compile(vec![blockless_namespace(
    "My.Service",
    vec![model("Widget", Vec::new())],
  )]);
  assert_clean(&program);
  let widget = ty(&mut program, "My.Service.Widget");
  assert_eq!(program.display(widget), "My.Service.Widget");
}

#[test]
fn global_declarations_shadow_file_usings() {
  let mut program = compile(vec![
    namespace("A", vec![model("Foo", Vec::new())]),
    using("A"),
    model("Foo", vec![prop("marker", reference("string"))]),
    model("Use", vec![prop("f", reference("Foo"))]),
  ]);
  assert_clean(&program);
  let global = ty(&mut program, "Foo");
  let imported = ty(&mut program, "A.Foo");
  let uses = ty(&mut program, "Use");
  let f = property_type(&program, uses, "f");
  assert_eq!(f, global);
  assert_ne!(f, imported);
}
