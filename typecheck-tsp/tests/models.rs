mod common;

use common::assert_clean;
use common::codes;
use common::compile;
use common::property_names;
use common::property_type;
use common::ty;
use syntax_tsp::build::*;
use typecheck_tsp::types::SourceModelUsage;
use typecheck_tsp::Program;
use typecheck_tsp::TypeId;

#[test]
fn is_copies_properties_without_a_base() {
  let mut program = compile(vec![
    model("A", vec![prop("x", reference("string"))]),
    model("B", vec![prop("y", reference("int32"))]).is(reference("A")),
  ]);
  assert_clean(&program);
  let a = ty(&mut program, "A");
  let b = ty(&mut program, "B");
  assert_eq!(property_names(&program, b), ["x", "y"]);

  let store = program.store();
  let model = store.get(b).as_model().unwrap();
  assert_eq!(model.base_model, None);
  assert_eq!(model.source_model, Some(a));
  assert_eq!(model.source_models.len(), 1);
  assert_eq!(model.source_models[0].usage, SourceModelUsage::Is);
  assert_eq!(model.source_models[0].model, a);

  let copied = *model.properties.get("x").unwrap();
  let original = *store.get(a).as_model().unwrap().properties.get("x").unwrap();
  assert_ne!(copied, original);
  let copied = store.get(copied).as_property().unwrap();
  assert_eq!(copied.source_property, Some(original));
  assert_eq!(copied.model, Some(b));
}

#[test]
fn extends_links_both_directions() {
  let mut program = compile(vec![
    model("Pet", vec![prop("name", reference("string"))]),
    model("Dog", vec![prop("breed", reference("string"))]).extends(reference("Pet")),
  ]);
  assert_clean(&program);
  let pet = ty(&mut program, "Pet");
  let dog = ty(&mut program, "Dog");
  let store = program.store();
  assert_eq!(store.get(dog).as_model().unwrap().base_model, Some(pet));
  assert_eq!(store.get(pet).as_model().unwrap().derived_models, [dog]);
  assert_eq!(property_names(&program, dog), ["breed"]);

  let inherited: Vec<_> = program
    .walk_properties_inherited(dog)
    .into_iter()
    .map(|p| program.store().get(p).name().unwrap().to_string())
    .collect();
  assert_eq!(inherited, ["breed", "name"]);
  assert!(program.is_type_assignable(dog, pet));
  assert!(!program.is_type_assignable(pet, dog));
}

#[test]
fn spread_records_its_source() {
  let mut program = compile(vec![
    model("Base", vec![prop("id", reference("string"))]),
    model("Widget", vec![spread("Base"), prop("weight", reference("float64"))]),
  ]);
  assert_clean(&program);
  let base = ty(&mut program, "Base");
  let widget = ty(&mut program, "Widget");
  assert_eq!(property_names(&program, widget), ["id", "weight"]);
  let model = program.store().get(widget).as_model().unwrap();
  assert_eq!(model.source_models[0].usage, SourceModelUsage::Spread);
  assert_eq!(model.source_models[0].model, base);
  assert_eq!(model.base_model, None);
}

#[test]
fn duplicate_properties_keep_the_first() {
  let mut program = compile(vec![model(
    "A",
    vec![prop("x", reference("string")), prop("x", reference("int32"))],
  )]);
  assert_eq!(codes(&program), ["duplicate-property"]);
  let a = ty(&mut program, "A");
  let string = ty(&mut program, "TypeSpec.string");
  assert_eq!(property_type(&program, a, "x"), string);
}

#[test]
fn circular_base_is_reported_once() {
  let program = compile(vec![
    model("A", Vec::new()).extends(reference("B")),
    model("B", Vec::new()).extends(reference("A")),
  ]);
  assert_eq!(codes(&program), ["circular-base-type"]);
}

#[test]
fn extending_a_scalar_is_rejected() {
  let program = compile(vec![model("A", Vec::new()).extends(reference("string"))]);
  assert_eq!(codes(&program), ["extend-model"]);
}

#[test]
fn self_references_in_properties_are_allowed() {
  let mut program = compile(vec![model(
    "Node",
    vec![optional_prop("next", reference("Node"))],
  )]);
  assert_clean(&program);
  let node = ty(&mut program, "Node");
  assert_eq!(property_type(&program, node, "next"), node);
}

#[test]
fn model_expressions_are_anonymous() {
  let mut program = compile(vec![model(
    "Outer",
    vec![prop(
      "inner",
      model_expr(vec![prop("flag", reference("boolean"))]),
    )],
  )]);
  assert_clean(&program);
  let outer = ty(&mut program, "Outer");
  let inner = property_type(&program, outer, "inner");
  assert_eq!(program.store().get(inner).name(), None);
  assert_eq!(property_names(&program, inner), ["flag"]);
  assert_eq!(program.display(inner), "{ flag: boolean }");
}

#[test]
fn intersections_merge_properties() {
  let mut program = compile(vec![
    model("A", vec![prop("a", reference("string"))]),
    model("B", vec![prop("b", reference("string"))]),
    alias("AB", intersection(vec![reference("A"), reference("B")])),
  ]);
  assert_clean(&program);
  let ab = ty(&mut program, "AB");
  assert_eq!(property_names(&program, ab), ["a", "b"]);
}

#[test]
fn intersecting_conflicting_properties_is_reported() {
  let program = compile(vec![
    model("A", vec![prop("a", reference("string"))]),
    model("B", vec![prop("a", reference("int32"))]),
    alias("AB", intersection(vec![reference("A"), reference("B")])),
  ]);
  assert_eq!(codes(&program), ["intersect-duplicate-property"]);
}

fn record_of(value: &str) -> Syn {
  reference_with("Record", vec![reference(value)])
}

#[test]
fn spreading_two_different_indexers_is_reported() {
  let mut program = compile(vec![model(
    "M",
    vec![
      spread_of(record_of("string")),
      spread_of(record_of("int32")),
    ],
  )]);
  assert_eq!(codes(&program), ["conflicting-indexer"]);
  assert_eq!(program.diagnostics()[0].message, "Model M already has an indexer.");
  let m = ty(&mut program, "M");
  let string = ty(&mut program, "TypeSpec.string");
  let indexer = program.store().get(m).as_model().and_then(|m| m.indexer).unwrap();
  assert_eq!(indexer.value, string);
}

#[test]
fn spreading_the_same_indexer_twice_is_fine() {
  let program = compile(vec![model(
    "M",
    vec![
      spread_of(record_of("string")),
      spread_of(record_of("string")),
    ],
  )]);
  assert_clean(&program);
}

#[test]
fn intersecting_two_different_indexers_is_reported() {
  let program = compile(vec![alias(
    "Both",
    intersection(vec![record_of("string"), record_of("int32")]),
  )]);
  assert_eq!(codes(&program), ["conflicting-indexer"]);
}

fn operation_names(program: &Program, interface: TypeId) -> Vec<String> {
  program
    .store()
    .get(interface)
    .as_interface()
    .unwrap()
    .operations
    .keys()
    .cloned()
    .collect()
}

#[test]
fn extends_copies_operations() {
  let mut program = compile(vec![
    interface("Reads", vec![op("get", Vec::new(), reference("string"))]),
    interface("Writes", vec![op("put", Vec::new(), void())]),
    interface("Store", vec![op("drop", Vec::new(), void())])
      .extends(reference("Reads"))
      .extends(reference("Writes")),
  ]);
  assert_clean(&program);
  let reads = ty(&mut program, "Reads");
  let writes = ty(&mut program, "Writes");
  let store = ty(&mut program, "Store");
  assert_eq!(operation_names(&program, store), ["get", "put", "drop"]);
  let data = program.store().get(store).as_interface().unwrap();
  assert_eq!(data.source_interfaces, [reads, writes]);

  let original = *program.store().get(reads).as_interface().unwrap().operations.get("get").unwrap();
  let copy = *data.operations.get("get").unwrap();
  assert_ne!(copy, original);
  let copied = program.store().get(copy).as_operation().unwrap();
  assert_eq!(copied.source_operation, Some(original));
  assert_eq!(copied.interface, Some(store));
}

#[test]
fn own_operations_override_inherited_ones() {
  let mut program = compile(vec![
    interface(
      "Base",
      vec![
        op("get", Vec::new(), reference("string")),
        op("list", Vec::new(), reference("string")),
      ],
    ),
    interface("Derived", vec![op("get", Vec::new(), reference("int32"))])
      .extends(reference("Base")),
  ]);
  assert_clean(&program);
  let derived = ty(&mut program, "Derived");
  let int32 = ty(&mut program, "TypeSpec.int32");
  assert_eq!(operation_names(&program, derived), ["get", "list"]);
  let get = *program.store().get(derived).as_interface().unwrap().operations.get("get").unwrap();
  let operation = program.store().get(get).as_operation().unwrap();
  assert_eq!(operation.return_type, int32);
  assert_eq!(operation.source_operation, None);
}

#[test]
fn extending_two_interfaces_with_the_same_operation_is_reported() {
  let mut program = compile(vec![
    interface("A", vec![op("foo", Vec::new(), reference("string"))]),
    interface("B", vec![op("foo", Vec::new(), reference("int32"))]),
    interface("C", Vec::new())
      .extends(reference("A"))
      .extends(reference("B")),
  ]);
  assert_eq!(codes(&program), ["extends-interface-duplicate"]);
  assert_eq!(
    program.diagnostics()[0].message,
    "Interface extends cannot have multiple operations with the same name. Operation 'foo' is duplicated."
  );
  let c = ty(&mut program, "C");
  let string = ty(&mut program, "TypeSpec.string");
  let foo = *program.store().get(c).as_interface().unwrap().operations.get("foo").unwrap();
  assert_eq!(program.store().get(foo).as_operation().unwrap().return_type, string);
}

#[test]
fn extending_a_model_is_reported() {
  let program = compile(vec![
    model("Data", Vec::new()),
    interface("Api", Vec::new()).extends(reference("Data")),
  ]);
  assert_eq!(codes(&program), ["extends-interface"]);
}
