mod common;

use common::assert_clean;
use common::codes;
use common::compile;
use common::property_type;
use common::ty;
use syntax_tsp::build::*;
use typecheck_tsp::types::EnumMemberValue;
use typecheck_tsp::types::ValueKind;

#[test]
fn aliases_stand_for_their_target() {
  let mut program = compile(vec![
    alias("Id", reference("string")),
    model("User", vec![prop("id", reference("Id"))]),
  ]);
  assert_clean(&program);
  let user = ty(&mut program, "User");
  let string = ty(&mut program, "TypeSpec.string");
  assert_eq!(property_type(&program, user, "id"), string);
  assert_eq!(ty(&mut program, "Id"), string);
}

#[test]
fn annotated_constants_take_the_declared_scalar() {
  let mut program = compile(vec![typed_const("port", reference("int32"), number("8080"))]);
  assert_clean(&program);
  let int32 = ty(&mut program, "TypeSpec.int32");
  let port = program.resolve_value_path("port").expect("port");
  let data = program.store().value(port);
  assert_eq!(data.ty, int32);
  let ValueKind::Numeric { value, scalar } = &data.kind else {
    panic!("expected a numeric value, got {}", data.kind.kind_name());
  };
  assert_eq!(value.as_f64(), 8080.0);
  assert_eq!(*scalar, Some(int32));
}

#[test]
fn out_of_range_numbers_are_unassignable() {
  let program = compile(vec![typed_const("small", reference("int8"), number("300"))]);
  assert_eq!(codes(&program), ["unassignable"]);
}

#[test]
fn strings_do_not_fit_numeric_scalars() {
  let program = compile(vec![typed_const("n", reference("int32"), string("seven"))]);
  assert_eq!(codes(&program), ["unassignable"]);
}

#[test]
fn scalar_constructors_build_scalar_values() {
  let mut program = compile(vec![const_(
    "epoch",
    call("utcDateTime.fromISO", vec![string("2020-01-01T00:00:00Z")]),
  )]);
  assert_clean(&program);
  let utc = ty(&mut program, "TypeSpec.utcDateTime");
  let epoch = program.resolve_value_path("epoch").expect("epoch");
  let ValueKind::Scalar(scalar) = &program.store().value(epoch).kind else {
    panic!("expected a scalar value");
  };
  assert_eq!(scalar.scalar, utc);
  assert_eq!(scalar.name, "fromISO");
  assert_eq!(scalar.args.len(), 1);
  let ValueKind::String { value, .. } = &program.store().value(scalar.args[0]).kind else {
    panic!("expected a string argument");
  };
  assert_eq!(value, "2020-01-01T00:00:00Z");
}

#[test]
fn constructor_arguments_are_checked() {
  let program = compile(vec![const_("epoch", call("utcDateTime.fromISO", Vec::new()))]);
  assert_eq!(codes(&program), ["invalid-argument-count"]);
  assert_eq!(program.diagnostics()[0].message, "Expected 1 arguments, but got 0.");
}

#[test]
fn models_are_not_callable() {
  let program = compile(vec![
    model("Widget", Vec::new()),
    const_("w", call("Widget", Vec::new())),
  ]);
  assert_eq!(codes(&program), ["non-callable"]);
}

#[test]
fn constants_referring_to_each_other_are_circular() {
  let program = compile(vec![const_("a", reference("b")), const_("b", reference("a"))]);
  assert_eq!(codes(&program), ["circular-const"]);
}

#[test]
fn types_in_value_positions_are_rejected() {
  let program = compile(vec![
    model("Widget", Vec::new()),
    const_("w", reference("Widget")),
  ]);
  assert_eq!(codes(&program), ["expect-value"]);
  assert_eq!(
    program.diagnostics()[0].message,
    "Widget refers to a type, but is being used as a value here."
  );
}

#[test]
fn object_and_array_literals_keep_their_entries() {
  let mut program = compile(vec![const_(
    "config",
    object(vec![
      ("name", string("svc")),
      ("ports", array(vec![number("80"), number("443")])),
    ]),
  )]);
  assert_clean(&program);
  let config = program.resolve_value_path("config").expect("config");
  let store = program.store();
  let ValueKind::Object(entries) = &store.value(config).kind else {
    panic!("expected an object value");
  };
  let names: Vec<_> = entries.keys().cloned().collect();
  assert_eq!(names, ["name", "ports"]);
  let ports = entries.get("ports").unwrap().value;
  let ValueKind::Array(items) = &store.value(ports).kind else {
    panic!("expected an array value");
  };
  assert_eq!(items.len(), 2);
}

#[test]
fn enum_members_carry_their_values() {
  let mut program = compile(vec![enum_(
    "Level",
    vec![
      member_value("low", number("1")),
      member_value("high", number("10")),
      member("unset"),
    ],
  )]);
  assert_clean(&program);
  let level = ty(&mut program, "Level");
  let store = program.store();
  let members = &store.get(level).as_enum().unwrap().members;
  let names: Vec<_> = members.keys().cloned().collect();
  assert_eq!(names, ["low", "high", "unset"]);

  let high = store.get(*members.get("high").unwrap()).as_enum_member().unwrap();
  assert_eq!(high.enum_type, level);
  match &high.value {
    Some(EnumMemberValue::Number(n)) => assert_eq!(n.as_f64(), 10.0),
    other => panic!("unexpected member value {other:?}"),
  }
  let unset = store.get(*members.get("unset").unwrap()).as_enum_member().unwrap();
  assert!(unset.value.is_none());
}

#[test]
fn duplicate_enum_members_are_reported() {
  let program = compile(vec![enum_("E", vec![member("a"), member("a")])]);
  assert_eq!(codes(&program), ["duplicate-member"]);
}

#[test]
fn enum_spreads_copy_members() {
  let mut program = compile(vec![
    enum_("Base", vec![member("a"), member("b")]),
    enum_("More", vec![enum_spread("Base"), member("c")]),
  ]);
  assert_clean(&program);
  let base = ty(&mut program, "Base");
  let more = ty(&mut program, "More");
  let store = program.store();
  let members = &store.get(more).as_enum().unwrap().members;
  let names: Vec<_> = members.keys().cloned().collect();
  assert_eq!(names, ["a", "b", "c"]);
  let a = store.get(*members.get("a").unwrap()).as_enum_member().unwrap();
  assert_eq!(a.enum_type, more);
  let original = *store.get(base).as_enum().unwrap().members.get("a").unwrap();
  assert_eq!(a.source_member, Some(original));
}
