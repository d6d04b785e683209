mod common;

use common::assert_clean;
use common::compile_files;
use common::ty;
use proptest::prelude::*;
use syntax_tsp::build::*;

const NAMES: &[&str] = &["Order", "Invoice", "Customer", "Address", "Receipt", "Refund"];

fn noisy_sources() -> Vec<Vec<Syn>> {
  vec![
    vec![
      namespace("A", vec![model("Shared", Vec::new())]),
      namespace("B", vec![model("Shared", Vec::new())]),
      model("Dup", Vec::new()),
    ],
    vec![
      model("Dup", Vec::new()),
      namespace(
        "C",
        vec![
          using("A"),
          using("B"),
          model(
            "Uses",
            vec![
              prop("s", reference("Shared")),
              prop("m", reference("Missing")),
              prop("b", reference_with("Array", Vec::new())),
            ],
          ),
        ],
      ),
    ],
  ]
}

#[test]
fn diagnostics_serialize_identically_across_runs() {
  let first = compile_files(noisy_sources());
  let second = compile_files(noisy_sources());
  assert!(first.has_errors());
  let first = serde_json::to_string(&first.to_records()).unwrap();
  let second = serde_json::to_string(&second.to_records()).unwrap();
  assert_eq!(first, second);
}

#[test]
fn records_keep_report_order() {
  let program = compile_files(noisy_sources());
  let records = program.to_records();
  let codes: Vec<_> = program.diagnostics().iter().map(|d| d.code.to_string()).collect();
  let record_codes: Vec<_> = records.iter().map(|r| r.code.clone()).collect();
  assert_eq!(codes, record_codes);
  assert!(records.iter().all(|r| r.span.is_some()));
}

fn split_names() -> impl Strategy<Value = (Vec<&'static str>, usize)> {
  prop::sample::subsequence(NAMES.to_vec(), 1..=NAMES.len())
    .prop_shuffle()
    .prop_flat_map(|names| {
      let len = names.len();
      (Just(names), 0..=len)
    })
}

proptest! {
  #[test]
  fn namespace_members_follow_file_order((names, split) in split_names()) {
    let (head, tail) = names.split_at(split);
    let file = |names: &[&str]| {
      vec![namespace(
        "Shop.Api",
        names.iter().map(|name| model(name, Vec::new())).collect(),
      )]
    };
    let mut program = compile_files(vec![file(head), file(tail)]);
    assert_clean(&program);
    let api = ty(&mut program, "Shop.Api");
    let models: Vec<String> = program
      .store()
      .get(api)
      .as_namespace()
      .unwrap()
      .models
      .keys()
      .cloned()
      .collect();
    prop_assert_eq!(models, names.iter().map(|name| name.to_string()).collect::<Vec<_>>());
  }
}
