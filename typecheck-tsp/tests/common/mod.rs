#![allow(dead_code)]

use diagnostics::FileId;
use syntax_tsp::build::Syn;
use typecheck_tsp::CheckerOptions;
use typecheck_tsp::Program;
use typecheck_tsp::ProgramBuilder;
use typecheck_tsp::TypeId;

pub fn compile(statements: Vec<Syn>) -> Program {
  compile_with(statements, CheckerOptions::default())
}

pub fn compile_with(statements: Vec<Syn>, options: CheckerOptions) -> Program {
  let mut builder = ProgramBuilder::new();
  builder.add_source(FileId(0), statements);
  builder.compile(options).expect("compile")
}

pub fn compile_files(files: Vec<Vec<Syn>>) -> Program {
  let mut builder = ProgramBuilder::new();
  for (index, statements) in files.into_iter().enumerate() {
    builder.add_source(FileId(index as u32), statements);
  }
  builder.compile(CheckerOptions::default()).expect("compile")
}

pub fn codes(program: &Program) -> Vec<String> {
  program
    .diagnostics()
    .iter()
    .map(|d| d.code.to_string())
    .collect()
}

pub fn assert_clean(program: &Program) {
  let diagnostics: Vec<_> = program
    .diagnostics()
    .iter()
    .map(|d| format!("{}: {}", d.code, d.message))
    .collect();
  assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:#?}");
}

pub fn ty(program: &mut Program, path: &str) -> TypeId {
  program
    .resolve_type_path(path)
    .unwrap_or_else(|| panic!("no type at {path}"))
}

/// Property names of a model, in declaration order.
pub fn property_names(program: &Program, model: TypeId) -> Vec<String> {
  program
    .store()
    .get(model)
    .as_model()
    .expect("model")
    .properties
    .keys()
    .cloned()
    .collect()
}

/// Type of the named property of a model.
pub fn property_type(program: &Program, model: TypeId, name: &str) -> TypeId {
  let store = program.store();
  let prop = *store
    .get(model)
    .as_model()
    .expect("model")
    .properties
    .get(name)
    .unwrap_or_else(|| panic!("no property {name}"));
  store.get(prop).as_property().expect("property").ty
}
