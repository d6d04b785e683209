//! The `TypeSpec` prelude: intrinsic scalars, `Array`/`Record`, the
//! reflection models used as decorator targets, and native decorators.

use crate::decorators::DecoratorArgument;
use crate::decorators::DecoratorContext;
use crate::decorators::DecoratorRegistry;
use crate::error::DecoratorError;
use crate::error::MutationError;
use crate::ids::TypeId;
use diagnostics::FileId;
use syntax_tsp::build::*;

/// File of the prelude script.
pub const STDLIB_FILE: FileId = FileId(u32::MAX);

/// State key written by `@doc`.
pub const DOC_KEY: &str = "TypeSpec.doc";

const REFLECTION_KINDS: &[&str] = &[
  "Enum",
  "EnumMember",
  "Interface",
  "Model",
  "ModelProperty",
  "Namespace",
  "Operation",
  "Scalar",
  "Union",
  "UnionVariant",
];

fn scalar_extending(name: &str, base: &str) -> Syn {
  scalar(name).extends(reference(base))
}

fn iso_scalar(name: &str, extra: Vec<Syn>) -> Syn {
  let mut members = vec![scalar_init("fromISO", vec![fn_param("value", reference("string"))])];
  members.extend(extra);
  scalar_with(name, members)
}

pub fn prelude() -> Vec<Syn> {
  let mut statements = vec![
    scalar("bytes"),
    scalar("numeric"),
    scalar_extending("integer", "numeric"),
    scalar_extending("float", "numeric"),
    scalar_extending("int64", "integer"),
    scalar_extending("int32", "int64"),
    scalar_extending("int16", "int32"),
    scalar_extending("int8", "int16"),
    scalar_extending("uint64", "integer"),
    scalar_extending("uint32", "uint64"),
    scalar_extending("uint16", "uint32"),
    scalar_extending("uint8", "uint16"),
    scalar_extending("safeint", "int64"),
    scalar_extending("float64", "float"),
    scalar_extending("float32", "float64"),
    scalar_extending("decimal", "numeric"),
    scalar_extending("decimal128", "decimal"),
    scalar("string"),
    scalar("boolean"),
    scalar_extending("url", "string"),
    iso_scalar("plainDate", Vec::new()),
    iso_scalar("plainTime", Vec::new()),
    iso_scalar(
      "utcDateTime",
      vec![scalar_init(
        "fromUnixTimestamp",
        vec![fn_param("value", reference("int64"))],
      )],
    ),
    iso_scalar("offsetDateTime", Vec::new()),
    iso_scalar("duration", Vec::new()),
    model("Array", Vec::new())
      .templated(vec![template_param("Element")])
      .decorate(decorator("indexer", vec![reference("integer"), reference("Element")])),
    model("Record", Vec::new())
      .templated(vec![template_param("Element")])
      .decorate(decorator("indexer", vec![reference("string"), reference("Element")])),
    extern_dec(
      "indexer",
      fn_param("target", reference("Reflection.Model")),
      vec![
        fn_param("key", reference("Reflection.Scalar")),
        fn_param("value", unknown()),
      ],
    ),
    extern_dec(
      "doc",
      fn_param("target", unknown()),
      vec![fn_param("doc", valueof(reference("string")))],
    ),
  ];
  let reflection = REFLECTION_KINDS
    .iter()
    .map(|&kind| model(kind, Vec::new()))
    .collect();
  statements.push(namespace("Reflection", reflection));
  vec![namespace("TypeSpec", statements)]
}

/// Native implementations of the prelude's `extern dec` declarations.
pub fn registry() -> DecoratorRegistry {
  let mut registry = DecoratorRegistry::new();
  registry.register_fn("TypeSpec", "indexer", indexer);
  registry.register_fn("TypeSpec", "doc", doc);
  registry
}

fn type_arg(args: &[DecoratorArgument], index: usize) -> Result<TypeId, DecoratorError> {
  args
    .get(index)
    .and_then(|arg| arg.value.as_type())
    .ok_or_else(|| DecoratorError::failed(format!("argument {index} must be a type")))
}

fn indexer(ctx: &mut DecoratorContext<'_>, target: TypeId, args: &[DecoratorArgument]) -> Result<(), DecoratorError> {
  let key = type_arg(args, 0)?;
  let value = type_arg(args, 1)?;
  match ctx.set_indexer(target, key, value) {
    // Reported as `conflicting-indexer` already.
    Err(MutationError::Conflict { .. }) => Ok(()),
    result => result.map_err(DecoratorError::from),
  }
}

fn doc(ctx: &mut DecoratorContext<'_>, target: TypeId, args: &[DecoratorArgument]) -> Result<(), DecoratorError> {
  let text = args
    .first()
    .map(|arg| arg.marshalled.clone())
    .ok_or_else(|| DecoratorError::failed("@doc expects a string"))?;
  ctx.set_state(DOC_KEY, target, text);
  Ok(())
}
