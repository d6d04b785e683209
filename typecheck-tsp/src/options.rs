/// Resolution policy when a decorator synthesizes a member whose name is
/// already declared statically on the same container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MemberPrecedence {
  /// The declared member stays; the synthesized one is dropped.
  #[default]
  KeepDeclared,
  /// The synthesized member takes the declared member's position.
  PreferSynthesized,
  /// Report `duplicate-property` and refuse the mutation.
  Report,
}

#[derive(Clone, Debug)]
pub struct CheckerOptions {
  pub late_bound_conflicts: MemberPrecedence,
  /// Honor `#suppress` directives.
  pub suppress_directives: bool,
  /// Nested instantiations beyond this depth report `instantiation-depth`.
  pub max_instantiation_depth: usize,
  pub warnings_as_errors: bool,
}

impl Default for CheckerOptions {
  fn default() -> Self {
    CheckerOptions {
      late_bound_conflicts: MemberPrecedence::default(),
      suppress_directives: true,
      max_instantiation_depth: 256,
      warnings_as_errors: false,
    }
  }
}
