//! Owned syntax builder.
//!
//! [`Syn`] values describe a tree bottom-up; [`TreeBuilder::add_script`]
//! lowers them into the arena. Nodes built here have synthesized ranges
//! unless [`Syn::with_range`] is used.
//!
//! ```
//! use syntax_tsp::build::*;
//! use syntax_tsp::SyntaxTree;
//! use diagnostics::FileId;
//!
//! let mut builder = SyntaxTree::builder();
//! let script = builder.add_script(FileId(0), vec![
//!   model("Pet", vec![prop("name", reference("string"))]),
//! ]);
//! let tree = builder.finish();
//! assert_eq!(tree.scripts(), &[script]);
//! ```

use crate::MemberSelector;
use crate::ModifierFlags;
use crate::Node;
use crate::NodeFlags;
use crate::NodeId;
use crate::NodeKind;
use crate::SyntaxTree;
use diagnostics::FileId;
use diagnostics::TextRange;

#[derive(Clone, Debug)]
pub struct Syn {
  kind: Box<NodeKind<Syn>>,
  range: Option<TextRange>,
  flags: NodeFlags,
  directives: Vec<Syn>,
}

impl From<NodeKind<Syn>> for Syn {
  fn from(kind: NodeKind<Syn>) -> Self {
    Syn {
      kind: Box::new(kind),
      range: None,
      flags: NodeFlags::empty(),
      directives: Vec::new(),
    }
  }
}

impl Syn {
  pub fn kind(&self) -> &NodeKind<Syn> {
    &self.kind
  }

  pub fn with_range(mut self, start: u32, end: u32) -> Self {
    self.range = Some(TextRange::new(start, end));
    self
  }

  /// Marks the node as carrying a parse error.
  pub fn with_error(mut self) -> Self {
    self.flags |= NodeFlags::THIS_NODE_HAS_ERROR;
    self
  }

  pub fn synthetic(mut self) -> Self {
    self.flags |= NodeFlags::SYNTHETIC;
    self
  }

  pub fn directive(mut self, directive: Syn) -> Self {
    self.directives.push(directive);
    self
  }

  pub fn decorate(mut self, decorator: Syn) -> Self {
    use NodeKind::*;
    // Decorators on `namespace A.B` belong to the innermost namespace.
    if let Some(inner) = innermost_namespace(&mut self) {
      if let NamespaceStatement { decorators, .. } = inner.kind.as_mut() {
        decorators.push(decorator);
      }
      return self;
    }
    match self.kind.as_mut() {
      NamespaceStatement { decorators, .. }
      | ModelStatement { decorators, .. }
      | ModelProperty { decorators, .. }
      | ScalarStatement { decorators, .. }
      | InterfaceStatement { decorators, .. }
      | OperationStatement { decorators, .. }
      | UnionStatement { decorators, .. }
      | UnionVariant { decorators, .. }
      | EnumStatement { decorators, .. }
      | EnumMember { decorators, .. }
      | InvalidStatement { decorators } => decorators.push(decorator),
      other => panic!("{} cannot be decorated", other.name()),
    }
    self
  }

  pub fn templated(mut self, params: Vec<Syn>) -> Self {
    use NodeKind::*;
    match self.kind.as_mut() {
      ModelStatement {
        template_parameters,
        ..
      }
      | ScalarStatement {
        template_parameters,
        ..
      }
      | InterfaceStatement {
        template_parameters,
        ..
      }
      | OperationStatement {
        template_parameters,
        ..
      }
      | UnionStatement {
        template_parameters,
        ..
      }
      | AliasStatement {
        template_parameters,
        ..
      } => template_parameters.extend(params),
      other => panic!("{} cannot declare template parameters", other.name()),
    }
    self
  }

  pub fn extends(mut self, base: Syn) -> Self {
    use NodeKind::*;
    match self.kind.as_mut() {
      ModelStatement { extends, .. } | ScalarStatement { extends, .. } => *extends = Some(base),
      InterfaceStatement { extends, .. } => extends.push(base),
      other => panic!("{} cannot extend", other.name()),
    }
    self
  }

  pub fn is(mut self, source: Syn) -> Self {
    match self.kind.as_mut() {
      NodeKind::ModelStatement { is, .. } => *is = Some(source),
      other => panic!("{} has no `is` clause", other.name()),
    }
    self
  }

  /// Default for a model property or template parameter.
  pub fn default_value(mut self, value: Syn) -> Self {
    match self.kind.as_mut() {
      NodeKind::ModelProperty { default, .. }
      | NodeKind::TemplateParameterDeclaration { default, .. } => *default = Some(value),
      other => panic!("{} has no default", other.name()),
    }
    self
  }

  pub fn constraint(mut self, value: Syn) -> Self {
    match self.kind.as_mut() {
      NodeKind::TemplateParameterDeclaration { constraint, .. } => *constraint = Some(value),
      other => panic!("{} has no constraint", other.name()),
    }
    self
  }
}

fn innermost_namespace(syn: &mut Syn) -> Option<&mut Syn> {
  let NodeKind::NamespaceStatement {
    statements,
    blockless,
    ..
  } = syn.kind.as_mut()
  else {
    return None;
  };
  if *blockless || statements.len() != 1 {
    return None;
  }
  let child = &mut statements[0];
  let nested = matches!(child.kind.as_ref(), NodeKind::NamespaceStatement { .. })
    && child.flags.contains(NodeFlags::SYNTHETIC);
  if !nested {
    return None;
  }
  if innermost_namespace(child).is_some() {
    return innermost_namespace(child);
  }
  Some(child)
}

/// Lowers [`Syn`] trees into a [`SyntaxTree`].
#[derive(Default)]
pub struct TreeBuilder {
  nodes: Vec<Node>,
  scripts: Vec<NodeId>,
  cursor: u32,
}

impl TreeBuilder {
  pub fn add_script(&mut self, file: FileId, statements: Vec<Syn>) -> NodeId {
    let script = Syn::from(NodeKind::Script { file, statements });
    let id = self.lower(script, file, None);
    self.scripts.push(id);
    id
  }

  pub fn finish(mut self) -> SyntaxTree {
    // Children always have larger ids than their parents.
    for idx in (0..self.nodes.len()).rev() {
      let node = &self.nodes[idx];
      if node.has_parse_error() {
        if let Some(parent) = node.parent {
          self.nodes[parent.index()].flags |= NodeFlags::DESCENDANT_HAS_ERROR;
        }
      }
    }
    SyntaxTree {
      nodes: self.nodes,
      scripts: self.scripts,
    }
  }

  fn lower(&mut self, syn: Syn, file: FileId, parent: Option<NodeId>) -> NodeId {
    let id = NodeId(self.nodes.len() as u32);
    self.nodes.push(Node {
      kind: NodeKind::EmptyStatement,
      file,
      range: TextRange::default(),
      flags: NodeFlags::empty(),
      parent,
      directives: Vec::new(),
    });
    let start = self.cursor;
    self.cursor += 1;
    let Syn {
      kind,
      range,
      flags,
      directives,
    } = syn;
    let directives = directives
      .into_iter()
      .map(|d| self.lower(d, file, Some(id)))
      .collect();
    let kind = kind.map(&mut |child| self.lower(child, file, Some(id)));
    let end = self.cursor;
    self.cursor += 1;
    let node = &mut self.nodes[id.index()];
    node.kind = kind;
    node.range = range.unwrap_or(TextRange::new(start, end));
    node.flags = flags | NodeFlags::DESCENDANT_ERRORS_EXAMINED;
    node.directives = directives;
    id
  }
}

pub fn ident(name: &str) -> Syn {
  NodeKind::Identifier { sv: name.into() }.into()
}

/// `A.B.c` or `A::c` as an identifier/member-expression chain.
pub fn path(text: &str) -> Syn {
  let mut segments = Vec::new();
  let mut rest = text;
  let mut selector = MemberSelector::Dot;
  loop {
    let next = match (rest.find('.'), rest.find("::")) {
      (Some(d), Some(c)) if c < d => Some((c, MemberSelector::DoubleColon, 2)),
      (Some(d), _) => Some((d, MemberSelector::Dot, 1)),
      (None, Some(c)) => Some((c, MemberSelector::DoubleColon, 2)),
      (None, None) => None,
    };
    let Some((end, next_selector, skip)) = next else {
      segments.push((rest, selector));
      break;
    };
    segments.push((&rest[..end], selector));
    selector = next_selector;
    rest = &rest[end + skip..];
  }
  let mut iter = segments.into_iter();
  let (first, _) = iter.next().unwrap_or(("", MemberSelector::Dot));
  let mut expr = ident(first);
  for (segment, selector) in iter {
    expr = NodeKind::MemberExpression {
      base: expr,
      id: ident(segment),
      selector,
    }
    .into();
  }
  expr
}

pub fn reference(target: &str) -> Syn {
  reference_with(target, Vec::new())
}

pub fn reference_with(target: &str, arguments: Vec<Syn>) -> Syn {
  let arguments = arguments
    .into_iter()
    .map(|arg| match arg.kind.as_ref() {
      NodeKind::TemplateArgument { .. } => arg,
      _ => NodeKind::TemplateArgument {
        name: None,
        argument: arg,
      }
      .into(),
    })
    .collect();
  NodeKind::TypeReference {
    target: path(target),
    arguments,
  }
  .into()
}

pub fn named_arg(name: &str, argument: Syn) -> Syn {
  NodeKind::TemplateArgument {
    name: Some(ident(name)),
    argument,
  }
  .into()
}

pub fn string(value: &str) -> Syn {
  NodeKind::StringLiteral {
    value: value.into(),
  }
  .into()
}

pub fn number(text: &str) -> Syn {
  NodeKind::NumericLiteral {
    value: text.parse().unwrap_or(f64::NAN),
    value_as_string: text.into(),
  }
  .into()
}

pub fn boolean(value: bool) -> Syn {
  NodeKind::BooleanLiteral { value }.into()
}

pub fn void() -> Syn {
  NodeKind::VoidKeyword.into()
}

pub fn never() -> Syn {
  NodeKind::NeverKeyword.into()
}

pub fn unknown() -> Syn {
  NodeKind::UnknownKeyword.into()
}

pub fn null() -> Syn {
  NodeKind::NullKeyword.into()
}

pub fn union_of(options: Vec<Syn>) -> Syn {
  NodeKind::UnionExpression { options }.into()
}

pub fn intersection(options: Vec<Syn>) -> Syn {
  NodeKind::IntersectionExpression { options }.into()
}

pub fn tuple(values: Vec<Syn>) -> Syn {
  NodeKind::TupleExpression { values }.into()
}

pub fn array_of(element_type: Syn) -> Syn {
  NodeKind::ArrayExpression { element_type }.into()
}

pub fn valueof(target: Syn) -> Syn {
  NodeKind::ValueOfExpression { target }.into()
}

pub fn typeof_(target: Syn) -> Syn {
  NodeKind::TypeOfExpression { target }.into()
}

pub fn string_template(head: &str, spans: Vec<(Syn, &str)>) -> Syn {
  NodeKind::StringTemplateExpression {
    head: head.into(),
    spans: spans
      .into_iter()
      .map(|(expression, literal)| {
        NodeKind::StringTemplateSpan {
          expression,
          literal: literal.into(),
        }
        .into()
      })
      .collect(),
  }
  .into()
}

pub fn model(name: &str, properties: Vec<Syn>) -> Syn {
  NodeKind::ModelStatement {
    id: ident(name),
    template_parameters: Vec::new(),
    extends: None,
    is: None,
    properties,
    decorators: Vec::new(),
  }
  .into()
}

pub fn model_expr(properties: Vec<Syn>) -> Syn {
  NodeKind::ModelExpression { properties }.into()
}

pub fn prop(name: &str, value: Syn) -> Syn {
  NodeKind::ModelProperty {
    id: ident(name),
    value,
    optional: false,
    default: None,
    decorators: Vec::new(),
  }
  .into()
}

pub fn optional_prop(name: &str, value: Syn) -> Syn {
  NodeKind::ModelProperty {
    id: ident(name),
    value,
    optional: true,
    default: None,
    decorators: Vec::new(),
  }
  .into()
}

pub fn spread(target: &str) -> Syn {
  spread_of(reference(target))
}

pub fn spread_of(target: Syn) -> Syn {
  NodeKind::ModelSpreadProperty { target }.into()
}

pub fn scalar(name: &str) -> Syn {
  scalar_with(name, Vec::new())
}

pub fn scalar_with(name: &str, members: Vec<Syn>) -> Syn {
  NodeKind::ScalarStatement {
    id: ident(name),
    template_parameters: Vec::new(),
    extends: None,
    members,
    decorators: Vec::new(),
  }
  .into()
}

pub fn scalar_init(name: &str, parameters: Vec<Syn>) -> Syn {
  NodeKind::ScalarConstructor {
    id: ident(name),
    parameters,
  }
  .into()
}

pub fn interface(name: &str, operations: Vec<Syn>) -> Syn {
  NodeKind::InterfaceStatement {
    id: ident(name),
    template_parameters: Vec::new(),
    extends: Vec::new(),
    operations,
    decorators: Vec::new(),
  }
  .into()
}

pub fn op(name: &str, parameters: Vec<Syn>, return_type: Syn) -> Syn {
  NodeKind::OperationStatement {
    id: ident(name),
    template_parameters: Vec::new(),
    signature: NodeKind::OperationSignatureDeclaration {
      parameters: model_expr(parameters),
      return_type,
    }
    .into(),
    decorators: Vec::new(),
  }
  .into()
}

pub fn op_is(name: &str, base_operation: Syn) -> Syn {
  NodeKind::OperationStatement {
    id: ident(name),
    template_parameters: Vec::new(),
    signature: NodeKind::OperationSignatureReference { base_operation }.into(),
    decorators: Vec::new(),
  }
  .into()
}

pub fn union(name: &str, options: Vec<Syn>) -> Syn {
  NodeKind::UnionStatement {
    id: ident(name),
    template_parameters: Vec::new(),
    options,
    decorators: Vec::new(),
  }
  .into()
}

pub fn variant(name: &str, value: Syn) -> Syn {
  NodeKind::UnionVariant {
    id: Some(ident(name)),
    value,
    decorators: Vec::new(),
  }
  .into()
}

pub fn unnamed_variant(value: Syn) -> Syn {
  NodeKind::UnionVariant {
    id: None,
    value,
    decorators: Vec::new(),
  }
  .into()
}

pub fn enum_(name: &str, members: Vec<Syn>) -> Syn {
  NodeKind::EnumStatement {
    id: ident(name),
    members,
    decorators: Vec::new(),
  }
  .into()
}

pub fn member(name: &str) -> Syn {
  NodeKind::EnumMember {
    id: ident(name),
    value: None,
    decorators: Vec::new(),
  }
  .into()
}

pub fn member_value(name: &str, value: Syn) -> Syn {
  NodeKind::EnumMember {
    id: ident(name),
    value: Some(value),
    decorators: Vec::new(),
  }
  .into()
}

pub fn enum_spread(target: &str) -> Syn {
  NodeKind::EnumSpreadMember {
    target: reference(target),
  }
  .into()
}

pub fn alias(name: &str, value: Syn) -> Syn {
  NodeKind::AliasStatement {
    id: ident(name),
    template_parameters: Vec::new(),
    value,
  }
  .into()
}

pub fn const_(name: &str, value: Syn) -> Syn {
  NodeKind::ConstStatement {
    id: ident(name),
    type_annotation: None,
    value,
  }
  .into()
}

pub fn typed_const(name: &str, type_annotation: Syn, value: Syn) -> Syn {
  NodeKind::ConstStatement {
    id: ident(name),
    type_annotation: Some(type_annotation),
    value,
  }
  .into()
}

/// `namespace A.B { ... }`; dotted names nest.
pub fn namespace(name: &str, statements: Vec<Syn>) -> Syn {
  namespace_impl(name, statements, false)
}

/// `namespace A.B;` covering the statements that follow it.
pub fn blockless_namespace(name: &str, statements: Vec<Syn>) -> Syn {
  namespace_impl(name, statements, true)
}

fn namespace_impl(name: &str, statements: Vec<Syn>, blockless: bool) -> Syn {
  let mut parts: Vec<&str> = name.split('.').collect();
  let innermost = parts.pop().unwrap_or(name);
  let mut ns: Syn = NodeKind::NamespaceStatement {
    id: ident(innermost),
    statements,
    decorators: Vec::new(),
    blockless,
  }
  .into();
  while let Some(outer) = parts.pop() {
    ns = ns.synthetic();
    ns = NodeKind::NamespaceStatement {
      id: ident(outer),
      statements: vec![ns],
      decorators: Vec::new(),
      blockless: false,
    }
    .into();
  }
  if name.contains('.') {
    ns = ns.synthetic();
  }
  ns
}

pub fn using(target: &str) -> Syn {
  NodeKind::UsingStatement { name: path(target) }.into()
}

pub fn import(path: &str) -> Syn {
  NodeKind::ImportStatement { path: path.into() }.into()
}

pub fn template_param(name: &str) -> Syn {
  NodeKind::TemplateParameterDeclaration {
    id: ident(name),
    constraint: None,
    default: None,
  }
  .into()
}

pub fn decorator(target: &str, arguments: Vec<Syn>) -> Syn {
  NodeKind::DecoratorExpression {
    target: path(target),
    arguments,
  }
  .into()
}

pub fn augment(target: &str, target_type: Syn, arguments: Vec<Syn>) -> Syn {
  NodeKind::AugmentDecoratorStatement {
    target: path(target),
    target_type,
    arguments,
  }
  .into()
}

pub fn extern_dec(name: &str, target: Syn, parameters: Vec<Syn>) -> Syn {
  NodeKind::DecoratorDeclarationStatement {
    id: ident(name),
    modifiers: ModifierFlags::EXTERN,
    target,
    parameters,
  }
  .into()
}

/// A decorator declaration missing its `extern` modifier.
pub fn bare_dec(name: &str, target: Syn, parameters: Vec<Syn>) -> Syn {
  NodeKind::DecoratorDeclarationStatement {
    id: ident(name),
    modifiers: ModifierFlags::empty(),
    target,
    parameters,
  }
  .into()
}

pub fn fn_param(name: &str, type_annotation: Syn) -> Syn {
  NodeKind::FunctionParameter {
    id: ident(name),
    type_annotation: Some(type_annotation),
    optional: false,
    rest: false,
  }
  .into()
}

pub fn optional_fn_param(name: &str, type_annotation: Syn) -> Syn {
  NodeKind::FunctionParameter {
    id: ident(name),
    type_annotation: Some(type_annotation),
    optional: true,
    rest: false,
  }
  .into()
}

pub fn rest_fn_param(name: &str, type_annotation: Syn) -> Syn {
  NodeKind::FunctionParameter {
    id: ident(name),
    type_annotation: Some(type_annotation),
    optional: false,
    rest: true,
  }
  .into()
}

pub fn directive(name: &str, arguments: Vec<Syn>) -> Syn {
  NodeKind::DirectiveExpression {
    target: ident(name),
    arguments,
  }
  .into()
}

pub fn suppress(code: &str, message: &str) -> Syn {
  directive("suppress", vec![string(code), string(message)])
}

pub fn deprecated(message: &str) -> Syn {
  directive("deprecated", vec![string(message)])
}

pub fn call(target: &str, arguments: Vec<Syn>) -> Syn {
  NodeKind::CallExpression {
    target: path(target),
    arguments,
  }
  .into()
}

pub fn object(properties: Vec<(&str, Syn)>) -> Syn {
  NodeKind::ObjectLiteral {
    properties: properties
      .into_iter()
      .map(|(name, value)| {
        NodeKind::ObjectLiteralProperty {
          id: ident(name),
          value,
        }
        .into()
      })
      .collect(),
  }
  .into()
}

pub fn object_with_spread(spread_target: &str, properties: Vec<(&str, Syn)>) -> Syn {
  let mut obj = object(properties);
  if let NodeKind::ObjectLiteral { properties } = obj.kind.as_mut() {
    properties.insert(
      0,
      NodeKind::ObjectLiteralSpreadProperty {
        target: reference(spread_target),
      }
      .into(),
    );
  }
  obj
}

pub fn array(values: Vec<Syn>) -> Syn {
  NodeKind::ArrayLiteral { values }.into()
}

pub fn empty() -> Syn {
  NodeKind::EmptyStatement.into()
}

pub fn invalid() -> Syn {
  Syn::from(NodeKind::InvalidStatement {
    decorators: Vec::new(),
  })
  .with_error()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lowers_in_pre_order_with_parents() {
    let mut builder = SyntaxTree::builder();
    let script = builder.add_script(FileId(3), vec![model("A", vec![prop("x", reference("string"))])]);
    let tree = builder.finish();
    let NodeKind::Script { statements, file } = tree.kind(script) else {
      panic!("expected script");
    };
    assert_eq!(*file, FileId(3));
    let model_id = statements[0];
    assert!(model_id > script);
    assert_eq!(tree.parent(model_id), Some(script));
    assert_eq!(tree.declaration_name(model_id), Some("A"));
    for child in tree.kind(model_id).children() {
      assert_eq!(tree.parent(child), Some(model_id));
      assert!(child > model_id);
    }
  }

  #[test]
  fn dotted_paths_become_member_chains() {
    let mut builder = SyntaxTree::builder();
    let script = builder.add_script(FileId(0), vec![alias("X", reference("A.B::c"))]);
    let tree = builder.finish();
    let NodeKind::Script { statements, .. } = tree.kind(script) else {
      panic!();
    };
    let NodeKind::AliasStatement { value, .. } = tree.kind(statements[0]) else {
      panic!();
    };
    let NodeKind::TypeReference { target, .. } = tree.kind(*value) else {
      panic!();
    };
    let NodeKind::MemberExpression { base, id, selector } = tree.kind(*target) else {
      panic!();
    };
    assert_eq!(*selector, MemberSelector::DoubleColon);
    assert_eq!(tree.identifier(*id), Some("c"));
    let NodeKind::MemberExpression { selector, .. } = tree.kind(*base) else {
      panic!();
    };
    assert_eq!(*selector, MemberSelector::Dot);
  }

  #[test]
  fn parse_errors_propagate_to_ancestors() {
    let mut builder = SyntaxTree::builder();
    let script = builder.add_script(FileId(0), vec![namespace("N", vec![invalid()])]);
    let tree = builder.finish();
    let node = tree.node(script);
    assert!(node.flags.contains(NodeFlags::DESCENDANT_HAS_ERROR));
    assert!(node.flags.contains(NodeFlags::DESCENDANT_ERRORS_EXAMINED));
    assert!(!node.flags.contains(NodeFlags::THIS_NODE_HAS_ERROR));
  }

  #[test]
  fn dotted_namespace_decorators_land_on_innermost() {
    let ns = namespace("A.B", vec![]).decorate(decorator("doc", vec![string("x")]));
    let NodeKind::NamespaceStatement {
      statements,
      decorators,
      ..
    } = ns.kind()
    else {
      panic!();
    };
    assert!(decorators.is_empty());
    assert_eq!(statements[0].kind().decorators().len(), 1);
  }
}
