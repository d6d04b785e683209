use bitflags::bitflags;
use diagnostics::FileId;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MemberSelector {
  /// `A.b`
  Dot,
  /// `A::b`, meta-member access.
  DoubleColon,
}

bitflags! {
  #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
  pub struct ModifierFlags: u8 {
    const EXTERN = 1 << 0;
  }
}

/// Every syntax construct the checker understands.
///
/// `N` is the child representation: [`NodeId`](crate::NodeId) once lowered
/// into a [`SyntaxTree`](crate::SyntaxTree), or an owned builder node before.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind<N> {
  Script {
    file: FileId,
    statements: Vec<N>,
  },
  Identifier {
    sv: String,
  },
  MemberExpression {
    base: N,
    id: N,
    selector: MemberSelector,
  },
  NamespaceStatement {
    id: N,
    statements: Vec<N>,
    decorators: Vec<N>,
    blockless: bool,
  },
  UsingStatement {
    name: N,
  },
  ImportStatement {
    path: String,
  },
  ModelStatement {
    id: N,
    template_parameters: Vec<N>,
    extends: Option<N>,
    is: Option<N>,
    properties: Vec<N>,
    decorators: Vec<N>,
  },
  ModelExpression {
    properties: Vec<N>,
  },
  ModelProperty {
    id: N,
    value: N,
    optional: bool,
    default: Option<N>,
    decorators: Vec<N>,
  },
  ModelSpreadProperty {
    target: N,
  },
  ScalarStatement {
    id: N,
    template_parameters: Vec<N>,
    extends: Option<N>,
    members: Vec<N>,
    decorators: Vec<N>,
  },
  ScalarConstructor {
    id: N,
    parameters: Vec<N>,
  },
  InterfaceStatement {
    id: N,
    template_parameters: Vec<N>,
    extends: Vec<N>,
    operations: Vec<N>,
    decorators: Vec<N>,
  },
  OperationStatement {
    id: N,
    template_parameters: Vec<N>,
    signature: N,
    decorators: Vec<N>,
  },
  OperationSignatureDeclaration {
    parameters: N,
    return_type: N,
  },
  OperationSignatureReference {
    base_operation: N,
  },
  UnionStatement {
    id: N,
    template_parameters: Vec<N>,
    options: Vec<N>,
    decorators: Vec<N>,
  },
  UnionVariant {
    id: Option<N>,
    value: N,
    decorators: Vec<N>,
  },
  EnumStatement {
    id: N,
    members: Vec<N>,
    decorators: Vec<N>,
  },
  EnumMember {
    id: N,
    value: Option<N>,
    decorators: Vec<N>,
  },
  EnumSpreadMember {
    target: N,
  },
  AliasStatement {
    id: N,
    template_parameters: Vec<N>,
    value: N,
  },
  ConstStatement {
    id: N,
    type_annotation: Option<N>,
    value: N,
  },
  DecoratorDeclarationStatement {
    id: N,
    modifiers: ModifierFlags,
    target: N,
    parameters: Vec<N>,
  },
  FunctionParameter {
    id: N,
    type_annotation: Option<N>,
    optional: bool,
    rest: bool,
  },
  AugmentDecoratorStatement {
    target: N,
    target_type: N,
    arguments: Vec<N>,
  },
  DecoratorExpression {
    target: N,
    arguments: Vec<N>,
  },
  DirectiveExpression {
    target: N,
    arguments: Vec<N>,
  },
  CallExpression {
    target: N,
    arguments: Vec<N>,
  },
  UnionExpression {
    options: Vec<N>,
  },
  IntersectionExpression {
    options: Vec<N>,
  },
  TupleExpression {
    values: Vec<N>,
  },
  ArrayExpression {
    element_type: N,
  },
  StringLiteral {
    value: String,
  },
  NumericLiteral {
    value: f64,
    value_as_string: String,
  },
  BooleanLiteral {
    value: bool,
  },
  StringTemplateExpression {
    head: String,
    spans: Vec<N>,
  },
  StringTemplateSpan {
    expression: N,
    literal: String,
  },
  VoidKeyword,
  NeverKeyword,
  UnknownKeyword,
  NullKeyword,
  ValueOfExpression {
    target: N,
  },
  TypeOfExpression {
    target: N,
  },
  TypeReference {
    target: N,
    arguments: Vec<N>,
  },
  TemplateArgument {
    name: Option<N>,
    argument: N,
  },
  TemplateParameterDeclaration {
    id: N,
    constraint: Option<N>,
    default: Option<N>,
  },
  ObjectLiteral {
    properties: Vec<N>,
  },
  ObjectLiteralProperty {
    id: N,
    value: N,
  },
  ObjectLiteralSpreadProperty {
    target: N,
  },
  ArrayLiteral {
    values: Vec<N>,
  },
  EmptyStatement,
  InvalidStatement {
    decorators: Vec<N>,
  },
}

fn map_vec<A, B>(items: Vec<A>, f: &mut impl FnMut(A) -> B) -> Vec<B> {
  items.into_iter().map(|item| f(item)).collect()
}

fn map_opt<A, B>(item: Option<A>, f: &mut impl FnMut(A) -> B) -> Option<B> {
  item.map(|item| f(item))
}

impl<N> NodeKind<N> {
  /// Converts every child with `f`, visiting children in source order.
  pub fn map<M>(self, f: &mut impl FnMut(N) -> M) -> NodeKind<M> {
    use NodeKind::*;
    match self {
      Script { file, statements } => Script {
        file,
        statements: map_vec(statements, f),
      },
      Identifier { sv } => Identifier { sv },
      MemberExpression { base, id, selector } => {
        let base = f(base);
        MemberExpression {
          base,
          id: f(id),
          selector,
        }
      }
      NamespaceStatement {
        id,
        statements,
        decorators,
        blockless,
      } => {
        let decorators = map_vec(decorators, f);
        let id = f(id);
        NamespaceStatement {
          id,
          statements: map_vec(statements, f),
          decorators,
          blockless,
        }
      }
      UsingStatement { name } => UsingStatement { name: f(name) },
      ImportStatement { path } => ImportStatement { path },
      ModelStatement {
        id,
        template_parameters,
        extends,
        is,
        properties,
        decorators,
      } => {
        let decorators = map_vec(decorators, f);
        let id = f(id);
        let template_parameters = map_vec(template_parameters, f);
        let extends = map_opt(extends, f);
        let is = map_opt(is, f);
        ModelStatement {
          id,
          template_parameters,
          extends,
          is,
          properties: map_vec(properties, f),
          decorators,
        }
      }
      ModelExpression { properties } => ModelExpression {
        properties: map_vec(properties, f),
      },
      ModelProperty {
        id,
        value,
        optional,
        default,
        decorators,
      } => {
        let decorators = map_vec(decorators, f);
        let id = f(id);
        let value = f(value);
        ModelProperty {
          id,
          value,
          optional,
          default: map_opt(default, f),
          decorators,
        }
      }
      ModelSpreadProperty { target } => ModelSpreadProperty { target: f(target) },
      ScalarStatement {
        id,
        template_parameters,
        extends,
        members,
        decorators,
      } => {
        let decorators = map_vec(decorators, f);
        let id = f(id);
        let template_parameters = map_vec(template_parameters, f);
        let extends = map_opt(extends, f);
        ScalarStatement {
          id,
          template_parameters,
          extends,
          members: map_vec(members, f),
          decorators,
        }
      }
      ScalarConstructor { id, parameters } => {
        let id = f(id);
        ScalarConstructor {
          id,
          parameters: map_vec(parameters, f),
        }
      }
      InterfaceStatement {
        id,
        template_parameters,
        extends,
        operations,
        decorators,
      } => {
        let decorators = map_vec(decorators, f);
        let id = f(id);
        let template_parameters = map_vec(template_parameters, f);
        let extends = map_vec(extends, f);
        InterfaceStatement {
          id,
          template_parameters,
          extends,
          operations: map_vec(operations, f),
          decorators,
        }
      }
      OperationStatement {
        id,
        template_parameters,
        signature,
        decorators,
      } => {
        let decorators = map_vec(decorators, f);
        let id = f(id);
        let template_parameters = map_vec(template_parameters, f);
        OperationStatement {
          id,
          template_parameters,
          signature: f(signature),
          decorators,
        }
      }
      OperationSignatureDeclaration {
        parameters,
        return_type,
      } => {
        let parameters = f(parameters);
        OperationSignatureDeclaration {
          parameters,
          return_type: f(return_type),
        }
      }
      OperationSignatureReference { base_operation } => OperationSignatureReference {
        base_operation: f(base_operation),
      },
      UnionStatement {
        id,
        template_parameters,
        options,
        decorators,
      } => {
        let decorators = map_vec(decorators, f);
        let id = f(id);
        let template_parameters = map_vec(template_parameters, f);
        UnionStatement {
          id,
          template_parameters,
          options: map_vec(options, f),
          decorators,
        }
      }
      UnionVariant {
        id,
        value,
        decorators,
      } => {
        let decorators = map_vec(decorators, f);
        let id = map_opt(id, f);
        UnionVariant {
          id,
          value: f(value),
          decorators,
        }
      }
      EnumStatement {
        id,
        members,
        decorators,
      } => {
        let decorators = map_vec(decorators, f);
        let id = f(id);
        EnumStatement {
          id,
          members: map_vec(members, f),
          decorators,
        }
      }
      EnumMember {
        id,
        value,
        decorators,
      } => {
        let decorators = map_vec(decorators, f);
        let id = f(id);
        EnumMember {
          id,
          value: map_opt(value, f),
          decorators,
        }
      }
      EnumSpreadMember { target } => EnumSpreadMember { target: f(target) },
      AliasStatement {
        id,
        template_parameters,
        value,
      } => {
        let id = f(id);
        let template_parameters = map_vec(template_parameters, f);
        AliasStatement {
          id,
          template_parameters,
          value: f(value),
        }
      }
      ConstStatement {
        id,
        type_annotation,
        value,
      } => {
        let id = f(id);
        let type_annotation = map_opt(type_annotation, f);
        ConstStatement {
          id,
          type_annotation,
          value: f(value),
        }
      }
      DecoratorDeclarationStatement {
        id,
        modifiers,
        target,
        parameters,
      } => {
        let id = f(id);
        let target = f(target);
        DecoratorDeclarationStatement {
          id,
          modifiers,
          target,
          parameters: map_vec(parameters, f),
        }
      }
      FunctionParameter {
        id,
        type_annotation,
        optional,
        rest,
      } => {
        let id = f(id);
        FunctionParameter {
          id,
          type_annotation: map_opt(type_annotation, f),
          optional,
          rest,
        }
      }
      AugmentDecoratorStatement {
        target,
        target_type,
        arguments,
      } => {
        let target = f(target);
        let target_type = f(target_type);
        AugmentDecoratorStatement {
          target,
          target_type,
          arguments: map_vec(arguments, f),
        }
      }
      DecoratorExpression { target, arguments } => {
        let target = f(target);
        DecoratorExpression {
          target,
          arguments: map_vec(arguments, f),
        }
      }
      DirectiveExpression { target, arguments } => {
        let target = f(target);
        DirectiveExpression {
          target,
          arguments: map_vec(arguments, f),
        }
      }
      CallExpression { target, arguments } => {
        let target = f(target);
        CallExpression {
          target,
          arguments: map_vec(arguments, f),
        }
      }
      UnionExpression { options } => UnionExpression {
        options: map_vec(options, f),
      },
      IntersectionExpression { options } => IntersectionExpression {
        options: map_vec(options, f),
      },
      TupleExpression { values } => TupleExpression {
        values: map_vec(values, f),
      },
      ArrayExpression { element_type } => ArrayExpression {
        element_type: f(element_type),
      },
      StringLiteral { value } => StringLiteral { value },
      NumericLiteral {
        value,
        value_as_string,
      } => NumericLiteral {
        value,
        value_as_string,
      },
      BooleanLiteral { value } => BooleanLiteral { value },
      StringTemplateExpression { head, spans } => StringTemplateExpression {
        head,
        spans: map_vec(spans, f),
      },
      StringTemplateSpan {
        expression,
        literal,
      } => StringTemplateSpan {
        expression: f(expression),
        literal,
      },
      VoidKeyword => VoidKeyword,
      NeverKeyword => NeverKeyword,
      UnknownKeyword => UnknownKeyword,
      NullKeyword => NullKeyword,
      ValueOfExpression { target } => ValueOfExpression { target: f(target) },
      TypeOfExpression { target } => TypeOfExpression { target: f(target) },
      TypeReference { target, arguments } => {
        let target = f(target);
        TypeReference {
          target,
          arguments: map_vec(arguments, f),
        }
      }
      TemplateArgument { name, argument } => {
        let name = map_opt(name, f);
        TemplateArgument {
          name,
          argument: f(argument),
        }
      }
      TemplateParameterDeclaration {
        id,
        constraint,
        default,
      } => {
        let id = f(id);
        let constraint = map_opt(constraint, f);
        TemplateParameterDeclaration {
          id,
          constraint,
          default: map_opt(default, f),
        }
      }
      ObjectLiteral { properties } => ObjectLiteral {
        properties: map_vec(properties, f),
      },
      ObjectLiteralProperty { id, value } => {
        let id = f(id);
        ObjectLiteralProperty { id, value: f(value) }
      }
      ObjectLiteralSpreadProperty { target } => ObjectLiteralSpreadProperty { target: f(target) },
      ArrayLiteral { values } => ArrayLiteral {
        values: map_vec(values, f),
      },
      EmptyStatement => EmptyStatement,
      InvalidStatement { decorators } => InvalidStatement {
        decorators: map_vec(decorators, f),
      },
    }
  }

  pub fn name(&self) -> &'static str {
    use NodeKind::*;
    match self {
      Script { .. } => "Script",
      Identifier { .. } => "Identifier",
      MemberExpression { .. } => "MemberExpression",
      NamespaceStatement { .. } => "NamespaceStatement",
      UsingStatement { .. } => "UsingStatement",
      ImportStatement { .. } => "ImportStatement",
      ModelStatement { .. } => "ModelStatement",
      ModelExpression { .. } => "ModelExpression",
      ModelProperty { .. } => "ModelProperty",
      ModelSpreadProperty { .. } => "ModelSpreadProperty",
      ScalarStatement { .. } => "ScalarStatement",
      ScalarConstructor { .. } => "ScalarConstructor",
      InterfaceStatement { .. } => "InterfaceStatement",
      OperationStatement { .. } => "OperationStatement",
      OperationSignatureDeclaration { .. } => "OperationSignatureDeclaration",
      OperationSignatureReference { .. } => "OperationSignatureReference",
      UnionStatement { .. } => "UnionStatement",
      UnionVariant { .. } => "UnionVariant",
      EnumStatement { .. } => "EnumStatement",
      EnumMember { .. } => "EnumMember",
      EnumSpreadMember { .. } => "EnumSpreadMember",
      AliasStatement { .. } => "AliasStatement",
      ConstStatement { .. } => "ConstStatement",
      DecoratorDeclarationStatement { .. } => "DecoratorDeclarationStatement",
      FunctionParameter { .. } => "FunctionParameter",
      AugmentDecoratorStatement { .. } => "AugmentDecoratorStatement",
      DecoratorExpression { .. } => "DecoratorExpression",
      DirectiveExpression { .. } => "DirectiveExpression",
      CallExpression { .. } => "CallExpression",
      UnionExpression { .. } => "UnionExpression",
      IntersectionExpression { .. } => "IntersectionExpression",
      TupleExpression { .. } => "TupleExpression",
      ArrayExpression { .. } => "ArrayExpression",
      StringLiteral { .. } => "StringLiteral",
      NumericLiteral { .. } => "NumericLiteral",
      BooleanLiteral { .. } => "BooleanLiteral",
      StringTemplateExpression { .. } => "StringTemplateExpression",
      StringTemplateSpan { .. } => "StringTemplateSpan",
      VoidKeyword => "VoidKeyword",
      NeverKeyword => "NeverKeyword",
      UnknownKeyword => "UnknownKeyword",
      NullKeyword => "NullKeyword",
      ValueOfExpression { .. } => "ValueOfExpression",
      TypeOfExpression { .. } => "TypeOfExpression",
      TypeReference { .. } => "TypeReference",
      TemplateArgument { .. } => "TemplateArgument",
      TemplateParameterDeclaration { .. } => "TemplateParameterDeclaration",
      ObjectLiteral { .. } => "ObjectLiteral",
      ObjectLiteralProperty { .. } => "ObjectLiteralProperty",
      ObjectLiteralSpreadProperty { .. } => "ObjectLiteralSpreadProperty",
      ArrayLiteral { .. } => "ArrayLiteral",
      EmptyStatement => "EmptyStatement",
      InvalidStatement { .. } => "InvalidStatement",
    }
  }

  /// Template parameter declarations of a template-bearing declaration.
  pub fn template_parameters(&self) -> &[N] {
    use NodeKind::*;
    match self {
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
      } => template_parameters,
      _ => &[],
    }
  }

  pub fn decorators(&self) -> &[N] {
    use NodeKind::*;
    match self {
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
      | InvalidStatement { decorators } => decorators,
      _ => &[],
    }
  }

  /// Identifier naming a declaration.
  pub fn declaration_id(&self) -> Option<&N> {
    use NodeKind::*;
    match self {
      NamespaceStatement { id, .. }
      | ModelStatement { id, .. }
      | ModelProperty { id, .. }
      | ScalarStatement { id, .. }
      | ScalarConstructor { id, .. }
      | InterfaceStatement { id, .. }
      | OperationStatement { id, .. }
      | UnionStatement { id, .. }
      | EnumStatement { id, .. }
      | EnumMember { id, .. }
      | AliasStatement { id, .. }
      | ConstStatement { id, .. }
      | DecoratorDeclarationStatement { id, .. }
      | FunctionParameter { id, .. }
      | TemplateParameterDeclaration { id, .. } => Some(id),
      UnionVariant { id, .. } => id.as_ref(),
      _ => None,
    }
  }
}

impl<N: Copy> NodeKind<N> {
  /// Direct children in source order.
  pub fn children(&self) -> Vec<N> {
    let mut out = Vec::new();
    self.clone().map(&mut |child| {
      out.push(child);
    });
    out
  }
}
