//! The abstract syntax of the schema language.
//!
//! Every node family is a closed, exhaustively-matched enum. The serde
//! representation doubles as the JSON document form of a parsed schema, so a
//! repository can be stored and exchanged as plain JSON.

use serde::{Deserialize, Serialize};

/// A type expression, the right-hand side of a type definition.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub enum TypeExpr {
  /// The value must not be present at this position.
  Absent,

  /// The value must equal the given scalar literal.
  Literal(Literal),

  /// A reference to a named type, with inline constraints.
  #[serde(rename_all = "camelCase")]
  Named {
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    constraints: Vec<Constraint>,
  },

  /// A reference to a named type that also accepts JSON null.
  NullableNamed(String),

  /// An arbitrary inner expression that also accepts JSON null.
  Nullable(Box<TypeExpr>),

  /// A JSON list whose every item matches `item`. Constraints on the list
  /// itself resolve against the `Array` target type.
  #[serde(rename_all = "camelCase")]
  Array {
    item: Box<TypeExpr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    constraints: Vec<Constraint>,
  },

  /// A JSON object with a closed set of fields.
  #[serde(rename_all = "camelCase")]
  Record { fields: Vec<Field> },

  /// A JSON object with homogeneous keys and values.
  #[serde(rename_all = "camelCase")]
  Dict {
    key: Box<TypeExpr>,
    value: Box<TypeExpr>,
  },

  /// The value must match at least one branch.
  Union(Vec<TypeExpr>),

  /// The value must match every branch.
  Intersection(Vec<TypeExpr>),

  /// A branch chosen by a predicate over the enclosing scope.
  #[serde(rename_all = "camelCase")]
  Conditional {
    condition: Expr,
    then: Box<TypeExpr>,
    #[serde(rename = "else")]
    otherwise: Box<TypeExpr>,
  },
}

/// One field of a record type.
///
/// A field default is never materialized into the value under validation; its
/// presence merely excuses the field's absence.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Field {
  pub name: String,

  #[serde(rename = "type")]
  pub ty: TypeExpr,

  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub optional: bool,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default: Option<Expr>,
}

/// A named check attached to a type, resolved against a validator in the
/// repository under `(target type, name)`.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
  pub name: String,

  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub negated: bool,

  #[serde(default, skip_serializing_if = "ConstraintArgs::is_none")]
  pub args: ConstraintArgs,
}

/// The argument shapes a constraint can carry.
///
/// `Call` is the call syntax `name(arg, key: arg)`; `Single` and `List` are
/// the legacy one-argument forms.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub enum ConstraintArgs {
  None,
  Call(Vec<CallArg>),
  Single(Expr),
  List(Vec<Expr>),
}

impl ConstraintArgs {
  pub fn is_none(&self) -> bool {
    matches!(self, ConstraintArgs::None)
  }
}

impl Default for ConstraintArgs {
  fn default() -> Self {
    ConstraintArgs::None
  }
}

/// One argument in constraint call syntax; `name` is present for named
/// arguments and absent for positional ones.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CallArg {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,

  pub value: Expr,
}

/// An expression, as used in constraint arguments, parameter defaults, and
/// validator bodies.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub enum Expr {
  Literal(Literal),

  EmptyArray,

  Path(PathExpr),

  #[serde(rename_all = "camelCase")]
  Unary { op: UnaryOp, operand: Box<Expr> },

  #[serde(rename_all = "camelCase")]
  Binary {
    op: BinaryOp,
    left: Box<Expr>,
    right: Box<Expr>,
  },

  #[serde(rename_all = "camelCase")]
  Call { name: String, args: Vec<Expr> },

  #[serde(rename_all = "camelCase")]
  Compare {
    op: CompareOp,
    left: Box<Expr>,
    right: Box<Expr>,
  },

  Not(Box<Expr>),

  And(Box<Expr>, Box<Expr>),

  Or(Box<Expr>, Box<Expr>),

  #[serde(rename_all = "camelCase")]
  Matches { expr: Box<Expr>, pattern: String },
}

/// A scalar literal. Durations carry their value as integer milliseconds.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub enum Literal {
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(String),
  Duration(i64),
}

/// A path expression: a root, an optional root name, and field segments.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PathExpr {
  pub root: PathRoot,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub segments: Vec<String>,
}

/// Where a path starts resolving.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum PathRoot {
  This,
  Parent,
  Root,
  Identifier,
  Variable,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum UnaryOp {
  Plus,
  Minus,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum CompareOp {
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
}

/// A user-defined validator: the executable definition behind a constraint.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserValidator {
  /// The type the validator attaches to; constraints on that type resolve
  /// here by `name`.
  pub target: String,

  pub name: String,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub params: Vec<Param>,

  pub body: ValidatorBody,
}

/// One declared parameter of a user-defined validator.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Param {
  pub name: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub type_hint: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default: Option<Expr>,
}

/// The body of a user-defined validator.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub enum ValidatorBody {
  /// The value must be a string matching (or, when negated, not matching)
  /// the pattern.
  #[serde(rename_all = "camelCase")]
  Regex {
    pattern: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    negated: bool,
  },

  /// A predicate over the validator scope.
  Predicate(Expr),

  /// A rule bundled with a custom human-readable failure message.
  #[serde(rename_all = "camelCase")]
  Detailed {
    rule: ValidatorRule,
    message: String,
  },
}

/// The rule inside a [`ValidatorBody::Detailed`] body.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub enum ValidatorRule {
  #[serde(rename_all = "camelCase")]
  Regex {
    pattern: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    negated: bool,
  },

  Predicate(Expr),
}
