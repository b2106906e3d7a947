//! Validate input data against a schema repository.
//!
//! This module contains logic related to *validation*, the process of taking
//! a piece of input data (called an "instance") and checking if it's valid
//! according to the types and validators held in a
//! [`Repository`](../repository/struct.Repository.html).
//!
//! See the docs for [`Validator`](struct.Validator.html) for more.

use crate::repository::Repository;
use crate::vm;
use serde_json::Value;
use std::fmt;

/// Validates instances against a repository of types.
#[derive(Debug, Default, Eq, PartialEq, Clone, Hash)]
pub struct Validator {
    config: Config,
}

impl Validator {
    /// Constructs a new validator using the default configuration.
    pub fn new() -> Self {
        Self::new_with_config(Config::default())
    }

    /// Constructs a new validator using a configuration.
    pub fn new_with_config(config: Config) -> Self {
        Self { config }
    }

    /// Validate an instance against the repository's `root_type` (or the
    /// inferred root type, when `None` is given).
    ///
    /// Despite having "Error" in their name, the returned values are not
    /// Rust errors. A list of validation errors is the _successful_ result
    /// of running `validate`; an empty list means the instance is valid.
    /// This method never panics and never raises: every failure mode,
    /// including an unresolvable root type, is reported as an element of the
    /// returned list.
    pub fn validate(
        &self,
        repository: &Repository,
        instance: &Value,
        root_type: Option<&str>,
    ) -> Vec<ValidationError> {
        vm::validate(self.config.max_depth, repository, instance, root_type)
    }

    /// Decode `input` as JSON, then validate it.
    ///
    /// The input is decoded exactly once. A decode failure produces a single
    /// error at path `$` with code `InvalidExpression` and category
    /// `ParseError`.
    pub fn validate_str(
        &self,
        repository: &Repository,
        input: &str,
        root_type: Option<&str>,
    ) -> Vec<ValidationError> {
        match serde_json::from_str::<Value>(input) {
            Ok(instance) => self.validate(repository, &instance, root_type),
            Err(err) => vec![ValidationError::new(
                "$",
                format!("Invalid JSON: {}", err),
                ErrorCode::InvalidExpression,
                ErrorCategory::ParseError,
            )],
        }
    }
}

/// Configuration for how validation should proceed.
#[derive(Debug, Eq, PartialEq, Clone, Hash)]
pub struct Config {
    max_depth: usize,
}

impl Config {
    /// Create a new, default `Config`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of nested resolutions of the same
    /// user-defined type name before validation reports a recursion error
    /// for that position. The default is 64.
    ///
    /// This functionality exists to support detecting infinite loops in
    /// schemas, for example in circularly-defined types. Unlike a hard
    /// abort, exceeding the bound fails only the offending position; the
    /// rest of the instance is still validated.
    pub fn max_depth(&mut self, max_depth: usize) -> &mut Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

/// Contains a single problem with an instance when evaluated against a
/// repository.
///
/// Note that, despite its name, `ValidationError` is not an error in the
/// usual Rust sense. It is an ordinary struct, which happens to contain
/// information about why some data was unsatisfactory against a given
/// schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    path: String,
    message: String,
    code: ErrorCode,
    category: ErrorCategory,
}

impl ValidationError {
    pub fn new<P, M>(path: P, message: M, code: ErrorCode, category: ErrorCategory) -> Self
    where
        P: Into<String>,
        M: Into<String>,
    {
        ValidationError {
            path: path.into(),
            message: message.into(),
            code,
            category,
        }
    }

    /// Where in the instance the problem sits: `$` for the root, `.field`
    /// for record fields, `[index]` for array items, and `.{key:k}` for a
    /// dictionary key under validation.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// A human-readable description of the problem.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The machine-readable code for the problem.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The broad classification of the problem.
    pub fn category(&self) -> ErrorCategory {
        self.category
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// The closed set of machine-readable error codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidExpression,
    InvalidArithmetic,
    ParentUndefined,
    UnknownType,
    UnknownConstraint,
    UnknownField,
    UnknownArgumentName,
    MissingArgument,
    TooManyArguments,
    DuplicateArgument,
    ConstraintViolation,
    ValidatorFailed,
    FieldMissing,
    FieldMustBeAbsent,
    TypeMismatch,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorCode::InvalidExpression => "InvalidExpression",
            ErrorCode::InvalidArithmetic => "InvalidArithmetic",
            ErrorCode::ParentUndefined => "ParentUndefined",
            ErrorCode::UnknownType => "UnknownType",
            ErrorCode::UnknownConstraint => "UnknownConstraint",
            ErrorCode::UnknownField => "UnknownField",
            ErrorCode::UnknownArgumentName => "UnknownArgumentName",
            ErrorCode::MissingArgument => "MissingArgument",
            ErrorCode::TooManyArguments => "TooManyArguments",
            ErrorCode::DuplicateArgument => "DuplicateArgument",
            ErrorCode::ConstraintViolation => "ConstraintViolation",
            ErrorCode::ValidatorFailed => "ValidatorFailed",
            ErrorCode::FieldMissing => "FieldMissing",
            ErrorCode::FieldMustBeAbsent => "FieldMustBeAbsent",
            ErrorCode::TypeMismatch => "TypeMismatch",
        };
        f.write_str(name)
    }
}

/// The broad classification of a validation error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    ParseError,
    TypeError,
    SemanticError,
    ValidationError,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorCategory::ParseError => "ParseError",
            ErrorCategory::TypeError => "TypeError",
            ErrorCategory::SemanticError => "SemanticError",
            ErrorCategory::ValidationError => "ValidationError",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::repository::Repository;
    use crate::schema::TypeExpr;
    use serde_json::json;

    #[test]
    fn invalid_json_input() {
        let repository = Repository::with_builtins();
        let validator = Validator::new();
        let errors = validator.validate_str(&repository, "{not json", None);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), "$");
        assert!(errors[0].message().starts_with("Invalid JSON:"));
        assert_eq!(errors[0].code(), ErrorCode::InvalidExpression);
        assert_eq!(errors[0].category(), ErrorCategory::ParseError);
    }

    #[test]
    fn recursion_bound_is_configurable() {
        let mut repository = Repository::with_builtins();
        repository
            .register_type(
                "Loop",
                TypeExpr::Named {
                    name: "Loop".to_owned(),
                    constraints: vec![],
                },
            )
            .unwrap();

        let mut config = Config::new();
        config.max_depth(4);
        let validator = Validator::new_with_config(config);
        let errors = validator.validate(&repository, &json!(1), Some("Loop"));
        assert!(!errors.is_empty());
        assert!(errors[0].message().contains("recursion depth"));
    }
}
