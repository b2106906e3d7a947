//! `scedel` is a Rust implementation of the Scedel schema language, a
//! portable way to describe and validate the structure of JSON data.
//!
//! A schema is a repository of named types and validators. Validation walks
//! a decoded JSON value in lockstep with a type expression tree, evaluates
//! inline constraints and user-defined validators, and reports every problem
//! it finds as a structured error with a machine-readable code and category.
//!
//! # Validating data
//!
//! The most common use-case for this crate is checking that some JSON input
//! is really valid against a schema. Here's how you'd achieve that use-case:
//!
//! ```
//! use scedel::{Repository, SerdeRepository, Validator, ErrorCode};
//! use serde_json::json;
//! use failure::Error;
//!
//! fn main() -> Result<(), Error> {
//!     // The SerdeRepository type is the serde-friendly document form of a
//!     // parsed schema repository.
//!     let document: SerdeRepository = serde_json::from_value(json!({
//!         "version": "0.14.2",
//!         "types": {
//!             "Root": {
//!                 "record": {
//!                     "fields": [
//!                         {
//!                             "name": "id",
//!                             "type": {
//!                                 "named": {
//!                                     "name": "Int",
//!                                     "constraints": [
//!                                         {
//!                                             "name": "min",
//!                                             "args": {
//!                                                 "call": [
//!                                                     { "value": { "literal": { "int": 1 } } },
//!                                                 ],
//!                                             },
//!                                         },
//!                                     ],
//!                                 },
//!                             },
//!                         },
//!                         {
//!                             "name": "title",
//!                             "type": { "named": { "name": "String" } },
//!                             "optional": true,
//!                         },
//!                     ],
//!                 },
//!             },
//!         },
//!     }))?;
//!
//!     // The Repository type layers the document's definitions over the
//!     // built-in types and constraints, and checks for collisions.
//!     let repository = Repository::from_serde(document)?;
//!
//!     let validator = Validator::new();
//!
//!     let errors = validator.validate(&repository, &json!({ "id": 7 }), None);
//!     assert!(errors.is_empty());
//!
//!     // A list of validation errors is the successful result of a run;
//!     // nothing is raised.
//!     let errors = validator.validate(
//!         &repository,
//!         &json!({ "id": 0, "title": 3 }),
//!         None,
//!     );
//!     assert_eq!(errors.len(), 2);
//!     assert_eq!(errors[0].path(), "$.id");
//!     assert_eq!(errors[0].code(), ErrorCode::ConstraintViolation);
//!     assert_eq!(errors[1].path(), "$.title");
//!     assert_eq!(errors[1].code(), ErrorCode::TypeMismatch);
//!
//!     Ok(())
//! }
//! ```
//!
//! Every error's `path` starts at `$` and follows the value that was
//! rejected: `.field` for record fields, `[index]` for array items, and
//! `.{key:k}` for a dictionary key under validation. These paths are part of
//! the language specification and are stable across implementations.
//!
//! # Extending the repository
//!
//! Beyond the standard built-ins, a repository accepts opaque built-in types
//! and validators registered from Rust (see
//! [`Repository`](repository/struct.Repository.html)), as well as
//! user-defined validators carried in the schema document itself with
//! parameters, defaults, and regex or predicate bodies.

mod builtins;
mod expr;
mod scope;
mod value;
mod vm;

pub mod cli;
pub mod errors;
pub mod repository;
pub mod schema;
pub mod serde;
pub mod validator;

pub use crate::errors::ScedelError;
pub use crate::repository::{
    BuiltinType, BuiltinValidator, Repository, TypeDef, UserType, ValidatorDef,
};
pub use crate::schema::{
    BinaryOp, CallArg, CompareOp, Constraint, ConstraintArgs, Expr, Field, Literal, Param,
    PathExpr, PathRoot, TypeExpr, UnaryOp, UserValidator, ValidatorBody, ValidatorRule,
};
pub use crate::serde::SerdeRepository;
pub use crate::validator::{Config, ErrorCategory, ErrorCode, ValidationError, Validator};

/// The schema-language RFC versions this crate implements.
pub const SUPPORTED_RFC_VERSIONS: &[&str] = &["0.14.2"];
