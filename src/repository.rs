//! Logic related to holding a collection of types and validators together.

use crate::builtins;
use crate::errors::ScedelError;
use crate::schema::{TypeExpr, UserValidator};
use crate::serde::SerdeRepository;
use crate::SUPPORTED_RFC_VERSIONS;
use failure::{bail, Error};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Holds the types and validators a validation run resolves against.
///
/// A repository is read-only for the duration of any validation call; it can
/// be shared freely between concurrent calls.
///
/// ```
/// use scedel::{Repository, SerdeRepository, Validator};
/// use failure::Error;
/// use serde_json::json;
///
/// fn main() -> Result<(), Error> {
///     let document: SerdeRepository = serde_json::from_value(json!({
///         "version": "0.14.2",
///         "types": {
///             "Root": {
///                 "record": {
///                     "fields": [
///                         { "name": "name", "type": { "named": { "name": "String" } } },
///                     ],
///                 },
///             },
///         },
///     }))?;
///
///     let repository = Repository::from_serde(document)?;
///     let validator = Validator::new();
///     let errors = validator.validate(&repository, &json!({ "name": "Ada" }), None);
///     assert!(errors.is_empty());
///
///     Ok(())
/// }
/// ```
#[derive(Default)]
pub struct Repository {
    types: HashMap<String, TypeDef>,
    validators: HashMap<String, HashMap<String, ValidatorDef>>,
}

impl Repository {
    /// Construct a new, empty repository. Most callers want
    /// [`with_builtins`](#method.with_builtins) instead.
    pub fn new() -> Repository {
        Repository::default()
    }

    /// Construct a repository seeded with the built-in types (`Int`,
    /// `String`, `DateTime`, …) and their built-in constraints.
    pub fn with_builtins() -> Repository {
        let mut repository = Repository::new();
        builtins::install(&mut repository);
        repository
    }

    /// Build a repository from its JSON document form.
    ///
    /// The document's user-defined types and validators are layered over the
    /// built-ins. Returns an error if the document declares an unsupported
    /// schema-language version, or if a definition would collide with an
    /// existing one.
    pub fn from_serde(document: SerdeRepository) -> Result<Repository, Error> {
        if let Some(ref version) = document.version {
            if !SUPPORTED_RFC_VERSIONS.contains(&version.as_str()) {
                bail!(ScedelError::UnsupportedVersion {
                    version: version.clone(),
                });
            }
        }

        let mut repository = Repository::with_builtins();
        for (name, expr) in document.types {
            repository.register_type(name, expr)?;
        }
        for validator in document.validators {
            repository.register_validator(validator)?;
        }
        Ok(repository)
    }

    /// Add a user-defined type under the given name.
    ///
    /// Returns an error if any definition, built-in or user-defined, already
    /// uses the name.
    pub fn register_type<N: Into<String>>(&mut self, name: N, expr: TypeExpr) -> Result<(), Error> {
        let name = name.into();
        if self.types.contains_key(&name) {
            bail!(ScedelError::DuplicateType { name });
        }
        self.types
            .insert(name.clone(), TypeDef::User(UserType { name, expr }));
        Ok(())
    }

    /// Add a user-defined validator, keyed by `(target type, name)`.
    pub fn register_validator(&mut self, validator: UserValidator) -> Result<(), Error> {
        let by_name = self.validators.entry(validator.target.clone()).or_default();
        if by_name.contains_key(&validator.name) {
            bail!(ScedelError::DuplicateValidator {
                target: validator.target,
                name: validator.name,
            });
        }
        by_name.insert(validator.name.clone(), ValidatorDef::User(validator));
        Ok(())
    }

    /// Add a built-in type.
    pub fn register_builtin_type(&mut self, builtin: BuiltinType) -> Result<(), Error> {
        if self.types.contains_key(builtin.name()) {
            bail!(ScedelError::DuplicateType {
                name: builtin.name().to_owned(),
            });
        }
        self.insert_builtin_type(builtin);
        Ok(())
    }

    /// Add a built-in validator under the given target type.
    pub fn register_builtin_validator<T: Into<String>>(
        &mut self,
        target: T,
        builtin: BuiltinValidator,
    ) -> Result<(), Error> {
        let target = target.into();
        let by_name = self.validators.entry(target.clone()).or_default();
        if by_name.contains_key(builtin.name()) {
            bail!(ScedelError::DuplicateValidator {
                target,
                name: builtin.name().to_owned(),
            });
        }
        by_name.insert(builtin.name().to_owned(), ValidatorDef::Builtin(builtin));
        Ok(())
    }

    pub(crate) fn insert_builtin_type(&mut self, builtin: BuiltinType) {
        self.types
            .insert(builtin.name().to_owned(), TypeDef::Builtin(builtin));
    }

    pub(crate) fn insert_builtin_validator(&mut self, target: &str, builtin: BuiltinValidator) {
        self.validators
            .entry(target.to_owned())
            .or_default()
            .insert(builtin.name().to_owned(), ValidatorDef::Builtin(builtin));
    }

    /// Gets the definition of the type with the given name, if any.
    pub fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Does any definition, built-in or user-defined, use this name?
    pub fn contains_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Gets the validator registered for `(target type, name)`, if any.
    pub fn validator(&self, target: &str, name: &str) -> Option<&ValidatorDef> {
        self.validators
            .get(target)
            .and_then(|by_name| by_name.get(name))
    }

    /// The names of all user-defined types, sorted.
    pub fn user_type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .types
            .values()
            .filter_map(|def| match def {
                TypeDef::User(ref user) => Some(user.name.as_str()),
                TypeDef::Builtin(_) => None,
            })
            .collect();
        names.sort_unstable();
        names
    }
}

/// A type definition: either an opaque built-in check or a user-defined
/// expression tree.
pub enum TypeDef {
    Builtin(BuiltinType),
    User(UserType),
}

/// A user-defined type: a name bound to a type expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UserType {
    pub name: String,
    pub expr: TypeExpr,
}

/// A built-in type: a name bound to an opaque shape check.
pub struct BuiltinType {
    name: String,
    matches: Box<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl BuiltinType {
    pub fn new<N, F>(name: N, matches: F) -> BuiltinType
    where
        N: Into<String>,
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        BuiltinType {
            name: name.into(),
            matches: Box::new(matches),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, value: &Value) -> bool {
        (self.matches)(value)
    }
}

impl fmt::Debug for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BuiltinType")
            .field("name", &self.name)
            .finish()
    }
}

/// A validator definition: either an opaque built-in predicate or a
/// user-defined validator with parameters and a body.
pub enum ValidatorDef {
    Builtin(BuiltinValidator),
    User(UserValidator),
}

/// A built-in validator: an opaque predicate `(value, argument?) → bool`,
/// where `None` means the check does not apply to the value's shape.
pub struct BuiltinValidator {
    name: String,
    requires_argument: bool,
    evaluate: Box<dyn Fn(&Value, Option<&Value>) -> Option<bool> + Send + Sync>,
}

impl BuiltinValidator {
    pub fn new<N, F>(name: N, requires_argument: bool, evaluate: F) -> BuiltinValidator
    where
        N: Into<String>,
        F: Fn(&Value, Option<&Value>) -> Option<bool> + Send + Sync + 'static,
    {
        BuiltinValidator {
            name: name.into(),
            requires_argument,
            evaluate: Box::new(evaluate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn requires_argument(&self) -> bool {
        self.requires_argument
    }

    pub fn evaluate(&self, value: &Value, argument: Option<&Value>) -> Option<bool> {
        (self.evaluate)(value, argument)
    }
}

impl fmt::Debug for BuiltinValidator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BuiltinValidator")
            .field("name", &self.name)
            .field("requires_argument", &self.requires_argument)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register() {
        let mut repository = Repository::with_builtins();

        repository
            .register_type(
                "Root",
                TypeExpr::Named {
                    name: "String".to_owned(),
                    constraints: vec![],
                },
            )
            .unwrap();
        assert!(repository.contains_type("Root"));
        assert!(repository.contains_type("Int"));
        assert_eq!(repository.user_type_names(), vec!["Root"]);

        // A second definition under the same name is rejected, as is
        // shadowing a built-in.
        assert!(repository
            .register_type(
                "Root",
                TypeExpr::Named {
                    name: "Int".to_owned(),
                    constraints: vec![],
                },
            )
            .is_err());
        assert!(repository
            .register_type(
                "Int",
                TypeExpr::Named {
                    name: "String".to_owned(),
                    constraints: vec![],
                },
            )
            .is_err());
    }

    #[test]
    fn builtin_lookup_is_target_scoped() {
        let repository = Repository::with_builtins();
        assert!(repository.validator("Int", "min").is_some());
        assert!(repository.validator("String", "min").is_some());
        assert!(repository.validator("Int", "regex").is_none());
        assert!(repository.validator("Unrelated", "min").is_none());
    }

    #[test]
    fn from_serde_rejects_unsupported_versions() {
        let document: SerdeRepository = serde_json::from_value(json!({
            "version": "0.1.0",
            "types": {},
        }))
        .unwrap();
        assert!(Repository::from_serde(document).is_err());

        let document: SerdeRepository = serde_json::from_value(json!({
            "version": "0.14.2",
            "types": {
                "Root": { "named": { "name": "String" } },
            },
        }))
        .unwrap();
        let repository = Repository::from_serde(document).unwrap();
        assert_eq!(repository.user_type_names(), vec!["Root"]);
    }

    #[test]
    fn from_serde_registers_validators() {
        let document: SerdeRepository = serde_json::from_value(json!({
            "types": {},
            "validators": [
                {
                    "target": "String",
                    "name": "shouty",
                    "body": { "regex": { "pattern": "^[A-Z]+$" } },
                },
            ],
        }))
        .unwrap();
        let repository = Repository::from_serde(document).unwrap();
        assert!(repository.validator("String", "shouty").is_some());
        assert!(repository.validator("Int", "shouty").is_none());
    }
}
