//! An error type for repository-construction operations.

use failure::Fail;

/// An enum of possible errors that can emerge from building a
/// [`Repository`](../repository/struct.Repository.html).
///
/// Validation itself never produces this type. Problems found while
/// validating an instance are reported as ordinary
/// [`ValidationError`](../validator/struct.ValidationError.html) values; the
/// variants here only arise while assembling the repository a validation run
/// reads from.
#[derive(Debug, Fail, PartialEq)]
pub enum ScedelError {
  /// Two type definitions were registered under the same name.
  ///
  /// Type names are the sole lookup key during validation, so a repository
  /// refuses to hold two definitions for one name. This also fires when a
  /// user-defined type tries to shadow a built-in such as `Int` or `String`.
  #[fail(display = "duplicate type definition: {}", name)]
  DuplicateType { name: String },

  /// Two validators were registered for the same `(target type, name)` pair.
  ///
  /// Constraints resolve their validator by target type and constraint name,
  /// so that pair must be unique within a repository.
  #[fail(display = "duplicate validator: {}({})", target, name)]
  DuplicateValidator { target: String, name: String },

  /// A repository document declared a schema-language version this crate
  /// does not implement.
  ///
  /// The implemented versions are listed in
  /// [`SUPPORTED_RFC_VERSIONS`](../constant.SUPPORTED_RFC_VERSIONS.html).
  #[fail(display = "unsupported schema language version: {}", version)]
  UnsupportedVersion { version: String },
}
