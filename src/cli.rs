//! Minimal CLI: validate a JSON document against a schema repository.

use crate::repository::Repository;
use crate::serde::SerdeRepository;
use crate::validator::Validator;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Validate a JSON document against a Scedel schema repository.
///
/// Exits 0 when the document is valid, 1 when validation errors were found,
/// and 2 on a usage or loading failure.
#[derive(Parser, Debug)]
#[command(name = "scedel", version)]
pub struct CommandLineInterface {
    /// Root type to validate against (inferred from the schema when omitted)
    #[arg(long = "type", value_name = "ROOT_TYPE")]
    root_type: Option<String>,

    /// A literal JSON document, or a path to a file containing one
    json: String,

    /// Path to the schema repository document
    schema: PathBuf,
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(self) -> ExitCode {
        let schema_text = match fs::read_to_string(&self.schema) {
            Ok(text) => text,
            Err(err) => {
                eprintln!("error: cannot read {}: {}", self.schema.display(), err);
                return ExitCode::from(2);
            }
        };
        let document: SerdeRepository = match serde_json::from_str(&schema_text) {
            Ok(document) => document,
            Err(err) => {
                eprintln!("error: invalid schema document: {}", err);
                return ExitCode::from(2);
            }
        };
        let repository = match Repository::from_serde(document) {
            Ok(repository) => repository,
            Err(err) => {
                eprintln!("error: {}", err);
                return ExitCode::from(2);
            }
        };

        // The operand doubles as literal JSON or a path; an existing file
        // wins.
        let input = if Path::new(&self.json).exists() {
            match fs::read_to_string(&self.json) {
                Ok(text) => text,
                Err(err) => {
                    eprintln!("error: cannot read {}: {}", self.json, err);
                    return ExitCode::from(2);
                }
            }
        } else {
            self.json
        };

        let validator = Validator::new();
        let errors = validator.validate_str(&repository, &input, self.root_type.as_deref());
        if errors.is_empty() {
            return ExitCode::SUCCESS;
        }
        for error in &errors {
            println!(
                "{}: {} [{}/{}]",
                error.path(),
                error.message(),
                error.code(),
                error.category(),
            );
        }
        ExitCode::from(1)
    }
}
