// src/codegen/mod.rs

//! Code-generator seam.
//!
//! The build engine treats schema-to-source generation as a black box: a
//! [`CodeGenerator`] receives a schema file and hands back one text blob per
//! output language. [`external::ExternalGenerator`] is the production
//! implementation and shells out to a configured command.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{HbuildError, Result};

pub mod external;

pub use external::ExternalGenerator;

/// A schema file and its text.
#[derive(Debug, Clone)]
pub struct SchemaSource {
    pub path: PathBuf,
    pub text: String,
}

/// Generated text, one blob per output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedOutput {
    pub header: String,
    pub body: String,
    pub csharp: Option<String>,
    /// JavaScript per application module.
    pub js: BTreeMap<String, String>,
}

/// Turns schema files into source text.
///
/// Calls are synchronous; the scheduler runs them on the blocking pool.
pub trait CodeGenerator: Send + Sync + Debug {
    /// Reject schemas the generator would turn into inconsistent code.
    ///
    /// The default checks that a parameter reused across several members is
    /// declared with the same type everywhere.
    fn sanity_check(&self, schema: &SchemaSource) -> Result<()> {
        check_parameter_types(&schema.text)
    }

    fn generate(&self, schema: &SchemaSource, apps: &[String]) -> Result<GeneratedOutput>;
}

static PARAM_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<param\b([^>]*)>").expect("param pattern is valid"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][\w-]*)\s*=\s*"([^"]*)""#).expect("attribute pattern is valid")
});

/// Every `<param name=".." type="..">` must agree on the type of a given name.
pub fn check_parameter_types(text: &str) -> Result<()> {
    let mut seen: HashMap<String, String> = HashMap::new();

    for tag in PARAM_TAG.captures_iter(text) {
        let mut name = None;
        let mut ty = None;
        for attr in ATTRIBUTE.captures_iter(&tag[1]) {
            match &attr[1] {
                "name" => name = Some(attr[2].to_string()),
                "type" => ty = Some(attr[2].to_string()),
                _ => {}
            }
        }
        let (Some(name), Some(ty)) = (name, ty) else {
            continue;
        };

        match seen.get(&name) {
            Some(existing) if *existing != ty => {
                return Err(HbuildError::Validation(format!(
                    "parameter '{name}' is declared as '{existing}' and as '{ty}'"
                )));
            }
            Some(_) => {}
            None => {
                seen.insert(name, ty);
            }
        }
    }
    Ok(())
}

/// Schema file name without its schema suffix (`users.sql.xml` -> `users`).
pub fn schema_stem<'a>(file_name: &'a str, suffix: &str) -> &'a str {
    file_name.strip_suffix(suffix).unwrap_or(file_name)
}
