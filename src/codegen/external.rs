// src/codegen/external.rs

//! Generator that shells out to a configured command.
//!
//! The command template is run once per output language with `{lang}`
//! (`header`, `body`, `csharp`, `js`), `{app}` and `{schema}` substituted;
//! its stdout is the generated text.

use std::process::{Command, Stdio};

use tracing::debug;

use crate::codegen::{CodeGenerator, GeneratedOutput, SchemaSource, check_parameter_types};
use crate::config::GenerateSection;
use crate::errors::{HbuildError, Result};
use crate::tasks::toolchain::render;

#[derive(Debug, Clone)]
pub struct ExternalGenerator {
    command: Option<String>,
    check_command: Option<String>,
    csharp: bool,
    js: bool,
}

impl ExternalGenerator {
    pub fn new(command: Option<String>, check_command: Option<String>) -> Self {
        Self {
            command,
            check_command,
            csharp: true,
            js: true,
        }
    }

    /// Generator for a `[generate]` section. C# and JavaScript are only
    /// requested when their output directories are configured.
    pub fn from_section(section: &GenerateSection) -> Self {
        Self {
            command: section.command.clone(),
            check_command: section.check_command.clone(),
            csharp: section.csharp_dir.is_some(),
            js: section.js_dir.is_some(),
        }
    }

    fn run(&self, lang: &str, app: &str, schema: &SchemaSource) -> Result<String> {
        let template = self.command.as_deref().ok_or_else(|| {
            HbuildError::config("[generate] command is required to generate schema files")
        })?;
        let schema_path = schema.path.to_string_lossy();
        let cmd = render(
            template,
            &[("lang", lang), ("app", app), ("schema", &schema_path)],
        );
        let stdout = capture(&cmd)?;
        debug!(lang, app, bytes = stdout.len(), "generator output captured");
        Ok(stdout)
    }
}

impl CodeGenerator for ExternalGenerator {
    fn sanity_check(&self, schema: &SchemaSource) -> Result<()> {
        let Some(template) = &self.check_command else {
            return check_parameter_types(&schema.text);
        };
        let schema_path = schema.path.to_string_lossy();
        let cmd = render(template, &[("schema", &schema_path)]);
        capture(&cmd).map(|_| ()).map_err(|err| match err {
            HbuildError::ExternalTool { code, .. } => HbuildError::Validation(format!(
                "sanity check of {} failed (exit code {code})",
                schema.path.display()
            )),
            other => other,
        })
    }

    fn generate(&self, schema: &SchemaSource, apps: &[String]) -> Result<GeneratedOutput> {
        let mut out = GeneratedOutput {
            header: self.run("header", "", schema)?,
            body: self.run("body", "", schema)?,
            ..GeneratedOutput::default()
        };
        if self.csharp {
            out.csharp = Some(self.run("csharp", "", schema)?);
        }
        if self.js {
            for app in apps {
                out.js.insert(app.clone(), self.run("js", app, schema)?);
            }
        }
        Ok(out)
    }
}

fn shell(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

fn capture(cmd: &str) -> Result<String> {
    let output = shell(cmd)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| HbuildError::Other(anyhow::Error::new(e).context(format!("spawning '{cmd}'"))))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(cmd, stderr = %stderr.trim(), "generator command failed");
        return Err(HbuildError::ExternalTool {
            command: cmd.to_string(),
            code: output.status.code().unwrap_or(-1),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn schema() -> SchemaSource {
        SchemaSource {
            path: PathBuf::from("/tmp/users.sql.xml"),
            text: String::new(),
        }
    }

    #[test]
    fn captures_one_blob_per_language() {
        let generator = ExternalGenerator::new(Some("echo {lang}:{app}".to_string()), None);
        let out = generator
            .generate(&schema(), &["portal".to_string()])
            .unwrap();
        assert_eq!(out.header.trim(), "header:");
        assert_eq!(out.csharp.as_deref().map(str::trim), Some("csharp:"));
        assert_eq!(out.js.get("portal").map(|s| s.trim()), Some("js:portal"));
    }

    #[test]
    fn failing_check_command_is_a_validation_error() {
        let generator = ExternalGenerator::new(None, Some("exit 3".to_string()));
        let err = generator.sanity_check(&schema()).unwrap_err();
        assert!(matches!(err, HbuildError::Validation(_)));
    }

    #[test]
    fn missing_command_is_a_config_error() {
        let generator = ExternalGenerator::new(None, None);
        let err = generator.generate(&schema(), &[]).unwrap_err();
        assert!(matches!(err, HbuildError::Config(_)));
    }
}
