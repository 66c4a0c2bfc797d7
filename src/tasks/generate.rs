// src/tasks/generate.rs

use std::path::PathBuf;

use tracing::{debug, info};

use crate::codegen::{CodeGenerator, SchemaSource, schema_stem};
use crate::config::ConfigProvider;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::tasks::toolchain::render;
use crate::tree::is_newer_than;

/// Generation of one schema file into its per-language outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateTask {
    /// Logical path of the folder holding the schema.
    pub folder: String,
    pub file: String,
    pub schema: PathBuf,
    pub header: PathBuf,
    pub body: PathBuf,
    pub csharp: Option<PathBuf>,
    /// JavaScript output per application module.
    pub js: Vec<(String, PathBuf)>,
}

impl GenerateTask {
    /// `generated_dir` is the physical generated-code subfolder of `folder`.
    pub fn new(
        cfg: &dyn ConfigProvider,
        folder: &str,
        file: &str,
        schema: PathBuf,
        generated_dir: PathBuf,
    ) -> Self {
        let section = cfg.generate();
        let root = cfg.project_root();
        let stem = schema_stem(file, &section.schema_suffix);

        let csharp = section
            .csharp_dir
            .as_ref()
            .map(|dir| root.join(dir).join(format!("{stem}.cs")));

        let js = match &section.js_dir {
            Some(template) => cfg
                .application_modules()
                .iter()
                .map(|app| {
                    let dir = render(template, &[("app", app)]);
                    (app.clone(), root.join(dir).join(format!("{stem}.js")))
                })
                .collect(),
            None => Vec::new(),
        };

        Self {
            folder: folder.to_string(),
            file: file.to_string(),
            schema,
            header: generated_dir.join(format!("{stem}.h")),
            body: generated_dir.join(format!("{stem}.cpp")),
            csharp,
            js,
        }
    }

    /// Schema newer than its generated body, or a forced regeneration.
    pub fn is_stale(&self, fs: &dyn FileSystem, force: bool) -> bool {
        force || is_newer_than(fs, &self.schema, &self.body)
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.folder, self.file)
    }

    /// Sanity-check, generate and write every output. Returns the number of
    /// files whose content actually changed.
    ///
    /// When the body is unchanged but older than the schema its timestamp is
    /// refreshed, so the schema does not stay stale forever.
    pub fn execute(&self, fs: &dyn FileSystem, generator: &dyn CodeGenerator) -> Result<usize> {
        let schema = SchemaSource {
            path: self.schema.clone(),
            text: fs.read_to_string(&self.schema)?,
        };
        generator.sanity_check(&schema)?;

        let apps: Vec<String> = self.js.iter().map(|(app, _)| app.clone()).collect();
        let output = generator.generate(&schema, &apps)?;

        let stale_body = is_newer_than(fs, &self.schema, &self.body);
        let mut written = 0;
        if write_if_changed(fs, &self.body, &output.body)? {
            written += 1;
        } else if stale_body {
            debug!(path = ?self.body, "refreshing unchanged generated body");
            fs.touch(&self.body)?;
        }

        let mut emit = |path: &PathBuf, text: &str| -> Result<()> {
            if write_if_changed(fs, path, text)? {
                written += 1;
            }
            Ok(())
        };

        emit(&self.header, &output.header)?;
        if let (Some(path), Some(text)) = (&self.csharp, &output.csharp) {
            emit(path, text)?;
        }
        for (app, path) in &self.js {
            if let Some(text) = output.js.get(app) {
                emit(path, text)?;
            }
        }

        info!(schema = %self.label(), written, "schema generated");
        Ok(written)
    }
}

/// Write `text` unless the file already holds exactly that content.
///
/// Skipping identical output keeps timestamps stable, so unchanged generated
/// code does not trigger recompiles.
pub fn write_if_changed(fs: &dyn FileSystem, path: &std::path::Path, text: &str) -> Result<bool> {
    if let Ok(existing) = fs.read_to_string(path) {
        if blake3::hash(existing.as_bytes()) == blake3::hash(text.as_bytes()) {
            debug!(path = ?path, "generated output unchanged");
            return Ok(false);
        }
    }
    fs.write(path, text.as_bytes())?;
    Ok(true)
}
