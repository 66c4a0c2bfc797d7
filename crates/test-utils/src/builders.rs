#![allow(dead_code)]

use std::path::PathBuf;

use hbuild::config::{
    BuildConfig, ExcludeRule, InstallRule, LogicModuleConfig, RawBuildConfig,
};
use hbuild::errors::Result;
use hbuild::tasks::toolchain::Toolchain;
use hbuild::types::Platform;

/// Builder for `BuildConfig` to simplify test setup.
///
/// The toolchain is pinned to Linux defaults so command lines and artifact
/// names do not depend on the host.
pub struct BuildConfigBuilder {
    config: RawBuildConfig,
    platform: Platform,
}

impl BuildConfigBuilder {
    pub fn new(root: &str) -> Self {
        let mut config = RawBuildConfig::default();
        config.project.root = PathBuf::from(root);
        Self {
            config,
            platform: Platform::Linux,
        }
    }

    pub fn with_logic(mut self, name: &str, depends_on: &[&str]) -> Self {
        self.config.logic.push(LogicModuleConfig {
            name: name.to_string(),
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
            repo: None,
        });
        self
    }

    pub fn with_logic_repo(mut self, name: &str, repo: &str) -> Self {
        self.config.logic.push(LogicModuleConfig {
            name: name.to_string(),
            depends_on: vec![],
            repo: Some(PathBuf::from(repo)),
        });
        self
    }

    pub fn with_modular_core(mut self, core_folder: &str) -> Self {
        self.config.project.use_modular_core = true;
        self.config.project.core_folder = Some(PathBuf::from(core_folder));
        self
    }

    pub fn with_application(mut self, app: &str) -> Self {
        self.config.project.application_modules.push(app.to_string());
        self
    }

    pub fn exclude(mut self, folder: &str, file: &str) -> Self {
        self.config.exclude.push(ExcludeRule {
            folder: folder.to_string(),
            file: file.to_string(),
        });
        self
    }

    pub fn with_install(mut self, rule: InstallRule) -> Self {
        self.config.install.push(rule);
        self
    }

    pub fn with_deploy(mut self, rule: InstallRule) -> Self {
        self.config.deploy.push(rule);
        self
    }

    pub fn with_csharp_dir(mut self, dir: &str) -> Self {
        self.config.generate.csharp_dir = Some(PathBuf::from(dir));
        self
    }

    pub fn with_js_dir(mut self, template: &str) -> Self {
        self.config.generate.js_dir = Some(template.to_string());
        self
    }

    pub fn with_workers(mut self, compile: usize, generate: usize) -> Self {
        self.config.workers.compile = compile;
        self.config.workers.generate = generate;
        self
    }

    pub fn with_depcache(mut self) -> Self {
        self.config.depcache.enabled = true;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn raw(self) -> RawBuildConfig {
        self.config
    }

    pub fn try_build(self) -> Result<BuildConfig> {
        let toolchain = Toolchain::from_section(&self.config.toolchain, self.platform);
        Ok(BuildConfig::try_from(self.config)?.with_toolchain(toolchain))
    }

    pub fn build(self) -> BuildConfig {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

/// Install rule shorthand.
pub fn install_rule(source: &str, pattern: Option<&str>, target: &str) -> InstallRule {
    InstallRule {
        source: PathBuf::from(source),
        pattern: pattern.map(str::to_string),
        target: PathBuf::from(target),
        rename: None,
        platform: None,
    }
}
