// src/config/validate.rs

use std::collections::{HashMap, HashSet};

use globset::Glob;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{BuildConfig, InstallRule, RawBuildConfig};
use crate::errors::{HbuildError, Result};

impl TryFrom<RawBuildConfig> for BuildConfig {
    type Error = crate::errors::HbuildError;

    fn try_from(raw: RawBuildConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let order = module_build_order(&raw);
        Ok(BuildConfig::new_unchecked(raw, order))
    }
}

fn validate_raw_config(cfg: &RawBuildConfig) -> Result<()> {
    validate_project(cfg)?;
    validate_workers(cfg)?;
    validate_module_names(cfg)?;
    validate_module_dependencies(cfg)?;
    validate_module_graph(cfg)?;
    validate_install_rules("install", &cfg.install)?;
    validate_install_rules("deploy", &cfg.deploy)?;
    Ok(())
}

fn validate_project(cfg: &RawBuildConfig) -> Result<()> {
    if cfg.project.use_modular_core && cfg.project.core_folder.is_none() {
        return Err(HbuildError::config(
            "[project].use_modular_core requires [project].core_folder",
        ));
    }
    Ok(())
}

fn validate_workers(cfg: &RawBuildConfig) -> Result<()> {
    if cfg.workers.compile == 0 || cfg.workers.generate == 0 {
        return Err(HbuildError::config(format!(
            "[workers] pool sizes must be >= 1 (compile = {}, generate = {})",
            cfg.workers.compile, cfg.workers.generate
        )));
    }
    Ok(())
}

fn validate_module_names(cfg: &RawBuildConfig) -> Result<()> {
    let mut seen = HashSet::new();
    for module in &cfg.logic {
        if module.name.is_empty() || module.name.contains('/') {
            return Err(HbuildError::config(format!(
                "invalid logic module name '{}'",
                module.name
            )));
        }
        if !seen.insert(module.name.as_str()) {
            return Err(HbuildError::config(format!(
                "logic module '{}' is declared more than once",
                module.name
            )));
        }
    }
    Ok(())
}

fn validate_module_dependencies(cfg: &RawBuildConfig) -> Result<()> {
    let known: HashSet<&str> = cfg.logic.iter().map(|m| m.name.as_str()).collect();
    for module in &cfg.logic {
        for dep in &module.depends_on {
            if dep == &module.name {
                return Err(HbuildError::config(format!(
                    "logic module '{}' cannot depend on itself",
                    module.name
                )));
            }
            if !known.contains(dep.as_str()) {
                return Err(HbuildError::config(format!(
                    "logic module '{}' has unknown dependency '{}'",
                    module.name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_module_graph(cfg: &RawBuildConfig) -> Result<()> {
    // Edge direction: dependency -> dependent.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for module in &cfg.logic {
        graph.add_node(module.name.as_str());
    }
    for module in &cfg.logic {
        for dep in &module.depends_on {
            graph.add_edge(dep.as_str(), module.name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(HbuildError::config(format!(
            "cycle detected in logic module graph involving '{}'",
            cycle.node_id()
        ))),
    }
}

fn validate_install_rules(section: &str, rules: &[InstallRule]) -> Result<()> {
    for rule in rules {
        if let Some(pattern) = &rule.pattern {
            Glob::new(pattern).map_err(|e| {
                HbuildError::config(format!(
                    "[[{section}]] invalid pattern '{pattern}': {e}"
                ))
            })?;
        }
        if rule.rename.is_some() && rule.pattern.is_none() {
            return Err(HbuildError::config(format!(
                "[[{section}]] rename for {:?} requires a pattern",
                rule.source
            )));
        }
    }
    Ok(())
}

/// Dependencies-first order that keeps declaration order wherever the graph
/// allows it. Assumes the graph was already checked for cycles.
fn module_build_order(cfg: &RawBuildConfig) -> Vec<String> {
    let deps: HashMap<&str, &[String]> = cfg
        .logic
        .iter()
        .map(|m| (m.name.as_str(), m.depends_on.as_slice()))
        .collect();

    fn visit<'a>(
        name: &'a str,
        deps: &HashMap<&'a str, &'a [String]>,
        done: &mut HashSet<&'a str>,
        order: &mut Vec<String>,
    ) {
        if !done.insert(name) {
            return;
        }
        if let Some(&list) = deps.get(name) {
            for dep in list {
                visit(dep.as_str(), deps, done, order);
            }
        }
        order.push(name.to_string());
    }

    let mut done = HashSet::new();
    let mut order = Vec::with_capacity(cfg.logic.len());
    for module in &cfg.logic {
        visit(module.name.as_str(), &deps, &mut done, &mut order);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::LogicModuleConfig;

    fn module(name: &str, deps: &[&str]) -> LogicModuleConfig {
        LogicModuleConfig {
            name: name.to_string(),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
            repo: None,
        }
    }

    #[test]
    fn build_order_puts_dependencies_first() {
        let raw = RawBuildConfig {
            logic: vec![
                module("shop", &["accounts", "common"]),
                module("accounts", &["common"]),
                module("common", &[]),
            ],
            ..Default::default()
        };
        let cfg = BuildConfig::try_from(raw).unwrap();
        assert_eq!(cfg.module_order, vec!["common", "accounts", "shop"]);
    }

    #[test]
    fn cycle_is_a_config_error() {
        let raw = RawBuildConfig {
            logic: vec![module("a", &["b"]), module("b", &["a"])],
            ..Default::default()
        };
        match BuildConfig::try_from(raw) {
            Err(HbuildError::Config(msg)) => assert!(msg.contains("cycle detected")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn zero_workers_rejected() {
        let mut raw = RawBuildConfig::default();
        raw.workers.compile = 0;
        assert!(matches!(
            BuildConfig::try_from(raw),
            Err(HbuildError::Config(_))
        ));
    }
}
