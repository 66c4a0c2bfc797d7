// tests/config_errors.rs

use std::io::Write;

use hbuild::config::{ConfigProvider, load_and_validate};
use hbuild::errors::HbuildError;
use tempfile::NamedTempFile;

fn config_file(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{text}").unwrap();
    file
}

fn config_error(text: &str) -> String {
    let file = config_file(text);
    match load_and_validate(file.path()) {
        Err(HbuildError::Config(msg)) => msg,
        Err(e) => panic!("Expected Config error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn logic_module_cycle_is_rejected() {
    let msg = config_error(
        r#"
[[logic]]
name = "a"
depends_on = ["b"]

[[logic]]
name = "b"
depends_on = ["a"]
"#,
    );
    assert!(msg.contains("cycle detected"));
    assert!(msg.contains('a') || msg.contains('b'));
}

#[test]
fn unknown_logic_dependency_is_rejected() {
    let msg = config_error(
        r#"
[[logic]]
name = "accounts"
depends_on = ["nonexistent"]
"#,
    );
    assert!(msg.contains("unknown dependency"));
    assert!(msg.contains("nonexistent"));
}

#[test]
fn duplicate_and_self_dependencies_are_rejected() {
    let msg = config_error(
        r#"
[[logic]]
name = "accounts"

[[logic]]
name = "accounts"
"#,
    );
    assert!(msg.contains("more than once"));

    let msg = config_error(
        r#"
[[logic]]
name = "accounts"
depends_on = ["accounts"]
"#,
    );
    assert!(msg.contains("itself"));
}

#[test]
fn invalid_install_pattern_is_rejected() {
    let msg = config_error(
        r#"
[[install]]
source = "bin"
pattern = "lib[.so"
target = "dist"
"#,
    );
    assert!(msg.contains("invalid pattern"));
}

#[test]
fn rename_without_pattern_is_rejected() {
    let msg = config_error(
        r#"
[[deploy]]
source = "bin"
target = "dist"
rename = "x"
"#,
    );
    assert!(msg.contains("requires a pattern"));
}

#[test]
fn zero_workers_and_missing_core_folder_are_rejected() {
    let msg = config_error("[workers]\ncompile = 0\n");
    assert!(msg.contains("[workers]"));

    let msg = config_error("[project]\nuse_modular_core = true\n");
    assert!(msg.contains("core_folder"));
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let file = config_file("[project\nroot = 1");
    assert!(matches!(load_and_validate(file.path()), Err(HbuildError::Toml(_))));
}

#[test]
fn missing_file_is_a_filesystem_error() {
    let result = load_and_validate("/definitely/not/here/hbuild.toml");
    assert!(matches!(result, Err(HbuildError::FileSystem { .. })));
}

#[test]
fn valid_config_resolves_paths_and_orders_modules() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hbuild.toml");
    std::fs::write(
        &path,
        r#"
[project]
root = "proj"
application_modules = ["portal"]

[[logic]]
name = "accounts"
depends_on = ["common"]

[[logic]]
name = "common"

[[logic]]
name = "reports"
depends_on = ["accounts"]
repo = "../shared"

[[exclude]]
folder = "glob"
file = "legacy.cpp"
"#,
    )
    .unwrap();

    let cfg = load_and_validate(&path).unwrap();

    assert_eq!(cfg.project_root(), dir.path().join("proj"));
    assert_eq!(cfg.bin_dir(), dir.path().join("proj").join("bin"));
    assert_eq!(cfg.logic_modules(), ["common", "accounts", "reports"]);
    assert_eq!(cfg.logic_module_dependencies("reports"), vec!["accounts"]);
    assert_eq!(
        cfg.logic_module_repo("reports"),
        dir.path().join("proj").join("../shared")
    );
    assert_eq!(cfg.logic_module_repo("common"), dir.path().join("proj"));
    assert!(cfg.is_excluded("glob", "legacy.cpp"));
    assert!(!cfg.is_excluded("server", "legacy.cpp"));
    assert_eq!(cfg.application_modules(), ["portal"]);
    assert_eq!(
        hbuild::config::transitive_logic_dependencies(&cfg, "reports"),
        vec!["common", "accounts"]
    );
}
