// tests/install_rules.rs

use std::error::Error;

use hbuild::config::InstallRule;
use hbuild::types::Platform;
use hbuild_test_utils::builders::install_rule;
use hbuild_test_utils::{BuildConfigBuilder, Project, ROOT, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn pattern_rules_copy_only_matching_and_newer_files() -> TestResult {
    init_tracing();
    let project = Project::new();
    project
        .add("bin/libfoo.so", "foo")
        .add("bin/libbar.so", "bar")
        .add("bin/server", "exe");
    let cfg = BuildConfigBuilder::new(ROOT)
        .with_install(install_rule("bin", Some("*.so"), "dist/lib"))
        .build();

    let mut orchestrator = project.orchestrator(cfg.clone());
    assert_eq!(with_timeout(orchestrator.install()).await?, 2);
    assert!(project.exists("dist/lib/libfoo.so"));
    assert!(project.exists("dist/lib/libbar.so"));
    assert!(!project.exists("dist/lib/server"));

    assert_eq!(with_timeout(orchestrator.install()).await?, 0, "targets are up to date");

    project.touch("bin/libfoo.so");
    assert_eq!(with_timeout(orchestrator.install()).await?, 1);

    let summary = orchestrator.finish().await?;
    assert_eq!(summary.installed, 3);
    Ok(())
}

#[tokio::test]
async fn rename_and_platform_filters_apply() -> TestResult {
    init_tracing();
    let project = Project::new();
    project.add("bin/server", "exe").add("bin/server.exe", "exe");

    let renamed = InstallRule {
        rename: Some("game-server".to_string()),
        ..install_rule("bin", Some("server"), "dist")
    };
    let windows_only = InstallRule {
        platform: Some(Platform::Windows),
        ..install_rule("bin", Some("*.exe"), "dist")
    };
    let cfg = BuildConfigBuilder::new(ROOT)
        .with_deploy(renamed)
        .with_deploy(windows_only)
        .build();

    let mut orchestrator = project.orchestrator(cfg);
    assert_eq!(with_timeout(orchestrator.deploy()).await?, 1);
    orchestrator.finish().await?;

    assert_eq!(
        project.fs.contents(Project::path("dist/game-server")).as_deref(),
        Some("exe")
    );
    assert!(!project.exists("dist/server.exe"));
    Ok(())
}

#[tokio::test]
async fn rules_without_pattern_mirror_the_folder() -> TestResult {
    init_tracing();
    let project = Project::new();
    project
        .add("assets/index.html", "<html/>")
        .add("assets/img/logo.png", "png");
    let cfg = BuildConfigBuilder::new(ROOT)
        .with_install(install_rule("assets", None, "dist/www"))
        .build();

    let mut orchestrator = project.orchestrator(cfg);
    assert_eq!(with_timeout(orchestrator.install()).await?, 2);
    orchestrator.finish().await?;

    assert!(project.exists("dist/www/index.html"));
    assert!(project.exists("dist/www/img/logo.png"));
    Ok(())
}

#[tokio::test]
async fn missing_source_folder_copies_nothing() -> TestResult {
    init_tracing();
    let project = Project::new();
    let cfg = BuildConfigBuilder::new(ROOT)
        .with_install(install_rule("nowhere", Some("*"), "dist"))
        .build();

    let mut orchestrator = project.orchestrator(cfg);
    assert_eq!(with_timeout(orchestrator.install()).await?, 0);
    let summary = orchestrator.finish().await?;
    assert!(summary.succeeded());
    Ok(())
}
