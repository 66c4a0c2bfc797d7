// tests/build_orchestrator.rs

use std::error::Error;

use hbuild::cli::Command;
use hbuild::config::BuildConfig;
use hbuild::tasks::LinkTask;
use hbuild::types::TaskKind;
use hbuild_test_utils::{BuildConfigBuilder, Project, ROOT, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn config() -> BuildConfig {
    BuildConfigBuilder::new(ROOT)
        .with_logic("common", &[])
        .with_logic("accounts", &["common"])
        .with_workers(4, 2)
        .build()
}

fn targets(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn compiles_only_stale_sources_then_links() -> TestResult {
    init_tracing();
    let project = Project::new();
    project
        .add("glob/a.cpp", "int a;\n")
        .add("glob/b.cpp", "int b;\n")
        .add("glob/b.o", "");

    let mut orchestrator = project.orchestrator(config());
    with_timeout(orchestrator.run(&targets(&["glob"]))).await?;
    let summary = orchestrator.finish().await?;

    assert_eq!(project.executor.labels(TaskKind::Compile), vec!["glob/a.cpp"]);
    assert_eq!(project.executor.labels(TaskKind::Link), vec!["glob"]);
    assert!(project.exists("glob/a.o"));
    assert!(project.exists("glob/libglob.a"));

    assert!(summary.succeeded());
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(summary.stats.compiled, 1);
    assert_eq!(summary.stats.linked, 1);
    Ok(())
}

#[tokio::test]
async fn second_run_is_a_no_op() -> TestResult {
    init_tracing();
    let project = Project::new();
    project.add("glob/a.cpp", "").add("glob/b.cpp", "");

    let mut first = project.orchestrator(config());
    with_timeout(first.run(&targets(&["glob"]))).await?;
    first.finish().await?;
    assert_eq!(project.executor.count(TaskKind::Compile), 2);

    project.executor.clear();
    let mut second = project.orchestrator(config());
    with_timeout(second.run(&targets(&["glob"]))).await?;
    let summary = second.finish().await?;

    assert!(project.executor.executed().is_empty());
    assert_eq!(summary.stats.compiled, 0);
    assert_eq!(summary.stats.linked, 0);
    Ok(())
}

#[tokio::test]
async fn touched_header_recompiles_its_includers() -> TestResult {
    init_tracing();
    let project = Project::new();
    project
        .add("glob/types.h", "")
        .add("glob/a.cpp", "#include \"types.h\"\n")
        .add("glob/b.cpp", "");

    let mut first = project.orchestrator(config());
    with_timeout(first.run(&targets(&["glob"]))).await?;
    first.finish().await?;

    project.executor.clear();
    project.touch("glob/types.h");

    let mut second = project.orchestrator(config());
    with_timeout(second.run(&targets(&["glob"]))).await?;
    second.finish().await?;

    assert_eq!(project.executor.labels(TaskKind::Compile), vec!["glob/a.cpp"]);
    assert_eq!(project.executor.labels(TaskKind::Link), vec!["glob"]);
    Ok(())
}

#[tokio::test]
async fn failed_compile_skips_link_and_remaining_targets() -> TestResult {
    init_tracing();
    let project = Project::new();
    project
        .add("glob/a.cpp", "")
        .add("glob/b.cpp", "")
        .add("client/c.cpp", "");
    project.executor.fail_on("glob/a.cpp");

    let mut orchestrator = project.orchestrator(config());
    with_timeout(orchestrator.run(&targets(&["glob", "client"]))).await?;
    assert!(orchestrator.has_error());
    let summary = orchestrator.finish().await?;

    assert_eq!(project.executor.count(TaskKind::Link), 0);
    assert!(!project.executor.labels(TaskKind::Compile).contains(&"client/c.cpp".to_string()));
    assert!(!project.exists("glob/a.o"));
    assert!(!project.exists("glob/libglob.a"));

    assert!(!summary.succeeded());
    assert_ne!(summary.exit_code(), 0);
    assert_eq!(summary.stats.compile_errors, 1);
    assert!(summary.to_string().contains("BUILD FAILED"));
    Ok(())
}

#[tokio::test]
async fn excluded_sources_are_neither_compiled_nor_linked() -> TestResult {
    init_tracing();
    let project = Project::new();
    project.add("glob/a.cpp", "").add("glob/skip.cpp", "");
    let cfg = BuildConfigBuilder::new(ROOT).exclude("glob", "skip.cpp").build();

    let tree = project.tree(&cfg);
    let link = LinkTask::new(&tree, &cfg, "glob");
    assert_eq!(link.objects, vec![Project::path("glob/a.o")]);

    let mut orchestrator = project.orchestrator(cfg);
    with_timeout(orchestrator.run(&targets(&["glob"]))).await?;
    orchestrator.finish().await?;

    assert_eq!(project.executor.labels(TaskKind::Compile), vec!["glob/a.cpp"]);
    assert!(!project.exists("glob/skip.o"));
    Ok(())
}

#[tokio::test]
async fn executables_relink_when_libraries_change() -> TestResult {
    init_tracing();
    let project = Project::new();
    project.add("glob/g.cpp", "").add("server/s.cpp", "");
    let order = targets(&["glob", "server", "server-exe"]);

    let mut first = project.orchestrator(config());
    with_timeout(first.run(&order)).await?;
    first.finish().await?;

    assert_eq!(
        project.executor.labels(TaskKind::Link),
        vec!["glob", "server", "server-exe"]
    );
    assert!(project.exists("server/libserver.a"));
    assert!(project.exists("bin/server"));

    project.executor.clear();
    let mut idle = project.orchestrator(config());
    with_timeout(idle.run(&order)).await?;
    idle.finish().await?;
    assert!(project.executor.executed().is_empty());

    project.touch("server/s.cpp");
    let mut third = project.orchestrator(config());
    with_timeout(third.run(&order)).await?;
    third.finish().await?;

    assert_eq!(project.executor.labels(TaskKind::Compile), vec!["server/s.cpp"]);
    assert_eq!(project.executor.labels(TaskKind::Link), vec!["server", "server-exe"]);
    Ok(())
}

#[tokio::test]
async fn logic_modules_link_against_their_dependencies() -> TestResult {
    init_tracing();
    let project = Project::new();
    project
        .add("glob/g.cpp", "")
        .add("logic/common/c.cpp", "")
        .add("logic/accounts/acc.cpp", "");
    let cfg = config();

    let tree = project.tree(&cfg);
    let link = LinkTask::new(&tree, &cfg, "logic/accounts");
    assert_eq!(link.link_target(), Some(Project::path("logic/accounts/libaccounts.so").as_path()));
    assert!(link.libraries.contains(&Project::path("logic/common/libcommon.so")));
    assert!(link.libraries.contains(&Project::path("glob/libglob.a")));

    let mut orchestrator = project.orchestrator(cfg);
    with_timeout(orchestrator.run(&targets(&["glob", "logic/common", "logic/accounts"]))).await?;
    orchestrator.finish().await?;

    assert_eq!(
        project.executor.labels(TaskKind::Link),
        vec!["glob", "logic/accounts", "logic/common"]
    );
    assert!(project.exists("logic/accounts/libaccounts.so"));
    Ok(())
}

#[tokio::test]
async fn unknown_target_is_skipped() -> TestResult {
    init_tracing();
    let project = Project::new();
    project.add("glob/a.cpp", "");

    let mut orchestrator = project.orchestrator(config());
    with_timeout(orchestrator.run(&targets(&["nowhere", "glob"]))).await?;
    let summary = orchestrator.finish().await?;

    assert!(summary.succeeded());
    assert_eq!(project.executor.labels(TaskKind::Compile), vec!["glob/a.cpp"]);
    Ok(())
}

#[tokio::test]
async fn status_reports_without_building() -> TestResult {
    init_tracing();
    let project = Project::new();
    project
        .add("glob/a.cpp", "")
        .add("glob/b.cpp", "")
        .add("glob/b.o", "");

    let orchestrator = project.orchestrator(config());
    let status = orchestrator.status(&targets(&["glob", "nowhere"]));
    orchestrator.finish().await?;

    assert_eq!(status[0].stale, vec!["glob/a.cpp"]);
    assert!(status[0].relink);
    assert!(!status[0].missing);
    assert!(status[1].missing);
    assert!(project.executor.executed().is_empty());
    Ok(())
}

#[tokio::test]
async fn clean_removes_objects_and_artifacts() -> TestResult {
    init_tracing();
    let project = Project::new();
    project
        .add("glob/a.cpp", "")
        .add("glob/b.cpp", "")
        .add("glob/keep.h", "");

    let mut orchestrator = project.orchestrator(config());
    with_timeout(orchestrator.run(&targets(&["glob"]))).await?;
    let removed = orchestrator.clean("glob")?;
    orchestrator.finish().await?;

    assert_eq!(removed, 3);
    assert!(!project.exists("glob/a.o"));
    assert!(!project.exists("glob/b.o"));
    assert!(!project.exists("glob/libglob.a"));
    assert!(project.exists("glob/a.cpp"));
    assert!(project.exists("glob/keep.h"));
    Ok(())
}

#[tokio::test]
async fn rebuild_cleans_then_compiles_everything() -> TestResult {
    init_tracing();
    let project = Project::new();
    project.add("glob/a.cpp", "").add("glob/b.cpp", "");

    let mut first = project.orchestrator(config());
    with_timeout(first.run(&targets(&["glob"]))).await?;
    first.finish().await?;
    project.executor.clear();

    let mut orchestrator = project.orchestrator(config());
    let command = Command::Rebuild {
        targets: targets(&["glob"]),
    };
    with_timeout(hbuild::execute(&mut orchestrator, &command)).await?;
    orchestrator.finish().await?;

    assert_eq!(
        project.executor.labels(TaskKind::Compile),
        vec!["glob/a.cpp", "glob/b.cpp"]
    );
    assert_eq!(project.executor.labels(TaskKind::Link), vec!["glob"]);
    Ok(())
}

#[tokio::test]
async fn dependency_cache_is_saved_and_reused() -> TestResult {
    use hbuild::fs::FileSystem;

    init_tracing();
    let project = Project::new();
    project
        .add("glob/b.h", "")
        .add("glob/a.cpp", "#include \"b.h\"\n")
        .add("glob/a.o", "");
    let cfg = || BuildConfigBuilder::new(ROOT).with_depcache().build();

    let mut first = project.orchestrator(cfg());
    with_timeout(first.run(&targets(&["glob"]))).await?;
    first.finish().await?;

    let cache = project
        .fs
        .contents(Project::path(".hbuild/depcache"))
        .expect("cache written");
    assert!(cache.starts_with("# hbuild depcache v1\n"));
    assert!(cache.contains("/proj/glob/a.cpp\t/proj/glob/b.h"));

    // Same mtime, different text: the cached include list still applies.
    let source = Project::path("glob/a.cpp");
    let modified = project.fs.stat(&source).expect("source exists").modified;
    project.fs.add_file_at(&source, "int a;\n", modified);
    project.touch("glob/b.h");
    project.executor.clear();

    let mut second = project.orchestrator(cfg());
    with_timeout(second.run(&targets(&["glob"]))).await?;
    second.finish().await?;

    assert_eq!(project.executor.labels(TaskKind::Compile), vec!["glob/a.cpp"]);
    Ok(())
}
