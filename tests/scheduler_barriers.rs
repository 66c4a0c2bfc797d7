// tests/scheduler_barriers.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use hbuild::config::WorkersSection;
use hbuild::sched::{BuildSignals, LinkOutcome, TaskExecutor, TaskScheduler};
use hbuild::tasks::{CompileTask, GenerateTask, LinkTask};
use hbuild::types::TaskKind;
use hbuild_test_utils::{BuildConfigBuilder, FakeExecutor, Project, ROOT, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn compile(name: &str) -> CompileTask {
    compile_in("glob", name)
}

fn compile_in(folder: &str, name: &str) -> CompileTask {
    CompileTask {
        folder: folder.to_string(),
        file: format!("{name}.cpp"),
        source: Project::path(&format!("{folder}/{name}.cpp")),
        object: Project::path(&format!("{folder}/{name}.o")),
        command: format!("c++ -c {name}.cpp"),
    }
}

fn start(executor: &FakeExecutor, compile_workers: usize) -> TaskScheduler {
    let executor: Arc<dyn TaskExecutor> = Arc::new(executor.clone());
    TaskScheduler::start(
        executor,
        WorkersSection {
            compile: compile_workers,
            generate: 1,
        },
        Arc::new(BuildSignals::default()),
    )
}

#[tokio::test]
async fn compile_barrier_waits_for_every_queued_task() -> TestResult {
    init_tracing();
    let project = Project::new();
    let executor = project.executor.clone().with_delay(Duration::from_millis(20));
    let scheduler = start(&executor, 3);

    for name in ["a", "b", "c", "d", "e"] {
        scheduler.add_compile(compile(name))?;
    }
    with_timeout(scheduler.wait_for_compiles()).await;

    for name in ["a", "b", "c", "d", "e"] {
        assert!(project.exists(&format!("glob/{name}.o")), "{name}.o written");
    }
    assert_eq!(scheduler.stats().compiled, 5);
    assert!(!scheduler.has_error());

    with_timeout(scheduler.shutdown()).await;
    assert!(scheduler.is_finished());
    Ok(())
}

#[tokio::test]
async fn barrier_on_an_idle_pool_returns_immediately() {
    init_tracing();
    let project = Project::new();
    let scheduler = start(&project.executor, 2);

    with_timeout(scheduler.wait_for_compiles()).await;
    with_timeout(scheduler.wait_for_generators()).await;
    with_timeout(scheduler.shutdown()).await;
}

#[tokio::test]
async fn empty_commands_are_dropped() -> TestResult {
    init_tracing();
    let project = Project::new();
    let scheduler = start(&project.executor, 2);

    let mut excluded = compile("skip");
    excluded.command.clear();
    scheduler.add_compile(excluded)?;
    with_timeout(scheduler.wait_for_compiles()).await;

    assert!(project.executor.executed().is_empty());
    with_timeout(scheduler.shutdown()).await;
    Ok(())
}

#[tokio::test]
async fn failure_stops_workers_and_skips_links() -> TestResult {
    init_tracing();
    let project = Project::new();
    project.add("glob/a.cpp", "").add("glob/b.cpp", "").add("glob/c.cpp", "");
    project.executor.fail_on("glob/a.cpp");

    let scheduler = start(&project.executor, 1);
    for name in ["a", "b", "c"] {
        scheduler.add_compile(compile(name))?;
    }
    with_timeout(scheduler.wait_for_compiles()).await;

    assert!(scheduler.has_error());
    assert_eq!(project.executor.count(TaskKind::Compile), 1);
    let stats = scheduler.stats();
    assert_eq!(stats.compile_errors, 1);
    assert_eq!(stats.compiled, 0);

    let cfg = BuildConfigBuilder::new(ROOT).build();
    let tree = project.tree(&cfg);
    let link = LinkTask::new(&tree, &cfg, "glob");
    assert!(!link.is_empty());
    let outcome = with_timeout(scheduler.add_link(link)).await?;
    assert_eq!(outcome, LinkOutcome::Skipped);
    assert_eq!(project.executor.count(TaskKind::Link), 0);

    with_timeout(scheduler.shutdown()).await;
    Ok(())
}

#[tokio::test]
async fn link_waits_for_compiles_in_other_folders() -> TestResult {
    init_tracing();
    let project = Project::new();
    project.add("glob/a.cpp", "");
    let cfg = BuildConfigBuilder::new(ROOT).build();
    let tree = project.tree(&cfg);
    let executor = project.executor.clone().with_delay(Duration::from_millis(20));
    let scheduler = start(&executor, 1);

    let clients = ["a", "b", "c", "d"];
    for name in clients {
        scheduler.add_compile(compile_in("client", name))?;
    }
    let outcome = with_timeout(scheduler.add_link(LinkTask::new(&tree, &cfg, "glob"))).await?;
    assert_eq!(outcome, LinkOutcome::Linked);

    for name in clients {
        assert!(project.exists(&format!("client/{name}.o")), "client/{name}.o written");
    }
    let kinds: Vec<TaskKind> = project.executor.executed().iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TaskKind::Compile,
            TaskKind::Compile,
            TaskKind::Compile,
            TaskKind::Compile,
            TaskKind::Link,
        ]
    );

    with_timeout(scheduler.shutdown()).await;
    Ok(())
}

#[tokio::test]
async fn generate_failure_stops_the_compile_pool() -> TestResult {
    init_tracing();
    let project = Project::new();
    project.executor.fail_on("glob/users.sql.xml");
    let scheduler = start(&project.executor, 2);

    scheduler.add_generate(GenerateTask {
        folder: "glob".to_string(),
        file: "users.sql.xml".to_string(),
        schema: Project::path("glob/users.sql.xml"),
        header: Project::path("glob/sqldo/users.h"),
        body: Project::path("glob/sqldo/users.cpp"),
        csharp: None,
        js: Vec::new(),
    })?;
    with_timeout(scheduler.wait_for_generators()).await;
    assert_eq!(scheduler.stats().generate_errors, 1);

    scheduler.add_compile(compile("a"))?;
    with_timeout(scheduler.wait_for_compiles()).await;

    assert_eq!(project.executor.count(TaskKind::Compile), 0);
    assert!(!project.exists("glob/a.o"));
    with_timeout(scheduler.shutdown()).await;
    Ok(())
}

#[tokio::test]
async fn link_without_inputs_is_nothing_to_link() -> TestResult {
    init_tracing();
    let project = Project::new();
    let cfg = BuildConfigBuilder::new(ROOT).build();
    let tree = project.tree(&cfg);
    let scheduler = start(&project.executor, 1);

    let outcome = with_timeout(scheduler.add_link(LinkTask::new(&tree, &cfg, "client"))).await?;
    assert_eq!(outcome, LinkOutcome::NothingToLink);
    assert!(project.executor.executed().is_empty());

    with_timeout(scheduler.shutdown()).await;
    Ok(())
}

#[tokio::test]
async fn failed_link_is_an_error() -> TestResult {
    init_tracing();
    let project = Project::new();
    project.add("glob/a.cpp", "");
    project.executor.fail_on("glob");
    let cfg = BuildConfigBuilder::new(ROOT).build();
    let tree = project.tree(&cfg);
    let scheduler = start(&project.executor, 1);

    let result = with_timeout(scheduler.add_link(LinkTask::new(&tree, &cfg, "glob"))).await;
    assert!(result.is_err());
    assert!(scheduler.has_error());
    assert_eq!(scheduler.stats().link_errors, 1);

    with_timeout(scheduler.shutdown()).await;
    Ok(())
}

#[tokio::test]
async fn queueing_after_finish_fails() {
    init_tracing();
    let project = Project::new();
    let scheduler = start(&project.executor, 1);
    scheduler.finish();

    assert!(scheduler.add_compile(compile("late")).is_err());
    with_timeout(scheduler.shutdown()).await;
    assert!(!project.exists("glob/late.o"));
}
