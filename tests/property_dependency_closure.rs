// tests/property_dependency_closure.rs

use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;

use hbuild::config::BuildConfig;
use hbuild_test_utils::{BuildConfigBuilder, Project, ROOT};

const HEADERS: usize = 6;

fn config() -> BuildConfig {
    BuildConfigBuilder::new(ROOT).build()
}

/// Headers reachable from `roots` over `edges`, roots included.
fn reachable(edges: &[Vec<usize>], roots: &[usize]) -> BTreeSet<usize> {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<usize> = roots.to_vec();
    while let Some(h) = stack.pop() {
        if seen.insert(h) {
            stack.extend(edges[h].iter().copied());
        }
    }
    seen
}

fn include_lines(targets: &[usize]) -> String {
    targets
        .iter()
        .map(|t| format!("#include \"h{t}.h\"\n"))
        .collect()
}

proptest! {
    #[test]
    fn closure_is_reachability_without_self_or_duplicates(
        edges in proptest::collection::vec(
            proptest::collection::vec(0..HEADERS, 0..4),
            HEADERS,
        ),
        roots in proptest::collection::vec(0..HEADERS, 0..4),
    ) {
        let project = Project::new();
        for (h, targets) in edges.iter().enumerate() {
            project.add(&format!("glob/h{h}.h"), &include_lines(targets));
        }
        project.add("glob/main.cpp", &include_lines(&roots));

        let tree = project.tree(&config());

        let main = tree.find_file("glob/main.cpp").unwrap();
        let closure: Vec<&str> = tree.dependencies(main).iter().map(|d| tree.file(*d).name()).collect();
        let unique: HashSet<&str> = closure.iter().copied().collect();
        prop_assert_eq!(unique.len(), closure.len());
        prop_assert!(!unique.contains("main.cpp"));

        let expected: BTreeSet<String> = reachable(&edges, &roots)
            .into_iter()
            .map(|h| format!("h{h}.h"))
            .collect();
        let actual: BTreeSet<String> = closure.iter().map(|s| s.to_string()).collect();
        prop_assert_eq!(actual, expected);

        for h in 0..HEADERS {
            let id = tree.find_file(&format!("glob/h{h}.h")).unwrap();
            let own = format!("h{h}.h");
            let names: Vec<&str> = tree.dependencies(id).iter().map(|d| tree.file(*d).name()).collect();
            prop_assert!(!names.contains(&own.as_str()));

            let mut expected: BTreeSet<usize> = reachable(&edges, &edges[h]);
            expected.remove(&h);
            let actual: BTreeSet<String> = names.iter().map(|s| s.to_string()).collect();
            let expected: BTreeSet<String> = expected.into_iter().map(|e| format!("h{e}.h")).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
