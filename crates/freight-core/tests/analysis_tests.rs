use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use freight_core::aggregate::Inventory;
use freight_core::analysis::shared_dirs::analyze_shared_directories;
use freight_core::analysis::{MigrationPlan, SharedDirSettings};
use freight_core::scanner::list_candidate_dirs;
use freight_core::Error;

fn make_tree(root: &Path, layout: &[(&str, &[&str])]) -> Vec<PathBuf> {
    for (candidate, children) in layout {
        let dir = root.join(candidate);
        fs::create_dir_all(&dir).unwrap();
        for child in children.iter() {
            fs::create_dir_all(dir.join(child)).unwrap();
        }
    }
    list_candidate_dirs(root).unwrap()
}

fn write_scan(dir: &Path, size: u64) {
    fs::create_dir_all(dir.join(".freight")).unwrap();
    fs::write(
        dir.join(".freight/scan.json"),
        format!(r#"{{"size_bytes": {}, "file_count": 1}}"#, size),
    )
    .unwrap();
}

#[test]
fn test_shared_names_counted_once_per_candidate() {
    let tmp = tempdir().unwrap();
    let candidates = make_tree(
        tmp.path(),
        &[("u1", &["a", "b"]), ("u2", &["a", "c"]), ("u3", &["a"])],
    );

    let report = analyze_shared_directories(&candidates, &SharedDirSettings::default(), None);

    assert_eq!(report.total_candidates, 3);
    assert_eq!(report.unique_names(), 3);
    assert_eq!(report.shared.len(), 1);
    assert_eq!(report.shared[0].name, "a");
    assert_eq!(report.shared[0].count, 3);
    assert!((report.shared[0].percentage - 100.0).abs() < 1e-9);
}

#[test]
fn test_shared_ignores_implicit_and_configured_names() {
    let tmp = tempdir().unwrap();
    let candidates = make_tree(
        tmp.path(),
        &[
            ("u1", &[".ssh", "cache", "proj"]),
            ("u2", &[".ssh", "cache", "proj"]),
        ],
    );
    // .freight is created by the scan tool inside each candidate
    for dir in &candidates {
        fs::create_dir_all(dir.join(".freight")).unwrap();
    }

    let settings = SharedDirSettings {
        threshold: 2,
        ignore: vec!["cache".to_string()],
    };
    let report = analyze_shared_directories(&candidates, &settings, None);

    let names: Vec<&str> = report.shared.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["proj"]);
    assert!(!report.counts.contains_key(".freight"));
    assert!(!report.counts.contains_key(".ssh"));
    assert!(report.ignored.contains(&"cache".to_string()));
}

#[test]
fn test_shared_threshold_override_wins() {
    let tmp = tempdir().unwrap();
    let candidates = make_tree(
        tmp.path(),
        &[("u1", &["x", "y"]), ("u2", &["x", "y"]), ("u3", &["x"])],
    );

    let settings = SharedDirSettings::default();
    let report = analyze_shared_directories(&candidates, &settings, Some(3));

    assert_eq!(report.threshold, 3);
    let names: Vec<&str> = report.shared.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["x"]);
}

#[test]
fn test_shared_ranking_count_then_name() {
    let tmp = tempdir().unwrap();
    let candidates = make_tree(
        tmp.path(),
        &[
            ("u1", &["zeta", "alpha", "mid"]),
            ("u2", &["zeta", "alpha", "mid"]),
            ("u3", &["mid"]),
        ],
    );

    let report = analyze_shared_directories(&candidates, &SharedDirSettings::default(), None);
    let names: Vec<&str> = report.shared.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["mid", "alpha", "zeta"]);
}

#[test]
fn test_shared_skips_unreadable_candidate() {
    let tmp = tempdir().unwrap();
    let mut candidates = make_tree(tmp.path(), &[("u1", &["a"]), ("u2", &["a"])]);
    candidates.push(tmp.path().join("vanished"));

    let report = analyze_shared_directories(&candidates, &SharedDirSettings::default(), None);
    assert_eq!(report.inaccessible, vec![tmp.path().join("vanished")]);
    assert_eq!(report.shared[0].name, "a");
    assert_eq!(report.shared[0].count, 2);
}

#[test]
fn test_migration_plan_ascending_size() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("home");
    for (name, size) in [("a", 50), ("b", 10), ("c", 30)] {
        write_scan(&root.join(name), size);
    }
    fs::create_dir_all(root.join("d_unscanned")).unwrap();

    let inventory = Inventory::collect(&root).unwrap();
    let plan = MigrationPlan::build(&inventory, Some(Path::new("/mnt/new"))).unwrap();

    let order: Vec<(&str, u64)> = plan
        .entries
        .iter()
        .map(|e| (e.name.as_str(), e.size_bytes))
        .collect();
    assert_eq!(order, vec![("b", 10), ("c", 30), ("a", 50)]);
    assert_eq!(plan.total_size(), 90);
    assert_eq!(plan.entries[0].destination, PathBuf::from("/mnt/new/b"));
}

#[test]
fn test_migration_plan_equal_sizes_keep_name_order() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("home");
    for name in ["gamma", "alpha", "beta"] {
        write_scan(&root.join(name), 7);
    }

    let inventory = Inventory::collect(&root).unwrap();
    let plan = MigrationPlan::build(&inventory, Some(Path::new("/mnt/new"))).unwrap();
    let order: Vec<&str> = plan.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(order, vec!["alpha", "beta", "gamma"]);
}

#[test]
fn test_migration_plan_requires_scan_data() {
    let tmp = tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("raw")).unwrap();

    let inventory = Inventory::collect(tmp.path()).unwrap();
    assert!(matches!(
        MigrationPlan::build(&inventory, Some(Path::new("/mnt/new"))),
        Err(Error::NoScanData)
    ));
}
