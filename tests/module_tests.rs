use std::cell::Cell;
use std::env;
use std::path::{Path, PathBuf};

use graphstow::{
    BuildOptions, GraphCache, Module, StowConfig, StowError, StowResult,
    config::{HOME_ENVVAR, NAME_ENVVAR, USE_APPDIRS_ENVVAR},
};
use parking_lot::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn edges() -> Vec<(String, String)> {
    [("a", "b"), ("b", "c")]
        .iter()
        .map(|&(u, v)| (u.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_ensure_graph_builds_once() {
    let dir = tempfile::tempdir().unwrap();
    let module = Module::new(dir.path().join("tool"), true).unwrap();
    let edges = edges();
    let calls = Cell::new(0);
    let source = || {
        calls.set(calls.get() + 1);
        edges.clone()
    };

    let graph: GraphCache<String> = module
        .ensure_graph(&["graph"], source, &BuildOptions::default(), false)
        .unwrap();
    assert_eq!(calls.get(), 3);
    assert_eq!(graph.out_edges(&"a".to_string()).unwrap(), vec!["b"]);
    assert!(dir.path().join("tool").join("graph").join("nodes.jsonl").is_file());

    let again: GraphCache<String> = module
        .ensure_graph(&["graph"], source, &BuildOptions::default(), false)
        .unwrap();
    assert_eq!(calls.get(), 3);
    assert_eq!(again.in_edges(&"c".to_string()).unwrap(), vec!["b"]);
}

#[test]
fn test_ensure_graph_force_rebuilds() {
    let dir = tempfile::tempdir().unwrap();
    let module = Module::new(dir.path(), true).unwrap();
    let first = edges();
    let _: GraphCache<String> = module
        .ensure_graph(&[], || first.clone(), &BuildOptions::default(), false)
        .unwrap();

    let second = vec![("x".to_string(), "y".to_string())];
    let graph: GraphCache<String> = module
        .ensure_graph(&[], || second.clone(), &BuildOptions::default(), true)
        .unwrap();
    assert!(!graph.contains(&"a".to_string()));
    assert_eq!(graph.out_edges(&"x".to_string()).unwrap(), vec!["y"]);
}

#[test]
fn test_submodule_and_join_name() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = StowConfig::default().with_home(dir.path());
    let module = Module::from_config(&cfg, "bio", &[], true).unwrap();
    let sub = module.submodule(&["chebi"], true).unwrap();
    assert!(sub.base().is_dir());
    let file = sub.join_name(&["raw"], "chebi.tsv", true).unwrap();
    assert_eq!(file, dir.path().join("bio").join("chebi").join("raw").join("chebi.tsv"));
    assert!(file.parent().unwrap().is_dir());
    assert!(!file.exists());
}

#[test]
fn test_ensure_readme_writes_once() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = StowConfig::default().with_home(dir.path().join("home"));
    let path = cfg.ensure_readme().unwrap();
    assert!(path.is_file());
    std::fs::write(&path, "custom").unwrap();
    cfg.ensure_readme().unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "custom");
}

#[test]
fn test_invalid_module_key() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = StowConfig::default().with_home(dir.path());
    let err = Module::from_config(&cfg, "no.dots", &[], true).unwrap_err();
    assert!(matches!(err, StowError::InvalidInput(_)));
}

#[test]
fn test_ensure_custom_runs_provider_once() {
    let dir = tempfile::tempdir().unwrap();
    let module = Module::new(dir.path(), true).unwrap();
    let calls = Cell::new(0);
    let provider = |path: &Path| -> StowResult<()> {
        calls.set(calls.get() + 1);
        std::fs::write(path, "made")?;
        Ok(())
    };

    let path = module.ensure_custom(&["raw"], "made.txt", false, provider).unwrap();
    assert_eq!(path, dir.path().join("raw").join("made.txt"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "made");
    module.ensure_custom(&["raw"], "made.txt", false, provider).unwrap();
    assert_eq!(calls.get(), 1);

    module.ensure_custom(&["raw"], "made.txt", true, provider).unwrap();
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_ensure_custom_requires_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let module = Module::new(dir.path(), true).unwrap();
    let err = module
        .ensure_custom(&[], "never.txt", false, |_| Ok(()))
        .unwrap_err();
    assert!(matches!(err, StowError::NotCreated(path) if path.ends_with("never.txt")));

    let err = module
        .ensure_custom(&[], "broken.txt", false, |_| {
            Err(StowError::invalid_input("provider failed"))
        })
        .unwrap_err();
    assert!(matches!(err, StowError::InvalidInput(_)));
}

#[test]
fn test_json_helpers_and_cached_json() {
    let dir = tempfile::tempdir().unwrap();
    let module = Module::new(dir.path(), true).unwrap();
    let value = serde_json::json!({"nodes": 3, "names": ["a", "b"]});
    module.dump_json(&["meta"], "summary.json", &value).unwrap();
    let loaded: serde_json::Value = module.load_json(&["meta"], "summary.json").unwrap();
    assert_eq!(loaded, value);
    assert!(module.load_json::<serde_json::Value>(&["meta"], "missing.json").is_err());

    let cached = module.cached_json::<Vec<u32>>(&["meta"], "degrees.json").unwrap();
    assert_eq!(cached.get_or_compute(|| Ok(vec![1, 2])).unwrap(), vec![1, 2]);
    let again = cached
        .get_or_compute(|| Err(StowError::invalid_input("recomputed")))
        .unwrap();
    assert_eq!(again, vec![1, 2]);
}

#[test]
fn test_empty_env_values_are_ignored() {
    let _guard = ENV_LOCK.lock();
    // SAFETY: environment access in this test binary is serialized by ENV_LOCK.
    unsafe {
        env::set_var(HOME_ENVVAR, "");
        env::set_var(NAME_ENVVAR, "");
        env::set_var("GRAPHSTOWEMPTY_HOME", "");
        env::remove_var(USE_APPDIRS_ENVVAR);
    }

    let cfg = StowConfig::from_env();
    assert!(cfg.home.is_none());
    assert_eq!(cfg.name, graphstow::config::NAME_DEFAULT);
    assert!(!cfg.module_homes.contains_key("GRAPHSTOWEMPTY"));
    let home = cfg.home(false).unwrap();
    assert!(home.ends_with(graphstow::config::NAME_DEFAULT));
    assert_eq!(cfg.base("graphstowempty", false).unwrap(), home.join("graphstowempty"));

    // SAFETY: as above.
    unsafe {
        env::remove_var(HOME_ENVVAR);
        env::remove_var(NAME_ENVVAR);
        env::remove_var("GRAPHSTOWEMPTY_HOME");
    }
}

#[test]
fn test_from_env_resolution() {
    let _guard = ENV_LOCK.lock();
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("stow-home");
    let custom = dir.path().join("custom-module");

    // SAFETY: environment access in this test binary is serialized by ENV_LOCK.
    unsafe {
        env::set_var(HOME_ENVVAR, &home);
        env::set_var(NAME_ENVVAR, "ignored");
        env::set_var("GRAPHSTOWTESTMOD_HOME", &custom);
        env::remove_var(USE_APPDIRS_ENVVAR);
    }

    let cfg = StowConfig::from_env();
    assert_eq!(cfg.home.as_deref(), Some(home.as_path()));
    assert_eq!(cfg.name, "ignored");
    assert!(!cfg.use_appdirs);
    assert_eq!(graphstow::get_home(true).unwrap(), home);
    assert!(home.is_dir());
    assert_eq!(graphstow::get_base("other", false).unwrap(), home.join("other"));
    assert_eq!(graphstow::get_base("graphstowtestmod", true).unwrap(), custom);
    assert!(custom.is_dir());

    let module = Module::from_key("other", &["nested"], true).unwrap();
    assert_eq!(module.base(), PathBuf::from(&home).join("other").join("nested"));

    // SAFETY: as above.
    unsafe {
        env::remove_var(HOME_ENVVAR);
        env::remove_var(NAME_ENVVAR);
        env::remove_var("GRAPHSTOWTESTMOD_HOME");
    }
}
