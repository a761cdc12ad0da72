//! End-to-end tests of the depscan binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const INDEX: &str = r#"{
  "nextcode": {
    "NeXTCode": { "kind": "interface", "path": "/sdk/NeXTCode.codeinterface" },
    "Foo": { "kind": "interface", "path": "/sdk/Foo.codeinterface", "imports": ["Bar"] },
    "A": { "kind": "interface", "path": "/sdk/A.codeinterface", "imports": ["B"] },
    "B": { "kind": "interface", "path": "/sdk/B.codeinterface", "imports": ["A"] }
  },
  "clang": {
    "Bar": { "moduleMap": "/sdk/Bar/module.modulemap" }
  }
}"#;

fn depscan(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("depscan").unwrap();
    cmd.current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("FORCE_COLOR");
    cmd
}

fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("modules.json"), INDEX).unwrap();
    temp
}

#[test]
fn scan_prints_graph_to_stdout() {
    let temp = project();

    let output = depscan(temp.path())
        .args(["scan", "--index", "modules.json", "--module-name", "App"])
        .args(["--import", "Foo", "--source-file", "/src/main.nc"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Scanned 4 modules for 'App'"))
        .get_output()
        .stdout
        .clone();

    let graph: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(graph["mainModuleName"], "App");
    let names: Vec<&str> = graph["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|module| module["moduleName"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        [
            "nextcodeTextual:App",
            "nextcodeTextual:NeXTCode",
            "nextcodeTextual:Foo",
            "clang:Bar"
        ]
    );
}

#[test]
fn scan_writes_output_file_and_cache() {
    let temp = project();

    depscan(temp.path())
        .args(["scan", "--index", "modules.json", "--module-name", "App"])
        .args(["--import", "Foo", "--serial"])
        .args(["-o", "out/graph.json", "--cache-path", "cache/scan.bin"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert!(temp.path().join("out/graph.json").is_file());
    assert!(temp.path().join("cache/scan.bin").is_file());

    // Second run starts from the saved cache and produces the same graph.
    let first = fs::read_to_string(temp.path().join("out/graph.json")).unwrap();
    depscan(temp.path())
        .args(["scan", "--index", "modules.json", "--module-name", "App"])
        .args(["--import", "Foo", "--serial"])
        .args(["-o", "out/again.json", "--cache-path", "cache/scan.bin"])
        .assert()
        .success();
    let second = fs::read_to_string(temp.path().join("out/again.json")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn missing_module_fails_with_hint() {
    let temp = project();

    depscan(temp.path())
        .args(["scan", "--index", "modules.json", "--module-name", "App"])
        .args(["--import", "Missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing"))
        .stderr(predicate::str::contains("Hint"));
}

#[test]
fn cycle_fails_with_chain() {
    let temp = project();

    depscan(temp.path())
        .args(["scan", "--index", "modules.json", "--module-name", "App"])
        .args(["--import", "A"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "A.codeinterface -> B.codeinterface -> A.codeinterface",
        ));
}

#[test]
fn missing_index_is_reported() {
    let temp = TempDir::new().unwrap();

    depscan(temp.path())
        .args(["scan", "--index", "nope.json", "--module-name", "App"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn prescan_lists_imports() {
    let temp = TempDir::new().unwrap();

    depscan(temp.path())
        .args(["prescan", "--module-name", "App", "--import", "Foo.Private"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"NeXTCode\""))
        .stdout(predicate::str::contains("\"Foo\""));
}

#[test]
fn config_file_is_discovered() {
    let temp = project();
    fs::write(
        temp.path().join("depscan.toml"),
        "[language]\nimplicit_stdlib_import = false\n",
    )
    .unwrap();

    depscan(temp.path())
        .args(["prescan", "--module-name", "App", "--import", "Foo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NeXTCode").not());
}

#[test]
fn batch_writes_each_entry_and_reports_failures() {
    let temp = project();
    fs::write(
        temp.path().join("batch.json"),
        r#"[
            {"nextcodeModuleName": "Foo", "output": "Foo.json"},
            {"clangModuleName": "Bar", "output": "Bar.json"},
            {"nextcodeModuleName": "Missing", "output": "Missing.json"}
        ]"#,
    )
    .unwrap();

    depscan(temp.path())
        .args(["batch", "--index", "modules.json", "--output-dir", "graphs", "batch.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 of 3 batch entries failed"));

    assert!(temp.path().join("graphs/Foo.json").is_file());
    assert!(temp.path().join("graphs/Bar.json").is_file());
    assert!(!temp.path().join("graphs/Missing.json").exists());
}

#[test]
fn quiet_mode_keeps_stderr_clean() {
    let temp = project();

    depscan(temp.path())
        .args(["--quiet", "scan", "--index", "modules.json", "--module-name", "App"])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}
