//! Scans driven by a module index read from disk.

mod helpers;

use depscan::{BatchScanInput, DiagnosticKind, ModuleDetailsEntry, ModuleIndex, ScanError};
use depscan_graph::ScanningService;
use helpers::{SDK_INDEX, app, test_config, tool_for, write_index};
use tempfile::TempDir;

#[test]
fn scans_index_loaded_from_disk() {
    let temp = TempDir::new().unwrap();
    let index = ModuleIndex::load(&write_index(temp.path(), SDK_INDEX)).unwrap();
    let (tool, diagnostics) = tool_for(index, test_config());

    let graph = tool.perform_module_scan(&app(&["Foo", "Util"])).unwrap();

    let names: Vec<&str> = graph.modules.iter().map(|m| m.module_name.as_str()).collect();
    assert_eq!(
        names,
        [
            "nextcodeTextual:App",
            "nextcodeTextual:NeXTCode",
            "nextcodeTextual:Foo",
            "nextcodeBinary:Util",
            "clang:Bar",
            "clang:Bar_Private",
        ]
    );
    assert_eq!(
        graph.modules[0].direct_dependencies,
        ["nextcodeTextual:Foo", "nextcodeTextual:NeXTCode", "nextcodeBinary:Util"]
    );
    assert!(!diagnostics.has_errors());
}

#[test]
fn graph_json_uses_the_documented_shape() {
    let index = ModuleIndex::from_json(SDK_INDEX).unwrap();
    let (tool, _) = tool_for(index, test_config());

    let graph = tool.perform_module_scan(&app(&["Foo"])).unwrap();
    let json: serde_json::Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();

    assert_eq!(json["mainModuleName"], "App");
    let foo = json["modules"]
        .as_array()
        .unwrap()
        .iter()
        .find(|module| module["moduleName"] == "nextcodeTextual:Foo")
        .unwrap();
    assert_eq!(
        foo["details"]["nextcode"]["moduleInterfacePath"],
        "/sdk/Foo.codeinterface"
    );
    let bar = json["modules"]
        .as_array()
        .unwrap()
        .iter()
        .find(|module| module["moduleName"] == "clang:Bar")
        .unwrap();
    assert_eq!(
        bar["details"]["clang"]["moduleMapPath"],
        "/sdk/Bar/module.modulemap"
    );
}

#[test]
fn bridging_header_of_main_module() {
    let index = ModuleIndex::from_json(SDK_INDEX).unwrap();
    let (tool, diagnostics) = tool_for(index, test_config());
    let input = app(&[]).bridging_header("/src/App/App-Bridging.h");

    let graph = tool.perform_module_scan(&input).unwrap();

    assert!(graph.module("clang:Shims").is_some());
    let ModuleDetailsEntry::Textual(details) = &graph.modules[0].details else {
        panic!("main module is textual");
    };
    let header = details.bridging_header.as_ref().unwrap();
    assert_eq!(header.module_dependencies, ["Shims"]);
    assert!(header.source_files.contains(&"/src/App/Support.h".to_string()));
    assert!(diagnostics.diagnostics().is_empty());
}

#[test]
fn missing_module_names_its_importer() {
    let index = ModuleIndex::from_json(SDK_INDEX).unwrap();
    let (tool, diagnostics) = tool_for(index, test_config());

    let err = tool.perform_module_scan(&app(&["Missing"])).unwrap_err();

    assert!(matches!(err, ScanError::ModuleNotFound { ref name, .. } if name == "Missing"));
    assert!(err.to_string().contains("Missing"));
    assert_eq!(diagnostics.error_count(), 1);
    assert!(diagnostics.diagnostics().iter().any(|d| matches!(
        &d.kind,
        DiagnosticKind::ImportedByMainModule { main_module } if main_module == "App"
    )));
}

#[test]
fn batch_entries_share_a_persisted_service() {
    let temp = TempDir::new().unwrap();
    let index = ModuleIndex::from_json(SDK_INDEX).unwrap();
    let (tool, _) = tool_for(index.clone(), test_config());

    let batch = BatchScanInput::parse_list(
        r#"[
            {"nextcodeModuleName": "Foo", "output": "Foo.json"},
            {"clangModuleName": "Bar", "output": "Bar.json"},
            {"nextcodeModuleName": "Nope", "output": "Nope.json"}
        ]"#,
    )
    .unwrap();
    let results = tool.perform_batch_module_scan(&batch);
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(results[2].is_err());

    let cache_path = temp.path().join("scan-cache.bin");
    tool.service().save(&cache_path).unwrap();
    let service = std::sync::Arc::new(ScanningService::load(&cache_path).unwrap());
    let context = tool.config().context_hash();
    assert_eq!(
        service.module_count(&context).unwrap(),
        tool.service().module_count(&context).unwrap()
    );

    let (reloaded, _) = tool_for(index, test_config());
    let reloaded = reloaded.with_service(service);
    let again = reloaded.perform_batch_module_scan(&batch[..1]);
    assert_eq!(again[0].as_ref().unwrap(), results[0].as_ref().unwrap());
}
