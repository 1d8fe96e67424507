//! Project build integration tests
//!
//! Builds throwaway project trees on disk and drives them through discovery,
//! dependency ordering, compilation, asset bundling and snapshots.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use baymake::build::{AssetBundler, CompileError, CompileOutcome, Compiler, SkipReason};
use baymake::graph::DependencyError;
use baymake::project::{Project, ProjectError};
use baymake::snapshot::ProjectSnapshot;
use baymake::translate::{ParseError, Parser, TranslatorRegistry};

// ============================================================================
// Test Utilities
// ============================================================================

/// Create a test file with content.
fn create_test_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut file = File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

/// One statement per non-empty line; a line starting with `!` is a syntax error.
struct LineParser;

impl Parser for LineParser {
    type Ast = Vec<String>;

    fn parse(&self, content: &str, _path: &Path) -> Result<Vec<String>, ParseError> {
        let mut statements = Vec::new();
        for (i, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.starts_with('!') {
                return Err(ParseError::at(i + 1, 1, "unexpected '!'"));
            }
            if !line.is_empty() {
                statements.push(line.to_string());
            }
        }
        Ok(statements)
    }
}

fn translators() -> TranslatorRegistry<Vec<String>> {
    TranslatorRegistry::new()
        .with("php", |ast: &Vec<String>| format!("<?php\n{};", ast.join(";\n")))
        .with("es6", |ast: &Vec<String>| ast.join(";\n"))
}

/// A project with a runtime library, a ui group and a web application.
///
/// ```text
/// project.json
/// lib/Runtime   (group ui)
/// lib/Widgets   (group ui, requires Runtime)
/// app           (requires Widgets, only es6)
/// ```
fn create_test_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    create_test_file(
        root,
        "project.json",
        r#"{
            // lenient syntax is accepted
            "name": "Shop",
            "description": "Demo shop",
            "type": "web",
            "languages": ["bay", "php", "es6"],
            "assets": [
                {"dest": "public/ui.js", "modules": ["@ui"]},
                {"dest": "public/app.js", "modules": ["App", "@ui"]},
            ],
            "modules": [
                {"src": "lib", "type": "folder"},
                {"src": "app"},
            ],
        }"#,
    );
    create_test_file(
        root,
        "lib/Widgets/module.json",
        r#"{
            "name": "Widgets",
            "src": "src",
            "dest": {"php": "out/php", "es6": "out/es6"},
            "groups": ["ui"],
            "require": ["Runtime"],
            "assets": ["/Button.bay"],
        }"#,
    );
    create_test_file(
        root,
        "lib/Runtime/module.json",
        r#"{
            "name": "Runtime",
            "src": "src",
            "dest": {"php": "out/php", "es6": "out/es6"},
            "groups": ["ui"],
            "exclude": ["^/tests/"],
            "assets": ["/rtl.bay", "/polyfill.js"],
        }"#,
    );
    create_test_file(
        root,
        "app/module.json",
        r#"{
            "name": "App",
            "src": "src",
            "dest": {"es6": "build"},
            "require": ["Widgets"],
            "assets": ["/main.bay"],
        }"#,
    );

    create_test_file(root, "lib/Runtime/src/rtl.bay", "rtl init");
    create_test_file(root, "lib/Runtime/src/polyfill.js", "polyfill()");
    create_test_file(root, "lib/Runtime/src/tests/Check.bay", "check");
    create_test_file(root, "lib/Widgets/src/Button.bay", "button\nrender");
    create_test_file(root, "app/src/main.bay", "main");

    temp
}

// ============================================================================
// Discovery
// ============================================================================

#[test]
fn test_read_project() {
    let temp = create_test_project();
    let project = Project::read(temp.path()).unwrap();

    assert_eq!(project.name(), "Shop");
    assert_eq!(project.kind(), "web");
    assert_eq!(project.modules().names(), vec!["Runtime", "Widgets", "App"]);
    assert_eq!(project.target_languages().collect::<Vec<_>>(), vec!["php", "es6"]);
}

#[test]
fn test_find_project_from_nested_directory() {
    let temp = create_test_project();
    let project = Project::find(temp.path().join("lib/Widgets/src")).unwrap();
    assert_eq!(project.root(), temp.path());

    let file = temp.path().join("lib/Widgets/src/Button.bay");
    assert_eq!(project.find_module_by_file(&file).unwrap().name(), "Widgets");
}

#[test]
fn test_find_project_not_found() {
    let temp = TempDir::new().unwrap();
    let result = Project::find(temp.path());
    assert!(matches!(result, Err(ProjectError::NotFound(_))));
}

#[test]
fn test_class_name_resolution() {
    let temp = create_test_project();
    let project = Project::read(temp.path()).unwrap();
    let widgets = project.get_module("Widgets").unwrap();

    assert_eq!(
        widgets.resolve_class_name("Widgets.Forms.Input"),
        Some(temp.path().join("lib/Widgets/src/Forms/Input.bay"))
    );
    assert_eq!(widgets.resolve_class_name("Runtime.Input"), None);
}

#[test]
fn test_questionable_project_settings_still_load() {
    let temp = create_test_project();
    let root = temp.path();
    create_test_file(
        root,
        "project.json",
        r#"{
            "name": "Shop",
            "languages": ["bay", "es6"],
            "assets": [{"dest": "public/none.js", "modules": []}],
            "watch": {"debounce_ms": 0},
            "modules": [{"src": "lib", "type": "folder"}, {"src": "app"}],
        }"#,
    );

    let project = Project::read(root).unwrap();
    assert_eq!(project.modules().names(), vec!["Runtime", "Widgets", "App"]);
    assert!(project.resolve_asset_modules(&project.assets()[0]).unwrap().is_empty());
}

// ============================================================================
// Ordering
// ============================================================================

/// Every module reachable from `name` through `require`, requested or not.
fn reachable(project: &Project, name: &str) -> Vec<String> {
    let graph = project.dependency_graph();
    let mut seen = Vec::new();
    let mut stack = vec![name.to_string()];
    while let Some(next) = stack.pop() {
        for dep in graph.requires(&next) {
            if !seen.contains(dep) {
                seen.push(dep.clone());
                stack.push(dep.clone());
            }
        }
    }
    seen
}

#[test]
fn test_order_follows_unrequested_intermediates() {
    let temp = create_test_project();
    let project = Project::read(temp.path()).unwrap();

    // App -> Widgets -> Runtime, with Widgets left out.
    let order = project.sort_required_modules(&["App", "Runtime"]).unwrap();
    assert_eq!(order, vec!["Runtime", "App"]);

    for (i, name) in order.iter().enumerate() {
        for dep in reachable(&project, name) {
            if let Some(j) = order.iter().position(|n| *n == dep) {
                assert!(j < i, "{dep} must precede {name} in {order:?}");
            }
        }
    }
}

#[test]
fn test_asset_bundle_orders_through_unlisted_module() {
    let temp = create_test_project();
    let root = temp.path();
    create_test_file(
        root,
        "project.json",
        r#"{
            "name": "Shop",
            "languages": ["bay", "es6"],
            "assets": [{"dest": "public/thin.js", "modules": ["App", "Runtime"]}],
            "modules": [{"src": "lib", "type": "folder"}, {"src": "app"}],
        }"#,
    );
    let project = Project::read(root).unwrap();
    let compiler = Compiler::new(&project, LineParser, translators());
    compiler.compile_all().unwrap();

    let asset = &project.assets()[0];
    assert_eq!(project.resolve_asset_modules(asset).unwrap(), vec!["Runtime", "App"]);

    AssetBundler::new(&project).build_all().unwrap();
    assert_eq!(
        fs::read_to_string(root.join("public/thin.js")).unwrap(),
        "rtl init\npolyfill()\nmain\n"
    );
}

#[test]
fn test_group_requirement_orders_group_members_first() {
    let temp = create_test_project();
    let root = temp.path();
    create_test_file(
        root,
        "app/module.json",
        r#"{"name": "App", "src": "src", "dest": {"es6": "build"}, "require": ["@ui"]}"#,
    );
    let project = Project::read(root).unwrap();

    assert_eq!(
        project.sort_required_modules(&["App", "Widgets", "Runtime"]).unwrap(),
        vec!["Runtime", "Widgets", "App"]
    );
    assert_eq!(project.sort_required_modules(&["App", "Runtime"]).unwrap(), vec!["Runtime", "App"]);
}

// ============================================================================
// Compilation
// ============================================================================

#[test]
fn test_compile_all() {
    let temp = create_test_project();
    let root = temp.path();
    let project = Project::read(root).unwrap();
    let compiler = Compiler::new(&project, LineParser, translators());

    let result = compiler.compile_all().unwrap();
    assert!(result.is_success(), "{}", result.summary());

    let order: Vec<&str> = result.files.iter().map(|f| f.module.as_str()).collect();
    assert_eq!(order, vec!["Runtime", "Runtime", "Runtime", "Widgets", "App"]);

    assert_eq!(
        fs::read_to_string(root.join("lib/Widgets/out/php/Button.php")).unwrap(),
        "<?php\nbutton;\nrender;"
    );
    assert_eq!(
        fs::read_to_string(root.join("lib/Widgets/out/es6/Button.js")).unwrap(),
        "button;\nrender"
    );
    assert!(root.join("lib/Runtime/out/es6/polyfill.js").exists());
    assert!(!root.join("lib/Runtime/out/php/polyfill.js").exists());
    assert!(!root.join("lib/Runtime/out/es6/tests/Check.js").exists());
    assert!(root.join("app/build/main.js").exists());
    assert!(!root.join("app/build/main.php").exists());
}

#[test]
fn test_parse_error_reports_file_and_keeps_siblings() {
    let temp = create_test_project();
    let root = temp.path();
    create_test_file(root, "lib/Widgets/src/Broken.bay", "fine\n! nope");
    let project = Project::read(root).unwrap();
    let compiler = Compiler::new(&project, LineParser, translators());

    let result = compiler.compile_module("Widgets").unwrap();
    assert_eq!(result.failed_count(), 1);
    assert_eq!(result.success_count(), 1);

    let failure = &result.failures()[0];
    assert_eq!(failure.label(), "Widgets:/Broken.bay");
    assert!(result.summary().contains("2:1: unexpected '!'"));
    assert!(!root.join("lib/Widgets/out/php/Broken.php").exists());
    assert!(root.join("lib/Widgets/out/php/Button.php").exists());
}

#[test]
fn test_compile_file_outside_source_root() {
    let temp = create_test_project();
    let project = Project::read(temp.path()).unwrap();
    let compiler = Compiler::new(&project, LineParser, translators());

    let outcome = compiler.compile_file(&temp.path().join("lib/Widgets/module.json")).unwrap();
    assert_eq!(outcome, CompileOutcome::Skipped(SkipReason::OutsideModule));
}

#[test]
fn test_compile_single_language_without_destination() {
    let temp = create_test_project();
    let project = Project::read(temp.path()).unwrap();
    let compiler = Compiler::new(&project, LineParser, translators());
    let app = project.get_module("App").unwrap();

    let outcome = compiler.compile(app, "/main.bay", Some("php")).unwrap();
    assert_eq!(outcome, CompileOutcome::Skipped(SkipReason::NoOutputs));
}

#[test]
fn test_dependency_cycle_is_fatal() {
    let temp = create_test_project();
    let root = temp.path();
    create_test_file(
        root,
        "lib/Runtime/module.json",
        r#"{"name": "Runtime", "src": "src", "require": ["Widgets"]}"#,
    );
    let project = Project::read(root).unwrap();
    let compiler = Compiler::new(&project, LineParser, translators());

    let err = compiler.compile_all().unwrap_err();
    match err {
        CompileError::Dependency(DependencyError::Cycle { chain }) => {
            assert_eq!(chain.first(), chain.last());
            assert!(chain.contains(&"Runtime".to_string()));
            assert!(chain.contains(&"Widgets".to_string()));
        }
        other => panic!("expected cycle, got {other}"),
    }
}

// ============================================================================
// Assets
// ============================================================================

#[test]
fn test_build_assets_after_compile() {
    let temp = create_test_project();
    let root = temp.path();
    let project = Project::read(root).unwrap();
    let compiler = Compiler::new(&project, LineParser, translators());
    compiler.compile_all().unwrap();

    let written = AssetBundler::new(&project).build_all().unwrap();
    assert_eq!(written, vec![root.join("public/ui.js"), root.join("public/app.js")]);

    assert_eq!(
        fs::read_to_string(root.join("public/ui.js")).unwrap(),
        "rtl init\npolyfill()\nbutton;\nrender\n"
    );
    assert_eq!(
        fs::read_to_string(root.join("public/app.js")).unwrap(),
        "rtl init\npolyfill()\nbutton;\nrender\nmain\n"
    );
}

#[test]
fn test_update_assets_for_changed_module() {
    let temp = create_test_project();
    let root = temp.path();
    let project = Project::read(root).unwrap();
    let compiler = Compiler::new(&project, LineParser, translators());
    let app = project.get_module("App").unwrap();

    compiler.compile(app, "/main.bay", None).unwrap();
    let written = AssetBundler::new(&project).update_assets(app).unwrap();

    assert_eq!(written, vec![root.join("public/app.js")]);
    assert!(!root.join("public/ui.js").exists());
    // Runtime's raw polyfill still passes through; nothing else is compiled yet.
    assert_eq!(fs::read_to_string(root.join("public/app.js")).unwrap(), "polyfill()\nmain\n");
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn test_snapshot_restores_equivalent_project() {
    let temp = create_test_project();
    let root = temp.path();
    let project = Project::read(root).unwrap();

    let path = root.join(".cache/snapshot.json");
    ProjectSnapshot::capture(&project).save(&path).unwrap();
    let restored = ProjectSnapshot::load(&path).unwrap().unwrap().restore();

    assert_eq!(restored.modules().names(), project.modules().names());
    assert_eq!(
        restored.resolve_asset_modules(&restored.assets()[1]).unwrap(),
        vec!["Runtime", "Widgets", "App"]
    );

    let compiler = Compiler::new(&restored, LineParser, translators());
    assert!(compiler.compile_all().unwrap().is_success());
}
