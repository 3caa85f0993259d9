//! End-to-end bootstrap over a real module tree on disk.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use appshell::{
    Bootstrap, BootstrapCtx, DesktopHost, FsModuleFetcher, PathResolver, BASE_APP_TYPE,
};

fn write_module(root: &Path, rel: &str, json: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, json).unwrap();
}

/// Three-module tree: main pulls in two view modules, one of which links a
/// subtype under a type the other defines, so wiring order matters.
fn demo_tree(root: &Path) {
    write_module(
        root,
        "modules/app/demo/main.json",
        r#"{
            "requires": ["shell.app.demo.base_view", "shell.app.demo.home_view"],
            "defines": ["app.demo"],
            "links": [{"child": "app.demo", "parent": "app.base"}],
            "app": "app.demo"
        }"#,
    );
    write_module(
        root,
        "modules/app/demo/base_view.json",
        r#"{"defines": ["view.base"]}"#,
    );
    write_module(
        root,
        "modules/app/demo/home_view.json",
        r#"{
            "requires": ["shell.app.demo.base_view"],
            "defines": ["view.home"],
            "links": [{"child": "view.home", "parent": "view.base"}]
        }"#,
    );
}

fn demo_bootstrap(root: &Path) -> (Arc<BootstrapCtx>, Bootstrap) {
    let ctx = BootstrapCtx::new();
    let fetcher = Arc::new(FsModuleFetcher::new(root, Arc::clone(&ctx)));
    let bootstrap = Bootstrap::new(
        Arc::clone(&ctx),
        PathResolver::new(),
        fetcher,
        Arc::new(DesktopHost::new()),
    );
    (ctx, bootstrap)
}

#[tokio::test(start_paused = true)]
async fn bootstrap_from_disk_starts_the_application() {
    let dir = tempfile::tempdir().unwrap();
    demo_tree(dir.path());

    let (ctx, mut bootstrap) = demo_bootstrap(dir.path());
    let handle = bootstrap.start("demo").await.unwrap();
    drop(handle);

    let stats = ctx.tracker().stats();
    assert_eq!(stats.required, 3);
    assert_eq!(stats.completed, 3);
    assert_eq!(stats.failed, 0);

    let registry = bootstrap.registry().read();
    assert_eq!(registry.parent_of("app.demo"), Some(BASE_APP_TYPE));
    // home_view's link ran after base_view's define, whatever order the
    // two fetches finished in.
    assert_eq!(registry.parent_of("view.home"), Some("view.base"));
}

#[tokio::test(start_paused = true)]
async fn missing_dependency_fails_open() {
    let dir = tempfile::tempdir().unwrap();
    write_module(
        dir.path(),
        "modules/app/partial/main.json",
        r#"{
            "requires": ["shell.app.partial.missing"],
            "defines": ["app.partial"],
            "links": [{"child": "app.partial", "parent": "app.base"}],
            "app": "app.partial"
        }"#,
    );

    let (ctx, mut bootstrap) = demo_bootstrap(dir.path());
    // The missing manifest is a fetch failure, not a hang: the tracker
    // settles as completed-with-error and the app still starts.
    let handle = bootstrap.start("partial").await.unwrap();
    drop(handle);

    let stats = ctx.tracker().stats();
    assert_eq!(stats.required, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
}

#[tokio::test(start_paused = true)]
async fn prebundled_framework_modules_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    // No modules/util/log.json on disk; the bundled resolver never asks
    // for it.
    write_module(
        dir.path(),
        "modules/app/lean/main.json",
        r#"{
            "requires": ["shell.util.log"],
            "defines": ["app.lean"],
            "links": [{"child": "app.lean", "parent": "app.base"}],
            "app": "app.lean"
        }"#,
    );

    let ctx = BootstrapCtx::new();
    let fetcher = Arc::new(FsModuleFetcher::new(dir.path(), Arc::clone(&ctx)));
    let mut bootstrap = Bootstrap::new(
        Arc::clone(&ctx),
        PathResolver::new().with_bundled(true),
        fetcher,
        Arc::new(DesktopHost::new()),
    );
    bootstrap.start("lean").await.unwrap();

    let stats = ctx.tracker().stats();
    assert_eq!(stats.required, 1);
    assert_eq!(stats.completed, 1);
}

#[tokio::test(start_paused = true)]
async fn malformed_manifest_counts_as_failed() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "modules/app/broken/main.json", "{ not json");

    let (ctx, mut bootstrap) = demo_bootstrap(dir.path());
    // The root itself fails, so nothing ever defines the application.
    let err = bootstrap.start("broken").await.unwrap_err();
    assert!(err.to_string().contains("was not defined"));
    assert_eq!(ctx.tracker().stats().failed, 1);
}
