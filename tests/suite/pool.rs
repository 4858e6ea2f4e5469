//! Config-driven pool setup and end-to-end rendering.

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures_util::future::join_all;
use quill_config::QuillConfig;
use quill_engine::{DispatchError, RenderDispatcher, RenderError, RenderRequest};
use quill_types::TagRegistry;

use crate::common::{ScanningRenderer, init_tracing, templates};

const CONFIG: &str = r##"
[dispatch]
workers = 3
drain_poll_interval_ms = 1
drain_max_interval_ms = 10

[tags]
indicator = "#"
openers = ["for", "if"]
closers = ["endfor", "endif"]
"##;

fn dispatcher_from(config: &QuillConfig) -> RenderDispatcher {
    let registry = Arc::new(config.tag_registry().clone());
    let store = templates(&[
        ("plain", "just prose"),
        ("list", "#for(x in xs): #(x) #endfor\n"),
        ("typo", "#fro(x in xs):"),
        ("cut", "intro #inc"),
    ]);
    let dispatcher = RenderDispatcher::with_policy(config.drain_policy());
    let built = dispatcher.initialize(config.pool_size(), |index| {
        ScanningRenderer::new(index, Arc::clone(&store), Arc::clone(&registry))
    });
    assert!(built);
    dispatcher
}

#[tokio::test]
async fn config_file_sizes_the_pool() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("quill.toml");
    fs::write(&path, CONFIG)?;

    let config = QuillConfig::load(&path)?;
    let dispatcher = dispatcher_from(&config);

    assert_eq!(dispatcher.worker_count(), 3);
    assert_eq!(dispatcher.policy(), config.drain_policy());
    assert!(dispatcher.is_drained());
    Ok(())
}

#[tokio::test]
async fn renders_rotate_across_workers() -> Result<()> {
    init_tracing();
    let dispatcher = dispatcher_from(&QuillConfig::from_toml_str(CONFIG)?);

    let mut outputs = Vec::new();
    for _ in 0..4 {
        let output = dispatcher.render(RenderRequest::without_context("list")).await?;
        outputs.push(String::from_utf8(output.into_bytes())?);
    }

    let tags: Vec<&str> = outputs.iter().map(|o| &o[..4]).collect();
    assert_eq!(tags, ["[w0]", "[w1]", "[w2]", "[w0]"]);
    assert!(dispatcher.is_drained());
    Ok(())
}

#[tokio::test]
async fn plain_templates_skip_tag_handling() -> Result<()> {
    let dispatcher = dispatcher_from(&QuillConfig::from_toml_str(CONFIG)?);
    let output = dispatcher.render(RenderRequest::without_context("plain")).await?;
    assert_eq!(output.as_bytes(), b"just prose");
    Ok(())
}

#[tokio::test]
async fn renderer_errors_reach_the_caller_unchanged() -> Result<()> {
    let dispatcher = dispatcher_from(&QuillConfig::from_toml_str(CONFIG)?);

    let err = dispatcher
        .render(RenderRequest::without_context("typo"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DispatchError::Render(RenderError::Syntax {
            template: "typo".to_string(),
            message: "unknown tag".to_string(),
        })
    );

    let err = dispatcher
        .render(RenderRequest::without_context("missing"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Render(RenderError::TemplateNotFound { ref name }) if name == "missing"
    ));

    // Failed renders still settle their slot.
    assert!(dispatcher.is_drained());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_renders_drain_completely() -> Result<()> {
    init_tracing();
    let dispatcher = Arc::new(dispatcher_from(&QuillConfig::from_toml_str(CONFIG)?));

    let names = ["plain", "list", "typo", "cut", "missing", "list"];
    let pending = (0..60)
        .map(|i| dispatcher.dispatch(RenderRequest::without_context(names[i % names.len()])))
        .collect::<Result<Vec<_>, _>>()?;

    // All dispatched, none run yet: load is spread evenly.
    assert_eq!(dispatcher.outstanding(), 60);
    for load in dispatcher.slot_loads() {
        assert_eq!(load.outstanding, 20, "slot {}", load.index);
    }

    let results = join_all(pending.into_iter().map(|p| tokio::spawn(p.run()))).await;
    let mut ok = 0;
    for joined in results {
        if joined?.is_ok() {
            ok += 1;
        }
    }
    assert_eq!(ok, 30);

    let waiter = Arc::clone(&dispatcher);
    let drained = tokio::task::spawn_blocking(move || waiter.drain_timeout(Duration::from_secs(5)))
        .await?;
    assert!(drained);
    assert_eq!(dispatcher.outstanding(), 0);
    Ok(())
}

#[test]
fn invalid_worker_count_never_builds_a_pool() {
    let err = QuillConfig::from_toml_str("[dispatch]\nworkers = 0\n").unwrap_err();
    assert!(err.to_string().contains("dispatch.workers"));

    let dispatcher = RenderDispatcher::new();
    let store = templates(&[]);
    let registry = Arc::new(TagRegistry::default());
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        dispatcher.initialize_with_count(0, |index| {
            ScanningRenderer::new(index, Arc::clone(&store), Arc::clone(&registry))
        })
    }));
    assert!(outcome.is_err());
    assert!(!dispatcher.is_initialized());
}
