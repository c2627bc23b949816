//! Example issues list CLI.
//!
//! Walks two issue pages through a scripted session and logs every
//! subscription the engine opens and closes.
//!
//! # Usage
//!
//! ```bash
//! issues [org] [repo]
//! ```
//!
//! Set `TETHER_LOG=debug` to see engine internals.

use example::{IssuesListPage, PageView, Store, Subscriptions};
use tether_core::TracingConfig;
use tether_engine::engine::Engine;
use tether_engine::error::EngineError;

fn main() {
    TracingConfig::from_env().unwrap_or_default().init();

    let mut args = std::env::args().skip(1);
    let org = args.next().unwrap_or_else(|| "rust-lang".to_owned());
    let repo = args.next().unwrap_or_else(|| "rust".to_owned());

    if let Err(e) = run(&org, &repo) {
        tracing::error!(error = %e, "session failed");
        std::process::exit(1);
    }
}

fn run(org: &str, repo: &str) -> Result<(), EngineError> {
    let store = Store::new();
    let engine = Engine::new();
    engine.provide(store.dispatcher());
    let subscriptions = Subscriptions::new();

    let show = |page: &mut IssuesListPage| -> Result<PageView, EngineError> {
        let view = page.render(&engine, &store, &subscriptions)?;
        page.mount()?;
        store.flush();
        Ok(view)
    };

    let mut main_list = IssuesListPage::new(org, repo, 1);
    let mut sidebar = IssuesListPage::new(org, repo, 1);

    show(&mut main_list)?;
    log_view(&show(&mut main_list)?);
    show(&mut sidebar)?;

    main_list.navigate(2);
    show(&mut main_list)?;
    log_view(&show(&mut main_list)?);

    sidebar.unmount();
    main_list.unmount();
    store.flush();

    let stats = engine.registry().stats();
    tracing::info!(
        activations = stats.activations,
        cleanups = stats.cleanups,
        still_open = store.state().issues.open_feeds.len(),
        "session finished"
    );
    Ok(())
}

fn log_view(view: &PageView) {
    tracing::info!(
        page = %view.key,
        loading = view.issues.is_loading,
        issues = ?view.issues.issues.iter().map(|i| i.number).collect::<Vec<_>>(),
        pages = view.issues.page_count,
        open_issues = view.open_issues_count,
        "rendered"
    );
}
