//! The issues list page: one UI element with two reactive reads.

use tether_engine::engine::Engine;
use tether_engine::error::EngineError;
use tether_engine::site::ReactiveSite;

use crate::store::{Dispatcher, Store};
use crate::subscriptions::{
    IssueKey, IssuesView, Subscriptions, select_issues, select_open_issues_count,
};

/// What one render of the page produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    /// The page being shown.
    pub key: IssueKey,
    /// Issues and loading state.
    pub issues: IssuesView,
    /// Open issue count of the repository, once known.
    pub open_issues_count: Option<u32>,
}

/// An issues list for one repository page.
///
/// Call [`render`](Self::render) before [`mount`](Self::mount), the way a UI
/// framework renders an element before committing it.
#[derive(Debug)]
pub struct IssuesListPage {
    key: IssueKey,
    issues_site: Option<ReactiveSite<Dispatcher>>,
    count_site: Option<ReactiveSite<Dispatcher>>,
}

impl IssuesListPage {
    /// Creates an unrendered page.
    #[must_use]
    pub fn new(org: impl Into<String>, repo: impl Into<String>, page: u32) -> Self {
        Self {
            key: IssueKey::new(org, repo, page.max(1)),
            issues_site: None,
            count_site: None,
        }
    }

    /// Returns the page being shown.
    #[must_use]
    pub fn key(&self) -> &IssueKey {
        &self.key
    }

    /// Renders against the current state.
    ///
    /// # Errors
    ///
    /// Propagates engine errors from either read.
    pub fn render(
        &mut self,
        engine: &Engine<Dispatcher>,
        store: &Store,
        subscriptions: &Subscriptions,
    ) -> Result<PageView, EngineError> {
        let state = store.state();
        let issues = engine.use_reactive_value(
            &mut self.issues_site,
            &*state,
            select_issues(subscriptions, self.key.clone()),
        )?;
        let open_issues_count = engine.use_reactive_value(
            &mut self.count_site,
            &*state,
            select_open_issues_count(subscriptions, &self.key.org, &self.key.repo),
        )?;
        Ok(PageView {
            key: self.key.clone(),
            issues,
            open_issues_count,
        })
    }

    /// Commits the page: its declared resources become live.
    ///
    /// Every site is mounted even if an earlier one fails, so one broken read
    /// never leaves the rest of the page unsubscribed.
    ///
    /// # Errors
    ///
    /// Returns the first activation failure.
    pub fn mount(&mut self) -> Result<(), EngineError> {
        let mut first_error = None;
        for site in self.sites_mut() {
            if let Err(e) = site.mount() {
                tracing::warn!(consumer = %site.consumer_id(), error = %e, "mount failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Removes the page: everything it holds is released.
    pub fn unmount(&mut self) {
        for site in self.sites_mut() {
            site.unmount();
        }
    }

    /// Switches to another page. Takes effect on the next render.
    pub fn navigate(&mut self, page: u32) {
        tracing::info!(from = self.key.page, to = page, "navigate");
        self.key.page = page.max(1);
    }

    /// Number of resources this page holds.
    #[must_use]
    pub fn held_count(&self) -> usize {
        [&self.issues_site, &self.count_site]
            .into_iter()
            .flatten()
            .map(ReactiveSite::held_count)
            .sum()
    }

    fn sites_mut(&mut self) -> impl Iterator<Item = &mut ReactiveSite<Dispatcher>> {
        [&mut self.issues_site, &mut self.count_site]
            .into_iter()
            .flatten()
    }
}
