//! Resources the issues list declares, and the selectors that declare them.

use core::fmt;
use core::str::FromStr;
use tether_engine::cleanup::Cleanup;
use tether_engine::collector::Collector;
use tether_engine::intent::ResourceType;
use tether_engine::memo::{ParameterizedIntent, define_parameterized_intent};
use tether_engine::selector::declaring;

use crate::store::{Action, AppState, Dispatcher, Issue};

/// Issues shown per page.
pub const PER_PAGE: u32 = 5;

/// Issues every simulated repository has.
pub const TOTAL_ISSUES: u32 = 18;

/// Identifies one page of a repository's issues: `org/repo/page`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IssueKey {
    /// Organization.
    pub org: String,
    /// Repository.
    pub repo: String,
    /// 1-based page number.
    pub page: u32,
}

impl IssueKey {
    /// Creates a key.
    #[must_use]
    pub fn new(org: impl Into<String>, repo: impl Into<String>, page: u32) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
            page,
        }
    }

    /// Returns `org/repo`.
    #[must_use]
    pub fn repo_path(&self) -> String {
        format!("{}/{}", self.org, self.repo)
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.org, self.repo, self.page)
    }
}

/// Error parsing an [`IssueKey`].
#[derive(Debug, thiserror::Error)]
#[error("malformed issue key `{0}`, expected `org/repo/page`")]
pub struct IssueKeyError(String);

impl FromStr for IssueKey {
    type Err = IssueKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || IssueKeyError(s.to_owned());
        let mut parts = s.split('/');
        let (Some(org), Some(repo), Some(page), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        if org.is_empty() || repo.is_empty() {
            return Err(malformed());
        }
        let page = page.parse().map_err(|_| malformed())?;
        Ok(Self::new(org, repo, page))
    }
}

/// Simulates fetching one page of issues.
#[must_use]
pub fn fetch_page(key: &IssueKey) -> Vec<Issue> {
    let first = key.page.saturating_sub(1) * PER_PAGE + 1;
    let last = (key.page * PER_PAGE).min(TOTAL_ISSUES);
    (first..=last)
        .map(|number| Issue {
            number,
            title: format!("{} issue #{number}", key.repo),
        })
        .collect()
}

/// The resource types of the issues list.
#[derive(Debug, Clone)]
pub struct Subscriptions {
    /// Live issue feed, keyed `org/repo/page`.
    pub issue_feed: ResourceType<Dispatcher>,
    /// Open issue count watcher, one per `(org, repo)`.
    pub repo_details: ParameterizedIntent<Dispatcher, (String, String)>,
}

impl Default for Subscriptions {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscriptions {
    /// Creates the resource types.
    #[must_use]
    pub fn new() -> Self {
        let issue_feed = ResourceType::try_new("Issue", |key: &str, dispatch: &Dispatcher| {
            let key: IssueKey = key.parse()?;
            tracing::info!(%key, "subscribe");
            dispatch.dispatch(Action::FeedOpened(key.clone()));
            dispatch.dispatch(Action::IssuesLoaded {
                issues: fetch_page(&key),
                page_count: TOTAL_ISSUES.div_ceil(PER_PAGE),
                key: key.clone(),
            });

            let dispatch = dispatch.clone();
            Ok(Cleanup::new(move || {
                tracing::info!(%key, "unsubscribe");
                dispatch.dispatch(Action::FeedClosed(key));
            }))
        });

        let repo_details = define_parameterized_intent(
            "RepoDetails",
            |(org, repo): (String, String)| {
                move |dispatch: &Dispatcher| {
                    let repo = format!("{org}/{repo}");
                    tracing::info!(%repo, "watching repository details");
                    dispatch.dispatch(Action::OpenIssuesCountLoaded {
                        repo: repo.clone(),
                        count: TOTAL_ISSUES,
                    });
                    Cleanup::new(move || tracing::info!(%repo, "stopped watching repository details"))
                }
            },
        );

        Self {
            issue_feed,
            repo_details,
        }
    }
}

/// What the issues list renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuesView {
    /// Issues on the current page.
    pub issues: Vec<Issue>,
    /// `true` until the page has arrived.
    pub is_loading: bool,
    /// Total pages, once known.
    pub page_count: Option<u32>,
}

impl IssuesView {
    fn from_state(state: &AppState, key: &IssueKey) -> Self {
        let slice = &state.issues;
        let numbers = slice.pages.get(&key.to_string());
        Self {
            issues: numbers
                .into_iter()
                .flatten()
                .filter_map(|n| slice.issues_by_number.get(n).cloned())
                .collect(),
            is_loading: numbers.is_none(),
            page_count: slice.page_count.get(&key.repo_path()).copied(),
        }
    }
}

/// Selects the issues of `key`, declaring its live feed.
pub fn select_issues(
    subscriptions: &Subscriptions,
    key: IssueKey,
) -> impl Fn(&AppState, &Collector<Dispatcher>) -> IssuesView {
    let intent = subscriptions.issue_feed.intent(key.to_string());
    declaring(intent, move |state: &AppState| IssuesView::from_state(state, &key))
}

/// Selects the open issue count of `org/repo`, declaring its details watcher.
pub fn select_open_issues_count(
    subscriptions: &Subscriptions,
    org: &str,
    repo: &str,
) -> impl Fn(&AppState, &Collector<Dispatcher>) -> Option<u32> {
    let intent = subscriptions.repo_details.get((org, repo));
    let path = format!("{org}/{repo}");
    declaring(intent, move |state: &AppState| {
        state.open_issues_count.get(&path).copied()
    })
}
