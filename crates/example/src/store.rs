//! A minimal state store: state, actions, a queueing dispatcher.
//!
//! Activations run while a read function still borrows the state, so the
//! dispatcher only queues actions. [`Store::flush`] applies them afterwards.

use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::rc::Rc;

use crate::subscriptions::IssueKey;

/// A single issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Issue number.
    pub number: u32,
    /// Issue title.
    pub title: String,
}

/// State changes understood by [`AppState::reduce`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A live issue feed was opened.
    FeedOpened(IssueKey),
    /// A page of issues arrived.
    IssuesLoaded {
        /// Page the issues belong to.
        key: IssueKey,
        /// The issues on that page.
        issues: Vec<Issue>,
        /// Total number of pages.
        page_count: u32,
    },
    /// A live issue feed was closed.
    FeedClosed(IssueKey),
    /// The open issue count of a repository arrived.
    OpenIssuesCountLoaded {
        /// `org/repo`.
        repo: String,
        /// Number of open issues.
        count: u32,
    },
}

/// The issues slice.
#[derive(Debug, Clone, Default)]
pub struct IssuesSlice {
    /// Issue numbers per loaded page, keyed by `org/repo/page`.
    pub pages: BTreeMap<String, Vec<u32>>,
    /// All issues seen so far.
    pub issues_by_number: BTreeMap<u32, Issue>,
    /// Total number of pages per `org/repo`.
    pub page_count: BTreeMap<String, u32>,
    /// Feeds currently open.
    pub open_feeds: BTreeSet<String>,
}

/// Application state.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Issues and feeds.
    pub issues: IssuesSlice,
    /// Open issue counts per `org/repo`.
    pub open_issues_count: BTreeMap<String, u32>,
}

impl AppState {
    /// Applies one action.
    pub fn reduce(&mut self, action: Action) {
        match action {
            Action::FeedOpened(key) => {
                self.issues.open_feeds.insert(key.to_string());
            }
            Action::IssuesLoaded {
                key,
                issues,
                page_count,
            } => {
                let numbers = issues.iter().map(|issue| issue.number).collect();
                self.issues.pages.insert(key.to_string(), numbers);
                self.issues.page_count.insert(key.repo_path(), page_count);
                for issue in issues {
                    self.issues.issues_by_number.insert(issue.number, issue);
                }
            }
            Action::FeedClosed(key) => {
                self.issues.open_feeds.remove(&key.to_string());
            }
            Action::OpenIssuesCountLoaded { repo, count } => {
                self.open_issues_count.insert(repo, count);
            }
        }
    }
}

/// Cloneable handle that queues actions for the store.
///
/// This is the context value handed to every activation.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    queue: Rc<RefCell<VecDeque<Action>>>,
}

impl Dispatcher {
    /// Queues `action`.
    pub fn dispatch(&self, action: Action) {
        tracing::debug!(?action, "dispatch");
        self.queue.borrow_mut().push_back(action);
    }

    /// Number of queued actions.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    fn pop(&self) -> Option<Action> {
        self.queue.borrow_mut().pop_front()
    }
}

/// State plus its dispatcher.
#[derive(Debug, Default)]
pub struct Store {
    state: RefCell<AppState>,
    dispatcher: Dispatcher,
}

impl Store {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a dispatcher for this store.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// Borrows the current state.
    ///
    /// # Panics
    ///
    /// Panics if called during [`flush`](Self::flush).
    #[must_use]
    pub fn state(&self) -> Ref<'_, AppState> {
        self.state.borrow()
    }

    /// Applies queued actions in order. Returns how many were applied.
    pub fn flush(&self) -> usize {
        let mut applied = 0;
        while let Some(action) = self.dispatcher.pop() {
            self.state.borrow_mut().reduce(action);
            applied += 1;
        }
        applied
    }
}
