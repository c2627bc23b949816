//! Example issues list built with Tether.
//!
//! A repository issues page whose selectors declare the live resources they
//! need. Nothing in the page wires up subscriptions by hand: rendering a page
//! declares an `Issue` feed for `org/repo/page` and a `RepoDetails` watcher
//! for `(org, repo)`, and the engine opens and closes them as pages mount,
//! navigate and unmount.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  render ──▶ select_issues ──declares──▶ Issue(org/repo/page) │
//! │     │                                         │              │
//! │     │                                 activation dispatches  │
//! │     ▼                                         ▼              │
//! │  PageView ◀── Store::flush ◀──────── Dispatcher queue        │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod page;
mod store;
mod subscriptions;

pub use page::{IssuesListPage, PageView};
pub use store::{Action, AppState, Dispatcher, Issue, IssuesSlice, Store};
pub use subscriptions::{
    IssueKey, IssueKeyError, IssuesView, PER_PAGE, Subscriptions, TOTAL_ISSUES, fetch_page,
    select_issues, select_open_issues_count,
};
