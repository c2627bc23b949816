//! Adapters from plain state selectors to read functions.
//!
//! A read function has the shape `Fn(&S, &Collector<C>) -> T`. Most state
//! selectors only need the state; these helpers lift them into that shape.

use crate::collector::Collector;
use crate::intent::Intent;

/// Wraps `selector` so that every evaluation first declares `intent`.
///
/// ```
/// use tether_engine::cleanup::Cleanup;
/// use tether_engine::engine::Engine;
/// use tether_engine::intent::ResourceType;
/// use tether_engine::selector::declaring;
///
/// let issues = ResourceType::new("issues", |_key: &str, _ctx: &()| Cleanup::None);
/// let count = declaring(issues.intent("acme/widgets/1"), |list: &Vec<u32>| list.len());
///
/// let engine = Engine::new();
/// engine.provide(());
/// let mut site = engine.create_site();
/// assert_eq!(site.evaluate(&vec![1, 2, 3], &count).unwrap(), 3);
/// ```
pub fn declaring<C, S, T, F>(intent: Intent<C>, selector: F) -> impl Fn(&S, &Collector<C>) -> T
where
    S: ?Sized,
    F: Fn(&S) -> T,
{
    move |state, collector| {
        collector.declare(&intent);
        selector(state)
    }
}

/// Adapts `selector` into a read function that declares nothing.
pub fn select<C, S, T, F>(selector: F) -> impl Fn(&S, &Collector<C>) -> T
where
    S: ?Sized,
    F: Fn(&S) -> T,
{
    move |state, _| selector(state)
}
