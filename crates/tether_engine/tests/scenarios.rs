//! End-to-end lifecycle scenarios.
//!
//! Tests covering cross-consumer dedup, diff ordering, unmount, context
//! changes, parameterized intents, and leak diagnostics.

mod test_utils;

use std::cell::RefCell;
use std::rc::Rc;
use tether_engine::cleanup::Cleanup;
use tether_engine::config::{EngineConfig, ReconcileOrder};
use tether_engine::engine::Engine;
use tether_engine::error::EngineError;
use tether_engine::intent::{Intent, ResourceType};
use tether_engine::memo::define_parameterized_intent;
use test_utils::{Event, Recorder, declare_all, engine_with_context};

// ═══════════════════════════════════════════════════════════════════════════════
// SHARING
// ═══════════════════════════════════════════════════════════════════════════════

/// Two consumers of room 42 share one activation; cleanup waits for both.
#[test]
fn room_shared_by_two_consumers() {
    let engine = engine_with_context(0);
    let room = Recorder::new("room");
    let intents = [room.intent("42")];

    let mut first = engine.create_site();
    first.evaluate(intents.as_slice(), declare_all).unwrap();
    first.mount().unwrap();

    let mut second = engine.create_site();
    second.evaluate(intents.as_slice(), declare_all).unwrap();
    second.mount().unwrap();

    assert_eq!(room.log.activations("42"), 1);
    assert_eq!(engine.registry().holders(&room.intent("42").id()), 2);

    first.unmount();
    assert_eq!(room.log.cleanups("42"), 0);
    assert_eq!(engine.registry().holders(&room.intent("42").id()), 1);

    second.unmount();
    assert_eq!(room.log.cleanups("42"), 1);
    assert!(!engine.registry().contains(&room.intent("42").id()));
    assert!(engine.registry().is_empty());
}

/// A consumer that joins after activation does not re-activate.
#[test]
fn late_consumer_joins_active_resource() {
    let engine = engine_with_context(0);
    let room = Recorder::new("room");
    let intents = [room.intent("lobby")];

    let mut early = engine.create_site();
    early.evaluate(intents.as_slice(), declare_all).unwrap();
    early.mount().unwrap();
    early.evaluate(intents.as_slice(), declare_all).unwrap();

    let mut late = engine.create_site();
    late.mount().unwrap();
    late.evaluate(intents.as_slice(), declare_all).unwrap();

    assert_eq!(room.log.trace(), ["+lobby"]);
    drop(early);
    drop(late);
    assert_eq!(room.log.trace(), ["+lobby", "-lobby"]);
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIFFING
// ═══════════════════════════════════════════════════════════════════════════════

/// Moving from {A,B} to {B,C} cleans up A and activates C, never touching B.
#[test]
fn diff_touches_only_the_difference() {
    for order in [ReconcileOrder::AcquireFirst, ReconcileOrder::ReleaseFirst] {
        let engine = Engine::with_config(EngineConfig::default().with_reconcile_order(order));
        engine.provide(0);
        let rec = Recorder::new("r");

        let mut site = engine.create_site();
        site.mount().unwrap();
        site.evaluate(&[rec.intent("A"), rec.intent("B")][..], declare_all)
            .unwrap();
        rec.log.clear();

        site.evaluate(&[rec.intent("B"), rec.intent("C")][..], declare_all)
            .unwrap();

        assert_eq!(rec.log.activations("C"), 1, "{order:?}");
        assert_eq!(rec.log.cleanups("A"), 1, "{order:?}");
        assert_eq!(rec.log.activations("B"), 0, "{order:?}");
        assert_eq!(rec.log.cleanups("B"), 0, "{order:?}");
        assert_eq!(rec.log.events().len(), 2, "{order:?}");

        let expected = match order {
            ReconcileOrder::AcquireFirst => ["+C", "-A"],
            ReconcileOrder::ReleaseFirst => ["-A", "+C"],
        };
        assert_eq!(rec.log.trace(), expected);
    }
}

/// Re-evaluating with the same set makes no registry calls.
#[test]
fn unchanged_evaluation_is_idempotent() {
    let engine = engine_with_context(0);
    let rec = Recorder::new("r");
    let intents = [rec.intent("x"), rec.intent("y")];

    let mut site = engine.create_site();
    site.mount().unwrap();
    for _ in 0..5 {
        site.evaluate(intents.as_slice(), declare_all).unwrap();
        site.mount().unwrap();
    }
    assert_eq!(rec.log.trace(), ["+x", "+y"]);
    assert_eq!(engine.registry().stats().activations, 2);
    assert_eq!(engine.registry().stats().cleanups, 0);
}

/// Unmounting releases everything whatever was last declared; remounting
/// re-acquires the last declared set.
#[test]
fn unmount_then_remount() {
    let engine = engine_with_context(0);
    let rec = Recorder::new("r");
    let intents = [rec.intent("a"), rec.intent("b")];

    let mut site = engine.create_site();
    site.evaluate(intents.as_slice(), declare_all).unwrap();
    assert!(rec.log.events().is_empty(), "nothing is acquired before mount");

    site.mount().unwrap();
    assert_eq!(site.held_count(), 2);

    site.unmount();
    assert_eq!(site.held_count(), 0);
    assert!(rec.log.live().is_empty());

    site.evaluate(intents.as_slice(), declare_all).unwrap();
    assert!(rec.log.live().is_empty(), "unmounted evaluations acquire nothing");

    site.mount().unwrap();
    assert_eq!(rec.log.live(), ["a", "b"]);
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// A changed context reaches the next acquisition only.
#[test]
fn context_change_affects_future_acquisitions() {
    let engine = engine_with_context(1);
    let rec = Recorder::new("r");

    let mut site = engine.create_site();
    site.mount().unwrap();
    site.evaluate(&[rec.intent("a")][..], declare_all).unwrap();

    engine.provide(2);
    site.evaluate(&[rec.intent("a")][..], declare_all).unwrap();
    site.evaluate(&[rec.intent("a"), rec.intent("b")][..], declare_all)
        .unwrap();

    assert_eq!(
        rec.log.events(),
        [
            Event::Activated {
                key: "a".into(),
                context: 1
            },
            Event::Activated {
                key: "b".into(),
                context: 2
            },
        ]
    );
}

/// A scoped context overrides the root for evaluations inside the scope.
#[test]
fn scoped_context_is_used_inside_scope() {
    let engine = engine_with_context(1);
    let rec = Recorder::new("r");
    let mut site = engine.create_site();
    site.mount().unwrap();

    engine.with_context(7, || {
        site.evaluate(&[rec.intent("a")][..], declare_all).unwrap();
    });

    assert_eq!(
        rec.log.events(),
        [Event::Activated {
            key: "a".into(),
            context: 7
        }]
    );
}

/// Acquisitions deferred to mount see the context visible at mount time.
#[test]
fn mount_uses_context_provided_after_evaluation() {
    let engine = engine_with_context(1);
    let rec = Recorder::new("r");
    let mut site = engine.create_site();

    site.evaluate(&[rec.intent("a")][..], declare_all).unwrap();
    engine.provide(2);
    site.mount().unwrap();

    assert_eq!(
        rec.log.events(),
        [Event::Activated {
            key: "a".into(),
            context: 2
        }]
    );
}

/// Mounting inside a scope activates with the scoped value, not the root.
#[test]
fn mount_inside_scope_uses_scoped_context() {
    let engine = engine_with_context(1);
    let rec = Recorder::new("r");
    let mut site = engine.create_site();

    site.evaluate(&[rec.intent("a")][..], declare_all).unwrap();
    engine.with_context(7, || site.mount()).unwrap();

    assert_eq!(
        rec.log.events(),
        [Event::Activated {
            key: "a".into(),
            context: 7
        }]
    );

    // Back outside the scope, later acquisitions see the root again.
    site.evaluate(&[rec.intent("a"), rec.intent("b")][..], declare_all)
        .unwrap();
    assert_eq!(
        rec.log.events().last(),
        Some(&Event::Activated {
            key: "b".into(),
            context: 1
        })
    );
}

/// Evaluating without any provider fails loudly and leaves nothing behind.
#[test]
fn missing_provider_is_reported() {
    let engine = Engine::<u32>::new();
    let rec = Recorder::new("r");
    let mut site = engine.create_site();

    let err = site
        .evaluate(&[rec.intent("a")][..], declare_all)
        .unwrap_err();
    assert!(matches!(err, EngineError::MissingProvider));
    assert!(!engine.is_collecting());
    assert!(engine.registry().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARAMETERIZED INTENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// The same argument tuple yields the same intent, so independent sites share
/// one activation.
#[test]
fn parameterized_intents_dedup_across_sites() {
    let fetches = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&fetches);
    let issues = define_parameterized_intent(
        "issues",
        move |(org, repo, page): (String, String, u32)| {
            let sink = Rc::clone(&sink);
            move |_: &u32| {
                sink.borrow_mut().push(format!("{org}/{repo}/{page}"));
                Cleanup::new(|| ())
            }
        },
    );

    let org = String::from("org1");
    let first_intent = issues.get((org.as_str(), "repo1", 2_u32));
    let second_intent = issues.get(("org1", "repo1", 2_u32));
    assert!(Intent::ptr_eq(&first_intent, &second_intent));

    let engine = engine_with_context(0);
    let mut first = engine.create_site();
    let mut second = engine.create_site();
    for (site, intent) in [(&mut first, first_intent), (&mut second, second_intent)] {
        site.mount().unwrap();
        site.evaluate(&(), |_: &(), c| c.declare(&intent)).unwrap();
    }

    assert_eq!(*fetches.borrow(), ["org1/repo1/2"]);
    assert_eq!(engine.registry().active_count(), 1);
    assert_eq!(issues.len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════════
// FAILURES AND DIAGNOSTICS
// ═══════════════════════════════════════════════════════════════════════════════

/// An activation returning no cleanup still yields a releasable resource.
#[test]
fn leaky_activation_is_counted_and_releasable() {
    let engine = engine_with_context(0);
    let rec = Recorder::leaky("poller");

    let mut site = engine.create_site();
    site.mount().unwrap();
    site.evaluate(&[rec.intent("p")][..], declare_all).unwrap();
    assert_eq!(engine.registry().stats().leaks, 1);

    site.unmount();
    assert!(engine.registry().is_empty());
    assert_eq!(engine.registry().stats().cleanups, 1);
}

/// A failing activation leaves no partial state and does not block other
/// resources declared by the same pass.
#[test]
fn failed_activation_leaves_no_trace() {
    let engine = engine_with_context(0);
    let failing = ResourceType::try_new("flaky", |_: &str, _: &u32| {
        Err::<Cleanup, _>("connection refused".into())
    });
    let rec = Recorder::new("ok");

    let mut site = engine.create_site();
    site.mount().unwrap();
    let err = site
        .evaluate(&(), |_: &(), c| {
            c.declare(&failing.intent("x"));
        })
        .unwrap_err();
    assert!(matches!(err, EngineError::Activation { .. }));
    assert!(engine.registry().is_empty());

    site.evaluate(&[rec.intent("y")][..], declare_all).unwrap();
    assert_eq!(rec.log.live(), ["y"]);
}

/// A dynamic activation returning a non-cleanup value fails the acquisition.
#[test]
fn invalid_cleanup_is_rejected() {
    let engine = engine_with_context(0);
    let bogus = ResourceType::dynamic("bogus", |_: &str, _: &u32| {
        Box::new(17_u8) as Box<dyn std::any::Any>
    });

    let mut site = engine.create_site();
    site.mount().unwrap();
    let err = site
        .evaluate(&(), |_: &(), c| c.declare(&bogus.intent("k")))
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCleanup { .. }));
    assert!(engine.registry().is_empty());
    assert_eq!(site.held_count(), 0);
}
