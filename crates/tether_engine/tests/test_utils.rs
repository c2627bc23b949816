//! Shared test utilities for `tether_engine` integration tests.
//!
//! Provides a recording resource type whose activations and cleanups are
//! logged per key. Import via `mod test_utils;` in test files.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities, not all items used in every test binary"
)]

use std::cell::RefCell;
use std::rc::Rc;
use tether_engine::cleanup::Cleanup;
use tether_engine::collector::Collector;
use tether_engine::engine::Engine;
use tether_engine::intent::{Intent, ResourceType};

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// One lifecycle event observed by a [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Activated { key: String, context: u32 },
    CleanedUp { key: String },
}

/// Shared, cloneable event log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<Event>>>,
}

impl EventLog {
    pub fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    pub fn activations(&self, key: &str) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, Event::Activated { key: k, .. } if k == key))
            .count()
    }

    pub fn cleanups(&self, key: &str) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, Event::CleanedUp { key: k } if k == key))
            .count()
    }

    /// Keys activated but not yet cleaned up, in activation order.
    pub fn live(&self) -> Vec<String> {
        let mut live: Vec<String> = Vec::new();
        for event in self.events.borrow().iter() {
            match event {
                Event::Activated { key, .. } => live.push(key.clone()),
                Event::CleanedUp { key } => live.retain(|k| k != key),
            }
        }
        live
    }

    /// Compact `+key` / `-key` rendering of the log.
    pub fn trace(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .map(|e| match e {
                Event::Activated { key, .. } => format!("+{key}"),
                Event::CleanedUp { key } => format!("-{key}"),
            })
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDING RESOURCE TYPE
// ═══════════════════════════════════════════════════════════════════════════════

/// A resource type that logs its lifecycle into an [`EventLog`].
///
/// The context is a plain `u32` so tests can observe which context value an
/// activation saw.
pub struct Recorder {
    pub log: EventLog,
    pub ty: ResourceType<u32>,
}

impl Recorder {
    pub fn new(name: &str) -> Self {
        let log = EventLog::default();
        let sink = log.clone();
        let ty = ResourceType::new(name, move |key: &str, context: &u32| {
            sink.push(Event::Activated {
                key: key.to_owned(),
                context: *context,
            });
            let sink = sink.clone();
            let key = key.to_owned();
            Cleanup::new(move || sink.push(Event::CleanedUp { key }))
        });
        Self { log, ty }
    }

    /// A recorder whose activation returns no cleanup.
    pub fn leaky(name: &str) -> Self {
        let log = EventLog::default();
        let sink = log.clone();
        let ty = ResourceType::new(name, move |key: &str, context: &u32| {
            sink.push(Event::Activated {
                key: key.to_owned(),
                context: *context,
            });
            Cleanup::None
        });
        Self { log, ty }
    }

    pub fn intent(&self, key: &str) -> Intent<u32> {
        self.ty.intent(key)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Creates an engine with `context` provided at the root.
pub fn engine_with_context(context: u32) -> Engine<u32> {
    let engine = Engine::new();
    engine.provide(context);
    engine
}

/// Read function that declares every intent in the state slice.
pub fn declare_all(intents: &[Intent<u32>], collector: &Collector<u32>) -> usize {
    for intent in intents {
        collector.declare(intent);
    }
    intents.len()
}
