//! Events emitted with the `tracing` feature enabled.

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use polyfn::{AllocError, Function, TargetAllocator};
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{
    Registry,
    layer::{Context, Layer, SubscriberExt},
};

#[derive(Debug, PartialEq)]
struct Recorded {
    level: Level,
    message: String,
    fields: Vec<&'static str>,
}

#[derive(Default)]
struct Message(String);

impl Visit for Message {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Recorded>>>);

impl<S: Subscriber> Layer<S> for Recorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target() != "polyfn" {
            return;
        }
        let mut message = Message::default();
        event.record(&mut message);
        self.0.lock().unwrap().push(Recorded {
            level: *metadata.level(),
            message: message.0,
            fields: event.fields().map(|field| field.name()).collect(),
        });
    }
}

/// Runs `f` with a subscriber that records `polyfn` events.
fn recorded(f: impl FnOnce()) -> Vec<Recorded> {
    let recorder = Recorder::default();
    let subscriber = Registry::default().with(recorder.clone());
    tracing::subscriber::with_default(subscriber, f);
    std::mem::take(&mut *recorder.0.lock().unwrap())
}

#[derive(Clone)]
struct Exhausted;

// SAFETY: Never hands out a block, so there is nothing to deallocate.
unsafe impl TargetAllocator for Exhausted {
    fn allocate(&self, layout: std::alloc::Layout) -> Result<std::ptr::NonNull<u8>, AllocError> {
        Err(AllocError { layout })
    }

    unsafe fn deallocate(&self, _ptr: std::ptr::NonNull<u8>, _layout: std::alloc::Layout) {
        unreachable!("no block was ever allocated");
    }
}

#[test]
fn test_heap_storage_event() {
    let table = [4u64; 16];
    let events = recorded(|| {
        let f = Function::<fn(usize) -> u64>::from_fn(move |i| table[i]);
        assert_eq!(f.invoke(3), 4);
    });
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].level, Level::DEBUG);
    assert_eq!(events[0].message, "callable target stored on the heap");
    assert!(events[0].fields.contains(&"storage"));
    assert!(events[0].fields.contains(&"size"));
}

#[test]
fn test_inline_storage_is_silent() {
    let events = recorded(|| {
        let f = Function::<fn(i32) -> i32>::from_fn(|x| x + 1);
        assert_eq!(f.invoke(1), 2);
    });
    assert!(events.is_empty());
}

#[test]
fn test_allocation_failure_event() {
    let big = [1u64; 8];
    let events = recorded(|| {
        let result = Function::<fn() -> u64>::try_new_in(move || big[0], Exhausted);
        assert!(result.is_err());
    });
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].level, Level::WARN);
    assert_eq!(events[0].message, "failed to allocate a callable target");
    assert!(events[0].fields.contains(&"target_type"));
}

#[test]
fn test_clear_and_take_events() {
    let events = recorded(|| {
        let mut f = Function::<fn() -> u8>::from_fn(|| 1);
        let taken = f.take();
        let mut g = taken;
        g.clear();
    });
    let messages: Vec<_> = events.iter().map(|event| event.message.as_str()).collect();
    assert_eq!(messages, ["callable target taken", "callable cleared"]);
    assert!(events.iter().all(|event| event.level == Level::TRACE));
}
