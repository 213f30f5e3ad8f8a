//! Demonstrates writing a custom policy.
//!
//! This example shows:
//! 1. Choosing one marker per policy axis
//! 2. A custom empty handler that returns a fallback value
//! 3. A larger inline buffer, so bigger closures avoid the heap
//! 4. Reflection on the stored target

use std::rc::Rc;

use polyfn::{
    Callable, InlineBuffer, ManagerKind, Policy,
    handlers::EmptyHandler,
    markers::{Cloneable, FlagCheck, Local, Reflective},
};

// ============================================================================
// Example 1: A fallback instead of a panic
// ============================================================================

/// Greets nobody in particular when no greeter is installed.
struct Anonymous;

impl EmptyHandler<String> for Anonymous {
    fn handle_empty_invoke() -> String {
        String::from("hello, whoever you are")
    }
}

/// Single-threaded greeters that may hold `Rc`s and up to eight words of
/// state inline.
struct Greeters;

impl Policy for Greeters {
    type Cloning = Cloneable;
    type Threading = Local;
    type Reflection = Reflective;
    type EmptyCheck = FlagCheck;
    type OnEmpty = Anonymous;
    type Buffer = InlineBuffer<8>;
}

type Greeter = Callable<fn(&'static str) -> String, Greeters>;

fn main() {
    let mut greeter = Greeter::empty();
    println!("empty: {}", greeter.invoke("ada"));

    // ========================================================================
    // Example 2: Shared, non-`Send` state
    // ========================================================================

    let prefix = Rc::new(String::from("good morning"));
    greeter.assign({
        let prefix = Rc::clone(&prefix);
        move |name: &'static str| format!("{prefix}, {name}")
    });
    println!("engaged: {}", greeter.invoke("ada"));

    let copy = greeter.clone();
    println!("clone: {}", copy.invoke("grace"));
    println!("prefix shared by {} owners", Rc::strong_count(&prefix));

    // ========================================================================
    // Example 3: Bigger inline storage
    // ========================================================================

    let titles = [1u64, 2, 3, 4, 5, 6];
    let ranked = Greeter::new(move |name: &'static str| format!("{name} #{}", titles.len()));
    assert_eq!(ranked.storage(), Some(ManagerKind::TrivialSmall));
    println!("inline: {} ({:?})", ranked.invoke("linus"), ranked.storage());

    // ========================================================================
    // Example 4: Reflection
    // ========================================================================

    fn shout(name: &'static str) -> String {
        name.to_uppercase()
    }

    greeter.assign(shout as fn(&'static str) -> String);
    println!("target type: {:?}", greeter.target_type_name());
    if let Some(target) = greeter.target::<fn(&'static str) -> String>() {
        println!("called directly: {}", target("barbara"));
    }

    greeter.clear();
    println!("cleared: {}", greeter.invoke("ada"));
}
