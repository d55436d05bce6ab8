//! Elevator Statechart
//!
//! This example loads the elevator chart from JSON and drives it with
//! floor selections and the logical clock.
//!
//! Key concepts:
//! - Parallel regions (the cabin and the floor listener)
//! - Eventless transitions cascading to a stable configuration
//! - Self transitions re-running entry actions once per floor
//! - `after(10)` guards driven by the logical clock
//!
//! Run with: cargo run --example elevator

use statecraft::builder::from_json;
use statecraft::core::Event;
use statecraft::engine::{ExecutionError, Interpreter};

fn report(interpreter: &Interpreter) {
    let context = interpreter.context();
    let show = |name: &str| {
        context
            .get(name)
            .map(ToString::to_string)
            .unwrap_or_else(|| "?".to_string())
    };
    println!(
        "  t={:<3} leaves={:?} current={} destination={} doors_open={}",
        interpreter.time(),
        interpreter.active_leaves(),
        show("current"),
        show("destination"),
        show("doors_open"),
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Elevator Statechart ===\n");

    let model = from_json(include_str!("elevator.json"))?;
    println!("Loaded '{}' with {} states", model.name(), model.states().len());
    println!("Events: {:?}\n", model.events());

    let mut interpreter = Interpreter::new(model)?;
    interpreter.start()?;
    println!("Started:");
    report(&interpreter);

    println!("\nSelecting floor 5:");
    let steps = interpreter.dispatch(Event::new("floorSelected").with("floor", 5))?;
    for step in &steps {
        for transition in step.transitions() {
            println!("  fired {}", interpreter.model().describe(transition));
        }
    }
    report(&interpreter);

    println!("\nWaiting:");
    for _ in 0..3 {
        let step = interpreter.advance_time(4)?;
        println!("  advanced to t={} ({} transitions)", interpreter.time(), step.transitions().len());
    }
    report(&interpreter);

    println!("\nGoing back in time is refused:");
    match interpreter.set_time(1) {
        Err(ExecutionError::Clock(error)) => println!("  {error}"),
        other => println!("  unexpected: {other:?}"),
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
