//! Media Player Statechart
//!
//! This example builds a media player in code and shows history states,
//! contracts and action fault handling.
//!
//! Key concepts:
//! - Shallow and deep history restoring what was playing
//! - Internal transitions updating variables without leaving a state
//! - Contracts checked on entry, exit and after every pass
//! - `FaultStrategy::IgnoreAndLog` keeping the player running after a fault
//!
//! Run with: cargo run --example media_player

use statecraft::builder::{on_event, StateBuilder, StatechartBuilder, TransitionBuilder};
use statecraft::core::{Event, StatechartModel};
use statecraft::engine::{ExecutionError, FaultStrategy, Interpreter, InterpreterConfig};
use statecraft::expr::ScriptEvaluator;

fn player() -> Result<StatechartModel, Box<dyn std::error::Error>> {
    let model = StatechartBuilder::new("media player")
        .description("Power, playback and volume with history")
        .preamble("volume = 5\ntrack = 1")
        .root(
            StateBuilder::compound("player")
                .initial("off")
                .invariant("volume >= 0 and volume <= 10")
                .child(
                    StateBuilder::simple("off")
                        .transition(on_event("power", "lastMode"))
                        .transition(on_event("resume", "lastTrackPosition")),
                )
                .child(
                    StateBuilder::compound("on")
                        .initial("stopped")
                        .transition(on_event("power", "off"))
                        .transition(
                            TransitionBuilder::internal()
                                .event("volume")
                                .guard("event.delta != 0")
                                .action("volume += event.delta"),
                        )
                        .child(StateBuilder::shallow_history("lastMode").default("stopped"))
                        .child(StateBuilder::deep_history("lastTrackPosition").default("stopped"))
                        .child(StateBuilder::simple("stopped").transition(on_event("play", "playing")))
                        .child(
                            StateBuilder::compound("playing")
                                .initial("normal")
                                .precondition("track > 0")
                                .transition(on_event("stop", "stopped"))
                                .transition(
                                    TransitionBuilder::internal()
                                        .event("next")
                                        .action("track += 1\nsend('skipped', track=track)"),
                                )
                                .child(
                                    StateBuilder::simple("normal")
                                        .transition(on_event("ff", "fastForward")),
                                )
                                .child(
                                    StateBuilder::simple("fastForward")
                                        .transition(on_event("ff", "normal"))
                                        .transition(
                                            TransitionBuilder::internal()
                                                .event("skipped")
                                                .action("announce(track)"),
                                        ),
                                ),
                        ),
                ),
        )
        .build()?;
    Ok(model)
}

fn show(label: &str, interpreter: &Interpreter) {
    println!(
        "  {label:<24} leaves={:?} volume={} track={}",
        interpreter.active_leaves(),
        interpreter
            .context()
            .get("volume")
            .map(ToString::to_string)
            .unwrap_or_default(),
        interpreter
            .context()
            .get("track")
            .map(ToString::to_string)
            .unwrap_or_default(),
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Media Player Statechart ===\n");

    let config = InterpreterConfig::default().on_action_fault(FaultStrategy::IgnoreAndLog);
    let mut interpreter = Interpreter::with_evaluator(player()?, ScriptEvaluator::new(), config)?;
    interpreter.start()?;
    show("started", &interpreter);

    for event in ["power", "play", "ff"] {
        interpreter.send(Event::new(event))?;
        show(event, &interpreter);
    }

    println!("\nSkipping a track (the announcement action fails and is ignored):");
    for step in interpreter.dispatch(Event::new("next"))? {
        for fault in &step.action_faults {
            println!("  fault in {}: {}", fault.location, fault.error);
        }
    }
    show("next", &interpreter);

    println!("\nPower cycle with shallow history:");
    interpreter.send(Event::new("power"))?;
    show("power (off)", &interpreter);
    interpreter.send(Event::new("power"))?;
    show("power (shallow restore)", &interpreter);

    println!("\nPower cycle with deep history:");
    interpreter.send(Event::new("ff"))?;
    interpreter.send(Event::new("power"))?;
    interpreter.send(Event::new("resume"))?;
    show("resume (deep restore)", &interpreter);

    println!("\nTurning the volume past the invariant:");
    match interpreter.send(Event::new("volume").with("delta", 8)) {
        Err(ExecutionError::ContractViolation(violations)) => {
            for violation in violations {
                println!("  {violation}");
            }
        }
        other => println!("  unexpected: {other:?}"),
    }
    show("volume", &interpreter);

    println!("\n=== Example Complete ===");
    Ok(())
}
