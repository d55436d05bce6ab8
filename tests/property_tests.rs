//! Property-based tests for the interpreter and the expression language.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated event and clock sequences.

use proptest::prelude::*;
use statecraft::builder::{from_json, on_event, StateBuilder, StatechartBuilder};
use statecraft::core::{Event, ExecutionContext, HistoryTracker, StatechartModel, Value};
use statecraft::engine::{Interpreter, Status};
use statecraft::expr::{Evaluator, Scope, ScriptEvaluator};

const ELEVATOR: &str = include_str!("../demos/elevator.json");

#[derive(Clone, Debug)]
enum Input {
    Floor(i64),
    Wait(u64),
    Noise,
}

prop_compose! {
    fn arbitrary_input()(variant in 0..3u8, floor in 0..8i64, wait in 0..15u64) -> Input {
        match variant {
            0 => Input::Floor(floor),
            1 => Input::Wait(wait),
            _ => Input::Noise,
        }
    }
}

fn player() -> StatechartModel {
    StatechartBuilder::new("player")
        .root(
            StateBuilder::compound("player")
                .initial("off")
                .child(StateBuilder::simple("off").transition(on_event("power", "H")))
                .child(
                    StateBuilder::compound("on")
                        .initial("stopped")
                        .transition(on_event("power", "off"))
                        .child(StateBuilder::deep_history("H").default("stopped"))
                        .child(StateBuilder::simple("stopped").transition(on_event("play", "playing")))
                        .child(
                            StateBuilder::compound("playing")
                                .initial("normal")
                                .transition(on_event("stop", "stopped"))
                                .child(StateBuilder::simple("normal").transition(on_event("ff", "fast")))
                                .child(StateBuilder::simple("fast").transition(on_event("ff", "normal"))),
                        ),
                ),
        )
        .build()
        .unwrap()
}

prop_compose! {
    fn player_event()(index in 0..5usize) -> &'static str {
        ["power", "play", "ff", "stop", "eject"][index]
    }
}

fn snapshot(interpreter: &Interpreter) -> (Vec<String>, ExecutionContext, HistoryTracker) {
    (
        interpreter
            .active_states()
            .into_iter()
            .map(str::to_string)
            .collect(),
        interpreter.context().clone(),
        interpreter.history().clone(),
    )
}

proptest! {
    #[test]
    fn elevator_configuration_stays_valid(inputs in prop::collection::vec(arbitrary_input(), 0..30)) {
        let model = from_json(ELEVATOR).unwrap();
        let mut interpreter = Interpreter::new(model).unwrap();
        interpreter.start().unwrap();

        for input in inputs {
            match input {
                Input::Floor(floor) => {
                    interpreter.send(Event::new("floorSelected").with("floor", floor)).unwrap();
                }
                Input::Wait(delta) => {
                    interpreter.advance_time(delta).unwrap();
                }
                Input::Noise => {
                    interpreter.send(Event::new("noise")).unwrap();
                }
            }
            prop_assert!(interpreter.configuration().check(interpreter.model()).is_ok());
            prop_assert_eq!(interpreter.active_leaves(), vec!["doorsOpen", "floorSelecting"]);
            prop_assert_eq!(
                interpreter.context().get("current"),
                interpreter.context().get("destination")
            );
            prop_assert_eq!(interpreter.status(), Status::Running);
        }
    }

    #[test]
    fn player_configuration_stays_valid(events in prop::collection::vec(player_event(), 0..40)) {
        let mut interpreter = Interpreter::new(player()).unwrap();
        interpreter.start().unwrap();

        for event in events {
            interpreter.send(Event::new(event)).unwrap();
            let model = interpreter.model();
            prop_assert!(interpreter.configuration().check(model).is_ok());
            prop_assert_eq!(interpreter.active_leaves().len(), 1);
            for (_, recorded) in interpreter.history().iter() {
                prop_assert!(!recorded.is_empty());
                prop_assert!(recorded.iter().all(|&state| model.state(state).children().is_empty()));
            }
        }
    }

    #[test]
    fn unhandled_events_change_nothing(events in prop::collection::vec(player_event(), 0..20)) {
        let mut interpreter = Interpreter::new(player()).unwrap();
        interpreter.start().unwrap();
        for event in events {
            interpreter.send(Event::new(event)).unwrap();
        }

        let before = snapshot(&interpreter);
        let steps = interpreter.dispatch(Event::new("eject")).unwrap();
        prop_assert!(steps.iter().all(|step| step.is_empty()));
        prop_assert_eq!(snapshot(&interpreter), before);
    }

    #[test]
    fn floor_division_and_modulo_agree(a in -1000i64..1000, b in -50i64..50) {
        prop_assume!(b != 0);
        let mut evaluator = ScriptEvaluator::new();
        let mut context: ExecutionContext = [("a", a), ("b", b)].into_iter().collect();
        let mut outbox = Vec::new();
        evaluator
            .execute_action("q = a // b\nr = a % b", &mut context, &Scope::new(&()), &mut outbox)
            .unwrap();

        let q = context.get("q").and_then(Value::as_int).unwrap();
        let r = context.get("r").and_then(Value::as_int).unwrap();
        prop_assert_eq!(q * b + r, a);
        prop_assert!(r == 0 || (r < 0) == (b < 0));
        prop_assert!(r.abs() < b.abs());
    }

    #[test]
    fn guards_are_deterministic(x in -100i64..100, y in -100i64..100) {
        let mut evaluator = ScriptEvaluator::new();
        let context: ExecutionContext = [("x", x), ("y", y)].into_iter().collect();
        let scope = Scope::new(&());
        let code = "x < y or (x == y and not x > 0)";

        let first = evaluator.evaluate_guard(code, &context, &scope).unwrap();
        let second = evaluator.evaluate_guard(code, &context, &scope).unwrap();
        prop_assert_eq!(first, second);
        prop_assert_eq!(first, x < y || (x == y && x <= 0));
    }
}
