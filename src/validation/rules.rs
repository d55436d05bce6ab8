//! Individual validation rules.
//!
//! Each rule returns one `Validation` per check so that the caller can
//! accumulate every failure with `Validation::all_vec`.

use super::issue::DefinitionIssue;
use crate::core::{Contract, StateKind, StateNode, StateRef, StatechartModel, Transition};
use crate::expr::{CodeKind, Evaluator};
use std::collections::HashSet;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

pub(crate) type Check = Validation<(), NonEmptyVec<DefinitionIssue>>;

fn ensure(holds: bool, issue: impl FnOnce() -> DefinitionIssue) -> Check {
    if holds {
        Validation::success(())
    } else {
        Validation::fail(issue())
    }
}

/// Every state name appears once.
pub(crate) fn unique_names(model: &StatechartModel) -> Vec<Check> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    model
        .states()
        .iter()
        .filter(|node| !seen.insert(node.name()) && reported.insert(node.name()))
        .map(|node| Validation::fail(DefinitionIssue::DuplicateState(node.name().to_string())))
        .collect()
}

/// The root is neither parallel nor a pseudostate.
pub(crate) fn root(model: &StatechartModel) -> Check {
    let root = model.state(model.root());
    ensure(!root.is_parallel() && !root.is_history(), || {
        DefinitionIssue::InvalidRoot {
            state: root.name().to_string(),
            kind: root.kind().label(),
        }
    })
}

/// Kind-specific structure of one state.
pub(crate) fn state(model: &StatechartModel, node: &StateNode) -> Vec<Check> {
    let name = || node.name().to_string();
    let mut checks = Vec::new();

    if !node.is_composite() {
        checks.push(ensure(node.children().is_empty(), || {
            DefinitionIssue::ChildrenNotAllowed {
                state: name(),
                kind: node.kind().label(),
            }
        }));
    }

    match node.kind() {
        StateKind::Compound { initial } => {
            checks.push(compound_initial(model, node, initial.as_ref()));
        }
        StateKind::Parallel => {
            checks.push(ensure(!node.children().is_empty(), || {
                DefinitionIssue::EmptyParallel(name())
            }));
        }
        StateKind::History { default, .. } => {
            let parent = node.parent().map(|parent| model.state(parent));
            checks.push(ensure(parent.is_some_and(StateNode::is_compound), || {
                DefinitionIssue::HistoryOutsideCompound(name())
            }));
            checks.push(ensure(node.transitions().is_empty(), || {
                DefinitionIssue::HistoryWithTransitions(name())
            }));
            checks.push(ensure(
                node.on_entry().is_none() && node.on_exit().is_none(),
                || DefinitionIssue::HistoryWithActions(name()),
            ));
            if let (Some(default), Some(owner)) = (default, node.parent()) {
                let history = name();
                let target = default.name().to_string();
                checks.push(match default.id() {
                    None => Validation::fail(DefinitionIssue::UnresolvedHistoryDefault {
                        history,
                        default: target,
                    }),
                    Some(id) if !model.is_ancestor(owner, id) => {
                        Validation::fail(DefinitionIssue::HistoryDefaultOutsideOwner {
                            history,
                            default: target,
                        })
                    }
                    Some(id) if model.state(id).is_history() => {
                        Validation::fail(DefinitionIssue::HistoryDefaultIsHistory {
                            history,
                            default: target,
                        })
                    }
                    Some(_) => Validation::success(()),
                });
            }
        }
        StateKind::Simple | StateKind::Final => {}
    }

    checks
}

fn compound_initial(
    model: &StatechartModel,
    node: &StateNode,
    initial: Option<&StateRef>,
) -> Check {
    let state = node.name().to_string();
    let Some(initial) = initial else {
        return Validation::fail(DefinitionIssue::MissingInitial(state));
    };
    let name = initial.name().to_string();
    match initial.id() {
        None => Validation::fail(DefinitionIssue::UnresolvedInitial {
            state,
            initial: name,
        }),
        Some(id) if model.parent_of(id) != Some(node.id()) => {
            Validation::fail(DefinitionIssue::InitialNotChild {
                state,
                initial: name,
            })
        }
        Some(id) => match model.state(id).kind() {
            StateKind::History { default: None, .. } => {
                Validation::fail(DefinitionIssue::InitialHistoryWithoutDefault {
                    state,
                    history: name,
                })
            }
            _ => Validation::success(()),
        },
    }
}

/// Structure of one transition.
pub(crate) fn transition(model: &StatechartModel, transition: &Transition) -> Vec<Check> {
    let source = model.state(transition.source());
    let describe = || model.describe(transition.id());
    let mut checks = Vec::new();

    // Histories get their own, more specific issue.
    if !source.is_history() {
        checks.push(ensure(!source.is_final(), || {
            DefinitionIssue::InvalidTransitionSource {
                state: source.name().to_string(),
                kind: source.kind().label(),
            }
        }));
    }

    match transition.target() {
        Some(target) => checks.push(ensure(target.id().is_some(), || {
            DefinitionIssue::UnresolvedTarget {
                transition: describe(),
                target: target.name().to_string(),
            }
        })),
        None => checks.push(ensure(
            transition.event().is_some() || transition.guard().is_some(),
            || DefinitionIssue::UnguardedInternal(describe()),
        )),
    }

    checks
}

/// Every piece of code compiles with `evaluator`.
pub(crate) fn code<E>(model: &StatechartModel, evaluator: &mut E) -> Vec<Check>
where
    E: Evaluator + ?Sized,
{
    let mut sources: Vec<(String, &str, CodeKind)> = Vec::new();

    if let Some(preamble) = model.preamble() {
        sources.push(("preamble".to_string(), preamble, CodeKind::Action));
    }

    for node in model.states() {
        let owner = format!("state '{}'", node.name());
        if let Some(code) = node.on_entry() {
            sources.push((format!("on entry of {owner}"), code, CodeKind::Action));
        }
        if let Some(code) = node.on_exit() {
            sources.push((format!("on exit of {owner}"), code, CodeKind::Action));
        }
        push_contract(&mut sources, &owner, node.contract());
    }

    for transition in model.transitions() {
        let owner = format!("transition {}", model.describe(transition.id()));
        if let Some(guard) = transition.guard() {
            sources.push((format!("guard of {owner}"), guard.code(), CodeKind::Guard));
        }
        if let Some(code) = transition.action() {
            sources.push((format!("action of {owner}"), code, CodeKind::Action));
        }
        push_contract(&mut sources, &owner, transition.contract());
    }

    sources
        .into_iter()
        .map(|(location, code, kind)| match evaluator.prepare(code, kind) {
            Ok(()) => Validation::success(()),
            Err(error) => Validation::fail(DefinitionIssue::InvalidCode { location, error }),
        })
        .collect()
}

fn push_contract<'m>(
    sources: &mut Vec<(String, &'m str, CodeKind)>,
    owner: &str,
    contract: &'m Contract,
) {
    for (clause, condition) in contract.conditions() {
        sources.push((format!("{clause} of {owner}"), condition, CodeKind::Guard));
    }
}
