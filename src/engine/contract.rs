//! Design-by-contract checks.
//!
//! Every condition of a clause is evaluated and every failure is kept, the
//! same way validation accumulates definition issues.

use super::error::ContractViolation;
use crate::core::Clause;
use crate::expr::EvalError;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

pub(crate) type ContractCheck = Validation<(), NonEmptyVec<ContractViolation>>;

/// Check each condition of one clause with `holds`.
pub(crate) fn check_clause<F>(
    subject: &str,
    clause: Clause,
    conditions: &[String],
    mut holds: F,
) -> ContractCheck
where
    F: FnMut(&str) -> Result<bool, EvalError>,
{
    let checks: Vec<ContractCheck> = conditions
        .iter()
        .map(|condition| {
            let error = match holds(condition) {
                Ok(true) => return Validation::success(()),
                Ok(false) => None,
                Err(error) => Some(error),
            };
            Validation::fail(ContractViolation {
                subject: subject.to_string(),
                clause,
                condition: condition.clone(),
                error,
            })
        })
        .collect();

    Validation::all_vec(checks).map(|_| ())
}

/// Move the failures of `check`, if any, into `violations`.
pub(crate) fn collect(check: ContractCheck, violations: &mut Vec<ContractViolation>) {
    if let Validation::Failure(errors) = check {
        violations.extend(errors.iter().cloned());
    }
}
