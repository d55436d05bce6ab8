//! Tree-walking evaluation of compiled guards and actions.

use super::ast::{BinaryOp, CompareOp, Expr, Program, Stmt, UnaryOp};
use super::error::EvalError;
use super::Scope;
use crate::core::{Event, ExecutionContext, Value};
use std::cmp::Ordering;

/// What an evaluation may see and do.
struct Env<'a, 's> {
    context: &'a ExecutionContext,
    scope: &'a Scope<'s>,
    /// `None` inside guards: `send` is denied.
    outbox: Option<&'a mut Vec<Event>>,
}

pub(crate) fn evaluate_guard(
    expr: &Expr,
    context: &ExecutionContext,
    scope: &Scope<'_>,
) -> Result<bool, EvalError> {
    let mut env = Env {
        context,
        scope,
        outbox: None,
    };
    Ok(env.eval(expr)?.is_truthy())
}

/// Run `program` statement by statement. Assignments made before a failing
/// statement stay in effect.
pub(crate) fn execute_action(
    program: &Program,
    context: &mut ExecutionContext,
    scope: &Scope<'_>,
    outbox: &mut Vec<Event>,
) -> Result<(), EvalError> {
    for statement in &program.statements {
        let (name, op, value) = match statement {
            Stmt::Assign { name, op, value } => (name, *op, value),
            Stmt::Expr(expr) => {
                let mut env = Env {
                    context: &*context,
                    scope,
                    outbox: Some(&mut *outbox),
                };
                env.eval(expr)?;
                continue;
            }
        };

        let mut env = Env {
            context: &*context,
            scope,
            outbox: Some(&mut *outbox),
        };
        let mut value = env.eval(value)?;
        if let Some(op) = op {
            let current = context
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UndefinedVariable(name.clone()))?;
            value = binary(op, current, value)?;
        }
        context.set(name.clone(), value);
    }
    Ok(())
}

impl Env<'_, '_> {
    fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(name) => self.variable(name),
            Expr::Attribute { object, name } => self.attribute(object, name),
            Expr::Call {
                function,
                args,
                keywords,
                ..
            } => self.call(function, args, keywords),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                unary(*op, value)
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, left, right)
            }
            Expr::Compare { first, rest } => {
                let mut left = self.eval(first)?;
                for (op, operand) in rest {
                    let right = self.eval(operand)?;
                    if !compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() {
                    self.eval(right)
                } else {
                    Ok(left)
                }
            }
            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
        }
    }

    fn variable(&self, name: &str) -> Result<Value, EvalError> {
        if name == "event" {
            return Ok(self
                .scope
                .event()
                .map(|event| Value::Str(event.name().to_string()))
                .unwrap_or_default());
        }
        self.context
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))
    }

    fn attribute(&mut self, object: &Expr, name: &str) -> Result<Value, EvalError> {
        if matches!(object, Expr::Variable(v) if v == "event") {
            let event = self.scope.event().ok_or(EvalError::NoEvent)?;
            if name == "name" {
                return Ok(Value::Str(event.name().to_string()));
            }
            return event
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::MissingEventField(name.to_string()));
        }
        let value = self.eval(object)?;
        Err(EvalError::Attribute {
            type_name: value.type_name().to_string(),
            attribute: name.to_string(),
        })
    }

    fn call(
        &mut self,
        function: &str,
        args: &[Expr],
        keywords: &[(String, Expr)],
    ) -> Result<Value, EvalError> {
        if function == "send" {
            return self.send(args, keywords);
        }
        if let Some((keyword, _)) = keywords.first() {
            return Err(EvalError::UnexpectedKeyword {
                function: function.to_string(),
                keyword: keyword.clone(),
            });
        }
        let values = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;

        match function {
            "after" => {
                let [units] = exactly::<1>(function, values)?;
                let entered_at = self.scope.entered_at().ok_or_else(|| {
                    EvalError::CapabilityDenied("after() needs an owning state".to_string())
                })?;
                let units = units.as_f64().ok_or_else(|| mismatch(function, &[&units]))?;
                let elapsed = self.scope.now().saturating_sub(entered_at);
                Ok(Value::Bool(elapsed as f64 >= units))
            }
            "active" => {
                let [state] = exactly::<1>(function, values)?;
                let name = state.as_str().ok_or_else(|| mismatch(function, &[&state]))?;
                self.scope
                    .is_active(name)
                    .map(Value::Bool)
                    .ok_or_else(|| EvalError::UnknownState(name.to_string()))
            }
            "abs" => {
                let [value] = exactly::<1>(function, values)?;
                match value {
                    Value::Int(i) => i.checked_abs().map(Value::Int).ok_or(EvalError::Overflow),
                    Value::Bool(b) => Ok(Value::Int(i64::from(b))),
                    Value::Float(x) => Ok(Value::Float(x.abs())),
                    other => Err(mismatch(function, &[&other])),
                }
            }
            "min" | "max" => {
                let wanted = if function == "min" {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                let mut values = values.into_iter();
                let mut best = values.next().ok_or_else(|| EvalError::Arity {
                    function: function.to_string(),
                    expected: "at least 1".to_string(),
                    found: 0,
                })?;
                for value in values {
                    if order(function, &value, &best)? == wanted {
                        best = value;
                    }
                }
                Ok(best)
            }
            _ => Err(EvalError::UnknownFunction(function.to_string())),
        }
    }

    fn send(&mut self, args: &[Expr], keywords: &[(String, Expr)]) -> Result<Value, EvalError> {
        if self.outbox.is_none() {
            return Err(EvalError::CapabilityDenied(
                "send() is not available in guards".to_string(),
            ));
        }
        let [name] = args else {
            return Err(EvalError::Arity {
                function: "send".to_string(),
                expected: "1".to_string(),
                found: args.len(),
            });
        };
        let name = match self.eval(name)? {
            Value::Str(name) => name,
            other => return Err(mismatch("send", &[&other])),
        };
        let mut event = Event::new(name);
        for (key, expr) in keywords {
            let value = self.eval(expr)?;
            event = event.with(key.clone(), value);
        }
        if let Some(outbox) = &mut self.outbox {
            outbox.push(event);
        }
        Ok(Value::None)
    }
}

fn exactly<const N: usize>(function: &str, values: Vec<Value>) -> Result<[Value; N], EvalError> {
    let found = values.len();
    values.try_into().map_err(|_| EvalError::Arity {
        function: function.to_string(),
        expected: N.to_string(),
        found,
    })
}

fn mismatch(operation: &str, operands: &[&Value]) -> EvalError {
    let operands = operands
        .iter()
        .map(|v| format!("'{}'", v.type_name()))
        .collect::<Vec<_>>()
        .join(" and ");
    EvalError::TypeMismatch {
        operation: operation.to_string(),
        operands,
    }
}

/// Integer view of a value for integer arithmetic. Booleans count as 0/1.
fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnaryOp::Neg => match value {
            Value::Float(x) => Ok(Value::Float(-x)),
            other => match integer(&other) {
                Some(i) => i.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
                None => Err(mismatch("unary -", &[&other])),
            },
        },
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    if let (BinaryOp::Add, Value::Str(l), Value::Str(r)) = (op, &left, &right) {
        return Ok(Value::Str(format!("{l}{r}")));
    }

    if let (Some(l), Some(r)) = (integer(&left), integer(&right)) {
        return integer_binary(op, l, r);
    }

    let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) else {
        return Err(mismatch(op.symbol(), &[&left, &right]));
    };
    let result = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod if r == 0.0 => {
            return Err(EvalError::DivisionByZero)
        }
        BinaryOp::Div => l / r,
        BinaryOp::FloorDiv => (l / r).floor(),
        BinaryOp::Mod => {
            let rem = l % r;
            if rem != 0.0 && (rem < 0.0) != (r < 0.0) {
                rem + r
            } else {
                rem
            }
        }
    };
    Ok(Value::Float(result))
}

fn integer_binary(op: BinaryOp, l: i64, r: i64) -> Result<Value, EvalError> {
    let checked = match op {
        BinaryOp::Add => l.checked_add(r),
        BinaryOp::Sub => l.checked_sub(r),
        BinaryOp::Mul => l.checked_mul(r),
        BinaryOp::Div if r == 0 => return Err(EvalError::DivisionByZero),
        BinaryOp::Div => return Ok(Value::Float(l as f64 / r as f64)),
        BinaryOp::FloorDiv | BinaryOp::Mod if r == 0 => return Err(EvalError::DivisionByZero),
        // Floor semantics: the remainder takes the divisor's sign.
        BinaryOp::FloorDiv => l.checked_div_euclid(r).map(|q| {
            if r < 0 && l.rem_euclid(r) != 0 {
                q - 1
            } else {
                q
            }
        }),
        BinaryOp::Mod => l.checked_rem_euclid(r).map(|m| {
            if r < 0 && m != 0 {
                m + r
            } else {
                m
            }
        }),
    };
    checked.map(Value::Int).ok_or(EvalError::Overflow)
}

fn equals(left: &Value, right: &Value) -> bool {
    if let (Some(l), Some(r)) = (integer(left), integer(right)) {
        return l == r;
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

fn order(operation: &str, left: &Value, right: &Value) -> Result<Ordering, EvalError> {
    if let (Some(l), Some(r)) = (integer(left), integer(right)) {
        return Ok(l.cmp(&r));
    }
    if let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) {
        // NaN compares as neither smaller nor greater.
        return Ok(l.partial_cmp(&r).unwrap_or(Ordering::Equal));
    }
    match (left, right) {
        (Value::Str(l), Value::Str(r)) => Ok(l.cmp(r)),
        _ => Err(mismatch(operation, &[left, right])),
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    let result = match op {
        CompareOp::Eq => equals(left, right),
        CompareOp::Ne => !equals(left, right),
        CompareOp::Lt => order(op.symbol(), left, right)? == Ordering::Less,
        CompareOp::Le => order(op.symbol(), left, right)? != Ordering::Greater,
        CompareOp::Gt => order(op.symbol(), left, right)? == Ordering::Greater,
        CompareOp::Ge => order(op.symbol(), left, right)? != Ordering::Less,
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_division_and_modulo_follow_the_divisor_sign() {
        assert_eq!(binary(BinaryOp::FloorDiv, Value::Int(7), Value::Int(2)), Ok(Value::Int(3)));
        assert_eq!(binary(BinaryOp::FloorDiv, Value::Int(-7), Value::Int(2)), Ok(Value::Int(-4)));
        assert_eq!(binary(BinaryOp::FloorDiv, Value::Int(7), Value::Int(-2)), Ok(Value::Int(-4)));
        assert_eq!(binary(BinaryOp::FloorDiv, Value::Int(-7), Value::Int(-2)), Ok(Value::Int(3)));
        assert_eq!(binary(BinaryOp::Mod, Value::Int(-7), Value::Int(3)), Ok(Value::Int(2)));
        assert_eq!(binary(BinaryOp::Mod, Value::Int(7), Value::Int(-3)), Ok(Value::Int(-2)));
        assert_eq!(binary(BinaryOp::Mod, Value::Int(-7), Value::Int(-3)), Ok(Value::Int(-1)));
        assert_eq!(
            binary(BinaryOp::Mod, Value::Float(-1.0), Value::Float(3.0)),
            Ok(Value::Float(2.0))
        );
    }

    #[test]
    fn true_division_yields_floats() {
        assert_eq!(binary(BinaryOp::Div, Value::Int(3), Value::Int(2)), Ok(Value::Float(1.5)));
        assert_eq!(
            binary(BinaryOp::Div, Value::Int(1), Value::Int(0)),
            Err(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn integer_overflow_is_reported() {
        assert_eq!(
            binary(BinaryOp::Add, Value::Int(i64::MAX), Value::Int(1)),
            Err(EvalError::Overflow)
        );
        assert_eq!(unary(UnaryOp::Neg, Value::Int(i64::MIN)), Err(EvalError::Overflow));
    }

    #[test]
    fn mixed_types_are_rejected() {
        assert_eq!(
            binary(BinaryOp::Add, Value::Str("a".into()), Value::Int(1)),
            Err(EvalError::TypeMismatch {
                operation: "+".into(),
                operands: "'str' and 'int'".into()
            })
        );
        assert!(compare(CompareOp::Lt, &Value::None, &Value::Int(1)).is_err());
    }

    #[test]
    fn numbers_compare_across_types() {
        assert!(equals(&Value::Int(1), &Value::Float(1.0)));
        assert!(equals(&Value::Bool(true), &Value::Int(1)));
        assert!(!equals(&Value::Str("1".into()), &Value::Int(1)));
        assert_eq!(compare(CompareOp::Ge, &Value::Float(2.5), &Value::Int(2)), Ok(true));
        assert_eq!(
            compare(CompareOp::Lt, &Value::Str("a".into()), &Value::Str("b".into())),
            Ok(true)
        );
    }
}
