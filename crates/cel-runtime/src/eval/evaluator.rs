//! Tree-walking evaluator for CEL expressions.
//!
//! The evaluator performs depth-first traversal of the AST, evaluating
//! each node and returning a `Value`. It supports:
//!
//! - Arithmetic, comparison, and logical operators
//! - Short-circuit evaluation for `&&`, `||`, and ternary
//! - Function and method calls through the function table
//! - Comprehension evaluation for the macros (`map`, `filter`, `all`,
//!   `exists`, `existsOne`)
//! - Error propagation (errors are values during evaluation)

use std::sync::Arc;

use cel_syntax::{BinaryOp, Expr, SpannedExpr, UnaryOp};

use super::{
    Activation, EvalError, FunctionTable, HierarchicalActivation, MapKey, Value, ValueMap,
};

/// The CEL expression evaluator.
///
/// Evaluates a CEL AST against an activation (variable bindings) and a
/// function table.
pub struct Evaluator<'a> {
    activation: &'a dyn Activation,
    functions: &'a dyn FunctionTable,
}

impl<'a> Evaluator<'a> {
    /// Create a new evaluator.
    pub fn new(activation: &'a dyn Activation, functions: &'a dyn FunctionTable) -> Self {
        Self {
            activation,
            functions,
        }
    }

    /// Evaluate an expression.
    pub fn eval(&self, expr: &SpannedExpr) -> Value {
        self.eval_expr(expr)
    }

    fn eval_expr(&self, expr: &SpannedExpr) -> Value {
        match &expr.node {
            // Literals
            Expr::Null => Value::Null,
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Int(i) => Value::Int(*i),
            Expr::UInt(u) => Value::UInt(*u),
            Expr::Double(d) => Value::Double(*d),
            Expr::String(s) => Value::String(Arc::from(s.as_str())),
            Expr::Bytes(b) => Value::Bytes(Arc::from(b.as_slice())),

            // Identifiers
            Expr::Ident(name) | Expr::RootIdent(name) => self.eval_ident(name),

            // Collections
            Expr::List(elements) => self.eval_list(elements),
            Expr::Map(entries) => self.eval_map(entries),
            Expr::Struct { fields, .. } => self.eval_struct(fields),

            // Operations
            Expr::Unary { op, expr } => self.eval_unary(*op, expr),
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right),
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => self.eval_ternary(cond, then_expr, else_expr),

            // Access
            Expr::Member { expr, field, test } => self.eval_member(expr, field, *test),
            Expr::Index { expr, index } => self.eval_index(expr, index),
            Expr::Call {
                target,
                name,
                args,
                is_macro,
            } => self.eval_call(target.as_deref(), name, args, *is_macro),

            // Comprehension
            Expr::Comprehension {
                iter_var,
                iter_range,
                accu_var,
                accu_init,
                loop_condition,
                loop_step,
                result,
            } => self.eval_comprehension(
                iter_var,
                iter_range,
                accu_var,
                accu_init,
                loop_condition,
                loop_step,
                result,
            ),
        }
    }

    fn eval_ident(&self, name: &str) -> Value {
        self.activation
            .resolve(name)
            .unwrap_or_else(|| Value::error(EvalError::unknown_identifier(name)))
    }

    fn eval_list(&self, elements: &[SpannedExpr]) -> Value {
        let mut values = Vec::with_capacity(elements.len());

        for elem in elements {
            let value = self.eval_expr(elem);
            if value.is_error() {
                return value;
            }
            values.push(value);
        }

        Value::List(Arc::from(values))
    }

    fn eval_map(&self, entries: &[(SpannedExpr, SpannedExpr)]) -> Value {
        let mut map = ValueMap::new();

        for (key_expr, value_expr) in entries {
            let key = self.eval_expr(key_expr);
            if key.is_error() {
                return key;
            }

            let value = self.eval_expr(value_expr);
            if value.is_error() {
                return value;
            }

            // Duplicate keys: last write wins
            match MapKey::from_value(&key) {
                Some(map_key) => map.insert(map_key, value),
                None => {
                    return Value::error(EvalError::type_mismatch(
                        "valid map key",
                        key.kind_name(),
                    ))
                }
            }
        }

        Value::Map(Arc::new(map))
    }

    /// Struct literals evaluate their field initializers left-to-right
    /// into a map keyed by field name; message types are not modeled.
    fn eval_struct(&self, fields: &[(String, SpannedExpr)]) -> Value {
        let mut map = ValueMap::new();

        for (name, value_expr) in fields {
            let value = self.eval_expr(value_expr);
            if value.is_error() {
                return value;
            }
            map.insert(MapKey::String(Arc::from(name.as_str())), value);
        }

        Value::Map(Arc::new(map))
    }

    fn eval_unary(&self, op: UnaryOp, expr: &SpannedExpr) -> Value {
        let value = self.eval_expr(expr);
        if value.is_error() {
            return value;
        }

        match op {
            UnaryOp::Neg => match value {
                Value::Int(i) => i
                    .checked_neg()
                    .map(Value::Int)
                    .unwrap_or_else(|| {
                        Value::error(EvalError::overflow("integer negation overflow"))
                    }),
                Value::Double(d) => Value::Double(-d),
                _ => Value::error(EvalError::type_mismatch(
                    "int or double",
                    value.kind_name(),
                )),
            },
            UnaryOp::Not => match value {
                Value::Bool(b) => Value::Bool(!b),
                _ => Value::error(EvalError::type_mismatch("bool", value.kind_name())),
            },
        }
    }

    fn eval_binary(&self, op: BinaryOp, left: &SpannedExpr, right: &SpannedExpr) -> Value {
        // Short-circuit evaluation for && and ||
        match op {
            BinaryOp::And => return self.eval_and(left, right),
            BinaryOp::Or => return self.eval_or(left, right),
            _ => {}
        }

        // Evaluate both operands, left then right
        let left_val = self.eval_expr(left);
        if left_val.is_error() {
            return left_val;
        }

        let right_val = self.eval_expr(right);
        if right_val.is_error() {
            return right_val;
        }

        match op {
            BinaryOp::Add => self.eval_add(left_val, right_val),
            BinaryOp::Sub => self.eval_sub(left_val, right_val),
            BinaryOp::Mul => self.eval_mul(left_val, right_val),
            BinaryOp::Div => self.eval_div(left_val, right_val),
            BinaryOp::Mod => self.eval_mod(left_val, right_val),
            BinaryOp::Eq => Value::Bool(left_val == right_val),
            BinaryOp::Ne => Value::Bool(left_val != right_val),
            BinaryOp::Lt => self.eval_ordering(left_val, right_val, "_<_", |ord| ord.is_lt()),
            BinaryOp::Le => self.eval_ordering(left_val, right_val, "_<=_", |ord| ord.is_le()),
            BinaryOp::Gt => self.eval_ordering(left_val, right_val, "_>_", |ord| ord.is_gt()),
            BinaryOp::Ge => self.eval_ordering(left_val, right_val, "_>=_", |ord| ord.is_ge()),
            BinaryOp::In => self.eval_in(left_val, right_val),
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    fn eval_and(&self, left: &SpannedExpr, right: &SpannedExpr) -> Value {
        let left_val = self.eval_expr(left);

        match left_val {
            // Short-circuit: right is not evaluated
            Value::Bool(false) => Value::Bool(false),
            Value::Bool(true) => {
                let right_val = self.eval_expr(right);
                match right_val {
                    Value::Bool(_) | Value::Error(_) => right_val,
                    other => Value::error(EvalError::type_mismatch("bool", other.kind_name())),
                }
            }
            Value::Error(_) => left_val,
            other => Value::error(EvalError::type_mismatch("bool", other.kind_name())),
        }
    }

    fn eval_or(&self, left: &SpannedExpr, right: &SpannedExpr) -> Value {
        let left_val = self.eval_expr(left);

        match left_val {
            // Short-circuit: right is not evaluated
            Value::Bool(true) => Value::Bool(true),
            Value::Bool(false) => {
                let right_val = self.eval_expr(right);
                match right_val {
                    Value::Bool(_) | Value::Error(_) => right_val,
                    other => Value::error(EvalError::type_mismatch("bool", other.kind_name())),
                }
            }
            Value::Error(_) => left_val,
            other => Value::error(EvalError::type_mismatch("bool", other.kind_name())),
        }
    }

    fn eval_add(&self, left: Value, right: Value) -> Value {
        match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(*b)
                .map(Value::Int)
                .unwrap_or_else(|| Value::error(EvalError::overflow("integer addition overflow"))),
            (Value::UInt(a), Value::UInt(b)) => a
                .checked_add(*b)
                .map(Value::UInt)
                .unwrap_or_else(|| Value::error(EvalError::overflow("unsigned addition overflow"))),
            (Value::Double(a), Value::Double(b)) => Value::Double(a + b),
            (Value::Int(a), Value::Double(b)) => Value::Double(*a as f64 + b),
            (Value::Double(a), Value::Int(b)) => Value::Double(a + *b as f64),
            (Value::List(a), Value::List(b)) => {
                let mut result = Vec::with_capacity(a.len() + b.len());
                result.extend(a.iter().cloned());
                result.extend(b.iter().cloned());
                Value::List(Arc::from(result))
            }
            (Value::Bytes(a), Value::Bytes(b)) => {
                let mut result = Vec::with_capacity(a.len() + b.len());
                result.extend_from_slice(a);
                result.extend_from_slice(b);
                Value::Bytes(Arc::from(result))
            }
            // String concatenation applies when either side is a string;
            // the other side is stringified.
            (Value::String(_), _) | (_, Value::String(_)) => {
                let mut result = left.to_text();
                result.push_str(&right.to_text());
                Value::String(Arc::from(result))
            }
            _ => Value::error(EvalError::no_matching_overload("_+_")),
        }
    }

    fn eval_sub(&self, left: Value, right: Value) -> Value {
        match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_sub(*b)
                .map(Value::Int)
                .unwrap_or_else(|| {
                    Value::error(EvalError::overflow("integer subtraction overflow"))
                }),
            (Value::UInt(a), Value::UInt(b)) => a
                .checked_sub(*b)
                .map(Value::UInt)
                .unwrap_or_else(|| {
                    Value::error(EvalError::overflow("unsigned subtraction overflow"))
                }),
            (Value::Double(a), Value::Double(b)) => Value::Double(a - b),
            (Value::Int(a), Value::Double(b)) => Value::Double(*a as f64 - b),
            (Value::Double(a), Value::Int(b)) => Value::Double(a - *b as f64),
            _ => Value::error(EvalError::no_matching_overload("_-_")),
        }
    }

    fn eval_mul(&self, left: Value, right: Value) -> Value {
        match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_mul(*b)
                .map(Value::Int)
                .unwrap_or_else(|| {
                    Value::error(EvalError::overflow("integer multiplication overflow"))
                }),
            (Value::UInt(a), Value::UInt(b)) => a
                .checked_mul(*b)
                .map(Value::UInt)
                .unwrap_or_else(|| {
                    Value::error(EvalError::overflow("unsigned multiplication overflow"))
                }),
            (Value::Double(a), Value::Double(b)) => Value::Double(a * b),
            (Value::Int(a), Value::Double(b)) => Value::Double(*a as f64 * b),
            (Value::Double(a), Value::Int(b)) => Value::Double(a * *b as f64),
            // Repetition: string or list times a non-negative integer
            (Value::String(s), Value::Int(n)) | (Value::Int(n), Value::String(s)) => {
                if *n < 0 {
                    Value::error(EvalError::invalid_argument(
                        "repeat count must be non-negative",
                    ))
                } else {
                    Value::String(Arc::from(s.repeat(*n as usize)))
                }
            }
            (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items)) => {
                if *n < 0 {
                    Value::error(EvalError::invalid_argument(
                        "repeat count must be non-negative",
                    ))
                } else {
                    let mut result = Vec::with_capacity(items.len() * *n as usize);
                    for _ in 0..*n {
                        result.extend(items.iter().cloned());
                    }
                    Value::List(Arc::from(result))
                }
            }
            _ => Value::error(EvalError::no_matching_overload("_*_")),
        }
    }

    /// Division always yields a double, including int/int, and a zero
    /// divisor is an error for every numeric kind.
    fn eval_div(&self, left: Value, right: Value) -> Value {
        let a = match as_number(&left) {
            Some(a) => a,
            None => return Value::error(EvalError::no_matching_overload("_/_")),
        };
        let b = match as_number(&right) {
            Some(b) => b,
            None => return Value::error(EvalError::no_matching_overload("_/_")),
        };

        if b == 0.0 {
            return Value::error(EvalError::division_by_zero());
        }

        Value::Double(a / b)
    }

    fn eval_mod(&self, left: Value, right: Value) -> Value {
        match (&left, &right) {
            (Value::Int(_), Value::Int(0)) => Value::error(EvalError::modulo_by_zero()),
            (Value::Int(a), Value::Int(b)) => a
                .checked_rem(*b)
                .map(Value::Int)
                .unwrap_or_else(|| Value::error(EvalError::overflow("integer modulo overflow"))),
            (Value::UInt(_), Value::UInt(0)) => Value::error(EvalError::modulo_by_zero()),
            (Value::UInt(a), Value::UInt(b)) => Value::UInt(a % b),
            _ => Value::error(EvalError::no_matching_overload("_%_")),
        }
    }

    fn eval_ordering(
        &self,
        left: Value,
        right: Value,
        op_name: &str,
        accept: fn(std::cmp::Ordering) -> bool,
    ) -> Value {
        match left.compare(&right) {
            Some(ord) => Value::Bool(accept(ord)),
            None => Value::error(EvalError::no_matching_overload(op_name)),
        }
    }

    fn eval_in(&self, left: Value, right: Value) -> Value {
        match &right {
            Value::List(list) => Value::Bool(list.iter().any(|elem| left == *elem)),
            Value::Map(map) => match MapKey::from_value(&left) {
                Some(key) => Value::Bool(map.contains_key_coerced(&key)),
                None => Value::error(EvalError::type_mismatch(
                    "valid map key",
                    left.kind_name(),
                )),
            },
            Value::String(s) => match &left {
                Value::String(sub) => Value::Bool(s.contains(sub.as_ref())),
                other => Value::error(EvalError::type_mismatch("string", other.kind_name())),
            },
            _ => Value::error(EvalError::no_matching_overload("_in_")),
        }
    }

    fn eval_ternary(
        &self,
        cond: &SpannedExpr,
        then_expr: &SpannedExpr,
        else_expr: &SpannedExpr,
    ) -> Value {
        let cond_val = self.eval_expr(cond);

        match cond_val {
            Value::Bool(true) => self.eval_expr(then_expr),
            Value::Bool(false) => self.eval_expr(else_expr),
            Value::Error(_) => cond_val,
            other => Value::error(EvalError::type_mismatch("bool", other.kind_name())),
        }
    }

    fn eval_member(&self, expr: &SpannedExpr, field: &str, test: bool) -> Value {
        let value = self.eval_expr(expr);
        if value.is_error() {
            return value;
        }

        match &value {
            Value::Map(map) => {
                let key = MapKey::String(Arc::from(field));
                match map.get(&key) {
                    Some(v) => v.clone(),
                    None if test => Value::Bool(false),
                    None => Value::error(EvalError::key_not_found(field)),
                }
            }
            Value::Null if test => Value::Bool(false),
            other => Value::error(EvalError::type_mismatch("map", other.kind_name())),
        }
    }

    fn eval_index(&self, expr: &SpannedExpr, index: &SpannedExpr) -> Value {
        let value = self.eval_expr(expr);
        if value.is_error() {
            return value;
        }

        let index_val = self.eval_expr(index);
        if index_val.is_error() {
            return index_val;
        }

        match &value {
            Value::List(list) => {
                let idx = match integer_index(&index_val) {
                    Some(i) => i,
                    None => {
                        return Value::error(EvalError::type_mismatch(
                            "int",
                            index_val.kind_name(),
                        ))
                    }
                };
                // No wrap-around: negative indexes are out of bounds
                if idx < 0 || idx as usize >= list.len() {
                    Value::error(EvalError::index_out_of_bounds(idx, list.len()))
                } else {
                    list[idx as usize].clone()
                }
            }
            Value::Map(map) => match MapKey::from_value(&index_val) {
                Some(key) => match map.get_coerced(&key) {
                    Some(v) => v.clone(),
                    None => Value::error(EvalError::key_not_found(&index_val.to_text())),
                },
                None => Value::error(EvalError::type_mismatch(
                    "valid map key",
                    index_val.kind_name(),
                )),
            },
            Value::String(s) => {
                let idx = match integer_index(&index_val) {
                    Some(i) => i,
                    None => {
                        return Value::error(EvalError::type_mismatch(
                            "int",
                            index_val.kind_name(),
                        ))
                    }
                };
                if idx < 0 {
                    return Value::error(EvalError::index_out_of_bounds(idx, s.chars().count()));
                }
                match s.chars().nth(idx as usize) {
                    Some(c) => Value::String(Arc::from(c.to_string())),
                    None => Value::error(EvalError::index_out_of_bounds(idx, s.chars().count())),
                }
            }
            other => Value::error(EvalError::type_mismatch(
                "list, map, or string",
                other.kind_name(),
            )),
        }
    }

    fn eval_call(
        &self,
        target: Option<&SpannedExpr>,
        name: &str,
        args: &[SpannedExpr],
        is_macro: bool,
    ) -> Value {
        // A macro call that survived to evaluation has a malformed first
        // argument.
        if is_macro {
            return Value::error(EvalError::invalid_argument(format!(
                "{}() requires an identifier as its first argument",
                name
            )));
        }

        match target {
            None => {
                let arg_values = match self.eval_args(args) {
                    Ok(values) => values,
                    Err(err) => return err,
                };
                self.functions.call(name, &arg_values)
            }
            Some(receiver) => {
                let receiver_val = self.eval_expr(receiver);
                if receiver_val.is_error() {
                    return receiver_val;
                }
                let arg_values = match self.eval_args(args) {
                    Ok(values) => values,
                    Err(err) => return err,
                };
                self.functions.call_method(&receiver_val, name, &arg_values)
            }
        }
    }

    fn eval_args(&self, args: &[SpannedExpr]) -> Result<Vec<Value>, Value> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let value = self.eval_expr(arg);
            if value.is_error() {
                return Err(value);
            }
            values.push(value);
        }
        Ok(values)
    }

    #[allow(clippy::too_many_arguments)]
    fn eval_comprehension(
        &self,
        iter_var: &str,
        iter_range: &SpannedExpr,
        accu_var: &str,
        accu_init: &SpannedExpr,
        loop_condition: &SpannedExpr,
        loop_step: &SpannedExpr,
        result: &SpannedExpr,
    ) -> Value {
        // The receiver is evaluated once and must be a list
        let range_val = self.eval_expr(iter_range);
        if range_val.is_error() {
            return range_val;
        }

        let list = match &range_val {
            Value::List(list) => list,
            other => return Value::error(EvalError::type_mismatch("list", other.kind_name())),
        };

        let mut accu = self.eval_expr(accu_init);
        if accu.is_error() {
            return accu;
        }

        for elem in list.iter() {
            // Scope frame per iteration: the iteration variable shadows
            // any outer binding of the same name and disappears with the
            // frame, on success and on error.
            let scope = HierarchicalActivation::new(self.activation)
                .with_binding(accu_var, accu.clone())
                .with_binding(iter_var, elem.clone());
            let inner = Evaluator::new(&scope, self.functions);

            let cond = inner.eval_expr(loop_condition);
            match cond {
                Value::Bool(true) => {}
                Value::Bool(false) => break,
                Value::Error(_) => return cond,
                other => {
                    return Value::error(EvalError::type_mismatch("bool", other.kind_name()))
                }
            }

            accu = inner.eval_expr(loop_step);
            if accu.is_error() {
                return accu;
            }
        }

        let scope = HierarchicalActivation::new(self.activation).with_binding(accu_var, accu);
        Evaluator::new(&scope, self.functions).eval_expr(result)
    }
}

/// Numeric view of a value, for division.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::UInt(u) => Some(*u as f64),
        Value::Double(d) => Some(*d),
        _ => None,
    }
}

/// Integer view of an index value (int or uint).
fn integer_index(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::UInt(u) if *u <= i64::MAX as u64 => Some(*u as i64),
        _ => None,
    }
}
