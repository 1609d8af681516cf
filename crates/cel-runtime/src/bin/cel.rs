//! Command-line CEL evaluator.
//!
//! Usage: cel <expression> [name=value]...
//!
//! Each binding value is classified by attempted parses in order:
//! integer, double, bool, string.

use std::process::ExitCode;

use cel_runtime::{CelError, Env, MapActivation, Value};

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);

    let expression = match args.next() {
        Some(expr) => expr,
        None => {
            eprintln!("usage: cel <expression> [name=value]...");
            return ExitCode::from(2);
        }
    };

    let mut activation = MapActivation::new();
    for binding in args {
        match binding.split_once('=') {
            Some((name, raw)) => activation.insert(name, classify(raw)),
            None => {
                eprintln!("invalid binding '{}': expected name=value", binding);
                return ExitCode::from(2);
            }
        }
    }

    match Env::new().eval(&expression, &activation) {
        Ok(value) => {
            // Canonical text: bare strings print unquoted
            println!("{}", value.to_text());
            ExitCode::SUCCESS
        }
        Err(CelError::Parse(e)) => {
            eprintln!("Parse error: {}", e);
            ExitCode::FAILURE
        }
        Err(CelError::Eval(e)) => {
            eprintln!("Evaluation error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Classify a binding value: integer, double, bool, or string, in that
/// order of attempted parses.
fn classify(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(d) = raw.parse::<f64>() {
        return Value::Double(d);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::from(raw),
    }
}
