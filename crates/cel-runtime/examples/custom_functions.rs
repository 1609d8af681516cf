//! Extending the function table with embedder-defined functions.
//!
//! Run with: cargo run -p cel-runtime --example custom_functions

use cel_runtime::{Env, FunctionTable, MapActivation, StandardFunctions, Value};

/// A table that adds a `clamp` function and a `shout` string method,
/// delegating everything else to the standard library.
struct AppFunctions {
    standard: StandardFunctions,
}

impl FunctionTable for AppFunctions {
    fn call(&self, name: &str, args: &[Value]) -> Value {
        match (name, args) {
            ("clamp", [Value::Int(v), Value::Int(lo), Value::Int(hi)]) => {
                Value::Int(*v.max(lo).min(hi))
            }
            _ => self.standard.call(name, args),
        }
    }

    fn call_method(&self, receiver: &Value, name: &str, args: &[Value]) -> Value {
        match (receiver, name, args) {
            (Value::String(s), "shout", []) => Value::from(format!("{}!", s.to_uppercase())),
            _ => self.standard.call_method(receiver, name, args),
        }
    }
}

fn main() {
    let env = Env::with_function_table(AppFunctions {
        standard: StandardFunctions::new(),
    });

    let mut activation = MapActivation::new();
    activation.insert("temperature", 131);

    let clamped = env
        .eval("clamp(temperature, 0, 100)", &activation)
        .unwrap();
    println!("clamp(temperature, 0, 100) = {}", clamped);

    let shouted = env
        .eval("\"release the crates\".shout()", &activation)
        .unwrap();
    println!("shout() = {}", shouted);

    // The standard library is still available through the custom table
    let sized = env.eval("size([1, 2, 3])", &activation).unwrap();
    println!("size([1, 2, 3]) = {}", sized);
}
