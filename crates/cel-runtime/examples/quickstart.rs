//! Compile once, evaluate against different bindings.
//!
//! Run with: cargo run -p cel-runtime --example quickstart

use cel_runtime::{Env, MapActivation, Value};

fn main() {
    let env = Env::new();

    let program = env
        .compile("age >= 21 && user.startsWith('admin')")
        .unwrap();

    let mut activation = MapActivation::new();
    activation.insert("user", "admin_alice"); // &str converts automatically
    activation.insert("age", 25); // integers widen automatically

    let result = program.eval(&activation).unwrap();
    assert_eq!(result, Value::Bool(true));

    println!("Expression: age >= 21 && user.startsWith('admin')");
    println!("Result: {}", result);
}
