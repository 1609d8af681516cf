//! Comprehension macros over bound data.
//!
//! Run with: cargo run -p cel-runtime --example filters

use cel_runtime::{Env, MapActivation, Value};

fn main() {
    let env = Env::new();

    let mut activation = MapActivation::new();
    activation.insert("scores", Value::list([72, 91, 45, 88, 60]));

    for src in [
        "scores.filter(s, s >= 70)",
        "scores.map(s, s + 5)",
        "scores.all(s, s > 40)",
        "scores.exists(s, s > 90)",
        "scores.existsOne(s, s < 50)",
        "size(scores.filter(s, s >= 70).map(s, s * 2))",
    ] {
        let result = env.eval(src, &activation).unwrap();
        println!("{} = {}", src, result);
    }
}
