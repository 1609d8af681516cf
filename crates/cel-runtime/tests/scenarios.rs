//! End-to-end scenarios: compile and evaluate through the public API.

use cel_runtime::{CelError, Env, MapActivation, Value};

fn eval(source: &str) -> Result<Value, CelError> {
    Env::new().eval(source, &MapActivation::new())
}

fn eval_with(source: &str, vars: &[(&str, Value)]) -> Result<Value, CelError> {
    let mut activation = MapActivation::new();
    for (name, value) in vars {
        activation.insert(*name, value.clone());
    }
    Env::new().eval(source, &activation)
}

#[test]
fn arithmetic_precedence() {
    assert_eq!(eval("2 + 3 * 4").unwrap(), Value::Int(14));
    assert_eq!(eval("(2 + 3) * 4").unwrap(), Value::Int(20));
}

#[test]
fn integer_division_produces_double() {
    assert_eq!(eval("10 / 3").unwrap(), Value::Double(3.3333333333333335));
}

#[test]
fn string_concatenation_with_binding() {
    assert_eq!(
        eval_with("\"Hello, \" + name", &[("name", Value::from("World"))]).unwrap(),
        Value::from("Hello, World")
    );
}

#[test]
fn policy_check_with_ternary() {
    let vars = [
        ("age", Value::Int(25)),
        ("hasLicense", Value::Bool(true)),
    ];
    assert_eq!(
        eval_with(
            "age >= 18 && hasLicense ? \"can drive\" : \"cannot drive\"",
            &vars
        )
        .unwrap(),
        Value::from("can drive")
    );

    let vars = [
        ("age", Value::Int(16)),
        ("hasLicense", Value::Bool(false)),
    ];
    assert_eq!(
        eval_with(
            "age >= 18 && hasLicense ? \"can drive\" : \"cannot drive\"",
            &vars
        )
        .unwrap(),
        Value::from("cannot drive")
    );
}

#[test]
fn filter_then_map() {
    assert_eq!(
        eval("[1, 2, 3, 4, 5].filter(x, x > 2).map(x, x * 10)").unwrap(),
        Value::list([30, 40, 50])
    );
}

#[test]
fn has_over_bound_maps() {
    let user = Value::map([("name", "Alice"), ("email", "a@b")]);
    assert_eq!(
        eval_with("has(user, \"email\")", &[("user", user)]).unwrap(),
        Value::Bool(true)
    );

    let user = Value::map([("name", "Alice")]);
    assert_eq!(
        eval_with("has(user, \"email\")", &[("user", user)]).unwrap(),
        Value::Bool(false)
    );
}

#[test]
fn regex_matching() {
    assert_eq!(
        eval("matches(\"test@example.com\", \".*@.*\")").unwrap(),
        Value::Bool(true)
    );
}

#[test]
fn evaluation_errors() {
    assert!(matches!(eval("1 / 0"), Err(CelError::Eval(_))));
    assert!(matches!(
        eval_with("x + y", &[("x", Value::Int(1))]),
        Err(CelError::Eval(_))
    ));
}

#[test]
fn quantifier_macros() {
    assert_eq!(eval("[2, 4, 6].all(x, x % 2 == 0)").unwrap(), Value::Bool(true));
    assert_eq!(
        eval("[1, 3, 5].exists(x, x % 2 == 0)").unwrap(),
        Value::Bool(false)
    );
}

#[test]
fn raw_and_escaped_strings() {
    // Raw: backslash-n stays two characters
    assert_eq!(eval(r#"size(r"\n")"#).unwrap(), Value::Int(2));
    // Interpreted: a single newline character
    assert_eq!(eval(r#"size("\n")"#).unwrap(), Value::Int(1));
    // Octal escape
    assert_eq!(eval(r#""\101""#).unwrap(), Value::from("A"));
}

#[test]
fn hex_literals() {
    assert_eq!(eval("0x10 == 16").unwrap(), Value::Bool(true));
    assert_eq!(eval("-0x10 == -16").unwrap(), Value::Bool(true));
}

#[test]
fn macro_hygiene_restores_outer_bindings() {
    let vars = [("x", Value::Int(7))];
    // The iteration variable shadows x inside the body only
    assert_eq!(
        eval_with("[1, 2, 3].map(x, x * 2) + [x]", &vars).unwrap(),
        Value::list([2, 4, 6, 7])
    );
}

#[test]
fn deterministic_evaluation() {
    let env = Env::new();
    let program = env
        .compile("[x, 2, 3].filter(n, n % 2 == 1).map(n, n * n)")
        .unwrap();

    let mut activation = MapActivation::new();
    activation.insert("x", 1);

    let first = program.eval(&activation).unwrap();
    let second = program.eval(&activation).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, Value::list([1, 9]));
}

#[test]
fn structural_equality_of_collections() {
    assert_eq!(eval("[1, [2, 3]] == [1, [2, 3]]").unwrap(), Value::Bool(true));
    assert_eq!(eval("[1, 2] == [2, 1]").unwrap(), Value::Bool(false));
    assert_eq!(
        eval("{\"a\": 1, \"b\": 2} == {\"b\": 2, \"a\": 1}").unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        eval("{\"a\": 1} == {\"a\": 2}").unwrap(),
        Value::Bool(false)
    );
}

#[test]
fn parse_errors_do_not_evaluate() {
    for src in ["2 +", "(1", "in", "\"unterminated", "1 2"] {
        assert!(
            matches!(eval(src), Err(CelError::Parse(_))),
            "{:?} should be a parse error",
            src
        );
    }
}

#[test]
fn conversions_and_type_introspection() {
    assert_eq!(eval("int(\"42\") + 1").unwrap(), Value::Int(43));
    assert_eq!(eval("string(3.5)").unwrap(), Value::from("3.5"));
    assert_eq!(eval("type([1]) == \"list\"").unwrap(), Value::Bool(true));
    assert_eq!(eval("uint(3) == 3u").unwrap(), Value::Bool(true));
    assert_eq!(eval("double(2) == 2.0").unwrap(), Value::Bool(true));
}

#[test]
fn timestamp_pipeline() {
    assert_eq!(
        eval("timestamp(\"2009-02-13T23:31:30Z\").getFullYear()").unwrap(),
        Value::Int(2009)
    );
    assert_eq!(
        eval("duration(\"1h30m\").getMinutes()").unwrap(),
        Value::Int(90)
    );
}

#[test]
fn nested_data_navigation() {
    let request = Value::map([
        ("user", Value::map([("role", "admin"), ("name", "alice")])),
        ("paths", Value::list(["/admin", "/metrics"])),
    ]);
    let vars = [("request", request)];

    assert_eq!(
        eval_with("request.user.role == \"admin\"", &vars).unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        eval_with("\"/admin\" in request.paths", &vars).unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        eval_with(
            "request.paths.filter(p, p.startsWith(\"/a\"))",
            &vars
        )
        .unwrap(),
        Value::list(["/admin"])
    );
}
