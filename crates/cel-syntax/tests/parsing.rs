//! Integration tests for accepted inputs.

use cel_syntax::{parse, BinaryOp, Expr, SpannedExpr};

fn parse_ok(input: &str) -> SpannedExpr {
    parse(input).unwrap_or_else(|e| panic!("parse of {:?} failed: {}", input, e))
}

#[test]
fn numeric_literals() {
    assert_eq!(parse_ok("42").node, Expr::Int(42));
    assert_eq!(parse_ok("0x10").node, Expr::Int(16));
    assert_eq!(parse_ok("42u").node, Expr::UInt(42));
    assert_eq!(parse_ok("0x2Au").node, Expr::UInt(42));
    assert_eq!(parse_ok("4.5").node, Expr::Double(4.5));
    assert_eq!(parse_ok("1e3").node, Expr::Double(1000.0));
    assert_eq!(parse_ok("2.5e-1").node, Expr::Double(0.25));
}

#[test]
fn negative_hex_is_unary_negation() {
    if let Expr::Unary { expr, .. } = &parse_ok("-0x10").node {
        assert_eq!(expr.node, Expr::Int(16));
    } else {
        panic!("expected unary");
    }
}

#[test]
fn string_literal_forms() {
    assert_eq!(
        parse_ok(r#""double""#).node,
        Expr::String("double".to_string())
    );
    assert_eq!(
        parse_ok("'single'").node,
        Expr::String("single".to_string())
    );
    assert_eq!(
        parse_ok(r#"r"raw\n""#).node,
        Expr::String(r"raw\n".to_string())
    );
    assert_eq!(
        parse_ok("'''tri'ple'''").node,
        Expr::String("tri'ple".to_string())
    );
    assert_eq!(
        parse_ok(r#""esc\n""#).node,
        Expr::String("esc\n".to_string())
    );
    assert_eq!(parse_ok(r#""\101""#).node, Expr::String("A".to_string()));
}

#[test]
fn bytes_literals_are_distinct_from_strings() {
    assert_eq!(parse_ok(r#"b"abc""#).node, Expr::Bytes(b"abc".to_vec()));
    assert_eq!(parse_ok(r#"b"\xFF""#).node, Expr::Bytes(vec![0xFF]));
}

#[test]
fn operator_precedence_chain() {
    // a || b && c == d + e * -f
    let ast = parse_ok("a || b && c == d + e * -f");
    if let Expr::Binary { op, .. } = &ast.node {
        assert_eq!(*op, BinaryOp::Or);
    } else {
        panic!("expected || at the root");
    }
}

#[test]
fn relations_chain_left_associatively() {
    // a < b < c parses as (a < b) < c
    if let Expr::Binary { op, left, .. } = &parse_ok("a < b < c").node {
        assert_eq!(*op, BinaryOp::Lt);
        assert!(matches!(
            left.node,
            Expr::Binary {
                op: BinaryOp::Lt,
                ..
            }
        ));
    } else {
        panic!("expected binary");
    }
}

#[test]
fn in_operator() {
    if let Expr::Binary { op, .. } = &parse_ok("2 in [1, 2]").node {
        assert_eq!(*op, BinaryOp::In);
    } else {
        panic!("expected binary");
    }
}

#[test]
fn postfix_chain() {
    // a.b[0].c(1) - member, index, member, call
    let ast = parse_ok("a.b[0].c(1)");
    if let Expr::Call { target, name, .. } = &ast.node {
        assert_eq!(name, "c");
        assert!(matches!(target.as_ref().unwrap().node, Expr::Index { .. }));
    } else {
        panic!("expected call");
    }
}

#[test]
fn comprehension_macros_expand() {
    for src in [
        "[1,2,3].map(x, x * 2)",
        "[1,2,3].filter(x, x > 1)",
        "[1,2,3].all(x, x > 0)",
        "[1,2,3].exists(x, x == 2)",
        "[1,2,3].existsOne(x, x == 2)",
        "xs.map(x, xs.filter(y, y < x))",
    ] {
        let ast = parse_ok(src);
        assert!(
            matches!(ast.node, Expr::Comprehension { .. }),
            "{} did not expand",
            src
        );
    }
}

#[test]
fn struct_literal_with_member_chain_type() {
    let ast = parse_ok("pkg.Type{value: 1}");
    if let Expr::Struct { type_name, fields } = &ast.node {
        assert!(matches!(type_name.node, Expr::Member { .. }));
        assert_eq!(fields.len(), 1);
    } else {
        panic!("expected struct");
    }
}

#[test]
fn comments_are_skipped() {
    let ast = parse_ok("1 + // add\n2");
    assert!(matches!(
        ast.node,
        Expr::Binary {
            op: BinaryOp::Add,
            ..
        }
    ));
}

#[test]
fn parsing_is_deterministic() {
    let a = parse_ok("[1, 2].map(x, x * 2) == y ? 'a' : 'b'");
    let b = parse_ok("[1, 2].map(x, x * 2) == y ? 'a' : 'b'");
    assert_eq!(a, b);
}
