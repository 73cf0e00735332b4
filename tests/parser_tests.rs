// tests/parser_tests.rs

use std::rc::Rc;

use ngexpr::ast::{BinOp, Expr};
use ngexpr::parser::{Location, ParseError, Parser};
use ngexpr::value::Value;
use pretty_assertions::assert_eq;

fn parse(input: &str) -> Expr {
    Parser::new().parse(input).unwrap().as_ref().clone()
}

fn parse_error(input: &str) -> String {
    Parser::new().parse(input).unwrap_err().to_string()
}

fn scope(name: &str) -> Expr {
    Expr::AccessScope {
        name: name.to_string(),
    }
}

fn member(object: Expr, name: &str) -> Expr {
    Expr::AccessMember {
        object: Box::new(object),
        name: name.to_string(),
    }
}

fn int(n: i64) -> Expr {
    Expr::LiteralPrimitive(Value::Integer(n))
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

// ============================================================================
// Cache
// ============================================================================

#[test]
fn test_same_input_returns_same_tree() {
    let parser = Parser::new();
    let first = parser.parse("a.b + c").unwrap();
    let second = parser.parse("a.b + c").unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(parser.cached(), 1);
}

#[test]
fn test_cache_is_keyed_by_exact_text() {
    let parser = Parser::new();
    let first = parser.parse("a+b").unwrap();
    let second = parser.parse("a + b").unwrap();
    assert!(!Rc::ptr_eq(&first, &second));
    assert_eq!(first, second);
    assert_eq!(parser.cached(), 2);
}

#[test]
fn test_errors_are_not_cached() {
    let parser = Parser::new();
    assert!(parser.parse("a +").is_err());
    assert!(parser.parse("a +").is_err());
    assert_eq!(parser.cached(), 0);
}

// ============================================================================
// Access and Calls
// ============================================================================

#[test]
fn test_scope_access() {
    assert_eq!(parse("a"), scope("a"));
}

#[test]
fn test_member_chain() {
    assert_eq!(parse("a.b.c"), member(member(scope("a"), "b"), "c"));
}

#[test]
fn test_keyed_access() {
    assert_eq!(
        parse("items[0]"),
        Expr::AccessKeyed {
            object: Box::new(scope("items")),
            key: Box::new(int(0)),
        }
    );
}

#[test]
fn test_calls() {
    assert_eq!(
        parse("f(1, a)"),
        Expr::CallScope {
            name: "f".to_string(),
            args: vec![int(1), scope("a")],
        }
    );
    assert_eq!(
        parse("a.f()"),
        Expr::CallMember {
            object: Box::new(scope("a")),
            name: "f".to_string(),
            args: vec![],
        }
    );
    assert_eq!(
        parse("f()()"),
        Expr::CallFunction {
            function: Box::new(Expr::CallScope {
                name: "f".to_string(),
                args: vec![],
            }),
            args: vec![],
        }
    );
}

#[test]
fn test_reserved_words_as_names() {
    assert_eq!(parse("this"), scope("this"));
    assert_eq!(parse("o.if"), member(scope("o"), "if"));
    assert_eq!(
        parse("const()"),
        Expr::CallScope {
            name: "const".to_string(),
            args: vec![],
        }
    );
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_primitive_literals() {
    assert_eq!(parse("null"), Expr::LiteralPrimitive(Value::Null));
    assert_eq!(parse("undefined"), Expr::LiteralPrimitive(Value::Null));
    assert_eq!(parse("true"), Expr::LiteralPrimitive(Value::Boolean(true)));
    assert_eq!(parse("false"), Expr::LiteralPrimitive(Value::Boolean(false)));
    assert_eq!(parse("1.5"), Expr::LiteralPrimitive(Value::Float(1.5)));
    assert_eq!(parse("'x'"), Expr::LiteralString("x".to_string()));
}

#[test]
fn test_array_literal() {
    assert_eq!(
        parse("[1, a, 'b']"),
        Expr::LiteralArray(vec![int(1), scope("a"), Expr::LiteralString("b".to_string())])
    );
    assert_eq!(parse("[]"), Expr::LiteralArray(vec![]));
}

#[test]
fn test_object_literal_keys() {
    assert_eq!(
        parse("{a: 1, 'b c': 2, \"d\": 3, 4: 5, true: 6}"),
        Expr::LiteralObject {
            keys: vec!["a", "b c", "d", "4", "true"]
                .into_iter()
                .map(String::from)
                .collect(),
            values: vec![int(1), int(2), int(3), int(5), int(6)],
        }
    );
    assert_eq!(
        parse("{}"),
        Expr::LiteralObject {
            keys: vec![],
            values: vec![],
        }
    );
}

// ============================================================================
// Operators and Precedence
// ============================================================================

#[test]
fn test_multiplicative_binds_tighter_than_additive() {
    assert_eq!(
        parse("1+2*3"),
        binary(BinOp::Add, int(1), binary(BinOp::Multiply, int(2), int(3)))
    );
}

#[test]
fn test_left_associative() {
    assert_eq!(
        parse("a-b-c"),
        binary(
            BinOp::Subtract,
            binary(BinOp::Subtract, scope("a"), scope("b")),
            scope("c")
        )
    );
}

#[test]
fn test_logical_precedence() {
    assert_eq!(
        parse("a || b && c"),
        binary(BinOp::Or, scope("a"), binary(BinOp::And, scope("b"), scope("c")))
    );
}

#[test]
fn test_equality_below_relational() {
    assert_eq!(
        parse("a == b < c"),
        binary(BinOp::Equal, scope("a"), binary(BinOp::LessThan, scope("b"), scope("c")))
    );
}

#[test]
fn test_all_binary_operators() {
    let cases = [
        ("a==b", BinOp::Equal),
        ("a!=b", BinOp::NotEqual),
        ("a<b", BinOp::LessThan),
        ("a>b", BinOp::GreaterThan),
        ("a<=b", BinOp::LessEqual),
        ("a>=b", BinOp::GreaterEqual),
        ("a+b", BinOp::Add),
        ("a-b", BinOp::Subtract),
        ("a*b", BinOp::Multiply),
        ("a/b", BinOp::Divide),
        ("a~/b", BinOp::FloorDivide),
        ("a%b", BinOp::Modulo),
        ("a&&b", BinOp::And),
        ("a||b", BinOp::Or),
    ];
    for (input, op) in cases {
        assert_eq!(parse(input), binary(op, scope("a"), scope("b")), "input: {}", input);
    }
}

#[test]
fn test_unary_operators() {
    assert_eq!(parse("-a"), binary(BinOp::Subtract, int(0), scope("a")));
    assert_eq!(parse("+a"), scope("a"));
    assert_eq!(
        parse("!!a"),
        Expr::PrefixNot {
            expr: Box::new(Expr::PrefixNot {
                expr: Box::new(scope("a")),
            }),
        }
    );
}

#[test]
fn test_conditional_is_right_associative() {
    assert_eq!(
        parse("a ? b : c ? d : e"),
        Expr::Conditional {
            condition: Box::new(scope("a")),
            yes: Box::new(scope("b")),
            no: Box::new(Expr::Conditional {
                condition: Box::new(scope("c")),
                yes: Box::new(scope("d")),
                no: Box::new(scope("e")),
            }),
        }
    );
}

#[test]
fn test_assignment_is_right_associative() {
    assert_eq!(
        parse("a = b = 1"),
        Expr::Assign {
            target: Box::new(scope("a")),
            value: Box::new(Expr::Assign {
                target: Box::new(scope("b")),
                value: Box::new(int(1)),
            }),
        }
    );
}

#[test]
fn test_parentheses() {
    assert_eq!(
        parse("(1+2)*3"),
        binary(BinOp::Multiply, binary(BinOp::Add, int(1), int(2)), int(3))
    );
}

// ============================================================================
// Filters and Chains
// ============================================================================

#[test]
fn test_filter_with_arguments() {
    assert_eq!(
        parse("x | f:a:1 | g"),
        Expr::Filter {
            expr: Box::new(Expr::Filter {
                expr: Box::new(scope("x")),
                name: "f".to_string(),
                args: vec![scope("a"), int(1)],
            }),
            name: "g".to_string(),
            args: vec![],
        }
    );
}

#[test]
fn test_filter_binds_looser_than_operators() {
    let expr = parse("a + b | f");
    assert_eq!(
        expr.all_args(),
        vec![&binary(BinOp::Add, scope("a"), scope("b"))]
    );
}

#[test]
fn test_chain() {
    assert_eq!(parse("a;b"), Expr::Chain(vec![scope("a"), scope("b")]));
    assert_eq!(parse("a b"), Expr::Chain(vec![scope("a"), scope("b")]));
}

#[test]
fn test_leading_and_trailing_semicolons() {
    assert_eq!(parse(";;1;;"), int(1));
    assert_eq!(parse("x.y.z=123;"), Expr::Assign {
        target: Box::new(member(member(scope("x"), "y"), "z")),
        value: Box::new(int(123)),
    });
}

#[test]
fn test_empty_input() {
    assert_eq!(parse(""), Expr::Chain(vec![]));
    assert_eq!(parse("  "), Expr::Chain(vec![]));
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_display_canonical_source() {
    let cases = [
        ("a+b*c", "(a + (b * c))"),
        ("a.b[c](d, 1)", "a.b[c](d, 1)"),
        ("!a ? 'x' : null", "(!a ? \"x\" : null)"),
        ("{a: 1, 'b c': [2]}", "{a: 1, \"b c\": [2]}"),
        ("x|f:1:y", "x | f:1:y"),
        ("a = 1; b.c()", "(a = 1); b.c()"),
        ("x = 2.0", "(x = 2.0)"),
        ("-a", "(0 - a)"),
    ];
    for (input, expected) in cases {
        assert_eq!(parse(input).to_string(), expected, "input: {}", input);
    }
}

#[test]
fn test_rendering_parses_back_to_same_tree() {
    let inputs = [
        "a+b*c-d/e",
        "a ? b : c ? d : e",
        "x[1].y(z) | f:2",
        "{k: [1, 'two']}",
        "1 + (a = 2)",
        "a = b = 1; c",
        "1.0 + 2.5e3",
        "1e400",
    ];
    for input in inputs {
        let expr = parse(input);
        assert_eq!(parse(&expr.to_string()), expr, "input: {}", input);
    }
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unconsumed_token() {
    assert_eq!(
        parse_error(")"),
        "Parser Error: Unconsumed token ) at column 1 in expression [)]"
    );
    assert_eq!(
        parse_error("a]"),
        "Parser Error: Unconsumed token ] at column 2 in expression [a]]"
    );
}

#[test]
fn test_missing_expected_token() {
    assert_eq!(
        parse_error("a(b"),
        "Parser Error: Missing expected ) at the end of expression [a(b]"
    );
}

#[test]
fn test_bad_assignment() {
    assert_eq!(
        parse_error("5=4"),
        "Parser Error: Expression 5 is not assignable at column 2 in expression [5=4]"
    );
    assert_eq!(
        parse_error("array[5=4]"),
        "Parser Error: Expression 5 is not assignable at column 8 in expression [array[5=4]]"
    );
    assert_eq!(
        parse_error("a + b = 4"),
        "Parser Error: Expression a + b is not assignable at column 7 in expression [a + b = 4]"
    );
}

#[test]
fn test_incomplete_ternary() {
    assert_eq!(
        parse_error("true?1"),
        "Parser Error: Conditional expression true?1 requires all 3 expressions at the end of expression [true?1]"
    );
}

#[test]
fn test_unexpected_end() {
    assert_eq!(
        parse_error("[].count("),
        "Parser Error: Unexpected end of expression at the end of expression [[].count(]"
    );
}

#[test]
fn test_unexpected_token() {
    assert_eq!(
        parse_error("a.+"),
        "Parser Error: Unexpected token + at column 3 in expression [a.+]"
    );
    assert_eq!(
        parse_error("{a 1}"),
        "Parser Error: Missing expected : at column 4 in expression [{a 1}]"
    );
}

#[test]
fn test_filter_in_chain() {
    assert_eq!(
        parse_error("1;'World'|hello"),
        "Parser Error: cannot have a filter in a chain at the end of expression [1;'World'|hello]"
    );
    assert_eq!(
        parse_error("'World'|hello;1"),
        "Parser Error: cannot have a filter in a chain at column 15 in expression ['World'|hello;1]"
    );
}

#[test]
fn test_error_fields() {
    let err = Parser::new().parse("5=4").unwrap_err();
    assert_eq!(
        err,
        ParseError::Syntax {
            reason: "Expression 5 is not assignable".to_string(),
            location: Location::Column(2),
            input: "5=4".to_string(),
        }
    );
    assert_eq!(err.reason(), "Expression 5 is not assignable");
}

#[test]
fn test_lexer_errors_pass_through() {
    let err = Parser::new().parse("a # b").unwrap_err();
    assert!(matches!(err, ParseError::Lex(_)));
    assert_eq!(
        err.to_string(),
        "Lexer Error: Unexpected next character [#] at column 3 in expression [a # b]"
    );
}
