use std::{cell::RefCell, rc::Rc};

use ngexpr::{
    EvalError, FilterMap, ParseError, Parser, Value, WatchAst, WatchError, WatchParser, from_json,
    to_json,
    watch::ast::Observed,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn bridge() -> WatchParser {
    WatchParser::new(Rc::new(Parser::new()))
}

fn watch(text: &str) -> WatchAst {
    bridge().parse(text, &(), false, None).unwrap()
}

fn read(text: &str, context: &Value) -> Value {
    watch(text).evaluate(context).unwrap().into_value()
}

/// What a watcher remembers between checks: plain values by identity,
/// collections by their contents at the time of the check.
#[derive(Debug, PartialEq)]
enum Seen {
    Value(Value),
    Items(serde_json::Value),
}

/// Minimal dirty checker: re-reads the tree and reports what changed since
/// the previous check.
struct Watcher {
    tree: WatchAst,
    last: Option<Seen>,
}

impl Watcher {
    fn new(tree: WatchAst) -> Self {
        Watcher { tree, last: None }
    }

    fn check(&mut self, context: &Value) -> Option<Value> {
        let current = self.tree.evaluate(context).unwrap();
        let seen = match &current {
            Observed::Value(value) => Seen::Value(value.clone()),
            Observed::Changes(record) => Seen::Items(to_json(record.iterable())),
        };
        let changed = match (&self.last, &seen) {
            (Some(Seen::Value(a)), Seen::Value(b)) => !a.same(b),
            (Some(last), seen) => last != seen,
            (None, _) => true,
        };
        self.last = Some(seen);
        changed.then(|| current.into_value())
    }
}

// ============================================================================
// Field Reads
// ============================================================================

#[test]
fn test_field_read() {
    let context = from_json(json!({"field": "Worked!"}));
    let mut watcher = Watcher::new(watch("field"));

    assert_eq!(watcher.check(&context), Some(Value::from("Worked!")));
    assert_eq!(watcher.check(&context), None);

    context.set("field", Value::from("Again!")).unwrap();
    assert_eq!(watcher.check(&context), Some(Value::from("Again!")));
}

#[test]
fn test_field_read_shape() {
    let tree = watch("a.b.c");
    assert_eq!(tree.to_string(), "a.b.c");
    let WatchAst::FieldRead { base, name } = &tree else {
        panic!("expected a field read, got {:?}", tree);
    };
    assert_eq!(name, "c");
    assert!(matches!(base.as_ref(), WatchAst::FieldRead { name, .. } if name == "b"));
}

#[test]
fn test_missing_path_reads_null() {
    let context = Value::empty_object();
    assert_eq!(read("a.b.c", &context), Value::Null);
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_math() {
    let context = from_json(json!({"a": 1, "b": 2}));
    let tree = watch("a + b + 1");
    assert_eq!(tree.to_string(), "((a + b) + 1)");

    let mut watcher = Watcher::new(tree);
    assert_eq!(watcher.check(&context), Some(Value::Integer(4)));
    assert_eq!(watcher.check(&context), None);

    context.set("a", Value::Integer(10)).unwrap();
    assert_eq!(watcher.check(&context), Some(Value::Integer(13)));
}

#[test]
fn test_null_operands() {
    let context = Value::empty_object();
    let cases = [
        "null < 0",
        "null * 3",
        "null + 6",
        "5 + null",
        "null - 4",
        "3 - null",
        "null + null",
        "null - null",
        "null == null",
        "null != null",
    ];
    let results: Vec<Value> = cases.iter().map(|text| read(text, &context)).collect();
    assert_eq!(
        results,
        vec![
            Value::Null,
            Value::Null,
            Value::Integer(6),
            Value::Integer(5),
            Value::Integer(-4),
            Value::Integer(3),
            Value::Integer(0),
            Value::Integer(0),
            Value::Boolean(true),
            Value::Boolean(false),
        ]
    );
}

#[test]
fn test_logical_and_prefix() {
    let context = from_json(json!({"a": true, "b": 0}));
    assert_eq!(read("a && b", &context), Value::Boolean(false));
    assert_eq!(read("a || b", &context), Value::Boolean(true));
    assert_eq!(read("!b", &context), Value::Boolean(true));
    assert_eq!(read("-b", &context), Value::Integer(0));
    assert_eq!(watch("!b").to_string(), "!b");
}

#[test]
fn test_conditional() {
    let context = from_json(json!({"flag": true, "yes": "Y", "no": "N"}));
    let tree = watch("flag ? yes : no");
    assert_eq!(tree.to_string(), "(flag ? yes : no)");

    let mut watcher = Watcher::new(tree);
    assert_eq!(watcher.check(&context), Some(Value::from("Y")));

    context.set("flag", Value::Boolean(false)).unwrap();
    assert_eq!(watcher.check(&context), Some(Value::from("N")));
}

#[test]
fn test_keyed_access() {
    let context = from_json(json!({"items": ["a", "b"], "key": "name", "user": {"name": "Ada"}}));
    assert_eq!(read("items[1]", &context), Value::from("b"));
    assert_eq!(read("user[key]", &context), Value::from("Ada"));
    assert_eq!(read("missing[0]", &context), Value::Null);
    assert_eq!(watch("items[1]").to_string(), "items[1]");
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_constants() {
    let tree = watch("'hello'");
    assert!(matches!(&tree, WatchAst::Constant { id: None, .. }));
    assert_eq!(tree.to_string(), "\"hello\"");
    assert_eq!(watch("42").to_string(), "42");
    assert_eq!(read("null", &Value::Null), Value::Null);
}

#[test]
fn test_literal_collections_are_rebuilt() {
    let context = from_json(json!({"a": 1}));
    for text in ["[1, a]", "{x: a, 'y z': 2}"] {
        let tree = watch(text);
        let first = tree.evaluate(&context).unwrap().into_value();
        let second = tree.evaluate(&context).unwrap().into_value();
        assert_eq!(first, second, "{text}");
        assert!(!first.same(&second), "{text}");
    }
    assert_eq!(
        to_json(&read("{x: a, 'y z': 2}", &context)),
        json!({"x": 1, "y z": 2})
    );
}

// ============================================================================
// Methods
// ============================================================================

#[test]
fn test_scope_and_member_methods() {
    let context = from_json(json!({"name": "ada", "items": [1, 2, 3]}));
    context
        .set(
            "greet",
            Value::function(|args| Ok(Value::String(format!("Hi {}", args[0].as_string())))),
        )
        .unwrap();

    let tree = watch("greet(name)");
    assert!(matches!(&tree, WatchAst::Method { name, .. } if name == "greet"));
    assert_eq!(tree.to_string(), "greet(name)");
    assert_eq!(tree.evaluate(&context).unwrap().into_value(), Value::from("Hi ada"));

    assert_eq!(read("name.toUpperCase()", &context), Value::from("ADA"));
    assert_eq!(read("items.indexOf(2)", &context), Value::Integer(1));
    assert_eq!(watch("items.indexOf(2)").to_string(), "items.indexOf(2)");
}

#[test]
fn test_method_on_null_is_null() {
    assert_eq!(read("missing.run(1)", &Value::empty_object()), Value::Null);
}

#[test]
fn test_undefined_method() {
    let err = watch("nope()").evaluate(&Value::empty_object()).unwrap_err();
    assert_eq!(err, EvalError::UndefinedFunction("nope".to_string()));
}

// ============================================================================
// Unsupported Constructs
// ============================================================================

#[test]
fn test_unsupported_expressions() {
    let cases = [
        ("a = 1", "Can not watch expression containing 'Assign'."),
        ("a; b", "Can not watch expression containing 'Chain'."),
        ("fn()()", "Can not watch expression containing 'CallFunction'."),
    ];
    for (text, message) in cases {
        let err = bridge().parse(text, &(), false, None).unwrap_err();
        assert_eq!(err.to_string(), message, "input: {}", text);
    }
    assert_eq!(
        bridge().parse("x = 1", &(), false, None).unwrap_err(),
        WatchError::Unsupported("Assign")
    );
}

#[test]
fn test_parse_errors_pass_through() {
    let err = bridge().parse("a +", &(), false, None).unwrap_err();
    assert!(matches!(err, WatchError::Parse(ParseError::Syntax { .. })));
    assert_eq!(
        err.to_string(),
        "Parser Error: Unexpected end of expression at the end of expression [a +]"
    );
}

// ============================================================================
// Collections and Contexts
// ============================================================================

#[test]
fn test_as_collection() {
    let context = from_json(json!({"items": [1, 2]}));
    let tree = bridge().parse("items", &(), true, None).unwrap();
    assert!(tree.is_collection());
    assert_eq!(tree.to_string(), "#collection(items)");

    let Observed::Changes(record) = tree.evaluate(&context).unwrap() else {
        panic!("expected a change record");
    };
    assert!(record.iterable().same(&context.get("items").unwrap()));

    let mut watcher = Watcher::new(tree);
    assert!(watcher.check(&context).is_some());
    assert_eq!(watcher.check(&context), None);

    context.get("items").unwrap().set_keyed(&Value::Integer(2), Value::Integer(3)).unwrap();
    assert_eq!(
        watcher.check(&context).map(|v| to_json(&v)),
        Some(json!([1, 2, 3]))
    );
}

#[test]
fn test_bound_context() {
    let bridge = bridge();
    let bound = from_json(json!({"a": "bound"}));
    let ambient = from_json(json!({"a": "ambient"}));

    let first = bridge.parse("a", &(), false, Some(&bound)).unwrap();
    let second = bridge.parse("a.length", &(), false, Some(&bound)).unwrap();
    assert_eq!(first.to_string(), "#0.a");
    assert_eq!(second.to_string(), "#1.a.length");

    assert_eq!(first.evaluate(&ambient).unwrap().into_value(), Value::from("bound"));
    assert_eq!(second.evaluate(&ambient).unwrap().into_value(), Value::Integer(5));
    assert_eq!(
        bridge.parse("a", &(), false, None).unwrap().evaluate(&ambient).unwrap().into_value(),
        Value::from("ambient")
    );
}

#[test]
fn test_parser_is_shared() {
    let parser = Rc::new(Parser::new());
    let bridge = WatchParser::new(Rc::clone(&parser));
    bridge.parse("a + b", &(), false, None).unwrap();
    bridge.parse("a + b", &(), true, None).unwrap();

    assert_eq!(parser.cached(), 1);
    assert!(Rc::ptr_eq(&parser.parse("a + b").unwrap(), &bridge.parser().parse("a + b").unwrap()));
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn test_filter_tree() {
    let filters = FilterMap::builtin();
    let tree = bridge().parse("name | uppercase", &filters, false, None).unwrap();
    assert_eq!(tree.to_string(), "name | uppercase");

    let WatchAst::PureFunction { args, .. } = &tree else {
        panic!("expected a pure function, got {:?}", tree);
    };
    assert_eq!(args.len(), 1);
    assert!(args[0].is_collection());

    let context = from_json(json!({"name": "ada"}));
    assert_eq!(tree.evaluate(&context).unwrap().into_value(), Value::from("ADA"));
}

#[test]
fn test_filter_arguments() {
    let filters = FilterMap::builtin();
    let context = from_json(json!({"items": [1, 2, 3, 4], "n": 2}));
    let tree = bridge().parse("items | limitTo:n", &filters, false, None).unwrap();
    assert_eq!(to_json(&tree.evaluate(&context).unwrap().into_value()), json!([1, 2]));

    context.set("n", Value::Integer(-1)).unwrap();
    assert_eq!(to_json(&tree.evaluate(&context).unwrap().into_value()), json!([4]));
}

#[test]
fn test_unknown_filter() {
    let err = bridge().parse("a | nonexistent", &(), false, None).unwrap_err();
    assert_eq!(err, WatchError::UnknownFilter("nonexistent".to_string()));
    assert_eq!(err.to_string(), "No NgFilter: nonexistent found!");
}

#[test]
fn test_filter_receives_iterables() {
    let seen: Rc<RefCell<Vec<Vec<Value>>>> = Rc::default();
    let log = Rc::clone(&seen);
    let filters = FilterMap::new().with("count", move |args| {
        log.borrow_mut().push(args.to_vec());
        Ok(Value::Integer(args.len() as i64))
    });

    let context = from_json(json!({"items": [1, 2], "limit": 5}));
    let tree = bridge().parse("items | count:limit", &filters, false, None).unwrap();
    assert_eq!(tree.evaluate(&context).unwrap().into_value(), Value::Integer(2));
    tree.evaluate(&context).unwrap();

    let items = context.get("items").unwrap();
    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    for call in seen.iter() {
        assert!(call[0].same(&items));
        assert_eq!(call[1], Value::Integer(5));
    }
}

#[test]
fn test_filter_sees_replaced_argument() {
    let seen: Rc<RefCell<Vec<Value>>> = Rc::default();
    let log = Rc::clone(&seen);
    let filters = FilterMap::new().with("first", move |args| {
        log.borrow_mut().push(args[0].clone());
        Ok(args[0].get_keyed(&Value::Integer(0))?)
    });

    let context = from_json(json!({"items": ["a"]}));
    let tree = bridge().parse("items | first", &filters, false, None).unwrap();
    assert_eq!(tree.evaluate(&context).unwrap().into_value(), Value::from("a"));

    context.set("items", Value::array(vec![Value::from("b")])).unwrap();
    assert_eq!(tree.evaluate(&context).unwrap().into_value(), Value::from("b"));

    let seen = seen.borrow();
    assert!(!seen[0].same(&seen[1]));
    assert!(seen[1].same(&context.get("items").unwrap()));
}

#[test]
fn test_filter_inside_expression() {
    let filters = FilterMap::builtin();
    let context = from_json(json!({"first": "ada", "last": "lovelace"}));
    let tree = bridge()
        .parse("(first | uppercase) + ' ' + last", &filters, false, None);
    // Parentheses hold a single expression, so filters only appear at the top
    assert!(matches!(tree, Err(WatchError::Parse(_))));

    let tree = bridge().parse("first + ' ' + last | uppercase", &filters, false, None).unwrap();
    assert_eq!(tree.evaluate(&context).unwrap().into_value(), Value::from("ADA LOVELACE"));
}
