use keypath_lang::{EvalError, Interpreter, Value};

fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

fn read(scope: &Value, pattern: &str) -> Result<Option<Value>, EvalError> {
    Interpreter::compile(pattern, false)
        .unwrap()
        .run(scope, None, None)
}

fn write(scope: &Value, pattern: &str, value: Value) -> Result<Option<Value>, EvalError> {
    Interpreter::compile(pattern, true)
        .unwrap()
        .run(scope, Some(&value), None)
}

#[test]
fn test_simple_traversal() {
    let scope = v(serde_json::json!({"foo": {"bar": "x"}}));
    assert_eq!(read(&scope, "foo.bar").unwrap(), Some(Value::string("x")));
}

#[test]
fn test_missing_entry_is_undefined_not_an_error() {
    let scope = v(serde_json::json!({"foo": {}}));
    assert_eq!(read(&scope, "foo.bar").unwrap(), None);
    // A scalar container also yields nothing
    let scope = v(serde_json::json!({"a": 1}));
    assert_eq!(read(&scope, "a.b").unwrap(), None);
}

#[test]
fn test_traversing_undefined_is_an_error() {
    let scope = v(serde_json::json!({"a": 1}));
    assert!(matches!(
        read(&scope, "a.b.c"),
        Err(EvalError::AccessError(_))
    ));
}

#[test]
fn test_traversing_null_is_an_error() {
    let scope = v(serde_json::json!({"a": null}));
    assert!(matches!(
        read(&scope, "a.b"),
        Err(EvalError::AccessError(_))
    ));
}

#[test]
fn test_existential_guard_short_circuits() {
    let scope = v(serde_json::json!({"a": null}));
    assert_eq!(read(&scope, "a?.b").unwrap(), None);
    // The guard also swallows failures beneath it
    let scope = v(serde_json::json!({"a": 1}));
    assert_eq!(read(&scope, "a.b?.c").unwrap(), None);
}

#[test]
fn test_existential_passes_present_values_through() {
    let scope = v(serde_json::json!({"a": {"b": 7}}));
    assert_eq!(read(&scope, "a?.b").unwrap(), Some(Value::Number(7.0)));
}

#[test]
fn test_array_indexing_and_string_indexing() {
    let scope = v(serde_json::json!({"list": [10, 20], "s": "hello"}));
    assert_eq!(read(&scope, "list[1]").unwrap(), Some(Value::Number(20.0)));
    assert_eq!(read(&scope, "s[1]").unwrap(), Some(Value::string("e")));
}

#[test]
fn test_quoted_keys() {
    let scope = v(serde_json::json!({"a": {"b c": 1}}));
    assert_eq!(read(&scope, "a[\"b c\"]").unwrap(), Some(Value::Number(1.0)));
}

#[test]
fn test_sequence_fans_out_over_keys() {
    let scope = v(serde_json::json!({"p": {"a": 1, "b": 2}}));
    assert_eq!(
        read(&scope, "p[a,b]").unwrap(),
        Some(v(serde_json::json!([1, 2])))
    );
}

#[test]
fn test_array_fans_out_over_containers() {
    let scope = v(serde_json::json!({"x": {"v": 1}, "y": {"v": 2}}));
    assert_eq!(
        read(&scope, "[x,y].v").unwrap(),
        Some(v(serde_json::json!([1, 2])))
    );
}

#[test]
fn test_cross_product_when_both_sides_split() {
    let scope = v(serde_json::json!({
        "x": {"a": 1, "b": 2},
        "y": {"a": 3, "b": 4},
    }));
    assert_eq!(
        read(&scope, "[x,y][a,b]").unwrap(),
        Some(v(serde_json::json!([[1, 2], [3, 4]])))
    );
}

#[test]
fn test_range_property_slices() {
    let scope = v(serde_json::json!({"items": [1, 2, 3, 4, 5]}));
    assert_eq!(
        read(&scope, "items[1..3]").unwrap(),
        Some(v(serde_json::json!([2, 3, 4])))
    );
}

#[test]
fn test_descending_range() {
    let scope = v(serde_json::json!([10, 20, 30, 40]));
    assert_eq!(
        read(&scope, "[3..1]").unwrap(),
        Some(v(serde_json::json!([40, 30, 20])))
    );
}

#[test]
fn test_root_jump_in_key_position() {
    let scope = v(serde_json::json!({
        "user": {"name": "ada"},
        "conf": {"key": "name"},
    }));
    assert_eq!(
        read(&scope, "user[~conf.key]").unwrap(),
        Some(Value::string("ada"))
    );
}

#[test]
fn test_block_computes_a_dynamic_key() {
    let scope = v(serde_json::json!({"ptr": "x", "data": {"x": 99}}));
    assert_eq!(
        read(&scope, "data{ptr}").unwrap(),
        Some(Value::Number(99.0))
    );
}

#[test]
fn test_blocks_differing_only_in_spacing_stay_distinct() {
    // `{a b}` computes its key from a member chain, `{ab}` from one
    // identifier; the block cache must not conflate them
    let scope = v(serde_json::json!({
        "a": {"b": "k1"},
        "ab": "k2",
        "x": {"k1": 1},
        "y": {"k2": 2},
    }));
    assert_eq!(read(&scope, "x{a b}").unwrap(), Some(Value::Number(1.0)));
    assert_eq!(
        read(&scope, "x{a b};y{ab}").unwrap(),
        Some(Value::Number(2.0))
    );
}

#[test]
fn test_nested_list_mixes_keys_and_scope_values() {
    // Sequence elements denote key names; plain array elements read the
    // scope
    let scope = v(serde_json::json!({"a": 9, "c": 3}));
    assert_eq!(
        read(&scope, "[[a,b],c]").unwrap(),
        Some(v(serde_json::json!([["a", "b"], 3])))
    );
}

#[test]
fn test_lookup_without_a_table_is_undefined() {
    let scope = v(serde_json::json!({"a": 1}));
    assert_eq!(read(&scope, "%0").unwrap(), None);
}

#[test]
fn test_lookup_resolves_against_the_table() {
    let scope = v(serde_json::json!({"x": {"a": 1}}));
    let lookup = v(serde_json::json!({"k": "a"}));
    let evaluator = Interpreter::compile("%k", false).unwrap();
    assert_eq!(
        evaluator.run(&scope, None, Some(&lookup)).unwrap(),
        Some(Value::string("a"))
    );
    // In key position the looked-up value addresses the scope
    let evaluator = Interpreter::compile("x[%k]", false).unwrap();
    assert_eq!(
        evaluator.run(&scope, None, Some(&lookup)).unwrap(),
        Some(Value::Number(1.0))
    );
}

#[test]
fn test_last_statement_wins() {
    let scope = v(serde_json::json!({"a": 1, "b": 2}));
    assert_eq!(read(&scope, "a;b").unwrap(), Some(Value::Number(2.0)));
}

#[test]
fn test_write_vivifies_intermediate_objects() {
    let scope = Value::object();
    let result = write(&scope, "a.b.c", Value::Number(7.0)).unwrap();
    assert_eq!(result, Some(Value::Number(7.0)));
    assert_eq!(scope, v(serde_json::json!({"a": {"b": {"c": 7}}})));
}

#[test]
fn test_write_leaves_existing_terminal_values_alone() {
    let scope = v(serde_json::json!({"a": 1}));
    let result = write(&scope, "a", Value::Number(9.0)).unwrap();
    assert_eq!(result, Some(Value::Number(1.0)));
    assert_eq!(scope, v(serde_json::json!({"a": 1})));
}

#[test]
fn test_write_extends_arrays_with_null_padding() {
    let scope = v(serde_json::json!({"list": []}));
    write(&scope, "list[2]", Value::Number(5.0)).unwrap();
    assert_eq!(scope, v(serde_json::json!({"list": [null, null, 5]})));
}

#[test]
fn test_write_broadcasts_over_a_split() {
    let scope = v(serde_json::json!([{}, {}]));
    write(&scope, "[0,1].x", Value::Number(3.0)).unwrap();
    assert_eq!(scope, v(serde_json::json!([{"x": 3}, {"x": 3}])));
}

#[test]
fn test_write_cannot_create_through_a_scalar() {
    let scope = v(serde_json::json!({"a": 1}));
    assert!(matches!(
        write(&scope, "a.b", Value::Number(2.0)),
        Err(EvalError::TypeError(_))
    ));
}

#[test]
fn test_calling_a_non_function() {
    let scope = v(serde_json::json!({"a": 1}));
    assert!(matches!(
        read(&scope, "a(1)"),
        Err(EvalError::NotAFunction(_))
    ));
    assert!(matches!(
        write(&scope, "a(1)", Value::Null),
        Err(EvalError::CannotCreateCall)
    ));
}

#[test]
fn test_call_receives_its_container() {
    let scope = Value::object();
    if let Value::Object(map) = &scope {
        map.borrow_mut()
            .insert("tag".to_string(), Value::string("inner"));
        map.borrow_mut().insert(
            "describe".to_string(),
            Value::callable("describe", |receiver, _args| {
                let tag = match receiver {
                    Value::Object(map) => map
                        .borrow()
                        .get("tag")
                        .and_then(|t| t.as_str().map(str::to_string)),
                    _ => None,
                };
                Ok(Value::string(tag.unwrap_or_default()))
            }),
        );
    }
    assert_eq!(
        read(&scope, "describe()").unwrap(),
        Some(Value::string("inner"))
    );
}
