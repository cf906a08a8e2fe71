use keypath_lang::{get, has, set, Keypath, Value};

fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

#[test]
fn test_get_nested_value() {
    let scope = v(serde_json::json!({"foo": {"bar": "x"}}));
    assert_eq!(get(&scope, "foo.bar").unwrap(), Some(Value::string("x")));
}

#[test]
fn test_set_vivifies_the_whole_path() {
    let scope = Value::object();
    set(&scope, &Value::string("V"), "foo.bar").unwrap();
    assert_eq!(scope, v(serde_json::json!({"foo": {"bar": "V"}})));
}

#[test]
fn test_existential_get_on_null() {
    let scope = v(serde_json::json!({"foo": null}));
    assert_eq!(get(&scope, "foo?.bar").unwrap(), None);
}

#[test]
fn test_fanned_out_read() {
    let scope = v(serde_json::json!([{"v": 1}, {"v": 2}, {"v": 3}]));
    assert_eq!(
        get(&scope, "[0,2].v").unwrap(),
        Some(v(serde_json::json!([1, 3])))
    );
}

#[test]
fn test_call_with_lookup_argument() {
    let scope = Value::object();
    if let Value::Object(map) = &scope {
        map.borrow_mut().insert(
            "foo".to_string(),
            Value::callable("foo", |_receiver, args| {
                let arg = args.first().and_then(Value::as_str).unwrap_or_default();
                Ok(Value::string(format!("{}!", arg)))
            }),
        );
    }
    let lookup = v(serde_json::json!(["X"]));

    let keypath = Keypath::new("foo(%0)").unwrap();
    assert_eq!(
        keypath.get_with(&scope, &lookup).unwrap(),
        Some(Value::string("X!"))
    );
}

#[test]
fn test_compiled_keypath_is_reusable() {
    let keypath = Keypath::new("user.age").unwrap();
    assert_eq!(keypath.pattern(), "user.age");

    let a = v(serde_json::json!({"user": {"age": 30}}));
    let b = v(serde_json::json!({"user": {"age": 41}}));
    assert_eq!(keypath.get(&a).unwrap(), Some(Value::Number(30.0)));
    assert_eq!(keypath.get(&b).unwrap(), Some(Value::Number(41.0)));
}

#[test]
fn test_has() {
    let scope = v(serde_json::json!({"a": {"b": 1}, "n": null}));
    assert!(has(&scope, "a.b"));
    assert!(!has(&scope, "a.c"));
    // Evaluation failures count as absent
    assert!(!has(&scope, "n.x"));
    // So do patterns that do not parse
    assert!(!has(&scope, "a..b"));
}

#[test]
fn test_set_returns_the_value_now_present() {
    let scope = v(serde_json::json!({"a": 1}));
    let result = set(&scope, &Value::Number(9.0), "a").unwrap();
    assert_eq!(result, Some(Value::Number(1.0)));

    let result = set(&scope, &Value::Number(9.0), "b").unwrap();
    assert_eq!(result, Some(Value::Number(9.0)));
}

#[test]
fn test_set_into_an_existing_array() {
    let scope = v(serde_json::json!({"list": [{"done": false}]}));
    set(&scope, &v(serde_json::json!({"done": true})), "list[1]").unwrap();
    assert_eq!(
        scope,
        v(serde_json::json!({"list": [{"done": false}, {"done": true}]}))
    );
}

#[test]
fn test_bad_pattern_reports_a_parse_error() {
    assert!(Keypath::new("foo..bar").is_err());
    assert!(Keypath::new("").is_ok());
}
