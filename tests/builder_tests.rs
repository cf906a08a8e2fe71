use keypath_lang::{Builder, ListBody, Literal, Node, ParseError, RangeBounds};

fn parse_one(source: &str) -> Node {
    let mut program = Builder::parse(source).unwrap();
    assert_eq!(program.body.len(), 1, "expected one statement in {:?}", source);
    program.body.remove(0).expression
}

fn ident(name: &str) -> Node {
    Node::Identifier(name.to_string())
}

fn number(n: f64) -> Node {
    Node::Literal(Literal::Number(n))
}

#[test]
fn test_dot_chain_is_left_associated() {
    assert_eq!(
        parse_one("a.b.c"),
        Node::member(
            Node::member(ident("a"), ident("b"), false),
            ident("c"),
            false
        )
    );
}

#[test]
fn test_computed_access() {
    assert_eq!(
        parse_one("foo[100]"),
        Node::member(ident("foo"), number(100.0), true)
    );
}

#[test]
fn test_adjacency_extends_the_chain() {
    // No dot needed after a bracketed access or call
    assert_eq!(
        parse_one("foo[0]bar"),
        Node::member(
            Node::member(ident("foo"), number(0.0), true),
            ident("bar"),
            false
        )
    );
}

#[test]
fn test_standalone_list_is_an_array() {
    assert_eq!(
        parse_one("[a,b]"),
        Node::Array(ListBody::Elements(vec![ident("a"), ident("b")]))
    );
}

#[test]
fn test_embedded_plural_list_is_a_sequence() {
    assert_eq!(
        parse_one("foo[0,2]"),
        Node::member(
            ident("foo"),
            Node::Sequence(ListBody::Elements(vec![number(0.0), number(2.0)])),
            true
        )
    );
}

#[test]
fn test_embedded_single_element_sheds_its_brackets() {
    assert_eq!(
        parse_one("foo[bar]"),
        Node::member(ident("foo"), ident("bar"), true)
    );
}

#[test]
fn test_range_property() {
    assert_eq!(
        parse_one("foo[1..3]"),
        Node::member(
            ident("foo"),
            Node::Sequence(ListBody::Range(RangeBounds {
                left: Some(1.0),
                right: Some(3.0),
            })),
            true
        )
    );
}

#[test]
fn test_half_open_ranges() {
    assert_eq!(
        parse_one("[5..]"),
        Node::Array(ListBody::Range(RangeBounds {
            left: Some(5.0),
            right: None,
        }))
    );
    assert_eq!(
        parse_one("[..7]"),
        Node::Array(ListBody::Range(RangeBounds {
            left: None,
            right: Some(7.0),
        }))
    );
}

#[test]
fn test_unbounded_range_is_rejected() {
    assert_eq!(Builder::parse("[..]"), Err(ParseError::EmptyRange));
}

#[test]
fn test_call_with_literal_arguments() {
    assert_eq!(
        parse_one("foo(123,\"abc\")"),
        Node::Call {
            callee: Box::new(ident("foo")),
            args: vec![
                number(123.0),
                Node::Literal(Literal::String("abc".to_string())),
            ],
        }
    );
}

#[test]
fn test_call_on_a_chain() {
    assert_eq!(
        parse_one("foo.bar(1)"),
        Node::Call {
            callee: Box::new(Node::member(ident("foo"), ident("bar"), false)),
            args: vec![number(1.0)],
        }
    );
}

#[test]
fn test_call_argument_kinds_are_restricted() {
    assert!(matches!(
        Builder::parse("foo(bar)"),
        Err(ParseError::InvalidCallArgument { .. })
    ));
    // Lookups are fine
    assert!(Builder::parse("foo(%0)").is_ok());
}

#[test]
fn test_existential_guards_the_left_side() {
    assert_eq!(
        parse_one("foo?.bar"),
        Node::member(
            Node::Existential {
                expression: Box::new(ident("foo")),
            },
            ident("bar"),
            false
        )
    );
}

#[test]
fn test_lookup_and_root_operators() {
    assert_eq!(
        parse_one("%0"),
        Node::Lookup {
            key: Box::new(number(0.0)),
        }
    );
    assert_eq!(
        parse_one("~a.b"),
        Node::member(
            Node::Root {
                key: Box::new(ident("a")),
            },
            ident("b"),
            false
        )
    );
}

#[test]
fn test_block_property() {
    let node = parse_one("data{ptr}");
    match node {
        Node::Member {
            object,
            property,
            computed,
        } => {
            assert_eq!(*object, ident("data"));
            assert!(matches!(*property, Node::Block { .. }));
            assert!(computed);
        }
        other => panic!("expected member, got {:?}", other),
    }
}

#[test]
fn test_block_rendering_keeps_tokens_apart() {
    // `{a b}` is adjacency (a member chain); its rendering must not fuse
    // the identifiers into `{ab}`
    let program = Builder::parse("data{a b}").unwrap();
    let reparsed = Builder::parse(&program.to_string()).unwrap();
    assert_eq!(program, reparsed);
}

#[test]
fn test_nested_list_inside_an_array() {
    // An inner list is embedded by definition, so it becomes a sequence
    // element of the outer array
    assert_eq!(
        parse_one("[[a,b],c]"),
        Node::Array(ListBody::Elements(vec![
            Node::Sequence(ListBody::Elements(vec![ident("a"), ident("b")])),
            ident("c"),
        ]))
    );
}

#[test]
fn test_doubled_brackets_degenerate_to_a_single_sequence() {
    // The outer brackets hold one element and are transparent
    assert_eq!(parse_one("foo[[a,b]]"), parse_one("foo[a,b]"));
}

#[test]
fn test_multiple_statements() {
    let program = Builder::parse("a;b").unwrap();
    assert_eq!(program.body.len(), 2);
    assert_eq!(program.body[0].expression, ident("a"));
    assert_eq!(program.body[1].expression, ident("b"));
}

#[test]
fn test_canonical_text_round_trips() {
    let patterns = [
        "foo.bar[100]",
        "foo.bar[100]qux(123,\"abc\")baz",
        "[a,b].x",
        "foo[0,2]",
        "a?.b",
        "~a.b",
        "%0",
        "data{ptr}",
        "[1..3].v",
        "a;b",
    ];
    for pattern in patterns {
        let program = Builder::parse(pattern).unwrap();
        let reparsed = Builder::parse(&program.to_string()).unwrap();
        assert_eq!(program, reparsed, "round trip changed {:?}", pattern);
    }
}

#[test]
fn test_unmatched_brackets() {
    assert!(matches!(
        Builder::parse("a]"),
        Err(ParseError::UnmatchedBracket { .. })
    ));
    assert!(matches!(
        Builder::parse("bar}"),
        Err(ParseError::UnmatchedBracket { .. })
    ));
}

#[test]
fn test_trailing_tokens() {
    assert!(matches!(
        Builder::parse("foo{bar"),
        Err(ParseError::TrailingTokens { .. })
    ));
}

#[test]
fn test_unexpected_character() {
    assert!(matches!(
        Builder::parse("a@b"),
        Err(ParseError::UnexpectedCharacter { ch: '@', .. })
    ));
}
