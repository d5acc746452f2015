/// Parser tests: precedence, assignment targets, arrows, literals and errors
use crate::ast::*;
use crate::{parse, ParseError};

fn body(source: &str) -> Expression {
    parse(source).expect("Failed to parse").body
}

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    match body("a + b * c") {
        Expression::Binary {
            operator: BinaryOp::Add,
            right,
            ..
        } => {
            assert!(matches!(
                *right,
                Expression::Binary {
                    operator: BinaryOp::Multiply,
                    ..
                }
            ));
        }
        other => panic!("Expected addition, got {:?}", other),
    }
}

#[test]
fn test_logical_precedence() {
    // `a || b && c` parses as `a || (b && c)`
    match body("a || b && c") {
        Expression::Logical {
            operator: LogicalOp::Or,
            right,
            ..
        } => {
            assert!(matches!(
                *right,
                Expression::Logical {
                    operator: LogicalOp::And,
                    ..
                }
            ));
        }
        other => panic!("Expected ||, got {:?}", other),
    }
}

#[test]
fn test_ternary_nests_to_the_right() {
    match body("a ? b : c ? d : e") {
        Expression::Conditional { alternate, .. } => {
            assert!(matches!(*alternate, Expression::Conditional { .. }));
        }
        other => panic!("Expected conditional, got {:?}", other),
    }
}

#[test]
fn test_member_chain_and_call() {
    match body("user.profile.name.toUpperCase()") {
        Expression::Call { callee, arguments, .. } => {
            assert!(arguments.is_empty());
            match *callee {
                Expression::Member { property, .. } => assert_eq!(property, "toUpperCase"),
                other => panic!("Expected member callee, got {:?}", other),
            }
        }
        other => panic!("Expected call, got {:?}", other),
    }
}

#[test]
fn test_optional_member() {
    match body("user?.name") {
        Expression::Member { optional, property, .. } => {
            assert!(optional);
            assert_eq!(property, "name");
        }
        other => panic!("Expected member, got {:?}", other),
    }
}

#[test]
fn test_keyword_property_names() {
    match body("map.delete") {
        Expression::Member { property, .. } => assert_eq!(property, "delete"),
        other => panic!("Expected member, got {:?}", other),
    }
}

#[test]
fn test_assignment_is_right_associative() {
    match body("a = b = 3") {
        Expression::Assign { value, .. } => {
            assert!(matches!(*value, Expression::Assign { .. }));
        }
        other => panic!("Expected assignment, got {:?}", other),
    }
}

#[test]
fn test_compound_assignment_to_member() {
    match body("state.count += 2") {
        Expression::Assign { target, operator, .. } => {
            assert_eq!(operator, AssignOp::Add);
            assert!(matches!(*target, Expression::Member { .. }));
        }
        other => panic!("Expected assignment, got {:?}", other),
    }
}

#[test]
fn test_invalid_assignment_target() {
    let err = parse("a + b = 3").unwrap_err();
    assert!(matches!(err, ParseError::InvalidSyntax { .. }));
}

#[test]
fn test_prefix_and_postfix_update() {
    assert!(matches!(
        body("++count"),
        Expression::Update { prefix: true, operator: UpdateOp::Increment, .. }
    ));
    assert!(matches!(
        body("items[0]--"),
        Expression::Update { prefix: false, operator: UpdateOp::Decrement, .. }
    ));
}

#[test]
fn test_arrow_functions() {
    match body("items.filter(item => item.done)") {
        Expression::Call { arguments, .. } => match &arguments[0] {
            Expression::Arrow { params, .. } => assert_eq!(params, &vec!["item".to_string()]),
            other => panic!("Expected arrow, got {:?}", other),
        },
        other => panic!("Expected call, got {:?}", other),
    }

    match body("(a, b) => a + b") {
        Expression::Arrow { params, .. } => assert_eq!(params.len(), 2),
        other => panic!("Expected arrow, got {:?}", other),
    }

    assert!(matches!(body("() => 1"), Expression::Arrow { .. }));
}

#[test]
fn test_parenthesised_expression_is_not_arrow() {
    assert!(matches!(
        body("(a + b) * 2"),
        Expression::Binary { operator: BinaryOp::Multiply, .. }
    ));
}

#[test]
fn test_object_and_array_literals() {
    match body("{ active: isActive, 'btn-large': big, count }") {
        Expression::Object { properties, .. } => {
            let keys: Vec<&str> = properties.iter().map(|(k, _)| k.as_str()).collect();
            assert_eq!(keys, vec!["active", "btn-large", "count"]);
        }
        other => panic!("Expected object, got {:?}", other),
    }

    match body("[1, 'two', [3],]") {
        Expression::Array { elements, .. } => assert_eq!(elements.len(), 3),
        other => panic!("Expected array, got {:?}", other),
    }
}

#[test]
fn test_string_escapes() {
    match body(r#"'it\'s' "#) {
        Expression::String { value, .. } => assert_eq!(value, "it's"),
        other => panic!("Expected string, got {:?}", other),
    }
}

#[test]
fn test_template_literal_parts() {
    match body("`Hello ${user.name}!`") {
        Expression::Template { parts, .. } => {
            assert_eq!(parts.len(), 3);
            assert_eq!(parts[0], TemplatePart::Literal("Hello ".to_string()));
            assert!(matches!(parts[1], TemplatePart::Expression(Expression::Member { .. })));
            assert_eq!(parts[2], TemplatePart::Literal("!".to_string()));
        }
        other => panic!("Expected template, got {:?}", other),
    }
}

#[test]
fn test_template_error_points_into_outer_source() {
    let err = parse("`a ${+}`").unwrap_err();
    assert!(err.pos() >= 5, "position {} should be inside the ${{}} part", err.pos());
}

#[test]
fn test_statement_sequence() {
    match body("count++; save(); ") {
        Expression::Sequence { expressions, .. } => assert_eq!(expressions.len(), 2),
        other => panic!("Expected sequence, got {:?}", other),
    }
}

#[test]
fn test_missing_separator_is_error() {
    let err = parse("a b").unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedToken { pos: 2, .. }));
}

#[test]
fn test_unexpected_end() {
    let err = parse("call(a,").unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedEof { .. }));
}

#[test]
fn test_empty_source_is_error() {
    assert!(parse("   ").is_err());
}

#[test]
fn test_delete_requires_property() {
    assert!(parse("delete obj.key").is_ok());
    assert!(parse("delete key").is_err());
}

#[test]
fn test_spans_cover_source() {
    let program = parse("a + b").unwrap();
    assert_eq!(program.body.span(), Span::new(0, 5));
}

#[test]
fn test_ast_serializes() {
    let program = parse("a ? 1 : 'x'").unwrap();
    let json = serde_json::to_string(&program).unwrap();
    assert!(json.contains("Conditional"));
}

#[test]
fn test_format_error_mentions_message() {
    let source = "a +";
    let err = parse(source).unwrap_err();
    let rendered = crate::format_error(source, &err);
    assert!(rendered.contains("expected"));
}

#[test]
fn test_nesting_limit() {
    let shallow = format!("{}a{}", "(".repeat(64), ")".repeat(64));
    assert!(parse(&shallow).is_ok());

    let deep = format!("{}a{}", "(".repeat(10_000), ")".repeat(10_000));
    let err = parse(&deep).unwrap_err();
    assert!(matches!(err, ParseError::InvalidSyntax { ref message, .. } if message.contains("too deeply")));

    assert!(parse(&format!("{}a", "!".repeat(10_000))).is_err());
    assert!(parse(&format!("{}1{}", "[".repeat(10_000), "]".repeat(10_000))).is_err());
}
