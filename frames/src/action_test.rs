use super::*;

#[test]
fn tool_parse_is_case_insensitive() {
    assert_eq!(Tool::parse("Rectangle"), Tool::Rectangle);
    assert_eq!(Tool::parse("ERASER"), Tool::Eraser);
    assert_eq!(Tool::parse(" arrow "), Tool::Arrow);
}

#[test]
fn unknown_tool_falls_back_to_pen() {
    assert_eq!(Tool::parse("spraycan"), Tool::Pen);
    assert_eq!(Tool::parse(""), Tool::Pen);
}

#[test]
fn unknown_kind_falls_back_to_stroke() {
    assert_eq!(ActionKind::parse("stroke"), ActionKind::Stroke);
    assert_eq!(ActionKind::parse("sticker"), ActionKind::Stroke);
    assert_eq!(ActionKind::parse("Shape"), ActionKind::Shape);
}

#[test]
fn only_laser_kind_is_transient() {
    assert!(ActionKind::Stroke.is_durable());
    assert!(ActionKind::Shape.is_durable());
    assert!(ActionKind::Text.is_durable());
    assert!(!ActionKind::Laser.is_durable());
}

#[test]
fn tool_families_do_not_overlap() {
    for tool in [Tool::Line, Tool::Arrow, Tool::Rectangle, Tool::Circle, Tool::Ellipse, Tool::Triangle] {
        assert!(tool.is_shape());
        assert!(!tool.is_freehand());
    }
    assert!(Tool::Pen.is_freehand());
    assert!(Tool::Eraser.is_freehand());
    assert!(!Tool::Laser.is_shape());
    assert!(!Tool::Text.is_freehand());
}

#[test]
fn empty_object_decodes_to_defaults() {
    let action: DrawAction = serde_json::from_value(serde_json::json!({})).expect("decode");
    assert_eq!(action, DrawAction::default());
    assert_eq!(action.color, DEFAULT_COLOR);
    assert_eq!(action.line_width, DEFAULT_LINE_WIDTH);
}

#[test]
fn decodes_float_integers_from_protobuf_numbers() {
    let action: DrawAction = serde_json::from_value(serde_json::json!({
        "kind": "shape",
        "tool": "circle",
        "line_width": 5.0,
        "font_size": 24.0,
        "timestamp": 1_700_000_000_000.0_f64
    }))
    .expect("decode");

    assert_eq!(action.kind, ActionKind::Shape);
    assert_eq!(action.tool, Tool::Circle);
    assert_eq!(action.line_width, 5);
    assert_eq!(action.font_size, 24);
    assert_eq!(action.timestamp, 1_700_000_000_000);
}

#[test]
fn serializes_wire_names() {
    let value = serde_json::to_value(DrawAction::segment(Tool::Eraser, (1.0, 2.0), (3.0, 4.0))).expect("encode");
    assert_eq!(value["kind"], "draw");
    assert_eq!(value["tool"], "eraser");
    assert_eq!(value["prev_x"], 1.0);
    assert_eq!(value["y"], 4.0);
    assert!(value.get("text").is_none());
}

#[test]
fn normalize_clamps_width_and_fills_color() {
    let mut action = DrawAction::default().with_line_width(99).with_color("  ");
    action.font_size = 0;
    action.normalize();
    assert_eq!(action.line_width, MAX_LINE_WIDTH);
    assert_eq!(action.font_size, 1);
    assert_eq!(action.color, DEFAULT_COLOR);

    let mut thin = DrawAction::default().with_line_width(0);
    thin.normalize();
    assert_eq!(thin.line_width, MIN_LINE_WIDTH);
}

#[test]
fn out_of_range_integers_saturate_then_normalize() {
    let decode = |value: serde_json::Value| {
        let mut action: DrawAction = serde_json::from_value(value).expect("decode");
        action.normalize();
        action
    };

    assert_eq!(decode(serde_json::json!({"line_width": -5})).line_width, MIN_LINE_WIDTH);
    assert_eq!(decode(serde_json::json!({"line_width": 5_000_000_000_u64})).line_width, MAX_LINE_WIDTH);
    assert_eq!(decode(serde_json::json!({"font_size": -1})).font_size, 1);
    assert_eq!(decode(serde_json::json!({"line_width": null})).line_width, MIN_LINE_WIDTH);
}

#[test]
fn null_tool_and_kind_fall_back() {
    let action: DrawAction =
        serde_json::from_value(serde_json::json!({"tool": null, "kind": null, "x": 4.0})).expect("decode");
    assert_eq!(action.tool, Tool::Pen);
    assert_eq!(action.kind, ActionKind::Stroke);
}

#[test]
fn stamp_overwrites_client_identity() {
    let mut action = DrawAction::shape(Tool::Line, (0.0, 0.0), (10.0, 10.0));
    action.author_name = Some("impostor".to_owned());
    action.timestamp = 5;

    let id = Uuid::new_v4();
    action.stamp(id, "Alice", "#E74C3C", 1234);

    assert_eq!(action.author_id, Some(id));
    assert_eq!(action.author_name.as_deref(), Some("Alice"));
    assert_eq!(action.author_color.as_deref(), Some("#E74C3C"));
    assert_eq!(action.timestamp, 1234);
}
