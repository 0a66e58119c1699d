#[cfg(test)]
mod tests {
    use std::{path::Path, time::Duration};

    use proptest::prelude::*;

    use crate::*;

    const HOLD_A: &str = r#"{
        "keyboard_a": {
            "trigger_type": "hold",
            "actions": [
                {"type": "keyboard", "key": "a", "action": "press"},
                {"type": "delay", "duration": 0.05},
                {"type": "keyboard", "key": "a", "action": "release"},
                {"type": "delay", "duration": 0.05}
            ]
        }
    }"#;

    #[test]
    fn hold_trigger_parses() {
        let table = load_from_str(HOLD_A, None).unwrap();
        let def = table.get("keyboard_a").expect("bound");
        assert_eq!(def.kind, TriggerKind::HoldRepeat);
        assert_eq!(def.actions.len(), 4);
        assert_eq!(
            def.actions[0],
            ActionKind::Key {
                key: "a".into(),
                op: ActionOp::Press
            }
        );
        assert_eq!(
            def.actions[1],
            ActionKind::Delay {
                base: Duration::from_millis(50),
                jitter: Duration::ZERO
            }
        );
    }

    #[test]
    fn delay_defaults_match_file_format() {
        let src = r#"{"mouse_x1": {"trigger_type": "toggle", "actions": [
            {"type": "delay"},
            {"type": "delay", "duration": 0.2, "random": 0.1},
            {"type": "mouse", "key": "left", "action": "click"}
        ]}}"#;
        let table = load_from_str(src, None).unwrap();
        let def = table.get("mouse_x1").unwrap();
        assert_eq!(def.kind, TriggerKind::ToggleRepeat);
        assert_eq!(
            def.actions[0],
            ActionKind::Delay {
                base: Duration::from_millis(100),
                jitter: Duration::ZERO
            }
        );
        assert_eq!(
            def.actions[1],
            ActionKind::Delay {
                base: Duration::from_millis(200),
                jitter: Duration::from_millis(100)
            }
        );
        assert_eq!(
            def.actions[2],
            ActionKind::Mouse {
                button: MouseButton::Left,
                op: ActionOp::Click
            }
        );
    }

    #[test]
    fn missing_actions_is_empty_list() {
        let table = load_from_str(r#"{"keyboard_q": {"trigger_type": "once"}}"#, None).unwrap();
        assert!(table.get("keyboard_q").unwrap().actions.is_empty());
    }

    #[test]
    fn unknown_trigger_type_fails() {
        let res = load_from_str(
            r#"{"keyboard_q": {"trigger_type": "press_once", "actions": []}}"#,
            None,
        );
        match res {
            Err(Error::Validation { trigger, .. }) => {
                assert_eq!(trigger.as_deref(), Some("keyboard_q"))
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn bad_namespace_fails() {
        let res = load_from_str(r#"{"gamepad_a": {"trigger_type": "once"}}"#, None);
        assert!(matches!(res, Err(Error::Validation { .. })));
    }

    #[test]
    fn unknown_mouse_button_fails() {
        let src = r#"{"keyboard_q": {"trigger_type": "once", "actions": [
            {"type": "mouse", "key": "wheel", "action": "click"}
        ]}}"#;
        let err = load_from_str(src, None).unwrap_err();
        assert!(err.to_string().contains("action #0"));
        assert!(err.to_string().contains("wheel"));
    }

    #[test]
    fn keyboard_action_requires_key_and_action() {
        let no_key = r#"{"keyboard_q": {"trigger_type": "once", "actions": [
            {"type": "keyboard", "action": "press"}
        ]}}"#;
        assert!(load_from_str(no_key, None).is_err());
        let no_action = r#"{"keyboard_q": {"trigger_type": "once", "actions": [
            {"type": "keyboard", "key": "e"}
        ]}}"#;
        assert!(load_from_str(no_action, None).is_err());
    }

    #[test]
    fn negative_delay_fails() {
        let src = r#"{"keyboard_q": {"trigger_type": "once", "actions": [
            {"type": "delay", "duration": -1}
        ]}}"#;
        assert!(load_from_str(src, None).is_err());
    }

    #[test]
    fn unknown_field_fails() {
        // misspelled trigger_type => trigger_typ should error
        let src = r#"{"keyboard_q": {"trigger_typ": "once"}}"#;
        assert!(load_from_str(src, None).is_err());
    }

    #[test]
    fn syntax_error_reports_location() {
        let src = "{\n  \"keyboard_q\": {\n    \"trigger_type\": once\n  }\n}";
        let err = load_from_str(src, Some(Path::new("bad.json"))).unwrap_err();
        match &err {
            Error::Parse { line, excerpt, .. } => {
                assert_eq!(*line, 3);
                assert!(excerpt.contains('^'));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(err.pretty().starts_with("Config parse error at bad.json:3:"));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = load_from_path(Path::new("/nonexistent/automacro/config.json")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn dump_round_trips() {
        let table = load_from_str(HOLD_A, None).unwrap();
        let json = table.to_json_pretty().unwrap();
        let again = load_from_str(&json, None).unwrap();
        assert_eq!(table, again);
    }

    proptest! {
        #[test]
        fn delay_seconds_accepted(duration in 0.0f64..10.0, random in 0.0f64..5.0) {
            let src = format!(
                r#"{{"keyboard_d": {{"trigger_type": "once", "actions": [
                    {{"type": "delay", "duration": {duration}, "random": {random}}}
                ]}}}}"#
            );
            let table = load_from_str(&src, None).unwrap();
            let def = table.get("keyboard_d").unwrap();
            let is_delay = matches!(def.actions[0], ActionKind::Delay { .. });
            prop_assert!(is_delay);
        }
    }
}
