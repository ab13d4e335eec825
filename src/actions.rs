use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    CreateFile,
    AppendFile,
    InsertCode,
}

impl ActionKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "create_file" => Some(ActionKind::CreateFile),
            "append_file" => Some(ActionKind::AppendFile),
            "insert_code" => Some(ActionKind::InsertCode),
            _ => None,
        }
    }
}

/// A validated file operation extracted from model output. Only
/// [`parse_action`] builds these; `kind` is always in vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAction {
    pub kind: ActionKind,
    /// Meaningful for `create_file`/`append_file` only. Absence is decided
    /// here; defaulting happens at the executor.
    pub path: Option<String>,
    pub content: Option<String>,
}

/// Scan free-form text for an embedded JSON action object.
///
/// The model may think out loud before or after emitting JSON, so the scan
/// runs from the first `{` to the last `}`. Anything that does not parse into
/// an object with a known `action` tag degrades to `None`; parsing never
/// fails upward.
pub fn parse_action(text: &str) -> Option<ModelAction> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    let candidate = &trimmed[start..=end];
    let value: Value = serde_json::from_str(candidate).ok()?;
    let obj = value.as_object()?;

    let kind = ActionKind::from_tag(obj.get("action")?.as_str()?)?;
    let path = obj.get("path").and_then(Value::as_str).map(str::to_string);
    let content = obj
        .get("content")
        .and_then(Value::as_str)
        .map(str::to_string);
    Some(ModelAction { kind, path, content })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_action_embedded_in_prose() {
        let raw = r#"noise {"action":"create_file","path":"src/new.ts","content":"x"} noise"#;
        let action = parse_action(raw).expect("action");
        assert_eq!(action.kind, ActionKind::CreateFile);
        assert_eq!(action.path.as_deref(), Some("src/new.ts"));
        assert_eq!(action.content.as_deref(), Some("x"));
    }

    #[test]
    fn unsupported_tag_is_none() {
        assert_eq!(parse_action(r#"{"action":"delete_file"}"#), None);
    }

    #[test]
    fn non_json_is_none() {
        assert_eq!(parse_action("not json"), None);
        assert_eq!(parse_action(""), None);
        assert_eq!(parse_action("   "), None);
        assert_eq!(parse_action("} reversed {"), None);
    }

    #[test]
    fn action_field_must_be_a_string() {
        assert_eq!(parse_action(r#"{"action":42}"#), None);
        assert_eq!(parse_action(r#"{"path":"a.txt"}"#), None);
    }

    #[test]
    fn wrongly_typed_optional_fields_are_omitted() {
        let action =
            parse_action(r#"{"action":"append_file","path":7,"content":["x"]}"#).expect("action");
        assert_eq!(action.kind, ActionKind::AppendFile);
        assert_eq!(action.path, None);
        assert_eq!(action.content, None);
    }

    #[test]
    fn insert_code_needs_no_path() {
        let action = parse_action(r#"{"action":"insert_code","content":"let x = 1;"}"#)
            .expect("action");
        assert_eq!(action.kind, ActionKind::InsertCode);
        assert_eq!(action.path, None);
        assert_eq!(action.content.as_deref(), Some("let x = 1;"));
    }

    #[test]
    fn prose_with_braces_but_broken_json_is_none() {
        assert_eq!(parse_action("see {the file} for details"), None);
    }
}
