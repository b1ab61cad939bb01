//! Board entity schema.
//!
//! # Purpose
//! Declares the board fields, their write rules and which roles may read or
//! write the restricted ones.
use crate::model::RESOLVE_ACTION;
use kanban_entity::{
    EntityResult, EntitySchema, FieldHook, FieldKind, FieldSchema, PopulateRule, Trim,
};
use serde_json::Value;

pub const BOARDS: &str = "boards";
pub const MAX_TITLE_LEN: usize = 120;

/// Board schema; `secure_ids` encodes the primary key on output.
pub fn board_schema(secure_ids: bool) -> EntityResult<EntitySchema> {
    let mut id = FieldSchema::string("id").column("_id").primary_key().readonly();
    if secure_ids {
        id = id.secure();
    }
    EntitySchema::new(
        BOARDS,
        vec![
            id,
            FieldSchema::string("title")
                .required()
                .trim(Trim::Both)
                .validator(|value| match value.as_str() {
                    Some(title) if title.is_empty() => Err("`title` must not be empty".to_string()),
                    Some(title) if title.chars().count() > MAX_TITLE_LEN => {
                        Err(format!("`title` must be at most {MAX_TITLE_LEN} characters"))
                    }
                    _ => Ok(()),
                }),
            FieldSchema::string("description").trim(Trim::Right),
            FieldSchema::string("owner")
                .readonly()
                .on_create(FieldHook::sync(|input| {
                    Ok(input.ctx.user_id.clone().map(Value::String))
                }))
                .populate(PopulateRule::action(RESOLVE_ACTION)),
            FieldSchema::new("members", FieldKind::Array)
                .default_value(Value::Array(Vec::new()))
                .validator(|value| {
                    let all_ids = value
                        .as_array()
                        .is_none_or(|ids| ids.iter().all(Value::is_string));
                    if all_ids {
                        Ok(())
                    } else {
                        Err("`members` must be a list of account ids".to_string())
                    }
                })
                .populate(PopulateRule::action(RESOLVE_ACTION)),
            FieldSchema::new("labels", FieldKind::Array).default_value(Value::Array(Vec::new())),
            FieldSchema::new("archived", FieldKind::Boolean).default_value(false),
            FieldSchema::new("budget", FieldKind::Number).permissions(["boards.budget"]),
            FieldSchema::string("notes").read_permissions(["boards.notes.read"]),
            FieldSchema::new("revision", FieldKind::Number)
                .hidden()
                .readonly()
                .on_set(FieldHook::sync(|input| {
                    let next = input
                        .entity
                        .get("revision")
                        .and_then(Value::as_u64)
                        .map_or(1, |revision| revision + 1);
                    Ok(Some(Value::from(next)))
                })),
            FieldSchema::string("createdAt")
                .readonly()
                .on_create(FieldHook::sync(|_| Ok(Some(Value::String(now()))))),
            FieldSchema::string("updatedAt")
                .readonly()
                .on_set(FieldHook::sync(|_| Ok(Some(Value::String(now()))))),
        ],
    )
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_builds_with_and_without_secure_ids() {
        let secure = board_schema(true).expect("schema");
        assert!(secure.primary_key().secure);
        assert_eq!(secure.primary_key().storage_path(), "_id");

        let plain = board_schema(false).expect("schema");
        assert!(!plain.primary_key().secure);
        assert_eq!(plain.action_permissions("list"), vec!["boards.list".to_string()]);
    }

    #[test]
    fn title_validator_bounds_length() {
        let schema = board_schema(false).expect("schema");
        let check = schema
            .field("title")
            .and_then(|field| field.validate.clone())
            .expect("validator");
        assert!(check(&Value::String("Roadmap".to_string())).is_ok());
        assert!(check(&Value::String(String::new())).is_err());
        assert!(check(&Value::String("x".repeat(MAX_TITLE_LEN + 1))).is_err());
    }

    #[test]
    fn members_must_be_ids() {
        let schema = board_schema(false).expect("schema");
        let check = schema
            .field("members")
            .and_then(|field| field.validate.clone())
            .expect("validator");
        assert!(check(&serde_json::json!(["a", "b"])).is_ok());
        assert!(check(&serde_json::json!(["a", 3])).is_err());
    }
}
