//! Account entity schema. Accounts are referenced by board owners and
//! members; callers create them over HTTP and read them through population.
use kanban_entity::{AUTHENTICATED_ROLE, EntityResult, EntitySchema, FieldSchema, Trim};

pub const ACCOUNTS: &str = "accounts";
pub const RESOLVE_ACTION: &str = "accounts.resolve";

pub fn account_schema() -> EntityResult<EntitySchema> {
    Ok(EntitySchema::new(
        ACCOUNTS,
        vec![
            FieldSchema::string("id").column("_id").primary_key().readonly(),
            FieldSchema::string("name").required().trim(Trim::Both),
            FieldSchema::string("email").read_permissions(["users-admin"]),
            FieldSchema::string("avatarUrl").column("profile.avatar"),
        ],
    )?
    .with_action_permissions("resolve", [AUTHENTICATED_ROLE]))
}
