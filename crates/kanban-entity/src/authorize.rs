//! Field-level authorization.
//!
//! Reads check `read_permissions` when declared and fall back to
//! `permissions`; writes only check `permissions`. Fields with neither are
//! always included. All checks for one call run concurrently and output
//! keeps the declaration order.
use crate::context::RequestContext;
use crate::errors::{EntityError, EntityResult};
use crate::field::FieldSchema;
use futures::future::try_join_all;
use kanban_authz::PermissionResolver;

pub async fn authorize_fields<'a>(
    resolver: &PermissionResolver,
    ctx: &RequestContext,
    fields: &'a [FieldSchema],
    read_only: bool,
) -> EntityResult<Vec<&'a FieldSchema>> {
    let checks = fields.iter().map(|field| async move {
        let items = if read_only {
            field.read_permissions.as_ref().or(field.permissions.as_ref())
        } else {
            field.permissions.as_ref()
        };
        match items {
            None => Ok(true),
            Some(items) => resolver
                .has_access(&ctx.roles, items.as_slice())
                .await
                .map_err(EntityError::from),
        }
    });
    let allowed = try_join_all(checks).await?;
    Ok(fields
        .iter()
        .zip(allowed)
        .filter_map(|(field, allowed)| allowed.then_some(field))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanban_authz::{InMemoryRoleStore, ResolverConfig, Role};
    use std::sync::Arc;

    fn resolver() -> PermissionResolver {
        let store = InMemoryRoleStore::with_roles([
            Role::new("admin").with_permissions(["boards.secret"]),
            Role::new("member").with_permissions(["boards.list"]),
        ]);
        PermissionResolver::new(
            Arc::new(store),
            ResolverConfig {
                admin_role: None,
                ..ResolverConfig::default()
            },
        )
    }

    fn fields() -> Vec<FieldSchema> {
        vec![
            FieldSchema::string("id").primary_key(),
            FieldSchema::string("notes").read_permissions(["admin"]),
            FieldSchema::string("budget").permissions(["admin"]),
            FieldSchema::string("title"),
        ]
    }

    fn names(fields: &[&FieldSchema]) -> Vec<String> {
        fields.iter().map(|field| field.name.clone()).collect()
    }

    #[tokio::test]
    async fn read_write_asymmetry_for_non_admin() {
        let resolver = resolver();
        let ctx = RequestContext::authenticated("u1", ["member"]);
        let fields = fields();

        let readable = authorize_fields(&resolver, &ctx, &fields, true)
            .await
            .expect("read");
        assert_eq!(names(&readable), vec!["id", "title"]);

        let writable = authorize_fields(&resolver, &ctx, &fields, false)
            .await
            .expect("write");
        assert_eq!(names(&writable), vec!["id", "notes", "title"]);
    }

    #[tokio::test]
    async fn admin_sees_everything_in_order() {
        let resolver = resolver();
        let ctx = RequestContext::authenticated("u1", ["admin"]);
        let fields = fields();
        let readable = authorize_fields(&resolver, &ctx, &fields, true)
            .await
            .expect("read");
        assert_eq!(names(&readable), vec!["id", "notes", "budget", "title"]);
    }

    #[tokio::test]
    async fn permission_items_are_matched() {
        let resolver = resolver();
        let fields = vec![
            FieldSchema::string("id").primary_key(),
            FieldSchema::string("secret").permissions(["boards.secret"]),
        ];
        let ctx = RequestContext::authenticated("u1", ["admin"]);
        let readable = authorize_fields(&resolver, &ctx, &fields, true)
            .await
            .expect("read");
        assert_eq!(readable.len(), 2);

        let ctx = RequestContext::anonymous();
        let readable = authorize_fields(&resolver, &ctx, &fields, true)
            .await
            .expect("read");
        assert_eq!(names(&readable), vec!["id"]);
    }
}
