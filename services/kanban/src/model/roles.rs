//! Built-in roles seeded at startup.
//!
//! `manager` inherits both admin roles, so it holds every board and user
//! permission without the administrator wildcard.
use kanban_authz::Role;
use kanban_entity::{AUTHENTICATED_ROLE, EVERYONE_ROLE};

pub const ROLES_UPDATE: &str = "roles.update";
pub const ROLES_LIST: &str = "roles.list";

pub fn seed_roles(admin_role: Option<&str>) -> Vec<Role> {
    let mut roles = vec![
        Role::new(EVERYONE_ROLE).with_description("Every caller, signed in or not"),
        Role::new(AUTHENTICATED_ROLE)
            .with_description("Every signed-in caller")
            .with_inherits(["boards-reader"]),
        Role::new("boards-reader").with_permissions([
            "boards.list",
            "boards.get",
            "boards.find",
            "boards.count",
        ]),
        Role::new("boards-writer").with_permissions([
            "boards.create",
            "boards.update",
            "boards.remove",
        ]),
        Role::new("boards-admin")
            .with_inherits(["boards-reader", "boards-writer"])
            .with_permissions(["boards.notes.read", "boards.budget"]),
        Role::new("users-admin").with_permissions(["accounts.*", "users.*", ROLES_LIST]),
        Role::new("manager").with_inherits(["boards-admin", "users-admin"]),
    ];
    if let Some(admin) = admin_role {
        roles.push(
            Role::new(admin)
                .with_description("Bypasses every permission check")
                .with_permissions(["**"]),
        );
    }
    roles
}
