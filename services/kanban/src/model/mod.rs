//! Entity schemas and seed data for the board service.
mod accounts;
mod boards;
mod roles;

pub use accounts::{ACCOUNTS, RESOLVE_ACTION, account_schema};
pub use boards::{BOARDS, MAX_TITLE_LEN, board_schema};
pub use roles::{ROLES_LIST, ROLES_UPDATE, seed_roles};
