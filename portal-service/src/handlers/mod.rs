pub mod apologies;
pub mod auth;
pub mod drive_access;
pub mod invitations;
pub mod users;
