pub mod apology;
pub mod drive_request;
pub mod status;
pub mod user;

pub use apology::{Apology, ApologyWithOwner};
pub use drive_request::{DriveAccessRequest, DriveAccessRequestWithOwner};
pub use status::RequestStatus;
pub use user::{User, UserResponse, UserRole};
