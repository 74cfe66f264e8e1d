pub mod authz;
pub mod discord;
pub mod identity;
pub mod invitations;
pub mod jwt;
pub mod notifier;
pub mod profile;
pub mod requests;

pub use authz::AuthzService;
pub use discord::DiscordVerifier;
pub use identity::{
    Identity, IdentityProvider, MemoryIdentityProvider, PgIdentityProvider, Session,
};
pub use invitations::{CreatedInvitation, InvitationDetails, InvitationService};
pub use jwt::{JwtService, SessionClaims};
pub use notifier::{Notifier, PortalEvent};
pub use profile::ProfileResolver;
pub use requests::AccessRequestService;
