//! Authentication module

pub mod bearer;
pub mod error;
pub mod jwks;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod provider;
pub mod provider_client;
pub mod session;

pub use bearer::extract_bearer;
pub use error::AuthError;
pub use jwks::{ExternalIdentityValidator, JwksSettings};
pub use jwt::{Claims, JwtService};
pub use middleware::{auth_middleware, identity_from, with_identity, Identity};
pub use password::{PasswordConfig, PasswordHasher};
pub use provider::{AuthProvider, ExternalOidc, LocalSigned};
pub use provider_client::{ProviderClient, ProviderTokens};
pub use session::Session;
