//! Services layer for identity-service.
//!
//! Business logic for credential verification, lockout tracking, token
//! issuance, OAuth2 code exchange and identity linking.

pub mod audit;
mod credentials;
pub mod error;
mod linker;
mod lockout;
pub mod metrics;
mod oauth;
mod providers;
mod token;

pub use audit::{AuditLogger, AuditSink, RecordingAuditSink, TracingAuditSink};
pub use credentials::CredentialAuthenticator;
pub use error::AuthError;
pub use linker::IdentityLinker;
pub use lockout::{LockoutStore, MemoryLockoutStore};
pub use oauth::{OAuth2Exchanger, ProviderTokens};
pub use providers::ProviderRegistry;
pub use token::{TokenClaims, TokenIssuer, TokenPair, REFRESH_TOKEN_TYPE};
