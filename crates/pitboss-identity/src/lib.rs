//! pitboss-identity
//!
//! Credential verification, login lockout, and access/refresh-token
//! lifecycle management (§4.5).

pub mod model;
pub mod requests;
pub mod service;
pub mod sessions;
pub mod store;

pub use model::{CredentialStatus, IdentityCredential, IdentityLockout, IdentitySession};
pub use requests::{
    LoginRequest, LoginResponse, LogoutRequest, LogoutResponse, RefreshTokenRequest, RefreshTokenResponse,
    SetCredentialRequest, SetCredentialResponse,
};
pub use service::{IdentityConfig, IdentityService};
pub use sessions::{
    EndSessionRequest, EndSessionResponse, GetSessionRequest, GetSessionResponse, StartSessionRequest,
    StartSessionResponse, UserSession, UserSessionService,
};
pub use store::{sweep_expired_sessions, CredentialStore, LockoutStore, SessionStore};
