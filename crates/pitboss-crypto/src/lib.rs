//! pitboss-crypto
//!
//! Canonical-JSON audit hashing, credential hashing, and access-token
//! signing. Built on blake3 (audit chain, request fingerprinting), bcrypt
//! (credential storage), and jsonwebtoken (bearer access tokens) — the same
//! crate choices the broader example pack reaches for on this exact surface.

pub mod credential;
pub mod hash;
pub mod token;

pub use credential::{hash_credential, verify_credential, CredentialError};
pub use hash::{canonical_json_string, canonicalize, chain_hash, normalize_snapshot, request_fingerprint, GENESIS_HASH};
pub use token::{AccessClaims, AccessTokenSigner, TokenError};
