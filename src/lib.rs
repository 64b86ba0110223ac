//! # Registrar
//!
//! `registrar` is an HTTP service that turns a single identifier + password
//! form into either a first-time registration or a login, and stores the
//! student profile collected afterwards.
//!
//! ## Resolution
//!
//! A login request is resolved against the credential store:
//!
//! 1. **Unknown identifier:** the password is hashed and a new record is created.
//! 2. **Known identifier:** the password is verified against the stored bcrypt hash.
//! 3. **Legacy plaintext:** records written by older deployments may still hold a
//!    plaintext credential; a matching login rewrites it as a hash.
//!
//! Two concurrent first logins for the same identifier race on the store's
//! uniqueness constraint; the loser retries once and authenticates.
//!
//! ## Storage
//!
//! Records live in `PostgreSQL` (schema in `sql/schema.sql`) or, without a DSN,
//! in an in-memory map that is lost on restart.

pub mod api;
pub mod cli;
pub mod identity;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
