//! # Democracy Core
//!
//! Domain types, storage ports, and business logic behind the Democracy
//! users admin service.
//!
//! ## Overview
//!
//! A user exists twice in the system:
//!
//! - **Profile record** ([`domain::users::User`]): the voting application's
//!   view of a person (name, contact details, grade, group, photo) together
//!   with its group memberships and candidacies.
//! - **Identity account** ([`domain::identity::Account`]): the login entity
//!   holding credentials and role membership.
//!
//! The two are linked only by user name, which is the person's e-mail
//! address. [`domain::users::UserAdminService`] keeps them in step: it
//! provisions an account when a profile is created and resolves the account
//! when role membership has to be read or changed.
//!
//! ## Storage
//!
//! Persistence is expressed as traits in [`database::ports`] with two
//! implementations each:
//!
//! - [`database::postgres`]: SQLx/PostgreSQL, schema embedded in [`MIGRATOR`]
//! - [`database::memory`]: in-process stores used by tests and `dev_mode`

/// Route constants and response envelopes shared with HTTP clients
pub mod api;

/// Storage ports and their implementations
pub mod database;

/// Users, identity accounts, groups and votings
pub mod domain;

/// Uploaded photo storage
pub mod photos;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use domain::identity::{Account, Role};
pub use domain::users::{User, UserAdminService};
