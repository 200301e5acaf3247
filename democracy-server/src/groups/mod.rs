//! Groups and votings, the records a profile can be linked to.

pub mod handlers;
