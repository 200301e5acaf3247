pub mod admin_handlers;
pub mod auth;
pub mod form;
