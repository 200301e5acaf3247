pub mod groups;
pub mod identity;
pub mod users;
