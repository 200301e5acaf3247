pub mod admin_service;
pub mod form;
pub mod profile;

pub use admin_service::{UserAdminError, UserAdminService};
pub use form::{UserForm, ValidatedCreate, ValidationErrors, normalize_user_name};
pub use profile::{
    AdminToggle, NewUser, User, UserChanges, UserDetails, UserEditView, UserId, UserIndexEntry,
    UserRelations,
};
