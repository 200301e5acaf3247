//! Admin operations on profiles and the identity accounts that mirror them.
//!
//! A profile and its account share nothing but the user name. Creating a
//! profile provisions the account; listing and toggling the admin role look
//! the account up again on every call.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use super::form::{UserForm, ValidationErrors};
use super::profile::{
    AdminToggle, User, UserDetails, UserEditView, UserId, UserIndexEntry,
};
use crate::database::ports::identity::{IdentityError, IdentityStore};
use crate::database::ports::profiles::{ProfileRepository, ProfileRepositoryError};
use crate::domain::identity::password::hash_password;
use crate::domain::identity::{Account, NewAccount, Role};
use crate::photos::{PhotoError, PhotoStore, PhotoUpload};

#[derive(Debug, thiserror::Error)]
pub enum UserAdminError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("User {0} not found")]
    NotFound(UserId),

    #[error("The email is already used by another user")]
    DuplicateUserName,

    #[error("Cannot delete the record because it has related records")]
    HasRelatedRecords,

    #[error("No identity account for {0}")]
    AccountNotFound(String),

    #[error("Failed to hash password: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    Photo(PhotoError),

    #[error(transparent)]
    Profile(ProfileRepositoryError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl From<ProfileRepositoryError> for UserAdminError {
    fn from(err: ProfileRepositoryError) -> Self {
        match err {
            ProfileRepositoryError::NotFound(id) => UserAdminError::NotFound(id),
            ProfileRepositoryError::DuplicateUserName => UserAdminError::DuplicateUserName,
            ProfileRepositoryError::HasRelatedRecords => UserAdminError::HasRelatedRecords,
            other => UserAdminError::Profile(other),
        }
    }
}

impl From<PhotoError> for UserAdminError {
    fn from(err: PhotoError) -> Self {
        if err.is_rejected_upload() {
            let mut errors = ValidationErrors::default();
            errors.push("photo", err.to_string());
            UserAdminError::Validation(errors)
        } else {
            UserAdminError::Photo(err)
        }
    }
}

/// Keeps profile records and identity accounts in step.
#[derive(Clone)]
pub struct UserAdminService {
    profiles: Arc<dyn ProfileRepository>,
    identity: Arc<dyn IdentityStore>,
    photos: Arc<PhotoStore>,
}

impl fmt::Debug for UserAdminService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAdminService")
            .field("photos", &self.photos)
            .finish_non_exhaustive()
    }
}

impl UserAdminService {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        identity: Arc<dyn IdentityStore>,
        photos: Arc<PhotoStore>,
    ) -> Self {
        Self {
            profiles,
            identity,
            photos,
        }
    }

    pub fn photos(&self) -> &PhotoStore {
        &self.photos
    }

    /// All profiles with their admin flag and relation counts.
    pub async fn list(&self) -> Result<Vec<UserIndexEntry>, UserAdminError> {
        let users = self.profiles.list().await?;
        let mut entries = Vec::with_capacity(users.len());
        for user in users {
            let is_admin = self.is_admin_by_name(&user.user_name).await?;
            let relations = self.profiles.relations(user.user_id).await?;
            entries.push(UserIndexEntry {
                full_name: user.full_name(),
                is_admin,
                group_member_count: relations.group_members.len(),
                candidate_count: relations.candidates.len(),
                user,
            });
        }
        Ok(entries)
    }

    pub async fn details(&self, id: UserId) -> Result<UserDetails, UserAdminError> {
        let user = self.load(id).await?;
        let relations = self.profiles.relations(id).await?;
        let is_admin = self.is_admin_by_name(&user.user_name).await?;
        Ok(UserDetails {
            full_name: user.full_name(),
            is_admin,
            relations,
            user,
        })
    }

    pub async fn edit_view(&self, id: UserId) -> Result<UserEditView, UserAdminError> {
        Ok(self.load(id).await?.into())
    }

    /// Store a new profile and provision its identity account.
    ///
    /// Nothing is kept when any step fails: the stored photo and profile are
    /// removed again if the account cannot be provisioned. An existing account
    /// with the same user name is adopted as is.
    pub async fn create(
        &self,
        form: &UserForm,
        photo: Option<PhotoUpload>,
    ) -> Result<User, UserAdminError> {
        let validated = form.validate_create().map_err(UserAdminError::Validation)?;
        let mut new_user = validated.user;

        new_user.photo = self.store_photo(photo.as_ref()).await?;

        let user = match self.profiles.insert(new_user.clone()).await {
            Ok(user) => user,
            Err(err) => {
                if matches!(err, ProfileRepositoryError::DuplicateUserName) {
                    warn!(user_name = %new_user.user_name, "rejected duplicate user name");
                }
                self.discard_photo(new_user.photo.as_deref()).await;
                return Err(err.into());
            }
        };

        if let Err(err) = self.provision_account(&user, &validated.password).await {
            warn!(
                user_id = user.user_id,
                error = %err,
                "account provisioning failed, removing profile"
            );
            if let Err(cleanup) = self.profiles.delete(user.user_id).await {
                warn!(user_id = user.user_id, error = %cleanup, "failed to remove profile");
            }
            self.discard_photo(user.photo.as_deref()).await;
            return Err(err);
        }

        info!(user_id = user.user_id, user_name = %user.user_name, "user created");
        Ok(user)
    }

    /// Apply an edit. A new photo replaces the previous file.
    pub async fn update(
        &self,
        id: UserId,
        form: &UserForm,
        photo: Option<PhotoUpload>,
    ) -> Result<User, UserAdminError> {
        let mut user = self.load(id).await?;
        let mut changes = form.validate_edit().map_err(UserAdminError::Validation)?;

        changes.photo = self.store_photo(photo.as_ref()).await?;
        let new_photo = changes.photo.clone();
        let previous_photo = user.photo.clone();
        user.apply(changes);

        if let Err(err) = self.profiles.update(&user).await {
            self.discard_photo(new_photo.as_deref()).await;
            return Err(err.into());
        }

        if new_photo.is_some() {
            self.discard_photo(previous_photo.as_deref()).await;
        }

        info!(user_id = id, "user updated");
        Ok(user)
    }

    /// Remove a profile. The identity account is left in place.
    pub async fn delete(&self, id: UserId) -> Result<User, UserAdminError> {
        let user = self.load(id).await?;
        if let Err(err) = self.profiles.delete(id).await {
            if matches!(err, ProfileRepositoryError::HasRelatedRecords) {
                warn!(user_id = id, "refused to delete user with related records");
            }
            return Err(err.into());
        }
        self.discard_photo(user.photo.as_deref()).await;

        info!(user_id = id, user_name = %user.user_name, "user deleted");
        Ok(user)
    }

    /// Flip membership of the profile's account in the `Admin` role.
    pub async fn toggle_admin(&self, id: UserId) -> Result<AdminToggle, UserAdminError> {
        let user = self.load(id).await?;
        let account = self
            .identity
            .find_by_email(&user.user_name)
            .await?
            .ok_or_else(|| UserAdminError::AccountNotFound(user.user_name.clone()))?;

        let role = Role::Admin.as_str();
        let is_admin = if self.identity.is_in_role(account.id, role).await? {
            self.identity.remove_from_role(account.id, role).await?;
            false
        } else {
            self.ensure_role(Role::Admin).await?;
            self.identity.add_to_role(account.id, role).await?;
            true
        };

        info!(user_id = id, account_id = %account.id, is_admin, "admin role toggled");
        Ok(AdminToggle {
            user_id: id,
            user_name: user.user_name,
            is_admin,
        })
    }

    async fn load(&self, id: UserId) -> Result<User, UserAdminError> {
        self.profiles
            .find(id)
            .await?
            .ok_or(UserAdminError::NotFound(id))
    }

    async fn is_admin_by_name(&self, user_name: &str) -> Result<bool, UserAdminError> {
        match self.identity.find_by_name(user_name).await? {
            Some(account) => Ok(self
                .identity
                .is_in_role(account.id, Role::Admin.as_str())
                .await?),
            None => Ok(false),
        }
    }

    async fn ensure_role(&self, role: Role) -> Result<(), UserAdminError> {
        if !self.identity.role_exists(role.as_str()).await? {
            self.identity.create_role(role.as_str()).await?;
        }
        Ok(())
    }

    async fn provision_account(
        &self,
        user: &User,
        password: &str,
    ) -> Result<Account, UserAdminError> {
        let account = match self.identity.find_by_name(&user.user_name).await? {
            Some(existing) => {
                info!(account_id = %existing.id, "adopting existing identity account");
                existing
            }
            None => {
                let password_hash = hash_password(password)
                    .map_err(|e| UserAdminError::PasswordHash(e.to_string()))?;
                self.identity
                    .create_account(NewAccount {
                        user_name: user.user_name.clone(),
                        email: user.user_name.clone(),
                        phone_number: Some(user.phone.clone()),
                        password_hash,
                    })
                    .await?
            }
        };

        self.ensure_role(Role::User).await?;
        self.identity
            .add_to_role(account.id, Role::User.as_str())
            .await?;
        Ok(account)
    }

    async fn store_photo(
        &self,
        photo: Option<&PhotoUpload>,
    ) -> Result<Option<String>, UserAdminError> {
        match photo {
            Some(upload) => Ok(Some(self.photos.save(upload).await?)),
            None => Ok(None),
        }
    }

    async fn discard_photo(&self, path: Option<&str>) {
        let Some(path) = path else { return };
        if let Err(err) = self.photos.remove(path).await {
            warn!(path, error = %err, "failed to remove photo");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::{InMemoryDatabase, InMemoryIdentityStore};
    use crate::database::ports::membership::MembershipRepository;
    use crate::photos::DEFAULT_MAX_PHOTO_BYTES;

    const PNG: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    struct Fixture {
        service: UserAdminService,
        db: Arc<InMemoryDatabase>,
        identity: Arc<InMemoryIdentityStore>,
        dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(InMemoryDatabase::new());
        let identity = Arc::new(InMemoryIdentityStore::new());
        let photos = Arc::new(PhotoStore::new(dir.path(), DEFAULT_MAX_PHOTO_BYTES));
        let service = UserAdminService::new(db.clone(), identity.clone(), photos);
        Fixture {
            service,
            db,
            identity,
            dir,
        }
    }

    fn form(user_name: &str) -> UserForm {
        UserForm {
            user_name: user_name.into(),
            first_name: "Maria".into(),
            last_name: "Gomez".into(),
            phone: "3001234567".into(),
            address: "Calle 1".into(),
            grade: Some("11".into()),
            group: None,
            password: Some("secret123".into()),
        }
    }

    fn png() -> PhotoUpload {
        PhotoUpload {
            file_name: "face.png".into(),
            bytes: PNG.to_vec(),
        }
    }

    fn stored_files(dir: &tempfile::TempDir) -> usize {
        std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn create_provisions_account_with_user_role() {
        let f = fixture();
        let user = f.service.create(&form(" Maria@Example.org "), None).await.unwrap();
        assert_eq!(user.user_name, "maria@example.org");

        let account = f.identity.find_by_name("maria@example.org").await.unwrap().unwrap();
        assert_eq!(account.email, "maria@example.org");
        assert_eq!(account.phone_number.as_deref(), Some("3001234567"));
        assert_eq!(f.identity.roles_for(account.id).await.unwrap(), ["User"]);
        assert!(crate::domain::identity::password::verify_password(
            "secret123",
            &account.password_hash
        ));
    }

    #[tokio::test]
    async fn duplicate_create_keeps_single_profile_and_no_photo() {
        let f = fixture();
        f.service.create(&form("dup@example.org"), None).await.unwrap();

        let err = f
            .service
            .create(&form("dup@example.org"), Some(png()))
            .await
            .unwrap_err();
        assert!(matches!(err, UserAdminError::DuplicateUserName));
        assert_eq!(f.service.list().await.unwrap().len(), 1);
        assert_eq!(stored_files(&f.dir), 0);
    }

    #[tokio::test]
    async fn invalid_form_persists_nothing() {
        let f = fixture();
        let mut bad = form("not-an-email");
        bad.first_name.clear();
        let err = f.service.create(&bad, Some(png())).await.unwrap_err();
        match err {
            UserAdminError::Validation(errors) => {
                assert!(errors.has("user_name"));
                assert!(errors.has("first_name"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(f.db.list().await.unwrap().is_empty());
        assert_eq!(stored_files(&f.dir), 0);
    }

    #[tokio::test]
    async fn non_image_upload_is_a_validation_error() {
        let f = fixture();
        let upload = PhotoUpload {
            file_name: "evil.png".into(),
            bytes: b"MZ\x90\x00not an image".to_vec(),
        };
        let err = f
            .service
            .create(&form("img@example.org"), Some(upload))
            .await
            .unwrap_err();
        assert!(matches!(err, UserAdminError::Validation(ref e) if e.has("photo")));
        assert!(f.db.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn existing_account_is_adopted() {
        let f = fixture();
        let existing = f
            .identity
            .create_account(NewAccount {
                user_name: "adopt@example.org".into(),
                email: "adopt@example.org".into(),
                phone_number: None,
                password_hash: "kept".into(),
            })
            .await
            .unwrap();

        f.service.create(&form("adopt@example.org"), None).await.unwrap();
        let account = f.identity.find_by_name("adopt@example.org").await.unwrap().unwrap();
        assert_eq!(account.id, existing.id);
        assert_eq!(account.password_hash, "kept");
        assert!(f.identity.is_in_role(account.id, "User").await.unwrap());
    }

    #[tokio::test]
    async fn update_replaces_photo_and_keeps_user_name() {
        let f = fixture();
        let user = f
            .service
            .create(&form("edit@example.org"), Some(png()))
            .await
            .unwrap();
        let first_photo = user.photo.clone().unwrap();

        let mut edit = form("someone-else@example.org");
        edit.first_name = "Mariana".into();
        edit.password = None;
        let updated = f.service.update(user.user_id, &edit, Some(png())).await.unwrap();

        assert_eq!(updated.user_name, "edit@example.org");
        assert_eq!(updated.first_name, "Mariana");
        assert_ne!(updated.photo.as_deref(), Some(first_photo.as_str()));
        assert!(f.service.photos().resolve(&first_photo).is_some_and(|p| !p.exists()));
        assert_eq!(stored_files(&f.dir), 1);
    }

    #[tokio::test]
    async fn update_without_photo_keeps_existing_one() {
        let f = fixture();
        let user = f
            .service
            .create(&form("keep@example.org"), Some(png()))
            .await
            .unwrap();
        let updated = f
            .service
            .update(user.user_id, &form("keep@example.org"), None)
            .await
            .unwrap();
        assert_eq!(updated.photo, user.photo);
    }

    #[tokio::test]
    async fn delete_with_relations_is_refused() {
        let f = fixture();
        let user = f.service.create(&form("member@example.org"), None).await.unwrap();
        let group = f.db.create_group("Grade 11").await.unwrap();
        f.db.add_group_member(group.group_id, user.user_id).await.unwrap();

        let err = f.service.delete(user.user_id).await.unwrap_err();
        assert!(matches!(err, UserAdminError::HasRelatedRecords));
        assert_eq!(
            err.to_string(),
            "Cannot delete the record because it has related records"
        );
        assert!(f.db.find(user.user_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_removes_photo_but_not_account() {
        let f = fixture();
        let user = f
            .service
            .create(&form("gone@example.org"), Some(png()))
            .await
            .unwrap();
        f.service.delete(user.user_id).await.unwrap();

        assert!(matches!(
            f.service.details(user.user_id).await,
            Err(UserAdminError::NotFound(_))
        ));
        assert_eq!(stored_files(&f.dir), 0);
        assert!(f.identity.find_by_name("gone@example.org").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn toggle_admin_flips_and_creates_role() {
        let f = fixture();
        let user = f.service.create(&form("boss@example.org"), None).await.unwrap();
        assert!(!f.identity.role_exists("Admin").await.unwrap());

        let on = f.service.toggle_admin(user.user_id).await.unwrap();
        assert!(on.is_admin);
        assert!(f.service.list().await.unwrap()[0].is_admin);

        let off = f.service.toggle_admin(user.user_id).await.unwrap();
        assert!(!off.is_admin);
        assert!(!f.service.details(user.user_id).await.unwrap().is_admin);
    }

    #[tokio::test]
    async fn toggle_admin_without_account_fails() {
        let f = fixture();
        let user = f.service.create(&form("orphan@example.org"), None).await.unwrap();
        let account = f.identity.find_by_name("orphan@example.org").await.unwrap().unwrap();
        f.identity.delete_account(account.id).await.unwrap();

        assert!(matches!(
            f.service.toggle_admin(user.user_id).await,
            Err(UserAdminError::AccountNotFound(_))
        ));
        assert!(matches!(
            f.service.toggle_admin(user.user_id + 1).await,
            Err(UserAdminError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_reports_relation_counts() {
        let f = fixture();
        let user = f.service.create(&form("count@example.org"), None).await.unwrap();
        let voting = f.db.create_voting("Personero").await.unwrap();
        f.db.add_candidate(voting.voting_id, user.user_id).await.unwrap();

        let entries = f.service.list().await.unwrap();
        assert_eq!(entries[0].candidate_count, 1);
        assert_eq!(entries[0].group_member_count, 0);
        assert_eq!(entries[0].full_name, "Maria Gomez");
    }
}
