use crate::{
    error::AppError,
    model::{Profile, UserId},
    storage::Storage,
};

const MAX_DISPLAY_NAME_LEN: usize = 50;

/// Who is driving the current interaction. Passed explicitly to every
/// operation that scopes by owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<Profile>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn signed_in(profile: Profile) -> Self {
        Self {
            user: Some(profile),
        }
    }

    pub fn user(&self) -> Option<&Profile> {
        self.user.as_ref()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|profile| profile.id)
    }

    pub fn require_user(&self) -> Result<&Profile, AppError> {
        self.user.as_ref().ok_or(AppError::SignInRequired)
    }

    /// Signs in as `display_name`, creating the profile on first use.
    pub async fn sign_in(storage: &Storage, display_name: &str) -> Result<Self, AppError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(AppError::Invalid("Display name is required.".into()));
        }
        if display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
            return Err(AppError::Invalid("Display name is too long.".into()));
        }
        let existing = storage
            .select_profile_by_name(display_name)
            .await
            .map_err(AppError::FetchFailed)?;
        let profile = match existing {
            Some(profile) => profile,
            None => {
                let profile = storage
                    .insert_profile(Some(display_name))
                    .await
                    .map_err(AppError::from_write)?;
                tracing::info!(user = %profile.id, "created profile");
                profile
            }
        };
        Ok(Self::signed_in(profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_in_reuses_existing_profile() {
        let storage = Storage::in_memory().await.unwrap();
        let first = Session::sign_in(&storage, " ada ").await.unwrap();
        let second = Session::sign_in(&storage, "ada").await.unwrap();
        assert_eq!(first.user_id(), second.user_id());
        assert_eq!(first.user().unwrap().name(), "ada");
        assert_eq!(storage.count_profiles().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let storage = Storage::in_memory().await.unwrap();
        assert!(matches!(
            Session::sign_in(&storage, "  ").await,
            Err(AppError::Invalid(_))
        ));
    }

    #[test]
    fn anonymous_session_requires_sign_in() {
        let session = Session::anonymous();
        assert!(session.user_id().is_none());
        assert!(matches!(session.require_user(), Err(AppError::SignInRequired)));
    }
}
