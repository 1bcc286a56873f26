//! User profile: name fields from the users table plus the avatar URL

use log::{error, info};
use std::sync::Arc;
use uuid::Uuid;

use crate::avatar::AvatarService;
use crate::error::{AppError, Result};
use crate::models::{SaveUser, User, UserView};
use crate::repository::UserRepository;

pub const MAX_NAME_CHARS: usize = 50;

pub struct UserService {
    users: Arc<dyn UserRepository>,
    avatars: Arc<AvatarService>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, avatars: Arc<AvatarService>) -> Self {
        Self { users, avatars }
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<UserView> {
        let user = self.users.get(user_id).await?;
        let avatar_url = self.avatars.download_url(user_id).await?;
        Ok(UserView::new(&user, avatar_url))
    }

    /// The id always comes from the caller, never from the body
    pub async fn update_profile(&self, user_id: Uuid, req: SaveUser) -> Result<UserView> {
        validate_user(&req)?;

        let user = User {
            id: user_id,
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            username: req.username.trim().to_string(),
        };
        let user = self.users.update(&user).await.map_err(|e| {
            if !e.is_not_found() {
                error!("Failed to update user {}: {}", user_id, e);
            }
            e
        })?;

        info!("Updated profile of user {}", user_id);
        let avatar_url = self.avatars.download_url(user_id).await?;
        Ok(UserView::new(&user, avatar_url))
    }
}

fn validate_name(field: &str, value: &str) -> Result<()> {
    let len = value.trim().chars().count();
    if len == 0 || len > MAX_NAME_CHARS {
        return Err(AppError::invalid(format!(
            "{} must be between 1 and {} characters",
            field, MAX_NAME_CHARS
        )));
    }
    Ok(())
}

fn validate_user(req: &SaveUser) -> Result<()> {
    validate_name("first_name", &req.first_name)?;
    validate_name("last_name", &req.last_name)?;
    validate_name("username", &req.username)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(first: &str, last: &str, username: &str) -> SaveUser {
        SaveUser {
            first_name: first.to_string(),
            last_name: last.to_string(),
            username: username.to_string(),
        }
    }

    #[test]
    fn test_name_bounds() {
        let max = "n".repeat(MAX_NAME_CHARS);
        assert!(validate_user(&req("A", "B", "c")).is_ok());
        assert!(validate_user(&req(&max, &max, &max)).is_ok());
        assert!(validate_user(&req(&"n".repeat(51), "B", "c")).is_err());
        assert!(validate_user(&req("A", "", "c")).is_err());
        assert!(validate_user(&req("A", "B", "  ")).is_err());
    }

    #[test]
    fn test_error_names_the_field() {
        match validate_user(&req("A", "B", &"u".repeat(51))) {
            Err(AppError::InvalidInput(msg)) => assert!(msg.starts_with("username"), "{}", msg),
            other => panic!("unexpected {:?}", other),
        }
    }
}
