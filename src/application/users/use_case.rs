use super::dto::LoginResult;
use crate::{
    application::infra,
    domain::{
        shared::{errors::DomainError, ids::ActorId},
        user::{
            entity::{DEFAULT_AVATAR, MAX_GENDER_CHARS, MAX_NICKNAME_CHARS, ProfileUpdate, User},
            repository::UserRepository,
        },
    },
    infrastructure::{
        cache::traits::TokenList,
        security::{
            jwt::{BearerClaims, TokenError, TokenIssuer},
            passwords::{MIN_PASSWORD_LEN, hash_password, is_valid_username, verify_password},
        },
        storage::{
            traits::AvatarStore,
            webp::{ImageRules, convert_to_webp},
        },
    },
};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Accounts, profiles and sessions.
///
/// A bearer token is only honoured while it sits in the owner's token list;
/// logging in pushes onto the list (evicting the oldest session past the
/// cap) and logging out removes the token.
pub struct UserService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenList>,
    avatars: Arc<dyn AvatarStore>,
    issuer: TokenIssuer,
    password_cost: u32,
    avatar_rules: ImageRules,
}

fn check_password(password: &str) -> Result<(), DomainError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(DomainError::ValidationError(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn bounded(field: &str, value: Option<String>, max: usize) -> Result<Option<String>, DomainError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let value = value.trim().to_string();
    if value.chars().count() > max {
        return Err(DomainError::ValidationError(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(Some(value))
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenList>,
        avatars: Arc<dyn AvatarStore>,
        issuer: TokenIssuer,
        password_cost: u32,
        avatar_rules: ImageRules,
    ) -> Self {
        Self {
            users,
            tokens,
            avatars,
            issuer,
            password_cost,
            avatar_rules,
        }
    }

    async fn hash(&self, password: &str) -> Result<String, DomainError> {
        let cost = self.password_cost;
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| DomainError::InfrastructureError(e.to_string()))?
            .map_err(|e| DomainError::InfrastructureError(e.to_string()))
    }

    /// The user behind `username` if `password` matches.
    async fn verify_credentials(&self, username: &str, password: &str) -> Result<User, DomainError> {
        let invalid = || DomainError::ValidationError("invalid username or password".to_string());
        let user = self
            .users
            .find_by_username(username.trim())
            .await?
            .ok_or_else(invalid)?;

        let candidate = password.to_string();
        let stored = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&candidate, &stored))
            .await
            .map_err(|e| DomainError::InfrastructureError(e.to_string()))?
            .map_err(|e| DomainError::InfrastructureError(e.to_string()))?;
        if !valid {
            return Err(invalid());
        }
        Ok(user)
    }

    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> Result<User, DomainError> {
        let username = username.trim();
        if !is_valid_username(username) {
            return Err(DomainError::ValidationError(
                "username must be 3-32 letters, digits or underscores".to_string(),
            ));
        }
        check_password(password)?;
        if self.users.find_by_username(username).await?.is_some() {
            return Err(DomainError::ValidationError(format!(
                "username {username} is taken"
            )));
        }

        let password_hash = self.hash(password).await?;
        let user = self.users.create(username, &password_hash).await?;
        info!(uid = user.id, "user registered");
        Ok(user)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResult, DomainError> {
        let user = self.verify_credentials(username, password).await?;
        let token = self
            .issuer
            .issue(user.id, &user.username)
            .map_err(|e| DomainError::InfrastructureError(e.to_string()))?;
        self.tokens.push(user.id, &token).await.map_err(infra)?;
        info!(uid = user.id, "user logged in");
        Ok(LoginResult { token, user })
    }

    pub async fn logout(&self, uid: ActorId, token: &str) -> Result<(), DomainError> {
        if !self.tokens.remove(uid, token).await.map_err(infra)? {
            return Err(DomainError::Unauthorized);
        }
        Ok(())
    }

    /// Replaces the password of `username` after checking the current one,
    /// then revokes every live session of that user.
    #[instrument(skip(self, password, new_password))]
    pub async fn change_password(
        &self,
        username: &str,
        password: &str,
        new_password: &str,
    ) -> Result<(), DomainError> {
        let user = self.verify_credentials(username, password).await?;
        check_password(new_password)?;
        let password_hash = self.hash(new_password).await?;
        self.users.update_password(user.id, &password_hash).await?;

        let mut revoked = 0;
        for token in self.tokens.tokens(user.id).await.map_err(infra)? {
            if self.tokens.remove(user.id, &token).await.map_err(infra)? {
                revoked += 1;
            }
        }
        info!(uid = user.id, revoked, "password changed");
        Ok(())
    }

    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        uid: ActorId,
        update: ProfileUpdate,
    ) -> Result<User, DomainError> {
        if update.birth.is_some_and(|birth| birth > chrono::Utc::now().timestamp()) {
            return Err(DomainError::ValidationError(
                "birth cannot be in the future".to_string(),
            ));
        }
        let update = ProfileUpdate {
            nickname: bounded("nickname", update.nickname, MAX_NICKNAME_CHARS)?,
            birth: update.birth,
            gender: bounded("gender", update.gender, MAX_GENDER_CHARS)?,
        };
        self.users.update_profile(uid, update).await
    }

    /// Re-encodes `data` as the user's new avatar and queues the old one for
    /// deletion. Returns the new file name.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub async fn upload_avatar(&self, uid: ActorId, data: Bytes) -> Result<String, DomainError> {
        let rules = self.avatar_rules;
        let webp = tokio::task::spawn_blocking(move || convert_to_webp(&data, rules))
            .await
            .map_err(|e| DomainError::InfrastructureError(e.to_string()))?
            .map_err(|e| DomainError::ValidationError(e.to_string()))?;
        let filename = self.avatars.save(webp).await.map_err(infra)?;

        let previous = match self.users.replace_avatar(uid, &filename).await {
            Ok(previous) => previous,
            Err(e) => {
                self.retire_avatar(&filename).await;
                return Err(e);
            }
        };
        if previous != DEFAULT_AVATAR {
            self.retire_avatar(&previous).await;
        }
        info!(uid, avatar = %filename, "avatar replaced");
        Ok(filename)
    }

    async fn retire_avatar(&self, filename: &str) {
        if let Err(e) = self.avatars.retire(filename).await {
            warn!(avatar = %filename, error = %e, "failed to queue avatar for cleanup");
        }
    }

    pub async fn profile(&self, uid: ActorId) -> Result<User, DomainError> {
        self.users
            .find_by_id(uid)
            .await?
            .ok_or_else(|| DomainError::TargetNotFound(format!("user {uid}")))
    }

    /// Resolves a bearer token to its claims if it verifies and is still live.
    pub async fn authenticate(&self, token: &str) -> Result<BearerClaims, DomainError> {
        let claims = self.issuer.verify(token).map_err(|e| {
            debug!(error = %e, "bearer token rejected");
            DomainError::Unauthorized
        })?;
        if !self.tokens.contains(claims.uid, token).await.map_err(infra)? {
            return Err(DomainError::Unauthorized);
        }
        Ok(claims)
    }

    /// Drops expired or unverifiable tokens from every token list.
    pub async fn sweep_tokens(&self) -> Result<u64, DomainError> {
        let mut removed = 0;
        for uid in self.tokens.owners().await.map_err(infra)? {
            for token in self.tokens.tokens(uid).await.map_err(infra)? {
                match self.issuer.verify(&token) {
                    Ok(_) => {}
                    Err(TokenError::Expired) => {
                        if self.tokens.remove(uid, &token).await.map_err(infra)? {
                            removed += 1;
                        }
                    }
                    Err(TokenError::Invalid(reason)) => {
                        warn!(uid, reason = %reason, "dropping unverifiable token");
                        if self.tokens.remove(uid, &token).await.map_err(infra)? {
                            removed += 1;
                        }
                    }
                }
            }
        }
        Ok(removed)
    }
}
