use chrono::Duration;
use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::User;
use crate::error::RecipeError;
use crate::schema::{Id, UserRole};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String, role: UserRole, lifetime: Duration) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), RecipeError> {
        if !action.authenticate(self) {
            return Err(RecipeError::Forbidden);
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            username: value.username,
            role: value.role,
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, RecipeError> {
    Hmac::new_from_slice(secret.as_bytes()).map_err(|e| {
        log::error!("Invalid session signing key: {e}");
        RecipeError::Unauthorized
    })
}

pub fn generate_jwt_session(
    user: &User,
    secret: &str,
    lifetime: Duration,
) -> Result<String, RecipeError> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(user.id, user.username.to_owned(), user.role.to_owned(), lifetime);

    claims.sign_with_key(&key).map_err(|e| {
        log::error!("Failed to sign session token: {e}");
        RecipeError::Unauthorized
    })
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, RecipeError> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| RecipeError::Unauthorized)?;

    if session.is_expired() {
        log::debug!("Rejected expired session for {}", session.username);
        return Err(RecipeError::Unauthorized);
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    const SECRET: &str = "test-secret";

    #[fixture]
    fn user() -> User {
        User {
            id: 12,
            email: String::from("cook@example.com"),
            username: String::from("cook"),
            first_name: String::new(),
            last_name: String::new(),
            role: UserRole::Admin,
        }
    }

    #[rstest]
    fn issued_token_identifies_user(user: User) {
        let token = generate_jwt_session(&user, SECRET, Duration::hours(1)).unwrap();
        let session = SessionData::from(verify_jwt_session(&token, SECRET).unwrap());

        assert_eq!(session.user_id, 12);
        assert_eq!(session.username, "cook");
        assert_eq!(session.role, UserRole::Admin);
    }

    #[rstest]
    fn rejects_token_signed_with_other_secret(user: User) {
        let token = generate_jwt_session(&user, "another-secret", Duration::hours(1)).unwrap();

        assert!(matches!(
            verify_jwt_session(&token, SECRET),
            Err(RecipeError::Unauthorized)
        ));
    }

    #[rstest]
    fn rejects_expired_token(user: User) {
        let token = generate_jwt_session(&user, SECRET, Duration::hours(-1)).unwrap();

        assert!(verify_jwt_session(&token, SECRET).is_err());
    }

    #[rstest]
    fn rejects_garbage() {
        assert!(verify_jwt_session("not-a-token", SECRET).is_err());
    }
}
