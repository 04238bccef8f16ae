use crate::models::token::Token;
use crate::models::user::User;
use crate::store::FileStore;
use crate::utils::clock::{now_ms, HOUR_MS};
use crate::utils::ids::{random_id, ID_LENGTH};
use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use rand_core::OsRng;

pub const USERS: &str = "users";
pub const TOKENS: &str = "tokens";

pub struct AuthService<'a> {
    store: &'a FileStore,
}

impl<'a> AuthService<'a> {
    pub fn new(store: &'a FileStore) -> Self {
        Self { store }
    }

    pub fn hash_password(password: &str) -> Result<String, &'static str> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| "Failed to hash password")
    }

    pub fn verify_password(password: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Issue a fresh one-hour session token after verifying credentials.
    pub async fn create_token(&self, phone: &str, password: &str) -> Result<Token, &'static str> {
        let user: User = self
            .store
            .read(USERS, phone)
            .await
            .map_err(|_| "Invalid credentials")?;

        if !Self::verify_password(password, &user.hashed_password) {
            return Err("Invalid credentials");
        }

        let token = Token {
            id: random_id(ID_LENGTH),
            phone: phone.to_string(),
            expires: now_ms() + HOUR_MS,
        };
        self.store
            .create(TOKENS, &token.id, &token)
            .await
            .map_err(|_| "Failed to store token")?;

        Ok(token)
    }

    /// A token authorizes a request iff it exists, has not expired, and
    /// belongs to the phone number being acted on.
    pub async fn verify_token(&self, token_id: &str, phone: &str) -> bool {
        match self.store.read::<Token>(TOKENS, token_id).await {
            Ok(token) => token.phone == phone && !token.is_expired(now_ms()),
            Err(_) => false,
        }
    }
}
