use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use diesel::prelude::*;
use hmac::{Hmac, Mac};
use jwt::{Header, RegisteredClaims, SignWithKey, Token, VerifyWithKey};
use sha2::Sha256;

use crate::db::schema::{posts, users};
use crate::types::{ApiError, ValidationError};

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Serialize)]
#[diesel(table_name = users)]
pub struct User {
    #[serde(skip_serializing)]
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// Public face of a user on profile pages and feeds.
#[derive(Debug, Serialize)]
pub struct Author {
    pub username: String,
    pub full_name: String,
    pub posts_count: i64,
}

impl User {
    pub fn make_password(password: &str) -> Result<String, ApiError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| ApiError::Internal)
    }

    pub fn verify_password(&self, password_to_verify: &str) -> bool {
        match PasswordHash::new(&self.password) {
            Ok(parsed) => Argon2::default()
                .verify_password(password_to_verify.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    fn signing_key(&self) -> Result<Hmac<Sha256>, ApiError> {
        Hmac::new_from_slice(self.password.as_bytes()).map_err(|_| ApiError::Internal)
    }

    /// Bearer token for this user, signed with the stored password hash.
    pub fn token(&self) -> Result<String, ApiError> {
        let claims = RegisteredClaims {
            issuer: Some(self.username.clone()),
            subject: Some(self.id.to_string()),
            ..Default::default()
        };
        claims
            .sign_with_key(&self.signing_key()?)
            .map_err(|_| ApiError::Internal)
    }

    pub fn load_from_token(jwt_token: &str, connection: &mut SqliteConnection) -> Result<User, ApiError> {
        use crate::db::schema::users::dsl::*;

        let invalid = || ApiError::Validation(ValidationError::from("token", "Invalid jwt token"));
        let parsed: Token<Header, RegisteredClaims, _> =
            Token::parse_unverified(jwt_token).map_err(|_| invalid())?;
        let user_id = parsed
            .claims()
            .subject
            .as_ref()
            .and_then(|sub| sub.parse::<i32>().ok())
            .ok_or_else(invalid)?;

        let user = users
            .find(user_id)
            .first::<User>(connection)
            .optional()?
            .ok_or_else(invalid)?;
        let verified: Result<RegisteredClaims, _> = jwt_token.verify_with_key(&user.signing_key()?);
        match verified {
            Ok(_) => Ok(user),
            Err(_) => Err(invalid()),
        }
    }

    pub fn load_by_name(name: &str, connection: &mut SqliteConnection) -> Result<User, ApiError> {
        use crate::db::schema::users::dsl::*;
        users
            .filter(username.eq(name))
            .get_result::<User>(connection)
            .map_err(|e| e.into())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub fn posts_count(&self, connection: &mut SqliteConnection) -> QueryResult<i64> {
        posts::table
            .filter(posts::author_id.eq(self.id))
            .count()
            .get_result(connection)
    }

    pub fn author(&self, connection: &mut SqliteConnection) -> QueryResult<Author> {
        Ok(Author {
            username: self.username.clone(),
            full_name: self.full_name(),
            posts_count: self.posts_count(connection)?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    pub fn insert(&self, connection: &mut SqliteConnection) -> QueryResult<User> {
        diesel::insert_into(users::table)
            .values(self)
            .get_result::<User>(connection)
    }
}
