use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::select;
use regex::Regex;

use crate::types::{ApiError, ValidationError};

lazy_static! {
    static ref EMAIL_RE: Regex = {
        let pattern = r"\A[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\z";
        Regex::new(pattern).unwrap()
    };
    static ref USERNAME_RE: Regex = Regex::new(r"\A[\w.@+-]+\z").unwrap();
}

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Empty addresses are allowed; anything else must look like one.
pub fn validate_email_re(email: &str) -> Result<(), ValidationError> {
    if !email.is_empty() && !EMAIL_RE.is_match(&email.to_lowercase()) {
        Err(ValidationError::from("email", "Enter a valid email address."))
    } else {
        Ok(())
    }
}

pub fn validate_username_re(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        Err(ValidationError::from("username", "This field is required."))
    } else if username.chars().count() > USERNAME_MAX_LENGTH {
        Err(ValidationError::from(
            "username",
            format!("Ensure this value has at most {} characters.", USERNAME_MAX_LENGTH),
        ))
    } else if !USERNAME_RE.is_match(username) {
        Err(ValidationError::from(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ))
    } else {
        Ok(())
    }
}

pub fn validate_username(username_to_validate: &str, connection: &mut SqliteConnection) -> Result<(), ApiError> {
    use crate::db::schema::users::dsl::*;

    let mut errors = ValidationError::default();
    if let Err(e) = validate_username_re(username_to_validate) {
        errors.merge(e);
    }

    let username_exists = select(exists(users.filter(username.eq(username_to_validate))))
        .get_result::<bool>(connection)?;
    if username_exists {
        errors.add_error("username", "A user with that username already exists.");
    }

    if errors.empty() {
        Ok(())
    } else {
        Err(errors.into())
    }
}

pub fn validate_password(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    let mut errors = ValidationError::default();
    if password != confirmation {
        errors.add_error("password2", "The two password fields didn't match.");
    }
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        errors.add_error(
            "password2",
            format!(
                "This password is too short. It must contain at least {} characters.",
                PASSWORD_MIN_LENGTH
            ),
        );
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        errors.add_error("password2", "This password is entirely numeric.");
    }

    if errors.empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
