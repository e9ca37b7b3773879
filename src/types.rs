use diesel::result::Error as DieselError;
use diesel::SqliteConnection;
use log::error;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Redirect, Responder};
use rocket::serde::json::Json;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Error as IoError;

use crate::errors::Error as InfraError;
use crate::utils::{login_url, try_respond};

pub trait Validate
where
    Self: Sized,
{
    type Error;
    fn validate(self, connection: &mut SqliteConnection) -> Result<Self, Self::Error>;
}

#[derive(Debug)]
pub enum ApiError {
    Diesel(DieselError),
    Validation(ValidationError),
    /// A rejected form submission: field errors plus the values to re-render.
    Form(ValidationError, Value),
    /// Anonymous access to a login-only route; holds the `next` target.
    LoginRequired(String),
    /// A body that is not the JSON document the route expects.
    Malformed,
    NotFound,
    Internal,
}

impl From<DieselError> for ApiError {
    fn from(err: DieselError) -> ApiError {
        ApiError::Diesel(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> ApiError {
        ApiError::Validation(err)
    }
}

impl From<IoError> for ApiError {
    fn from(err: IoError) -> ApiError {
        error!("io error: {}", err);
        ApiError::Internal
    }
}

impl From<InfraError> for ApiError {
    fn from(err: InfraError) -> ApiError {
        error!("{}", err);
        ApiError::Internal
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> ApiError {
        error!("serialization failed: {}", err);
        ApiError::Internal
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// What a page handler answers with when it may either redirect or render.
#[derive(rocket::Responder)]
pub enum Reply {
    Redirect(Redirect),
    Page(Json<Value>),
}

impl Reply {
    pub fn redirect(to: String) -> Reply {
        Reply::Redirect(Redirect::found(to))
    }
}

#[derive(Debug, Serialize, Default)]
pub struct ValidationError(HashMap<String, Vec<String>>);

impl ValidationError {
    pub fn add_error<K: Into<String>, V: Into<String>>(&mut self, key: K, val: V) {
        let entry = self.0.entry(key.into()).or_default();
        entry.push(val.into());
    }

    pub fn from<K: Into<String>, V: Into<String>>(key: K, val: V) -> Self {
        let mut error = ValidationError::default();
        error.add_error(key, val);
        error
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn merge(&mut self, other: ValidationError) {
        for (key, errors) in other.0.into_iter() {
            let entry = self.0.entry(key).or_default();
            entry.extend(errors);
        }
    }

    pub fn empty(&self) -> bool {
        self.len() == 0
    }

    pub fn messages(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        match self {
            ApiError::Diesel(error) => match error {
                DieselError::NotFound => Err(Status::NotFound),
                other => {
                    error!("database error: {}", other);
                    Err(Status::InternalServerError)
                }
            },

            ApiError::Validation(error) => {
                let body = json!({ "errors": error });
                try_respond(req, &body, Status::UnprocessableEntity)
            }

            ApiError::Form(error, form) => {
                let body = json!({ "errors": error, "form": form });
                try_respond(req, &body, Status::UnprocessableEntity)
            }

            ApiError::LoginRequired(next) => Redirect::found(login_url(&next)).respond_to(req),

            ApiError::Malformed => {
                let body = json!({ "errors": ["malformed request body"] });
                try_respond(req, &body, Status::UnprocessableEntity)
            }

            ApiError::NotFound => Err(Status::NotFound),

            ApiError::Internal => Err(Status::InternalServerError),
        }
    }
}

impl<T> Validate for Json<T>
where
    T: Validate,
{
    type Error = <T as Validate>::Error;
    fn validate(self, connection: &mut SqliteConnection) -> Result<Self, Self::Error> {
        let inner = self.into_inner();
        let validated = inner.validate(connection)?;
        Ok(Json(validated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_messages_of_both_sides() {
        let mut errors = ValidationError::from("text", "This field is required.");
        let mut other = ValidationError::from("text", "Too short.");
        other.add_error("group", "Select a valid choice.");
        errors.merge(other);

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.messages("text").len(), 2);
        assert_eq!(errors.messages("group"), ["Select a valid choice."]);
        assert!(errors.messages("image").is_empty());
    }
}
