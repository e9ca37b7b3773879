use diesel::prelude::*;
use log::info;
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};
use rocket::response::status::Created;
use rocket::serde::json::{Json, Value};
use rocket::{get, post};

use crate::db::DbConnection;
use crate::types::{ApiError, ApiResult, Validate, ValidationError};
use crate::utils::next_target;

pub mod models;
mod utils;

pub use self::models::User;
use self::utils::*;

/// Guard for login-only routes: `Err` carries the redirect to the login page.
/// Handlers list it before `DbConnection`, since resolving the user borrows a
/// pooled connection of its own and returns it before the handler's is taken.
pub type CurrentUser = Result<User, ApiError>;

#[derive(Debug, Deserialize)]
struct RegistrationDetails {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    username: String,
    #[serde(default)]
    email: String,
    password1: String,
    password2: String,
}

#[derive(Debug, Deserialize)]
pub struct Registration {
    user: RegistrationDetails,
}

impl Validate for Registration {
    type Error = ApiError;
    fn validate(self, connection: &mut SqliteConnection) -> Result<Self, Self::Error> {
        let mut errors = ValidationError::default();

        match validate_username(&self.user.username, connection) {
            Ok(_) => {}
            Err(ApiError::Validation(e)) => errors.merge(e),
            Err(other) => return Err(other),
        }

        if let Err(e) = validate_email_re(&self.user.email) {
            errors.merge(e);
        }

        if let Err(e) = validate_password(&self.user.password1, &self.user.password2) {
            errors.merge(e);
        }

        if errors.empty() {
            Ok(self)
        } else {
            Err(errors.into())
        }
    }
}

#[post("/signup", format = "json", data = "<registration>")]
pub fn signup(mut connection: DbConnection, registration: Json<Registration>) -> Result<Created<Json<Value>>, ApiError> {
    let registration = registration.validate(&mut connection)?.into_inner().user;
    let new_user = models::NewUser {
        username: registration.username,
        first_name: registration.first_name,
        last_name: registration.last_name,
        email: registration.email,
        password: User::make_password(&registration.password1)?,
    };

    let user = new_user.insert(&mut connection)?;
    info!("registered user {}", user.username);
    let token = user.token()?;
    let body = json!({ "user": user, "token": token });
    Ok(Created::new(format!("/profile/{}/", user.username)).body(Json(body)))
}

#[derive(Debug, Deserialize)]
struct LoginDetails {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct Login {
    user: LoginDetails,
}

#[get("/login?<next>")]
pub fn login_form(next: Option<String>) -> Json<Value> {
    Json(json!({ "login": { "next": next.unwrap_or_else(|| "/".to_string()) } }))
}

#[post("/login", format = "json", data = "<login>")]
pub fn login(mut connection: DbConnection, login: Json<Login>) -> ApiResult<Value> {
    use crate::db::schema::users::dsl::*;

    let user = users
        .filter(username.eq(&login.user.username))
        .first::<User>(&mut *connection)
        .optional()?;
    match user {
        Some(user) if user.verify_password(&login.user.password) => {
            let token = user.token()?;
            Ok(Json(json!({ "user": user, "token": token })))
        }
        _ => Err(ValidationError::from(
            "__all__",
            "Please enter a correct username and password.",
        )
        .into()),
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = ApiError;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let login_required = || ApiError::LoginRequired(next_target(request.uri()));
        let token = match request.headers().get_one("Authorization") {
            Some(header) => header.trim_start_matches("Token ").trim().to_string(),
            None => return Outcome::Error((Status::Unauthorized, login_required())),
        };

        let mut connection = match DbConnection::from_request(request).await {
            Outcome::Success(connection) => connection,
            _ => return Outcome::Error((Status::ServiceUnavailable, ApiError::Internal)),
        };
        match User::load_from_token(&token, &mut connection) {
            Ok(user) => Outcome::Success(user),
            Err(ApiError::Validation(_)) => Outcome::Error((Status::Unauthorized, login_required())),
            Err(e) => Outcome::Error((Status::ServiceUnavailable, e)),
        }
    }
}
