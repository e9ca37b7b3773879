use chrono::{NaiveDateTime, SecondsFormat, TimeZone, Utc};
use rocket::http::uri::Origin;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::content::RawJson;
use rocket::response::{self, Responder, Response};
use serde::Serializer;
use serde_json::{self, Value};

pub const LOGIN_PATH: &str = "/auth/login/";

pub fn try_respond(req: &Request<'_>, json: &Value, status: Status) -> response::Result<'static> {
    let as_json = serde_json::to_string(&json);
    match as_json {
        Ok(json) => RawJson(json)
            .respond_to(req)
            .and_then(|resp| Response::build_from(resp).status(status).ok()),

        Err(_) => Err(Status::InternalServerError),
    }
}

pub fn serialize_date<S>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = Utc.from_utc_datetime(date).to_rfc3339_opts(SecondsFormat::Millis, true);
    serializer.serialize_str(&s)
}

/// The path and query a login redirect should send the user back to.
pub fn next_target(uri: &Origin<'_>) -> String {
    match uri.query() {
        Some(query) => format!("{}?{}", uri.path(), query),
        None => uri.path().to_string(),
    }
}

/// Login page URL carrying `next`. Slashes stay readable, the rest of the
/// reserved characters are percent-encoded.
pub fn login_url(next: &str) -> String {
    let mut encoded = String::with_capacity(next.len());
    for byte in next.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' | b'%' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{:02X}", other)),
        }
    }
    format!("{}?next={}", LOGIN_PATH, encoded)
}
