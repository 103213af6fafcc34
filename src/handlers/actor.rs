use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::HeaderMap;
use actix_web::{FromRequest, HttpRequest};
use uuid::Uuid;

use crate::domain::order::{Actor, ActorRole};
use crate::errors::AppError;

/// Set by the upstream authentication layer.
pub const ROLE_HEADER: &str = "x-actor-role";
pub const ID_HEADER: &str = "x-actor-id";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Unauthorized(format!("missing {name} header")))
}

pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AppError> {
    let role: ActorRole = header(headers, ROLE_HEADER)?
        .parse()
        .map_err(|_| AppError::Unauthorized("unknown actor role".to_string()))?;
    if role == ActorRole::System {
        return Err(AppError::Unauthorized(
            "system role is not accepted over HTTP".to_string(),
        ));
    }
    let id = Uuid::parse_str(header(headers, ID_HEADER)?)
        .map_err(|_| AppError::Unauthorized("actor id is not a UUID".to_string()))?;
    Ok(Actor::new(id, role))
}

impl FromRequest for Actor {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(actor_from_headers(req.headers()))
    }
}
