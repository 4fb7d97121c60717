pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod reviews;
pub mod users;

use actix_web::{
    cookie::{time, Cookie},
    HttpResponse,
};
use serde_json::{json, Value};

use crate::{app::AppState, error::AppError, models::user::User, services::token::sign_token};

pub const TOKEN_COOKIE: &str = "token";

pub fn ok(data: Value) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "data": data }))
}

pub fn created(data: Value) -> HttpResponse {
    HttpResponse::Created().json(json!({ "success": true, "data": data }))
}

pub fn listed(data: Vec<Value>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "count": data.len(), "data": data }))
}

pub fn deleted() -> HttpResponse {
    ok(json!({}))
}

/// Signs a token for `user`, returning it in the body and an HttpOnly cookie.
pub fn token_response(state: &AppState, user: &User) -> Result<HttpResponse, AppError> {
    let config = &state.config;
    let token = sign_token(&user.id, &config.jwt_secret, config.jwt_expire)?;

    let cookie = Cookie::build(TOKEN_COOKIE, token.clone())
        .path("/")
        .http_only(true)
        .secure(config.is_production())
        .max_age(time::Duration::days(config.jwt_cookie_expire_days))
        .finish();

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(json!({ "success": true, "token": token })))
}

pub fn clear_token_cookie() -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE, "none")
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(10))
        .finish()
}
