use actix_web::{delete, get, post, put, web, HttpMessage, HttpRequest, HttpResponse};
use mongodb::bson::to_document;
use validator::Validate;

use crate::{
    app::AppState,
    db::{json::render, parse_id},
    error::AppError,
    handlers::{created, deleted, ok},
    middleware::{
        auth::{authorize, require_auth, AuthenticatedUser},
        Sanitized,
    },
    models::user::{AdminCreateUserDto, AdminUpdateUserDto, User, UserRole},
    query::{advanced_results, ListQuery},
};

fn require_admin(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let user = require_auth(&req.extensions())?;
    authorize(&user, &[UserRole::Admin])?;
    Ok(user)
}

fn user_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("User with id {id} not found."))
}

#[get("")]
pub async fn get_users(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require_admin(&req)?;
    let query = ListQuery::parse(req.query_string());
    let results = advanced_results::<User>(&state.db, &query, &[]).await?;
    Ok(HttpResponse::Ok().json(results))
}

#[get("/{id}")]
pub async fn get_user(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require_admin(&req)?;
    let id = path.into_inner();
    let user = state
        .db
        .find_by_id::<User>(&parse_id(&id)?)
        .await?
        .ok_or_else(|| user_not_found(&id))?;
    Ok(ok(render(&user)?))
}

#[post("")]
pub async fn create_user(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: Sanitized<AdminCreateUserDto>,
) -> Result<HttpResponse, AppError> {
    let admin = require_admin(&req)?;
    let dto = body.into_inner();
    dto.validate()?;

    let password = User::hash_password(&dto.password)?;
    let user = User::new(
        dto.name.trim().to_string(),
        dto.email.trim().to_lowercase(),
        dto.role.unwrap_or_default(),
        password,
    );
    state.db.insert(&user).await?;
    log::info!("Admin {} created user {} as {}", admin.id, user.id, user.role);

    Ok(created(render(&user)?))
}

#[put("/{id}")]
pub async fn update_user(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
    body: Sanitized<AdminUpdateUserDto>,
) -> Result<HttpResponse, AppError> {
    require_admin(&req)?;
    let mut dto = body.into_inner();
    if dto.password.is_some() {
        return Err(AppError::Forbidden("Admins cannot update user passwords.".into()));
    }
    dto.validate()?;
    dto.email = dto.email.map(|email| email.trim().to_lowercase());

    let id = path.into_inner();
    let user = state
        .db
        .set_fields::<User>(&parse_id(&id)?, to_document(&dto)?)
        .await?
        .ok_or_else(|| user_not_found(&id))?;
    Ok(ok(render(&user)?))
}

#[delete("/{id}")]
pub async fn delete_user(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require_admin(&req)?;
    let id = path.into_inner();
    if !state.db.delete_by_id::<User>(&parse_id(&id)?).await? {
        return Err(user_not_found(&id));
    }
    Ok(deleted())
}
