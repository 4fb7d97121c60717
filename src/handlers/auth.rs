use actix_web::{get, post, put, web, HttpMessage, HttpRequest, HttpResponse};
use mongodb::bson::{doc, to_document, DateTime};
use serde_json::json;
use validator::Validate;

use crate::{
    app::AppState,
    db::json::render,
    error::AppError,
    handlers::{clear_token_cookie, ok, token_response},
    middleware::{auth::require_auth, Sanitized},
    models::user::{
        CreateUserDto, ForgotPasswordDto, LoginDto, ResetPasswordDto, UpdateDetailsDto,
        UpdatePasswordDto, User,
    },
    services::{
        mailer::Email,
        token::{hash_reset_token, ResetToken},
    },
};

#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    body: Sanitized<CreateUserDto>,
) -> Result<HttpResponse, AppError> {
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
    log::info!("Registered user {} as {}", user.id, user.role);

    token_response(&state, &user)
}

#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    body: Sanitized<LoginDto>,
) -> Result<HttpResponse, AppError> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest(
            "Please provide an email and password".into(),
        ));
    }

    let invalid = || AppError::Unauthorized("Invalid credentials".into());
    let user = state
        .db
        .find_one::<User>(doc! { "email": &email })
        .await?
        .ok_or_else(invalid)?;

    if !user.password_matches(&body.password)? {
        return Err(invalid());
    }

    token_response(&state, &user)
}

#[get("/logout")]
pub async fn logout(req: HttpRequest) -> Result<HttpResponse, AppError> {
    require_auth(&req.extensions())?;

    Ok(HttpResponse::Ok()
        .cookie(clear_token_cookie())
        .json(json!({ "success": true, "data": {} })))
}

#[get("/me")]
pub async fn me(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let auth_user = require_auth(&req.extensions())?;

    let user = state
        .db
        .find_by_id::<User>(&auth_user.id)
        .await?
        .ok_or_else(AppError::not_authorized)?;

    Ok(ok(render(&user)?))
}

#[put("/updatedetails")]
pub async fn update_details(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: Sanitized<UpdateDetailsDto>,
) -> Result<HttpResponse, AppError> {
    let auth_user = require_auth(&req.extensions())?;
    let mut dto = body.into_inner();
    dto.validate()?;
    dto.email = dto.email.map(|email| email.trim().to_lowercase());

    let user = state
        .db
        .set_fields::<User>(&auth_user.id, to_document(&dto)?)
        .await?
        .ok_or_else(AppError::not_authorized)?;

    Ok(ok(render(&user)?))
}

#[put("/updatepassword")]
pub async fn update_password(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: Sanitized<UpdatePasswordDto>,
) -> Result<HttpResponse, AppError> {
    let auth_user = require_auth(&req.extensions())?;
    let dto = body.into_inner();

    let user = state
        .db
        .find_by_id::<User>(&auth_user.id)
        .await?
        .ok_or_else(AppError::not_authorized)?;

    if !user.password_matches(&dto.current_password)? {
        return Err(AppError::Unauthorized("Password is incorrect.".into()));
    }
    dto.validate()?;

    let password = User::hash_password(&dto.new_password)?;
    let user = state
        .db
        .set_fields::<User>(&user.id, doc! { "password": password })
        .await?
        .ok_or_else(AppError::not_authorized)?;

    token_response(&state, &user)
}

#[post("/forgotpassword")]
pub async fn forgot_password(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: Sanitized<ForgotPasswordDto>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let email = body.email.trim().to_lowercase();

    let user = state
        .db
        .find_one::<User>(doc! { "email": &email })
        .await?
        .ok_or_else(|| AppError::NotFound("There is no user with that email.".into()))?;

    let token = ResetToken::generate();
    state
        .db
        .set_fields::<User>(
            &user.id,
            doc! {
                "resetPasswordToken": &token.hashed,
                "resetPasswordExpire": token.expires,
            },
        )
        .await?;

    let reset_url = {
        let connection = req.connection_info();
        format!(
            "{}://{}/api/v1/auth/resetpassword/{}",
            connection.scheme(),
            connection.host(),
            token.raw
        )
    };
    let email = Email {
        to: user.email.clone(),
        subject: "Password reset token".into(),
        text: format!(
            "You are receiving this email because you (or someone else) has requested the reset of a password. \
             Please make a PUT request to: \n\n {reset_url}"
        ),
    };

    if let Err(err) = state.mailer.send(email).await {
        log::error!("Password reset email to {} failed: {}", user.email, err);
        state
            .db
            .update_by_id::<User>(
                &user.id,
                doc! { "$unset": { "resetPasswordToken": "", "resetPasswordExpire": "" } },
            )
            .await?;
        return Err(AppError::Internal("Email could not be sent".into()));
    }

    Ok(ok(json!("Email sent")))
}

#[put("/resetpassword/{resettoken}")]
pub async fn reset_password(
    path: web::Path<String>,
    state: web::Data<AppState>,
    body: Sanitized<ResetPasswordDto>,
) -> Result<HttpResponse, AppError> {
    let hashed = hash_reset_token(path.trim());

    let user = state
        .db
        .find_one::<User>(doc! {
            "resetPasswordToken": hashed,
            "resetPasswordExpire": { "$gt": DateTime::now() },
        })
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid token".into()))?;

    body.validate()?;
    let password = User::hash_password(&body.password)?;
    let user = state
        .db
        .update_by_id::<User>(
            &user.id,
            doc! {
                "$set": { "password": password },
                "$unset": { "resetPasswordToken": "", "resetPasswordExpire": "" },
            },
        )
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid token".into()))?;

    token_response(&state, &user)
}
