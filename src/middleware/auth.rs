use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Extensions, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use mongodb::bson::oid::ObjectId;

use crate::{
    app::AppState,
    db::{parse_id, Db, Owned},
    error::AppError,
    models::user::{User, UserRole},
    services::token::verify_token,
};

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl From<&User> for AuthenticatedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Why a presented bearer token was refused.
#[derive(Debug, Clone)]
pub struct AuthRejection(pub AppError);

/// Identifies the bearer of a request, if any, and records the outcome in
/// the request extensions. Routes decide for themselves whether to require it.
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticationMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticationMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthenticationMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthenticationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let token = bearer_token(&req);
            let state = req.app_data::<web::Data<AppState>>().cloned();

            if let (Some(token), Some(state)) = (token, state) {
                match identify(&state, &token).await {
                    Ok(user) => {
                        req.extensions_mut().insert(user);
                    }
                    Err(err) => {
                        log::debug!("Rejected bearer token: {}", err);
                        req.extensions_mut().insert(AuthRejection(err));
                    }
                }
            }

            service.call(req).await
        })
    }
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_str| auth_str.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

async fn identify(state: &AppState, token: &str) -> Result<AuthenticatedUser, AppError> {
    let claims = verify_token(token, &state.config.jwt_secret)?;
    let id = ObjectId::parse_str(&claims.sub).map_err(|_| AppError::not_authorized())?;

    match state.db.find_by_id::<User>(&id).await? {
        Some(user) => Ok(AuthenticatedUser::from(&user)),
        None => Err(AppError::not_authorized()),
    }
}

pub fn get_current_user(extensions: &Extensions) -> Option<AuthenticatedUser> {
    extensions.get::<AuthenticatedUser>().cloned()
}

/// The authenticated caller, or the reason there is none.
pub fn require_auth(extensions: &Extensions) -> Result<AuthenticatedUser, AppError> {
    if let Some(user) = get_current_user(extensions) {
        return Ok(user);
    }
    match extensions.get::<AuthRejection>() {
        Some(AuthRejection(err)) => Err(err.clone()),
        None => Err(AppError::not_authorized()),
    }
}

pub fn authorize(user: &AuthenticatedUser, roles: &[UserRole]) -> Result<(), AppError> {
    if roles.contains(&user.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "User role {} is not authorized to access this route",
            user.role
        )))
    }
}

/// Loads `id` and checks `user` owns it. Admins skip the check entirely and
/// get `None` back without a lookup.
pub async fn check_existence_ownership<T: Owned>(
    db: &Db,
    user: &AuthenticatedUser,
    id: &str,
) -> Result<Option<T>, AppError> {
    if user.role == UserRole::Admin {
        return Ok(None);
    }

    let not_found = || AppError::NotFound(format!("Resource not found with id of {id}"));
    let object_id = parse_id(id).map_err(|_| not_found())?;
    let record = db.find_by_id::<T>(&object_id).await?.ok_or_else(not_found)?;

    if record.owner() != &user.id {
        return Err(AppError::Forbidden(
            "You don't have permission to modify that resource.".into(),
        ));
    }
    Ok(Some(record))
}
