use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::db::{FieldKind, Model};
use crate::error::AppError;

const PASSWORD_COST: u32 = 10;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_password_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_password_expire: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl User {
    /// Builds a new record around an already hashed password.
    pub fn new(name: String, email: String, role: UserRole, password_hash: String) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            name,
            email,
            role,
            password: password_hash,
            reset_password_token: None,
            reset_password_expire: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn hash_password(plain: &str) -> Result<String, AppError> {
        Ok(bcrypt::hash(plain.as_bytes(), PASSWORD_COST)?)
    }

    pub fn password_matches(&self, plain: &str) -> Result<bool, AppError> {
        Ok(bcrypt::verify(plain, &self.password)?)
    }
}

impl Model for User {
    const COLLECTION: &'static str = "users";
    const HIDDEN: &'static [&'static str] = &["password", "resetPasswordToken", "resetPasswordExpire"];
    const FIELDS: &'static [(&'static str, FieldKind)] = &[("resetPasswordExpire", FieldKind::Date)];

    fn id(&self) -> &ObjectId {
        &self.id
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Publisher,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Publisher => "publisher",
            UserRole::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn self_assignable(role: &UserRole) -> Result<(), ValidationError> {
    if *role == UserRole::Admin {
        let mut error = ValidationError::new("role");
        error.message = Some("`admin` is not a valid role.".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserDto {
    #[validate(length(min = 1, message = "Please enter a name."))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email."))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters."))]
    pub password: String,
    #[validate(custom = "self_assignable")]
    pub role: Option<UserRole>,
}

/// Admin-side user creation; any role may be assigned.
#[derive(Debug, Deserialize, Validate)]
pub struct AdminCreateUserDto {
    #[validate(length(min = 1, message = "Please enter a name."))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email."))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters."))]
    pub password: String,
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct LoginDto {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct UpdateDetailsDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Please enter a name."))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Please enter a valid email."))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct AdminUpdateUserDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Please enter a name."))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Please enter a valid email."))]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    /// Present only so the handler can refuse it.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordDto {
    pub current_password: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters."))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordDto {
    #[validate(email(message = "Please enter a valid email."))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordDto {
    #[validate(length(min = 6, message = "Password must be at least 6 characters."))]
    pub password: String,
}
