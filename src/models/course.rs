use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::{FieldKind, Model, Owned};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    pub weeks: String,
    pub tuition: f64,
    pub minimum_skill: MinimumSkill,
    #[serde(default)]
    pub scholarship_available: bool,
    pub bootcamp: ObjectId,
    pub user: ObjectId,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Course {
    pub fn new(dto: CreateCourseDto, bootcamp: ObjectId, user: ObjectId) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            title: dto.title.trim().to_string(),
            description: dto.description,
            weeks: dto.weeks,
            tuition: dto.tuition,
            minimum_skill: dto.minimum_skill,
            scholarship_available: dto.scholarship_available.unwrap_or(false),
            bootcamp,
            user,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Model for Course {
    const COLLECTION: &'static str = "courses";
    const FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("tuition", FieldKind::Number),
        ("scholarshipAvailable", FieldKind::Bool),
        ("bootcamp", FieldKind::ObjectId),
        ("user", FieldKind::ObjectId),
    ];

    fn id(&self) -> &ObjectId {
        &self.id
    }
}

impl Owned for Course {
    fn owner(&self) -> &ObjectId {
        &self.user
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MinimumSkill {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseDto {
    #[validate(length(min = 1, message = "Please add a course title."))]
    pub title: String,
    #[validate(length(min = 1, message = "Please add a description."))]
    pub description: String,
    #[validate(length(min = 1, message = "Please add number of weeks."))]
    pub weeks: String,
    #[validate(range(min = 0.0, message = "Tuition cost can not be negative."))]
    pub tuition: f64,
    pub minimum_skill: MinimumSkill,
    pub scholarship_available: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Please add a course title."))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Please add a description."))]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Please add number of weeks."))]
    pub weeks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "Tuition cost can not be negative."))]
    pub tuition: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_skill: Option<MinimumSkill>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scholarship_available: Option<bool>,
}
