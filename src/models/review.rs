use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::{FieldKind, Model, Owned};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub text: String,
    pub rating: i32,
    pub bootcamp: ObjectId,
    pub user: ObjectId,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Review {
    pub fn new(dto: CreateReviewDto, bootcamp: ObjectId, user: ObjectId) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            title: dto.title.trim().to_string(),
            text: dto.text,
            rating: dto.rating,
            bootcamp,
            user,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Model for Review {
    const COLLECTION: &'static str = "reviews";
    const FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("rating", FieldKind::Number),
        ("bootcamp", FieldKind::ObjectId),
        ("user", FieldKind::ObjectId),
    ];

    fn id(&self) -> &ObjectId {
        &self.id
    }
}

impl Owned for Review {
    fn owner(&self) -> &ObjectId {
        &self.user
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewDto {
    #[validate(length(min = 1, max = 100, message = "Please add a title for the review."))]
    pub title: String,
    #[validate(length(min = 1, max = 500, message = "Please add some text."))]
    pub text: String,
    #[validate(range(min = 1, max = 10, message = "Please add a rating between 1 and 10."))]
    pub rating: i32,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct UpdateReviewDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100, message = "Please add a title for the review."))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 500, message = "Please add some text."))]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 10, message = "Please add a rating between 1 and 10."))]
    pub rating: Option<i32>,
}
