use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::db::{FieldKind, Model, Owned};
use crate::services::geocoder::Place;

pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Bootcamp {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub careers: Vec<Career>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_cost: Option<f64>,
    pub photo: String,
    #[serde(default)]
    pub housing: bool,
    #[serde(default)]
    pub job_assistance: bool,
    #[serde(default)]
    pub job_guarantee: bool,
    #[serde(default)]
    pub accept_gi: bool,
    pub user: ObjectId,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Bootcamp {
    pub fn new(dto: CreateBootcampDto, location: Option<Location>, owner: ObjectId) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            name: dto.name.trim().to_string(),
            description: dto.description,
            website: dto.website,
            phone: dto.phone,
            email: dto.email,
            location,
            careers: dto.careers,
            average_rating: None,
            average_cost: None,
            photo: DEFAULT_PHOTO.to_string(),
            housing: dto.housing.unwrap_or(false),
            job_assistance: dto.job_assistance.unwrap_or(false),
            job_guarantee: dto.job_guarantee.unwrap_or(false),
            accept_gi: dto.accept_gi.unwrap_or(false),
            user: owner,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Model for Bootcamp {
    const COLLECTION: &'static str = "bootcamps";
    const FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("averageRating", FieldKind::Number),
        ("averageCost", FieldKind::Number),
        ("housing", FieldKind::Bool),
        ("jobAssistance", FieldKind::Bool),
        ("jobGuarantee", FieldKind::Bool),
        ("acceptGi", FieldKind::Bool),
        ("user", FieldKind::ObjectId),
    ];

    fn id(&self) -> &ObjectId {
        &self.id
    }
}

impl Owned for Bootcamp {
    fn owner(&self) -> &ObjectId {
        &self.user
    }
}

/// GeoJSON point plus the address fields returned by the geocoder.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl From<Place> for Location {
    fn from(place: Place) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: vec![place.longitude, place.latitude],
            formatted_address: place.formatted_address,
            street: place.street,
            city: place.city,
            state: place.state,
            zipcode: place.zipcode,
            country: place.country,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Career {
    #[serde(rename = "Web Development")]
    WebDevelopment,
    #[serde(rename = "Mobile Development")]
    MobileDevelopment,
    #[serde(rename = "UI/UX")]
    UiUx,
    #[serde(rename = "Data Science")]
    DataScience,
    Business,
    Other,
}

fn non_empty_careers(careers: &[Career]) -> Result<(), ValidationError> {
    if careers.is_empty() {
        let mut error = ValidationError::new("careers");
        error.message = Some("Please add at least one career.".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBootcampDto {
    #[validate(length(min = 1, max = 50, message = "Name is required and can not be more than 50 characters."))]
    pub name: String,
    #[validate(length(min = 1, max = 500, message = "Description is required and can not be more than 500 characters."))]
    pub description: String,
    #[validate(url(message = "Please use a valid URL with HTTP or HTTPS."))]
    pub website: Option<String>,
    #[validate(length(max = 20, message = "Phone number can not be longer than 20 characters."))]
    pub phone: Option<String>,
    #[validate(email(message = "Please add a valid email."))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "Please add an address."))]
    pub address: String,
    #[validate(custom = "non_empty_careers")]
    pub careers: Vec<Career>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBootcampDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 50, message = "Name is required and can not be more than 50 characters."))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 500, message = "Description is required and can not be more than 500 characters."))]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url(message = "Please use a valid URL with HTTP or HTTPS."))]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 20, message = "Phone number can not be longer than 20 characters."))]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Please add a valid email."))]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom = "non_empty_careers")]
    pub careers: Option<Vec<Career>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub housing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_assistance: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_guarantee: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_gi: Option<bool>,
}
