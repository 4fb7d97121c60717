use std::path::Path;

use actix_multipart::Multipart;
use actix_web::{delete, get, post, put, web, HttpMessage, HttpRequest, HttpResponse};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_document};
use serde_json::json;
use validator::Validate;

use crate::{
    app::AppState,
    db::{json::render, json::render_all, parse_id, Db, Model},
    error::AppError,
    handlers::{created, deleted, listed, ok},
    middleware::{
        auth::{authorize, check_existence_ownership, require_auth, AuthenticatedUser},
        Sanitized,
    },
    models::{
        bootcamp::{Bootcamp, CreateBootcampDto, Location, UpdateBootcampDto},
        course::Course,
        review::Review,
        user::UserRole,
    },
    query::{advanced_results, ListQuery, Populate},
};

const EARTH_RADIUS_MILES: f64 = 3963.0;
const PUBLISHERS: [UserRole; 2] = [UserRole::Publisher, UserRole::Admin];

const COURSES: Populate = Populate::Virtual {
    field: "courses",
    collection: Course::COLLECTION,
    foreign_field: "bootcamp",
};

fn bootcamp_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Bootcamp not found with id of {id}"))
}

/// Ownership-checked bootcamp; admins get it without the owner check.
async fn owned_bootcamp(
    db: &Db,
    user: &AuthenticatedUser,
    id: &str,
) -> Result<Bootcamp, AppError> {
    if let Some(bootcamp) = check_existence_ownership::<Bootcamp>(db, user, id).await? {
        return Ok(bootcamp);
    }
    let object_id = parse_id(id)?;
    db.find_by_id::<Bootcamp>(&object_id)
        .await?
        .ok_or_else(|| bootcamp_not_found(id))
}

#[get("/bootcamps")]
pub async fn get_bootcamps(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let query = ListQuery::parse(req.query_string());
    let results = advanced_results::<Bootcamp>(&state.db, &query, &[COURSES]).await?;
    Ok(HttpResponse::Ok().json(results))
}

#[get("/bootcamps/{id}")]
pub async fn get_bootcamp(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let bootcamp = state
        .db
        .find_by_id::<Bootcamp>(&parse_id(&id)?)
        .await?
        .ok_or_else(|| bootcamp_not_found(&id))?;

    Ok(ok(render(&bootcamp)?))
}

#[post("/bootcamps")]
pub async fn create_bootcamp(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: Sanitized<CreateBootcampDto>,
) -> Result<HttpResponse, AppError> {
    let user = require_auth(&req.extensions())?;
    authorize(&user, &PUBLISHERS)?;
    let dto = body.into_inner();
    dto.validate()?;

    if user.role != UserRole::Admin {
        let published = state
            .db
            .find_one::<Bootcamp>(doc! { "user": user.id })
            .await?;
        if published.is_some() {
            return Err(AppError::Conflict(format!(
                "The user with ID {} has already published a bootcamp",
                user.id
            )));
        }
    }

    let place = state
        .geocoder
        .geocode(&dto.address)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Could not geocode address {}", dto.address)))?;

    let bootcamp = Bootcamp::new(dto, Some(Location::from(place)), user.id);
    state.db.insert(&bootcamp).await?;
    log::info!("User {} created bootcamp {}", user.id, bootcamp.id);

    Ok(created(render(&bootcamp)?))
}

#[put("/bootcamps/{id}")]
pub async fn update_bootcamp(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
    body: Sanitized<UpdateBootcampDto>,
) -> Result<HttpResponse, AppError> {
    let user = require_auth(&req.extensions())?;
    authorize(&user, &PUBLISHERS)?;
    let id = path.into_inner();
    let bootcamp = owned_bootcamp(&state.db, &user, &id).await?;

    let mut dto = body.into_inner();
    dto.validate()?;
    dto.name = dto.name.map(|name| name.trim().to_string());

    let updated = state
        .db
        .set_fields::<Bootcamp>(&bootcamp.id, to_document(&dto)?)
        .await?
        .ok_or_else(|| bootcamp_not_found(&id))?;

    Ok(ok(render(&updated)?))
}

#[delete("/bootcamps/{id}")]
pub async fn delete_bootcamp(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = require_auth(&req.extensions())?;
    authorize(&user, &PUBLISHERS)?;
    let id = path.into_inner();
    let bootcamp = owned_bootcamp(&state.db, &user, &id).await?;

    let courses = state
        .db
        .delete_many::<Course>(doc! { "bootcamp": bootcamp.id })
        .await?;
    let reviews = state
        .db
        .delete_many::<Review>(doc! { "bootcamp": bootcamp.id })
        .await?;
    state.db.delete_by_id::<Bootcamp>(&bootcamp.id).await?;
    log::info!(
        "Deleted bootcamp {} with {} courses and {} reviews",
        bootcamp.id,
        courses,
        reviews
    );

    Ok(deleted())
}

#[get("/bootcamps/radius/{zipcode}/{distance}")]
pub async fn get_bootcamps_in_radius(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (zipcode, distance) = path.into_inner();
    let miles: f64 = distance
        .trim()
        .parse()
        .ok()
        .filter(|miles: &f64| miles.is_finite() && *miles >= 0.0)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid distance {distance}")))?;

    let place = state
        .geocoder
        .geocode(&zipcode)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Could not geocode zipcode {zipcode}")))?;

    let radius = miles / EARTH_RADIUS_MILES;
    let bootcamps = state
        .db
        .find::<Bootcamp>(doc! {
            "location": {
                "$geoWithin": {
                    "$centerSphere": [[place.longitude, place.latitude], radius]
                }
            }
        })
        .await?;

    Ok(listed(render_all(&bootcamps)?))
}

#[put("/bootcamps/{id}/photo")]
pub async fn upload_bootcamp_photo(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let user = require_auth(&req.extensions())?;
    authorize(&user, &PUBLISHERS)?;
    let id = path.into_inner();
    let bootcamp = owned_bootcamp(&state.db, &user, &id).await?;

    let max_size = state.config.max_file_upload;
    let upload = read_image(&mut payload, max_size).await?;

    let file_name = format!("photo_{}{}", bootcamp.id, upload.extension);
    let directory = &state.config.file_upload_path;
    let stored = async {
        tokio::fs::create_dir_all(directory).await?;
        tokio::fs::write(directory.join(&file_name), &upload.bytes).await
    }
    .await;
    stored.map_err(|err| {
        log::error!("Failed to store {}: {}", file_name, err);
        AppError::Internal("Problem with file upload".into())
    })?;

    state
        .db
        .set_fields::<Bootcamp>(&bootcamp.id, doc! { "photo": &file_name })
        .await?;
    log::info!("Stored photo {} for bootcamp {}", file_name, bootcamp.id);

    Ok(ok(json!(file_name)))
}

struct ImageUpload {
    bytes: Vec<u8>,
    extension: String,
}

/// Reads the `file` part, enforcing an image content type and `max_size`.
async fn read_image(payload: &mut Multipart, max_size: usize) -> Result<ImageUpload, AppError> {
    let malformed = |err: actix_multipart::MultipartError| {
        AppError::BadRequest(format!("Malformed upload: {err}"))
    };

    while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
        if field.content_disposition().get_name() != Some("file") {
            continue;
        }

        let is_image = field
            .content_type()
            .map_or(false, |mime| mime.type_().as_str() == "image");
        if !is_image {
            return Err(AppError::BadRequest("Please upload an image file".into()));
        }

        let extension = field
            .content_disposition()
            .get_filename()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(malformed)? {
            bytes.extend_from_slice(&chunk);
            if bytes.len() > max_size {
                return Err(AppError::BadRequest(format!(
                    "Please upload an image less than {max_size}"
                )));
            }
        }
        return Ok(ImageUpload { bytes, extension });
    }

    Err(AppError::BadRequest("Please upload a file".into()))
}

/// Course and review handlers use this to reach the parent bootcamp.
pub(crate) async fn find_bootcamp(db: &Db, id: &str) -> Result<Bootcamp, AppError> {
    let not_found = || AppError::NotFound(format!("No bootcamp with the id of {id}"));
    let object_id = ObjectId::parse_str(id.trim()).map_err(|_| not_found())?;
    db.find_by_id::<Bootcamp>(&object_id)
        .await?
        .ok_or_else(not_found)
}
