use actix_web::{delete, get, post, put, web, HttpMessage, HttpRequest, HttpResponse};
use mongodb::bson::{doc, to_document};
use validator::Validate;

use crate::{
    aggregate::recompute_average_rating,
    app::AppState,
    db::{json::render, json::render_all, parse_id, Model},
    error::AppError,
    handlers::{bootcamps::find_bootcamp, created, deleted, listed, ok},
    middleware::{
        auth::{authorize, check_existence_ownership, require_auth},
        Sanitized,
    },
    models::{
        bootcamp::Bootcamp,
        review::{CreateReviewDto, Review, UpdateReviewDto},
        user::UserRole,
    },
    query::{advanced_results, find_populated, ListQuery, Populate},
};

const REVIEWERS: [UserRole; 2] = [UserRole::User, UserRole::Admin];

const BOOTCAMP: Populate = Populate::Reference {
    field: "bootcamp",
    collection: Bootcamp::COLLECTION,
    select: &["name", "description"],
};

fn review_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("No review found with the id of {id}"))
}

#[get("/reviews")]
pub async fn get_reviews(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let query = ListQuery::parse(req.query_string());
    let results = advanced_results::<Review>(&state.db, &query, &[BOOTCAMP]).await?;
    Ok(HttpResponse::Ok().json(results))
}

#[get("/bootcamps/{bootcamp_id}/reviews")]
pub async fn get_bootcamp_reviews(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let bootcamp = parse_id(&path)?;
    let reviews = state.db.find::<Review>(doc! { "bootcamp": bootcamp }).await?;
    Ok(listed(render_all(&reviews)?))
}

#[get("/reviews/{id}")]
pub async fn get_review(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let review = find_populated::<Review>(&state.db, &parse_id(&id)?, &[BOOTCAMP])
        .await?
        .ok_or_else(|| review_not_found(&id))?;
    Ok(ok(review))
}

#[post("/bootcamps/{bootcamp_id}/reviews")]
pub async fn add_review(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
    body: Sanitized<CreateReviewDto>,
) -> Result<HttpResponse, AppError> {
    let user = require_auth(&req.extensions())?;
    authorize(&user, &REVIEWERS)?;

    let bootcamp = find_bootcamp(&state.db, &path).await?;
    let dto = body.into_inner();
    dto.validate()?;

    // unique (bootcamp, user) index rejects a second review with 409
    let review = Review::new(dto, bootcamp.id, user.id);
    state.db.insert(&review).await?;
    recompute_average_rating(&state.db, &bootcamp.id).await;

    Ok(created(render(&review)?))
}

#[put("/reviews/{id}")]
pub async fn update_review(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
    body: Sanitized<UpdateReviewDto>,
) -> Result<HttpResponse, AppError> {
    let user = require_auth(&req.extensions())?;
    authorize(&user, &REVIEWERS)?;
    let id = path.into_inner();
    check_existence_ownership::<Review>(&state.db, &user, &id).await?;

    let mut dto = body.into_inner();
    dto.validate()?;
    dto.title = dto.title.map(|title| title.trim().to_string());

    let review = state
        .db
        .set_fields::<Review>(&parse_id(&id)?, to_document(&dto)?)
        .await?
        .ok_or_else(|| review_not_found(&id))?;
    recompute_average_rating(&state.db, &review.bootcamp).await;

    Ok(ok(render(&review)?))
}

#[delete("/reviews/{id}")]
pub async fn delete_review(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = require_auth(&req.extensions())?;
    authorize(&user, &REVIEWERS)?;
    let id = path.into_inner();

    let review = match check_existence_ownership::<Review>(&state.db, &user, &id).await? {
        Some(review) => review,
        None => state
            .db
            .find_by_id::<Review>(&parse_id(&id)?)
            .await?
            .ok_or_else(|| review_not_found(&id))?,
    };

    state.db.delete_by_id::<Review>(&review.id).await?;
    recompute_average_rating(&state.db, &review.bootcamp).await;

    Ok(deleted())
}
