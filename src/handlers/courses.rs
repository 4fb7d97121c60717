use actix_web::{delete, get, post, put, web, HttpMessage, HttpRequest, HttpResponse};
use mongodb::bson::{doc, to_document};
use validator::Validate;

use crate::{
    aggregate::recompute_average_cost,
    app::AppState,
    db::{json::render, json::render_all, parse_id, Model},
    error::AppError,
    handlers::{bootcamps::find_bootcamp, deleted, listed, ok},
    middleware::{
        auth::{authorize, check_existence_ownership, require_auth},
        Sanitized,
    },
    models::{
        bootcamp::Bootcamp,
        course::{Course, CreateCourseDto, UpdateCourseDto},
        user::UserRole,
    },
    query::{advanced_results, find_populated, ListQuery, Populate},
};

const PUBLISHERS: [UserRole; 2] = [UserRole::Publisher, UserRole::Admin];

const BOOTCAMP: Populate = Populate::Reference {
    field: "bootcamp",
    collection: Bootcamp::COLLECTION,
    select: &["name", "description"],
};

fn course_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("No course with the id of {id}"))
}

#[get("/courses")]
pub async fn get_courses(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let query = ListQuery::parse(req.query_string());
    let results = advanced_results::<Course>(&state.db, &query, &[BOOTCAMP]).await?;
    Ok(HttpResponse::Ok().json(results))
}

#[get("/bootcamps/{bootcamp_id}/courses")]
pub async fn get_bootcamp_courses(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let bootcamp = parse_id(&path)?;
    let courses = state.db.find::<Course>(doc! { "bootcamp": bootcamp }).await?;
    Ok(listed(render_all(&courses)?))
}

#[get("/courses/{id}")]
pub async fn get_course(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let course = find_populated::<Course>(&state.db, &parse_id(&id)?, &[BOOTCAMP])
        .await?
        .ok_or_else(|| course_not_found(&id))?;
    Ok(ok(course))
}

#[post("/bootcamps/{bootcamp_id}/courses")]
pub async fn add_course(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
    body: Sanitized<CreateCourseDto>,
) -> Result<HttpResponse, AppError> {
    let user = require_auth(&req.extensions())?;
    authorize(&user, &PUBLISHERS)?;

    let bootcamp = find_bootcamp(&state.db, &path).await?;
    if user.role != UserRole::Admin && bootcamp.user != user.id {
        return Err(AppError::Forbidden(format!(
            "User {} is not authorized to add a course to bootcamp {}",
            user.id, bootcamp.id
        )));
    }

    let dto = body.into_inner();
    dto.validate()?;
    let course = Course::new(dto, bootcamp.id, user.id);
    state.db.insert(&course).await?;
    recompute_average_cost(&state.db, &bootcamp.id).await;

    Ok(ok(render(&course)?))
}

#[put("/courses/{id}")]
pub async fn update_course(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
    body: Sanitized<UpdateCourseDto>,
) -> Result<HttpResponse, AppError> {
    let user = require_auth(&req.extensions())?;
    authorize(&user, &PUBLISHERS)?;
    let id = path.into_inner();
    check_existence_ownership::<Course>(&state.db, &user, &id).await?;

    let mut dto = body.into_inner();
    dto.validate()?;
    dto.title = dto.title.map(|title| title.trim().to_string());

    let course = state
        .db
        .set_fields::<Course>(&parse_id(&id)?, to_document(&dto)?)
        .await?
        .ok_or_else(|| course_not_found(&id))?;
    recompute_average_cost(&state.db, &course.bootcamp).await;

    Ok(ok(render(&course)?))
}

#[delete("/courses/{id}")]
pub async fn delete_course(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = require_auth(&req.extensions())?;
    authorize(&user, &PUBLISHERS)?;
    let id = path.into_inner();

    let course = match check_existence_ownership::<Course>(&state.db, &user, &id).await? {
        Some(course) => course,
        None => state
            .db
            .find_by_id::<Course>(&parse_id(&id)?)
            .await?
            .ok_or_else(|| course_not_found(&id))?,
    };

    state.db.delete_by_id::<Course>(&course.id).await?;
    recompute_average_cost(&state.db, &course.bootcamp).await;

    Ok(deleted())
}
