use std::sync::Arc;

use actix_web::web;

use crate::{
    config::Config,
    db::Db,
    handlers::{auth, bootcamps, courses, reviews, users},
    services::{geocoder::Geocoder, mailer::Mailer},
};

/// Shared per-process state handed to every handler.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub mailer: Arc<dyn Mailer>,
    pub geocoder: Arc<dyn Geocoder>,
}

/// Registers every route under `/api/v1`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(
                web::scope("/auth")
                    .service(auth::register)
                    .service(auth::login)
                    .service(auth::logout)
                    .service(auth::me)
                    .service(auth::update_details)
                    .service(auth::update_password)
                    .service(auth::forgot_password)
                    .service(auth::reset_password),
            )
            .service(
                web::scope("/users")
                    .service(users::get_users)
                    .service(users::create_user)
                    .service(users::get_user)
                    .service(users::update_user)
                    .service(users::delete_user),
            )
            .service(bootcamps::get_bootcamps_in_radius)
            .service(bootcamps::get_bootcamps)
            .service(bootcamps::create_bootcamp)
            .service(bootcamps::get_bootcamp)
            .service(bootcamps::update_bootcamp)
            .service(bootcamps::delete_bootcamp)
            .service(bootcamps::upload_bootcamp_photo)
            .service(courses::get_courses)
            .service(courses::get_bootcamp_courses)
            .service(courses::get_course)
            .service(courses::add_course)
            .service(courses::update_course)
            .service(courses::delete_course)
            .service(reviews::get_reviews)
            .service(reviews::get_bootcamp_reviews)
            .service(reviews::get_review)
            .service(reviews::add_review)
            .service(reviews::update_review)
            .service(reviews::delete_review),
    );
}
