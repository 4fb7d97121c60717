use std::{io, sync::Arc};

use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;

use bootcamp_directory::{
    app::{configure, AppState},
    config::{self, Config},
    db::{ensure_indexes, Db, MongoStore},
    middleware::Authentication,
    services::{geocoder::MapQuestGeocoder, mailer::SmtpMailer},
};

fn startup_error(err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(startup_error)?;

    let database = config::init_database(&config)
        .await
        .map_err(startup_error)?;
    let db = Db::new(Arc::new(MongoStore::new(database)));
    ensure_indexes(&db).await.map_err(startup_error)?;

    let mailer = SmtpMailer::new(&config.smtp).map_err(startup_error)?;
    let geocoder = MapQuestGeocoder::new(&config.geocoder);

    // 100 requests per 10 minutes per client IP
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(6)
        .burst_size(100)
        .finish()
        .ok_or_else(|| startup_error("Invalid rate limiter configuration"))?;

    let port = config.port;
    let frontend_url = config.frontend_url.clone();
    let state = web::Data::new(AppState {
        config,
        db,
        mailer: Arc::new(mailer),
        geocoder: Arc::new(geocoder),
    });

    log::info!("Starting server on port {}", port);

    HttpServer::new(move || {
        let cors = match &frontend_url {
            Some(origin) => Cors::default().allowed_origin(origin),
            None => Cors::default().allow_any_origin(),
        }
        .allow_any_method()
        .allow_any_header();

        App::new()
            .wrap(Authentication)
            .wrap(Governor::new(&governor_conf))
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(("127.0.0.1", port))?
    .run()
    .await
}
