#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use actix_web::web;
use async_trait::async_trait;
use chrono::Duration;
use mongodb::{
    bson::{oid::ObjectId, DateTime},
    Database,
};
use tempfile::TempDir;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::mongo::Mongo;

use bootcamp_directory::{
    app::AppState,
    config::Config,
    db::{ensure_indexes, Db, MongoStore},
    error::AppError,
    models::{
        bootcamp::{Bootcamp, Career, CreateBootcampDto, Location},
        course::{Course, CreateCourseDto, MinimumSkill},
        review::{CreateReviewDto, Review},
        user::{User, UserRole},
    },
    services::{
        geocoder::{Geocoder, Place},
        mailer::{Email, Mailer},
        token::sign_token,
    },
};

pub const PASSWORD: &str = "123456";
pub const JWT_SECRET: &str = "integration-secret";
pub const MAX_UPLOAD: usize = 1024;
pub const UNKNOWN_ADDRESS: &str = "Nowhere at all";

/// Builds the service the same way `main` does, minus the outer layers.
#[macro_export]
macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(bootcamp_directory::middleware::Authentication)
                .app_data($ctx.state.clone())
                .configure(bootcamp_directory::app::configure),
        )
        .await
    };
}

pub fn boston() -> Place {
    Place {
        latitude: 42.350846,
        longitude: -71.103834,
        formatted_address: Some("233 Bay State Rd, Boston, MA 02215, US".into()),
        street: Some("233 Bay State Rd".into()),
        city: Some("Boston".into()),
        state: Some("MA".into()),
        zipcode: Some("02215".into()),
        country: Some("US".into()),
    }
}

pub fn los_angeles() -> Place {
    Place {
        latitude: 34.052235,
        longitude: -118.243683,
        city: Some("Los Angeles".into()),
        state: Some("CA".into()),
        zipcode: Some("90012".into()),
        ..Place::default()
    }
}

/// Resolves every address to Boston except [`UNKNOWN_ADDRESS`].
pub struct StubGeocoder;

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Place>, AppError> {
        if address == UNKNOWN_ADDRESS {
            return Ok(None);
        }
        Ok(Some(boston()))
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn fail_next_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Internal("SMTP unavailable".into()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

/// A MongoDB container and a database on it.
///
/// The container is stopped when the returned handle is dropped.
pub async fn start_mongo() -> (ContainerAsync<Mongo>, String, Database) {
    let container = Mongo::default()
        .start()
        .await
        .expect("Failed to start MongoDB container");
    let port = container
        .get_host_port_ipv4(27017)
        .await
        .expect("Failed to get MongoDB port");
    let uri = format!("mongodb://127.0.0.1:{port}");
    let client = mongodb::Client::with_uri_str(&uri)
        .await
        .expect("Failed to connect to MongoDB");
    let database = client.database("devcamper_test");
    (container, uri, database)
}

pub struct TestContext {
    pub state: web::Data<AppState>,
    pub mailer: Arc<RecordingMailer>,
    pub uploads: TempDir,
    _mongo: ContainerAsync<Mongo>,
}

impl TestContext {
    pub async fn new() -> Self {
        let (mongo, uri, database) = start_mongo().await;

        let uploads = tempfile::tempdir().unwrap();
        let upload_path = uploads.path().to_string_lossy().to_string();
        let max_upload = MAX_UPLOAD.to_string();
        let config = Config::from_lookup(|key| match key {
            "DB_CONNECTION" => Some(uri.clone()),
            "DATABASE_NAME" => Some(database.name().to_string()),
            "JWT_SECRET" => Some(JWT_SECRET.to_string()),
            "FILE_UPLOAD_PATH" => Some(upload_path.clone()),
            "MAX_FILE_UPLOAD" => Some(max_upload.clone()),
            _ => None,
        })
        .unwrap();

        let db = Db::new(Arc::new(MongoStore::new(database)));
        ensure_indexes(&db).await.unwrap();

        let mailer = Arc::new(RecordingMailer::default());
        let state = web::Data::new(AppState {
            config,
            db,
            mailer: mailer.clone(),
            geocoder: Arc::new(StubGeocoder),
        });

        Self {
            state,
            mailer,
            uploads,
            _mongo: mongo,
        }
    }

    pub fn db(&self) -> &Db {
        &self.state.db
    }

    pub async fn user(&self, name: &str, role: UserRole) -> User {
        let email = format!("{}@example.com", name.to_lowercase());
        let password = bcrypt::hash(PASSWORD, 4).unwrap();
        let user = User::new(name.to_string(), email, role, password);
        self.db().insert(&user).await.unwrap();
        user
    }

    pub fn token(&self, user: &User) -> String {
        sign_token(&user.id, JWT_SECRET, Duration::days(1)).unwrap()
    }

    pub fn bearer(&self, user: &User) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.token(user)))
    }

    pub async fn bootcamp(&self, owner: &User, name: &str, place: Place) -> Bootcamp {
        let dto = CreateBootcampDto {
            name: name.to_string(),
            description: format!("{name} teaches full stack development"),
            website: Some("https://example.com".into()),
            phone: None,
            email: None,
            address: place.formatted_address.clone().unwrap_or_default(),
            careers: vec![Career::WebDevelopment],
            housing: Some(false),
            job_assistance: Some(true),
            job_guarantee: None,
            accept_gi: None,
        };
        let bootcamp = Bootcamp::new(dto, Some(Location::from(place)), owner.id);
        self.db().insert(&bootcamp).await.unwrap();
        bootcamp
    }

    pub async fn course(&self, bootcamp: &Bootcamp, owner: &User, title: &str, tuition: f64) -> Course {
        let dto = CreateCourseDto {
            title: title.to_string(),
            description: format!("{title} from scratch"),
            weeks: "8".into(),
            tuition,
            minimum_skill: MinimumSkill::Beginner,
            scholarship_available: Some(false),
        };
        let course = Course::new(dto, bootcamp.id, owner.id);
        self.db().insert(&course).await.unwrap();
        course
    }

    pub async fn review(&self, bootcamp: &Bootcamp, author: &User, rating: i32) -> Review {
        let dto = CreateReviewDto {
            title: "Worth it".into(),
            text: "Learned a lot".into(),
            rating,
        };
        let review = Review::new(dto, bootcamp.id, author.id);
        self.db().insert(&review).await.unwrap();
        review
    }

    pub async fn reload_bootcamp(&self, id: &ObjectId) -> Bootcamp {
        self.db().find_by_id::<Bootcamp>(id).await.unwrap().unwrap()
    }

    /// Backdates a record so list ordering is deterministic.
    pub async fn set_created_at<T: bootcamp_directory::db::Model>(&self, id: &ObjectId, millis: i64) {
        self.db()
            .set_fields::<T>(id, mongodb::bson::doc! { "createdAt": DateTime::from_millis(millis) })
            .await
            .unwrap();
    }
}
