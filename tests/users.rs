mod common;

use actix_web::{http::StatusCode, test};
use serde_json::{json, Value};

use bootcamp_directory::models::user::{User, UserRole};
use common::{TestContext, PASSWORD};

#[actix_web::test]
async fn only_admins_manage_users() {
    let ctx = TestContext::new().await;
    let app = test_app!(ctx);
    let publisher = ctx.user("Petra", UserRole::Publisher).await;

    let req = test::TestRequest::get().uri("/api/v1/users").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/v1/users")
        .insert_header(ctx.bearer(&publisher))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "User role publisher is not authorized to access this route");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/users/{}", publisher.id))
        .insert_header(ctx.bearer(&publisher))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admin_user_crud() {
    let ctx = TestContext::new().await;
    let app = test_app!(ctx);
    let admin = ctx.user("Admin", UserRole::Admin).await;
    ctx.user("Existing", UserRole::User).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/users")
        .insert_header(ctx.bearer(&admin))
        .set_json(json!({
            "name": "Second Admin",
            "email": "Second@Example.com",
            "password": PASSWORD,
            "role": "admin"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["email"], "second@example.com");
    assert_eq!(body["data"]["role"], "admin");
    assert!(body["data"].get("password").is_none());
    let id = body["data"]["_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/v1/users?sort=name&limit=2")
        .insert_header(ctx.bearer(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"], json!({ "next": { "page": 2, "limit": 2 } }));
    assert_eq!(body["data"][0]["name"], "Admin");
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .all(|user| user.get("password").is_none()));

    let req = test::TestRequest::get()
        .uri("/api/v1/users?select=name,password")
        .insert_header(ctx.bearer(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert!(body["data"][0].get("password").is_none());
    assert!(body["data"][0].get("name").is_some());

    let req = test::TestRequest::get()
        .uri("/api/v1/users?select=-email,-password&limit=10abc")
        .insert_header(ctx.bearer(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    for user in body["data"].as_array().unwrap() {
        assert!(user.get("email").is_none());
        assert!(user.get("password").is_none());
        assert!(user.get("name").is_some());
        assert!(user.get("role").is_some());
    }

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/users/{id}"))
        .insert_header(ctx.bearer(&admin))
        .set_json(json!({ "name": "Demoted", "role": "publisher" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["name"], "Demoted");
    assert_eq!(body["data"]["role"], "publisher");

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/users/{id}"))
        .insert_header(ctx.bearer(&admin))
        .set_json(json!({ "password": "overridden" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Admins cannot update user passwords.");

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/users/{id}"))
        .insert_header(ctx.bearer(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/users/{id}"))
        .insert_header(ctx.bearer(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "success": true, "data": {} }));

    let object_id = mongodb::bson::oid::ObjectId::parse_str(&id).unwrap();
    assert!(ctx.db().find_by_id::<User>(&object_id).await.unwrap().is_none());

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/users/{id}"))
        .insert_header(ctx.bearer(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], format!("User with id {id} not found."));
}

#[actix_web::test]
async fn admin_create_rejects_duplicates_and_bad_input() {
    let ctx = TestContext::new().await;
    let app = test_app!(ctx);
    let admin = ctx.user("Root", UserRole::Admin).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/users")
        .insert_header(ctx.bearer(&admin))
        .set_json(json!({ "name": "Clone", "email": admin.email, "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/api/v1/users")
        .insert_header(ctx.bearer(&admin))
        .set_json(json!({ "name": "Short", "email": "short@example.com", "password": "123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
