mod common;

use actix_web::{http::header, http::StatusCode, test, App};
use common::{bearer, context, login_request, path, register_request, API};
use gr8diy_api::configure;
use serde_json::{json, Value};

const PASSWORD: &str = "password123";

#[actix_web::test]
async fn test_users_me_requires_access_token() {
    let ctx = context();
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(configure(API.to_string())),
    )
    .await;

    let anonymous = test::call_service(
        &app,
        test::TestRequest::get().uri(&path("/users/me")).to_request(),
    )
    .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
    let body: Value = test::read_body_json(anonymous).await;
    assert_eq!(body["error"]["code"], 401);

    test::call_service(&app, register_request("maker@example.com", PASSWORD).to_request()).await;
    let login = test::call_service(&app, login_request("maker@example.com", PASSWORD).to_request()).await;
    let refresh_token = login
        .response()
        .cookies()
        .find(|c| c.name() == "refresh_token")
        .map(|c| c.value().to_string())
        .unwrap();
    let body: Value = test::read_body_json(login).await;
    let access_token = body["access_token"].as_str().unwrap();

    let me = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&path("/users/me"))
            .insert_header(bearer(access_token))
            .to_request(),
    )
    .await;
    assert_eq!(me.status(), StatusCode::OK);
    let body: Value = test::read_body_json(me).await;
    assert_eq!(body["email"], "maker@example.com");
    assert!(body.get("hashed_password").is_none());

    // A refresh token is not an access token
    let wrong_type = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&path("/users/me"))
            .insert_header(bearer(&refresh_token))
            .to_request(),
    )
    .await;
    assert_eq!(wrong_type.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_list_users() {
    let ctx = context();
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(configure(API.to_string())),
    )
    .await;

    for email in ["one@example.com", "two@example.com", "three@example.com"] {
        let resp = test::call_service(&app, register_request(email, PASSWORD).to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
    let login = test::call_service(&app, login_request("one@example.com", PASSWORD).to_request()).await;
    let body: Value = test::read_body_json(login).await;
    let token = body["access_token"].as_str().unwrap().to_string();

    let unauthenticated = test::call_service(
        &app,
        test::TestRequest::get().uri(&path("/users/")).to_request(),
    )
    .await;
    assert_eq!(unauthenticated.status(), StatusCode::UNAUTHORIZED);

    let all = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&path("/users/"))
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(all.status(), StatusCode::OK);
    let users: Vec<Value> = test::read_body_json(all).await;
    assert_eq!(users.len(), 3);
    assert!(users.iter().all(|u| u.get("hashed_password").is_none()));

    let page = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&path("/users/?skip=1&limit=1"))
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    let users: Vec<Value> = test::read_body_json(page).await;
    assert_eq!(users.len(), 1);

    let bad_query = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&path("/users/?limit=many"))
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(bad_query.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn test_update_me() {
    let ctx = context();
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(configure(API.to_string())),
    )
    .await;

    test::call_service(&app, register_request("maker@example.com", PASSWORD).to_request()).await;
    test::call_service(&app, register_request("taken@example.com", PASSWORD).to_request()).await;
    let login = test::call_service(&app, login_request("maker@example.com", PASSWORD).to_request()).await;
    let body: Value = test::read_body_json(login).await;
    let token = body["access_token"].as_str().unwrap().to_string();

    let renamed = test::call_service(
        &app,
        test::TestRequest::patch()
            .uri(&path("/users/me"))
            .insert_header(bearer(&token))
            .set_json(json!({ "full_name": "Renamed Maker", "password": "new-password-1" }))
            .to_request(),
    )
    .await;
    assert_eq!(renamed.status(), StatusCode::OK);
    let body: Value = test::read_body_json(renamed).await;
    assert_eq!(body["full_name"], "Renamed Maker");

    let old_password =
        test::call_service(&app, login_request("maker@example.com", PASSWORD).to_request()).await;
    assert_eq!(old_password.status(), StatusCode::UNAUTHORIZED);
    let new_password = test::call_service(
        &app,
        login_request("maker@example.com", "new-password-1").to_request(),
    )
    .await;
    assert_eq!(new_password.status(), StatusCode::OK);

    let taken = test::call_service(
        &app,
        test::TestRequest::patch()
            .uri(&path("/users/me"))
            .insert_header(bearer(&token))
            .set_json(json!({ "email": "TAKEN@example.com" }))
            .to_request(),
    )
    .await;
    assert_eq!(taken.status(), StatusCode::BAD_REQUEST);

    let weak = test::call_service(
        &app,
        test::TestRequest::patch()
            .uri(&path("/users/me"))
            .insert_header(bearer(&token))
            .set_json(json!({ "password": "short" }))
            .to_request(),
    )
    .await;
    assert_eq!(weak.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn test_deactivate_requires_superuser() {
    let ctx = context();
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(configure(API.to_string())),
    )
    .await;

    test::call_service(&app, register_request("admin@example.com", PASSWORD).to_request()).await;
    test::call_service(&app, register_request("member@example.com", PASSWORD).to_request()).await;
    ctx.users.make_superuser("admin@example.com").await;
    let admin_id = ctx.users.id_of("admin@example.com").await;
    let member_id = ctx.users.id_of("member@example.com").await;

    let login = test::call_service(&app, login_request("member@example.com", PASSWORD).to_request()).await;
    let body: Value = test::read_body_json(login).await;
    let member_token = body["access_token"].as_str().unwrap().to_string();

    let forbidden = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&path(&format!("/users/{}/deactivate", admin_id)))
            .insert_header(bearer(&member_token))
            .to_request(),
    )
    .await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(forbidden).await;
    assert_eq!(body["error"]["message"], "Insufficient permissions");

    let login = test::call_service(&app, login_request("admin@example.com", PASSWORD).to_request()).await;
    let body: Value = test::read_body_json(login).await;
    let admin_token = body["access_token"].as_str().unwrap().to_string();

    let deactivated = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&path(&format!("/users/{}/deactivate", member_id)))
            .insert_header(bearer(&admin_token))
            .to_request(),
    )
    .await;
    assert_eq!(deactivated.status(), StatusCode::OK);
    let body: Value = test::read_body_json(deactivated).await;
    assert_eq!(body["is_active"], false);

    // The member's still-unexpired access token no longer resolves
    let me = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&path("/users/me"))
            .insert_header(bearer(&member_token))
            .to_request(),
    )
    .await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);

    let missing = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&path(&format!("/users/{}/deactivate", uuid::Uuid::new_v4())))
            .insert_header(bearer(&admin_token))
            .to_request(),
    )
    .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_malformed_user_id_uses_error_envelope() {
    let ctx = context();
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(configure(API.to_string())),
    )
    .await;

    test::call_service(&app, register_request("admin@example.com", PASSWORD).to_request()).await;
    ctx.users.make_superuser("admin@example.com").await;
    let login = test::call_service(&app, login_request("admin@example.com", PASSWORD).to_request()).await;
    let body: Value = test::read_body_json(login).await;
    let admin_token = body["access_token"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&path("/users/not-a-uuid/deactivate"))
            .insert_header(bearer(&admin_token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], 404);
    assert_eq!(body["error"]["message"], "Resource not found");
    assert!(!body.to_string().contains("UUID"));
}
