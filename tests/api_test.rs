// Integration tests for the HTTP surface. The sea-orm mock backend stands
// in for MySQL, so these run in CI without a database server.
// Run with: cargo test --test api_test

use actix_web::{http::StatusCode, test, web, App};
use chrono::Utc;
use recipebook::{
    api,
    auth::{create_token, hash_password, Claims},
    config::Config,
    db::DbPool,
    entities::{ingredient, recipe, recipe_ingredient, shopping_cart, user},
};
use sea_orm::{DatabaseBackend, MockDatabase};
use serde_json::json;

fn test_config() -> Config {
    Config::from_env().expect("Failed to load configuration")
}

fn sample_user(id: i64, password: &str) -> user::Model {
    user::Model {
        id,
        email: format!("user{}@example.com", id),
        username: format!("user{}", id),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        password_hash: hash_password(password).unwrap(),
        is_active: true,
        is_staff: false,
        created_at: Utc::now(),
    }
}

fn bearer_token(config: &Config, user: &user::Model) -> String {
    let claims = Claims::new(user.id, user.email.clone(), config.jwt.expiration_hours);
    create_token(&claims, &config.jwt.secret).unwrap()
}

fn create_test_app(
    config: Config,
    pool: DbPool,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(config))
        .app_data(web::Data::new(pool))
        .service(
            web::scope("/api")
                .service(
                    web::scope("/auth")
                        .route("/token/login", web::post().to(api::auth::obtain_token)),
                )
                .service(
                    web::scope("/users")
                        .route("", web::get().to(api::users::list_users))
                        .route("", web::post().to(api::users::register))
                        .route("/me", web::get().to(api::users::me))
                        .route("/subscriptions", web::get().to(api::users::subscriptions))
                        .route("/set_password", web::post().to(api::users::set_password))
                        .route("/{id}/subscribe", web::post().to(api::users::subscribe_user))
                        .route(
                            "/{id}/subscribe",
                            web::delete().to(api::users::unsubscribe_user),
                        )
                        .route("/{id}", web::get().to(api::users::retrieve_user)),
                )
                .service(
                    web::scope("/recipes")
                        .route("", web::get().to(api::recipes::list_recipes))
                        .route("", web::post().to(api::recipes::create_recipe))
                        .route(
                            "/download_shopping_cart",
                            web::get().to(api::recipes::download_shopping_cart),
                        )
                        .route("/{id}/favorite", web::post().to(api::recipes::add_favorite))
                        .route(
                            "/{id}/favorite",
                            web::delete().to(api::recipes::remove_favorite),
                        )
                        .route("/{id}", web::get().to(api::recipes::retrieve_recipe)),
                )
                .service(
                    web::scope("/ingredients")
                        .route("", web::get().to(api::catalog::list_ingredients)),
                ),
        )
}

#[actix_web::test]
async fn test_create_recipe_requires_auth() {
    let pool = MockDatabase::new(DatabaseBackend::MySql).into_connection();
    let app = test::init_service(create_test_app(test_config(), pool)).await;

    let req = test::TestRequest::post()
        .uri("/api/recipes")
        .set_json(json!({
            "tags": [1],
            "ingredients": [{"id": 1, "amount": 5}],
            "name": "Pancakes",
            "text": "Mix and fry",
            "cooking_time": 20,
            "image": "data:image/png;base64,aGVsbG8="
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_login_wrong_password_is_forbidden() {
    let stored = sample_user(1, "right-password");
    let pool = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([vec![stored]])
        .into_connection();
    let app = test::init_service(create_test_app(test_config(), pool)).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/token/login")
        .set_json(json!({"email": "user1@example.com", "password": "wrong-password"}))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_login_inactive_account_is_forbidden() {
    let mut stored = sample_user(1, "right-password");
    stored.is_active = false;
    let pool = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([vec![stored]])
        .into_connection();
    let app = test::init_service(create_test_app(test_config(), pool)).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/token/login")
        .set_json(json!({"email": "user1@example.com", "password": "right-password"}))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_login_unknown_email_is_not_found() {
    let pool = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();
    let app = test::init_service(create_test_app(test_config(), pool)).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/token/login")
        .set_json(json!({"email": "nobody@example.com", "password": "password"}))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_register_duplicate_is_rejected() {
    let stored = sample_user(1, "password");
    let pool = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([vec![stored]])
        .into_connection();
    let app = test::init_service(create_test_app(test_config(), pool)).await;

    let req = test::TestRequest::post()
        .uri("/api/users")
        .set_json(json!({
            "email": "user1@example.com",
            "username": "user1",
            "first_name": "Test",
            "last_name": "User",
            "password": "password"
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_create_recipe_without_tags_is_rejected() {
    let config = test_config();
    let acting = sample_user(1, "password");
    let token = bearer_token(&config, &acting);
    let pool = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([vec![acting]])
        .into_connection();
    let app = test::init_service(create_test_app(config, pool)).await;

    let req = test::TestRequest::post()
        .uri("/api/recipes")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({
            "tags": [],
            "ingredients": [{"id": 1, "amount": 5}],
            "name": "Pancakes",
            "text": "Mix and fry",
            "cooking_time": 20,
            "image": "data:image/png;base64,aGVsbG8="
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_favorite_missing_recipe_is_not_found() {
    let config = test_config();
    let acting = sample_user(1, "password");
    let token = bearer_token(&config, &acting);
    let pool = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([Vec::<recipe::Model>::new()])
        .into_connection();
    let app = test::init_service(create_test_app(config, pool)).await;

    let req = test::TestRequest::post()
        .uri("/api/recipes/999/favorite")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_self_subscribe_is_rejected() {
    let config = test_config();
    let acting = sample_user(1, "password");
    let token = bearer_token(&config, &acting);
    let pool = MockDatabase::new(DatabaseBackend::MySql).into_connection();
    let app = test::init_service(create_test_app(config, pool)).await;

    let req = test::TestRequest::post()
        .uri("/api/users/1/subscribe")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_list_users_huge_page_number_does_not_panic() {
    let pool = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();
    let app = test::init_service(create_test_app(test_config(), pool)).await;

    let req = test::TestRequest::get()
        .uri("/api/users?page=18446744073709551615&limit=20")
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn test_list_ingredients() {
    let rows = vec![
        ingredient::Model {
            id: 1,
            name: "Flour".to_string(),
            measurement_unit: "g".to_string(),
        },
        ingredient::Model {
            id: 2,
            name: "Salt".to_string(),
            measurement_unit: "g".to_string(),
        },
    ];
    let pool = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([rows])
        .into_connection();
    let app = test::init_service(create_test_app(test_config(), pool)).await;

    let req = test::TestRequest::get().uri("/api/ingredients").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["name"], "Flour");
    assert_eq!(body[0]["measurement_unit"], "g");
}

#[actix_web::test]
async fn test_download_shopping_cart_empty() {
    let config = test_config();
    let acting = sample_user(1, "password");
    let token = bearer_token(&config, &acting);
    let pool = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([vec![acting]])
        .append_query_results([Vec::<shopping_cart::Model>::new()])
        .append_query_results([Vec::<recipe_ingredient::Model>::new()])
        .into_connection();
    let app = test::init_service(create_test_app(config, pool)).await;

    let req = test::TestRequest::get()
        .uri("/api/recipes/download_shopping_cart")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp
        .headers()
        .get("Content-Disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(disposition, "attachment; filename=user1_buy_list.txt");

    let body = test::read_body(resp).await;
    let text = std::str::from_utf8(&body).unwrap();
    assert!(text.starts_with("Shopping list for:\n\nTest User\n"));
    assert!(text.ends_with("Generated by Recipebook"));
}
