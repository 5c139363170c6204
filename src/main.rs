use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod auth;
mod config;
mod db;
mod entities;
mod error;
mod models;
mod services;

use config::Config;
use db::create_mysql_pool;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().expect("Failed to load configuration");

    log::info!(
        "Starting server on {}:{}",
        config.server.host,
        config.server.port
    );
    let mysql_pool = create_mysql_pool(&config)
        .await
        .expect("Failed to create MySQL pool");

    log::info!("Database connection established");

    let openapi = api::ApiDoc::openapi();
    let pool_data = web::Data::new(mysql_pool);

    let server_host = config.server.host.clone();
    let server_port = config.server.port;
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(web::Data::new(config.clone()))
            .app_data(pool_data.clone())
            .route(
                "/api/docs",
                web::get().to(|| async {
                    actix_web::HttpResponse::PermanentRedirect()
                        .append_header(("Location", "/api/docs/"))
                        .finish()
                }),
            )
            .service(
                SwaggerUi::new("/api/docs/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
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
                            .route(
                                "/{id}/shopping_cart",
                                web::post().to(api::recipes::add_to_cart),
                            )
                            .route(
                                "/{id}/shopping_cart",
                                web::delete().to(api::recipes::remove_from_cart),
                            )
                            .route("/{id}", web::get().to(api::recipes::retrieve_recipe))
                            .route("/{id}", web::patch().to(api::recipes::update_recipe))
                            .route("/{id}", web::delete().to(api::recipes::delete_recipe)),
                    )
                    .service(
                        web::scope("/tags")
                            .route("", web::get().to(api::catalog::list_tags))
                            .route("/{id}", web::get().to(api::catalog::retrieve_tag)),
                    )
                    .service(
                        web::scope("/ingredients")
                            .route("", web::get().to(api::catalog::list_ingredients))
                            .route("/{id}", web::get().to(api::catalog::retrieve_ingredient)),
                    ),
            )
    })
    .bind(format!("{}:{}", server_host, server_port))?
    .run()
    .await
}
