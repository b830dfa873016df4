use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use studygen_server::{
    app_state::AppState, config::Config, handlers, middleware::RequestIdMiddleware,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();
    config.validate_for_production();

    let bind_address = (config.web_server_host.clone(), config.web_server_port);
    let state = Arc::new(AppState::new(config).await.map_err(|e| {
        log::error!("Failed to initialize application state: {}", e);
        std::io::Error::other(e.to_string())
    })?);

    log::info!(
        "Starting HTTP server on {}:{} (model {})",
        bind_address.0,
        bind_address.1,
        state.config.generation_model
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(Arc::clone(&state)))
            .wrap(Cors::permissive())
            .wrap(RequestIdMiddleware)
            .wrap(Logger::new(
                r#"%a "%r" %s %b %{x-request-id}o %T"#,
            ))
            .service(handlers::health_check)
            .service(handlers::health_check_ready)
            .service(handlers::summarize_document)
            .service(handlers::generate_quiz)
            .service(handlers::grade_answer)
            .service(handlers::extract_evidence)
            .service(handlers::translate_document)
    })
    .bind(bind_address)?
    .run()
    .await
}
