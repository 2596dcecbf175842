// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use log::info;
use std::sync::Arc;

use seawatch::AppState;
use seawatch::config::Config;
use seawatch::handlers::{
    apply_filters, export_history_image, export_result, get_history, get_session, get_settings,
    put_draft, put_settings, reset_filters, reset_session, run_detection, select_file, set_page,
    toggle_all_classes,
};
use seawatch::history;
use seawatch::services::{FileSettingsStore, HttpDetectionApi};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env()?;
    info!(
        "Starting Seawatch console (api {}, storage {})",
        config.api_url, config.storage_url
    );

    let api = Arc::new(HttpDetectionApi::new(config.api_url.clone()));
    let settings = Arc::new(FileSettingsStore::new(config.settings_path.clone()));
    info!("Settings stored in {}", settings.path().display());

    let app_state = AppState::new(&config, api, settings);

    // populate the history table before the first request
    let fetch = seawatch::lock(&app_state.history).refresh();
    history::run_fetch(&app_state.history, app_state.api.as_ref(), fetch).await;

    info!("Starting HTTP server on {}", config.bind_addr);
    let static_dir = config.static_dir.clone();

    HttpServer::new(move || {
        let app = App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .service(
                web::scope("/api/v1")
                    .route("/settings", web::get().to(get_settings))
                    .route("/settings", web::put().to(put_settings))
                    .route("/settings/toggle-all", web::post().to(toggle_all_classes))
                    .route("/session", web::get().to(get_session))
                    .route("/session/file", web::post().to(select_file))
                    .route("/session/run", web::post().to(run_detection))
                    .route("/session/reset", web::post().to(reset_session))
                    .route("/session/export", web::post().to(export_result))
                    .route("/history", web::get().to(get_history))
                    .route("/history/draft", web::put().to(put_draft))
                    .route("/history/apply", web::post().to(apply_filters))
                    .route("/history/reset", web::post().to(reset_filters))
                    .route("/history/page/{page}", web::post().to(set_page))
                    .route("/history/export", web::post().to(export_history_image)),
            )
            .route("/health", web::get().to(health_check));

        match &static_dir {
            Some(dir) => app.service(actix_files::Files::new("/", dir).index_file("index.html")),
            None => app,
        }
    })
    .bind(&config.bind_addr)?
    .run()
    .await?;

    Ok(())
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "seawatch",
        "version": "0.1.0"
    }))
}
