// src/handlers.rs
use crate::{
    AppState, errors::SeawatchError, export, history, lock, models::*, services::*, session,
};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, error::ErrorInternalServerError, rt, web};
use futures_util::TryStreamExt;
use log::warn;
use serde::Deserialize;

pub async fn get_settings(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.settings.load())
}

pub async fn put_settings(data: web::Data<AppState>, body: web::Json<Settings>) -> HttpResponse {
    let settings = body.into_inner();
    data.settings.save(&settings);
    HttpResponse::Ok().json(settings)
}

pub async fn toggle_all_classes(data: web::Data<AppState>) -> HttpResponse {
    let mut settings = data.settings.load();
    settings.toggle_all();
    data.settings.save(&settings);
    HttpResponse::Ok().json(settings)
}

pub async fn select_file(
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let mut selected = None;

    while let Some(mut field) = payload.try_next().await? {
        let content_disposition = field.content_disposition();
        if content_disposition.get_name() != Some("file") {
            continue;
        }
        let name = content_disposition
            .get_filename()
            .unwrap_or("image")
            .to_string();

        let mut image_data = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            image_data.extend_from_slice(&chunk);
        }

        let content_type = sniff_image(&image_data)?;
        selected = Some(ImageFile {
            name,
            content_type: content_type.to_string(),
            data: image_data.into(),
        });
    }

    let file = selected.ok_or(SeawatchError::NoFileSelected)?;
    let mut session = lock(&data.session);
    session.select_file(file)?;
    Ok(HttpResponse::Ok().json(session.snapshot()))
}

pub async fn run_detection(data: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let classes = data.settings.load().selected_classes;
    let state = data.get_ref().clone();
    // spawned so the run finishes even if the client disconnects
    rt::spawn(async move {
        session::run_pipeline(&state.session, state.api.as_ref(), &classes).await
    })
    .await
    .map_err(ErrorInternalServerError)??;
    Ok(HttpResponse::Ok().json(lock(&data.session).snapshot()))
}

pub async fn reset_session(data: web::Data<AppState>) -> HttpResponse {
    let mut session = lock(&data.session);
    session.reset();
    HttpResponse::Ok().json(session.snapshot())
}

pub async fn get_session(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(lock(&data.session).snapshot())
}

pub async fn export_result(data: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let result = lock(&data.session)
        .result()
        .cloned()
        .ok_or_else(|| SeawatchError::Export("no detection result to save".to_string()))?;

    let path = export::save_result(data.api.as_ref(), &result, &data.export_dir).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "saved_to": path })))
}

#[derive(Deserialize)]
pub struct ExportImageRequest {
    pub url: String,
}

pub async fn export_history_image(
    data: web::Data<AppState>,
    body: web::Json<ExportImageRequest>,
) -> Result<HttpResponse, Error> {
    let path = export::save_history_image(data.api.as_ref(), &body.url, &data.export_dir).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "saved_to": path })))
}

async fn fetch_detached(data: &AppState, fetch: history::PendingFetch) {
    let state = data.clone();
    let task = rt::spawn(async move {
        history::run_fetch(&state.history, state.api.as_ref(), fetch).await
    });
    if let Err(e) = task.await {
        warn!("History fetch task failed: {}", e);
    }
}

fn history_response(data: &AppState) -> HttpResponse {
    let controller = lock(&data.history);
    HttpResponse::Ok().json(serde_json::json!({
        "draft": controller.draft(),
        "applied": controller.applied(),
        "view": controller.view(),
    }))
}

pub async fn get_history(data: web::Data<AppState>) -> HttpResponse {
    history_response(&data)
}

pub async fn put_draft(data: web::Data<AppState>, body: web::Json<FilterState>) -> HttpResponse {
    let filter = body.into_inner();
    lock(&data.history).edit_draft(|draft| *draft = filter);
    history_response(&data)
}

pub async fn apply_filters(data: web::Data<AppState>) -> HttpResponse {
    let fetch = lock(&data.history).apply_draft();
    fetch_detached(&data, fetch).await;
    history_response(&data)
}

pub async fn reset_filters(data: web::Data<AppState>) -> HttpResponse {
    let fetch = lock(&data.history).reset_filters();
    fetch_detached(&data, fetch).await;
    history_response(&data)
}

pub async fn set_page(path: web::Path<usize>, data: web::Data<AppState>) -> HttpResponse {
    lock(&data.history).set_page(path.into_inner());
    history_response(&data)
}
