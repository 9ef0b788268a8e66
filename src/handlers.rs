use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::http::header::ContentType;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use std::sync::Arc;

use crate::classifier::Classifier;
use crate::error::{ApiError, AppError};
use crate::models::{PredictionResponse, PredictionResult};
use crate::preprocess::Preprocessor;
use crate::render::{render_page, PageView};
use crate::storage::UploadStore;

const FILE_FIELD: &str = "file";

/// Shared, read-only state handed to every request.
pub struct AppState {
    pub classifier: Arc<dyn Classifier>,
    pub preprocessor: Preprocessor,
    pub store: UploadStore,
    pub max_upload_bytes: usize,
}

pub fn configure(cfg: &mut web::ServiceConfig, store: &UploadStore) {
    cfg.service(
        web::resource("/")
            .route(web::get().to(index))
            .route(web::post().to(predict_page)),
    )
    .service(web::resource("/predict").route(web::post().to(predict_json)))
    .service(Files::new(store.route(), store.dir()));
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(render_page(&PageView::Form))
}

pub async fn predict_page(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let (prediction, image_url) = analyze_upload(&state, payload).await?;
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(render_page(&PageView::Result {
            prediction: &prediction,
            image_url: &image_url,
        })))
}

pub async fn predict_json(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let (prediction, image_url) = analyze_upload(&state, payload).await?;
    Ok(HttpResponse::Ok().json(PredictionResponse::new(prediction, image_url)))
}

struct Upload {
    filename: String,
    data: Vec<u8>,
}

async fn analyze_upload(
    state: &AppState,
    payload: Multipart,
) -> Result<(PredictionResult, String), AppError> {
    let upload = read_upload(payload, state.max_upload_bytes).await?;
    let Upload { filename, data } = upload;

    let preprocessor = state.preprocessor;
    let (format, input, data) = web::block(move || {
        preprocessor
            .prepare(&data)
            .map(|(format, input)| (format, input, data))
    })
    .await
    .map_err(|e| AppError::Internal(format!("preprocessing cancelled: {}", e)))??;

    let stored = state.store.save(&filename, format, data).await?;

    let classifier = Arc::clone(&state.classifier);
    let probability = web::block(move || classifier.predict(&input))
        .await
        .map_err(|e| AppError::Internal(format!("inference cancelled: {}", e)))??;

    let prediction = PredictionResult::from_probability(probability);
    log::info!(
        "Predicted {} ({:.2}%, p={:.4}) for {}",
        prediction.label,
        prediction.confidence,
        probability,
        stored.path.display()
    );
    Ok((prediction, stored.url))
}

/// Pulls the `file` field out of the form, skipping anything else.
/// `limit` caps the whole body, drained fields included.
async fn read_upload(mut payload: Multipart, limit: usize) -> Result<Upload, AppError> {
    let mut upload = None;
    let mut received = 0usize;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::InvalidUpload(e.to_string()))?;
        let disposition = field.content_disposition();
        let is_file = disposition.get_name() == Some(FILE_FIELD);
        let filename = disposition.get_filename().map(str::to_owned);

        if !is_file || upload.is_some() {
            while let Some(chunk) = field.next().await {
                let chunk = chunk.map_err(|e| AppError::InvalidUpload(e.to_string()))?;
                received = count_bytes(received, chunk.len(), limit)?;
            }
            continue;
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::InvalidUpload(e.to_string()))?;
            received = count_bytes(received, chunk.len(), limit)?;
            data.extend_from_slice(&chunk);
        }
        upload = Some(Upload {
            filename: filename.unwrap_or_default(),
            data,
        });
    }

    let upload = upload
        .ok_or_else(|| AppError::InvalidUpload(format!("missing `{}` field", FILE_FIELD)))?;
    if upload.filename.trim().is_empty() {
        return Err(AppError::InvalidUpload("no file selected".into()));
    }
    if upload.data.is_empty() {
        return Err(AppError::InvalidUpload("uploaded file is empty".into()));
    }
    Ok(upload)
}

fn count_bytes(received: usize, chunk: usize, limit: usize) -> Result<usize, AppError> {
    match received.checked_add(chunk) {
        Some(total) if total <= limit => Ok(total),
        _ => Err(AppError::UploadTooLarge { limit }),
    }
}
