mod classifier;
mod config;
mod error;
mod handlers;
mod models;
mod preprocess;
mod render;
mod storage;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use std::io;
use std::sync::Arc;

use classifier::OnnxClassifier;
use config::AppConfig;
use handlers::AppState;
use preprocess::Preprocessor;
use storage::UploadStore;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;
    log::info!("Configuration: {:?}", config);

    std::fs::create_dir_all(&config.upload_dir).map_err(|e| {
        log::error!(
            "Failed to create upload directory {}: {}",
            config.upload_dir.display(),
            e
        );
        e
    })?;

    let preprocessor = Preprocessor::new(config.image_size, config.tensor_layout);
    let classifier = OnnxClassifier::load(&config.model_path, preprocessor.input_shape())
        .map_err(|e| {
            log::error!("Failed to load model at startup: {}", e);
            io::Error::new(io::ErrorKind::Other, e.to_string())
        })?;
    log::info!(
        "Model loaded from {} (input {:?}, {})",
        config.model_path.display(),
        preprocessor.input_shape(),
        config.tensor_layout
    );

    let store = UploadStore::new(&config.upload_dir, &config.upload_route);
    let state = web::Data::new(AppState {
        classifier: Arc::new(classifier),
        preprocessor,
        store: store.clone(),
        max_upload_bytes: config.max_upload_bytes,
    });

    let (host, port) = config.bind_address();
    log::info!("Server running at http://{}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST"])
            .allow_any_header();

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(|cfg| handlers::configure(cfg, &store))
    })
    .bind((host, port))?
    .run()
    .await
}
