use std::sync::Arc;

use oral_screening::adapters::{
    http::{
        router,
        state::{BackendStatus, HttpState},
    },
    inference::Backend,
    render::visualization::FsVisualizer,
    storage::{result_store::FsResultStore, upload_store::FsUploadStore},
};
use oral_screening::application::ports::{InferenceMode, InferencePort};
use oral_screening::application::services::{DetectionService, RecordService};
use oral_screening::config::{load_model_config, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Inicializar logs (RUST_LOG=info por defecto)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    config.ensure_dirs()?;

    tracing::info!("🔧 Inicializando adaptadores de infraestructura...");

    // 2. Elegir backend de inferencia una sola vez: local -> remoto -> mock
    let model_config = load_model_config(&config.inference.model_config_path);
    let backend = Arc::new(Backend::select(&config.inference, model_config.clone()));
    let fallback = Arc::new(Backend::mock(model_config));
    tracing::info!("🧠 Backend de inferencia: {}", backend.mode().as_str());

    // 3. Adaptadores de almacenamiento y render
    let uploads = Arc::new(FsUploadStore::new(&config.upload_dir, config.max_file_size));
    let results = Arc::new(FsResultStore::new(&config.results_dir));
    let renderer = Arc::new(FsVisualizer::new(
        &config.segmentation_dir,
        "/segmentation_results",
    ));

    // 4. Servicios (casos de uso)
    let detection = Arc::new(DetectionService::new(
        backend.clone(),
        fallback,
        uploads.clone(),
        results.clone(),
        renderer,
    ));
    let records = Arc::new(RecordService::new(results, uploads, config.history_limit));

    let state = HttpState {
        detection,
        records,
        backend: BackendStatus {
            use_local_model: config.inference.use_local_model,
            local_model_available: backend.mode() == InferenceMode::Local,
            model_path: Some(config.inference.model_path.display().to_string()),
            remote_configured: config.inference.remote_endpoint.is_some(),
        },
    };

    // 5. Router con API y ficheros estáticos
    let app = router(state, &config);

    // 6. Lanzar el servidor
    let addr = config.bind_addr();
    tracing::info!("🚀 Servidor de cribado oral iniciado en http://{}", addr);
    tracing::info!("📂 Subidas en {}", config.upload_dir.display());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("No se pudo escuchar Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("🛑 Apagando servidor");
}
