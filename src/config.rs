use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use crate::domain::model::ModelConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub results_dir: PathBuf,
    pub segmentation_dir: PathBuf,
    pub max_file_size: usize, // bytes
    pub history_limit: usize,
    pub inference: InferenceSettings,
}

#[derive(Debug, Clone)]
pub struct InferenceSettings {
    pub use_local_model: bool,
    /// Ruta base sin extensión; se le añade `.onnx`, `.pdparams` o `.pth`.
    pub model_path: PathBuf,
    pub model_config_path: PathBuf,
    pub remote_endpoint: Option<String>,
    pub api_key: String,
    pub remote_timeout: Duration,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let use_local_model = env::var("USE_LOCAL_MODEL")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        let model_path =
            env::var("MODEL_PATH").unwrap_or_else(|_| "models/oral_health_model".to_string());
        let model_config_path =
            env::var("MODEL_CONFIG").unwrap_or_else(|_| "models/model_config.json".to_string());

        let remote_endpoint = env::var("BML_MODEL_ENDPOINT")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let api_key = env::var("BML_API_KEY").unwrap_or_default();

        let remote_timeout_secs = env::var("BML_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let max_file_size_mb: usize = env::var("MAX_FILE_SIZE_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);

        let history_limit = env::var("HISTORY_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(50);

        Ok(Self {
            host,
            port,
            upload_dir: env_path("UPLOAD_FOLDER", "uploads"),
            results_dir: env_path("RESULTS_FOLDER", "results"),
            segmentation_dir: env_path("SEGMENTATION_FOLDER", "segmentation_results"),
            max_file_size: max_file_size_mb * 1024 * 1024,
            history_limit,
            inference: InferenceSettings {
                use_local_model,
                model_path: PathBuf::from(model_path),
                model_config_path: PathBuf::from(model_config_path),
                remote_endpoint,
                api_key,
                remote_timeout: Duration::from_secs(remote_timeout_secs),
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.upload_dir, &self.results_dir, &self.segmentation_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("no se pudo crear {}", dir.display()))?;
        }
        Ok(())
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    PathBuf::from(env::var(key).unwrap_or_else(|_| default.to_string()))
}

/// Lee `model_config.json`; si falta o es inválido se usan los valores por defecto.
pub fn load_model_config(path: &Path) -> ModelConfig {
    if !path.exists() {
        info!("Sin {}, usando configuración de modelo por defecto", path.display());
        return ModelConfig::default();
    }
    match std::fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|s| serde_json::from_str::<ModelConfig>(&s).map_err(anyhow::Error::from))
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Error cargando {}: {}", path.display(), e);
            ModelConfig::default()
        }
    }
}
