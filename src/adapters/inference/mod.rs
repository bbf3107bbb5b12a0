pub mod local;
pub mod mask;
pub mod mock;
#[cfg(feature = "onnx")]
pub mod onnx_engine;
pub mod preprocess;
pub mod remote;

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView};
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::ports::{InferenceMode, InferenceOutcome, InferencePort, Prediction};
use crate::config::InferenceSettings;
use crate::domain::model::{InferenceParams, ModelConfig, ModelInfo};

use self::local::LocalEngine;
use self::mock::{MockEngine, MOCK_MODEL_VERSION};
use self::remote::RemoteEngine;

/// Conjunto cerrado de backends; se elige una sola vez al arrancar.
pub enum Engine {
    Local(LocalEngine),
    Remote(RemoteEngine),
    Mock(MockEngine),
}

/// Backend activo más la configuración de modelo con la que se construyó.
pub struct Backend {
    engine: Engine,
    config: ModelConfig,
}

impl Backend {
    /// Local (paddle/onnx/torch según artefactos y runtimes) -> remoto -> mock.
    pub fn select(settings: &InferenceSettings, config: ModelConfig) -> Self {
        if settings.use_local_model {
            if let Some(local) = LocalEngine::discover(&settings.model_path, &config) {
                return Self::new(Engine::Local(local), config);
            }
            warn!(
                "No hay modelo local utilizable en {}",
                settings.model_path.display()
            );
        }

        if let Some(endpoint) = settings.remote_endpoint.clone() {
            info!("Usando modelo remoto en {}", endpoint);
            let remote = RemoteEngine::new(
                endpoint,
                settings.api_key.clone(),
                settings.remote_timeout,
                &config,
            );
            return Self::new(Engine::Remote(remote), config);
        }

        warn!("⚠️ Sin backend real disponible: se usarán datos simulados");
        Self::mock(config)
    }

    pub fn mock(config: ModelConfig) -> Self {
        Self::new(Engine::Mock(MockEngine::new()), config)
    }

    pub fn new(engine: Engine, config: ModelConfig) -> Self {
        Self { engine, config }
    }

    fn framework_name(&self) -> String {
        match &self.engine {
            Engine::Local(l) => l.kind.name().to_string(),
            Engine::Remote(_) => "remote".to_string(),
            Engine::Mock(_) => "mock".to_string(),
        }
    }

    async fn run(&self, image: Arc<DynamicImage>, params: &InferenceParams) -> anyhow::Result<Prediction> {
        match &self.engine {
            Engine::Local(local) => {
                let runtime = local.runtime.clone();
                let params = *params;
                let instances =
                    tokio::task::spawn_blocking(move || runtime.infer(&image, &params)).await??;
                Ok(Prediction::new(instances))
            }
            Engine::Remote(remote) => remote.infer(image, params).await,
            Engine::Mock(mock) => {
                let (w, h) = image.dimensions();
                Ok(Prediction::new(mock.generate(w, h, params.confidence_threshold)))
            }
        }
    }
}

#[async_trait]
impl InferencePort for Backend {
    async fn predict(&self, image: Arc<DynamicImage>, params: &InferenceParams) -> InferenceOutcome {
        match self.run(image, params).await {
            Ok(prediction) => InferenceOutcome::Success(prediction),
            Err(e) => InferenceOutcome::Failure(format!("{:#}", e)),
        }
    }

    fn mode(&self) -> InferenceMode {
        match self.engine {
            Engine::Local(_) => InferenceMode::Local,
            Engine::Remote(_) => InferenceMode::Remote,
            Engine::Mock(_) => InferenceMode::Mock,
        }
    }

    fn model_version(&self) -> &str {
        match self.engine {
            Engine::Local(_) => "local_v1.0.0",
            Engine::Remote(_) => "v1.0.0",
            Engine::Mock(_) => MOCK_MODEL_VERSION,
        }
    }

    fn describe(&self) -> ModelInfo {
        ModelInfo {
            model_type: self.config.model_type.clone(),
            framework: self.framework_name(),
            classes: self.config.classes.clone(),
            num_classes: self.config.classes.len(),
            input_size: self.config.input_size,
            confidence_threshold: self.config.confidence_threshold,
            nms_threshold: self.config.nms_threshold,
            status: match self.engine {
                Engine::Mock(_) => "mock".into(),
                _ => "loaded".into(),
            },
        }
    }
}
