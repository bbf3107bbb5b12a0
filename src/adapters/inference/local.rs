use anyhow::{bail, Result};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::detection::RawInstance;
use crate::domain::model::{Framework, InferenceParams, ModelConfig};

/// Capacidad mínima de un motor local: imagen -> instancias filtradas en
/// coordenadas de la imagen original.
pub trait LocalRuntime: Send + Sync {
    fn infer(&self, image: &DynamicImage, params: &InferenceParams) -> Result<Vec<RawInstance>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Paddle,
    Onnx,
    Torch,
}

impl EngineKind {
    /// Orden de prueba en modo `auto`.
    pub const AUTO_ORDER: [EngineKind; 3] = [EngineKind::Paddle, EngineKind::Onnx, EngineKind::Torch];

    pub fn name(&self) -> &'static str {
        match self {
            EngineKind::Paddle => "paddle",
            EngineKind::Onnx => "onnx",
            EngineKind::Torch => "torch",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            EngineKind::Paddle => "pdparams",
            EngineKind::Onnx => "onnx",
            EngineKind::Torch => "pth",
        }
    }

    /// `models/oral_health_model` -> `models/oral_health_model.onnx`
    pub fn artifact_path(&self, model_path: &Path) -> PathBuf {
        let mut os = model_path.as_os_str().to_owned();
        os.push(".");
        os.push(self.extension());
        PathBuf::from(os)
    }

    /// Sólo ONNX tiene runtime en Rust en este binario (feature `onnx`).
    pub fn runtime_available(&self) -> bool {
        match self {
            EngineKind::Onnx => cfg!(feature = "onnx"),
            EngineKind::Paddle | EngineKind::Torch => false,
        }
    }

    pub fn candidates(framework: Framework) -> Vec<EngineKind> {
        match framework {
            Framework::Auto => Self::AUTO_ORDER.to_vec(),
            Framework::Paddle => vec![EngineKind::Paddle],
            Framework::Onnx => vec![EngineKind::Onnx],
            Framework::Torch => vec![EngineKind::Torch],
        }
    }
}

#[derive(Clone)]
pub struct LocalEngine {
    pub kind: EngineKind,
    pub runtime: Arc<dyn LocalRuntime>,
}

impl LocalEngine {
    /// Prueba los motores candidatos en orden; devuelve el primero que carga.
    pub fn discover(model_path: &Path, config: &ModelConfig) -> Option<Self> {
        for kind in EngineKind::candidates(config.framework) {
            let artifact = kind.artifact_path(model_path);
            if !artifact.exists() {
                continue;
            }
            if !kind.runtime_available() {
                warn!(
                    "Artefacto {} encontrado pero el runtime {} no está disponible",
                    artifact.display(),
                    kind.name()
                );
                continue;
            }
            match load_runtime(kind, &artifact, config) {
                Ok(runtime) => {
                    info!("✅ Modelo {} cargado desde {}", kind.name(), artifact.display());
                    return Some(Self { kind, runtime });
                }
                Err(e) => warn!("Error cargando modelo {}: {:?}", kind.name(), e),
            }
        }
        None
    }
}

#[cfg(feature = "onnx")]
fn load_runtime(kind: EngineKind, artifact: &Path, config: &ModelConfig) -> Result<Arc<dyn LocalRuntime>> {
    match kind {
        EngineKind::Onnx => Ok(Arc::new(super::onnx_engine::OnnxSegEngine::load(artifact, config)?)),
        other => bail!("sin runtime para {}", other.name()),
    }
}

#[cfg(not(feature = "onnx"))]
fn load_runtime(kind: EngineKind, _artifact: &Path, _config: &ModelConfig) -> Result<Arc<dyn LocalRuntime>> {
    bail!("sin runtime para {}", kind.name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_paths_append_extension() {
        let base = Path::new("models/oral_health_model");
        assert_eq!(
            EngineKind::Onnx.artifact_path(base),
            PathBuf::from("models/oral_health_model.onnx")
        );
        assert_eq!(
            EngineKind::Paddle.artifact_path(base),
            PathBuf::from("models/oral_health_model.pdparams")
        );
    }

    #[test]
    fn named_framework_only_tries_itself() {
        assert_eq!(EngineKind::candidates(Framework::Torch), vec![EngineKind::Torch]);
        assert_eq!(EngineKind::candidates(Framework::Auto).len(), 3);
    }

    #[test]
    fn paddle_artifact_without_runtime_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("model");
        std::fs::write(EngineKind::Paddle.artifact_path(&base), b"weights").unwrap();
        assert!(LocalEngine::discover(&base, &ModelConfig::default()).is_none());
    }

    #[test]
    fn missing_artifacts_yield_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LocalEngine::discover(&dir.path().join("model"), &ModelConfig::default()).is_none());
    }
}
