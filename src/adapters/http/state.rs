use std::sync::Arc;
use crate::application::services::{DetectionService, RecordService};

/// Estado compartido para los manejadores HTTP de Axum.
/// Siguiendo la Arquitectura Hexagonal, el estado contiene los servicios (Casos de Uso).
#[derive(Clone)]
pub struct HttpState {
    /// Detección: imagen -> backend -> resultado normalizado.
    pub detection: Arc<DetectionService>,
    /// Subidas, resultados guardados e historial.
    pub records: Arc<RecordService>,
    pub backend: BackendStatus,
}

/// Lo que `/api/health` cuenta sobre el backend elegido al arrancar.
#[derive(Debug, Clone, Default)]
pub struct BackendStatus {
    pub use_local_model: bool,
    pub local_model_available: bool,
    pub model_path: Option<String>,
    pub remote_configured: bool,
}
