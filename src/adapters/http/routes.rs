use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::adapters::http::state::HttpState;
use crate::application::dto::{
    DetectRequest, DetectResponse, ErrorResponse, HealthResponse, HistoryResponse, UploadResponse,
};
use crate::domain::errors::DomainError;

/// Traduce errores de dominio a códigos HTTP con cuerpo `{"error": ...}`.
fn error_response(err: DomainError) -> Response {
    let (status, message) = match err {
        DomainError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        DomainError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        other => {
            error!("❌ {}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    };
    (status, Json(ErrorResponse { error: message })).into_response()
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse { error: message.into() }),
    )
        .into_response()
}

pub async fn health(State(st): State<HttpState>) -> impl IntoResponse {
    let info = st.detection.model_info();
    let status = &st.backend;
    Json(HealthResponse {
        status: "healthy".into(),
        timestamp: chrono::Local::now().to_rfc3339(),
        model_connected: status.remote_configured || status.local_model_available,
        model_type: "instance_segmentation".into(),
        supported_classes: info.classes,
        use_local_model: status.use_local_model,
        local_model_available: status.use_local_model && status.local_model_available,
        model_path: status.model_path.clone().filter(|_| status.use_local_model),
        backend: st.detection.backend_mode().to_string(),
    })
}

pub async fn upload(State(st): State<HttpState>, mut multipart: Multipart) -> Response {
    let mut file = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return bad_request(format!("multipart inválido: {}", e)),
        };
        if field.name() != Some("image") {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        match field.bytes().await {
            Ok(data) => file = Some((name, data.to_vec())),
            Err(e) => return bad_request(format!("no se pudo leer la imagen: {}", e)),
        }
        break;
    }

    let Some((name, bytes)) = file else {
        return bad_request("没有找到图像文件");
    };

    match st.records.upload(&name, bytes).await {
        Ok(info) => Json(UploadResponse::from(info)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn detect(
    State(st): State<HttpState>,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(body) => body,
        Err(rejection) => return bad_request(format!("JSON inválido: {}", rejection.body_text())),
    };
    match st.detection.detect(req).await {
        Ok(outcome) => Json(DetectResponse::from(outcome)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_result(State(st): State<HttpState>, Path(id): Path<String>) -> Response {
    match st.records.get(&id).await {
        Ok(record) => Json(record).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn history(State(st): State<HttpState>) -> Response {
    match st.records.history().await {
        Ok(history) => Json(HistoryResponse { success: true, history }).into_response(),
        Err(e) => error_response(e),
    }
}
