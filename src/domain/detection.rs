use serde::{Deserialize, Serialize};

/// Categoría de triaje que el modelo asigna a cada lesión.
/// Se serializa con la etiqueta literal de la clase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "观察")]
    Observation,
    #[serde(rename = "手术")]
    Surgery,
    #[serde(rename = "未知", other)]
    Unknown,
}

impl Category {
    pub const OBSERVATION_LABEL: &'static str = "观察";
    pub const SURGERY_LABEL: &'static str = "手术";
    pub const UNKNOWN_LABEL: &'static str = "未知";

    pub fn label(&self) -> &'static str {
        match self {
            Category::Observation => Self::OBSERVATION_LABEL,
            Category::Surgery => Self::SURGERY_LABEL,
            Category::Unknown => Self::UNKNOWN_LABEL,
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            Self::OBSERVATION_LABEL => Category::Observation,
            Self::SURGERY_LABEL => Category::Surgery,
            _ => Category::Unknown,
        }
    }

    /// Traduce el índice de clase del modelo usando la lista de clases configurada.
    pub fn from_class_index(index: i64, classes: &[String]) -> Self {
        usize::try_from(index)
            .ok()
            .and_then(|i| classes.get(i))
            .map(|l| Self::from_label(l))
            .unwrap_or(Category::Unknown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    /// Ordena las esquinas para que siempre x1 <= x2 y y1 <= y2.
    /// Coordenadas no finitas se tratan como 0.
    pub fn new(xa: f32, ya: f32, xb: f32, yb: f32) -> Self {
        let (xa, ya, xb, yb) = (finite_or_zero(xa), finite_or_zero(ya), finite_or_zero(xb), finite_or_zero(yb));
        Self {
            x1: xa.min(xb),
            y1: ya.min(yb),
            x2: xa.max(xb),
            y2: ya.max(yb),
        }
    }

    pub fn area(&self) -> f32 {
        (self.x2 - self.x1) * (self.y2 - self.y1)
    }
}

// NaN/inf no sobreviven a JSON (se escriben como `null`).
fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Instancia cruda devuelta por cualquier backend de inferencia.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawInstance {
    pub category: Category,
    pub score: f32,
    pub bbox: BBox,
    /// Máscara binaria codificada como PNG en base64.
    pub mask: Option<String>,
    pub area: f32,
}

impl RawInstance {
    pub fn new(category: Category, score: f32, bbox: BBox) -> Self {
        Self {
            category,
            score: finite_or_zero(score).clamp(0.0, 1.0),
            area: bbox.area(),
            bbox,
            mask: None,
        }
    }

    pub fn with_mask(mut self, mask: String) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_area(mut self, area: f32) -> Self {
        self.area = area.max(0.0);
        self
    }
}
