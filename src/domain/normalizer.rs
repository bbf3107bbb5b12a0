//! Normalización de instancias crudas al registro canónico y generación de
//! recomendaciones a partir de los conteos por categoría.

use tracing::debug;

use super::detection::{Category, RawInstance};
use super::result::{
    BoundingBox, ClassDistribution, ClassLabel, DetectionResult, ResultDetails, SegmentationMask,
    Severity,
};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const MAX_RECOMMENDATIONS: usize = 5;

const HEALTHY_RECOMMENDATIONS: [&str; 2] = ["口腔健康状况良好", "建议定期检查"];

/// Construye el resultado canónico. Las instancias ya llegan filtradas por el
/// adaptador; aquí no se vuelve a aplicar el umbral.
pub fn normalize(
    raw_instances: &[RawInstance],
    confidence_threshold: f32,
    details: ResultDetails,
) -> DetectionResult {
    let total = raw_instances.len();
    debug!(total, confidence_threshold, "normalizando instancias");

    if total == 0 {
        return healthy_result(details);
    }

    let observation_count = count_category(raw_instances, Category::Observation);
    let surgery_count = count_category(raw_instances, Category::Surgery);

    let surgery_ratio = surgery_count as f32 / total as f32;
    let severity = Severity::from_surgery_ratio(surgery_ratio);

    let score_sum: f64 = raw_instances.iter().map(|i| i.score as f64).sum();
    let confidence = (score_sum / total as f64) as f32;

    let mut bounding_boxes = Vec::with_capacity(total);
    let mut segmentation_masks = Vec::new();
    let mut class_labels = Vec::with_capacity(total);

    for (id, inst) in raw_instances.iter().enumerate() {
        bounding_boxes.push(BoundingBox {
            id,
            x1: inst.bbox.x1,
            y1: inst.bbox.y1,
            x2: inst.bbox.x2,
            y2: inst.bbox.y2,
            label: inst.category,
            confidence: inst.score,
            area: inst.area,
        });

        if let Some(mask) = &inst.mask {
            segmentation_masks.push(SegmentationMask {
                id,
                mask: mask.clone(),
                category: inst.category,
                confidence: inst.score,
            });
        }

        class_labels.push(ClassLabel {
            id,
            category: inst.category,
            confidence: inst.score,
        });
    }

    DetectionResult {
        disease_detected: true,
        total_instances: total,
        observation_count,
        surgery_count,
        severity,
        confidence,
        bounding_boxes,
        segmentation_masks,
        class_labels,
        class_distribution: ClassDistribution {
            observation: observation_count,
            surgery: surgery_count,
        },
        recommendations: generate_recommendations(observation_count, surgery_count, severity),
        details,
        visualization_url: None,
        mask_urls: None,
    }
}

/// Tabla literal de recomendaciones; las de cirugía van primero y la lista se
/// corta a cinco entradas.
pub fn generate_recommendations(
    observation_count: usize,
    surgery_count: usize,
    severity: Severity,
) -> Vec<String> {
    let mut recommendations = Vec::with_capacity(9);

    if surgery_count > 0 {
        recommendations.push(format!("检测到{}处需要手术治疗的病变区域", surgery_count));
        recommendations.push("建议尽快就医，进行详细检查".to_string());
        recommendations.push("可能需要考虑手术干预".to_string());
    }

    if observation_count > 0 {
        recommendations.push(format!("检测到{}处需要观察的病变区域", observation_count));
        recommendations.push("建议定期复查，监测病变发展".to_string());
        recommendations.push("注意保持口腔卫生，避免刺激".to_string());
    }

    recommendations.extend(severity_recommendations(severity).iter().map(|s| s.to_string()));
    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}

fn severity_recommendations(severity: Severity) -> &'static [&'static str] {
    match severity {
        Severity::Mild => &[
            "病变程度较轻，可先采取保守治疗",
            "保持良好的口腔卫生习惯",
            "避免刺激性食物和饮料",
        ],
        Severity::Moderate => &[
            "病变已有一定进展，需密切关注",
            "考虑药物治疗控制炎症",
            "每3个月复查一次",
        ],
        Severity::Severe => &[
            "病变严重，可能影响正常功能",
            "建议尽快手术治疗",
            "术后需要规律用药，预防复发",
        ],
        Severity::Normal => &[],
    }
}

fn count_category(instances: &[RawInstance], category: Category) -> usize {
    instances.iter().filter(|i| i.category == category).count()
}

fn healthy_result(details: ResultDetails) -> DetectionResult {
    DetectionResult {
        disease_detected: false,
        total_instances: 0,
        observation_count: 0,
        surgery_count: 0,
        severity: Severity::Normal,
        confidence: 1.0,
        bounding_boxes: Vec::new(),
        segmentation_masks: Vec::new(),
        class_labels: Vec::new(),
        class_distribution: ClassDistribution::default(),
        recommendations: HEALTHY_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect(),
        details,
        visualization_url: None,
        mask_urls: None,
    }
}
