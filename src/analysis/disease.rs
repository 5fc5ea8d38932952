//! # Plant Disease Detection (mock)
//!
//! Returns one of two canned reports for an uploaded leaf image: a healthy
//! apple leaf when a uniform draw exceeds 0.5, apple scab otherwise.

use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafStatus {
    Healthy,
    Disease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedProduct {
    pub name: &'static str,
    pub image: &'static str,
    pub buy_link: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseReport {
    pub title: &'static str,
    pub description: &'static str,
    pub prevention: &'static str,
    pub status: LeafStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    pub confidence: f64,
    pub is_healthy: bool,
    pub image_url: String,
    pub recommended_product: RecommendedProduct,
}

fn healthy(image_url: String) -> DiseaseReport {
    DiseaseReport {
        title: "Healthy Apple Leaf",
        description: "Great news! Your plant appears to be healthy with no signs of disease. \
            The leaf structure, color, and overall appearance indicate proper growth conditions \
            and good plant health. Continue your current care routine to maintain this excellent \
            condition.",
        prevention: "Maintain consistent watering schedule. Provide adequate sunlight exposure. \
            Use balanced organic fertilizer. Monitor regularly for early detection. Ensure proper \
            air circulation around plants. Keep growing area clean and debris-free.",
        status: LeafStatus::Healthy,
        severity: None,
        confidence: 94.5,
        is_healthy: true,
        image_url,
        recommended_product: RecommendedProduct {
            name: "Organic Growth Fertilizer",
            image: "https://images.unsplash.com/photo-1615671524827-c6481d431a2c?w=400&auto=format&fit=crop",
            buy_link: "https://www.amazon.com/s?k=organic+plant+fertilizer",
            description: "All-natural fertilizer for optimal plant growth",
        },
    }
}

fn apple_scab(image_url: String) -> DiseaseReport {
    DiseaseReport {
        title: "Apple Scab Disease Detected",
        description: "Apple scab is caused by the fungus Venturia inaequalis. It appears as \
            olive-green to dark brown lesions on leaves and fruits. The disease thrives in cool, \
            wet conditions and can significantly reduce fruit quality and yield if left untreated.",
        prevention: "Remove and destroy infected leaves immediately. Apply fungicide at bud break \
            stage. Ensure good air circulation through proper pruning. Avoid overhead watering to \
            reduce leaf wetness. Plant resistant apple varieties when possible. Clean up fallen \
            leaves in autumn.",
        status: LeafStatus::Disease,
        severity: Some(Severity::Medium),
        confidence: 87.3,
        is_healthy: false,
        image_url,
        recommended_product: RecommendedProduct {
            name: "Apple Scab Fungicide",
            image: "https://images.unsplash.com/photo-1589923186741-b7d59d6b2c4a?w=400&auto=format&fit=crop",
            buy_link: "https://www.amazon.com/s?k=apple+scab+fungicide",
            description: "Effective treatment for apple scab disease",
        },
    }
}

/// Pick a report for `image_url`.
pub fn detect<R: Rng>(rng: &mut R, image_url: String) -> DiseaseReport {
    if rng.gen::<f64>() > 0.5 {
        healthy(image_url)
    } else {
        apple_scab(image_url)
    }
}
