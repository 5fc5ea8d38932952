//! # Sensor Insights
//!
//! Proxies the sensor prediction backend and falls back to fixed fixtures
//! when it is not configured or does not answer. The caller is told which
//! one it got through [`Source`].

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Backend,
    Fallback,
}

#[derive(Debug, Serialize)]
pub struct Insight {
    pub source: Source,
    pub data: Value,
}

/// GET `path` (with `query`) from the prediction backend, or use `fallback`.
pub async fn fetch_or_fallback(
    client: &reqwest::Client,
    config: &AppConfig,
    path: &str,
    query: &[(&str, String)],
    fallback: impl FnOnce() -> Value,
) -> Insight {
    let Some(base) = config.prediction_backend_url.as_deref() else {
        return Insight {
            source: Source::Fallback,
            data: fallback(),
        };
    };

    let url = format!("{}{}", base, path);
    match fetch(client, config, &url, query).await {
        Ok(data) => Insight {
            source: Source::Backend,
            data,
        },
        Err(e) => {
            warn!(url = %url, error = %e, "prediction backend unavailable, serving fallback");
            Insight {
                source: Source::Fallback,
                data: fallback(),
            }
        }
    }
}

async fn fetch(
    client: &reqwest::Client,
    config: &AppConfig,
    url: &str,
    query: &[(&str, String)],
) -> Result<Value, reqwest::Error> {
    client
        .get(url)
        .query(query)
        .timeout(config.prediction_timeout)
        .send()
        .await?
        .error_for_status()?
        .json::<Value>()
        .await
}

// ============================================================================
// Fixtures
// ============================================================================

/// Current reading, stamped with `now`.
pub fn fallback_reading(now: DateTime<Utc>) -> Value {
    json!({
        "ph_value": 6.8,
        "temperature": 25.5,
        "humidity": 65.0,
        "soil_percent": 55.0,
        "mq137_raw": 350.0,
        "rain_status": "No Rain",
        "flame_status": "No Flame",
        "timestamp": now.to_rfc3339()
    })
}

pub fn fallback_alerts() -> Value {
    Value::Array(Vec::new())
}

pub fn fallback_predictions() -> Value {
    json!({
        "predictions": {
            "crop_yield": 0.75,
            "disease_risk": 0.2,
            "water_needs": 0.5,
            "fertilizer_needs": 0.4,
            "pest_risk": 0.3
        },
        "risk_analysis": {
            "overall_risk_score": 25,
            "risk_level": "low",
            "environmental_risks": {
                "temperature_risk": 20,
                "humidity_risk": 15,
                "soil_moisture_risk": 10,
                "ph_risk": 5
            }
        },
        "recommendations": {
            "crop_recommendations": [
                {"crop_name": "Wheat", "suitability_score": 75, "suitability_level": "High", "season": "Rabi"},
                {"crop_name": "Rice", "suitability_score": 65, "suitability_level": "Moderate", "season": "Kharif"}
            ],
            "product_recommendations": {
                "fertilizers": [
                    {"name": "NPK 20-20-20", "brand": "AgroCare", "dosage": "100-150 kg/acre"}
                ]
            },
            "insights": [
                "Optimal conditions for maximum yield detected",
                "Consider reducing irrigation frequency by 20%"
            ]
        },
        "future_predictions": {
            "predicted_yield": [0.75, 0.76, 0.77, 0.78, 0.79, 0.80, 0.81]
        }
    })
}

pub fn fallback_trends(days: u32) -> Value {
    json!({
        "period_days": days,
        "sensor_stats": {
            "temperature": {"average": 26.5, "min": 22, "max": 30, "trend": "stable"},
            "humidity": {"average": 65, "min": 55, "max": 75, "trend": "decreasing"},
            "ph_value": {"average": 6.8, "min": 6.5, "max": 7.0, "trend": "stable"},
            "soil_moisture_percent": {"average": 62, "min": 55, "max": 70, "trend": "increasing"}
        }
    })
}

/// Hourly readings walking back from `now`, at most 20 of them.
pub fn fallback_history(limit: usize, now: DateTime<Utc>) -> Value {
    let points: Vec<Value> = (0..limit.min(20))
        .map(|i| {
            let step = i as f64;
            json!({
                "timestamp": (now - Duration::hours(i as i64)).to_rfc3339(),
                "ph_value": 6.8 + step * 0.01,
                "temperature": 25.5 + step * 0.1,
                "humidity": 65.0 - step * 0.5,
                "soil_percent": 55.0 + step * 0.2,
                "crop_yield": 0.75 + step * 0.01
            })
        })
        .collect();
    Value::Array(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_capped_at_twenty_points() {
        let now = Utc::now();
        let history = fallback_history(100, now);
        let points = history.as_array().unwrap();
        assert_eq!(points.len(), 20);
        assert_eq!(points[0]["timestamp"], now.to_rfc3339());
        assert_eq!(points[1]["timestamp"], (now - Duration::hours(1)).to_rfc3339());

        assert_eq!(fallback_history(5, now).as_array().unwrap().len(), 5);
        assert!(fallback_history(0, now).as_array().unwrap().is_empty());
    }

    #[test]
    fn history_drifts_linearly() {
        let history = fallback_history(3, Utc::now());
        let humidity: Vec<f64> = history
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["humidity"].as_f64().unwrap())
            .collect();
        assert_eq!(humidity, vec![65.0, 64.5, 64.0]);
    }

    #[test]
    fn reading_is_stamped_with_now() {
        let now = Utc::now();
        let reading = fallback_reading(now);
        assert_eq!(reading["timestamp"], now.to_rfc3339());
        assert_eq!(reading["ph_value"], 6.8);
        assert_eq!(reading["mq137_raw"], 350.0);
        assert_eq!(reading["rain_status"], "No Rain");
        assert_eq!(reading["flame_status"], "No Flame");
    }

    #[test]
    fn no_alerts_without_backend() {
        assert_eq!(fallback_alerts(), json!([]));
    }

    #[test]
    fn trends_echo_period() {
        assert_eq!(fallback_trends(14)["period_days"], 14);
    }

    #[tokio::test]
    async fn unconfigured_backend_uses_fallback() {
        let client = reqwest::Client::new();
        let config = AppConfig::default();
        let insight =
            fetch_or_fallback(&client, &config, "/api/predictions", &[], fallback_predictions).await;
        assert_eq!(insight.source, Source::Fallback);
        assert_eq!(insight.data["predictions"]["crop_yield"], 0.75);
    }

    #[tokio::test]
    async fn unreachable_backend_uses_fallback() {
        let client = reqwest::Client::new();
        let config = AppConfig {
            // Port 9 (discard) on loopback refuses connections.
            prediction_backend_url: Some("http://127.0.0.1:9".to_string()),
            prediction_timeout: std::time::Duration::from_millis(500),
            ..AppConfig::default()
        };
        let insight = fetch_or_fallback(&client, &config, "/api/trends", &[], || fallback_trends(7)).await;
        assert_eq!(insight.source, Source::Fallback);
    }
}
