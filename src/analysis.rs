//! # Skin Analysis
//!
//! Uploads a captured face image for classification, looks up product
//! recommendations for the result, and packages both into an interaction that
//! can be saved against a visitor's Bluetooth device.

use crate::client::VisumClient;
use crate::error::ClientError;
use crate::models::{Analysis, InteractionDraft, SkinProfile};
use crate::recommendation::Recommendation;
use crate::registry::SightedDevice;
use chrono::{DateTime, SecondsFormat, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinReport {
    pub profile: SkinProfile,
    pub recommendation: Recommendation,
}

impl SkinReport {
    /// Interaction payload for saving this report against `device`
    pub fn to_draft(&self, device: &SightedDevice, saved_at: DateTime<Utc>) -> InteractionDraft {
        InteractionDraft {
            device: device.to_sighting(),
            analysis: Some(Analysis::from(&self.profile)),
            ingredients: self.recommendation.ingredients.clone(),
            products: self.recommendation.products.clone(),
            recommendations: self.recommendation.description.clone(),
            saved_at: saved_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Classify `image` and fetch matching recommendations
pub async fn analyze(client: &VisumClient, image: Vec<u8>) -> Result<SkinReport, ClientError> {
    let profile = client.image_check(image).await?;
    log::info!(
        "Image classified as {} / {}",
        profile.skin_color,
        profile.texture
    );

    let recommendation = client
        .get_recommendations(&profile.skin_color, &profile.texture)
        .await?;
    if recommendation.is_empty() {
        log::warn!("No recommendations returned for {:?}", profile);
    }

    Ok(SkinReport {
        profile,
        recommendation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;
    use chrono::TimeZone;

    #[test]
    fn test_draft_combines_report_and_device() {
        let report = SkinReport {
            profile: SkinProfile {
                skin_color: "Medium".to_string(),
                texture: "Rough".to_string(),
            },
            recommendation: Recommendation {
                ingredients: vec![Item::new("Urea", None)],
                products: vec![Item::new("Body Balm", Some("Softens".to_string()))],
                links: vec!["https://shop.example/balm".to_string()],
                description: Some("Exfoliate gently".to_string()),
            },
        };
        let device = SightedDevice::new("AA:BB", None, -48, Utc::now());
        let saved_at = Utc.with_ymd_and_hms(2025, 3, 1, 10, 15, 0).unwrap();

        let draft = report.to_draft(&device, saved_at);
        assert_eq!(draft.device.address, "AA:BB");
        assert_eq!(draft.device.rssi, -48);
        assert_eq!(draft.analysis.as_ref().unwrap().color.as_deref(), Some("Medium"));
        assert_eq!(draft.ingredients, report.recommendation.ingredients);
        assert_eq!(draft.products[0].name, "Body Balm");
        assert_eq!(draft.recommendations.as_deref(), Some("Exfoliate gently"));
        assert_eq!(draft.saved_at, "2025-03-01T10:15:00.000Z");
    }
}
