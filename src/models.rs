use serde::Serialize;
use std::fmt;

/// Probabilities strictly above this are classified as [`Label::Tumor`].
pub const DECISION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Label {
    Tumor,
    Normal,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Tumor => "Tumor",
            Label::Normal => "Normal",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    pub label: Label,
    /// Percentage for the winning label, two decimals.
    pub confidence: f64,
    pub probability: f64,
}

impl PredictionResult {
    /// Maps the model's tumor probability to a label and confidence.
    ///
    /// `p` is expected in `[0, 1]`; the classifier rejects anything else
    /// before it gets here. A probability of exactly 0.5 is `Normal`.
    pub fn from_probability(p: f64) -> Self {
        let (label, share) = if p > DECISION_THRESHOLD {
            (Label::Tumor, p)
        } else {
            (Label::Normal, 1.0 - p)
        };
        Self {
            label,
            confidence: round2(share * 100.0),
            probability: p,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub label: Label,
    pub confidence: f64,
    pub probability: f64,
    pub image_url: String,
}

impl PredictionResponse {
    pub fn new(result: PredictionResult, image_url: String) -> Self {
        Self {
            label: result.label,
            confidence: result.confidence,
            probability: result.probability,
            image_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confident_tumor() {
        let result = PredictionResult::from_probability(0.93);
        assert_eq!(result.label, Label::Tumor);
        assert_eq!(result.confidence, 93.0);
    }

    #[test]
    fn confident_normal() {
        let result = PredictionResult::from_probability(0.10);
        assert_eq!(result.label, Label::Normal);
        assert_eq!(result.confidence, 90.0);
    }

    #[test]
    fn boundary_is_normal() {
        let result = PredictionResult::from_probability(0.5);
        assert_eq!(result.label, Label::Normal);
        assert_eq!(result.confidence, 50.0);
    }

    #[test]
    fn probability_from_f32_model_output_rounds_cleanly() {
        let result = PredictionResult::from_probability(0.93_f32 as f64);
        assert_eq!(result.confidence, 93.0);
        let result = PredictionResult::from_probability(0.1_f32 as f64);
        assert_eq!(result.confidence, 90.0);
    }

    #[test]
    fn rounds_to_two_decimals() {
        let result = PredictionResult::from_probability(0.876543);
        assert_eq!(result.confidence, 87.65);
    }

    #[test]
    fn label_follows_strict_threshold() {
        for i in 0..=1000 {
            let p = i as f64 / 1000.0;
            let result = PredictionResult::from_probability(p);
            assert_eq!(result.label == Label::Tumor, p > 0.5, "p = {}", p);
        }
    }

    #[test]
    fn confidence_stays_within_bounds() {
        for i in 0..=1000 {
            let p = i as f64 / 1000.0;
            let confidence = PredictionResult::from_probability(p).confidence;
            assert!((50.0..=100.0).contains(&confidence), "p = {}", p);
        }
    }

    #[test]
    fn confidence_grows_with_distance_from_boundary() {
        let mut previous = 0.0;
        for i in 0..=500 {
            let distance = i as f64 / 1000.0;
            let above = PredictionResult::from_probability(0.5 + distance).confidence;
            let below = PredictionResult::from_probability(0.5 - distance).confidence;
            assert!(above >= previous && below >= previous, "distance = {}", distance);
            previous = above.min(below);
        }
    }

    #[test]
    fn serializes_label_as_name() {
        let response = PredictionResponse::new(
            PredictionResult::from_probability(0.93),
            "/static/uploads/a.png".into(),
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["label"], "Tumor");
        assert_eq!(json["confidence"], 93.0);
        assert_eq!(json["image_url"], "/static/uploads/a.png");
    }
}
