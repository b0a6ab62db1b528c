//! Display-text rendering
//!
//! Textual rendering of raw values, filtered values, and predictions for UI
//! collaborators. Kept apart from the pipeline so display concerns never
//! interleave with state mutation; subscribers format the structured
//! [`ClassificationResult`] the engine returns.

use std::fmt::Write;

use crate::types::{ClassificationResult, Sample};

/// Raw axis values, two decimal places, one line per axis.
pub fn raw_text(raw: [f64; 3]) -> String {
    format!("X: {:.2}\nY: {:.2}\nZ: {:.2}", raw[0], raw[1], raw[2])
}

/// Filtered axis values, two decimal places, one line per axis.
pub fn filtered_text(sample: Sample) -> String {
    format!(
        "filteredX: {:.2}\nfilteredY: {:.2}\nfilteredZ: {:.2}",
        sample.x, sample.y, sample.z
    )
}

/// Prediction block: winning label, then the confidence distribution with
/// percentages at one decimal place, in fixed label order.
pub fn prediction_text(result: &ClassificationResult) -> String {
    let mut confidence = String::new();
    for entry in &result.distribution {
        // Writing to a String cannot fail
        let _ = writeln!(
            confidence,
            "{}: {:.1}%",
            entry.label.as_str(),
            entry.probability * 100.0
        );
    }

    format!(
        "Predicted Activity: {}\n\nConfidence:\n{}",
        result.label.as_str(),
        confidence
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::decode;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_raw_text_two_decimals() {
        assert_eq!(raw_text([0.125, -1.0, 9.806]), "X: 0.12\nY: -1.00\nZ: 9.81");
    }

    #[test]
    fn test_filtered_text_two_decimals() {
        assert_eq!(
            filtered_text(Sample::new(0.1, 0.25, -0.349)),
            "filteredX: 0.10\nfilteredY: 0.25\nfilteredZ: -0.35"
        );
    }

    #[test]
    fn test_prediction_text_fixed_order_one_decimal() {
        let result = decode(&[0.05, 0.05, 0.1, 0.1, 0.7]).unwrap();
        assert_eq!(
            prediction_text(&result),
            "Predicted Activity: Walking\n\n\
             Confidence:\n\
             Climbing Down: 5.0%\n\
             Climbing Up: 5.0%\n\
             Running: 10.0%\n\
             Sitting: 10.0%\n\
             Walking: 70.0%\n"
        );
    }
}
