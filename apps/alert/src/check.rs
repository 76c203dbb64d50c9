//! Threshold evaluation over a window of readings.
//!
//! A threshold only alerts when *every* reading in the window is beyond the
//! bound (one sane value means the sensor is fine and the condition is
//! transient), or for `empty` when the window holds no readings at all.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdKind {
    High,
    Low,
    /// Alert when no readings arrived at all (dead sensor or feed).
    Empty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Threshold {
    pub name: String,
    pub kind: ThresholdKind,
    /// InfluxDB duration literal, e.g. "15m" or "1h".
    pub period: String,
    /// Bound in degrees C; unused for `empty`.
    #[serde(default)]
    pub value: f64,
    /// The `location` tag readings were written with.
    pub influx_location: String,
    pub friendly_location: String,
    pub email_from: String,
    pub email_to: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Raise an alert with this message.
    Alert(String),
    /// Some readings beyond the bound, but not all; mentioned in the
    /// report, no alert.
    Beyond,
    Clear,
}

pub fn evaluate(threshold: &Threshold, values: &[f64]) -> Verdict {
    match threshold.kind {
        ThresholdKind::Empty => {
            if values.is_empty() {
                Verdict::Alert("No readings".to_string())
            } else {
                Verdict::Clear
            }
        }
        ThresholdKind::High | ThresholdKind::Low => {
            if values.is_empty() {
                return Verdict::Clear;
            }
            let above = threshold.kind == ThresholdKind::High;
            let beyond = |v: f64| {
                if above {
                    v > threshold.value
                } else {
                    v < threshold.value
                }
            };
            let count = values.iter().filter(|&&v| beyond(v)).count();
            if count == values.len() {
                Verdict::Alert(format!(
                    "All readings {} threshold {}C",
                    if above { "above" } else { "below" },
                    threshold.value
                ))
            } else if count > 0 {
                Verdict::Beyond
            } else {
                Verdict::Clear
            }
        }
    }
}

pub fn alert_subject(threshold: &Threshold, message: &str) -> String {
    format!(
        "ALERT: {} - {} for {}",
        threshold.friendly_location, message, threshold.period
    )
}

/// Plain text summary of one evaluated threshold, alerting or not.
pub fn build_report(threshold: &Threshold, verdict: &Verdict, values: &[f64]) -> String {
    let mut report = format!(
        "Result for location: {}/{}\n",
        threshold.influx_location, threshold.friendly_location
    );
    match verdict {
        Verdict::Alert(message) => {
            report.push_str(&format!(
                "              Alert: {}\n",
                alert_subject(threshold, message)
            ));
        }
        Verdict::Beyond => {
            let beyond = if threshold.kind == ThresholdKind::High {
                "above"
            } else {
                "below"
            };
            report.push_str(&format!(
                "              Alert: None, but some values {} threshold\n",
                beyond
            ));
        }
        Verdict::Clear => report.push_str("              Alert: No\n"),
    }
    report.push_str(&format!("     Threshold type: {:?}\n", threshold.kind));
    report.push_str(&format!("             Period: {}\n", threshold.period));
    if threshold.kind != ThresholdKind::Empty {
        report.push_str(&format!("              Value: {}\n", threshold.value));
    }
    report.push_str(&format!("               Name: {}\n", threshold.name));
    let values_text = values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    report.push_str(&format!("      Actual values: {}", values_text));
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold(kind: ThresholdKind, value: f64) -> Threshold {
        Threshold {
            name: "Warn".to_string(),
            kind,
            period: "60m".to_string(),
            value,
            influx_location: "Freezer".to_string(),
            friendly_location: "Freezer".to_string(),
            email_from: "freezer@example.com".to_string(),
            email_to: vec!["warn@example.com".to_string()],
        }
    }

    #[test]
    fn high_alerts_only_when_all_above() {
        let t = threshold(ThresholdKind::High, -16.0);
        assert_eq!(
            evaluate(&t, &[-14.0, -15.0, -12.5]),
            Verdict::Alert("All readings above threshold -16C".to_string())
        );
        assert_eq!(evaluate(&t, &[-14.0, -17.0]), Verdict::Beyond);
        assert_eq!(evaluate(&t, &[-18.0, -17.0]), Verdict::Clear);
    }

    #[test]
    fn low_alerts_only_when_all_below() {
        let t = threshold(ThresholdKind::Low, 2.0);
        assert_eq!(
            evaluate(&t, &[0.5, 1.0]),
            Verdict::Alert("All readings below threshold 2C".to_string())
        );
        assert_eq!(evaluate(&t, &[0.5, 3.0]), Verdict::Beyond);
        assert_eq!(evaluate(&t, &[2.5, 3.0]), Verdict::Clear);
    }

    #[test]
    fn boundary_value_is_not_beyond() {
        let t = threshold(ThresholdKind::High, -16.0);
        assert_eq!(evaluate(&t, &[-16.0, -16.0]), Verdict::Clear);
    }

    #[test]
    fn no_values_never_alerts_high_or_low() {
        assert_eq!(evaluate(&threshold(ThresholdKind::High, 0.0), &[]), Verdict::Clear);
        assert_eq!(evaluate(&threshold(ThresholdKind::Low, 0.0), &[]), Verdict::Clear);
    }

    #[test]
    fn empty_alerts_on_no_readings() {
        let t = threshold(ThresholdKind::Empty, 0.0);
        assert_eq!(evaluate(&t, &[]), Verdict::Alert("No readings".to_string()));
        assert_eq!(evaluate(&t, &[-18.0]), Verdict::Clear);
    }

    #[test]
    fn report_mentions_verdict_and_values() {
        let t = threshold(ThresholdKind::High, -16.0);
        let verdict = evaluate(&t, &[-14.0, -15.0]);
        let report = build_report(&t, &verdict, &[-14.0, -15.0]);
        assert!(report.contains("ALERT: Freezer - All readings above threshold -16C for 60m"));
        assert!(report.contains("Actual values: -14 -15"));
    }
}
