//! One-shot temperature alert checker, meant to run from cron.
//!
//! Reads recent temperature values from InfluxDB for each configured
//! threshold and emails an alert when every reading in the window is beyond
//! the bound (or, for `empty` thresholds, when there are no readings at
//! all). A delivery failure for one threshold does not stop the others.

mod check;
mod influx;

use anyhow::{Context, Result};
use lettre::{Message, SmtpTransport, Transport};
use log::{error, info, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::check::{alert_subject, build_report, evaluate, Threshold, Verdict};
use crate::influx::{query_values, Influx};

#[derive(Debug, Deserialize)]
struct Config {
    #[serde(default)]
    influx: Influx,
    smtp_host: String,
    #[serde(rename = "threshold")]
    thresholds: Vec<Threshold>,
}

impl Config {
    fn load(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }
}

fn send_email(
    smtp_host: &str,
    from: &str,
    recipients: &[String],
    subject: &str,
    body: &str,
) -> Result<()> {
    let mut builder = Message::builder()
        .from(from.parse().context("bad from address")?)
        .subject(subject);
    for recipient in recipients {
        builder = builder.to(recipient.parse().context("bad recipient address")?);
    }
    let email = builder.body(body.to_string())?;
    // Plain relay on port 25, as the smtp host is expected to be local.
    let mailer = SmtpTransport::builder_dangerous(smtp_host).build();
    mailer.send(&email).context("smtp send")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("alert.toml"));
    let config = Config::load(&path)?;
    info!("checking {} thresholds", config.thresholds.len());

    let mut failures = 0;
    for threshold in &config.thresholds {
        let values = match query_values(&config.influx, &threshold.influx_location, &threshold.period)
        {
            Ok(values) => values,
            Err(e) => {
                error!("query failed for {:?}: {:#}", threshold.name, e);
                failures += 1;
                continue;
            }
        };
        let verdict = evaluate(threshold, &values);
        let report = build_report(threshold, &verdict, &values);
        println!("{}\n", report);

        if let Verdict::Alert(message) = &verdict {
            let subject = alert_subject(threshold, message);
            warn!("{}", subject);
            if let Err(e) = send_email(
                &config.smtp_host,
                &threshold.email_from,
                &threshold.email_to,
                &subject,
                &report,
            ) {
                error!("alert email failed for {:?}: {:#}", threshold.name, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} threshold(s) could not be checked or delivered", failures);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_parses() {
        let toml = r#"
            smtp_host = "smtp.example.com"

            [influx]
            url = "http://influxdb:8086"
            database = "mydb"

            [[threshold]]
            name = "No values"
            kind = "empty"
            period = "60m"
            influx_location = "Freezer"
            friendly_location = "Freezer"
            email_from = "freezer@example.com"
            email_to = ["warn@example.com"]

            [[threshold]]
            name = "Warn"
            kind = "high"
            period = "60m"
            value = -16.0
            influx_location = "Freezer"
            friendly_location = "Freezer"
            email_from = "freezer@example.com"
            email_to = ["warn@example.com"]
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.thresholds.len(), 2);
        assert_eq!(config.thresholds[0].kind, check::ThresholdKind::Empty);
        assert_eq!(config.thresholds[1].value, -16.0);
    }
}
