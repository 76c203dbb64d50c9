//! InfluxDB v1 query client for temperature readings.

use anyhow::{bail, Context, Result};
use log::debug;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Influx {
    pub url: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for Influx {
    fn default() -> Influx {
        Influx {
            url: "http://influxdb:8086".to_string(),
            database: "mydb".to_string(),
            username: None,
            password: None,
        }
    }
}

/// Temperature values written for `location` within the last `period`
/// (an InfluxDB duration literal like "15m").
pub fn query_values(influx: &Influx, location: &str, period: &str) -> Result<Vec<f64>> {
    let query = format!(
        "SELECT \"value\" FROM temperature WHERE \"location\" = '{}' AND time > now() - {}",
        location, period
    );
    debug!("influx query: {}", query);

    let client = reqwest::blocking::Client::new();
    let mut request = client
        .get(format!("{}/query", influx.url.trim_end_matches('/')))
        .query(&[("db", influx.database.as_str()), ("q", query.as_str())]);
    if let (Some(user), Some(pass)) = (&influx.username, &influx.password) {
        request = request.query(&[("u", user.as_str()), ("p", pass.as_str())]);
    }

    let response = request.send().context("influxdb query request")?;
    if !response.status().is_success() {
        bail!("influxdb query rejected: {}", response.status());
    }
    let body: Value = response.json().context("influxdb query response")?;
    Ok(values_from_response(&body))
}

/// Pulls the `value` column out of a v1 query response. Anything missing or
/// non-numeric is simply skipped.
pub fn values_from_response(body: &Value) -> Vec<f64> {
    let mut out = Vec::new();
    let series = body
        .pointer("/results/0/series/0")
        .unwrap_or(&Value::Null);
    let columns: Vec<&str> = series
        .get("columns")
        .and_then(Value::as_array)
        .map(|cols| cols.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let Some(value_index) = columns.iter().position(|&c| c == "value") else {
        return out;
    };
    if let Some(rows) = series.get("values").and_then(Value::as_array) {
        for row in rows {
            if let Some(v) = row.get(value_index).and_then(Value::as_f64) {
                out.push(v);
            }
        }
    }
    out
}
