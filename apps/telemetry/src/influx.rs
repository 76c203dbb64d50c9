//! Minimal InfluxDB v1 writer: line protocol over the `/write` endpoint.

use anyhow::{bail, Context, Result};
use log::debug;

/// One timestamped, tagged data point.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: &'static str,
    pub tags: Vec<(&'static str, String)>,
    pub timestamp_ms: i64,
    pub value: f64,
}

/// Escapes a tag value per line protocol (commas, equals, spaces).
fn escape_tag(value: &str) -> String {
    value
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

pub fn to_line(point: &Point) -> String {
    let mut line = String::from(point.measurement);
    for (key, value) in &point.tags {
        line.push(',');
        line.push_str(key);
        line.push('=');
        line.push_str(&escape_tag(value));
    }
    line.push_str(&format!(" value={} {}", point.value, point.timestamp_ms));
    line
}

pub struct InfluxWriter {
    client: reqwest::Client,
    write_url: String,
}

impl InfluxWriter {
    pub fn new(
        base_url: &str,
        database: &str,
        username: Option<&str>,
        password: Option<&str>,
    ) -> InfluxWriter {
        let mut write_url = format!(
            "{}/write?db={}&precision=ms",
            base_url.trim_end_matches('/'),
            database
        );
        if let (Some(user), Some(pass)) = (username, password) {
            write_url.push_str(&format!("&u={}&p={}", user, pass));
        }
        InfluxWriter {
            client: reqwest::Client::new(),
            write_url,
        }
    }

    pub async fn write(&self, point: &Point) -> Result<()> {
        let line = to_line(point);
        debug!("influx write: {}", line);
        let response = self
            .client
            .post(&self.write_url)
            .body(line)
            .send()
            .await
            .context("influxdb write request")?;
        if !response.status().is_success() {
            bail!("influxdb write rejected: {}", response.status());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_line() {
        let point = Point {
            measurement: "temperature",
            tags: vec![
                ("chipId", "289cde".to_string()),
                ("sensorId", "28-021562ab19ff".to_string()),
                ("location", "Hall".to_string()),
            ],
            timestamp_ms: 1700000000000,
            value: 19.5,
        };
        assert_eq!(
            to_line(&point),
            "temperature,chipId=289cde,sensorId=28-021562ab19ff,location=Hall value=19.5 1700000000000"
        );
    }

    #[test]
    fn tag_values_are_escaped() {
        let point = Point {
            measurement: "temperature",
            tags: vec![("location", "Big Freezer, cellar".to_string())],
            timestamp_ms: 42,
            value: -18.0,
        };
        assert_eq!(
            to_line(&point),
            "temperature,location=Big\\ Freezer\\,\\ cellar value=-18 42"
        );
    }
}
