//! HTTP source for the Pico air-quality chart API.

use std::time::Duration;

use airq_sdk::{Envelope, ReportError, ReportRequest, SampleSource};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use reqwest::blocking::Client;
use serde::Serialize;
use tracing::{debug, info};

pub const DEFAULT_ENDPOINT: &str = "http://mqtt.brilcom.com:8080/mqtt/GetAirQualityForChart";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Wall-clock layout the API expects for window bounds.
pub const WINDOW_FORMAT: &str = "%Y%m%d%H%M%S";

const MEASUREMENT_TYPES: [&str; 6] = ["Co2", "Humid", "Pm10", "Pm25", "Temperature", "Tvoc"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartQuery {
    pub serial_num: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ChartQuery {
    pub fn for_request(request: &ReportRequest) -> Self {
        let window = request.window();
        Self {
            serial_num: request.serial_num().to_string(),
            start_time: format_bound(window.from()),
            end_time: format_bound(window.to()),
            kind: MEASUREMENT_TYPES.join(","),
        }
    }
}

fn format_bound(moment: NaiveDateTime) -> String {
    moment.format(WINDOW_FORMAT).to_string()
}

pub struct PicoApiSource {
    endpoint: String,
    client: Client,
}

impl PicoApiSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("airq/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to build upstream HTTP client")?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SampleSource for PicoApiSource {
    fn fetch(&self, request: &ReportRequest) -> Result<Envelope, ReportError> {
        let query = ChartQuery::for_request(request);
        info!(
            endpoint = %self.endpoint,
            serial = %query.serial_num,
            start = %query.start_time,
            end = %query.end_time,
            "requesting readings"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&query)
            .send()
            .map_err(|err| {
                ReportError::Fetch(format!("request to {} failed: {err}", self.endpoint))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Fetch(format!("{} answered HTTP {status}", self.endpoint)));
        }

        let body = response
            .bytes()
            .map_err(|err| ReportError::Fetch(format!("reading response body failed: {err}")))?;
        debug!(bytes = body.len(), "response received");
        decode(&body)
    }
}

/// Decodes a response body, logging the upstream status string.
pub fn decode(body: &[u8]) -> Result<Envelope, ReportError> {
    let envelope = Envelope::from_slice(body)?;
    debug!(
        status = envelope.status.as_deref().unwrap_or("<none>"),
        records = envelope.records().len(),
        "decoded envelope"
    );
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use airq_sdk::{Metric, ReportWindow};
    use chrono::NaiveDate;
    use serde_json::json;

    fn request() -> ReportRequest {
        let today = NaiveDate::from_ymd_opt(2024, 3, 2).expect("date");
        ReportRequest::new("PICO-0042", ReportWindow::previous_day(today))
    }

    #[test]
    fn query_body_uses_api_field_names_and_compact_times() {
        let body = serde_json::to_value(ChartQuery::for_request(&request())).expect("serialize");
        assert_eq!(
            body,
            json!({
                "serialNum": "PICO-0042",
                "startTime": "20240301000000",
                "endTime": "20240302000000",
                "type": "Co2,Humid,Pm10,Pm25,Temperature,Tvoc",
            })
        );
    }

    #[test]
    fn decode_reads_envelope() {
        let body = br#"{"Result":"OK","Data":[{"ReportTime":"2024-03-01T08:05:00","Co2":"850","Tvoc":"120","Pm10":"12","Pm25":"5","Temperature":"21.5","Humidity":"40","SerialNum":"PICO-0042","Lat":"37.5","Lng":"127.0","Ip":"10.0.0.2"}]}"#;
        let envelope = decode(body).expect("decode");
        assert_eq!(envelope.status.as_deref(), Some("OK"));
        assert_eq!(envelope.records().len(), 1);
        assert_eq!(envelope.records()[0].field(Metric::Co2), "850");
    }

    #[test]
    fn decode_treats_null_data_as_empty() {
        let envelope = decode(br#"{"Result":"OK","Data":null}"#).expect("decode");
        assert!(envelope.records().is_empty());
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let err = decode(b"<html>").expect_err("must fail");
        assert!(matches!(err, ReportError::Decode(_)), "{err:?}");
    }

    #[test]
    fn unreachable_endpoint_is_a_fetch_error() {
        let source = PicoApiSource::new("http://127.0.0.1:9/chart", Duration::from_millis(500))
            .expect("client");
        let err = source.fetch(&request()).expect_err("must fail");
        assert!(matches!(err, ReportError::Fetch(_)), "{err:?}");
        assert_eq!(source.endpoint(), "http://127.0.0.1:9/chart");
    }
}
