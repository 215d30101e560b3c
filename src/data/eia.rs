//! EIA v2 API integration for retail gasoline and WTI crude prices.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::domain::{AlignedSeries, PipelineConfig, PricePoint, SeriesOrigin};

const GAS_ROUTE: &str = "petroleum/pri/gnd/data/";
const CRUDE_ROUTE: &str = "petroleum/pri/spt/data/";

/// US regular gasoline, all formulations.
const PRODUCT_REGULAR_GAS: &str = "EPM0";
/// US national average.
const AREA_US: &str = "NUS";
/// WTI Cushing spot.
const PRODUCT_WTI: &str = "EPCWTI";

/// Records requested per week of lookback (weekly series, daily series).
const GAS_RECORDS_PER_WEEK: usize = 2;
const CRUDE_RECORDS_PER_WEEK: usize = 10;

/// Failure to obtain a usable series from the provider.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    /// Network error, timeout, or non-success status.
    #[error("EIA request failed: {0}")]
    Upstream(String),
    /// The payload did not carry the expected `response.data` envelope.
    #[error("unexpected EIA response format: {0}")]
    DataShape(String),
    /// The lookback window starts before the earliest representable date.
    #[error("lookback of {0} weeks is out of range")]
    Lookback(usize),
    /// Both series were fetched but share no dates.
    #[error("no overlapping dates between gasoline and crude series")]
    Empty,
}

pub struct EiaClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl EiaClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Upstream(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, SourceError> {
        Self::new(
            &config.eia_base_url,
            config.eia_api_key.clone(),
            config.request_timeout,
        )
    }

    /// Weekly retail gasoline prices from `start` onwards, ascending.
    pub fn fetch_gas_prices(&self, start: NaiveDate, weeks: usize) -> Result<Vec<PricePoint>, SourceError> {
        let facets = [
            ("facets[product][]", PRODUCT_REGULAR_GAS),
            ("facets[duoarea][]", AREA_US),
        ];
        self.fetch_series(GAS_ROUTE, "weekly", &facets, start, weeks * GAS_RECORDS_PER_WEEK)
    }

    /// WTI spot prices from `start` onwards, resampled to Monday-labelled weekly means.
    pub fn fetch_crude_prices(&self, start: NaiveDate, weeks: usize) -> Result<Vec<PricePoint>, SourceError> {
        let facets = [("facets[product][]", PRODUCT_WTI)];
        let daily = self.fetch_series(CRUDE_ROUTE, "daily", &facets, start, weeks * CRUDE_RECORDS_PER_WEEK)?;
        Ok(resample_weekly(&daily))
    }

    /// Fetch both series and inner-join them on date.
    pub fn fetch_aligned(&self, start: NaiveDate, weeks: usize) -> Result<AlignedSeries, SourceError> {
        let gas = self.fetch_gas_prices(start, weeks)?;
        let crude = self.fetch_crude_prices(start, weeks)?;
        debug!(gas = gas.len(), crude = crude.len(), "EIA series fetched");

        let aligned = AlignedSeries::inner_join(&gas, &crude, SeriesOrigin::Provider);
        if aligned.is_empty() {
            return Err(SourceError::Empty);
        }
        Ok(aligned)
    }

    fn fetch_series(
        &self,
        route: &str,
        frequency: &str,
        facets: &[(&str, &str)],
        start: NaiveDate,
        length: usize,
    ) -> Result<Vec<PricePoint>, SourceError> {
        let url = format!("{}/{route}", self.base_url);

        let mut params: Vec<(&str, String)> = vec![
            ("frequency", frequency.to_string()),
            ("data[0]", "value".to_string()),
            ("start", start.format("%Y-%m-%d").to_string()),
            ("sort[0][column]", "period".to_string()),
            ("sort[0][direction]", "desc".to_string()),
            ("offset", "0".to_string()),
            ("length", length.to_string()),
        ];
        for &(key, value) in facets {
            params.push((key, value.to_string()));
        }
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }

        let resp = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .map_err(|e| SourceError::Upstream(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SourceError::Upstream(format!(
                "{route} returned status {}",
                resp.status()
            )));
        }

        let body = resp
            .text()
            .map_err(|e| SourceError::Upstream(format!("failed to read {route} body: {e}")))?;

        parse_records(&body)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    response: Option<ResponseBody>,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    data: Option<Vec<Record>>,
}

#[derive(Debug, Deserialize)]
struct Record {
    period: Option<String>,
    value: Option<Value>,
}

/// Parse an EIA v2 `data` payload into an ascending, deduplicated series.
///
/// Rows with an unparseable period or value are dropped.
pub fn parse_records(body: &str) -> Result<Vec<PricePoint>, SourceError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| SourceError::DataShape(format!("invalid JSON: {e}")))?;

    let records = envelope
        .response
        .and_then(|r| r.data)
        .ok_or_else(|| SourceError::DataShape("missing response.data".to_string()))?;

    let mut points = Vec::with_capacity(records.len());
    for rec in records {
        let Some(date) = rec.period.as_deref().and_then(parse_period) else {
            continue;
        };
        let Some(value) = rec.value.as_ref().and_then(coerce_value) else {
            continue;
        };
        points.push(PricePoint::new(date, value));
    }

    Ok(normalize(points))
}

fn parse_period(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// EIA returns values as strings on some routes and numbers on others.
fn coerce_value(raw: &Value) -> Option<f64> {
    let v = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed == "." {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };
    if v.is_finite() { Some(v) } else { None }
}

/// Sort ascending by date and keep one observation per date (the last seen).
pub fn normalize(mut points: Vec<PricePoint>) -> Vec<PricePoint> {
    points.sort_by_key(|p| p.date);
    let mut out: Vec<PricePoint> = Vec::with_capacity(points.len());
    for p in points {
        match out.last_mut() {
            Some(last) if last.date == p.date => *last = p,
            _ => out.push(p),
        }
    }
    out
}

/// The Monday on or after `date`.
pub fn week_ending_monday(date: NaiveDate) -> NaiveDate {
    let ahead = (7 - date.weekday().num_days_from_monday()) % 7;
    date + chrono::Duration::days(ahead as i64)
}

/// Average sub-weekly observations into weeks labelled by their closing Monday.
///
/// Each week covers Tuesday through Monday, matching the dates EIA uses for the
/// weekly retail gasoline series.
pub fn resample_weekly(points: &[PricePoint]) -> Vec<PricePoint> {
    let mut buckets: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for p in points {
        let slot = buckets.entry(week_ending_monday(p.date)).or_insert((0.0, 0));
        slot.0 += p.value;
        slot.1 += 1;
    }
    buckets
        .into_iter()
        .map(|(date, (sum, n))| PricePoint::new(date, sum / n as f64))
        .collect()
}
