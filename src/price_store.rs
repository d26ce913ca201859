// src/price_store.rs
use chrono::{Datelike, Duration, FixedOffset, NaiveDate};
use log::{debug, error, info, warn};
use std::fs;
use std::path::PathBuf;
use std::time::Duration as StdDuration;

use crate::config::Config;
use crate::errors::PriceError;
use crate::types::{PriceEntry, PriceSeries};

/// Fetches, caches and reloads daily price series for one price area.
///
/// A day's series is fetched from the provider at most once: after the first
/// successful fetch the raw JSON body is written under the cache directory
/// and every later request for the same day is served from that file.
pub struct PriceStore {
    client: reqwest::Client,
    base_url: String,
    area: String,
    cache_dir: PathBuf,
    timeout: StdDuration,
}

impl PriceStore {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.price_api_url.clone(),
            area: config.area.clone(),
            cache_dir: config.cache_dir.clone(),
            timeout: config.request_timeout,
        }
    }

    /// Fetch one day's series, consulting the cache first. Returns None when
    /// the day is not obtainable at all (typically tomorrow before the daily
    /// publication time); the caller decides whether that is acceptable.
    pub async fn fetch_day(&self, date: NaiveDate) -> Option<PriceSeries> {
        let path = self.cache_path(date);

        if path.exists() {
            if let Some(series) = self.load_cached(&path) {
                return Some(series);
            }
            // Malformed cache content counts as "not cached"; fall through
            // to a fresh network fetch.
        }

        match self.fetch_remote(date).await {
            Ok(series) => Some(series),
            Err(e) => {
                warn!("[PRICE_STORE] No price data for {}: {}", date, e);
                None
            }
        }
    }

    /// Like `fetch_day`, but today's series must always exist for the
    /// control loop to keep running; when nothing is obtainable a synthetic
    /// fallback series is returned instead.
    pub async fn fetch_today(&self, date: NaiveDate) -> PriceSeries {
        match self.fetch_day(date).await {
            Some(series) => series,
            None => {
                error!(
                    "[PRICE_STORE] Fetching price list for {} failed. Using a generic price list.",
                    date
                );
                fallback_series(date)
            }
        }
    }

    fn cache_path(&self, date: NaiveDate) -> PathBuf {
        self.cache_dir
            .join(format!("{}_{}.json", date.format("%Y-%m-%d"), self.area))
    }

    // GET <base>/2023/01-15_SE3.json
    fn provider_url(&self, date: NaiveDate) -> String {
        format!(
            "{}{}/{:02}-{:02}_{}.json",
            self.base_url,
            date.year(),
            date.month(),
            date.day(),
            self.area
        )
    }

    fn load_cached(&self, path: &PathBuf) -> Option<PriceSeries> {
        let body = match fs::read_to_string(path) {
            Ok(body) => body,
            Err(e) => {
                warn!("[PRICE_STORE] Failed to read cache file {:?}: {}", path, e);
                return None;
            }
        };
        match parse_series(&body) {
            Ok(series) if series.is_empty() => {
                // An empty array is valid JSON but useless for control;
                // treat it like a missing day so today's fallback kicks in.
                warn!("[PRICE_STORE] Cache file {:?} holds an empty series", path);
                None
            }
            Ok(series) => {
                debug!("[PRICE_STORE] Reading from local file {:?}", path);
                Some(series)
            }
            Err(e) => {
                warn!("[PRICE_STORE] Malformed cache file {:?}: {}", path, e);
                None
            }
        }
    }

    async fn fetch_remote(&self, date: NaiveDate) -> Result<PriceSeries, PriceError> {
        let url = self.provider_url(date);
        debug!("[PRICE_STORE] Fetching {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PriceError::Status(status));
        }

        let body = response.text().await?;
        let series = parse_series(&body)?;
        if series.is_empty() {
            // Some providers answer an empty array instead of 404 before a
            // day is published. Not cached: the day may still appear later.
            return Err(PriceError::EmptySeries);
        }
        info!("[PRICE_STORE] Fetching {} OK ({} entries)", url, series.len());

        self.write_cache(date, &body);
        Ok(series)
    }

    // Cache writes are best-effort; a read-only disk must not take the
    // control loop down.
    fn write_cache(&self, date: NaiveDate, body: &str) {
        if let Err(e) = fs::create_dir_all(&self.cache_dir) {
            warn!(
                "[PRICE_STORE] Failed to create cache directory {:?}: {}",
                self.cache_dir, e
            );
            return;
        }
        let path = self.cache_path(date);
        if let Err(e) = fs::write(&path, body) {
            warn!("[PRICE_STORE] Failed to write cache file {:?}: {}", path, e);
        } else {
            info!("[PRICE_STORE] Cached price list to {:?}", path);
        }
    }
}

fn parse_series(body: &str) -> Result<PriceSeries, serde_json::Error> {
    let mut series: PriceSeries = serde_json::from_str(body)?;
    series.sort_by_key(|entry| entry.interval_start);
    Ok(series)
}

/// Synthetic placeholder series used when no real data can be obtained for
/// today: 24 hourly entries alternating low/high by even/odd hour index, so
/// downstream price comparisons stay exercised without real data.
pub fn fallback_series(date: NaiveDate) -> PriceSeries {
    let offset = FixedOffset::east_opt(2 * 3600).expect("static UTC offset");
    (0..24)
        .map(|hour| {
            let sek_per_kwh = if hour % 2 == 0 {
                hour as f64 / 100.0
            } else {
                4.00 + hour as f64 / 100.0
            };
            let interval_start = date
                .and_hms_opt(hour, 0, 0)
                .expect("hour in 0..24")
                .and_local_timezone(offset)
                .unwrap();
            PriceEntry {
                sek_per_kwh,
                eur_per_kwh: None,
                exchange_rate: None,
                interval_start,
                interval_end: Some(interval_start + Duration::hours(1)),
            }
        })
        .collect()
}
