//! services/api/src/adapters/rates.rs
//!
//! This module contains the adapter for the Frankfurter currency-rate API.
//! It implements the `CurrencyRateService` port from the `core` crate.

use async_trait::async_trait;
use globehopper_core::ports::{CurrencyRateService, PortError, PortResult};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

const DEFAULT_BASE_URL: &str = "https://api.frankfurter.app";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CurrencyRateService` using api.frankfurter.app.
#[derive(Clone)]
pub struct FrankfurterRateAdapter {
    client: Client,
    base_url: String,
}

impl FrankfurterRateAdapter {
    /// Creates a new `FrankfurterRateAdapter`.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

impl Default for FrankfurterRateAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Frankfurter's `/latest` response.
#[derive(Deserialize)]
struct LatestRatesResponse {
    rates: HashMap<String, f64>,
}

fn rate_from_response(response: LatestRatesResponse, to: &str) -> PortResult<f64> {
    response
        .rates
        .get(to)
        .copied()
        .ok_or_else(|| PortError::NotFound(format!("no rate for currency '{}'", to)))
}

//=========================================================================================
// `CurrencyRateService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CurrencyRateService for FrankfurterRateAdapter {
    /// Looks up the conversion rate between two ISO currency codes.
    /// Equal codes short-circuit to the identity rate without a lookup.
    async fn rate(&self, from: &str, to: &str) -> PortResult<f64> {
        if from == to {
            return Ok(1.0);
        }

        let url = format!(
            "{}/latest?amount=1&from={}&to={}",
            self.base_url, from, to
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "rate lookup failed with status {}",
                response.status()
            )));
        }

        let payload: LatestRatesResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        rate_from_response(payload, to)
    }
}
