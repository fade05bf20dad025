use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;

use super::{read_json, UpstreamError};

const SERVICE: &str = "USDA API";

/// Client for the USDA FoodData Central API. The key stays server-side;
/// payloads pass through unchanged so the browser sees exactly what the
/// upstream returned. No state is held between requests.
pub struct UsdaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody<'a> {
    query: &'a str,
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_type: Option<&'a [String]>,
}

impl UsdaClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("build usda http client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout,
        })
    }

    /// Free-text food search. Caller is responsible for the minimum query
    /// length short-circuit; this always goes upstream.
    pub async fn search(
        &self,
        query: &str,
        page_size: u32,
        data_type: Option<&[String]>,
    ) -> Result<Value, UpstreamError> {
        let url = format!("{}/foods/search", self.base_url);
        let req = self
            .http
            .post(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .json(&SearchBody {
                query,
                page_size,
                data_type,
            })
            .timeout(self.timeout);
        read_json(SERVICE, req).await
    }

    /// Full nutrient detail for one food by its FDC identifier.
    pub async fn food(&self, fdc_id: &str) -> Result<Value, UpstreamError> {
        let url = format!("{}/food/{}", self.base_url, urlencoding::encode(fdc_id));
        let req = self
            .http
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .timeout(self.timeout);
        read_json(SERVICE, req).await
    }
}
