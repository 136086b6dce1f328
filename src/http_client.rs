use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub async fn fetch_json<T, Q>(http: &Client, url: &str, query: &Q, timeout: Duration) -> Result<T>
where
    T: DeserializeOwned,
    Q: Serialize + ?Sized,
{
    let response = http
        .get(url)
        .query(query)
        .timeout(timeout)
        .send()
        .await
        .with_context(|| format!("Request failed for {url}"))?;

    if !response.status().is_success() {
        bail!("Request failed ({}) for {url}", response.status());
    }

    response
        .json::<T>()
        .await
        .with_context(|| format!("Failed to decode JSON body for {url}"))
}
