use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const QUOTE_ENDPOINT: &str = "https://zenquotes.io/api/random";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub quote: String,
    pub author: String,
}

// zenquotes wraps each quote in a one-element array of {"q": .., "a": ..}.
#[derive(Deserialize)]
struct WireQuote {
    q: String,
    a: String,
}

/// Fetches a motivational quote for the end of a focus session. Strictly
/// fire-and-forget from the engine's perspective: failures are logged by the
/// dispatcher and never retried, and nothing is displayed on failure.
#[derive(Clone)]
pub struct QuoteService {
    client: reqwest::Client,
    endpoint: String,
}

impl Default for QuoteService {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteService {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: QUOTE_ENDPOINT.to_string(),
        }
    }

    pub async fn fetch(&self) -> Result<Quote> {
        let body = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .context("quote request failed")?
            .error_for_status()
            .context("quote endpoint returned an error status")?
            .text()
            .await
            .context("failed to read quote response body")?;

        parse_quote(&body)
    }
}

fn parse_quote(body: &str) -> Result<Quote> {
    let mut quotes: Vec<WireQuote> =
        serde_json::from_str(body).context("unexpected quote payload")?;
    if quotes.is_empty() {
        bail!("quote payload was empty");
    }
    let first = quotes.remove(0);
    Ok(Quote {
        quote: first.q,
        author: first.a,
    })
}
