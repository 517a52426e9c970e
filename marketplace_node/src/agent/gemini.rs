//! Gemini-backed [`DocumentRanker`].
//!
//! Talks to a `generateContent`-compatible endpoint over REST. The whole
//! exchange is narrative: one prompt in, free text out.

use async_trait::async_trait;
use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};

use super::{DocumentRanker, RankRequest};
use crate::config::RankerConfig;

pub struct GeminiRanker {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiRanker {
    pub fn new(config: &RankerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build ranking http client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl DocumentRanker for GeminiRanker {
    async fn rank(&self, request: &RankRequest) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": build_prompt(request) }],
            }],
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("ranking request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("ranking service returned {status}"));
        }

        let payload: Value = response
            .json()
            .await
            .context("ranking response was not valid json")?;
        extract_text(&payload)
            .ok_or_else(|| anyhow!("ranking response contained no candidate text"))
    }
}

fn extract_text(payload: &Value) -> Option<String> {
    let text = payload
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()?;
    Some(text.to_string())
}

/// Builds the evaluation prompt: the user's query and constraints followed by
/// the candidate listings.
pub fn build_prompt(request: &RankRequest) -> String {
    let budget = request
        .budget
        .map(|b| format!("{b:.2}"))
        .unwrap_or_else(|| "unlimited".to_string());
    let max_per_doc = request
        .max_price_per_doc
        .map(|p| format!("{p:.2}"))
        .unwrap_or_else(|| "no limit".to_string());

    let mut prompt = format!(
        "You are an AI research agent helping users find and evaluate documents \
         in a marketplace.\n\n\
         User Query: \"{}\"\n\
         Budget: ${} USDC\n\
         Max per document: ${} USDC\n",
        request.query, budget, max_per_doc
    );
    if let Some(category) = request.category {
        prompt.push_str(&format!("Category filter: {category}\n"));
    }

    prompt.push_str("\nAvailable documents:\n");
    for (i, candidate) in request.candidates.iter().enumerate() {
        let doc = &candidate.document;
        let description: String = doc.description.chars().take(100).collect();
        prompt.push_str(&format!(
            "{}. \"{}\" - ${:.2} USDC\n   Category: {}\n   Rating: {}/5 ({} reviews)\n   \
             Downloads: {}\n   Description: {}...\n\n",
            i + 1,
            doc.title,
            doc.price_usdc,
            doc.category,
            doc.rating,
            doc.rating_count,
            doc.downloads,
            description
        ));
    }

    prompt.push_str(
        "Analyze these documents and provide:\n\
         1. Top 3 recommendations based on relevance to the query\n\
         2. Why each document is relevant\n\
         3. Which ones are within budget\n\
         4. Your purchase recommendation\n\n\
         Be helpful and concise.",
    );
    prompt
}
