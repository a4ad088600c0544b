//! Narrative text over a user's financial summary.
//!
//! When an LLM key is configured, the summary is sent to an OpenAI-compatible
//! chat endpoint; otherwise (or on any failure) a deterministic local
//! template renders the same numbers. Insight generation never fails the
//! caller.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::models::UserProfile;

const OPENAI_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct InsightGenerator {
    api_key: Option<SecretString>,
    model: String,
    base_url: String,
    timeout: Duration,
    client: Client,
}

impl InsightGenerator {
    pub fn new(api_key: Option<SecretString>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            base_url: OPENAI_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            client: Client::new(),
        }
    }

    /// Override API base URL (useful for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Produce narrative text for a profile. Falls back to the local
    /// template when no key is configured or the remote call fails.
    pub async fn narrative(&self, profile: &UserProfile) -> String {
        let Some(key) = &self.api_key else {
            return Self::template(profile);
        };

        match self.generate_remote(key, profile).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "LLM insight generation failed; using template");
                Self::template(profile)
            }
        }
    }

    /// Deterministic fallback narrative.
    pub fn template(profile: &UserProfile) -> String {
        let s = &profile.summary;
        let direction = if s.total_savings >= Decimal::ZERO {
            "ahead"
        } else {
            "behind"
        };
        format!(
            "{name}, you're running {direction} this period: {income} in, {expenses} out, \
             leaving {savings} across {accounts} account(s) with a combined balance of {balance}.",
            name = profile.display_name,
            direction = direction,
            income = s.total_income,
            expenses = s.total_expenses,
            savings = s.total_savings,
            accounts = profile.account_count,
            balance = s.total_balance,
        )
    }

    async fn generate_remote(&self, key: &SecretString, profile: &UserProfile) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let s = &profile.summary;

        let prompt = format!(
            "Write two friendly sentences summarizing these personal finances. \
             Income: {}. Expenses: {}. Savings: {}. Total balance: {}. Accounts: {}.",
            s.total_income, s.total_expenses, s.total_savings, s.total_balance,
            profile.account_count,
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(key.expose_secret())
            .timeout(self.timeout)
            .json(&json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .send()
            .await
            .context("LLM HTTP request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read LLM response body")?;

        if !status.is_success() {
            anyhow::bail!("LLM request failed ({status}): {body}");
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).context("Failed to parse LLM JSON response")?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|text| !text.is_empty())
            .context("LLM response contained no text")
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::models::{Id, UserInfo};

    #[tokio::test]
    async fn missing_key_uses_template() {
        let profile =
            UserProfile::pending(Id::from_string("u1"), &UserInfo::default(), &SystemClock);
        let generator = InsightGenerator::new(None, "gpt-4o-mini");

        let text = generator.narrative(&profile).await;
        assert!(text.contains(&profile.display_name));
        assert!(text.contains("ahead"));
    }

    #[test]
    fn template_is_deterministic() {
        let profile =
            UserProfile::pending(Id::from_string("u1"), &UserInfo::default(), &SystemClock);
        assert_eq!(
            InsightGenerator::template(&profile),
            InsightGenerator::template(&profile)
        );
    }
}
