//! Natural-language extraction
//!
//! One completion call turns an utterance into an [`ExtractionResult`]. The
//! model's reply is treated as untrusted text: fences and surrounding prose
//! are stripped, then the JSON is parsed into a strict shape.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::domain::ExtractionResult;
use crate::error::FlowError;
use crate::llm::{CompletionRequest, LlmClient, StopReason};
use crate::prompts::PromptLoader;

const SYSTEM_PROMPT: &str = "You convert spoken task descriptions into JSON. \
                             Reply with a single JSON object and nothing else.";

const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Wire shape the model is instructed to produce
#[derive(Debug, Deserialize)]
struct RawExtraction {
    title: String,
    #[serde(rename = "assignTo")]
    assign_to: Vec<String>,
    #[serde(default)]
    startdate: Option<String>,
    #[serde(default)]
    enddate: Option<String>,
}

/// Extracts task fields from free text through the extraction service
pub struct Extractor {
    llm: Arc<dyn LlmClient>,
    prompts: PromptLoader,
    max_tokens: u32,
}

impl Extractor {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: PromptLoader) -> Self {
        Self {
            llm,
            prompts,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Extract title, names and dates from one utterance
    ///
    /// Single attempt: a failed or unparseable completion ends the invocation.
    pub async fn extract(&self, text: &str, today: NaiveDate) -> Result<ExtractionResult, FlowError> {
        debug!(text_len = text.len(), %today, "Extractor::extract: called");
        let prompt = self
            .prompts
            .extract_prompt(text, today)
            .map_err(|e| FlowError::Prompt(e.to_string()))?;

        let request = CompletionRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            prompt,
            max_tokens: self.max_tokens,
        };

        let response = self.llm.complete(request).await.inspect_err(|e| {
            if e.is_timeout() {
                warn!("Extraction service did not answer before the client timeout");
            }
        })?;
        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Extractor::extract: completion usage"
        );
        if response.stop_reason == StopReason::MaxTokens {
            warn!("Extraction response hit the token limit, output may be truncated");
        }

        let raw = response
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| FlowError::MalformedExtraction("empty response from extraction service".to_string()))?;

        let extraction = parse_extraction(&raw)?;
        info!(
            title = %extraction.title,
            names = ?extraction.names,
            start = ?extraction.start_date,
            end = ?extraction.end_date,
            "Extracted task fields"
        );
        Ok(extraction)
    }
}

/// Remove a Markdown code fence wrapped around the reply
///
/// Only an opening fence (with or without a language tag) at the start and a
/// closing fence at the end are dropped; either may appear alone. Backticks
/// inside the JSON are left untouched.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+')))
            .unwrap_or(rest.len());
        text = rest[tag_len..].trim_start();
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim_end();
    }
    text
}

/// Deserialize the first JSON object in `text`, ignoring prose around it
fn first_object(text: &str) -> Result<RawExtraction, FlowError> {
    let start = text
        .find('{')
        .ok_or_else(|| FlowError::MalformedExtraction("no JSON object in response".to_string()))?;

    serde_json::Deserializer::from_str(&text[start..])
        .into_iter::<RawExtraction>()
        .next()
        .unwrap_or_else(|| Err(<serde_json::Error as serde::de::Error>::custom("no JSON object in response")))
        .map_err(|e| {
            debug!(error = %e, "first_object: JSON rejected");
            FlowError::MalformedExtraction(e.to_string())
        })
}

/// Parse the model's reply into a validated extraction result
pub fn parse_extraction(raw: &str) -> Result<ExtractionResult, FlowError> {
    debug!(raw_len = raw.len(), "parse_extraction: called");
    let parsed = first_object(strip_code_fences(raw))?;

    Ok(ExtractionResult {
        title: parsed.title.trim().to_string(),
        names: split_name_tokens(&parsed.assign_to),
        start_date: parse_date_field("startdate", parsed.startdate.as_deref())?,
        end_date: parse_date_field("enddate", parsed.enddate.as_deref())?,
    })
}

/// Split every entry on whitespace into individual name tokens
pub fn split_name_tokens(names: &[String]) -> Vec<String> {
    names
        .iter()
        .flat_map(|name| name.split_whitespace())
        .map(str::to_string)
        .collect()
}

/// Empty means "not determinable"; anything else must be a calendar date
fn parse_date_field(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, FlowError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(timestamp.date_naive()));
    }

    Err(FlowError::MalformedExtraction(format!(
        "{} is not a YYYY-MM-DD date: '{}'",
        field, value
    )))
}
