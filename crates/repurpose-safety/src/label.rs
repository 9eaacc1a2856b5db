//! Drug label text for Layer-2 screening.
//!
//! A [`LabelSource`] turns a lower-cased drug name into the structured
//! sections of its label. Fetch failures are the caller's to absorb; the
//! filter maps them to "no label".

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use repurpose_common::{DrugLabel, LabelSection, RepurposeError, Result, SafetyConfig, SandboxClient};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use url::Url;

/// Source of drug label text.
///
/// Implementations can use:
/// - the OpenFDA label endpoint (remote)
/// - a local mirror of the same endpoint
/// - in-memory labels (testing)
#[async_trait]
pub trait LabelSource: Send + Sync {
    /// Label for a lower-cased drug name, or `None` when there is none.
    async fn fetch_label(&self, drug_name: &str) -> Result<Option<DrugLabel>>;
}

// ── OpenFDA ─────────────────────────────────────────────────────────────────

/// Label source backed by the OpenFDA drug label API.
pub struct OpenFdaLabelSource {
    client: SandboxClient,
    base_url: String,
}

impl OpenFdaLabelSource {
    /// Client with the configured per-request timeout. The host of
    /// `label_base_url` is added to the sandbox allowlist.
    pub fn new(config: &SafetyConfig) -> Result<Self> {
        let mut client = SandboxClient::new(Duration::from_secs(config.label_timeout_secs))?;
        let parsed = Url::parse(&config.label_base_url).map_err(|e| {
            RepurposeError::Config(format!("invalid label_base_url '{}': {e}", config.label_base_url))
        })?;
        if let Some(host) = parsed.host_str() {
            client.allow_domain(host);
        }
        Ok(Self::with_client(client, &config.label_base_url))
    }

    pub fn with_client(client: SandboxClient, base_url: &str) -> Self {
        Self { client, base_url: base_url.to_string() }
    }
}

#[async_trait]
impl LabelSource for OpenFdaLabelSource {
    #[instrument(skip(self))]
    async fn fetch_label(&self, drug_name: &str) -> Result<Option<DrugLabel>> {
        let search = format!("openfda.generic_name:\"{drug_name}\"");
        let params = [("search", search.as_str()), ("limit", "1")];

        let resp = self.client.get(&self.base_url)?.query(&params).send().await?;
        if !resp.status().is_success() {
            debug!(status = %resp.status(), "No label returned");
            return Ok(None);
        }
        let body = resp.json::<Value>().await?;
        Ok(parse_openfda_label(&body))
    }
}

/// Extract label sections from an OpenFDA response body. `None` when the
/// body has no results or none of the screened sections.
pub fn parse_openfda_label(body: &Value) -> Option<DrugLabel> {
    let first = body["results"].as_array()?.first()?;
    let label = DrugLabel {
        contraindications: section_text(&first[LabelSection::Contraindications.as_str()]),
        boxed_warning: section_text(&first[LabelSection::BoxedWarning.as_str()]),
        warnings_and_precautions: section_text(&first[LabelSection::WarningsAndPrecautions.as_str()]),
        warnings: section_text(&first[LabelSection::Warnings.as_str()]),
    };
    if label.is_empty() { None } else { Some(label) }
}

/// Section values are arrays of paragraphs; join them with blank lines.
fn section_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Array(parts) => parts
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n"),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    if text.is_empty() { None } else { Some(text) }
}

// ── In-memory source ────────────────────────────────────────────────────────

/// Label source with fixed labels, for tests and offline runs.
#[derive(Debug, Default)]
pub struct StaticLabelSource {
    labels: HashMap<String, DrugLabel>,
    calls: std::sync::atomic::AtomicUsize,
}

impl StaticLabelSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, drug_name: &str, label: DrugLabel) -> Self {
        self.labels.insert(drug_name.trim().to_lowercase(), label);
        self
    }

    /// Number of `fetch_label` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl LabelSource for StaticLabelSource {
    async fn fetch_label(&self, drug_name: &str) -> Result<Option<DrugLabel>> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(self.labels.get(drug_name).cloned())
    }
}

// ── Cache ───────────────────────────────────────────────────────────────────

/// Per-drug label cache keyed by lower-cased name. Stores successful
/// lookups only, including "no label"; failed fetches are retried on the
/// next call.
#[derive(Debug, Clone, Default)]
pub struct LabelCache {
    entries: Arc<RwLock<HashMap<String, Option<DrugLabel>>>>,
}

impl LabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(entry)` on a hit, where the entry itself may be "no label".
    pub async fn get(&self, drug_name: &str) -> Option<Option<DrugLabel>> {
        self.entries.read().await.get(drug_name).cloned()
    }

    pub async fn insert(&self, drug_name: &str, label: Option<DrugLabel>) {
        self.entries.write().await.insert(drug_name.to_string(), label);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

// ── Keyword scan ────────────────────────────────────────────────────────────

/// Characters of context kept on each side of a keyword hit.
const EXCERPT_RADIUS: usize = 80;

/// A disease keyword found in a label section.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelHit {
    pub section: LabelSection,
    pub keyword: String,
    pub excerpt: String,
}

/// Disease terms compiled into case-insensitive whole-word patterns.
///
/// A term only matches where it stands as its own word or phrase, so
/// "muscular" does not match "intramuscular". Whitespace inside a phrase
/// matches any whitespace run, including line breaks.
#[derive(Debug, Clone, Default)]
pub struct LabelKeywords {
    terms: Vec<(String, Regex)>,
}

impl LabelKeywords {
    pub fn new<I, S>(keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut terms = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim();
            if keyword.is_empty() {
                continue;
            }
            let body = keyword
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+");
            let pattern = Regex::new(&format!(r"(?i)\b{body}\b")).map_err(|e| {
                RepurposeError::Config(format!("invalid label keyword '{keyword}': {e}"))
            })?;
            terms.push((keyword.to_string(), pattern));
        }
        Ok(Self { terms })
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|(k, _)| k.as_str())
    }

    /// First term, in keyword order, found in `text`, with its byte span.
    pub fn find(&self, text: &str) -> Option<(&str, usize, usize)> {
        self.terms.iter().find_map(|(keyword, pattern)| {
            pattern
                .find(text)
                .map(|m| (keyword.as_str(), m.start(), m.len()))
        })
    }
}

/// Scan sections in [`LabelSection::SCAN_ORDER`]; the first section that
/// mentions any keyword wins.
pub fn scan_label(label: &DrugLabel, keywords: &LabelKeywords) -> Option<LabelHit> {
    if keywords.is_empty() {
        return None;
    }
    for section in LabelSection::SCAN_ORDER {
        let Some(text) = label.section(section) else {
            continue;
        };
        if let Some((keyword, pos, len)) = keywords.find(text) {
            return Some(LabelHit {
                section,
                keyword: keyword.to_string(),
                excerpt: excerpt(text, pos, len),
            });
        }
    }
    None
}

/// Short whitespace-collapsed window around `text[start..start + len]`.
pub fn excerpt(text: &str, start: usize, len: usize) -> String {
    let mut from = start.saturating_sub(EXCERPT_RADIUS);
    while !text.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = (start + len + EXCERPT_RADIUS).min(text.len());
    while !text.is_char_boundary(to) {
        to += 1;
    }

    let body = text[from..to].split_whitespace().collect::<Vec<_>>().join(" ");
    let lead = if from > 0 { "..." } else { "" };
    let tail = if to < text.len() { "..." } else { "" };
    format!("{lead}{body}{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_openfda_label() {
        let body = json!({
            "results": [{
                "contraindications": ["Do not use in patients with", "Parkinson's disease."],
                "boxed_warning": [],
                "warnings": "  "
            }]
        });
        let label = parse_openfda_label(&body).unwrap();
        assert_eq!(
            label.contraindications.as_deref(),
            Some("Do not use in patients with\n\nParkinson's disease.")
        );
        assert!(label.boxed_warning.is_none());
        assert!(label.warnings.is_none());
    }

    #[test]
    fn test_parse_empty_results() {
        assert!(parse_openfda_label(&json!({ "results": [] })).is_none());
        assert!(parse_openfda_label(&json!({ "error": { "code": "NOT_FOUND" } })).is_none());
        assert!(parse_openfda_label(&json!({ "results": [{ "indications_and_usage": ["x"] }] })).is_none());
    }

    #[test]
    fn test_scan_uses_section_order() {
        let label = DrugLabel {
            warnings: Some("Use caution in asthma.".to_string()),
            boxed_warning: Some("Fatal bronchospasm in patients with ASTHMA.".to_string()),
            ..Default::default()
        };
        let hit = scan_label(&label, &LabelKeywords::new(["asthma"]).unwrap()).unwrap();
        assert_eq!(hit.section, LabelSection::BoxedWarning);
        assert!(hit.excerpt.contains("ASTHMA"));
    }

    #[test]
    fn test_scan_no_keyword() {
        let label = DrugLabel {
            contraindications: Some("Hypersensitivity.".to_string()),
            ..Default::default()
        };
        assert!(scan_label(&label, &LabelKeywords::new(["gout"]).unwrap()).is_none());
    }

    #[test]
    fn test_keywords_match_whole_words_only() {
        let label = DrugLabel {
            warnings: Some("For intramuscular injection only. Neutropenia: also monitor counts.".to_string()),
            ..Default::default()
        };
        let keywords = LabelKeywords::new(["muscular", "als"]).unwrap();
        assert!(scan_label(&label, &keywords).is_none());

        let label = DrugLabel {
            warnings: Some("Worsening of ALS symptoms; muscular weakness.".to_string()),
            ..Default::default()
        };
        let hit = scan_label(&label, &keywords).unwrap();
        assert_eq!(hit.keyword, "muscular");
    }

    #[test]
    fn test_phrase_spans_line_breaks() {
        let label = DrugLabel {
            contraindications: Some("Patients with congestive heart\nfailure (NYHA III/IV).".to_string()),
            ..Default::default()
        };
        let keywords = LabelKeywords::new(["heart failure", ""]).unwrap();
        assert_eq!(keywords.terms().count(), 1);
        let hit = scan_label(&label, &keywords).unwrap();
        assert_eq!(hit.keyword, "heart failure");
        assert!(hit.excerpt.contains("heart failure"));
    }

    #[test]
    fn test_excerpt_window() {
        let text = format!("{} glaucoma {}", "a ".repeat(100), "b ".repeat(100));
        let pos = text.find("glaucoma").unwrap();
        let e = excerpt(&text, pos, "glaucoma".len());
        assert!(e.starts_with("..."));
        assert!(e.ends_with("..."));
        assert!(e.contains("glaucoma"));
        assert_eq!(excerpt("short glaucoma note", 6, 8), "short glaucoma note");
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let text = format!("{}é glaucoma", "é".repeat(60));
        let pos = text.find("glaucoma").unwrap();
        let e = excerpt(&text, pos, 8);
        assert!(e.contains("glaucoma"));
    }

    #[tokio::test]
    async fn test_cache_hits_include_absent_labels() {
        let cache = LabelCache::new();
        assert!(cache.get("aspirin").await.is_none());
        cache.insert("aspirin", None).await;
        assert_eq!(cache.get("aspirin").await, Some(None));
        assert_eq!(cache.len().await, 1);
        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_static_source_counts_calls() {
        let source = StaticLabelSource::new().with("Aspirin", DrugLabel::default());
        assert!(source.fetch_label("aspirin").await.unwrap().is_some());
        assert!(source.fetch_label("ibuprofen").await.unwrap().is_none());
        assert_eq!(source.calls(), 2);
    }
}
