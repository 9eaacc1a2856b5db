//! Two-layer contraindication filter.
//!
//! Per drug: withdrawn check, then Layer-1 rules for the canonical disease
//! key (name fragments across all rules first, then mechanism and class),
//! then, for drugs still unmatched, a Layer-2 label scan. Every candidate
//! ends up in exactly one of `safe` or `removed`.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use repurpose_common::{
    ContraindicationInfo, DrugCandidate, DrugLabel, FilterAction, FilterDecision, LabelSection,
    MatchSource, Result, SafetyConfig, Severity,
};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::label::{scan_label, LabelCache, LabelKeywords, LabelSource, OpenFdaLabelSource};
use crate::normalise::normalise_disease_name;
use crate::rules::{ContraindicationDb, ContraindicationRule, RuleCategory};

const DEFAULT_MAX_CONCURRENT: usize = 8;
const DEFAULT_LABEL_TIMEOUT: Duration = Duration::from_secs(10);

/// Words too generic to serve as label keywords on their own.
const GENERIC_TERMS: &[&str] = &[
    "disease", "disorder", "syndrome", "chronic", "acute", "mellitus", "stage", "primary",
    "secondary", "severe", "early", "onset", "juvenile", "adult", "cancer", "carcinoma",
    "multiple", "muscular", "lateral", "systemic", "progressive", "idiopathic", "congenital",
    "familial", "hereditary", "infantile", "type",
];

/// Shortest single-word curated term (name, key or alias) used as a keyword.
const MIN_TERM_LEN: usize = 4;
/// Shortest word taken from an unrecognised disease name.
const MIN_WORD_LEN: usize = 5;

fn is_significant(term: &str, min_len: usize) -> bool {
    term.contains(' ') || (term.chars().count() >= min_len && !GENERIC_TERMS.contains(&term))
}

/// The evidence behind a contraindication.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    /// Rule category key, label section name, or "withdrawn".
    pub rule: String,
    pub severity: Severity,
    pub reason: String,
    pub matched_on: MatchSource,
}

/// Result of one filter pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterOutcome {
    pub safe: Vec<DrugCandidate>,
    pub removed: Vec<DrugCandidate>,
    /// One per input candidate, in input order.
    pub decisions: Vec<FilterDecision>,
    pub canonical_key: Option<String>,
    /// Whether any drug went through a label lookup.
    pub labels_consulted: bool,
}

impl FilterOutcome {
    pub fn into_parts(self) -> (Vec<DrugCandidate>, Vec<DrugCandidate>) {
        (self.safe, self.removed)
    }
}

/// Severity assigned to a disease mention in a label section.
fn label_severity(section: LabelSection) -> Severity {
    match section {
        LabelSection::Contraindications
        | LabelSection::BoxedWarning
        | LabelSection::WarningsAndPrecautions
        | LabelSection::Warnings => Severity::Absolute,
    }
}

fn action_for(m: &RuleMatch, remove_absolute: bool, remove_relative: bool) -> FilterAction {
    match (m.matched_on, m.severity) {
        (MatchSource::Withdrawn, _) => FilterAction::Removed,
        (_, Severity::Absolute) if remove_absolute => FilterAction::Removed,
        (_, Severity::Relative) if remove_relative => FilterAction::Removed,
        _ => FilterAction::KeptWithWarning,
    }
}

/// Contraindication filter over a rule database and an optional label source.
pub struct SafetyFilter {
    db: ContraindicationDb,
    labels: Option<Arc<dyn LabelSource>>,
    cache: LabelCache,
    max_concurrent: usize,
    label_timeout: Duration,
}

impl Default for SafetyFilter {
    fn default() -> Self {
        Self::new(ContraindicationDb::default())
    }
}

impl SafetyFilter {
    /// Layer-1 filter over `db`; no label source.
    pub fn new(db: ContraindicationDb) -> Self {
        Self {
            db,
            labels: None,
            cache: LabelCache::new(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            label_timeout: DEFAULT_LABEL_TIMEOUT,
        }
    }

    /// Rules from `rules_path` (or the built-in database) and, when
    /// `label_lookup` is set, the OpenFDA label source.
    pub fn from_config(config: &SafetyConfig) -> Result<Self> {
        let db = match &config.rules_path {
            Some(path) => ContraindicationDb::from_yaml(path)?,
            None => ContraindicationDb::default(),
        };
        let mut filter = Self::new(db)
            .with_max_concurrent(config.max_concurrent_label_fetches)
            .with_label_timeout(Duration::from_secs(config.label_timeout_secs));
        if config.label_lookup {
            filter = filter.with_label_source(Arc::new(OpenFdaLabelSource::new(config)?));
        }
        Ok(filter)
    }

    pub fn with_label_source(mut self, source: Arc<dyn LabelSource>) -> Self {
        self.labels = Some(source);
        self
    }

    /// Share a cache between filters.
    pub fn with_cache(mut self, cache: LabelCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n.max(1);
        self
    }

    pub fn with_label_timeout(mut self, timeout: Duration) -> Self {
        self.label_timeout = timeout;
        self
    }

    pub fn db(&self) -> &ContraindicationDb {
        &self.db
    }

    pub fn cache(&self) -> &LabelCache {
        &self.cache
    }

    pub fn has_label_source(&self) -> bool {
        self.labels.is_some()
    }

    pub fn canonical_key(&self, disease_name: &str) -> Option<String> {
        self.db.canonical_key(disease_name).map(str::to_string)
    }

    /// Rule categories that apply to the disease: its canonical category,
    /// or every category whose key appears literally in the name.
    fn categories_for(&self, disease_name: &str) -> Vec<&RuleCategory> {
        match self.db.canonical_key(disease_name) {
            Some(key) => self.db.category(key).into_iter().collect(),
            None => self.db.literal_categories(disease_name),
        }
    }

    /// Withdrawn check then Layer-1 rules. No network.
    pub fn check(&self, candidate: &DrugCandidate, disease_name: &str) -> Option<RuleMatch> {
        let categories = self.categories_for(disease_name);
        self.check_rules(candidate, &categories)
    }

    fn check_rules(&self, candidate: &DrugCandidate, categories: &[&RuleCategory]) -> Option<RuleMatch> {
        let name = candidate.drug_name.trim().to_lowercase();

        if let Some(withdrawn) = self.db.withdrawn_match(&name) {
            return Some(RuleMatch {
                rule: "withdrawn".to_string(),
                severity: Severity::Absolute,
                reason: format!("{withdrawn} has been withdrawn from the market for safety reasons"),
                matched_on: MatchSource::Withdrawn,
            });
        }

        let hit = |key: &str, rule: &ContraindicationRule, source: MatchSource| RuleMatch {
            rule: key.to_string(),
            severity: rule.severity,
            reason: rule.reason.clone(),
            matched_on: source,
        };

        for category in categories {
            if let Some(rule) = category.rules.iter().find(|r| r.match_name(&name).is_some()) {
                return Some(hit(category.key.as_str(), rule, MatchSource::Name));
            }
        }

        let mechanism = candidate.mechanism.to_lowercase();
        let indication = candidate.original_indication.to_lowercase();
        for category in categories {
            for rule in &category.rules {
                if rule.match_mechanism(&mechanism).is_some() {
                    return Some(hit(category.key.as_str(), rule, MatchSource::Mechanism));
                }
                if rule.match_class(&indication, &mechanism).is_some() {
                    return Some(hit(category.key.as_str(), rule, MatchSource::Class));
                }
            }
        }
        None
    }

    /// Lower-cased terms a label must mention, as whole words, to implicate
    /// the disease. Single words shorter than four characters and generic
    /// modifiers are dropped, so "ALS" alone yields no keywords.
    pub fn disease_keywords(&self, disease_name: &str) -> Vec<String> {
        let name = normalise_disease_name(disease_name);
        let mut keywords = Vec::new();
        let mut seen = BTreeSet::new();
        let mut push = |k: &str, min_len: usize| {
            let k = k.trim();
            if is_significant(k, min_len) && seen.insert(k.to_string()) {
                keywords.push(k.to_string());
            }
        };

        push(&name, MIN_TERM_LEN);
        match self.db.canonical_key(&name) {
            Some(key) => {
                push(key, MIN_TERM_LEN);
                for alias in self.db.aliases_for(key) {
                    push(alias, MIN_TERM_LEN);
                }
            }
            None => {
                for word in name.split(|c: char| !c.is_alphanumeric() && c != '\'') {
                    push(word.trim_end_matches("'s"), MIN_WORD_LEN);
                }
            }
        }
        keywords
    }

    fn label_match(&self, label: &DrugLabel, keywords: &LabelKeywords) -> Option<RuleMatch> {
        let hit = scan_label(label, keywords)?;
        Some(RuleMatch {
            rule: hit.section.as_str().to_string(),
            severity: label_severity(hit.section),
            reason: format!("FDA label {} mentions '{}': {}", hit.section.as_str(), hit.keyword, hit.excerpt),
            matched_on: MatchSource::Label(hit.section),
        })
    }

    /// Layer-1 filter: `(safe, removed)`.
    pub fn filter(
        &self,
        candidates: Vec<DrugCandidate>,
        disease_name: &str,
        remove_absolute: bool,
        remove_relative: bool,
    ) -> (Vec<DrugCandidate>, Vec<DrugCandidate>) {
        self.filter_detailed(candidates, disease_name, remove_absolute, remove_relative)
            .into_parts()
    }

    /// Layer-1 filter with per-drug decisions.
    pub fn filter_detailed(
        &self,
        candidates: Vec<DrugCandidate>,
        disease_name: &str,
        remove_absolute: bool,
        remove_relative: bool,
    ) -> FilterOutcome {
        let categories = self.categories_for(disease_name);
        let matches: Vec<Option<RuleMatch>> = candidates
            .iter()
            .map(|c| self.check_rules(c, &categories))
            .collect();
        self.resolve(candidates, matches, disease_name, remove_absolute, remove_relative, false)
    }

    /// Both layers. Labels for drugs without a Layer-1 match are fetched
    /// concurrently, one task per distinct name, and awaited together
    /// before matching. A failed or timed-out fetch counts as no label.
    #[instrument(skip(self, candidates), fields(n = candidates.len()))]
    pub async fn filter_with_labels(
        &self,
        candidates: Vec<DrugCandidate>,
        disease_name: &str,
        remove_absolute: bool,
        remove_relative: bool,
    ) -> FilterOutcome {
        let categories = self.categories_for(disease_name);
        let mut matches: Vec<Option<RuleMatch>> = candidates
            .iter()
            .map(|c| self.check_rules(c, &categories))
            .collect();

        let unmatched: BTreeSet<String> = candidates
            .iter()
            .zip(&matches)
            .filter(|(_, m)| m.is_none())
            .map(|(c, _)| c.drug_name.trim().to_lowercase())
            .collect();

        let consulted = self.labels.is_some() && !unmatched.is_empty();
        if consulted {
            let labels = self.fetch_labels(unmatched).await;
            let keywords = match LabelKeywords::new(self.disease_keywords(disease_name)) {
                Ok(keywords) => keywords,
                Err(e) => {
                    warn!(disease = %disease_name, error = %e, "Unusable label keywords, skipping label scan");
                    LabelKeywords::default()
                }
            };
            if keywords.is_empty() {
                debug!(disease = %disease_name, "No significant disease terms for label scan");
            }
            for (candidate, slot) in candidates.iter().zip(matches.iter_mut()) {
                if slot.is_some() {
                    continue;
                }
                let name = candidate.drug_name.trim().to_lowercase();
                if let Some(label) = labels.get(&name) {
                    *slot = self.label_match(label, &keywords);
                }
            }
        }

        self.resolve(candidates, matches, disease_name, remove_absolute, remove_relative, consulted)
    }

    /// Labels by lower-cased name, from the cache or the label source.
    async fn fetch_labels(&self, names: BTreeSet<String>) -> HashMap<String, DrugLabel> {
        let mut found = HashMap::new();
        let Some(source) = &self.labels else {
            return found;
        };

        let mut pending = Vec::new();
        for name in names {
            match self.cache.get(&name).await {
                Some(Some(label)) => {
                    found.insert(name, label);
                }
                Some(None) => {}
                None => pending.push(name),
            }
        }
        if pending.is_empty() {
            return found;
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let handles = pending.iter().map(|name| {
            let source = Arc::clone(source);
            let semaphore = Arc::clone(&semaphore);
            let name = name.clone();
            let timeout = self.label_timeout;
            tokio::spawn(async move {
                let _permit = semaphore.acquire().await.ok();
                tokio::time::timeout(timeout, source.fetch_label(&name)).await
            })
        });
        let results = join_all(handles).await;

        for (name, joined) in pending.into_iter().zip(results) {
            match joined {
                Ok(Ok(Ok(label))) => {
                    debug!(drug = %name, found = label.is_some(), "Label lookup");
                    self.cache.insert(&name, label.clone()).await;
                    if let Some(label) = label {
                        found.insert(name, label);
                    }
                }
                Ok(Ok(Err(e))) => warn!(drug = %name, error = %e, "Label fetch failed, treating as no label"),
                Ok(Err(_)) => warn!(drug = %name, "Label fetch timed out, treating as no label"),
                Err(e) => warn!(drug = %name, error = %e, "Label fetch task failed, treating as no label"),
            }
        }
        found
    }

    fn resolve(
        &self,
        candidates: Vec<DrugCandidate>,
        matches: Vec<Option<RuleMatch>>,
        disease_name: &str,
        remove_absolute: bool,
        remove_relative: bool,
        labels_consulted: bool,
    ) -> FilterOutcome {
        let canonical_key = self.canonical_key(disease_name);
        if canonical_key.is_none() {
            warn!(disease = %disease_name, "No contraindication rules for disease, only withdrawn-drug checks apply");
        }

        let mut outcome = FilterOutcome {
            canonical_key,
            labels_consulted,
            ..Default::default()
        };

        for (mut candidate, matched) in candidates.into_iter().zip(matches) {
            let Some(m) = matched else {
                debug!(drug = %candidate.drug_name, "No contraindication found");
                outcome.decisions.push(FilterDecision::passed_through(&candidate));
                outcome.safe.push(candidate);
                continue;
            };

            let action = action_for(&m, remove_absolute, remove_relative);
            warn!(
                drug = %candidate.drug_name,
                disease = %disease_name,
                severity = %m.severity,
                rule = %m.rule,
                ?action,
                reason = %m.reason,
                "Contraindication"
            );

            candidate.safety_warning = Some(format!(
                "{} contraindication for {}: {}",
                capitalise(m.severity.as_str()),
                disease_name,
                m.reason
            ));
            candidate.contraindication = Some(ContraindicationInfo {
                severity: m.severity,
                reason: m.reason.clone(),
                matched_on: m.matched_on,
            });
            outcome.decisions.push(FilterDecision {
                drug_name: candidate.drug_name.clone(),
                drug_id: candidate.drug_id.clone(),
                matched_rule: Some(m.rule),
                severity: Some(m.severity),
                reason: Some(m.reason),
                matched_on: Some(m.matched_on),
                action,
            });

            match action {
                FilterAction::Removed => outcome.removed.push(candidate),
                _ => outcome.safe.push(candidate),
            }
        }

        info!(
            disease = %disease_name,
            safe = outcome.safe.len(),
            removed = outcome.removed.len(),
            labels = outcome.labels_consulted,
            "Safety filter complete"
        );
        outcome
    }
}

fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str) -> DrugCandidate {
        DrugCandidate::new(name, format!("ID-{name}")).unwrap()
    }

    #[test]
    fn test_haloperidol_parkinson_removed() {
        let filter = SafetyFilter::default();
        let (safe, removed) = filter.filter(vec![candidate("Haloperidol")], "Parkinson Disease", true, false);
        assert!(safe.is_empty());
        assert_eq!(removed.len(), 1);
        let info = removed[0].contraindication.as_ref().unwrap();
        assert_eq!(info.severity, Severity::Absolute);
        assert_eq!(info.matched_on, MatchSource::Name);
    }

    #[test]
    fn test_relative_kept_with_warning_by_default() {
        let filter = SafetyFilter::default();
        let out = filter.filter_detailed(vec![candidate("Donepezil")], "Parkinson's disease", true, false);
        assert_eq!(out.safe.len(), 1);
        assert!(out.safe[0].safety_warning.as_deref().unwrap().starts_with("Relative"));
        assert_eq!(out.decisions[0].action, FilterAction::KeptWithWarning);

        let out = filter.filter_detailed(vec![candidate("Donepezil")], "Parkinson's disease", true, true);
        assert_eq!(out.removed.len(), 1);
    }

    #[test]
    fn test_withdrawn_removed_even_without_rules() {
        let filter = SafetyFilter::default();
        let out = filter.filter_detailed(vec![candidate("Rofecoxib")], "Gaucher Disease", false, false);
        assert_eq!(out.removed.len(), 1);
        assert_eq!(out.decisions[0].matched_on, Some(MatchSource::Withdrawn));
        assert!(out.canonical_key.is_none());
    }

    #[test]
    fn test_name_match_not_shadowed_by_earlier_class_rule() {
        let db = ContraindicationDb::empty().with_category(
            "x",
            vec![
                ContraindicationRule::new(["placeholder"], "class rule", Severity::Relative)
                    .unwrap()
                    .with_drug_classes(["kinase inhibitor"]),
                ContraindicationRule::new(["nilotinib"], "name rule", Severity::Absolute).unwrap(),
            ],
        );
        let filter = SafetyFilter::new(db);
        let c = candidate("Nilotinib").with_mechanism("BCR-ABL kinase inhibitor");
        let m = filter.check(&c, "x").unwrap();
        assert_eq!(m.reason, "name rule");
        assert_eq!(m.matched_on, MatchSource::Name);
    }

    #[test]
    fn test_mechanism_and_class_matching() {
        let filter = SafetyFilter::default();
        let c = candidate("Newdrug").with_mechanism("Potent D2 antagonist");
        assert_eq!(filter.check(&c, "Parkinson Disease").unwrap().matched_on, MatchSource::Mechanism);

        let c = candidate("Otherdrug").with_indication("Nausea (antiemetic)");
        assert_eq!(filter.check(&c, "Parkinson Disease").unwrap().matched_on, MatchSource::Class);
    }

    #[test]
    fn test_every_candidate_lands_once() {
        let filter = SafetyFilter::default();
        let input = vec![candidate("Haloperidol"), candidate("Levodopa"), candidate("Donepezil"), candidate("Cerivastatin")];
        let out = filter.filter_detailed(input, "Parkinson Disease", true, false);
        assert_eq!(out.safe.len() + out.removed.len(), 4);
        assert_eq!(out.decisions.len(), 4);
        let safe: Vec<_> = out.safe.iter().map(|c| c.drug_name.as_str()).collect();
        assert_eq!(safe, vec!["Levodopa", "Donepezil"]);
    }

    #[test]
    fn test_disease_keywords() {
        let filter = SafetyFilter::default();
        let kw = filter.disease_keywords("Parkinson Disease");
        assert_eq!(kw[0], "parkinson disease");
        assert!(kw.contains(&"parkinson".to_string()));
        assert!(kw.contains(&"parkinsonism".to_string()));

        let kw = filter.disease_keywords("Gaucher's Disease");
        assert!(kw.contains(&"gaucher".to_string()));
        assert!(!kw.contains(&"disease".to_string()));
    }

    #[test]
    fn test_disease_keywords_drop_short_and_generic_terms() {
        let filter = SafetyFilter::default();
        assert!(filter.disease_keywords("ALS").is_empty());
        assert_eq!(filter.disease_keywords("Gout"), vec!["gout", "gouty arthritis"]);

        let kw = filter.disease_keywords("Duchenne Muscular Dystrophy");
        assert_eq!(kw, vec!["duchenne muscular dystrophy", "duchenne", "dystrophy"]);

        let kw = filter.disease_keywords("Multiple Myeloma");
        assert_eq!(kw, vec!["multiple myeloma", "myeloma"]);
    }

    #[test]
    fn test_without_label_source_matches_layer_one() {
        let filter = SafetyFilter::default();
        let input = vec![candidate("Propranolol"), candidate("Montelukast")];
        let out = tokio_test::block_on(filter.filter_with_labels(input.clone(), "Asthma", true, false));
        let sync = filter.filter_detailed(input, "Asthma", true, false);
        assert!(!out.labels_consulted);
        assert_eq!(out.decisions, sync.decisions);
        assert_eq!(out.removed[0].drug_name, "Propranolol");
    }

    #[test]
    fn test_label_severity_is_absolute() {
        for section in LabelSection::SCAN_ORDER {
            assert_eq!(label_severity(section), Severity::Absolute);
        }
    }
}
