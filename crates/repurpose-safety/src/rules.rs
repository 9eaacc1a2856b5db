//! Static contraindication rule database.
//!
//! Rules are grouped under canonical disease keys. A database is built once
//! (the curated built-in tables, or a YAML file) and is read-only afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use repurpose_common::{RepurposeError, Result, Severity};
use serde::{Deserialize, Serialize};

use crate::normalise::{longest_fragment, normalise_disease_name};

/// One contraindication: drugs (by name, mechanism or class fragment) that
/// should not be given for the disease of the enclosing category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContraindicationRule {
    #[serde(default)]
    pub drug_names: Vec<String>,
    #[serde(default)]
    pub mechanisms: Vec<String>,
    #[serde(default)]
    pub drug_classes: Vec<String>,
    pub reason: String,
    pub severity: Severity,
}

fn fragments<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ContraindicationRule {
    /// A rule matching drugs by name fragment. Requires at least one
    /// non-blank fragment and a reason.
    pub fn new<I, S>(drug_names: I, reason: impl Into<String>, severity: Severity) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rule = Self {
            drug_names: fragments(drug_names),
            mechanisms: Vec::new(),
            drug_classes: Vec::new(),
            reason: reason.into(),
            severity,
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn with_mechanisms<I, S>(mut self, mechanisms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.mechanisms.extend(fragments(mechanisms));
        self
    }

    pub fn with_drug_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.drug_classes.extend(fragments(classes));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.reason.trim().is_empty() {
            return Err(RepurposeError::InvalidRecord(
                "contraindication rule requires a reason".to_string(),
            ));
        }
        let has_fragment = self
            .drug_names
            .iter()
            .chain(&self.mechanisms)
            .chain(&self.drug_classes)
            .any(|f| !f.trim().is_empty());
        if !has_fragment {
            return Err(RepurposeError::InvalidRecord(format!(
                "contraindication rule '{}' has no drug fragments",
                self.reason
            )));
        }
        Ok(())
    }

    /// First name fragment contained in the lower-cased drug name.
    pub fn match_name(&self, drug_name: &str) -> Option<&str> {
        first_contained(&self.drug_names, drug_name)
    }

    /// First mechanism fragment contained in the lower-cased mechanism text.
    pub fn match_mechanism(&self, mechanism: &str) -> Option<&str> {
        first_contained(&self.mechanisms, mechanism)
    }

    /// First class fragment found in the indication or the mechanism text.
    pub fn match_class(&self, indication: &str, mechanism: &str) -> Option<&str> {
        self.drug_classes
            .iter()
            .find(|c| (!indication.is_empty() && indication.contains(c.as_str()))
                || (!mechanism.is_empty() && mechanism.contains(c.as_str())))
            .map(String::as_str)
    }

    fn normalised(mut self) -> Self {
        self.drug_names = fragments(&self.drug_names);
        self.mechanisms = fragments(&self.mechanisms);
        self.drug_classes = fragments(&self.drug_classes);
        self
    }
}

fn first_contained<'a>(needles: &'a [String], haystack: &str) -> Option<&'a str> {
    if haystack.is_empty() {
        return None;
    }
    needles
        .iter()
        .find(|n| !n.is_empty() && haystack.contains(n.as_str()))
        .map(String::as_str)
}

/// Rules for one canonical disease key, in match order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCategory {
    pub key: String,
    pub rules: Vec<ContraindicationRule>,
}

/// Contraindication rules, disease aliases and withdrawn drugs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContraindicationDb {
    #[serde(default)]
    categories: Vec<RuleCategory>,
    /// alias fragment → canonical key
    #[serde(default)]
    aliases: BTreeMap<String, String>,
    #[serde(default)]
    withdrawn: BTreeSet<String>,
}

impl ContraindicationDb {
    /// Build and validate a database. Keys, aliases and withdrawn names are
    /// lower-cased.
    pub fn new(
        categories: Vec<RuleCategory>,
        aliases: BTreeMap<String, String>,
        withdrawn: BTreeSet<String>,
    ) -> Result<Self> {
        let db = Self {
            categories: categories
                .into_iter()
                .map(|c| RuleCategory {
                    key: normalise_disease_name(&c.key),
                    rules: c.rules.into_iter().map(ContraindicationRule::normalised).collect(),
                })
                .collect(),
            aliases: aliases
                .into_iter()
                .map(|(fragment, key)| (normalise_disease_name(&fragment), normalise_disease_name(&key)))
                .collect(),
            withdrawn: withdrawn
                .into_iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        };
        db.validate()?;
        Ok(db)
    }

    /// Empty database: no rules, no aliases, nothing withdrawn.
    pub fn empty() -> Self {
        Self {
            categories: Vec::new(),
            aliases: BTreeMap::new(),
            withdrawn: BTreeSet::new(),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let raw: ContraindicationDb = serde_yaml::from_str(yaml)?;
        Self::new(raw.categories, raw.aliases, raw.withdrawn)
    }

    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for category in &self.categories {
            if category.key.is_empty() {
                return Err(RepurposeError::Config("rule category with empty key".to_string()));
            }
            if !seen.insert(category.key.as_str()) {
                return Err(RepurposeError::Config(format!(
                    "duplicate rule category '{}'",
                    category.key
                )));
            }
            for rule in &category.rules {
                rule.validate()?;
            }
        }
        for (fragment, key) in &self.aliases {
            if fragment.is_empty() {
                return Err(RepurposeError::Config(format!("empty alias for '{key}'")));
            }
            if !seen.contains(key.as_str()) {
                return Err(RepurposeError::Config(format!(
                    "alias '{fragment}' points at unknown category '{key}'"
                )));
            }
        }
        Ok(())
    }

    /// Add (or replace) a category.
    pub fn with_category(mut self, key: &str, rules: Vec<ContraindicationRule>) -> Self {
        let key = normalise_disease_name(key);
        let rules: Vec<_> = rules.into_iter().map(ContraindicationRule::normalised).collect();
        match self.categories.iter_mut().find(|c| c.key == key) {
            Some(existing) => existing.rules = rules,
            None => self.categories.push(RuleCategory { key, rules }),
        }
        self
    }

    pub fn with_alias(mut self, fragment: &str, key: &str) -> Self {
        self.aliases.insert(normalise_disease_name(fragment), normalise_disease_name(key));
        self
    }

    pub fn with_withdrawn(mut self, drug_name: &str) -> Self {
        self.withdrawn.insert(drug_name.trim().to_lowercase());
        self
    }

    pub fn categories(&self) -> &[RuleCategory] {
        &self.categories
    }

    pub fn category(&self, key: &str) -> Option<&RuleCategory> {
        self.categories.iter().find(|c| c.key == key)
    }

    /// Canonical key for a free-text disease name. An exact key match wins,
    /// otherwise the longest alias fragment contained in the name.
    pub fn canonical_key(&self, disease_name: &str) -> Option<&str> {
        let name = normalise_disease_name(disease_name);
        if let Some(category) = self.category(&name) {
            return Some(category.key.as_str());
        }
        longest_fragment(
            &name,
            self.aliases.iter().map(|(f, k)| (f.as_str(), k.as_str())),
        )
    }

    /// Categories whose key appears literally in the disease name.
    pub fn literal_categories(&self, disease_name: &str) -> Vec<&RuleCategory> {
        let name = normalise_disease_name(disease_name);
        self.categories
            .iter()
            .filter(|c| name.contains(c.key.as_str()))
            .collect()
    }

    /// Alias fragments that resolve to `key`.
    pub fn aliases_for<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.aliases
            .iter()
            .filter(move |(_, k)| k.as_str() == key)
            .map(|(f, _)| f.as_str())
    }

    /// Withdrawn entry contained in the lower-cased drug name.
    pub fn withdrawn_match(&self, drug_name: &str) -> Option<&str> {
        self.withdrawn
            .iter()
            .find(|w| drug_name.contains(w.as_str()))
            .map(String::as_str)
    }

    pub fn withdrawn(&self) -> &BTreeSet<String> {
        &self.withdrawn
    }
}

// ── Built-in tables ─────────────────────────────────────────────────────────

fn rule(names: &[&str], mechanisms: &[&str], classes: &[&str], reason: &str, severity: Severity) -> ContraindicationRule {
    ContraindicationRule {
        drug_names: fragments(names),
        mechanisms: fragments(mechanisms),
        drug_classes: fragments(classes),
        reason: reason.to_string(),
        severity,
    }
}

const WITHDRAWN_DRUGS: &[&str] = &[
    "rofecoxib",
    "valdecoxib",
    "lumiracoxib",
    "cerivastatin",
    "troglitazone",
    "sibutramine",
    "dexfenfluramine",
    "terfenadine",
    "astemizole",
    "cisapride",
    "pemoline",
];

const DISEASE_ALIASES: &[(&str, &str)] = &[
    ("parkinson", "parkinson"),
    ("parkinsons", "parkinson"),
    ("parkinson's", "parkinson"),
    ("parkinson disease", "parkinson"),
    ("parkinson's disease", "parkinson"),
    ("parkinsonism", "parkinson"),
    ("alzheimer", "alzheimer"),
    ("alzheimer's disease", "alzheimer"),
    ("alzheimers", "alzheimer"),
    ("dementia", "dementia"),
    ("diabetes type 1", "diabetes type 1"),
    ("type 1 diabetes", "diabetes type 1"),
    ("type i diabetes", "diabetes type 1"),
    ("diabetes mellitus type 1", "diabetes type 1"),
    ("insulin-dependent diabetes", "diabetes type 1"),
    ("juvenile diabetes", "diabetes type 1"),
    ("t1dm", "diabetes type 1"),
    ("diabetes type 2", "diabetes type 2"),
    ("type 2 diabetes", "diabetes type 2"),
    ("type ii diabetes", "diabetes type 2"),
    ("diabetes mellitus type 2", "diabetes type 2"),
    ("non-insulin-dependent diabetes", "diabetes type 2"),
    ("t2dm", "diabetes type 2"),
    ("asthma", "asthma"),
    ("heart failure", "heart failure"),
    ("cardiac failure", "heart failure"),
    ("congestive heart failure", "heart failure"),
    ("glaucoma", "glaucoma"),
    ("epilepsy", "epilepsy"),
    ("epileptic", "epilepsy"),
    ("seizure", "seizure"),
    ("myasthenia gravis", "myasthenia gravis"),
    ("myasthenia", "myasthenia gravis"),
    ("depression", "depression"),
    ("depressive disorder", "depression"),
    ("gout", "gout"),
    ("gouty arthritis", "gout"),
    ("hypertension", "hypertension"),
    ("high blood pressure", "hypertension"),
    ("cirrhosis", "cirrhosis"),
    ("liver disease", "liver disease"),
    ("hepatic disease", "liver disease"),
    ("hepatic impairment", "liver disease"),
    ("kidney disease", "kidney disease"),
    ("renal disease", "kidney disease"),
    ("renal impairment", "kidney disease"),
    ("renal failure", "kidney disease"),
    ("kidney failure", "kidney disease"),
    ("chronic kidney disease", "chronic kidney disease"),
    ("chronic renal disease", "chronic kidney disease"),
];

fn builtin_categories() -> Vec<RuleCategory> {
    use Severity::{Absolute, Relative};

    let category = |key: &str, rules: Vec<ContraindicationRule>| RuleCategory { key: key.to_string(), rules };

    vec![
        category("parkinson", vec![
            rule(
                &["haloperidol", "chlorpromazine", "perphenazine", "fluphenazine", "olanzapine",
                  "risperidone", "quetiapine", "aripiprazole", "ziprasidone", "paliperidone",
                  "asenapine", "lurasidone", "metoclopramide", "prochlorperazine", "promethazine"],
                &["dopamine antagonist", "d2 antagonist", "dopamine receptor antagonist",
                  "blocks dopamine", "antidopaminergic"],
                &["antipsychotic", "neuroleptic", "typical antipsychotic", "atypical antipsychotic",
                  "antiemetic"],
                "Blocks dopamine receptors - directly worsens Parkinson's motor symptoms",
                Absolute,
            ),
            rule(
                &["donepezil", "rivastigmine", "galantamine"],
                &["acetylcholinesterase inhibitor", "increases acetylcholine"],
                &["anticholinesterase", "cholinesterase inhibitor"],
                "May worsen tremor and motor symptoms",
                Relative,
            ),
            rule(
                &["cinnarizine", "flunarizine"],
                &["calcium channel antagonist"],
                &["calcium channel blocker"],
                "Can cause or worsen parkinsonism",
                Absolute,
            ),
        ]),
        category("alzheimer", vec![
            rule(
                &["diphenhydramine", "atropine", "scopolamine", "benztropine", "oxybutynin",
                  "tolterodine", "amitriptyline", "doxepin", "hydroxyzine", "meclizine",
                  "promethazine"],
                &["anticholinergic", "blocks acetylcholine", "antimuscarinic", "muscarinic antagonist"],
                &["anticholinergic", "antimuscarinic", "tricyclic antidepressant"],
                "Worsens cognitive impairment and memory",
                Absolute,
            ),
            rule(
                &["diazepam", "lorazepam", "alprazolam", "clonazepam", "temazepam"],
                &["gaba agonist", "benzodiazepine receptor agonist"],
                &["benzodiazepine"],
                "Increases confusion, falls, and cognitive decline",
                Relative,
            ),
        ]),
        category("dementia", vec![
            rule(
                &["diphenhydramine", "hydroxyzine", "oxybutynin", "tolterodine", "benztropine",
                  "trihexyphenidyl"],
                &["anticholinergic", "antimuscarinic"],
                &["anticholinergic", "antimuscarinic"],
                "Worsens cognitive impairment",
                Absolute,
            ),
        ]),
        category("diabetes type 1", vec![
            rule(
                &["prednisone", "dexamethasone", "methylprednisolone", "hydrocortisone"],
                &["glucocorticoid", "corticosteroid"],
                &["corticosteroid", "glucocorticoid"],
                "Causes severe hyperglycemia and ketoacidosis risk",
                Absolute,
            ),
        ]),
        category("diabetes type 2", vec![
            rule(
                &["prednisone", "dexamethasone", "methylprednisolone"],
                &["glucocorticoid", "increases blood glucose"],
                &["corticosteroid", "glucocorticoid"],
                "Significantly worsens glycemic control",
                Relative,
            ),
            rule(
                &["hydrochlorothiazide", "chlorthalidone"],
                &["thiazide diuretic"],
                &["thiazide diuretic"],
                "Can worsen glucose control",
                Relative,
            ),
            rule(
                &["olanzapine", "clozapine"],
                &[],
                &[],
                "Causes marked weight gain, insulin resistance and severe hyperglycemia",
                Absolute,
            ),
        ]),
        category("asthma", vec![
            rule(
                &["propranolol", "nadolol", "timolol", "carvedilol", "labetalol"],
                &["beta blocker", "beta-adrenergic antagonist", "blocks beta receptors"],
                &["beta blocker", "beta-blocker", "non-selective beta blocker"],
                "Can cause life-threatening bronchospasm",
                Absolute,
            ),
            rule(
                &["aspirin", "ibuprofen", "naproxen", "ketorolac"],
                &["cox inhibitor", "cyclooxygenase inhibitor"],
                &["nsaid"],
                "Can trigger asthma attacks in aspirin-sensitive patients",
                Relative,
            ),
        ]),
        category("heart failure", vec![
            rule(
                &["ibuprofen", "naproxen", "celecoxib", "diclofenac", "indomethacin"],
                &["cox inhibitor", "prostaglandin inhibitor"],
                &["nsaid", "cox-2 inhibitor"],
                "Causes fluid retention and worsens heart failure",
                Absolute,
            ),
            rule(
                &["pioglitazone", "rosiglitazone"],
                &["ppar gamma agonist"],
                &["thiazolidinedione", "glitazone"],
                "Causes significant fluid retention",
                Absolute,
            ),
        ]),
        category("glaucoma", vec![
            rule(
                &["atropine", "scopolamine", "ipratropium", "tiotropium"],
                &["anticholinergic", "antimuscarinic"],
                &["anticholinergic", "antimuscarinic"],
                "Increases intraocular pressure - can cause acute angle-closure glaucoma",
                Absolute,
            ),
        ]),
        category("epilepsy", vec![
            rule(
                &["clozapine", "chlorpromazine"],
                &["lowers seizure threshold"],
                &["antipsychotic"],
                "Significantly lowers seizure threshold",
                Absolute,
            ),
        ]),
        category("seizure", vec![
            rule(
                &["clozapine", "chlorpromazine", "bupropion"],
                &["lowers seizure threshold"],
                &["antipsychotic", "tricyclic antidepressant"],
                "Increases seizure risk",
                Absolute,
            ),
        ]),
        category("myasthenia gravis", vec![
            rule(
                &["gentamicin", "tobramycin", "ciprofloxacin", "levofloxacin", "vecuronium",
                  "rocuronium"],
                &["neuromuscular blockade", "impairs neuromuscular transmission"],
                &["aminoglycoside", "fluoroquinolone", "neuromuscular blocker"],
                "Can cause myasthenic crisis - life-threatening",
                Absolute,
            ),
        ]),
        category("depression", vec![
            rule(
                &["prednisone", "dexamethasone"],
                &["glucocorticoid"],
                &["corticosteroid"],
                "Can worsen depression and cause mood changes",
                Relative,
            ),
        ]),
        category("gout", vec![
            rule(
                &["hydrochlorothiazide", "furosemide"],
                &["increases uric acid"],
                &["thiazide diuretic", "loop diuretic"],
                "Increases uric acid levels and triggers gout attacks",
                Relative,
            ),
        ]),
        category("hypertension", vec![
            rule(
                &["ibuprofen", "naproxen", "celecoxib"],
                &["cox inhibitor"],
                &["nsaid"],
                "Increases blood pressure and reduces antihypertensive efficacy",
                Relative,
            ),
        ]),
        category("cirrhosis", vec![
            rule(
                &["ibuprofen", "naproxen", "aspirin"],
                &["cox inhibitor"],
                &["nsaid"],
                "Increases bleeding risk with portal hypertension",
                Absolute,
            ),
        ]),
        category("liver disease", vec![
            rule(
                &["ibuprofen", "naproxen"],
                &["cox inhibitor"],
                &["nsaid"],
                "Hepatotoxic and increases bleeding risk",
                Relative,
            ),
        ]),
        category("kidney disease", vec![
            rule(
                &["ibuprofen", "naproxen", "ketorolac"],
                &["cox inhibitor", "prostaglandin inhibitor"],
                &["nsaid"],
                "Nephrotoxic - can cause acute kidney injury",
                Absolute,
            ),
        ]),
        category("chronic kidney disease", vec![
            rule(
                &["ibuprofen", "naproxen"],
                &["cox inhibitor"],
                &["nsaid"],
                "Accelerates kidney function decline",
                Absolute,
            ),
        ]),
    ]
}

impl Default for ContraindicationDb {
    fn default() -> Self {
        Self {
            categories: builtin_categories(),
            aliases: DISEASE_ALIASES
                .iter()
                .map(|(fragment, key)| (fragment.to_string(), key.to_string()))
                .collect(),
            withdrawn: WITHDRAWN_DRUGS.iter().map(|w| w.to_string()).collect(),
        }
    }
}
