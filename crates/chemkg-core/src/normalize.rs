//! Ingestion-boundary normalization.
//!
//! Raw extraction output spells the same idea many ways ("CFT",
//! "crystal field theory", "Crystal  Field Theory"). Every name is mapped
//! to one canonical form here, once, before it reaches the graph.

use crate::record::ExtractionRecord;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

const TOPIC_ALIASES: &[(&str, &str)] = &[
    ("coordination compounds", "Coordination Chemistry"),
    ("coordination chemistry", "Coordination Chemistry"),
    ("coordination compound", "Coordination Chemistry"),
    ("metal complexes", "Coordination Chemistry"),
    ("solid state chemistry", "Solid State Chemistry"),
    ("solid-state chemistry", "Solid State Chemistry"),
    ("inorganic solid state chemistry", "Solid State Chemistry"),
    ("electrochemistry", "Electrochemistry"),
    ("electrochemical reactions", "Electrochemistry"),
    ("redox reactions and electrochemistry", "Electrochemistry"),
    ("main group chemistry", "Main Group Chemistry"),
    ("main group elements", "Main Group Chemistry"),
    ("chemical bonding", "Chemical Bonding"),
    ("molecular structure and bonding", "Chemical Bonding"),
    ("molecular orbital theory", "Molecular Orbital Theory"),
    ("mo theory", "Molecular Orbital Theory"),
    ("crystal field theory", "Crystal Field Theory"),
    ("ligand field theory", "Crystal Field Theory"),
    ("cft", "Crystal Field Theory"),
    ("lft", "Crystal Field Theory"),
    ("group theory and molecular symmetry", "Symmetry And Group Theory"),
    ("symmetry and molecular structure", "Symmetry And Group Theory"),
    ("periodic trends", "Periodic Trends"),
    ("periodic trends and atomic properties", "Periodic Trends"),
    ("acid-base chemistry", "Acid-Base Chemistry"),
    ("acids and bases", "Acid-Base Chemistry"),
    ("quantum mechanics", "Quantum Mechanics"),
    ("quantum mechanics in chemistry", "Quantum Mechanics"),
    ("biological inorganic chemistry", "Bioinorganic Chemistry"),
    ("uv-visible spectroscopy", "Spectroscopy"),
];

const GARBAGE_TOPICS: &[&str] = &[
    "inorganic chemistry",
    "inorganic chemistry fundamentals",
    "textbook introduction and publication information",
    "textbook introduction and publisher information",
    "applications in everyday life",
    "history of inorganic chemistry",
];

const CONCEPT_ALIASES: &[(&str, &str)] = &[
    ("cft", "Crystal Field Theory"),
    ("cfse", "Crystal Field Stabilization Energy"),
    ("lfse", "Ligand Field Stabilization Energy"),
    ("d orbital splitting", "d-orbital splitting"),
    ("oxidation states", "oxidation state"),
    ("oxidation number", "oxidation state"),
    ("electronic configuration", "electron configuration"),
    ("electron configurations", "electron configuration"),
    ("ionisation energy", "ionization energy"),
    ("molecular orbital theory", "Molecular Orbital Theory"),
    ("mo theory", "Molecular Orbital Theory"),
    ("homo", "HOMO"),
    ("lumo", "LUMO"),
    ("octahedral", "octahedral geometry"),
    ("tetrahedral", "tetrahedral geometry"),
    ("square planar", "square planar geometry"),
    ("hybridisation", "hybridization"),
];

const GARBAGE_CONCEPTS: &[&str] = &[
    "energy",
    "structure",
    "properties",
    "elements",
    "compounds",
    "reactions",
    "atoms",
    "molecules",
    "chemistry",
    "symbol",
    "molar mass",
    "atomic number",
    "c2",
    "c3",
];

const PREREQUISITE_ALIASES: &[(&str, &str)] = &[
    ("understanding of periodic trends", "Periodic Trends"),
    ("basic periodic trends", "Periodic Trends"),
    ("electronic configuration", "Electron Configuration"),
    ("basic knowledge of atomic structure", "Atomic Structure"),
    ("coordination chemistry basics", "Coordination Chemistry Fundamentals"),
    ("basic coordination chemistry", "Coordination Chemistry Fundamentals"),
    ("coordination chemistry", "Coordination Chemistry Fundamentals"),
    ("redox reactions", "Redox Chemistry"),
    ("oxidation-reduction reactions", "Redox Chemistry"),
    ("understanding of oxidation states", "Oxidation States"),
    ("understanding of ionic bonding", "Ionic Bonding"),
    ("crystal field theory basics", "Crystal Field Theory"),
    ("basic cft", "Crystal Field Theory"),
    ("hybridization concepts", "Hybridization"),
    ("acid-base reactions", "Acid-Base Chemistry"),
];

/// Alias and filter tables for the normalizer.
///
/// Keys are compared after [`normalize_text`]. Entries given in
/// configuration extend the built-in tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default)]
    pub topic_aliases: HashMap<String, String>,
    #[serde(default)]
    pub concept_aliases: HashMap<String, String>,
    #[serde(default)]
    pub prerequisite_aliases: HashMap<String, String>,
    #[serde(default)]
    pub garbage_topics: Vec<String>,
    #[serde(default)]
    pub garbage_concepts: Vec<String>,
    /// Replace the built-in tables instead of extending them.
    #[serde(default)]
    pub replace_builtin: bool,
    /// Concepts shorter than this many characters are dropped.
    #[serde(default = "default_min_concept_len")]
    pub min_concept_len: usize,
}

fn default_min_concept_len() -> usize {
    2
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            topic_aliases: HashMap::new(),
            concept_aliases: HashMap::new(),
            prerequisite_aliases: HashMap::new(),
            garbage_topics: Vec::new(),
            garbage_concepts: Vec::new(),
            replace_builtin: false,
            min_concept_len: default_min_concept_len(),
        }
    }
}

/// A record after normalization, with names in canonical form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRecord {
    pub chunk_id: String,
    pub topic: Option<String>,
    pub concepts: Vec<String>,
    pub prerequisites: Vec<String>,
    pub leads_to: Vec<String>,
    /// Names removed as empty or garbage.
    pub dropped: usize,
}

/// Maps raw names to canonical ids.
#[derive(Debug, Clone)]
pub struct Normalizer {
    topic_aliases: HashMap<String, String>,
    concept_aliases: HashMap<String, String>,
    prerequisite_aliases: HashMap<String, String>,
    garbage_topics: HashSet<String>,
    garbage_concepts: HashSet<String>,
    min_concept_len: usize,
}

/// Lowercase, trim, and collapse internal whitespace.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Capitalize the first letter of every word, lowercasing the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.trim().chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = !ch.is_alphanumeric();
        }
    }
    out
}

fn table(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Normalizer {
    pub fn new() -> Self {
        Self::with_config(&NormalizerConfig::default())
    }

    pub fn with_config(config: &NormalizerConfig) -> Self {
        let builtin = !config.replace_builtin;
        let mut normalizer = Self {
            topic_aliases: if builtin { table(TOPIC_ALIASES) } else { HashMap::new() },
            concept_aliases: if builtin { table(CONCEPT_ALIASES) } else { HashMap::new() },
            prerequisite_aliases: if builtin {
                table(PREREQUISITE_ALIASES)
            } else {
                HashMap::new()
            },
            garbage_topics: if builtin {
                GARBAGE_TOPICS.iter().map(|s| s.to_string()).collect()
            } else {
                HashSet::new()
            },
            garbage_concepts: if builtin {
                GARBAGE_CONCEPTS.iter().map(|s| s.to_string()).collect()
            } else {
                HashSet::new()
            },
            min_concept_len: config.min_concept_len.max(1),
        };

        for (k, v) in &config.topic_aliases {
            normalizer.topic_aliases.insert(normalize_text(k), v.clone());
        }
        for (k, v) in &config.concept_aliases {
            normalizer.concept_aliases.insert(normalize_text(k), v.clone());
        }
        for (k, v) in &config.prerequisite_aliases {
            normalizer
                .prerequisite_aliases
                .insert(normalize_text(k), v.clone());
        }
        normalizer
            .garbage_topics
            .extend(config.garbage_topics.iter().map(|s| normalize_text(s)));
        normalizer
            .garbage_concepts
            .extend(config.garbage_concepts.iter().map(|s| normalize_text(s)));
        normalizer
    }

    /// Canonical topic name, or `None` if empty or garbage.
    pub fn topic(&self, raw: &str) -> Option<String> {
        let key = normalize_text(raw);
        if key.is_empty() || self.garbage_topics.contains(&key) {
            return None;
        }
        Some(
            self.topic_aliases
                .get(&key)
                .cloned()
                .unwrap_or_else(|| title_case(&collapse(raw))),
        )
    }

    /// Canonical concept name, or `None` if empty, garbage, too short or numeric.
    pub fn concept(&self, raw: &str) -> Option<String> {
        let key = normalize_text(raw);
        if key.chars().count() < self.min_concept_len
            || self.garbage_concepts.contains(&key)
            || key.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        Some(
            self.concept_aliases
                .get(&key)
                .cloned()
                .unwrap_or_else(|| collapse(raw)),
        )
    }

    /// Canonical prerequisite name, or `None` if empty.
    pub fn prerequisite(&self, raw: &str) -> Option<String> {
        let key = normalize_text(raw);
        if key.is_empty() {
            return None;
        }
        Some(
            self.prerequisite_aliases
                .get(&key)
                .or_else(|| self.topic_aliases.get(&key))
                .cloned()
                .unwrap_or_else(|| title_case(&collapse(raw))),
        )
    }

    /// Normalize every name in a record, deduplicating within it.
    pub fn record(&self, record: &ExtractionRecord) -> NormalizedRecord {
        let mut dropped = 0;

        let topic = match record.topic.as_deref() {
            Some(raw) => {
                let t = self.topic(raw);
                if t.is_none() {
                    dropped += 1;
                }
                t
            }
            None => None,
        };

        let mut collect = |names: &[String], f: &dyn Fn(&str) -> Option<String>| {
            let mut out: Vec<String> = Vec::new();
            for raw in names {
                match f(raw) {
                    Some(name) if !out.contains(&name) => out.push(name),
                    Some(_) => {}
                    None => dropped += 1,
                }
            }
            out
        };

        let concepts = collect(&record.key_concepts, &|s| self.concept(s));
        let prerequisites = collect(&record.prerequisites, &|s| self.prerequisite(s));
        let leads_to = collect(&record.leads_to, &|s| self.topic(s));

        NormalizedRecord {
            chunk_id: record.chunk_id.trim().to_string(),
            topic,
            concepts,
            prerequisites,
            leads_to,
            dropped,
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_collapses_whitespace() {
        assert_eq!(normalize_text("  Crystal   Field\tTheory "), "crystal field theory");
    }

    #[test]
    fn title_case_handles_hyphens() {
        assert_eq!(title_case("acid-base chemistry"), "Acid-Base Chemistry");
        assert_eq!(title_case("d-ORBITAL splitting"), "D-Orbital Splitting");
    }

    #[test]
    fn topics_map_through_aliases_and_drop_garbage() {
        let n = Normalizer::new();
        assert_eq!(n.topic("CFT").as_deref(), Some("Crystal Field Theory"));
        assert_eq!(n.topic("  thermodynamics ").as_deref(), Some("Thermodynamics"));
        assert_eq!(n.topic("Inorganic Chemistry"), None);
        assert_eq!(n.topic("   "), None);
    }

    #[test]
    fn concepts_filter_short_numeric_and_generic() {
        let n = Normalizer::new();
        assert_eq!(n.concept("3"), None);
        assert_eq!(n.concept("123"), None);
        assert_eq!(n.concept("a"), None);
        assert_eq!(n.concept("Energy"), None);
        assert_eq!(n.concept("CFSE").as_deref(), Some("Crystal Field Stabilization Energy"));
        assert_eq!(n.concept("Jahn-Teller  effect").as_deref(), Some("Jahn-Teller effect"));
    }

    #[test]
    fn short_canonical_concepts_survive_by_default() {
        let n = Normalizer::new();
        assert_eq!(n.concept("K1").as_deref(), Some("K1"));
        assert_eq!(n.concept("pH").as_deref(), Some("pH"));
        assert_eq!(n.concept("42"), None);
    }

    #[test]
    fn min_concept_len_is_configurable() {
        let config = NormalizerConfig {
            min_concept_len: 3,
            ..NormalizerConfig::default()
        };
        let n = Normalizer::with_config(&config);
        assert_eq!(n.concept("K1"), None);
        assert_eq!(n.concept("CFSE").as_deref(), Some("Crystal Field Stabilization Energy"));
    }

    #[test]
    fn record_dedupes_and_counts_drops() {
        let n = Normalizer::new();
        let raw = ExtractionRecord::new(" c1 ")
            .with_topic("cft")
            .with_concepts(["CFSE", "cfse", "energy", "spin state"])
            .with_prerequisites(["basic cft", "electronic configuration"]);
        let rec = n.record(&raw);
        assert_eq!(rec.chunk_id, "c1");
        assert_eq!(rec.topic.as_deref(), Some("Crystal Field Theory"));
        assert_eq!(
            rec.concepts,
            vec!["Crystal Field Stabilization Energy".to_string(), "spin state".to_string()]
        );
        assert_eq!(
            rec.prerequisites,
            vec!["Crystal Field Theory".to_string(), "Electron Configuration".to_string()]
        );
        assert_eq!(rec.dropped, 1);
    }

    #[test]
    fn config_extends_builtin_tables() {
        let mut config = NormalizerConfig::default();
        config.topic_aliases.insert("MOT".into(), "Molecular Orbital Theory".into());
        config.garbage_concepts.push("Stuff".into());
        let n = Normalizer::with_config(&config);
        assert_eq!(n.topic("mot").as_deref(), Some("Molecular Orbital Theory"));
        assert_eq!(n.concept("stuff"), None);
        assert_eq!(n.topic("cft").as_deref(), Some("Crystal Field Theory"));
    }
}
