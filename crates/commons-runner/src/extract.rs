//! Substrate-specific extraction of agents and objects from observations.
//!
//! Which objects matter, and how they are named in observation strings,
//! depends on the substrate. The perception pipeline therefore talks to
//! a small capability interface, [`ObjectExtractor`], instead of
//! branching on a substrate name. [`HarvestExtractor`] is the
//! implementation for the shared-resource harvesting substrate.

use std::collections::{BTreeMap, BTreeSet};

use commons_types::Position;

/// Extracts known agents and known objects from raw observation strings.
pub trait ObjectExtractor {
    /// Display names of agents mentioned in the observations.
    fn extract_agents(&self, observations: &[String]) -> BTreeSet<String>;

    /// Objects mentioned in the observations, grouped by class, as
    /// `(id, position-string)` pairs with set semantics.
    fn extract_objects(
        &self,
        observations: &[String],
    ) -> BTreeMap<String, BTreeSet<(String, String)>>;
}

/// Extractor for the shared-resource harvesting substrate.
///
/// Observation strings follow the shapes
/// `"Observed an apple at position (3, 4)"`,
/// `"Observed grass to grow apples at position (5, 5)"`, and
/// `"Observed agent Kora at position (2, 1)"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HarvestExtractor;

impl HarvestExtractor {
    /// Create the harvest extractor.
    pub const fn new() -> Self {
        Self
    }
}

impl ObjectExtractor for HarvestExtractor {
    fn extract_agents(&self, observations: &[String]) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for observation in observations {
            let mut tokens = observation.split_whitespace().peekable();
            while let Some(token) = tokens.next() {
                if !token.eq_ignore_ascii_case("agent") {
                    continue;
                }
                let Some(&candidate) = tokens.peek() else {
                    continue;
                };
                let name: String = candidate
                    .chars()
                    .filter(|c| c.is_alphanumeric())
                    .collect();
                if !name.is_empty() && name.chars().next().is_some_and(char::is_uppercase)
                {
                    names.insert(name);
                }
            }
        }
        names
    }

    fn extract_objects(
        &self,
        observations: &[String],
    ) -> BTreeMap<String, BTreeSet<(String, String)>> {
        let mut objects: BTreeMap<String, BTreeSet<(String, String)>> = BTreeMap::new();

        for observation in observations {
            let lowered = observation.to_lowercase();
            let Some(position) = Position::parse_embedded(observation) else {
                continue;
            };
            // Agent sightings are tracked by the known-agents set, not
            // the object registry.
            if lowered.contains("agent") {
                continue;
            }

            // Grass first: grass observations mention the apples they
            // will grow.
            let class = if lowered.contains("grass") {
                "grass"
            } else if lowered.contains("apple") {
                "apple"
            } else {
                continue;
            };

            let id = format!("{}:{}", position.row, position.col);
            objects
                .entry(String::from(class))
                .or_default()
                .insert((id, position.to_string()));
        }

        objects
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn observations(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| String::from(*t)).collect()
    }

    #[test]
    fn agents_extracted_by_name() {
        let extractor = HarvestExtractor::new();
        let names = extractor.extract_agents(&observations(&[
            "Observed agent Kora at position (2, 1)",
            "Observed agent Zev at position (4, 4)",
            "Observed an apple at position (1, 1)",
        ]));
        assert_eq!(names.len(), 2);
        assert!(names.contains("Kora"));
        assert!(names.contains("Zev"));
    }

    #[test]
    fn agent_names_deduplicate_and_strip_punctuation() {
        let extractor = HarvestExtractor::new();
        let names = extractor.extract_agents(&observations(&[
            "Observed agent Kora, holding an apple",
            "agent Kora at position (2, 1)",
        ]));
        assert_eq!(names.len(), 1);
        assert!(names.contains("Kora"));
    }

    #[test]
    fn lowercase_word_after_agent_is_not_a_name() {
        let extractor = HarvestExtractor::new();
        let names = extractor
            .extract_agents(&observations(&["an agent moved out of sight"]));
        assert!(names.is_empty());
    }

    #[test]
    fn objects_grouped_by_class() {
        let extractor = HarvestExtractor::new();
        let objects = extractor.extract_objects(&observations(&[
            "Observed an apple at position (2, 3)",
            "Observed an apple at position (2, 4)",
            "Observed grass to grow apples at position (5, 5)",
        ]));
        assert_eq!(
            objects.get("apple").map(BTreeSet::len),
            Some(2)
        );
        assert_eq!(
            objects.get("grass").map(BTreeSet::len),
            Some(1)
        );
    }

    #[test]
    fn repeated_sightings_collapse() {
        let extractor = HarvestExtractor::new();
        let objects = extractor.extract_objects(&observations(&[
            "Observed an apple at position (2, 3)",
            "Observed an apple at position (2, 3)",
        ]));
        assert_eq!(objects.get("apple").map(BTreeSet::len), Some(1));
    }

    #[test]
    fn positionless_or_agent_observations_are_skipped() {
        let extractor = HarvestExtractor::new();
        let objects = extractor.extract_objects(&observations(&[
            "an apple somewhere to the north",
            "Observed agent Kora at position (2, 1)",
        ]));
        assert!(objects.is_empty());
    }
}
