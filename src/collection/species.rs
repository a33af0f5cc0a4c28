//! Per-species statistics over a sequence list
//!
//! A species is identified by its `Genus species` name. Sequences whose
//! names could not be parsed are counted separately and belong to no
//! species. A sequence has a "valid conspecific" when some other member of
//! its species shares at least the minimum overlap with it.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;

use crate::cancel::{CancellationToken, Outcome};
use crate::collection::list::SequenceList;
use crate::distance::{DistanceConfig, DistanceContext};
use crate::sequence::Sequence;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpeciesDetail {
    pub name: String,
    pub sequence_count: usize,
    /// Sequences shorter than the minimum overlap.
    pub short_sequence_count: usize,
    pub longest_length: usize,
    pub valid_conspecific_count: usize,
    pub accessions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpeciesSummary {
    pub sequence_count: usize,
    pub unnamed_count: usize,
    pub short_sequence_count: usize,
    pub sequences_with_valid_conspecifics: usize,
    /// Species with at least one member that has a valid conspecific.
    pub valid_species_count: usize,
    /// Keyed and iterated in alphabetical order.
    pub species: BTreeMap<String, SpeciesDetail>,
}

impl SpeciesSummary {
    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    pub fn species_names(&self) -> impl Iterator<Item = &str> {
        self.species.keys().map(String::as_str)
    }

    pub fn detail(&self, species: &str) -> Option<&SpeciesDetail> {
        self.species.get(species)
    }

    /// Every accession in the list, grouped by species.
    pub fn accessions(&self) -> Vec<&str> {
        self.species
            .values()
            .flat_map(|d| d.accessions.iter().map(String::as_str))
            .collect()
    }

    /// Compute the summary from scratch.
    pub fn compute(
        sequences: &[Arc<Sequence>],
        config: &DistanceConfig,
        token: &CancellationToken,
    ) -> Outcome<SpeciesSummary> {
        let mut summary = SpeciesSummary {
            sequence_count: sequences.len(),
            ..SpeciesSummary::default()
        };
        let mut groups: BTreeMap<String, Vec<&Arc<Sequence>>> = BTreeMap::new();

        for seq in sequences {
            let short = seq.actual_length() < config.minimum_overlap;
            if short {
                summary.short_sequence_count += 1;
            }

            let Some(name) = seq.species_name() else {
                summary.unnamed_count += 1;
                continue;
            };
            groups.entry(name).or_default().push(seq);
        }

        let mut comparisons = 0usize;
        for (name, members) in groups {
            let mut detail = SpeciesDetail {
                name: name.clone(),
                sequence_count: members.len(),
                ..SpeciesDetail::default()
            };

            for (i, seq) in members.iter().enumerate() {
                if token.is_cancelled() {
                    debug!("Species summary cancelled at {name}");
                    return Outcome::Cancelled;
                }
                detail.longest_length = detail.longest_length.max(seq.actual_length());
                if seq.actual_length() < config.minimum_overlap {
                    detail.short_sequence_count += 1;
                }
                if let Some(accession) = seq.accession() {
                    detail.accessions.push(accession.to_string());
                }

                let mut has_valid = false;
                for (j, other) in members.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    comparisons += 1;
                    if token.should_stop(comparisons) {
                        debug!("Species summary cancelled after {comparisons} comparisons");
                        return Outcome::Cancelled;
                    }
                    if seq.has_min_overlap(other, config) {
                        has_valid = true;
                        break;
                    }
                }
                if has_valid {
                    detail.valid_conspecific_count += 1;
                }
            }

            summary.sequences_with_valid_conspecifics += detail.valid_conspecific_count;
            if detail.valid_conspecific_count > 0 {
                summary.valid_species_count += 1;
            }
            summary.species.insert(name, detail);
        }

        Outcome::Completed(summary)
    }
}

impl SequenceList {
    /// Species summary under the context's current settings, cached on the
    /// list until it changes or the settings differ.
    pub fn species_summary(
        &mut self,
        ctx: &DistanceContext,
        token: &CancellationToken,
    ) -> Outcome<SpeciesSummary> {
        let config = ctx.config();
        if let Some(summary) = self.cached_summary(&config) {
            return Outcome::Completed(summary.clone());
        }

        let outcome = SpeciesSummary::compute(self.as_slice(), &config, token);
        if let Outcome::Completed(summary) = &outcome {
            self.store_summary(config, summary.clone());
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(minimum_overlap: usize) -> DistanceConfig {
        DistanceConfig {
            minimum_overlap,
            ..DistanceConfig::default()
        }
    }

    fn list() -> SequenceList {
        SequenceList::from_sequences(vec![
            Sequence::new("gi|1| Aus bus", "ACGTACGTAC").unwrap(),
            Sequence::new("gi|2| Aus bus", "ACGTACGTAA").unwrap(),
            Sequence::new("Aus bus", "AC").unwrap(),
            Sequence::new("gi|5| Cus dus", "ACGTACGTAC").unwrap(),
            Sequence::new("sample 12", "ACGTACGTAC").unwrap(),
        ])
    }

    #[test]
    fn test_summary_counts() {
        let list = list();
        let summary = SpeciesSummary::compute(list.as_slice(), &config(5), &CancellationToken::new())
            .completed()
            .unwrap();

        assert_eq!(summary.sequence_count, 5);
        assert_eq!(summary.species_count(), 2);
        assert_eq!(summary.unnamed_count, 1);
        assert_eq!(summary.short_sequence_count, 1);
        assert_eq!(summary.sequences_with_valid_conspecifics, 2);
        assert_eq!(summary.valid_species_count, 1);
        assert_eq!(summary.species_names().collect::<Vec<_>>(), vec!["Aus bus", "Cus dus"]);
        assert_eq!(summary.accessions(), vec!["1", "2", "5"]);

        let aus = summary.detail("Aus bus").unwrap();
        assert_eq!(aus.sequence_count, 3);
        assert_eq!(aus.longest_length, 10);
        assert_eq!(aus.short_sequence_count, 1);
    }

    #[test]
    fn test_summary_is_cached_until_mutation() {
        let mut list = list();
        let ctx = DistanceContext::new(config(5));
        let token = CancellationToken::new();

        let first = list.species_summary(&ctx, &token).completed().unwrap();
        token.cancel();
        let cached = list.species_summary(&ctx, &token);
        assert_eq!(cached, Outcome::Completed(first));

        list.add(Sequence::new("Eus fus", "ACGT").unwrap());
        assert!(list.species_summary(&ctx, &token).is_cancelled());
    }

    #[test]
    fn test_summary_cancelled_mid_run_releases_lock() {
        use crate::collection::SharedSequenceList;
        use std::thread;

        // nothing overlaps enough, so every member is compared with every other
        let members = (0..2000)
            .map(|i| Sequence::new(&format!("Aus bus {i}"), "ACGTACGTAC").unwrap())
            .collect::<Vec<_>>();
        let shared = SharedSequenceList::new(SequenceList::from_sequences(members));
        let token = CancellationToken::new();

        let worker = {
            let shared = shared.clone();
            let token = token.clone();
            thread::spawn(move || {
                let ctx = DistanceContext::new(config(50));
                let guard = shared.lock();
                let outcome = guard.borrow_mut().species_summary(&ctx, &token);
                outcome
            })
        };

        while !shared.is_locked() && !worker.is_finished() {
            thread::yield_now();
        }
        token.cancel();

        assert!(worker.join().unwrap().is_cancelled());
        assert!(!shared.is_locked());
        let guard = shared.try_lock().unwrap();
        assert!(guard.borrow().cached_summary(&config(50)).is_none());
    }

    #[test]
    fn test_summary_recomputed_for_new_settings() {
        let mut list = list();
        let ctx = DistanceContext::new(config(5));
        let token = CancellationToken::new();
        let before = list.species_summary(&ctx, &token).completed().unwrap();
        ctx.set_minimum_overlap(50);
        let after = list.species_summary(&ctx, &token).completed().unwrap();
        assert_eq!(before.sequences_with_valid_conspecifics, 2);
        assert_eq!(after.sequences_with_valid_conspecifics, 0);
        assert_eq!(after.short_sequence_count, 5);
    }
}
