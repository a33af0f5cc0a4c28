//! Ordered, sortable container of sequences
//!
//! Every structural change resets the sort order to [`SortOrder::Unsorted`]
//! and drops the species index and any cached species summary. Distances
//! are keyed by sequence identity, so the distance cache is untouched.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::debug;
use rand::Rng;

use crate::collection::conspecific::ConspecificCursor;
use crate::collection::species::SpeciesSummary;
use crate::distance::DistanceConfig;
use crate::sequence::{Sequence, SequenceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Unsorted,
    ByName,
    BySize,
    ByAccession,
    ByFamily,
    ByAmbiguityFraction,
    Random,
    RandomWithinSpecies,
}

impl SortOrder {
    /// Random orders reshuffle every time they are requested.
    pub fn is_random(self) -> bool {
        matches!(self, SortOrder::Random | SortOrder::RandomWithinSpecies)
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortOrder::Unsorted => "unsorted",
            SortOrder::ByName => "by name",
            SortOrder::BySize => "by size",
            SortOrder::ByAccession => "by accession",
            SortOrder::ByFamily => "by family",
            SortOrder::ByAmbiguityFraction => "by ambiguity",
            SortOrder::Random => "random",
            SortOrder::RandomWithinSpecies => "random within species",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default, Clone)]
pub struct SequenceList {
    sequences: Vec<Arc<Sequence>>,
    sort_order: SortOrder,
    species_index: Option<HashMap<String, usize>>,
    summary: Option<(DistanceConfig, SpeciesSummary)>,
    modified: bool,
}

impl SequenceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sequences<I, S>(sequences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<Sequence>>,
    {
        Self {
            sequences: sequences.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Sequence>> {
        self.sequences.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Sequence>> {
        self.sequences.iter()
    }

    pub fn as_slice(&self) -> &[Arc<Sequence>] {
        &self.sequences
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_clean(&mut self) {
        self.modified = false;
    }

    pub fn add(&mut self, sequence: impl Into<Arc<Sequence>>) {
        self.sequences.push(sequence.into());
        self.touch();
    }

    /// Insert at `index`, clamped to the end of the list.
    pub fn insert(&mut self, index: usize, sequence: impl Into<Arc<Sequence>>) {
        let index = index.min(self.sequences.len());
        self.sequences.insert(index, sequence.into());
        self.touch();
    }

    pub fn extend<I, S>(&mut self, sequences: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<Sequence>>,
    {
        self.sequences.extend(sequences.into_iter().map(Into::into));
        self.touch();
    }

    /// Remove the member with the same identity as `sequence`.
    pub fn remove(&mut self, sequence: &Sequence) -> Option<Arc<Sequence>> {
        let index = self.index_of(sequence.id())?;
        self.remove_at(index)
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Arc<Sequence>> {
        if index >= self.sequences.len() {
            return None;
        }
        let removed = self.sequences.remove(index);
        self.touch();
        Some(removed)
    }

    /// Replace the member at `index`, returning the old one.
    pub fn set(&mut self, index: usize, sequence: impl Into<Arc<Sequence>>) -> Option<Arc<Sequence>> {
        let slot = self.sequences.get_mut(index)?;
        let old = std::mem::replace(slot, sequence.into());
        self.touch();
        Some(old)
    }

    pub fn clear(&mut self) {
        self.sequences.clear();
        self.touch();
    }

    pub fn contains(&self, sequence: &Sequence) -> bool {
        self.index_of(sequence.id()).is_some()
    }

    pub fn index_of(&self, id: SequenceId) -> Option<usize> {
        self.sequences.iter().position(|s| s.id() == id)
    }

    /// Length of the longest member, 0 when empty.
    pub fn max_length(&self) -> usize {
        self.sequences.iter().map(|s| s.len()).max().unwrap_or(0)
    }

    /// Sort into `order`, returning the previous order.
    ///
    /// Already being in `order` is a no-op, except for the random orders,
    /// which always reshuffle.
    pub fn resort(&mut self, order: SortOrder) -> SortOrder {
        self.resort_with_rng(order, &mut rand::thread_rng())
    }

    pub fn resort_with_rng<R: Rng + ?Sized>(&mut self, order: SortOrder, rng: &mut R) -> SortOrder {
        let previous = self.sort_order;
        if previous == order && !order.is_random() {
            return previous;
        }

        match order {
            SortOrder::Unsorted => {}
            SortOrder::ByName => self.sequences.sort_by(|a, b| a.cmp_by_name(b)),
            SortOrder::BySize => self.sequences.sort_by(|a, b| a.cmp_by_size(b)),
            SortOrder::ByAccession => self.sequences.sort_by(|a, b| a.cmp_by_accession(b)),
            SortOrder::ByFamily => self.sequences.sort_by(|a, b| a.cmp_by_family(b)),
            SortOrder::ByAmbiguityFraction => self.sequences.sort_by(|a, b| a.cmp_by_ambiguity(b)),
            SortOrder::Random => {
                let mut keyed = self.take_keyed(rng);
                keyed.sort_by_key(|(key, _)| *key);
                self.sequences = keyed.into_iter().map(|(_, s)| s).collect();
            }
            SortOrder::RandomWithinSpecies => {
                let mut keyed: Vec<(String, u64, Arc<Sequence>)> = self
                    .take_keyed(rng)
                    .into_iter()
                    .map(|(key, s)| (s.species_name().unwrap_or_default(), key, s))
                    .collect();
                keyed.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
                self.sequences = keyed.into_iter().map(|(_, _, s)| s).collect();
            }
        }

        debug!("Sorted {} sequences {order} (was {previous})", self.sequences.len());
        self.sort_order = order;
        self.species_index = None;
        previous
    }

    /// Walk every member of `species`, sorting the list by name first.
    pub fn conspecific_iterator(&mut self, species: &str) -> ConspecificCursor<'_> {
        ConspecificCursor::new(self, species)
    }

    /// Position of the first member of `species`. Only meaningful once the
    /// list is sorted by name; builds the index on first use.
    pub(crate) fn species_start(&mut self, species: &str) -> Option<usize> {
        let sequences = &self.sequences;
        let index = self.species_index.get_or_insert_with(|| {
            let mut index = HashMap::new();
            for (i, seq) in sequences.iter().enumerate() {
                if let Some(name) = seq.species_name() {
                    index.entry(name).or_insert(i);
                }
            }
            index
        });
        index.get(species).copied()
    }

    /// Removal from the cursor: order is preserved, derived data is dropped.
    pub(crate) fn remove_in_order(&mut self, index: usize) -> Arc<Sequence> {
        let removed = self.sequences.remove(index);
        self.species_index = None;
        self.summary = None;
        self.modified = true;
        removed
    }

    pub(crate) fn cached_summary(&self, config: &DistanceConfig) -> Option<&SpeciesSummary> {
        match &self.summary {
            Some((computed_under, summary)) if same_summary_config(computed_under, config) => {
                Some(summary)
            }
            _ => None,
        }
    }

    pub(crate) fn store_summary(&mut self, config: DistanceConfig, summary: SpeciesSummary) {
        self.summary = Some((config, summary));
    }

    fn take_keyed<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<(u64, Arc<Sequence>)> {
        std::mem::take(&mut self.sequences)
            .into_iter()
            .map(|s| (rng.gen::<u64>(), s))
            .collect()
    }

    fn touch(&mut self) {
        self.sort_order = SortOrder::Unsorted;
        self.species_index = None;
        self.summary = None;
        self.modified = true;
    }
}

fn same_summary_config(a: &DistanceConfig, b: &DistanceConfig) -> bool {
    a.minimum_overlap == b.minimum_overlap && a.metric == b.metric
}

impl<'a> IntoIterator for &'a SequenceList {
    type Item = &'a Arc<Sequence>;
    type IntoIter = std::slice::Iter<'a, Arc<Sequence>>;

    fn into_iter(self) -> Self::IntoIter {
        self.sequences.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn named(name: &str, bases: &str) -> Sequence {
        Sequence::new(name, bases).unwrap()
    }

    fn sample() -> SequenceList {
        SequenceList::from_sequences(vec![
            named("Cus dus", "ACGT"),
            named("Aus bus", "ACGTACGT"),
            named("Bus cus", "ACNNNC"),
            named("Aus bus", "AC"),
        ])
    }

    fn names(list: &SequenceList) -> Vec<String> {
        list.iter().map(|s| s.full_name().to_string()).collect()
    }

    #[test]
    fn test_resort_by_name_groups_species() {
        let mut list = sample();
        let previous = list.resort(SortOrder::ByName);
        assert_eq!(previous, SortOrder::Unsorted);
        assert_eq!(names(&list), vec!["Aus bus", "Aus bus", "Bus cus", "Cus dus"]);
        assert_eq!(list.sort_order(), SortOrder::ByName);
    }

    #[test]
    fn test_resort_by_size_and_ambiguity() {
        let mut list = sample();
        list.resort(SortOrder::BySize);
        let lengths: Vec<usize> = list.iter().map(|s| s.actual_length()).collect();
        assert_eq!(lengths, vec![8, 6, 4, 2]);

        list.resort(SortOrder::ByAmbiguityFraction);
        assert_eq!(list.get(0).unwrap().full_name(), "Bus cus");
    }

    #[test]
    fn test_mutation_resets_order() {
        let mut list = sample();
        list.resort(SortOrder::ByName);
        list.add(named("Dus eus", "ACGT"));
        assert_eq!(list.sort_order(), SortOrder::Unsorted);
        assert!(list.is_modified());
        list.mark_clean();
        assert!(!list.is_modified());
    }

    #[test]
    fn test_random_always_reshuffles() {
        let mut list = SequenceList::from_sequences((0..30).map(|i| named(&format!("Aus s{i}"), "ACGT")));
        let mut rng = StdRng::seed_from_u64(7);
        list.resort_with_rng(SortOrder::Random, &mut rng);
        let first = names(&list);
        let previous = list.resort_with_rng(SortOrder::Random, &mut rng);
        assert_eq!(previous, SortOrder::Random);
        assert_ne!(names(&list), first);
        assert_eq!(list.len(), 30);
    }

    #[test]
    fn test_random_within_species_keeps_groups() {
        let mut list = SequenceList::new();
        for i in 0..5 {
            list.add(named(&format!("Bus cus {i}"), "ACGT"));
            list.add(named(&format!("Aus bus {i}"), "ACGT"));
        }
        let mut rng = StdRng::seed_from_u64(11);
        list.resort_with_rng(SortOrder::RandomWithinSpecies, &mut rng);
        let species: Vec<String> = list.iter().map(|s| s.species_name().unwrap()).collect();
        assert!(species[..5].iter().all(|s| s == "Aus bus"));
        assert!(species[5..].iter().all(|s| s == "Bus cus"));
    }

    #[test]
    fn test_membership_operations() {
        let mut list = sample();
        let extra = Arc::new(named("Eus fus", "ACGTT"));
        list.insert(1, Arc::clone(&extra));
        assert_eq!(list.index_of(extra.id()), Some(1));
        assert!(list.contains(&extra));
        assert_eq!(list.max_length(), 8);

        let removed = list.remove(&extra).unwrap();
        assert_eq!(removed.id(), extra.id());
        assert!(!list.contains(&extra));

        let old = list.set(0, named("Fus gus", "A")).unwrap();
        assert_eq!(old.full_name(), "Cus dus");
        assert!(list.remove_at(10).is_none());

        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.max_length(), 0);
    }

    #[test]
    fn test_species_start() {
        let mut list = sample();
        list.resort(SortOrder::ByName);
        assert_eq!(list.species_start("Aus bus"), Some(0));
        assert_eq!(list.species_start("Bus cus"), Some(2));
        assert_eq!(list.species_start("Zus zus"), None);
    }
}
