//! Cursor over the members of one species.

use std::sync::Arc;

use crate::collection::list::{SequenceList, SortOrder};
use crate::error::{Result, TaxonError};
use crate::sequence::Sequence;

/// Yields every sequence whose species name equals the requested one.
///
/// Creating the cursor sorts the list by name so conspecifics are
/// adjacent. [`ConspecificCursor::remove`] drops the element most recently
/// yielded; calling it twice without an intervening `next()` is an error.
pub struct ConspecificCursor<'a> {
    list: &'a mut SequenceList,
    species: String,
    next: usize,
    last: Option<usize>,
}

impl<'a> ConspecificCursor<'a> {
    pub(crate) fn new(list: &'a mut SequenceList, species: &str) -> Self {
        list.resort(SortOrder::ByName);
        let next = list.species_start(species).unwrap_or(list.len());
        Self {
            list,
            species: species.to_string(),
            next,
            last: None,
        }
    }

    pub fn species(&self) -> &str {
        &self.species
    }

    /// Remove the element returned by the last call to `next()`.
    pub fn remove(&mut self) -> Result<Arc<Sequence>> {
        let index = self.last.take().ok_or_else(|| {
            TaxonError::IteratorState(format!(
                "remove() on the '{}' cursor without a preceding next()",
                self.species
            ))
        })?;
        let removed = self.list.remove_in_order(index);
        self.next = index;
        Ok(removed)
    }
}

impl Iterator for ConspecificCursor<'_> {
    type Item = Arc<Sequence>;

    fn next(&mut self) -> Option<Self::Item> {
        let candidate = self.list.get(self.next)?;
        if candidate.species_name().as_deref() != Some(self.species.as_str()) {
            self.last = None;
            return None;
        }
        let item = Arc::clone(candidate);
        self.last = Some(self.next);
        self.next += 1;
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_1a_5b_2c() -> SequenceList {
        let mut list = SequenceList::new();
        list.add(Sequence::new("Bus bus 1", "ACGT").unwrap());
        list.add(Sequence::new("Aus aus", "ACGT").unwrap());
        list.add(Sequence::new("Cus cus 1", "ACGT").unwrap());
        for i in 2..=5 {
            list.add(Sequence::new(&format!("Bus bus {i}"), "ACGT").unwrap());
        }
        list.add(Sequence::new("Cus cus 2", "ACGT").unwrap());
        list
    }

    #[test]
    fn test_yields_exactly_the_species() {
        let mut list = list_1a_5b_2c();
        let members: Vec<_> = list.conspecific_iterator("Bus bus").collect();
        assert_eq!(members.len(), 5);
        assert!(members.iter().all(|s| s.species_name().as_deref() == Some("Bus bus")));

        assert_eq!(list.conspecific_iterator("Aus aus").count(), 1);
        assert_eq!(list.conspecific_iterator("Cus cus").count(), 2);
        assert_eq!(list.conspecific_iterator("Dus dus").count(), 0);
    }

    #[test]
    fn test_remove_down_to_zero() {
        let mut list = list_1a_5b_2c();
        {
            let mut cursor = list.conspecific_iterator("Bus bus");
            let mut removed = 0;
            while cursor.next().is_some() {
                cursor.remove().unwrap();
                removed += 1;
            }
            assert_eq!(removed, 5);
        }
        assert_eq!(list.len(), 3);
        assert_eq!(list.conspecific_iterator("Bus bus").count(), 0);
        assert_eq!(list.conspecific_iterator("Cus cus").count(), 2);
    }

    #[test]
    fn test_remove_every_other() {
        let mut list = list_1a_5b_2c();
        {
            let mut cursor = list.conspecific_iterator("Bus bus");
            let mut keep = false;
            while cursor.next().is_some() {
                if !keep {
                    cursor.remove().unwrap();
                }
                keep = !keep;
            }
        }
        assert_eq!(list.conspecific_iterator("Bus bus").count(), 2);
    }

    #[test]
    fn test_double_remove_is_an_error() {
        let mut list = list_1a_5b_2c();
        let mut cursor = list.conspecific_iterator("Bus bus");
        assert!(matches!(cursor.remove(), Err(TaxonError::IteratorState(_))));
        cursor.next();
        assert!(cursor.remove().is_ok());
        assert!(matches!(cursor.remove(), Err(TaxonError::IteratorState(_))));
    }
}
