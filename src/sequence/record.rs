//! The [`Sequence`] record: identity, parsed name, encoded symbols and statistics

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::distance::{engine, DistanceConfig, DistanceContext, DistanceMetric};
use crate::error::{Result, TaxonError};
use crate::sequence::codec::{self, SymbolClass, EXTERNAL_GAP, INTERNAL_GAP, MISSING};
use crate::sequence::name::TaxonName;

/// Most gap symbols [`Sequence::subsequence`] pads past the end.
const MAX_SUBSEQUENCE_PADDING: usize = 1 << 24;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique sequence identity. Never derived from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceId(u64);

impl SequenceId {
    fn next() -> Self {
        SequenceId(NEXT_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An aligned DNA sequence.
///
/// Content is fixed once built; anything that changes the symbols produces
/// a new `Sequence` with a new [`SequenceId`]. Renaming and user properties
/// keep the identity. `clone()` keeps the identity too; use
/// [`Sequence::duplicate`] for an independent copy.
#[derive(Debug, Clone)]
pub struct Sequence {
    id: SequenceId,
    name: TaxonName,
    symbols: Vec<u8>,
    ambiguous: usize,
    properties: HashMap<String, String>,
}

impl Sequence {
    /// Build a sequence from raw text.
    ///
    /// The text is trimmed and uppercased, `(..)`/`[..]` groups are folded
    /// into single ambiguity codes, and leading/trailing runs of `-` become
    /// external gaps. `_` is reserved and rejected, as is anything outside
    /// the IUPAC alphabet (including RNA `U`).
    pub fn new(name: &str, raw: &str) -> Result<Sequence> {
        let upper = raw.trim().to_ascii_uppercase();

        if let Some(index) = upper.chars().position(|c| c == EXTERNAL_GAP as char) {
            return Err(TaxonError::malformed(
                name,
                index,
                "'_' is reserved for external gaps and cannot appear in input",
            ));
        }

        let mut symbols = codec::fold_ambiguity_groups(&upper)
            .map_err(|(index, detail)| TaxonError::malformed(name, index, detail))?;

        let mut ambiguous = 0;
        for (index, &ch) in symbols.iter().enumerate() {
            match codec::classify(ch) {
                SymbolClass::Invalid if ch == b'U' => {
                    return Err(TaxonError::malformed(
                        name,
                        index,
                        "'U' found: RNA sequences are not accepted",
                    ));
                }
                SymbolClass::Invalid => {
                    return Err(TaxonError::malformed(
                        name,
                        index,
                        format!("illegal character '{}'", ch as char),
                    ));
                }
                SymbolClass::Ambiguous => ambiguous += 1,
                _ => {}
            }
        }

        mark_external_gaps(&mut symbols);

        let expected = folded_length(&upper);
        if symbols.len() != expected {
            return Err(TaxonError::InvariantViolation(format!(
                "sequence '{name}' encoded to {} symbols, expected {expected}",
                symbols.len()
            )));
        }

        Ok(Sequence {
            id: SequenceId::next(),
            name: TaxonName::parse(name),
            symbols,
            ambiguous,
            properties: HashMap::new(),
        })
    }

    /// A sequence of `len` missing symbols.
    pub fn empty(name: &str, len: usize) -> Sequence {
        Sequence {
            id: SequenceId::next(),
            name: TaxonName::parse(name),
            symbols: vec![MISSING; len],
            ambiguous: 0,
            properties: HashMap::new(),
        }
    }

    /// Same name, content and properties under a new identity.
    pub fn duplicate(&self) -> Sequence {
        Sequence {
            id: SequenceId::next(),
            ..self.clone()
        }
    }

    pub fn id(&self) -> SequenceId {
        self.id
    }

    /// Replace the name and re-parse it. The identity is unchanged.
    pub fn rename(&mut self, name: &str) {
        self.name = TaxonName::parse(name);
    }

    pub fn taxon(&self) -> &TaxonName {
        &self.name
    }

    pub fn full_name(&self) -> &str {
        self.name.full()
    }

    pub fn display_name(&self) -> String {
        self.name.display_name()
    }

    pub fn shortened_name(&self, max: usize) -> String {
        self.name.shortened(max)
    }

    pub fn species_name(&self) -> Option<String> {
        self.name.species_name()
    }

    pub fn genus(&self) -> &str {
        self.name.genus()
    }

    pub fn family(&self) -> &str {
        self.name.family()
    }

    pub fn accession(&self) -> Option<&str> {
        self.name.accession()
    }

    pub fn needs_review(&self) -> bool {
        self.name.needs_review()
    }

    pub fn set_needs_review(&mut self, flag: bool) {
        self.name.set_needs_review(flag);
    }

    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbols that are neither external gaps nor missing data.
    pub fn actual_length(&self) -> usize {
        self.symbols
            .iter()
            .filter(|&&ch| ch != EXTERNAL_GAP && ch != MISSING)
            .count()
    }

    pub fn ambiguous_count(&self) -> usize {
        self.ambiguous
    }

    /// Ambiguous symbols as a share of [`Sequence::actual_length`].
    pub fn ambiguity_fraction(&self) -> f64 {
        match self.actual_length() {
            0 => 0.0,
            n => self.ambiguous as f64 / n as f64,
        }
    }

    pub fn count_internal_gaps(&self) -> usize {
        self.symbols.iter().filter(|&&ch| ch == INTERNAL_GAP).count()
    }

    /// Occurrences of one symbol (case-insensitive).
    pub fn count_bases(&self, ch: char) -> usize {
        let Some(target) = u8::try_from(ch.to_ascii_uppercase()).ok() else {
            return 0;
        };
        self.symbols.iter().filter(|&&c| c == target).count()
    }

    /// Index of the first symbol that is not a gap or missing.
    pub fn first_real_character(&self) -> Option<usize> {
        self.symbols.iter().position(|&ch| is_real(ch))
    }

    pub fn last_real_character(&self) -> Option<usize> {
        self.symbols.iter().rposition(|&ch| is_real(ch))
    }

    /// The symbols as text, external gaps written as `-`.
    pub fn sequence_string(&self) -> String {
        self.symbols
            .iter()
            .map(|&ch| if ch == EXTERNAL_GAP { '-' } else { ch as char })
            .collect()
    }

    /// The symbols as text, external gaps kept as `_`.
    pub fn sequence_with_external_gaps(&self) -> String {
        self.symbols.iter().map(|&ch| ch as char).collect()
    }

    /// [`Sequence::sequence_string`] broken into lines of `width`.
    pub fn wrapped(&self, width: usize) -> String {
        let text = self.sequence_string();
        if width == 0 {
            return text;
        }
        text.as_bytes()
            .chunks(width)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Text with every ambiguity code spelled out, e.g. `R` as `[AG]`.
    pub fn expanded(&self, begin: char, end: char) -> String {
        let mut out = String::with_capacity(self.symbols.len() + self.ambiguous * 4);
        for &ch in &self.symbols {
            codec::push_expanded(&mut out, ch, begin, end);
        }
        out
    }

    /// Extract `from..=to`, 1-based.
    ///
    /// When `to < from` the coordinates are swapped and the reverse
    /// complement is returned. Coordinates past the end are padded with
    /// gaps, up to 2^24 of them.
    pub fn subsequence(&self, from: usize, to: usize) -> Result<Sequence> {
        let (start, end, reverse) = if to < from {
            (to, from, true)
        } else {
            (from, to, false)
        };

        if start < 1 || end.saturating_sub(self.symbols.len()) > MAX_SUBSEQUENCE_PADDING {
            return Err(TaxonError::NoSuchSubsequence { from, to });
        }

        let wanted = end - start + 1;
        let available = self.symbols.len().min(end);
        let mut piece: Vec<u8> = if start <= available {
            self.symbols[start - 1..available]
                .iter()
                .map(|&ch| if ch == EXTERNAL_GAP { INTERNAL_GAP } else { ch })
                .collect()
        } else {
            Vec::new()
        };
        piece.resize(wanted, INTERNAL_GAP);

        if reverse {
            piece = piece
                .iter()
                .rev()
                .map(|&ch| codec::complement(ch).unwrap_or(ch))
                .collect();
        }

        let name = format!("{}(segment:{from}-{to}:inclusive)", self.full_name());
        let text = String::from_utf8_lossy(&piece);
        let mut result = Sequence::new(&name, &text)?;
        result.properties = self.properties.clone();
        Ok(result)
    }

    /// This sequence followed by `other`, rebuilt through the normal
    /// construction path so boundary gaps are re-evaluated.
    pub fn concat(&self, other: &Sequence) -> Result<Sequence> {
        let mut text = self.expanded('[', ']');
        text.push_str(&other.expanded('[', ']'));
        let mut result = Sequence::new(self.full_name(), &text)?;
        result.properties = self.properties.clone();
        Ok(result)
    }

    /// Position-wise consensus. The shorter sequence is padded with missing data.
    pub fn consensus(&self, other: &Sequence) -> Result<Sequence> {
        let len = self.len().max(other.len());
        let symbol_at = |seq: &Sequence, i: usize| seq.symbols.get(i).copied().unwrap_or(MISSING);

        let merged: String = (0..len)
            .map(|i| codec::consensus(symbol_at(self, i), symbol_at(other, i)))
            .map(|ch| if ch == EXTERNAL_GAP { '-' } else { ch as char })
            .collect();

        let name = format!("Consensus of {} and {}", self.full_name(), other.full_name());
        Sequence::new(&name, &merged)
    }

    /// Copy with external gaps replaced by missing data.
    pub fn without_external_gaps(&self) -> Sequence {
        let symbols = self
            .symbols
            .iter()
            .map(|&ch| if ch == EXTERNAL_GAP { MISSING } else { ch })
            .collect();
        Sequence {
            id: SequenceId::next(),
            symbols,
            ..self.clone()
        }
    }

    pub fn shared_length(&self, other: &Sequence, metric: DistanceMetric) -> usize {
        engine::shared_length(&self.symbols, &other.symbols, metric)
    }

    pub fn count_identical(&self, other: &Sequence, ambiguity_allowed: bool) -> usize {
        engine::count_identical(&self.symbols, &other.symbols, ambiguity_allowed)
    }

    pub fn count_transversions(&self, other: &Sequence) -> usize {
        engine::count_transversions(&self.symbols, &other.symbols)
    }

    pub fn has_min_overlap(&self, other: &Sequence, config: &DistanceConfig) -> bool {
        self.shared_length(other, config.metric) >= config.minimum_overlap
    }

    /// Cached distance to `other` under the context's current settings.
    ///
    /// Returns [`engine::INSUFFICIENT_OVERLAP`] when the two do not overlap enough.
    pub fn pairwise_distance(&self, other: &Sequence, ctx: &DistanceContext) -> f64 {
        ctx.distance(self, other)
    }

    /// Distance computed directly, bypassing any cache.
    pub fn pairwise_distance_uncached(&self, other: &Sequence, config: &DistanceConfig) -> f64 {
        engine::distance(&self.symbols, &other.symbols, config)
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn set_property(&mut self, key: &str, value: &str) {
        self.properties.insert(key.to_string(), value.to_string());
    }

    pub fn remove_property(&mut self, key: &str) -> Option<String> {
        self.properties.remove(key)
    }

    /// Flagged names last; otherwise species name, then display name,
    /// ignoring case. Conspecifics end up next to each other.
    pub fn cmp_by_name(&self, other: &Sequence) -> Ordering {
        self.needs_review()
            .cmp(&other.needs_review())
            .then_with(|| {
                let a = self.species_name().unwrap_or_default().to_lowercase();
                let b = other.species_name().unwrap_or_default().to_lowercase();
                a.cmp(&b)
            })
            .then_with(|| {
                self.display_name()
                    .to_lowercase()
                    .cmp(&other.display_name().to_lowercase())
            })
    }

    /// Longest first.
    pub fn cmp_by_size(&self, other: &Sequence) -> Ordering {
        other.actual_length().cmp(&self.actual_length())
    }

    /// Sequences without an accession last; numeric accessions compare numerically.
    pub fn cmp_by_accession(&self, other: &Sequence) -> Ordering {
        match (self.accession(), other.accession()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => match (a.parse::<u64>(), b.parse::<u64>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => a.cmp(b),
            },
        }
    }

    /// Sequences without a family last.
    pub fn cmp_by_family(&self, other: &Sequence) -> Ordering {
        match (self.family().is_empty(), other.family().is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self
                .family()
                .to_lowercase()
                .cmp(&other.family().to_lowercase()),
        }
    }

    /// Most ambiguous first.
    pub fn cmp_by_ambiguity(&self, other: &Sequence) -> Ordering {
        other
            .ambiguity_fraction()
            .total_cmp(&self.ambiguity_fraction())
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sequence({}, length: {})", self.full_name(), self.len())?;
        if self.len() < 20 {
            write!(f, " {}", self.sequence_with_external_gaps())?;
        }
        Ok(())
    }
}

fn is_real(ch: u8) -> bool {
    !codec::is_gap(ch) && !codec::is_missing(ch)
}

/// Turn the `-` symbols of the leading and trailing runs of `-`/`?` into
/// external gaps. `?` stays missing.
fn mark_external_gaps(symbols: &mut [u8]) {
    let boundary = |ch: &u8| *ch == INTERNAL_GAP || *ch == MISSING;

    let lead = symbols.iter().take_while(|ch| boundary(ch)).count();
    let trail = symbols.iter().rev().take_while(|ch| boundary(ch)).count();
    let len = symbols.len();

    for i in (0..lead).chain(len - trail..len) {
        if symbols[i] == INTERNAL_GAP {
            symbols[i] = EXTERNAL_GAP;
        }
    }
}

/// Number of symbols `upper` should fold to: one per group plus one per loose character.
fn folded_length(upper: &str) -> usize {
    let mut count = 0;
    let mut in_group = false;
    for ch in upper.chars() {
        match ch {
            '(' | '[' => {
                in_group = true;
                count += 1;
            }
            ')' | ']' => in_group = false,
            _ if !in_group => count += 1,
            _ => {}
        }
    }
    count
}
