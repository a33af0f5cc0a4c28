//! Best-effort parsing of taxonomic information out of free-text sequence names

use lazy_static::lazy_static;
use regex::Regex;

/// Longest prefix of a flagged name shown by [`TaxonName::display_name`].
const FLAGGED_DISPLAY_LIMIT: usize = 80;

lazy_static! {
    static ref TRINOMIAL: Regex = Regex::new(r"(\p{Lu}\p{Ll}+) (\p{Ll}+) (\p{Ll}+)\b").expect("valid pattern");
    static ref BINOMIAL: Regex = Regex::new(r"(\p{Lu}\p{Ll}+) (\p{Ll}+)\b").expect("valid pattern");
    static ref ACCESSION: Regex = Regex::new(r"gi\|(\d+)[|:]").expect("valid pattern");
    static ref FAMILY: Regex = Regex::new(r"\((?i:family):\s*(\p{Alphabetic}+)\s*\)").expect("valid pattern");
}

/// A sequence name together with the fields we could pull out of it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaxonName {
    full: String,
    genus: String,
    species: String,
    subspecies: String,
    family: String,
    accession: String,
    needs_review: bool,
}

impl TaxonName {
    /// Parse a raw name. Newlines become spaces and the result is trimmed.
    pub fn parse(raw: &str) -> TaxonName {
        let full = raw.replace(|c: char| c == '\n' || c == '\r', " ").trim().to_string();
        let mut name = TaxonName {
            full,
            ..TaxonName::default()
        };

        if let Some(caps) = TRINOMIAL.captures(&name.full) {
            name.genus = caps[1].to_string();
            name.species = caps[2].to_string();
            name.subspecies = caps[3].to_string();
        } else if let Some(caps) = BINOMIAL.captures(&name.full) {
            name.genus = caps[1].to_string();
            name.species = caps[2].to_string();

            // "Aus sp. 3" and friends: a placeholder rather than a real epithet
            let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
            if name.full[whole..].starts_with('.') {
                name.needs_review = true;
            }
        }

        if name.genus.is_empty() {
            name.needs_review = true;
        }

        if let Some(caps) = ACCESSION.captures(&name.full) {
            name.accession = caps[1].to_string();
        }

        if let Some(caps) = FAMILY.captures(&name.full) {
            name.family = caps[1].to_string();
        }

        name
    }

    /// The name exactly as given (after newline folding and trimming).
    pub fn full(&self) -> &str {
        &self.full
    }

    pub fn genus(&self) -> &str {
        &self.genus
    }

    /// The specific epithet alone.
    pub fn species_epithet(&self) -> &str {
        &self.species
    }

    pub fn subspecies(&self) -> &str {
        &self.subspecies
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn accession(&self) -> Option<&str> {
        if self.accession.is_empty() {
            None
        } else {
            Some(&self.accession)
        }
    }

    pub fn needs_review(&self) -> bool {
        self.needs_review
    }

    pub fn set_needs_review(&mut self, flag: bool) {
        self.needs_review = flag;
    }

    /// `Genus species`, if both parts were found.
    pub fn species_name(&self) -> Option<String> {
        if self.genus.is_empty() || self.species.is_empty() {
            None
        } else {
            Some(format!("{} {}", self.genus, self.species))
        }
    }

    /// Human-readable label.
    ///
    /// Flagged names are shown braced and cut to 80 characters. Without an
    /// accession the full name is the only unambiguous label, so it is used
    /// as-is.
    pub fn display_name(&self) -> String {
        if self.needs_review {
            let cut: String = self.full.chars().take(FLAGGED_DISPLAY_LIMIT).collect();
            return format!("{{{cut}}}");
        }

        let Some(accession) = self.accession() else {
            return self.full.clone();
        };

        match self.species_name() {
            Some(mut name) => {
                if !self.subspecies.is_empty() {
                    name.push_str(&format!(" ({})", self.subspecies));
                }
                if !self.family.is_empty() {
                    name.push_str(&format!(" (Family {})", self.family));
                }
                name.push_str(&format!(" (gi:{accession})"));
                name
            }
            None => self.full.clone(),
        }
    }

    /// Fit the name into `max` characters.
    ///
    /// Tries the full name, then `gi|N| Genus species` (or `Genus species`),
    /// then shrinks the genus, then the epithet.
    pub fn shortened(&self, max: usize) -> String {
        let Some(species_name) = self.species_name() else {
            let name = match self.accession() {
                Some(gi) => format!("gi|{gi}| {}", self.full),
                None => self.full.clone(),
            };
            return take_chars(&name, max);
        };

        let genus_initial = take_chars(&self.genus, 1);
        let epithet_initial = take_chars(&self.species, 1);
        match max {
            0 => return String::new(),
            1 => return genus_initial,
            2 => return format!("{genus_initial}{epithet_initial}"),
            3 => return format!("{genus_initial} {epithet_initial}"),
            _ => {}
        }

        if char_len(&self.full) <= max {
            return self.full.clone();
        }

        let labelled = match self.accession() {
            Some(gi) => format!("gi|{gi}| {species_name}"),
            None => species_name,
        };
        if char_len(&labelled) <= max {
            return labelled;
        }

        let epithet_len = char_len(&self.species);
        if max >= 2 + epithet_len {
            let keep = max - 1 - epithet_len;
            format!("{} {}", take_chars(&self.genus, keep), self.species)
        } else {
            format!("{genus_initial} {}", take_chars(&self.species, max - 2))
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn take_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}
