//! Symbol encoding for DNA and IUPAC ambiguity codes
//!
//! Every stored symbol is a single ASCII byte. Bases and ambiguity codes
//! map onto a 4-bit mask over {A, C, T, G}; `-` is an internal gap, `_`
//! an external (leading/trailing) gap and `?` missing data.

pub const MASK_A: u8 = 0x01;
pub const MASK_C: u8 = 0x02;
pub const MASK_T: u8 = 0x04;
pub const MASK_G: u8 = 0x08;
pub const MASK_N: u8 = MASK_A | MASK_C | MASK_T | MASK_G;

pub const INTERNAL_GAP: u8 = b'-';
pub const EXTERNAL_GAP: u8 = b'_';
pub const MISSING: u8 = b'?';

/// What kind of symbol a byte is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolClass {
    Base,
    Ambiguous,
    Gap,
    ExternalGap,
    Missing,
    Invalid,
}

/// Classify a symbol. Lowercase letters are treated as their uppercase form.
pub fn classify(ch: u8) -> SymbolClass {
    match ch.to_ascii_uppercase() {
        b'A' | b'C' | b'T' | b'G' => SymbolClass::Base,
        b'R' | b'Y' | b'K' | b'M' | b'S' | b'W' | b'B' | b'D' | b'H' | b'V' | b'N' => {
            SymbolClass::Ambiguous
        }
        INTERNAL_GAP => SymbolClass::Gap,
        EXTERNAL_GAP => SymbolClass::ExternalGap,
        MISSING => SymbolClass::Missing,
        _ => SymbolClass::Invalid,
    }
}

#[inline]
pub fn is_valid(ch: u8) -> bool {
    classify(ch) != SymbolClass::Invalid
}

#[inline]
pub fn is_ambiguous(ch: u8) -> bool {
    classify(ch) == SymbolClass::Ambiguous
}

/// True for both gap kinds.
#[inline]
pub fn is_gap(ch: u8) -> bool {
    ch == INTERNAL_GAP || ch == EXTERNAL_GAP
}

#[inline]
pub fn is_internal_gap(ch: u8) -> bool {
    ch == INTERNAL_GAP
}

#[inline]
pub fn is_missing(ch: u8) -> bool {
    ch == MISSING
}

/// A, G or R. Wider codes that could also be a pyrimidine are not purines.
#[inline]
pub fn is_purine(ch: u8) -> bool {
    matches!(ch, b'A' | b'G' | b'R')
}

/// C, T or Y.
#[inline]
pub fn is_pyrimidine(ch: u8) -> bool {
    matches!(ch, b'C' | b'T' | b'Y')
}

/// Resolves to exactly one of purine or pyrimidine.
#[inline]
pub fn is_resolvable(ch: u8) -> bool {
    is_purine(ch) != is_pyrimidine(ch)
}

/// Base mask of a symbol. Gaps, missing data and unknown bytes map to 0.
pub fn mask(ch: u8) -> u8 {
    match ch.to_ascii_uppercase() {
        b'A' => MASK_A,
        b'C' => MASK_C,
        b'T' => MASK_T,
        b'G' => MASK_G,
        b'R' => MASK_A | MASK_G,
        b'Y' => MASK_C | MASK_T,
        b'K' => MASK_G | MASK_T,
        b'M' => MASK_A | MASK_C,
        b'S' => MASK_C | MASK_G,
        b'W' => MASK_A | MASK_T,
        b'B' => MASK_C | MASK_G | MASK_T,
        b'D' => MASK_A | MASK_G | MASK_T,
        b'H' => MASK_A | MASK_C | MASK_T,
        b'V' => MASK_A | MASK_C | MASK_G,
        b'N' => MASK_N,
        _ => 0,
    }
}

/// Reverse of [`mask`]. An empty mask becomes an internal gap.
pub fn symbol_for_mask(mask: u8) -> u8 {
    match mask & MASK_N {
        0x01 => b'A',
        0x02 => b'C',
        0x03 => b'M',
        0x04 => b'T',
        0x05 => b'W',
        0x06 => b'Y',
        0x07 => b'H',
        0x08 => b'G',
        0x09 => b'R',
        0x0A => b'S',
        0x0B => b'V',
        0x0C => b'K',
        0x0D => b'D',
        0x0E => b'B',
        0x0F => b'N',
        _ => INTERNAL_GAP,
    }
}

/// Watson-Crick complement. Gap and missing markers come back unchanged;
/// bytes outside the alphabet give `None`.
pub fn complement(ch: u8) -> Option<u8> {
    match classify(ch) {
        SymbolClass::Base | SymbolClass::Ambiguous => {
            let m = mask(ch);
            // A <-> T, C <-> G
            let swapped = ((m & (MASK_A | MASK_C)) << 2) | ((m & (MASK_T | MASK_G)) >> 2);
            Some(symbol_for_mask(swapped))
        }
        SymbolClass::Gap | SymbolClass::ExternalGap | SymbolClass::Missing => Some(ch),
        SymbolClass::Invalid => None,
    }
}

/// Merge two aligned symbols into one.
///
/// Missing absorbs everything. An external gap yields to whatever the
/// other side holds, an internal gap yields to any base, and two bases
/// merge to the code covering both.
pub fn consensus(ch1: u8, ch2: u8) -> u8 {
    if is_missing(ch1) || is_missing(ch2) {
        return MISSING;
    }

    if ch1 == EXTERNAL_GAP {
        return ch2;
    }
    if ch2 == EXTERNAL_GAP {
        return ch1;
    }

    if is_gap(ch1) {
        return ch2;
    }
    if is_gap(ch2) {
        return ch1;
    }

    symbol_for_mask(mask(ch1) | mask(ch2))
}

/// Do two symbols match?
///
/// Missing data never matches. Internal gaps match only internal gaps;
/// external gaps match nothing. With ambiguity enabled, two codes match
/// when they share at least one base; without it, every code other than
/// A/C/T/G is read as `N` and an exact match is required.
pub fn identical(ch1: u8, ch2: u8, ambiguity_allowed: bool) -> bool {
    if !is_valid(ch1) || !is_valid(ch2) {
        return false;
    }

    let ch1 = ch1.to_ascii_uppercase();
    let ch2 = ch2.to_ascii_uppercase();

    if is_missing(ch1) || is_missing(ch2) {
        return false;
    }

    if is_gap(ch1) || is_gap(ch2) {
        return is_internal_gap(ch1) && is_internal_gap(ch2);
    }

    if !ambiguity_allowed {
        return collapse_to_n(ch1) == collapse_to_n(ch2);
    }

    ch1 == ch2 || (mask(ch1) & mask(ch2)) != 0
}

fn collapse_to_n(ch: u8) -> u8 {
    match ch {
        b'A' | b'C' | b'T' | b'G' => ch,
        _ => b'N',
    }
}

/// Short summary of how two aligned symbols line up: `|` for a match, blank otherwise.
pub fn match_marker(ch1: u8, ch2: u8, ambiguity_allowed: bool) -> char {
    if is_gap(ch1) || is_gap(ch2) {
        return ' ';
    }
    if identical(ch1, ch2, ambiguity_allowed) {
        '|'
    } else {
        ' '
    }
}

/// Write a symbol out with ambiguity codes spelled as a bracketed base set,
/// e.g. `R` becomes `[AG]` for `('[', ']')`.
pub fn push_expanded(out: &mut String, ch: u8, begin: char, end: char) {
    match classify(ch) {
        SymbolClass::Ambiguous => {
            let m = mask(ch);
            out.push(begin);
            for (bit, base) in [(MASK_A, 'A'), (MASK_C, 'C'), (MASK_T, 'T'), (MASK_G, 'G')] {
                if m & bit != 0 {
                    out.push(base);
                }
            }
            out.push(end);
        }
        SymbolClass::ExternalGap => out.push('-'),
        _ => out.push(ch as char),
    }
}

/// Fold every `(..)` / `[..]` group in `raw` into the single code for the
/// union of its bases.
///
/// Errors carry the index (in `raw`, counted in characters) and a description.
pub fn fold_ambiguity_groups(raw: &str) -> std::result::Result<Vec<u8>, (usize, String)> {
    let mut out = Vec::with_capacity(raw.len());
    let mut chars = raw.chars().enumerate();

    while let Some((index, ch)) = chars.next() {
        if ch != '(' && ch != '[' {
            if !ch.is_ascii() {
                return Err((index, format!("illegal character '{ch}'")));
            }
            out.push(ch as u8);
            continue;
        }

        let mut group_mask = 0u8;
        let mut closed = false;
        for (inner_index, inner) in chars.by_ref() {
            match inner {
                ')' | ']' => {
                    closed = true;
                    break;
                }
                '(' | '[' => {
                    return Err((
                        inner_index,
                        format!("'{inner}' found inside an ambiguity group"),
                    ));
                }
                _ => {
                    let bits = if inner.is_ascii() { mask(inner as u8) } else { 0 };
                    if bits == 0 {
                        return Err((
                            inner_index,
                            format!("'{inner}' is not a base and cannot appear in an ambiguity group"),
                        ));
                    }
                    group_mask |= bits;
                }
            }
        }

        if !closed {
            return Err((index, "unterminated ambiguity group".to_string()));
        }
        if group_mask == 0 {
            return Err((index, "empty ambiguity group".to_string()));
        }
        out.push(symbol_for_mask(group_mask));
    }

    Ok(out)
}
