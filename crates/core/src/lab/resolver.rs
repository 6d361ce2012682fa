//! Canonical key resolution.
//!
//! Lab fields reach this crate under many spellings: stored field names written by older
//! versions (`COL`, `VFS`, `HbA1c`), form element ids (`ctEditarConsulta`), and visible label
//! text (`CT (Colesterol Total):`). Everything is funnelled through [`normalize`] so that one
//! concept always ends up under one key.
//!
//! Alias knowledge lives only in this module. Other modules that need to read a denormalised
//! record ask [`stored_spellings`] for the field names to try.

use super::keys::LabKey;
use crate::constants::UI_IDENTIFIER_SUFFIXES;
use std::sync::OnceLock;

/// Result of resolving a raw key against the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Known(LabKey),
    /// Not in the vocabulary; carries the cleaned spelling.
    Unrecognized(String),
}

impl Resolved {
    pub fn as_key(&self) -> Option<LabKey> {
        match self {
            Resolved::Known(key) => Some(*key),
            Resolved::Unrecognized(_) => None,
        }
    }

    /// The normalised string form: the canonical key, or the cleaned input.
    pub fn into_normalized(self) -> String {
        match self {
            Resolved::Known(key) => key.canonical().to_owned(),
            Resolved::Unrecognized(cleaned) => cleaned,
        }
    }
}

/// Lowercase spellings that resolve to a key besides its canonical name.
fn aliases(key: LabKey) -> &'static [&'static str] {
    match key {
        LabKey::TotalCholesterol => &["col"],
        LabKey::GlomerularFiltration => &["vfs"],
        LabKey::UnlistedValues => &["valores no incluidos", "valores_no_incluidos"],
        _ => &[],
    }
}

/// Field names under which older records may hold a value, beyond the canonical and
/// uppercase spellings.
fn legacy_field_names(key: LabKey) -> &'static [&'static str] {
    match key {
        LabKey::TotalCholesterol => &["col", "COL"],
        LabKey::GlomerularFiltration => &["vfs", "VFS"],
        LabKey::GlycatedHemoglobin => &["HbA1c"],
        LabKey::FreeT4 => &["T4l"],
        LabKey::UnlistedValues => &["valoresNoIncluidos", "ValoresNoIncluidos"],
        _ => &[],
    }
}

/// Every matchable spelling, longest first, so a short key never swallows a longer one that
/// shares its prefix (`hb` and `hba1c`).
fn match_table() -> &'static [(&'static str, LabKey)] {
    static TABLE: OnceLock<Vec<(&'static str, LabKey)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table: Vec<(&'static str, LabKey)> = LabKey::ALL
            .into_iter()
            .flat_map(|key| {
                std::iter::once((key.canonical(), key))
                    .chain(aliases(key).iter().map(move |alias| (*alias, key)))
            })
            .collect();
        table.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)));
        table
    })
}

/// Lowercases and strips form-id suffixes, trailing colons and whitespace until nothing
/// more can be removed.
fn clean(raw: &str) -> String {
    let mut cleaned = raw.to_lowercase();
    loop {
        let trimmed = cleaned.trim().trim_end_matches(':').trim_end();
        let stripped = UI_IDENTIFIER_SUFFIXES
            .iter()
            .find_map(|suffix| trimmed.strip_suffix(suffix));

        match stripped {
            Some(rest) => cleaned = rest.to_owned(),
            None => return trimmed.to_owned(),
        }
    }
}

/// Resolves `raw` to a vocabulary key, or reports it as unrecognised.
pub fn resolve(raw: &str) -> Resolved {
    let cleaned = clean(raw);
    if cleaned.is_empty() {
        return Resolved::Unrecognized(cleaned);
    }

    match match_table()
        .iter()
        .find(|(spelling, _)| cleaned.starts_with(spelling))
    {
        Some((_, key)) => Resolved::Known(*key),
        None => Resolved::Unrecognized(cleaned),
    }
}

/// Maps any spelling of a lab field to its canonical key.
///
/// Never fails: input that matches no vocabulary entry comes back cleaned (lowercased,
/// suffixes and trailing colon removed) but otherwise unchanged.
pub fn normalize(raw: &str) -> String {
    resolve(raw).into_normalized()
}

/// Field names to try, in priority order, when reading `key` from a stored record.
pub fn stored_spellings(key: LabKey) -> Vec<String> {
    let canonical = key.canonical();
    let mut spellings = vec![canonical.to_owned(), canonical.to_uppercase()];
    for legacy in legacy_field_names(key) {
        if !spellings.iter().any(|s| s == legacy) {
            spellings.push((*legacy).to_owned());
        }
    }
    spellings
}
