use thiserror::Error;

use crate::catalog::CatalogEntry;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no satellite matches '{0}'")]
    NotFound(String),
    #[error("{count} satellites match; a selection is required")]
    SelectionRequired { count: usize },
    #[error("selection {index} is out of range (0..{count})")]
    SelectionOutOfRange { index: usize, count: usize },
    #[error("selection '{0}' is not a number")]
    InvalidSelection(String),
}

/// Outcome of matching a query against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    Found(&'a CatalogEntry),
    Ambiguous(Candidates<'a>),
    NotFound,
}

/// Two or more matching entries, in catalog order.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidates<'a> {
    matches: Vec<&'a CatalogEntry>,
}

impl<'a> Candidates<'a> {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// `(index, entry)` pairs to present to the operator.
    pub fn listing(&self) -> impl Iterator<Item = (usize, &'a CatalogEntry)> + '_ {
        self.matches.iter().copied().enumerate()
    }

    pub fn select(&self, index: usize) -> Result<&'a CatalogEntry, ResolveError> {
        self.matches
            .get(index)
            .copied()
            .ok_or(ResolveError::SelectionOutOfRange {
                index,
                count: self.matches.len(),
            })
    }
}

/// Entries whose name contains `query`, ignoring case, in catalog order.
pub fn matching_entries<'a>(query: &str, catalog: &'a [CatalogEntry]) -> Vec<&'a CatalogEntry> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    catalog
        .iter()
        .filter(|entry| entry.name.to_lowercase().contains(&needle))
        .collect()
}

pub fn resolve<'a>(query: &str, catalog: &'a [CatalogEntry]) -> Resolution<'a> {
    let mut matches = matching_entries(query, catalog);
    match matches.len() {
        0 => Resolution::NotFound,
        1 => Resolution::Found(matches.remove(0)),
        _ => Resolution::Ambiguous(Candidates { matches }),
    }
}

/// Resolve with a selection already known to the caller.
///
/// A single match never needs `selection`; several matches always do.
pub fn resolve_with_selection<'a>(
    query: &str,
    catalog: &'a [CatalogEntry],
    selection: Option<usize>,
) -> Result<&'a CatalogEntry, ResolveError> {
    match resolve(query, catalog) {
        Resolution::NotFound => Err(ResolveError::NotFound(query.to_string())),
        Resolution::Found(entry) => Ok(entry),
        Resolution::Ambiguous(candidates) => match selection {
            Some(index) => candidates.select(index),
            None => Err(ResolveError::SelectionRequired {
                count: candidates.len(),
            }),
        },
    }
}

/// Parse an operator-typed candidate index.
pub fn parse_selection(input: &str) -> Result<usize, ResolveError> {
    let trimmed = input.trim();
    trimmed
        .parse()
        .map_err(|_| ResolveError::InvalidSelection(trimmed.to_string()))
}
