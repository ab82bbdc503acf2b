mod resolver;
mod store;
mod types;

pub use resolver::{
    matching_entries, parse_selection, resolve, resolve_with_selection, Candidates, Resolution,
    ResolveError,
};
pub use store::{CatalogError, CatalogStore};
pub use types::CatalogEntry;
