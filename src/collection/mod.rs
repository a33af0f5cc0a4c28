pub mod conspecific;
pub mod list;
pub mod lock;
pub mod species;

pub use conspecific::ConspecificCursor;
pub use list::{SequenceList, SortOrder};
pub use lock::{ListGuard, SharedSequenceList};
pub use species::{SpeciesDetail, SpeciesSummary};
