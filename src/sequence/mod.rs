pub mod codec;
pub mod name;
pub mod record;

pub use codec::SymbolClass;
pub use name::TaxonName;
pub use record::{Sequence, SequenceId};
