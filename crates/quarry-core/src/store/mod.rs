pub mod files;
pub mod symbols;

pub use files::{FileEntry, FileRegistry};
pub use symbols::{Invalidation, SymbolKey, SymbolStore};
