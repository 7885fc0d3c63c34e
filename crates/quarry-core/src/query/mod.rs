pub mod definition;
pub mod fuzzy;
pub mod guards;
pub mod hierarchy;
pub mod lint;
pub mod overrides;
pub mod search;
pub mod structure;
