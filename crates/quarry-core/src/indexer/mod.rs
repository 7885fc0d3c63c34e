pub mod filesystem;
pub mod javascript;
pub mod normalize;
pub mod pipeline;
pub mod python;
pub mod symbols;
