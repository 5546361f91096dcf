//! Game rules that act on the registry

pub mod challenge;
pub mod character;
pub mod combat;
pub mod training;
