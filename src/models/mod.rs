#[macro_use]
pub mod model;
#[macro_use]
pub mod storable;

pub mod article;
pub mod incident;
pub mod queue_entry;
pub mod victim;
