pub mod definition;
pub mod target;
