pub mod adapter;
pub mod pending;
pub mod recorder;
