// src/derive/mod.rs
pub mod goals;
pub mod reference;

pub use goals::{goals, Goal};
pub use reference::reference;
