pub mod check;
pub mod consolidate;
pub mod derive;
pub mod parse;
pub mod pipeline;
pub mod record;
pub mod revision;
pub mod sources;
