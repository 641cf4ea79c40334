pub mod claude;
pub mod generator;
pub mod models;
pub mod prompt;

pub use generator::{BriefingGenerator, BriefingInputs};
pub use models::Briefing;
