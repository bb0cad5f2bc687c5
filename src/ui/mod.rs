pub mod display;
pub mod prompt;
