use crate::error::PromptError;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Tone {
    Formal,
    #[default]
    Casual,
    Technical,
    Simple,
    Creative,
}

impl Tone {
    /// The sentence appended after "Tone:" in every assembled prompt.
    pub fn modifier(self) -> &'static str {
        match self {
            Tone::Formal => "Use formal language and maintain a professional tone throughout.",
            Tone::Casual => "Use casual, conversational language while keeping it appropriate.",
            Tone::Technical => "Use precise technical terminology and maintain academic rigor.",
            Tone::Simple => "Use simple language suitable for a general audience.",
            Tone::Creative => "Use creative and engaging language with vivid descriptions.",
        }
    }

    /// Parses user input, turning anything outside the enum into a validation error.
    pub fn parse(name: &str) -> Result<Self, PromptError> {
        Tone::from_str(name.trim()).map_err(|_| {
            let accepted: Vec<String> = Tone::iter().map(|t| t.to_string()).collect();
            PromptError::Validation(format!(
                "Unknown tone '{}'. Choose one of: {}",
                name.trim(),
                accepted.join(", ")
            ))
        })
    }
}
