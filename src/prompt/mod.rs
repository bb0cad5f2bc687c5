pub mod assembler;
pub mod template;
pub mod tone;

pub use assembler::{assemble, generate_prompt};
pub use template::select_template;
pub use tone::Tone;

/// One user action's worth of input. Built per request and dropped afterwards.
#[derive(Debug, Clone, Default)]
pub struct PromptRequest {
    pub instruction: String,
    pub context: String,
    pub tone: Tone,
}

impl PromptRequest {
    pub fn new(instruction: impl Into<String>, context: impl Into<String>, tone: Tone) -> Self {
        Self {
            instruction: instruction.into(),
            context: context.into(),
            tone,
        }
    }
}
