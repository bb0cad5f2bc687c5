use super::template::{
    select_template, Template, CONTEXT_PLACEHOLDER, INSTRUCTION_PLACEHOLDER, TEMPLATE_PLACEHOLDER,
};
use super::tone::Tone;
use super::PromptRequest;
use crate::error::PromptError;
use log::debug;

const QUALITY_GUIDELINES: [&str; 5] = [
    "Clear and well-structured",
    "Appropriate for the target audience",
    "Engaging and natural in tone",
    "Focused and concise",
    "Original and thoughtful",
];

/// Builds the final prompt text for an already selected template.
pub fn assemble(template: &Template, tone: Tone, instruction: &str, context: &str) -> String {
    let context = context.trim();

    let mut prompt = match template.tone_body(tone) {
        Some(body) => body.replacen(TEMPLATE_PLACEHOLDER, template.template, 1),
        None => template.template.to_string(),
    };

    if template.is_default() {
        let context_line = if context.is_empty() {
            String::new()
        } else {
            format!("\nContext: {}", context)
        };
        // {context} comes after {instruction}; user text must never be rescanned.
        prompt = prompt
            .replacen(CONTEXT_PLACEHOLDER, &context_line, 1)
            .replacen(INSTRUCTION_PLACEHOLDER, instruction, 1);
    } else if !context.is_empty() {
        prompt.push_str(&format!("\nAdditional requirements: {}", context));
    }

    prompt.push_str(&format!("\n\nTone: {}", tone.modifier()));

    prompt.push_str("\n\nEnsure the response is:");
    for guideline in QUALITY_GUIDELINES {
        prompt.push_str("\n- ");
        prompt.push_str(guideline);
    }

    prompt
}

/// Validates the request, picks a template and assembles the prompt locally.
pub fn generate_prompt(request: &PromptRequest) -> Result<String, PromptError> {
    if request.instruction.trim().is_empty() {
        return Err(PromptError::empty_instruction());
    }

    let template = select_template(&request.instruction);
    debug!("Selected template '{}' for tone {}", template.name, request.tone);

    Ok(assemble(
        template,
        request.tone,
        &request.instruction,
        &request.context,
    ))
}
