pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build_system_prompt() -> String {
        "You are an expert at writing clear, specific, and effective prompts for AI models. \
Your task is to improve the given prompt by making it more specific, adding relevant context, \
and ensuring it will produce the desired output. \
Return ONLY the improved prompt, without any explanations or labels."
            .to_string()
    }

    pub fn build_user_prompt(instruction: &str, context: &str) -> String {
        let context = context.trim();
        let context_line = if context.is_empty() {
            String::new()
        } else {
            format!("Context: {}", context)
        };

        format!(
            "Improve this prompt to be more specific and effective:\n\nInstruction: {}\n{}",
            instruction,
            context_line
        )
    }
}
