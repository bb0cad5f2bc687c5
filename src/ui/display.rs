use colored::{Colorize, ColoredString};

pub fn format_prompt(prompt: &str) -> ColoredString {
    prompt.bright_white()
}

pub fn format_success(message: &str) -> ColoredString {
    message.bright_green()
}

pub fn format_error(message: &str) -> ColoredString {
    message.bright_red()
}

pub fn format_info(message: &str) -> ColoredString {
    message.bright_blue()
}

/// Validation messages are shown next to the field they refer to.
pub fn format_field_error(field: &str, message: &str) -> String {
    format!("{} {}", format!("{}:", field).yellow().bold(), message.yellow())
}
