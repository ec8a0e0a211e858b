//! Text helpers shared by the chat loop and the wizard.

/// Marker that identifies the footer appended after a capability was used.
pub const TOOL_FOOTER_MARKER: &str = "_🔧 Tool used:";

/// Truncate on a char boundary, appending a marker when something was cut.
pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    let mut out: String = input.chars().take(max_chars).collect();
    out.push_str("\n… (truncated)");
    out
}

/// Wrap output in a Slack/Markdown fenced block.
pub fn code_block(body: &str) -> String {
    format!("```\n{}\n```", body)
}

/// Footer naming the capability that produced an answer.
pub fn tool_footer(capability: &str) -> String {
    format!("\n\n{} `{}`_", TOOL_FOOTER_MARKER, capability)
}

/// Append the tool footer unless the text already carries one.
pub fn with_tool_footer(text: &str, capability: &str) -> String {
    if text.contains(TOOL_FOOTER_MARKER) {
        text.to_string()
    } else {
        format!("{}{}", text, tool_footer(capability))
    }
}
