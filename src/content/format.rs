//! Per-platform markdown dialects (§6: "Two formatters ... implement the
//! same 14-method interface").

/// Platform-specific markdown rendering. Mattermost and Slack speak
/// different-enough markdown that every primitive needs its own dialect;
/// callers build output by composing these rather than hand-writing markup.
pub trait Formatter: Send + Sync {
    fn format_bold(&self, text: &str) -> String;
    fn format_italic(&self, text: &str) -> String;
    fn format_code(&self, text: &str) -> String;
    fn format_code_block(&self, text: &str, language: Option<&str>) -> String;
    fn format_link(&self, text: &str, url: &str) -> String;
    fn format_heading(&self, text: &str, level: u8) -> String;
    fn format_table(&self, headers: &[&str], rows: &[Vec<String>]) -> String;
    fn format_key_value_list(&self, pairs: &[(&str, &str)]) -> String;
    fn format_blockquote(&self, text: &str) -> String;
    fn format_list_item(&self, text: &str) -> String;
    fn format_numbered_list_item(&self, index: usize, text: &str) -> String;
    fn format_strikethrough(&self, text: &str) -> String;
    fn format_horizontal_rule(&self) -> String;
    fn escape_text(&self, text: &str) -> String;

    /// Applies [`escape_text`](Self::escape_text) to user-controlled
    /// fragments, then lets already-formatted markdown pass through. Used as
    /// the single entry point for rendering a mix of literal and formatted
    /// content.
    fn format_markdown(&self, already_formatted: &str) -> String {
        already_formatted.to_string()
    }
}

/// Mattermost dialect: standard GFM-ish markdown, pipe tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct MattermostFormatter;

impl Formatter for MattermostFormatter {
    fn format_bold(&self, text: &str) -> String {
        format!("**{text}**")
    }
    fn format_italic(&self, text: &str) -> String {
        format!("_{text}_")
    }
    fn format_code(&self, text: &str) -> String {
        format!("`{text}`")
    }
    fn format_code_block(&self, text: &str, language: Option<&str>) -> String {
        format!("```{}\n{}\n```", language.unwrap_or(""), text)
    }
    fn format_link(&self, text: &str, url: &str) -> String {
        format!("[{text}]({url})")
    }
    fn format_heading(&self, text: &str, level: u8) -> String {
        format!("{} {text}", "#".repeat(level.clamp(1, 6) as usize))
    }
    fn format_table(&self, headers: &[&str], rows: &[Vec<String>]) -> String {
        render_pipe_table(headers, rows)
    }
    fn format_key_value_list(&self, pairs: &[(&str, &str)]) -> String {
        pairs
            .iter()
            .map(|(k, v)| format!("**{k}:** {v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
    fn format_blockquote(&self, text: &str) -> String {
        text.lines()
            .map(|line| format!("> {line}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
    fn format_list_item(&self, text: &str) -> String {
        format!("- {text}")
    }
    fn format_numbered_list_item(&self, index: usize, text: &str) -> String {
        format!("{index}. {text}")
    }
    fn format_strikethrough(&self, text: &str) -> String {
        format!("~~{text}~~")
    }
    fn format_horizontal_rule(&self) -> String {
        "---".to_string()
    }
    fn escape_text(&self, text: &str) -> String {
        escape_markdown_chars(text, "\\`*_{}[]()#+-.!>~")
    }
}

/// Slack dialect (mrkdwn): single-asterisk bold, single-underscore italic,
/// no native tables (rendered as a monospace block instead).
#[derive(Debug, Clone, Copy, Default)]
pub struct SlackFormatter;

impl Formatter for SlackFormatter {
    fn format_bold(&self, text: &str) -> String {
        format!("*{text}*")
    }
    fn format_italic(&self, text: &str) -> String {
        format!("_{text}_")
    }
    fn format_code(&self, text: &str) -> String {
        format!("`{text}`")
    }
    fn format_code_block(&self, text: &str, _language: Option<&str>) -> String {
        format!("```{text}```")
    }
    fn format_link(&self, text: &str, url: &str) -> String {
        format!("<{url}|{text}>")
    }
    fn format_heading(&self, text: &str, _level: u8) -> String {
        format!("*{text}*")
    }
    fn format_table(&self, headers: &[&str], rows: &[Vec<String>]) -> String {
        format!("```\n{}\n```", render_pipe_table(headers, rows))
    }
    fn format_key_value_list(&self, pairs: &[(&str, &str)]) -> String {
        pairs
            .iter()
            .map(|(k, v)| format!("*{k}:* {v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
    fn format_blockquote(&self, text: &str) -> String {
        text.lines()
            .map(|line| format!("> {line}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
    fn format_list_item(&self, text: &str) -> String {
        format!("\u{2022} {text}")
    }
    fn format_numbered_list_item(&self, index: usize, text: &str) -> String {
        format!("{index}. {text}")
    }
    fn format_strikethrough(&self, text: &str) -> String {
        format!("~{text}~")
    }
    fn format_horizontal_rule(&self) -> String {
        "\u{2014}\u{2014}\u{2014}".to_string()
    }
    fn escape_text(&self, text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    }
}

fn render_pipe_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str("| ");
    out.push_str(&headers.join(" | "));
    out.push_str(" |\n|");
    out.push_str(&" --- |".repeat(headers.len()));
    for row in rows {
        out.push('\n');
        out.push_str("| ");
        out.push_str(&row.join(" | "));
        out.push_str(" |");
    }
    out
}

fn escape_markdown_chars(text: &str, specials: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if specials.contains(ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
