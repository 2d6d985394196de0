//! Terminal markup for assistant messages
//!
//! Translates the lightweight markdown subset assistants tend to emit —
//! emphasis, inline code, fenced code blocks, headings, blockquotes, lists,
//! links, and pipe tables — into ANSI-styled text via `colored`. The raw
//! message content stays authoritative; this output is derived display
//! markup only.

use crate::render::table::{extract_tables, render_table};
use colored::Colorize;
use regex::Regex;
use std::sync::OnceLock;

fn code_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(\w+)?\n?(.*?)```").expect("valid regex"))
}

fn code_span_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`]+)`").expect("valid regex"))
}

fn bold_italic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*\*([^*]+)\*\*\*").expect("valid regex"))
}

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex"))
}

fn italic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*([^*\n]+)\*").expect("valid regex"))
}

fn underscore_italic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_([^_\n]+)_").expect("valid regex"))
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid regex"))
}

fn ordered_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)\.\s+(.+)$").expect("valid regex"))
}

/// Render message text as ANSI-styled terminal output.
///
/// Whether colors are actually emitted is governed by `colored`'s global
/// override (disabled for non-TTY output and in tests).
pub fn render_message(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let normalized = unescape_newlines(text);
    let mut output = String::new();
    let mut cursor = 0;

    for captures in code_fence_re().captures_iter(&normalized) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        output.push_str(&render_prose(&normalized[cursor..whole.start()]));

        let language = captures.get(1).map(|m| m.as_str()).unwrap_or("text");
        let body = captures.get(2).map(|m| m.as_str()).unwrap_or("");
        output.push_str(&render_code_block(language, body));

        cursor = whole.end();
    }

    output.push_str(&render_prose(&normalized[cursor..]));
    output
}

fn unescape_newlines(text: &str) -> String {
    text.replace("\\n", "\n")
        .replace("&#10;", "\n")
        .replace("&#xa;", "\n")
        .replace("\r\n", "\n")
}

fn render_code_block(language: &str, body: &str) -> String {
    let mut block = String::new();
    block.push_str(&format!("{}\n", format!("── {} ──", language).dimmed()));
    block.push_str(body.trim_matches('\n'));
    block.push_str(&format!("\n{}\n", "──".dimmed()));
    block
}

fn render_prose(text: &str) -> String {
    let mut output = String::new();
    let mut table_lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        let looks_tabular = trimmed.matches('|').count() >= 2;

        if looks_tabular {
            table_lines.push(line);
            continue;
        }

        if !table_lines.is_empty() {
            output.push_str(&flush_table(&table_lines));
            table_lines.clear();
        }
        output.push_str(&render_line(trimmed));
        output.push('\n');
    }

    if !table_lines.is_empty() {
        output.push_str(&flush_table(&table_lines));
    }
    output
}

fn flush_table(lines: &[&str]) -> String {
    let chunk = lines.join("\n");
    let tables = extract_tables(&chunk);
    if tables.is_empty() {
        // Pipes without table structure: fall through as plain lines.
        let mut plain = String::new();
        for line in lines {
            plain.push_str(&render_line(line.trim()));
            plain.push('\n');
        }
        plain
    } else {
        tables.iter().map(render_table).collect()
    }
}

fn render_line(line: &str) -> String {
    for (prefix, underline) in [
        ("##### ", false),
        ("#### ", false),
        ("### ", false),
        ("## ", true),
        ("# ", true),
    ] {
        if let Some(heading) = line.strip_prefix(prefix) {
            let styled = render_inline(heading);
            return if underline {
                styled.bold().underline().to_string()
            } else {
                styled.bold().to_string()
            };
        }
    }

    if line == "---" || line == "***" || line == "___" {
        return "─".repeat(40).dimmed().to_string();
    }

    if let Some(quoted) = line.strip_prefix("> ") {
        return format!("{} {}", "│".dimmed(), render_inline(quoted).italic());
    }

    if let Some(item) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return format!("  • {}", render_inline(item));
    }

    if let Some(captures) = ordered_item_re().captures(line) {
        return format!("  {}. {}", &captures[1], render_inline(&captures[2]));
    }

    render_inline(line)
}

fn render_inline(text: &str) -> String {
    let styled = code_span_re().replace_all(text, |c: &regex::Captures| {
        c[1].yellow().to_string()
    });
    let styled = bold_italic_re().replace_all(&styled, |c: &regex::Captures| {
        c[1].bold().italic().to_string()
    });
    let styled = bold_re().replace_all(&styled, |c: &regex::Captures| c[1].bold().to_string());
    let styled = italic_re().replace_all(&styled, |c: &regex::Captures| c[1].italic().to_string());
    let styled = underscore_italic_re()
        .replace_all(&styled, |c: &regex::Captures| c[1].italic().to_string());
    let styled = link_re().replace_all(&styled, |c: &regex::Captures| {
        format!("{} ({})", &c[1], c[2].underline())
    });
    styled.into_owned()
}
