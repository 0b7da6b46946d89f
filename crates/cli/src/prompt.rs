use chrono::{DateTime, Local};
use dbcli_core::PromptContext;

pub const ATHENA_PROMPT: &str = "\\r:\\d> ";
pub const REDSHIFT_PROMPT: &str = "\\d@\\h> ";

const NONE: &str = "(none)";

/// Expand prompt placeholders such as `\d` (database) and `\h` (host).
/// Substituted values are never expanded again.
pub fn render_prompt(template: &str, ctx: &PromptContext, now: DateTime<Local>) -> String {
    let or_none = |v: &Option<String>| v.clone().unwrap_or_else(|| NONE.to_string());
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(code) = chars.next() else {
            out.push(c);
            break;
        };
        match code {
            'd' => out.push_str(&or_none(&ctx.database)),
            'r' => out.push_str(&or_none(&ctx.region)),
            'D' => out.push_str(&now.format("%a %b %d %H:%M:%S %Y").to_string()),
            'R' => out.push_str(&now.format("%H").to_string()),
            'm' => out.push_str(&now.format("%M").to_string()),
            's' => out.push_str(&now.format("%S").to_string()),
            'n' => out.push('\n'),
            'h' => out.push_str(&or_none(&ctx.host)),
            'p' => match ctx.port {
                Some(port) => out.push_str(&port.to_string()),
                None => out.push_str(NONE),
            },
            'u' => out.push_str(&or_none(&ctx.user)),
            't' => out.push_str(&now.format("%H:%M:%S").to_string()),
            other => {
                out.push(c);
                out.push(other);
            }
        }
    }
    out
}

/// Continuation prompt padded to the width of the last prompt line.
pub fn continuation_prompt(continuation: &str, prompt: &str) -> String {
    let width = prompt.rsplit('\n').next().unwrap_or(prompt).chars().count();
    format!("{continuation:>width$}")
}
