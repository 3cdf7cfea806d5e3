use std::borrow::Cow;

use crate::constants::HEADER_MAX_CHARS;
use crate::gateway::GatewayResponse;

/// Rewrites plain model output into light Markdown.
///
/// Text that already contains `#` or a code fence is returned as-is, which also
/// makes a second pass over reshaped output a no-op.
pub fn reshape_markdown(text: &str) -> Cow<'_, str> {
    if text.contains('#') || text.contains("```") {
        return Cow::Borrowed(text);
    }

    let raw_lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(raw_lines.len());

    for (i, raw) in raw_lines.iter().enumerate() {
        let line = raw.trim();

        if line.is_empty() {
            out.push(String::new());
            continue;
        }

        let short = line.chars().count() < HEADER_MAX_CHARS;
        let after_blank = i > 0 && raw_lines[i - 1].trim().is_empty();

        if is_all_caps(line) && short && !line.ends_with(':') && after_blank {
            out.push(format!("## {}", line));
        } else if line.ends_with(':') && short {
            out.push(format!("### {}", line));
        } else {
            // List items and ordinary prose pass through trimmed.
            out.push(line.to_string());
        }
    }

    Cow::Owned(out.join("\n"))
}

fn is_all_caps(line: &str) -> bool {
    line.to_uppercase() == line
}

/// Applies [`reshape_markdown`] to the first candidate's text in place.
/// Returns false when the response has no text to reshape.
pub fn reshape_response(response: &mut GatewayResponse) -> bool {
    let Some(text) = response.text_mut() else {
        tracing::warn!("Skipping reshape: response has no candidate text");
        return false;
    };
    if let Cow::Owned(reshaped) = reshape_markdown(text) {
        *text = reshaped;
    }
    true
}
