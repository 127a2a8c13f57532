//! Noise cleanup and whitespace normalization (§4.1 steps 1, 9).

use regex::Regex;
use std::sync::OnceLock;

fn synthetic_heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^#{1,6}\s*Paragraph\s+\d+\s*$").unwrap())
}

fn blank_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").unwrap())
}

fn space_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]{2,}").unwrap())
}

/// Strip synthetic `## Paragraph N` headings, collapse 3+ newlines to two,
/// and collapse runs of spaces/tabs to one.
pub fn clean_noise(text: &str) -> String {
    let without_synthetic = synthetic_heading_re().replace_all(text, "");
    let collapsed_blank = blank_run_re().replace_all(&without_synthetic, "\n\n");
    space_run_re().replace_all(&collapsed_blank, " ").into_owned()
}

/// Guarantee a blank line before/after every heading and fenced block, and
/// limit consecutive blank lines to two.
pub fn normalize_whitespace(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 8);
    let mut in_fence = false;

    for (i, &line) in lines.iter().enumerate() {
        let is_heading = !in_fence && line.trim_start().starts_with('#');
        let is_fence_marker = line.trim_start().starts_with("```");

        if (is_heading || (is_fence_marker && !in_fence))
            && matches!(out.last(), Some(prev) if !prev.trim().is_empty())
        {
            out.push(String::new());
        }

        out.push(line.to_string());

        if is_fence_marker {
            in_fence = !in_fence;
        }

        let next_is_blank_needed = is_heading
            || (is_fence_marker && !in_fence)
            || false;
        if next_is_blank_needed {
            if let Some(&next_line) = lines.get(i + 1) {
                if !next_line.trim().is_empty() {
                    out.push(String::new());
                }
            }
        }
    }

    let joined = out.join("\n");
    blank_run_re().replace_all(&joined, "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_synthetic_paragraph_headings() {
        let text = "## Paragraph 1\nReal content\n## Paragraph 22\nMore content";
        let cleaned = clean_noise(text);
        assert!(!cleaned.contains("Paragraph 1"));
        assert!(cleaned.contains("Real content"));
    }

    #[test]
    fn collapses_blank_line_runs() {
        let text = "a\n\n\n\n\nb";
        assert_eq!(clean_noise(text), "a\n\nb");
    }

    #[test]
    fn collapses_space_runs() {
        let text = "a   b\tc";
        assert_eq!(clean_noise(text), "a b c");
    }

    #[test]
    fn heading_gets_surrounding_blank_lines() {
        let text = "intro\n# Heading\nbody";
        let normalized = normalize_whitespace(text);
        let lines: Vec<&str> = normalized.lines().collect();
        let heading_idx = lines.iter().position(|l| *l == "# Heading").unwrap();
        assert!(lines[heading_idx - 1].trim().is_empty());
        assert!(lines[heading_idx + 1].trim().is_empty());
    }
}
