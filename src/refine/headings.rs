//! Heading detection (§4.1 step 3): explicit markdown headings, ALL-CAPS
//! lines, and numbered-section lines ("1.2.3 Title") all become headings
//! with a clamped level.

/// A heading found in raw text, before section-tree assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedHeading {
    pub title: String,
    pub level: u8,
    pub line_start: usize,
    pub line_end: usize,
}

fn clamp_level(level: u8, min_level: u8, max_level: u8) -> u8 {
    level.clamp(min_level, max_level)
}

fn explicit_markdown_heading(line: &str) -> Option<(u8, &str)> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = trimmed[hashes..].trim();
    if rest.is_empty() {
        return None;
    }
    Some((hashes as u8, rest))
}

fn is_all_caps_heading(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.len() < 3 || trimmed.len() > 80 {
        return false;
    }
    let has_letter = trimmed.chars().any(|c| c.is_alphabetic());
    let all_caps = trimmed
        .chars()
        .filter(|c| c.is_alphabetic())
        .all(|c| c.is_uppercase());
    has_letter && all_caps && !trimmed.ends_with('.')
}

/// Numbered-section prefix like `1.`, `1.2`, `1.2.3` followed by a title.
/// The dot count plus one gives the nesting depth.
fn numbered_section_heading(line: &str) -> Option<(u8, &str)> {
    let trimmed = line.trim_start();
    let mut chars = trimmed.char_indices().peekable();
    let mut last_digit_end = 0usize;
    let mut depth = 0u8;

    loop {
        let mut saw_digit = false;
        while let Some(&(idx, c)) = chars.peek() {
            if c.is_ascii_digit() {
                saw_digit = true;
                last_digit_end = idx + c.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        if !saw_digit {
            break;
        }
        depth += 1;
        match chars.peek() {
            Some(&(_, '.')) => {
                chars.next();
            }
            _ => break,
        }
    }

    if depth == 0 {
        return None;
    }

    let after_number = &trimmed[last_digit_end..];
    let rest = after_number.trim_start_matches(['.', ')', ' ']).trim();
    if rest.is_empty() || !rest.chars().next().map(|c| c.is_alphabetic()).unwrap_or(false) {
        return None;
    }
    Some((depth, rest))
}

/// Scan `text` line by line for headings, skipping fenced code blocks.
/// Offsets in the returned headings are byte offsets into `text`.
pub fn detect_headings(text: &str, min_level: u8, max_level: u8) -> Vec<DetectedHeading> {
    let mut headings = Vec::new();
    let mut in_fence = false;
    let mut offset = 0usize;

    for line in text.split_inclusive('\n') {
        let trimmed_line = line.trim_end_matches('\n');
        let line_start = offset;
        let line_end = offset + trimmed_line.len();
        offset += line.len();

        if trimmed_line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        if let Some((level, title)) = explicit_markdown_heading(trimmed_line) {
            headings.push(DetectedHeading {
                title: title.to_string(),
                level: clamp_level(level, min_level, max_level),
                line_start,
                line_end,
            });
            continue;
        }

        if let Some((depth, title)) = numbered_section_heading(trimmed_line) {
            headings.push(DetectedHeading {
                title: title.to_string(),
                level: clamp_level(depth, min_level, max_level),
                line_start,
                line_end,
            });
            continue;
        }

        if is_all_caps_heading(trimmed_line) {
            headings.push(DetectedHeading {
                title: trimmed_line.trim().to_string(),
                level: clamp_level(min_level, min_level, max_level),
                line_start,
                line_end,
            });
        }
    }

    headings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_explicit_markdown_headings() {
        let text = "# Title\nbody\n## Sub\nmore";
        let headings = detect_headings(text, 1, 6);
        assert_eq!(headings.len(), 2);
        assert_eq!(headings[0].title, "Title");
        assert_eq!(headings[0].level, 1);
        assert_eq!(headings[1].title, "Sub");
        assert_eq!(headings[1].level, 2);
    }

    #[test]
    fn detects_numbered_sections() {
        let text = "1. Introduction\ntext\n1.2 Background\nmore\n1.2.3 Detail\nend";
        let headings = detect_headings(text, 1, 6);
        assert_eq!(headings.len(), 3);
        assert_eq!(headings[0].level, 1);
        assert_eq!(headings[1].level, 2);
        assert_eq!(headings[2].level, 3);
        assert_eq!(headings[1].title, "Background");
    }

    #[test]
    fn detects_all_caps_heading() {
        let text = "intro line\nEXECUTIVE SUMMARY\nbody text";
        let headings = detect_headings(text, 1, 6);
        assert_eq!(headings.len(), 1);
        assert_eq!(headings[0].title, "EXECUTIVE SUMMARY");
    }

    #[test]
    fn ignores_headings_inside_fenced_code() {
        let text = "```\n# not a heading\n```\n# real heading";
        let headings = detect_headings(text, 1, 6);
        assert_eq!(headings.len(), 1);
        assert_eq!(headings[0].title, "real heading");
    }

    #[test]
    fn level_is_clamped_to_max() {
        let text = "###### six\n####### not valid markdown but clamped numbered\n1.2.3.4.5.6.7 deep";
        let headings = detect_headings(text, 1, 3);
        assert!(headings.iter().all(|h| h.level <= 3));
    }
}
