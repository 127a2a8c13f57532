//! List detection and markdown normalization (§4.1 step 4): bullet glyphs,
//! existing markdown list markers, and numbered-item patterns all become
//! canonical `- item` / `1. item` markdown.

const BULLET_GLYPHS: &[char] = &['•', '◦', '▪', '‣', '·', '○', '●'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedList {
    pub items: Vec<String>,
    pub ordered: bool,
    pub line_start: usize,
    pub line_end: usize,
}

fn bullet_item(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
        return Some(rest.trim());
    }
    for &glyph in BULLET_GLYPHS {
        if let Some(rest) = trimmed.strip_prefix(glyph) {
            let rest = rest.trim_start();
            if !rest.is_empty() {
                return Some(rest);
            }
        }
    }
    None
}

fn numbered_item(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let digit_end = trimmed.find(|c: char| !c.is_ascii_digit())?;
    if digit_end == 0 {
        return None;
    }
    let rest = &trimmed[digit_end..];
    let rest = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')'))?;
    let rest = rest.trim_start();
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}

/// Normalize every bullet/numbered line in `text` to canonical markdown
/// (`- item`, `1. item`), preserving all other lines unchanged.
pub fn normalize_lists(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut ordinal = 1u32;
    let mut in_ordered_run = false;

    for line in text.lines() {
        if let Some(item) = bullet_item(line) {
            out.push_str("- ");
            out.push_str(item);
            out.push('\n');
            in_ordered_run = false;
            ordinal = 1;
        } else if let Some(item) = numbered_item(line) {
            if !in_ordered_run {
                ordinal = 1;
                in_ordered_run = true;
            }
            out.push_str(&ordinal.to_string());
            out.push_str(". ");
            out.push_str(item);
            out.push('\n');
            ordinal += 1;
        } else {
            out.push_str(line);
            out.push('\n');
            in_ordered_run = false;
            ordinal = 1;
        }
    }

    if !text.ends_with('\n') {
        out.pop();
    }
    out
}

/// Collect contiguous runs of bullet or numbered lines as `StructuredElement`
/// candidates, recorded before normalization for metadata purposes.
pub fn detect_lists(text: &str) -> Vec<DetectedList> {
    let mut lists = Vec::new();
    let mut current_items: Vec<String> = Vec::new();
    let mut current_ordered = false;
    let mut current_start = 0usize;
    let mut offset = 0usize;
    let mut run_active = false;

    for line in text.split_inclusive('\n') {
        let trimmed_line = line.trim_end_matches('\n');
        let line_len = line.len();
        let this_start = offset;
        offset += line_len;

        let (item, ordered) = if let Some(item) = bullet_item(trimmed_line) {
            (Some(item), false)
        } else if let Some(item) = numbered_item(trimmed_line) {
            (Some(item), true)
        } else {
            (None, false)
        };

        match item {
            Some(item) => {
                if !run_active {
                    current_start = this_start;
                    run_active = true;
                    current_ordered = ordered;
                }
                current_items.push(item.to_string());
            }
            None => {
                if run_active {
                    lists.push(DetectedList {
                        items: std::mem::take(&mut current_items),
                        ordered: current_ordered,
                        line_start: current_start,
                        line_end: this_start,
                    });
                    run_active = false;
                }
            }
        }
    }
    if run_active {
        lists.push(DetectedList {
            items: current_items,
            ordered: current_ordered,
            line_start: current_start,
            line_end: offset,
        });
    }

    lists
}
