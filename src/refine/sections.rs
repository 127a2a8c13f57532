//! Section-tree assembly (§4.1 step 6): turn a flat list of detected
//! headings into the nested `Section` tree used for heading-path lookups.

use super::headings::DetectedHeading;
use super::types::Section;

/// Build a forest of `Section`s from headings found in `text`, each
/// section's range running from its own heading line to the start of the
/// next heading at the same or shallower level (or end of document).
pub fn build_sections(text: &str, headings: &[DetectedHeading]) -> Vec<Section> {
    if headings.is_empty() {
        return Vec::new();
    }

    let mut stack: Vec<Section> = Vec::new();
    let mut roots: Vec<Section> = Vec::new();

    for (i, heading) in headings.iter().enumerate() {
        let end = headings
            .get(i + 1)
            .map(|next| next.line_start)
            .unwrap_or(text.len());
        let content = text.get(heading.line_end..end).unwrap_or("").to_string();

        let mut section = Section::new(heading.title.clone(), heading.level, heading.line_start, end);
        section.content_start = heading.line_end;
        section.content = content;

        while let Some(top) = stack.last() {
            if top.level >= section.level {
                let finished = stack.pop().unwrap();
                attach(&mut stack, &mut roots, finished);
            } else {
                break;
            }
        }

        stack.push(section);
    }

    while let Some(finished) = stack.pop() {
        attach(&mut stack, &mut roots, finished);
    }

    roots
}

fn attach(stack: &mut [Section], roots: &mut Vec<Section>, section: Section) {
    if let Some(parent) = stack.last_mut() {
        parent.end = parent.end.max(section.end);
        parent.children.push(section);
    } else {
        roots.push(section);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refine::headings::detect_headings;

    #[test]
    fn builds_nested_tree_from_levels() {
        let text = "# A\nintro\n## A.1\nbody\n## A.2\nmore\n# B\nfinal";
        let headings = detect_headings(text, 1, 6);
        let sections = build_sections(text, &headings);

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "A");
        assert_eq!(sections[0].children.len(), 2);
        assert_eq!(sections[0].children[0].title, "A.1");
        assert_eq!(sections[1].title, "B");
        assert!(sections[1].children.is_empty());
    }

    #[test]
    fn flat_text_with_no_headings_has_no_sections() {
        let text = "just a paragraph, no structure";
        let headings = detect_headings(text, 1, 6);
        assert!(build_sections(text, &headings).is_empty());
    }

    #[test]
    fn last_section_runs_to_end_of_document() {
        let text = "# Only\nall the rest of the text belongs here";
        let headings = detect_headings(text, 1, 6);
        let sections = build_sections(text, &headings);
        assert_eq!(sections[0].end, text.len());
    }
}
