//! Image placeholder normalization (§4.1 step 5): whatever a reader embeds
//! for an image (raw markdown image syntax, a bare reference token, or
//! nothing at all) is normalized to `![alt](embedded:img_N)` so downstream
//! stages have one canonical form to look for.

use regex::Regex;
use std::sync::OnceLock;

fn markdown_image_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!\[([^\]]*)\]\(([^)]*)\)").unwrap())
}

/// Rewrite every markdown image in `text` to `![alt](embedded:img_N)`,
/// numbered in document order starting at 1. Returns the rewritten text
/// and the count of images normalized.
pub fn normalize_image_placeholders(text: &str) -> (String, usize) {
    let mut count = 0usize;
    let rewritten = markdown_image_re()
        .replace_all(text, |caps: &regex::Captures| {
            count += 1;
            let alt = &caps[1];
            format!("![{}](embedded:img_{})", alt, count)
        })
        .into_owned();
    (rewritten, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_image_references_in_order() {
        let text = "see ![a diagram](fig1.png) and ![second](fig2.jpg)";
        let (rewritten, count) = normalize_image_placeholders(text);
        assert_eq!(count, 2);
        assert!(rewritten.contains("![a diagram](embedded:img_1)"));
        assert!(rewritten.contains("![second](embedded:img_2)"));
    }

    #[test]
    fn preserves_empty_alt_text() {
        let text = "![](raw.png)";
        let (rewritten, count) = normalize_image_placeholders(text);
        assert_eq!(count, 1);
        assert_eq!(rewritten, "![](embedded:img_1)");
    }

    #[test]
    fn text_without_images_is_unchanged() {
        let text = "no images here at all";
        let (rewritten, count) = normalize_image_placeholders(text);
        assert_eq!(count, 0);
        assert_eq!(rewritten, text);
    }
}
