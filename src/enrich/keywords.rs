//! Domain keyword allow-lists and content-type/domain classifiers (§4.4).

use super::types::{ContentType, DocumentDomain};
use std::collections::HashMap;

const TECHNICAL_KEYWORDS: &[&str] = &[
    "API", "REST", "GraphQL", "JSON", "XML", "HTTP", "HTTPS", "SSL", "TLS", "JWT", "OAuth", "SQL",
    "NoSQL", "MongoDB", "PostgreSQL", "MySQL", "Docker", "Kubernetes", "AWS", "Azure", "GCP",
    "CI/CD", "DevOps",
];

const TECHNICAL_TOPICS: &[&str] = &["api", "architecture", "database", "security"];
const BUSINESS_TOPICS: &[&str] = &["strategy", "finance", "marketing", "operations"];
const ACADEMIC_TOPICS: &[&str] = &["research", "theory", "results", "literature"];

const TECHNICAL_DOMAIN_WORDS: &[&str] = &[
    "api", "server", "database", "code", "function", "algorithm", "software", "system",
    "architecture", "deployment", "container", "query", "endpoint", "framework", "library",
];
const BUSINESS_DOMAIN_WORDS: &[&str] = &[
    "revenue", "market", "customer", "strategy", "sales", "budget", "stakeholder", "quarter",
    "profit", "growth", "investment", "roi", "forecast",
];
const ACADEMIC_DOMAIN_WORDS: &[&str] = &[
    "research", "hypothesis", "methodology", "literature", "citation", "study", "experiment",
    "theory", "analysis", "findings", "abstract", "peer-reviewed",
];

fn lowercase_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .map(|w| w.to_ascii_lowercase())
        .collect()
}

/// Keyword density over lower-cased tokens longer than 3 characters,
/// matching `words` against `vocabulary`.
fn keyword_density(words: &[String], vocabulary: &[&str]) -> f32 {
    if words.is_empty() {
        return 0.0;
    }
    let hits = words.iter().filter(|w| vocabulary.contains(&w.as_str())).count();
    hits as f32 / words.len() as f32
}

/// Decide a document's subject-matter domain from keyword density across
/// its full refined text. Defaults to `General` when no domain's density
/// clears the threshold; this is recorded, not an error.
pub fn classify_domain(text: &str) -> DocumentDomain {
    let words = lowercase_words(text);
    let technical = keyword_density(&words, TECHNICAL_DOMAIN_WORDS);
    let business = keyword_density(&words, BUSINESS_DOMAIN_WORDS);
    let academic = keyword_density(&words, ACADEMIC_DOMAIN_WORDS);

    const THRESHOLD: f32 = 0.02;
    let scores = [
        (DocumentDomain::Technical, technical),
        (DocumentDomain::Business, business),
        (DocumentDomain::Academic, academic),
    ];

    scores
        .iter()
        .filter(|(_, score)| *score >= THRESHOLD)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(domain, _)| *domain)
        .unwrap_or(DocumentDomain::General)
}

/// Per-topic keyword density for `domain`'s topic set, scored over `text`.
pub fn topic_scores(domain: DocumentDomain, text: &str) -> HashMap<String, f32> {
    let words = lowercase_words(text);
    let topics: &[&str] = match domain {
        DocumentDomain::Technical => TECHNICAL_TOPICS,
        DocumentDomain::Business => BUSINESS_TOPICS,
        DocumentDomain::Academic => ACADEMIC_TOPICS,
        DocumentDomain::General => return HashMap::new(),
    };
    topics
        .iter()
        .map(|topic| {
            let density = keyword_density(&words, &[topic]);
            (capitalize(topic), density)
        })
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Technical keywords present in `text`, matched case-insensitively,
/// deduplicated and reported uppercased.
pub fn technical_keywords_in(text: &str) -> Vec<String> {
    let lowered = text.to_ascii_lowercase();
    let mut found: Vec<String> = TECHNICAL_KEYWORDS
        .iter()
        .filter(|kw| lowered.contains(&kw.to_ascii_lowercase()))
        .map(|kw| kw.to_ascii_uppercase())
        .collect();
    found.sort();
    found.dedup();
    found
}

fn looks_like_code(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with("```")
        || trimmed.contains("fn ")
        || trimmed.contains("def ")
        || trimmed.contains("function ")
        || trimmed.contains("class ")
        || trimmed.contains("{\n")
        || trimmed.contains("=>")
        || trimmed.contains("#include")
}

fn pipe_table_line_count(text: &str) -> usize {
    text.lines().filter(|l| l.matches('|').count() >= 2).count()
}

fn looks_like_list(text: &str) -> bool {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.is_empty() {
        return false;
    }
    let list_lines = lines
        .iter()
        .filter(|l| {
            l.starts_with("- ") || l.starts_with("* ") || l.starts_with("+ ") || starts_with_ordinal(l)
        })
        .count();
    list_lines as f32 / lines.len() as f32 > 0.5
}

fn starts_with_ordinal(line: &str) -> bool {
    let digits: String = line.chars().take_while(|c| c.is_ascii_digit()).collect();
    !digits.is_empty() && line[digits.len()..].starts_with(". ")
}

fn looks_like_heading(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.lines().count() != 1 {
        return false;
    }
    trimmed.len() < 100
        && (trimmed.starts_with('#') || trimmed.chars().next().map(|c| c.is_uppercase()).unwrap_or(false))
        && !ends_with_period(trimmed)
}

fn ends_with_period(text: &str) -> bool {
    text.ends_with('.')
}

/// Classify a chunk's dominant content type by surface-level rules (§4.4):
/// code fence/signature beats table beats list beats short capitalized
/// heading, else plain text.
pub fn classify_content_type(text: &str) -> ContentType {
    if looks_like_code(text) {
        ContentType::Code
    } else if pipe_table_line_count(text) >= 2 {
        ContentType::Table
    } else if looks_like_list(text) {
        ContentType::List
    } else if looks_like_heading(text) {
        ContentType::Heading
    } else {
        ContentType::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_code_fence() {
        assert_eq!(classify_content_type("```rust\nfn main() {}\n```"), ContentType::Code);
    }

    #[test]
    fn detects_table_by_pipe_lines() {
        let text = "| a | b |\n| - | - |\n| 1 | 2 |";
        assert_eq!(classify_content_type(text), ContentType::Table);
    }

    #[test]
    fn detects_bullet_list() {
        let text = "- first item\n- second item\n- third item";
        assert_eq!(classify_content_type(text), ContentType::List);
    }

    #[test]
    fn detects_short_capitalized_heading() {
        assert_eq!(classify_content_type("Introduction"), ContentType::Heading);
    }

    #[test]
    fn falls_back_to_plain_text() {
        let text = "This is a normal paragraph of prose with several full sentences in it.";
        assert_eq!(classify_content_type(text), ContentType::Text);
    }

    #[test]
    fn finds_and_dedups_technical_keywords() {
        let text = "We expose a REST api over http and https, backed by postgresql and Docker.";
        let found = technical_keywords_in(text);
        assert!(found.contains(&"REST".to_string()));
        assert!(found.contains(&"POSTGRESQL".to_string()));
        assert!(found.contains(&"DOCKER".to_string()));
    }

    #[test]
    fn classifies_technical_domain() {
        let text = "Our api server architecture uses a database and container deployment pipeline for every endpoint and query.";
        assert_eq!(classify_domain(text), DocumentDomain::Technical);
    }

    #[test]
    fn defaults_to_general_domain() {
        let text = "The cat sat on the mat and looked out the window at the birds.";
        assert_eq!(classify_domain(text), DocumentDomain::General);
    }
}
