//! Contextual header synthesis (§4.4): a single line summarizing a
//! chunk's place in the document, composed only of the fields present.

use super::types::{ContentType, DocumentDomain, StructuralRole};

fn content_type_label(ct: ContentType) -> &'static str {
    match ct {
        ContentType::Text => "text",
        ContentType::Code => "code",
        ContentType::Table => "table",
        ContentType::List => "list",
        ContentType::Heading => "heading",
    }
}

fn role_label(role: StructuralRole) -> &'static str {
    match role {
        StructuralRole::Title => "title",
        StructuralRole::CodeBlock => "code_block",
        StructuralRole::TableContent => "table_content",
        StructuralRole::ListContent => "list_content",
        StructuralRole::Content => "content",
    }
}

/// Build `Document: T | Section: S | Type: C | Role: R | Domain: D | Tech:
/// K1,K2,K3`, omitting any field whose source value is absent.
pub fn build_contextual_header(
    document_title: Option<&str>,
    section: Option<&str>,
    content_type: ContentType,
    role: StructuralRole,
    domain: DocumentDomain,
    keywords: &[String],
) -> String {
    let mut parts = Vec::new();

    if let Some(title) = document_title.filter(|t| !t.is_empty()) {
        parts.push(format!("Document: {}", title));
    }
    if let Some(section) = section.filter(|s| !s.is_empty()) {
        parts.push(format!("Section: {}", section));
    }
    parts.push(format!("Type: {}", content_type_label(content_type)));
    parts.push(format!("Role: {}", role_label(role)));
    parts.push(format!("Domain: {}", domain));
    if !keywords.is_empty() {
        parts.push(format!("Tech: {}", keywords.join(",")));
    }

    parts.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omits_absent_document_and_section() {
        let header = build_contextual_header(None, None, ContentType::Text, StructuralRole::Content, DocumentDomain::General, &[]);
        assert_eq!(header, "Type: text | Role: content | Domain: General");
    }

    #[test]
    fn includes_all_present_fields_in_order() {
        let keywords = vec!["API".to_string(), "JSON".to_string()];
        let header = build_contextual_header(
            Some("Guide"),
            Some("Setup"),
            ContentType::Code,
            StructuralRole::CodeBlock,
            DocumentDomain::Technical,
            &keywords,
        );
        assert_eq!(header, "Document: Guide | Section: Setup | Type: code | Role: code_block | Domain: Technical | Tech: API,JSON");
    }
}
