//! Refine-stage orchestrator (§4.1): turns `RawContent` into `RefinedContent`
//! by running noise cleanup, table/list/image normalization, heading and
//! section detection, and (optionally) an LLM structural-enhancement pass.

use super::cleaner::{clean_noise, normalize_whitespace};
use super::headings::detect_headings;
use super::images::normalize_image_placeholders;
use super::lists::normalize_lists;
use super::sections::build_sections;
use super::tables::table_to_markdown;
use super::types::{DocumentMetadata, Location, RefinedContent, RefinementInfo, RefinementQuality, StructuredElement};
use crate::cancel::Ctx;
use crate::config::RefineOptions;
use crate::error::Result;
use crate::raw::RawContent;
use crate::services::{strip_code_fence, TextCompletion};
use tracing::{debug, warn};
use uuid::Uuid;

const CODE_FENCE_RE_PATTERN: &str = r"(?s)```[a-zA-Z0-9_+-]*\n.*?\n```";

fn code_fence_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(CODE_FENCE_RE_PATTERN).unwrap())
}

/// Find fenced code blocks and record them as `StructuredElement::Code`.
fn detect_code_blocks(text: &str) -> Vec<StructuredElement> {
    code_fence_re()
        .find_iter(text)
        .map(|m| {
            let block = m.as_str();
            let first_line_end = block.find('\n').unwrap_or(block.len());
            let lang_tag = block[3..first_line_end].trim();
            let language = if lang_tag.is_empty() {
                None
            } else {
                Some(lang_tag.to_string())
            };
            let content_start = first_line_end + 1;
            let content_end = block.rfind("```").unwrap_or(block.len());
            let content = block[content_start..content_end].trim_end_matches('\n').to_string();
            StructuredElement::Code {
                language,
                content,
                location: Location {
                    start_char: m.start(),
                    end_char: m.end(),
                },
                source_chunk_id: None,
            }
        })
        .collect()
}

/// Run the heuristic refine pipeline over `raw`, producing `RefinedContent`.
/// `llm` is consulted only when `options.use_llm` is set: the (possibly
/// truncated) text is sent to `analyze_structure`, and a high-confidence
/// response with extractable headings replaces the heuristic `text`/
/// `sections` outright. Any failure, unavailability, low confidence, or
/// unextractable response falls back silently to the heuristic output,
/// since LLM enhancement is never required for a valid refine result.
pub async fn refine(
    raw: &RawContent,
    options: &RefineOptions,
    llm: Option<&dyn TextCompletion>,
    ctx: &Ctx,
) -> Result<RefinedContent> {
    ctx.check()?;

    if raw.text.trim().is_empty() {
        debug!("raw text is blank, returning empty refined content");
        return Ok(RefinedContent {
            id: Uuid::new_v4(),
            raw_id: raw.id,
            text: String::new(),
            sections: Vec::new(),
            structures: Vec::new(),
            metadata: DocumentMetadata::default(),
            quality: RefinementQuality::compute(false, 0, 0),
            info: RefinementInfo {
                empty_input: true,
                ..Default::default()
            },
        });
    }

    let raw_len = raw.text.chars().count();
    let mut text = raw.text.clone();

    if options.clean_noise {
        text = clean_noise(&text);
    }

    if options.convert_tables_to_markdown && !raw.tables.is_empty() {
        let mut rendered_tables = String::new();
        for table in &raw.tables {
            rendered_tables.push_str(&table_to_markdown(table));
            rendered_tables.push('\n');
        }
        text.push_str("\n\n");
        text.push_str(&rendered_tables);
    }

    if options.preserve_lists {
        text = normalize_lists(&text);
    }

    let mut image_count = 0usize;
    if options.include_image_placeholders {
        let (rewritten, count) = normalize_image_placeholders(&text);
        text = rewritten;
        image_count = count;
    }

    if options.normalize_whitespace {
        text = normalize_whitespace(&text);
    }

    let mut structures = Vec::new();
    if options.extract_structures {
        if options.detect_code_blocks {
            structures.extend(detect_code_blocks(&text));
        }
    }

    let mut heading_level_distribution = std::collections::HashMap::new();
    let mut sections = Vec::new();
    let mut document_title = None;

    if options.preserve_headings {
        let detected = detect_headings(&text, options.min_heading_level, options.max_heading_level);
        for h in &detected {
            *heading_level_distribution.entry(h.level).or_insert(0usize) += 1;
        }
        if let Some(first) = detected.first() {
            document_title = Some(first.title.clone());
        }
        if options.build_sections {
            sections = build_sections(&text, &detected);
        }
    }

    let mut info = RefinementInfo {
        used_llm: false,
        llm_replaced_heuristic: false,
        heading_level_distribution,
        truncated_for_llm: false,
    };

    if options.use_llm {
        if let Some(llm) = llm {
            if llm.is_available(ctx).await {
                let char_count = text.chars().count();
                let llm_input = if char_count > options.llm_truncate_chars {
                    info.truncated_for_llm = true;
                    let mut truncated: String = text.chars().take(options.llm_truncate_chars).collect();
                    truncated.push_str("... (truncated)");
                    truncated
                } else {
                    text.clone()
                };

                match llm.analyze_structure(&llm_input, "document", ctx).await {
                    Ok(analysis) if analysis.confidence >= 0.5 && !analysis.sections.is_empty() => {
                        info.used_llm = true;
                        let extracted = strip_code_fence(&analysis.raw_response).to_string();
                        let replacement_headings =
                            detect_headings(&extracted, options.min_heading_level, options.max_heading_level);
                        if extracted.trim().is_empty() || replacement_headings.is_empty() {
                            debug!("llm structure analysis had no extractable headings, keeping heuristic sections");
                        } else {
                            let mut replacement_distribution = std::collections::HashMap::new();
                            for h in &replacement_headings {
                                *replacement_distribution.entry(h.level).or_insert(0usize) += 1;
                            }
                            info.heading_level_distribution = replacement_distribution;
                            if let Some(first) = replacement_headings.first() {
                                document_title = Some(first.title.clone());
                            }
                            sections = if options.build_sections {
                                build_sections(&extracted, &replacement_headings)
                            } else {
                                Vec::new()
                            };
                            text = extracted;
                            info.llm_replaced_heuristic = true;
                            debug!(sections = analysis.sections.len(), "llm structure analysis replaced heuristic output");
                        }
                    }
                    Ok(_) => {
                        info.used_llm = true;
                        debug!("llm structure analysis returned low confidence, keeping heuristic sections");
                    }
                    Err(err) => {
                        warn!(error = %err, "llm structure analysis failed, falling back to heuristic");
                    }
                }
            } else {
                debug!("llm unavailable for refine stage, using heuristic output only");
            }
        }
    }

    let metadata = DocumentMetadata {
        title: document_title,
        heading_levels_seen: {
            let mut levels: Vec<u8> = info.heading_level_distribution.keys().copied().collect();
            levels.sort_unstable();
            levels
        },
        header_paragraphs: Vec::new(),
        extra: {
            let mut extra = std::collections::HashMap::new();
            extra.insert("image_count".to_string(), serde_json::json!(image_count));
            extra
        },
    };

    let quality = RefinementQuality::compute(!structures.is_empty() || !sections.is_empty(), text.chars().count(), raw_len);

    Ok(RefinedContent {
        id: Uuid::new_v4(),
        raw_id: raw.id,
        text,
        sections,
        structures,
        metadata,
        quality,
        info,
    })
}
