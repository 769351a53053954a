use std::{cell::RefCell, rc::Rc};

use html_escape::decode_html_entities;
use lol_html::{
    HandlerResult, RewriteStrSettings, doc_text, element, errors::RewritingError,
    html_content::EndTag, rewrite_str,
};
use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};
use tracing::warn;

use super::error::DomainError;

/// `MMM d, yyyy`, e.g. `Mar 5, 2024`.
pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:short] [day padding:none], [year]");

const TITLE_MAX_CHARS: usize = 300;

pub fn format_human_date(at: OffsetDateTime) -> String {
    at.format(HUMAN_DATE_FORMAT)
        .unwrap_or_else(|_| at.date().to_string())
}

pub fn iso_date(at: OffsetDateTime) -> String {
    at.date().to_string()
}

/// Trim and check a submitted post title.
pub fn validate_title(raw: &str) -> Result<String, DomainError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(DomainError::validation("Title", "is required"));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(DomainError::validation("Title", "is too long"));
    }
    Ok(title.to_string())
}

/// Plain-text preview of serialized rich text, cut at `max_chars` characters.
///
/// Block elements act as word breaks, `script` and `style` bodies are dropped,
/// entities are decoded and whitespace collapsed. An ellipsis marks truncation.
pub fn plain_text_preview(html: &str, max_chars: usize) -> String {
    match extract_text(html) {
        Ok(raw) => {
            let decoded = decode_html_entities(&raw);
            let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
            truncate_chars(&collapsed, max_chars)
        }
        Err(err) => {
            warn!(
                target = "modernblog::domain::posts",
                error = %err,
                "failed to extract preview text"
            );
            String::new()
        }
    }
}

#[derive(Default)]
struct PreviewText {
    raw: String,
    skip_depth: usize,
}

fn extract_text(html: &str) -> Result<String, RewritingError> {
    let state = Rc::new(RefCell::new(PreviewText::default()));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("script, style, template, noscript", {
                    let state = Rc::clone(&state);
                    move |el| {
                        state.borrow_mut().skip_depth += 1;
                        if let Some(handlers) = el.end_tag_handlers() {
                            let state = Rc::clone(&state);
                            handlers.push(Box::new(
                                move |_end: &mut EndTag<'_>| -> HandlerResult {
                                    let mut state = state.borrow_mut();
                                    state.skip_depth = state.skip_depth.saturating_sub(1);
                                    Ok(())
                                },
                            ) as lol_html::EndTagHandler<'static>);
                        }
                        Ok(())
                    }
                }),
                element!(BLOCK_SELECTOR, {
                    let state = Rc::clone(&state);
                    move |el| {
                        state.borrow_mut().raw.push(' ');
                        if let Some(handlers) = el.end_tag_handlers() {
                            let state = Rc::clone(&state);
                            handlers.push(Box::new(
                                move |_end: &mut EndTag<'_>| -> HandlerResult {
                                    state.borrow_mut().raw.push(' ');
                                    Ok(())
                                },
                            ) as lol_html::EndTagHandler<'static>);
                        }
                        Ok(())
                    }
                }),
            ],
            document_content_handlers: vec![doc_text!({
                let state = Rc::clone(&state);
                move |chunk| {
                    let mut state = state.borrow_mut();
                    if state.skip_depth == 0 {
                        state.raw.push_str(chunk.as_str());
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )?;

    let raw = std::mem::take(&mut state.borrow_mut().raw);
    Ok(raw)
}

const BLOCK_SELECTOR: &str =
    "p, br, li, ul, ol, h1, h2, h3, h4, h5, h6, blockquote, pre, hr, div, tr, td, th";

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars).collect();
    let cut = match cut.rfind(' ') {
        Some(idx) if idx > max_chars / 2 => &cut[..idx],
        _ => cut.as_str(),
    };
    format!("{}…", cut.trim_end())
}
