//! Splits documents into retrieval chunks.
//!
//! Two layouts are recognized:
//! - documents with `#` header lines are cut before every header, so each
//!   header stays with its body
//! - everything else is cut on blank lines, and consecutive paragraphs are
//!   packed together while they fit under [`MAX_CHUNK_CHARS`]
//!
//! Pieces shorter than [`MIN_CHUNK_CHARS`] are folded into a neighbor so the
//! index never holds a stray heading or one-line fragment on its own.

use doppel_core::{Chunk, Document};

pub const MIN_CHUNK_CHARS: usize = 50;
pub const MAX_CHUNK_CHARS: usize = 500;

/// Chunk every document, numbering chunks across the whole corpus.
pub fn chunk_corpus(documents: &[Document]) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for doc in documents {
        for text in split_document(&doc.text) {
            chunks.push(Chunk {
                source: doc.label.clone(),
                ordinal: chunks.len(),
                text,
            });
        }
    }
    chunks
}

/// Split one document's text into chunk texts, in document order.
pub fn split_document(text: &str) -> Vec<String> {
    let pieces = if has_section_markers(text) {
        split_sections(text)
    } else {
        pack_paragraphs(split_paragraphs(text))
    };
    merge_short(pieces)
}

fn has_section_markers(text: &str) -> bool {
    text.lines().any(|l| l.trim_start().starts_with('#'))
}

fn split_sections(text: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim_start().starts_with('#') && !current.is_empty() {
            push_trimmed(&mut sections, &current.join("\n"));
            current.clear();
        }
        current.push(line);
    }
    push_trimmed(&mut sections, &current.join("\n"));
    sections
}

fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                push_trimmed(&mut paragraphs, &current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    push_trimmed(&mut paragraphs, &current.join("\n"));
    paragraphs
}

fn pack_paragraphs(paragraphs: Vec<String>) -> Vec<String> {
    let mut packed = Vec::new();
    let mut current = String::new();

    for para in paragraphs {
        if current.is_empty() {
            current = para;
        } else if char_len(&current) + 2 + char_len(&para) < MAX_CHUNK_CHARS {
            current.push_str("\n\n");
            current.push_str(&para);
        } else {
            packed.push(std::mem::replace(&mut current, para));
        }
    }
    if !current.is_empty() {
        packed.push(current);
    }
    packed
}

/// Fold pieces under the minimum into the following piece, or into the
/// preceding one when nothing follows. A document made of a single short
/// piece keeps it.
fn merge_short(pieces: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    let mut carry: Option<String> = None;

    for piece in pieces {
        let text = match carry.take() {
            Some(prev) => format!("{prev}\n\n{piece}"),
            None => piece,
        };
        if char_len(&text) < MIN_CHUNK_CHARS {
            carry = Some(text);
        } else {
            merged.push(text);
        }
    }

    if let Some(rest) = carry {
        match merged.last_mut() {
            Some(last) => {
                last.push_str("\n\n");
                last.push_str(&rest);
            }
            None => merged.push(rest),
        }
    }
    merged
}

fn push_trimmed(out: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
