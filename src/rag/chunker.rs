//! Line-based text splitter.
//!
//! Text is cut on a separator (a newline by default) and the pieces are
//! greedily packed into chunks of at most `chunk_size` characters. Each new
//! chunk starts with the shortest tail of the previous chunk that is at least
//! `chunk_overlap` characters long once trimmed, as long as that tail still
//! leaves room for the next piece. Pieces longer than `chunk_size` are never
//! cut.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// A chunk of the source text. Offsets are in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    pub chunk_index: usize,
    pub start_offset: usize,
    pub end_offset: usize,
}

#[derive(Debug, Clone, Copy)]
struct Piece<'a> {
    text: &'a str,
    start: usize,
    len: usize,
}

#[derive(Debug, Clone)]
pub struct CharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separator: String,
}

impl CharacterSplitter {
    /// Callers validate `chunk_overlap < chunk_size` through the config layer;
    /// an oversized overlap is clamped here so the splitter always progresses.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separator: "\n".to_string(),
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        let pieces = self.pieces(text);
        self.merge(&pieces)
    }

    fn pieces<'a>(&self, text: &'a str) -> Vec<Piece<'a>> {
        let sep_len = self.separator.chars().count();
        let mut offset = 0;
        let mut pieces = Vec::new();

        for part in text.split(self.separator.as_str()) {
            let len = part.chars().count();
            if !part.is_empty() {
                pieces.push(Piece {
                    text: part,
                    start: offset,
                    len,
                });
            }
            offset += len + sep_len;
        }

        pieces
    }

    fn merge(&self, pieces: &[Piece<'_>]) -> Vec<TextChunk> {
        let sep_len = self.separator.chars().count();
        let mut chunks = Vec::new();
        let mut window: VecDeque<Piece<'_>> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            if !window.is_empty() && total + sep_len + piece.len > self.chunk_size {
                self.emit(&window, &mut chunks);

                while let Some(front) = window.front() {
                    let front_cost = front.len + if window.len() > 1 { sep_len } else { 0 };
                    let remaining = total - front_cost;
                    let fits = total + sep_len + piece.len <= self.chunk_size;
                    if fits && self.trimmed_len(window.iter().skip(1)) < self.chunk_overlap {
                        break;
                    }
                    window.pop_front();
                    total = remaining;
                }
            }

            if !window.is_empty() {
                total += sep_len;
            }
            total += piece.len;
            window.push_back(*piece);
        }

        self.emit(&window, &mut chunks);
        chunks
    }

    /// Length of the pieces as they would appear in a stored chunk.
    fn trimmed_len<'p, 'a: 'p>(&self, pieces: impl Iterator<Item = &'p Piece<'a>>) -> usize {
        let joined = pieces.map(|p| p.text).collect::<Vec<_>>().join(self.separator.as_str());
        joined.trim().chars().count()
    }

    fn emit(&self, window: &VecDeque<Piece<'_>>, chunks: &mut Vec<TextChunk>) {
        let (Some(first), Some(last)) = (window.front(), window.back()) else {
            return;
        };

        let joined = window
            .iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join(&self.separator);
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            return;
        }

        let leading = joined.chars().count() - joined.trim_start().chars().count();
        let trailing = joined.chars().count() - joined.trim_end().chars().count();

        chunks.push(TextChunk {
            text: trimmed.to_string(),
            chunk_index: chunks.len(),
            start_offset: first.start + leading,
            end_offset: last.start + last.len - trailing,
        });
    }
}
