//! Token-bounded splitting for structured text (tables, lists, TSV).
//!
//! Lines are the unit: a table row or list item is never cut unless it alone
//! exceeds the token budget, in which case it falls back to word windows.
use anyhow::{anyhow, Result};
use std::path::Path;
use tokenizers::Tokenizer;

pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Word-count approximation (~0.75 words per token).
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

impl TokenCounter for HeuristicTokenCounter {
    fn count(&self, text: &str) -> usize {
        let words = text.split_whitespace().count();
        if words == 0 {
            return 0;
        }
        ((words as f32 / 0.75).ceil() as usize).max(1)
    }
}

/// Exact counts from a HuggingFace `tokenizer.json`.
pub struct HfTokenCounter {
    tokenizer: Tokenizer,
}

impl HfTokenCounter {
    pub fn from_file(path: &Path) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", path.display(), e))?;
        Ok(Self { tokenizer })
    }
}

impl TokenCounter for HfTokenCounter {
    fn count(&self, text: &str) -> usize {
        match self.tokenizer.encode(text, false) {
            Ok(enc) => enc.get_ids().len(),
            Err(_) => HeuristicTokenCounter.count(text),
        }
    }
}

pub struct TokenSplitter<'a> {
    max_tokens: usize,
    overlap_tokens: usize,
    counter: &'a dyn TokenCounter,
}

impl<'a> TokenSplitter<'a> {
    pub fn new(max_tokens: usize, overlap_tokens: usize, counter: &'a dyn TokenCounter) -> Self {
        let max_tokens = max_tokens.max(1);
        Self { max_tokens, overlap_tokens: overlap_tokens.min(max_tokens - 1), counter }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let mut units: Vec<(String, usize)> = Vec::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let tokens = self.counter.count(line);
            if tokens <= self.max_tokens {
                units.push((line.to_string(), tokens));
            } else {
                for piece in self.split_long_line(line) {
                    let t = self.counter.count(&piece);
                    units.push((piece, t));
                }
            }
        }

        let mut chunks = Vec::new();
        let mut window: Vec<(String, usize)> = Vec::new();
        let mut total = 0usize;
        for (line, tokens) in units {
            if total + tokens > self.max_tokens && !window.is_empty() {
                chunks.push(join_lines(&window));
                // carry trailing lines that fit in the overlap budget
                let mut carried = Vec::new();
                let mut carried_tokens = 0usize;
                for (l, t) in window.iter().rev() {
                    if carried_tokens + t > self.overlap_tokens || carried_tokens + t + tokens > self.max_tokens {
                        break;
                    }
                    carried_tokens += t;
                    carried.push((l.clone(), *t));
                }
                carried.reverse();
                window = carried;
                total = carried_tokens;
            }
            total += tokens;
            window.push((line, tokens));
        }
        if !window.is_empty() {
            chunks.push(join_lines(&window));
        }
        chunks
    }

    fn split_long_line(&self, line: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for word in line.split_whitespace() {
            current.push(word);
            if current.len() > 1 && self.counter.count(&current.join(" ")) > self.max_tokens {
                current.pop();
                pieces.push(current.join(" "));
                current = vec![word];
            }
        }
        if !current.is_empty() {
            pieces.push(current.join(" "));
        }
        pieces
    }
}

fn join_lines(window: &[(String, usize)]) -> String {
    window.iter().map(|(l, _)| l.as_str()).collect::<Vec<_>>().join("\n")
}
