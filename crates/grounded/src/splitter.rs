use anyhow::{anyhow, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Splits text on the coarsest separator that keeps pieces under the chunk size,
/// falling back to finer separators, then merges neighbouring pieces back up to
/// the chunk size with some overlap between consecutive chunks.
///
/// Lengths are measured in characters.
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for RecursiveCharacterSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                " ".to_string(),
                String::new(),
            ],
        }
    }
}

impl RecursiveCharacterSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(anyhow!("chunk size must be greater than zero"));
        }
        if chunk_overlap >= chunk_size {
            return Err(anyhow!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap,
                chunk_size
            ));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            ..Self::default()
        })
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, &self.separators)
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();

        // Pick the first separator present in the text; "" always matches
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut finer: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                finer = &separators[i + 1..];
                break;
            }
        }

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator)
                .filter(|piece| !piece.is_empty())
                .map(String::from)
                .collect()
        };

        let mut fitting = Vec::new();
        for piece in pieces {
            if char_len(&piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting, separator));
                fitting.clear();
            }
            if finer.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_with(&piece, finer));
            }
        }
        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting, separator));
        }

        chunks
    }

    fn merge(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(piece);
            let joined_len = |current: &Vec<&str>| if current.is_empty() { 0 } else { separator_len };

            if total + len + joined_len(&current) > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        size = total,
                        chunk_size = self.chunk_size,
                        "created a chunk larger than the chunk size"
                    );
                }
                if !current.is_empty() {
                    push_chunk(&mut chunks, &current, separator);

                    // Drop leading pieces until only the overlap remains and the
                    // next piece fits
                    while total > self.chunk_overlap
                        || (total + len + joined_len(&current) > self.chunk_size && total > 0)
                    {
                        let first = current.remove(0);
                        total -= char_len(first) + if current.is_empty() { 0 } else { separator_len };
                    }
                }
            }

            current.push(piece);
            total += len + if current.len() > 1 { separator_len } else { 0 };
        }

        push_chunk(&mut chunks, &current, separator);
        chunks
    }
}

fn push_chunk(chunks: &mut Vec<String>, pieces: &[&str], separator: &str) {
    let chunk = pieces.join(separator);
    let chunk = chunk.trim();
    if !chunk.is_empty() {
        chunks.push(chunk.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
