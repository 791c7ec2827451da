use std::collections::VecDeque;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 20;

/// Word-packing splitter. Chunks never exceed `chunk_size` characters and
/// each chunk after the first repeats up to `chunk_overlap` characters of
/// trailing words from its predecessor.
#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size / 2),
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: VecDeque<String> = VecDeque::new();
        let mut len = 0;

        for piece in self.pieces(text) {
            let plen = piece.chars().count();
            if !current.is_empty() && len + 1 + plen > self.chunk_size {
                chunks.push(join(&current));
                len = self.keep_overlap(&mut current);
                if !current.is_empty() && len + 1 + plen > self.chunk_size {
                    current.clear();
                    len = 0;
                }
            }
            len = if current.is_empty() { plen } else { len + 1 + plen };
            current.push_back(piece);
        }

        if !current.is_empty() {
            chunks.push(join(&current));
        }
        chunks
    }

    /// Drop leading words until what remains fits in the overlap.
    fn keep_overlap(&self, current: &mut VecDeque<String>) -> usize {
        let mut kept = 0;
        let mut keep_count = 0;
        for word in current.iter().rev() {
            let cost = word.chars().count() + usize::from(keep_count > 0);
            if kept + cost > self.chunk_overlap {
                break;
            }
            kept += cost;
            keep_count += 1;
        }
        let drop = current.len() - keep_count;
        current.drain(..drop);
        kept
    }

    /// Whitespace-separated words, with over-long words cut to `chunk_size`.
    fn pieces(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        for word in text.split_whitespace() {
            if word.chars().count() <= self.chunk_size {
                out.push(word.to_string());
                continue;
            }
            let chars: Vec<char> = word.chars().collect();
            out.extend(chars.chunks(self.chunk_size).map(|c| c.iter().collect::<String>()));
        }
        out
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

fn join(words: &VecDeque<String>) -> String {
    words.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}
