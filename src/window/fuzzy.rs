//! Partial-ratio fuzzy scoring for window titles.
//!
//! The score is the best `2*M/T` similarity between the shorter string and any
//! equally long window of the longer one, anchored at the matching blocks of a
//! longest-common-substring decomposition. Scores are integers in 0..=100.

/// Normalizes a string for scoring: every non-word character becomes a space,
/// letters are lowercased and the result is trimmed.
pub fn full_process(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' {
                c
            } else {
                ' '
            }
        })
        .collect();
    replaced.to_lowercase().trim().to_string()
}

/// Partial-ratio similarity between two already processed strings.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    if a == b {
        return 100;
    }
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };

    let mut best = 0.0f64;
    for block in matching_blocks(shorter, longer) {
        let long_start = block.b.saturating_sub(block.a);
        let long_end = (long_start + shorter.len()).min(longer.len());
        let window = &longer[long_start..long_end];

        let r = ratio(shorter, window);
        if r > 0.995 {
            return 100;
        }
        if r > best {
            best = r;
        }
    }

    (100.0 * best).round_ties_even() as u8
}

/// Convenience: process both sides, then score.
pub fn score(pattern: &str, title: &str) -> u8 {
    partial_ratio(&full_process(pattern), &full_process(title))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Block {
    a: usize,
    b: usize,
    len: usize,
}

fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches: usize = matching_blocks(a, b).iter().map(|blk| blk.len).sum();
    2.0 * matches as f64 / total as f64
}

/// Longest matching block in `a[alo..ahi]` / `b[blo..bhi]`.
///
/// Among equally long blocks the one starting earliest in `a` wins, then the
/// one starting earliest in `b`.
fn longest_match(a: &[char], b: &[char], alo: usize, ahi: usize, blo: usize, bhi: usize) -> Block {
    let mut best = Block { a: alo, b: blo, len: 0 };
    let mut prev = vec![0usize; bhi - blo + 1];

    for i in alo..ahi {
        let mut cur = vec![0usize; bhi - blo + 1];
        for j in blo..bhi {
            if a[i] != b[j] {
                continue;
            }
            // cur[k] holds the run length ending at b[blo + k - 1]
            let k = prev[j - blo] + 1;
            cur[j - blo + 1] = k;
            if k > best.len {
                best = Block {
                    a: i + 1 - k,
                    b: j + 1 - k,
                    len: k,
                };
            }
        }
        prev = cur;
    }

    best
}

/// All matching blocks, sorted, adjacent blocks merged, terminated by a
/// zero-length sentinel at `(a.len(), b.len())`.
fn matching_blocks(a: &[char], b: &[char]) -> Vec<Block> {
    let mut queue = vec![(0, a.len(), 0, b.len())];
    let mut found = Vec::new();

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let m = longest_match(a, b, alo, ahi, blo, bhi);
        if m.len == 0 {
            continue;
        }
        found.push(m);
        if alo < m.a && blo < m.b {
            queue.push((alo, m.a, blo, m.b));
        }
        if m.a + m.len < ahi && m.b + m.len < bhi {
            queue.push((m.a + m.len, ahi, m.b + m.len, bhi));
        }
    }
    found.sort();

    let mut merged: Vec<Block> = Vec::with_capacity(found.len() + 1);
    for blk in found {
        match merged.last_mut() {
            Some(last) if last.a + last.len == blk.a && last.b + last.len == blk.b => {
                last.len += blk.len;
            }
            _ => merged.push(blk),
        }
    }
    merged.push(Block {
        a: a.len(),
        b: b.len(),
        len: 0,
    });
    merged
}
