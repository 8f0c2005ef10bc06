//! Overlap-aware text merging.
//!
//! Auto-generated captions repeat the tail of the previous cue at the head of
//! the next one. Merging keeps only the new part of each fragment.

/// Length in bytes of the longest suffix of `a` that is a prefix of `b`.
///
/// Only char boundaries of `b` are considered, so the result is always a
/// valid split point for `b`.
pub fn longest_overlap(a: &str, b: &str) -> usize {
    b.char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .filter(|&len| len <= a.len() && a.ends_with(&b[..len]))
        .last()
        .unwrap_or(0)
}

/// Merge fragments in order, appending only the non-repeated parts.
pub fn merge_texts<S: AsRef<str>>(texts: &[S]) -> String {
    let mut merged = String::new();

    for text in texts.iter().map(AsRef::as_ref) {
        if merged.is_empty() {
            merged.push_str(text);
            continue;
        }
        if merged.contains(text) {
            continue;
        }

        let overlap = longest_overlap(&merged, text);
        let addition = if overlap > 0 { text[overlap..].trim() } else { text };
        if !addition.is_empty() {
            merged.push(' ');
            merged.push_str(addition);
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_overlap() {
        assert_eq!(longest_overlap("the cat sat", "cat sat on the mat"), 7);
        assert_eq!(longest_overlap("abc", "xyz"), 0);
        assert_eq!(longest_overlap("", "abc"), 0);
        assert_eq!(longest_overlap("abc", "abc"), 3);
    }

    #[test]
    fn test_longest_overlap_multibyte() {
        assert_eq!(longest_overlap("über straße", "straße frei"), "straße".len());
        assert_eq!(longest_overlap("日本語", "語です"), "語".len());
    }

    #[test]
    fn test_merge_overlapping() {
        assert_eq!(
            merge_texts(&["the cat sat", "cat sat on the mat"]),
            "the cat sat on the mat"
        );
    }

    #[test]
    fn test_merge_idempotent() {
        let a = "we will be right back";
        assert_eq!(merge_texts(&[a, a]), merge_texts(&[a]));
    }

    #[test]
    fn test_merge_contained_and_disjoint() {
        assert_eq!(merge_texts(&["hello world", "world"]), "hello world");
        assert_eq!(merge_texts(&["hello", "there"]), "hello there");
        assert_eq!(merge_texts::<&str>(&[]), "");
    }
}
