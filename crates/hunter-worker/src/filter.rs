//! Keyword pre-filter applied before classification.

/// Case-insensitive substring filter. An empty keyword set matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn matches(&self, text: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let text = text.to_lowercase();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_matches_all() {
        let filter = KeywordFilter::new::<&str>(&[]);
        assert!(filter.is_empty());
        assert!(filter.matches("anything at all"));

        let blank = KeywordFilter::new(&["  ", ""]);
        assert!(blank.is_empty());
    }

    #[test]
    fn test_case_insensitive_substring() {
        let filter = KeywordFilter::new(&["Hate", " idiot "]);
        assert!(filter.matches("I HATE this"));
        assert!(filter.matches("what an Idiotic take"));
        assert!(!filter.matches("lovely weather"));
    }
}
