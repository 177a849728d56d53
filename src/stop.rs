/// Literal stop sequences matched against decoded text.
///
/// Matching is a plain substring search over the whole generated text, so a
/// stop sequence is found even when it straddles token boundaries.
#[derive(Debug, Clone, Default)]
pub struct StopMatcher {
    sequences: Vec<String>,
}

impl StopMatcher {
    /// Empty strings are dropped; they would match before any text exists.
    pub fn new<I, S>(sequences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sequences = sequences
            .into_iter()
            .filter(|s| !s.as_ref().is_empty())
            .map(|s| s.as_ref().to_string())
            .collect();
        Self { sequences }
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// First configured sequence found in `text`.
    pub fn find_in(&self, text: &str) -> Option<&str> {
        self.sequences
            .iter()
            .find(|stop| text.contains(stop.as_str()))
            .map(String::as_str)
    }
}
