use std::collections::HashSet;

/// Static allow-list of task types this agent accepts.
///
/// An empty set means every type is allowed. Built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportedTypes {
    types: HashSet<String>,
}

impl SupportedTypes {
    /// Allow every task type.
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list such as `"hping3,slowhttptest"`.
    ///
    /// Entries are trimmed and empty entries are ignored, so `""` yields the allow-all set.
    pub fn parse(list: &str) -> Self {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Returns `true` if a task of type `kind` may be started.
    pub fn allows(&self, kind: &str) -> bool {
        self.types.is_empty() || self.types.contains(kind)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for SupportedTypes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            types: iter.into_iter().map(Into::into).collect(),
        }
    }
}
