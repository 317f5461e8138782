use std::collections::BTreeSet;

use serde::Serialize;

/// URL schemes whose links are admitted into the result set.
pub const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

/// Returns true when `url` starts with one of the allowed schemes followed by `://`.
///
/// Matching is an exact prefix test; no parsing or normalization is applied.
pub fn is_admissible(url: &str) -> bool {
    ALLOWED_SCHEMES.iter().any(|scheme| {
        url.strip_prefix(scheme)
            .is_some_and(|rest| rest.starts_with("://"))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Added,
    Duplicate,
    Rejected,
}

/// Deduplicated set of external links, keyed by exact string equality.
///
/// The set only ever grows. Iteration is in lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct UniqueLinkSet {
    links: BTreeSet<String>,
}

impl UniqueLinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, url: &str) -> Admission {
        if !is_admissible(url) {
            return Admission::Rejected;
        }
        if self.links.contains(url) {
            return Admission::Duplicate;
        }
        self.links.insert(url.to_owned());
        Admission::Added
    }

    pub fn contains(&self, url: &str) -> bool {
        self.links.contains(url)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.links.into_iter().collect()
    }
}

impl<'a> Extend<&'a str> for UniqueLinkSet {
    fn extend<I: IntoIterator<Item = &'a str>>(&mut self, iter: I) {
        for url in iter {
            self.admit(url);
        }
    }
}
