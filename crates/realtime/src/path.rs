use crate::error::{RealtimeError, Result};
use std::fmt;

const FORBIDDEN_KEY_CHARS: [char; 6] = ['.', '$', '#', '[', ']', '/'];

/// A location in the realtime tree, e.g. `orderService/18102026/ABC1234`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DbPath {
    segments: Vec<String>,
}

impl DbPath {
    /// The root of the tree.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a slash separated path. Empty segments are skipped, so
    /// `"/a//b/"` is the same location as `"a/b"`.
    pub fn parse(path: &str) -> Result<Self> {
        let mut parsed = Self::root();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            parsed = parsed.child(segment)?;
        }
        Ok(parsed)
    }

    /// Location of a direct child of this path.
    pub fn child(&self, key: &str) -> Result<Self> {
        validate_key(key)?;
        let mut segments = self.segments.clone();
        segments.push(key.to_string());
        Ok(Self { segments })
    }

    /// Location of `relative` resolved below this path.
    pub fn join(&self, relative: &DbPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(relative.segments.iter().cloned());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for DbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(RealtimeError::invalid_path("empty key"));
    }
    if let Some(c) = key
        .chars()
        .find(|c| FORBIDDEN_KEY_CHARS.contains(c) || c.is_control())
    {
        return Err(RealtimeError::invalid_path(format!(
            "key '{}' contains forbidden character {:?}",
            key, c
        )));
    }
    Ok(())
}
