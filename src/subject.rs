//! Canonical subject identifiers.
//!
//! Phenotype tables and directory listings spell the same subject
//! differently: the CSV column is often read back as an integer (`10001`,
//! sometimes `10001.0`), while directories keep the zero-padded form
//! (`0010001`).  Both are coerced to a 7-character, zero-left-padded string
//! which is the only join key used by the pipeline.
use std::fmt;

/// Width of the canonical identifier.
pub const ID_WIDTH: usize = 7;

/// A canonical subject identifier (`"0000123"`).
///
/// Ordering is lexicographic on the padded string, which for all-digit ids
/// of equal width is also numeric order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubjectId(String);

impl SubjectId {
    /// Canonicalise any textual spelling of an identifier.
    ///
    /// Surrounding whitespace and a trailing `.0` (float-formatted CSV cell)
    /// are removed, then the digits are left-padded with `0` to
    /// [`ID_WIDTH`].  Longer ids are kept as-is.  Returns `None` for empty
    /// or non-digit input such as directory names like `.DS_Store`.
    ///
    /// ```
    /// use roiset::SubjectId;
    /// assert_eq!(SubjectId::parse("123").unwrap().as_str(), "0000123");
    /// assert_eq!(SubjectId::parse(" 10001.0 ").unwrap().as_str(), "0010001");
    /// assert!(SubjectId::parse("sub-01").is_none());
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        let s = s.strip_suffix(".0").unwrap_or(s);
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self(format!("{s:0>width$}", width = ID_WIDTH)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SubjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
