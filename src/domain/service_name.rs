use std::fmt;
use std::str::FromStr;

use unicode_segmentation::UnicodeSegmentation;

const MAX_LEN: usize = 256;

/// Name of a subscribed service, e.g. "Netflix"
///
/// Offers sharing a name are different price points of the same service, so the
/// name is compared exactly (after trimming) and never case-folded.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct ServiceName(String);

impl FromStr for ServiceName {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();

        if value.is_empty() {
            return Err("Service name cannot be empty".into());
        }
        if value.graphemes(true).count() > MAX_LEN {
            return Err("Service name too long".into());
        }
        if value.chars().any(char::is_control) {
            return Err("Service name contains control characters".into());
        }

        Ok(Self(value.to_string()))
    }
}

impl AsRef<str> for ServiceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
