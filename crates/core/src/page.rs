//! Offset/limit pagination for list endpoints.

use serde::Serialize;

/// A 1-indexed page of fixed size.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Page(u32);

impl Page {
    pub const SIZE: usize = 10;

    pub fn new(number: u32) -> Self {
        Self(number.max(1))
    }

    /// Lenient parse of a `page` query value: anything missing, non-numeric
    /// or below 1 is the first page.
    pub fn from_query(raw: Option<&str>) -> Self {
        let number = raw
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|n| *n >= 1)
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(1);
        Self::new(number)
    }

    pub fn number(&self) -> u32 {
        self.0
    }

    pub fn offset(&self) -> usize {
        (self.0 as usize - 1).saturating_mul(Self::SIZE)
    }

    pub fn limit(&self) -> usize {
        Self::SIZE
    }

    /// Slice an already ordered collection down to this page.
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset())
            .take(self.limit())
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self(1)
    }
}
