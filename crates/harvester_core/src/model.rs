use std::fmt;

/// Persisted placeholder for an optional field that was not found.
pub const NOT_AVAILABLE: &str = "N/A";

/// Fixed column order of the record store.
pub const STORE_HEADER: [&str; 5] = ["filename", "artist", "title", "style_period", "year"];

/// Substitute the persisted sentinel for an absent optional value.
pub fn or_not_available(value: Option<&str>) -> &str {
    value.unwrap_or(NOT_AVAILABLE)
}

/// One row discovered on the catalog index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub title: String,
    pub year_hint: Option<String>,
    /// Link as found on the page; resolve against the base origin before use.
    pub detail_path: String,
}

/// Fields only available on an item's detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailInfo {
    pub asset_url: String,
    pub classification: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    EmptyField(&'static str),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::EmptyField(name) => write!(f, "record field `{name}` is empty"),
        }
    }
}

impl std::error::Error for RecordError {}

/// The unit of durable output. Built only after the asset is on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestRecord {
    pub key: String,
    pub owner: String,
    pub title: String,
    pub classification: Option<String>,
    pub year: Option<String>,
}

impl HarvestRecord {
    pub fn new(
        key: String,
        owner: &str,
        entry: &CatalogEntry,
        detail: &DetailInfo,
    ) -> Result<Self, RecordError> {
        let record = Self {
            key,
            owner: owner.to_string(),
            title: entry.title.clone(),
            classification: detail.classification.clone(),
            year: entry.year_hint.clone(),
        };
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        if self.key.trim().is_empty() {
            return Err(RecordError::EmptyField("key"));
        }
        if self.owner.trim().is_empty() {
            return Err(RecordError::EmptyField("owner"));
        }
        if self.title.trim().is_empty() {
            return Err(RecordError::EmptyField("title"));
        }
        Ok(())
    }

    /// Row in store column order with the sentinel substituted for absent values.
    pub fn to_row(&self) -> [&str; 5] {
        [
            self.key.as_str(),
            self.owner.as_str(),
            self.title.as_str(),
            or_not_available(self.classification.as_deref()),
            or_not_available(self.year.as_deref()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, year: Option<&str>) -> CatalogEntry {
        CatalogEntry {
            title: title.to_string(),
            year_hint: year.map(str::to_string),
            detail_path: "/en/x".to_string(),
        }
    }

    #[test]
    fn row_uses_sentinel_for_missing_fields() {
        let detail = DetailInfo {
            asset_url: "https://cdn.example/a.jpg".to_string(),
            classification: None,
        };
        let record =
            HarvestRecord::new("O_T.jpg".to_string(), "O", &entry("T", None), &detail).unwrap();
        assert_eq!(record.to_row(), ["O_T.jpg", "O", "T", "N/A", "N/A"]);
    }

    #[test]
    fn row_keeps_present_fields() {
        let detail = DetailInfo {
            asset_url: "https://cdn.example/a.jpg".to_string(),
            classification: Some("Post-Impressionism".to_string()),
        };
        let record = HarvestRecord::new(
            "O_T.jpg".to_string(),
            "O",
            &entry("T", Some("1889")),
            &detail,
        )
        .unwrap();
        assert_eq!(record.to_row(), ["O_T.jpg", "O", "T", "Post-Impressionism", "1889"]);
    }

    #[test]
    fn empty_title_is_rejected() {
        let detail = DetailInfo {
            asset_url: "u".to_string(),
            classification: None,
        };
        let err = HarvestRecord::new("k".to_string(), "O", &entry("  ", None), &detail)
            .unwrap_err();
        assert_eq!(err, RecordError::EmptyField("title"));
    }
}
