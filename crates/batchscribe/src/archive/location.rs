use chrono::{NaiveDate, Utc};

/// Date-partitioned archive namespace, `"{root}/{YYYY-MM-DD}"`. The date is
/// fixed when the location is created so one run never straddles two
/// partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLocation {
    root: String,
    date: NaiveDate,
}

impl ArchiveLocation {
    pub fn new(root: impl Into<String>, date: NaiveDate) -> Self {
        let root: String = root.into();
        Self {
            root: root.trim_end_matches('/').to_string(),
            date,
        }
    }

    pub fn today(root: impl Into<String>) -> Self {
        Self::new(root, Utc::now().date_naive())
    }

    pub fn prefix(&self) -> String {
        format!("{}/{}", self.root, self.date.format("%Y-%m-%d"))
    }

    /// Archive key for an object; the original key is kept intact.
    pub fn key_for(&self, object_key: &str) -> String {
        format!("{}/{}", self.prefix(), object_key)
    }
}
