/// A persisted catalog entry. Titles are unique within the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub title: String,
}

/// A category constructed in memory, not yet saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub title: String,
}

impl NewCategory {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    pub fn into_saved(self, id: i64) -> Category {
        Category {
            id,
            title: self.title,
        }
    }
}
