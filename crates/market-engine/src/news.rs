use signal_core::NewsItem;

/// Retention cap: the 20 most recent unique headlines
const MAX_ITEMS: usize = 20;

/// Bounded headline list, deduplicated by id
#[derive(Default)]
pub struct NewsBook {
    items: Vec<NewsItem>,
}

impl NewsBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a fetched batch: drop ids already present, keep newest first,
    /// truncate to the retention cap.
    pub fn push_batch(&mut self, batch: Vec<NewsItem>) {
        for item in batch {
            if !self.items.iter().any(|existing| existing.id == item.id) {
                self.items.push(item);
            }
        }
        self.items
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.items.truncate(MAX_ITEMS);
    }

    pub fn items(&self) -> &[NewsItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
