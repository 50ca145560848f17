/// Newest-first sequence of entries with an optional retention bound. Anything pushed past the
/// bound falls off the old end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLog<T> {
    entries: Vec<T>,
    retention: Option<usize>,
}

impl<T> EventLog<T> {
    pub fn new(retention: Option<usize>) -> Self {
        Self {
            entries: vec![],
            retention,
        }
    }

    /// Builds a log out of stored entries, which are expected newest-first already.
    pub fn from_entries(mut entries: Vec<T>, retention: Option<usize>) -> Self {
        if let Some(bound) = retention {
            entries.truncate(bound);
        }
        Self { entries, retention }
    }

    /// Prepends an entry. Returns how many old entries were dropped to stay in bound.
    pub fn push(&mut self, entry: T) -> usize {
        self.entries.insert(0, entry);
        match self.retention {
            Some(bound) if self.entries.len() > bound => {
                let dropped = self.entries.len() - bound;
                self.entries.truncate(bound);
                dropped
            }
            Some(_) | None => 0,
        }
    }

    pub fn newest(&self) -> Option<&T> {
        self.entries.first()
    }

    pub fn newest_mut(&mut self) -> Option<&mut T> {
        self.entries.first_mut()
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
