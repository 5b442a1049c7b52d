use crate::domain::model::{Page, Resource, ResourceId};

/// Tracks which page of a collection a list view is showing. `None` means
/// the collection's first page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageCursor {
    current: Option<String>,
}

impl PageCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(link: impl Into<String>) -> Self {
        Self {
            current: Some(link.into()),
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn next<T>(&mut self, page: &Page<T>) -> bool {
        match &page.next {
            Some(link) => {
                self.current = Some(link.clone());
                true
            }
            None => false,
        }
    }

    pub fn previous<T>(&mut self, page: &Page<T>) -> bool {
        match &page.previous {
            Some(link) => {
                self.current = Some(link.clone());
                true
            }
            None => false,
        }
    }

    /// After a bulk delete: if every row of `page` was removed and it was not
    /// the first page, step back so the view does not land on an empty page.
    /// Returns whether the cursor moved.
    pub fn after_bulk_delete<R: Resource>(&mut self, page: &Page<R>, deleted: &[ResourceId]) -> bool {
        let emptied = !page.results.is_empty()
            && page
                .results
                .iter()
                .all(|row| deleted.contains(&row.id()));

        if !emptied || page.current <= 1 {
            return false;
        }

        self.current = match &page.previous {
            Some(link) => Some(link.clone()),
            None => self
                .current
                .as_deref()
                .map(|link| link.split('?').next().unwrap_or(link).to_string()),
        };
        tracing::debug!("Page emptied by bulk delete, moving to {:?}", self.current);
        true
    }
}
