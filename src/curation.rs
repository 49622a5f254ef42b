use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::GeneratedItem;

/// Ordering of a [`View`] by insertion sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Filter and ordering for [`CurationSet::view`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewQuery {
    /// Only items carrying this exact tag.
    pub tag: Option<String>,
    /// Case-insensitive substring matched against the label and every tag.
    pub search: Option<String>,
    pub order: SortOrder,
}

impl ViewQuery {
    /// Query matching every item in ascending order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only include items carrying `tag`.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Only include items whose label or tags contain `search`.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Set the iteration order.
    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }
}

/// The generated items of a session, with selection and tags.
///
/// Items are kept in insertion order. Every mutation goes through a method
/// here; there is no way to replace the underlying sequence wholesale.
#[derive(Debug, Clone, Default)]
pub struct CurationSet {
    items: Vec<GeneratedItem>,
    next_seq: u64,
}

impl CurationSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append items in the given order, unselected and untagged.
    ///
    /// Items whose id is already in the set are skipped. Returns how many
    /// were added.
    pub fn seed(&mut self, items: impl IntoIterator<Item = GeneratedItem>) -> usize {
        let before = self.items.len();
        for mut item in items {
            if self.get(item.id()).is_some() {
                debug!(item_id = %item.id(), "skipping item already in curation set");
                continue;
            }
            item.set_seq(self.next_seq);
            item.set_selected(false);
            item.tags_mut().clear();
            self.next_seq += 1;
            self.items.push(item);
        }
        self.items.len() - before
    }

    /// Flip the selection of one item. Unknown ids are ignored.
    pub fn toggle(&mut self, item_id: &str) -> bool {
        match self.find_mut(item_id) {
            Some(item) => {
                let selected = item.is_selected();
                item.set_selected(!selected);
                true
            }
            None => false,
        }
    }

    /// Select or deselect every item currently in the set.
    ///
    /// Returns how many items changed selection.
    pub fn set_all_selected(&mut self, selected: bool) -> usize {
        let mut changed = 0;
        for item in self.items.iter_mut().filter(|item| item.is_selected() != selected) {
            item.set_selected(selected);
            changed += 1;
        }
        changed
    }

    /// Add a tag to one item. Blank tags and unknown ids are ignored.
    ///
    /// Returns `true` if the tag was newly added.
    pub fn add_tag(&mut self, item_id: &str, tag: &str) -> bool {
        let Some(tag) = clean_tag(tag) else {
            return false;
        };
        self.find_mut(item_id)
            .map(|item| item.tags_mut().insert(tag))
            .unwrap_or(false)
    }

    /// Remove a tag from one item. Returns `true` if it was present.
    pub fn remove_tag(&mut self, item_id: &str, tag: &str) -> bool {
        let tag = tag.trim();
        self.find_mut(item_id)
            .map(|item| item.tags_mut().remove(tag))
            .unwrap_or(false)
    }

    /// Add a tag to every selected item. Returns how many items gained it.
    pub fn bulk_add_tag(&mut self, tag: &str) -> usize {
        let Some(tag) = clean_tag(tag) else {
            return 0;
        };
        let mut tagged = 0;
        for item in self.items.iter_mut().filter(|item| item.is_selected()) {
            if item.tags_mut().insert(tag.clone()) {
                tagged += 1;
            }
        }
        tagged
    }

    /// Permanently remove every item matching `predicate`. Returns the number removed.
    pub fn filter_out<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&GeneratedItem) -> bool,
    {
        let before = self.items.len();
        self.items.retain(|item| !predicate(item));
        before - self.items.len()
    }

    /// Drop every item whose payload reports it as unavailable.
    pub fn remove_unavailable(&mut self) -> usize {
        self.filter_out(|item| !item.is_available())
    }

    /// Drop every selected item.
    pub fn remove_selected(&mut self) -> usize {
        self.filter_out(|item| item.is_selected())
    }

    /// Remove one item by id.
    pub fn remove(&mut self, item_id: &str) -> Option<GeneratedItem> {
        let index = self.items.iter().position(|item| item.id() == item_id)?;
        Some(self.items.remove(index))
    }

    /// Remove every item.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Get one item by id.
    pub fn get(&self, item_id: &str) -> Option<&GeneratedItem> {
        self.items.iter().find(|item| item.id() == item_id)
    }

    /// A lazy, restartable view over the items matching `query`.
    pub fn view(&self, query: &ViewQuery) -> View<'_> {
        View {
            items: &self.items,
            tag: query.tag.clone(),
            search: query
                .search
                .as_ref()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty()),
            order: query.order,
        }
    }

    /// Selected items in insertion order.
    pub fn selected(&self) -> impl Iterator<Item = &GeneratedItem> + Clone + '_ {
        self.items.iter().filter(|item| item.is_selected())
    }

    /// Get the number of selected items.
    pub fn selected_count(&self) -> usize {
        self.selected().count()
    }

    /// Every distinct tag in the set, sorted.
    pub fn all_tags(&self) -> BTreeSet<&str> {
        self.items
            .iter()
            .flat_map(|item| item.tags().iter().map(String::as_str))
            .collect()
    }

    /// Iterate every item in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, GeneratedItem> {
        self.items.iter()
    }

    /// Get the number of items in the set.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check whether the set has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn find_mut(&mut self, item_id: &str) -> Option<&mut GeneratedItem> {
        self.items.iter_mut().find(|item| item.id() == item_id)
    }
}

/// Filtered, ordered window onto a [`CurationSet`].
///
/// Creating or iterating a view never mutates the set, and `iter()` can be
/// called any number of times.
#[derive(Debug, Clone)]
pub struct View<'a> {
    items: &'a [GeneratedItem],
    tag: Option<String>,
    search: Option<String>,
    order: SortOrder,
}

impl<'a> View<'a> {
    /// Iterate the matching items in the view's order.
    pub fn iter(&self) -> ViewIter<'_> {
        ViewIter {
            inner: self.items.iter(),
            view: self,
        }
    }

    /// Count the matching items.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Check whether nothing matches.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Clone the matching items out of the set.
    pub fn to_vec(&self) -> Vec<GeneratedItem> {
        self.iter().cloned().collect()
    }

    fn matches(&self, item: &GeneratedItem) -> bool {
        if let Some(tag) = &self.tag {
            if !item.has_tag(tag) {
                return false;
            }
        }
        match &self.search {
            Some(needle) => {
                item.label().to_lowercase().contains(needle.as_str())
                    || item
                        .tags()
                        .iter()
                        .any(|t| t.to_lowercase().contains(needle.as_str()))
            }
            None => true,
        }
    }
}

impl<'v, 'a> IntoIterator for &'v View<'a> {
    type Item = &'v GeneratedItem;
    type IntoIter = ViewIter<'v>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator returned by [`View::iter`].
#[derive(Debug, Clone)]
pub struct ViewIter<'v> {
    inner: std::slice::Iter<'v, GeneratedItem>,
    view: &'v View<'v>,
}

impl<'v> Iterator for ViewIter<'v> {
    type Item = &'v GeneratedItem;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let item = match self.view.order {
                SortOrder::Asc => self.inner.next()?,
                SortOrder::Desc => self.inner.next_back()?,
            };
            if self.view.matches(item) {
                return Some(item);
            }
        }
    }
}

fn clean_tag(tag: &str) -> Option<String> {
    let tag = tag.trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    }
}
