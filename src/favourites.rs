use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::FavouriteItem;
use crate::recipe::Recipe;
use crate::storage::{FAVOURITES_KEY, Storage, persist_snapshot, restore_snapshot};

/// Liked recipes, unique by recipe id, in the order they were liked.
pub struct Favourites {
    items: Vec<FavouriteItem>,
    storage: Arc<dyn Storage>,
}

impl Favourites {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            items: Vec::new(),
            storage,
        }
    }

    /// Replace the in-memory collection with the persisted one. Repeated ids
    /// keep their first entry.
    pub fn restore(&mut self) {
        let mut items: Vec<FavouriteItem> =
            restore_snapshot(self.storage.as_ref(), FAVOURITES_KEY);
        let mut seen = HashSet::new();
        let before = items.len();
        items.retain(|item| seen.insert(item.id.clone()));
        if items.len() < before {
            warn!(dropped = before - items.len(), "duplicate favourites in snapshot");
        }
        self.items = items;
        debug!(count = self.items.len(), "favourites restored");
    }

    pub fn items(&self) -> &[FavouriteItem] {
        &self.items
    }

    /// Position of `id` in the collection, `None` when it is not a favourite.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn add(&mut self, recipe: &Recipe) -> Result<FavouriteItem, StoreError> {
        if self.contains(&recipe.id) {
            return Err(StoreError::Duplicate(format!(
                "recipe '{}' is already a favourite",
                recipe.id
            )));
        }

        let item = FavouriteItem {
            id: recipe.id.clone(),
            title: recipe.title.clone(),
            author: recipe.author.clone(),
            image_url: recipe.image_url.clone(),
        };

        let mut next = self.items.clone();
        next.push(item.clone());
        self.commit(next)?;
        Ok(item)
    }

    /// Remove `id`, returning the removed entry. Absent ids are a no-op.
    pub fn remove(&mut self, id: &str) -> Result<Option<FavouriteItem>, StoreError> {
        let Some(index) = self.index_of(id) else {
            return Ok(None);
        };

        let mut next = self.items.clone();
        let removed = next.remove(index);
        self.commit(next)?;
        Ok(Some(removed))
    }

    fn commit(&mut self, next: Vec<FavouriteItem>) -> Result<(), StoreError> {
        persist_snapshot(self.storage.as_ref(), FAVOURITES_KEY, &next)?;
        self.items = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::bail;

    use super::*;
    use crate::storage::MemoryStorage;

    struct ReadOnlyStorage;

    impl Storage for ReadOnlyStorage {
        fn save(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            bail!("disk full")
        }

        fn load(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }
    }

    fn recipe(id: &str) -> Recipe {
        let mut recipe = Recipe::new(id);
        recipe.title = format!("Recipe {id}");
        recipe.author = "Kitchen".to_string();
        recipe
    }

    #[test]
    fn add_and_lookup() {
        let mut favourites = Favourites::new(Arc::new(MemoryStorage::new()));
        assert_eq!(favourites.index_of("1"), None);

        let item = favourites.add(&recipe("1")).unwrap();
        favourites.add(&recipe("2")).unwrap();

        assert_eq!(item.title, "Recipe 1");
        assert_eq!(favourites.index_of("1"), Some(0));
        assert_eq!(favourites.index_of("2"), Some(1));
        assert_eq!(favourites.index_of("3"), None);
        assert_eq!(favourites.count(), 2);
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let mut favourites = Favourites::new(Arc::new(MemoryStorage::new()));
        favourites.add(&recipe("1")).unwrap();

        let err = favourites.add(&recipe("1")).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(favourites.count(), 1);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut favourites = Favourites::new(Arc::new(MemoryStorage::new()));
        favourites.add(&recipe("1")).unwrap();

        assert_eq!(favourites.remove("9").unwrap(), None);
        assert_eq!(favourites.remove("1").unwrap().map(|item| item.id), Some("1".to_string()));
        assert_eq!(favourites.count(), 0);
    }

    #[test]
    fn mutations_survive_restore() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut favourites = Favourites::new(storage.clone());
        favourites.add(&recipe("1")).unwrap();
        favourites.add(&recipe("2")).unwrap();
        favourites.remove("1").unwrap();

        let mut restored = Favourites::new(storage);
        restored.restore();
        assert_eq!(restored.items(), favourites.items());
        assert_eq!(restored.index_of("2"), Some(0));
    }

    #[test]
    fn restore_keeps_first_entry_per_id() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        storage
            .save(
                FAVOURITES_KEY,
                r#"[{"id":"1","title":"First","author":"","image_url":""},
                    {"id":"2","title":"Other","author":"","image_url":""},
                    {"id":"1","title":"Again","author":"","image_url":""}]"#,
            )
            .unwrap();

        let mut favourites = Favourites::new(storage);
        favourites.restore();
        assert_eq!(favourites.count(), 2);
        assert_eq!(favourites.items()[0].title, "First");
        assert_eq!(favourites.index_of("2"), Some(1));
    }

    #[test]
    fn failed_persist_leaves_collection_unchanged() {
        let mut favourites = Favourites::new(Arc::new(ReadOnlyStorage));
        let err = favourites.add(&recipe("1")).unwrap_err();
        assert!(matches!(err, StoreError::Storage(msg) if msg.contains("disk full")));
        assert_eq!(favourites.count(), 0);
    }
}
