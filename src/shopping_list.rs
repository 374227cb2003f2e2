use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, ValidationError};
use crate::models::ShoppingItem;
use crate::storage::{SHOPPING_LIST_KEY, Storage, persist_snapshot, restore_snapshot};

/// Shopping items in insertion order. Every mutation is written through to storage.
pub struct ShoppingList {
    items: Vec<ShoppingItem>,
    storage: Arc<dyn Storage>,
}

impl ShoppingList {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            items: Vec::new(),
            storage,
        }
    }

    pub fn restore(&mut self) {
        self.items = restore_snapshot(self.storage.as_ref(), SHOPPING_LIST_KEY);
        debug!(count = self.items.len(), "shopping list restored");
    }

    pub fn items(&self) -> &[ShoppingItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&ShoppingItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn add(
        &mut self,
        count: Option<f64>,
        unit: &str,
        ingredient: &str,
    ) -> Result<ShoppingItem, StoreError> {
        let item = ShoppingItem {
            id: fresh_id(&self.items),
            count: count.filter(|c| c.is_finite()),
            unit: unit.to_string(),
            ingredient: ingredient.to_string(),
        };

        let mut next = self.items.clone();
        next.push(item.clone());
        self.commit(next)?;
        Ok(item)
    }

    /// Append several items with a single write. On a failed save nothing is added.
    pub fn add_many<'a, I>(&mut self, entries: I) -> Result<Vec<ShoppingItem>, StoreError>
    where
        I: IntoIterator<Item = (Option<f64>, &'a str, &'a str)>,
    {
        let mut next = self.items.clone();
        let start = next.len();
        for (count, unit, ingredient) in entries {
            let item = ShoppingItem {
                id: fresh_id(&next),
                count: count.filter(|c| c.is_finite()),
                unit: unit.to_string(),
                ingredient: ingredient.to_string(),
            };
            next.push(item);
        }

        let added = next[start..].to_vec();
        self.commit(next)?;
        Ok(added)
    }

    /// Remove the item with `id`, returning it. Absent ids are a no-op.
    pub fn remove(&mut self, id: &str) -> Result<Option<ShoppingItem>, StoreError> {
        let Some(index) = self.items.iter().position(|item| item.id == id) else {
            return Ok(None);
        };

        let mut next = self.items.clone();
        let removed = next.remove(index);
        self.commit(next)?;
        Ok(Some(removed))
    }

    /// Set the count of one item. Returns `false` when no item has `id`.
    pub fn update(&mut self, id: &str, new_count: f64) -> Result<bool, StoreError> {
        if !new_count.is_finite() {
            return Err(ValidationError(format!("'{new_count}' is not a valid quantity")).into());
        }
        let Some(index) = self.items.iter().position(|item| item.id == id) else {
            return Ok(false);
        };

        let mut next = self.items.clone();
        next[index].count = Some(new_count);
        self.commit(next)?;
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.commit(Vec::new())
    }

    fn commit(&mut self, next: Vec<ShoppingItem>) -> Result<(), StoreError> {
        persist_snapshot(self.storage.as_ref(), SHOPPING_LIST_KEY, &next)?;
        self.items = next;
        Ok(())
    }
}

fn fresh_id(items: &[ShoppingItem]) -> String {
    loop {
        let id = Uuid::new_v4().to_string();
        if items.iter().all(|item| item.id != id) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::storage::MemoryStorage;

    struct EmptyStorage;

    impl Storage for EmptyStorage {
        fn save(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            Ok(())
        }

        fn load(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }
    }

    struct ReadOnlyStorage;

    impl Storage for ReadOnlyStorage {
        fn save(&self, key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("storage is read-only: {key}")
        }

        fn load(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }
    }

    fn list() -> ShoppingList {
        ShoppingList::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn add_generates_distinct_ids() {
        let mut list = list();
        let mut ids = HashSet::new();
        for i in 0..50 {
            let item = list.add(Some(f64::from(i)), "g", "flour").unwrap();
            assert!(ids.insert(item.id));
        }
        assert_eq!(list.len(), 50);
    }

    #[test]
    fn add_many_writes_one_snapshot() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut list = ShoppingList::new(storage.clone());
        let added = list
            .add_many([(Some(2.0), "cups", "flour"), (None, "", "salt")])
            .unwrap();

        assert_eq!(added.len(), 2);
        assert_ne!(added[0].id, added[1].id);
        assert_eq!(list.items(), added.as_slice());

        let mut restored = ShoppingList::new(storage);
        restored.restore();
        assert_eq!(restored.items(), added.as_slice());
    }

    #[test]
    fn failed_save_adds_nothing() {
        let mut list = ShoppingList::new(Arc::new(ReadOnlyStorage));
        let err = list
            .add_many([(Some(1.0), "cup", "milk"), (Some(2.0), "", "eggs")])
            .unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert!(list.is_empty());

        assert!(list.add(Some(1.0), "cup", "milk").is_err());
        assert!(list.is_empty());
    }

    #[test]
    fn update_sets_only_matching_item() {
        let mut list = list();
        let a = list.add(Some(1.0), "cup", "milk").unwrap();
        let b = list.add(None, "", "salt").unwrap();

        assert!(list.update(&b.id, 2.5).unwrap());
        assert_eq!(list.get(&a.id).unwrap().count, Some(1.0));
        assert_eq!(list.get(&b.id).unwrap().count, Some(2.5));
        assert!(!list.update("missing", 3.0).unwrap());
    }

    #[test]
    fn non_finite_update_is_rejected() {
        let mut list = list();
        let a = list.add(Some(1.0), "cup", "milk").unwrap();

        for bad in [f64::NAN, f64::INFINITY] {
            let err = list.update(&a.id, bad).unwrap_err();
            assert!(matches!(err, StoreError::Validation(_)));
        }
        assert_eq!(list.get(&a.id).unwrap().count, Some(1.0));
    }

    #[test]
    fn remove_and_clear() {
        let mut list = list();
        let a = list.add(Some(1.0), "cup", "milk").unwrap();
        list.add(Some(2.0), "", "eggs").unwrap();

        assert_eq!(list.remove(&a.id).unwrap(), Some(a.clone()));
        assert_eq!(list.remove(&a.id).unwrap(), None);
        assert_eq!(list.len(), 1);

        list.clear().unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn restore_reads_persisted_items() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut list = ShoppingList::new(storage.clone());
        list.add(Some(1.5), "cups", "flour").unwrap();
        list.add(None, "", "salt").unwrap();

        let mut restored = ShoppingList::new(storage);
        restored.restore();
        assert_eq!(restored.items(), list.items());
    }

    #[test]
    fn clear_then_restore_from_empty_storage() {
        let mut list = ShoppingList::new(Arc::new(EmptyStorage));
        list.add(Some(1.0), "cup", "milk").unwrap();
        list.clear().unwrap();
        list.restore();
        assert!(list.is_empty());
    }
}
