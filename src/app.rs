//! Application state and the commands a front end drives it with.
//!
//! Fetch-backed flows are split in three steps so that a search and a recipe
//! load can be in flight at the same time without borrowing the state:
//! `begin_*` validates input and issues a request carrying a sequence number,
//! the request's `run` performs the fetch, and `finish_*` applies the response
//! only if it is still the newest one issued for its slot. The `control_*`
//! helpers chain the three steps for callers that do one thing at a time.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::{RecipeApi, RecipeSource, SearchSource};
use crate::error::{AppError, FetchError, ValidationError};
use crate::favourites::Favourites;
use crate::models::{ServingsDirection, ShoppingItem};
use crate::recipe::Recipe;
use crate::search::Search;
use crate::shopping_list::ShoppingList;
use crate::storage::Storage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Search,
    Recipe,
}

pub struct SearchRequest {
    seq: u64,
    search: Search,
}

pub struct SearchResponse {
    seq: u64,
    search: Search,
    result: Result<(), FetchError>,
}

impl SearchRequest {
    pub fn query(&self) -> &str {
        self.search.query()
    }

    pub async fn run<S>(mut self, source: &S) -> SearchResponse
    where
        S: SearchSource + ?Sized,
    {
        let result = self.search.fetch_results(source).await;
        SearchResponse {
            seq: self.seq,
            search: self.search,
            result,
        }
    }
}

pub struct RecipeRequest {
    seq: u64,
    recipe: Recipe,
}

pub struct RecipeResponse {
    seq: u64,
    recipe: Recipe,
    result: Result<(), FetchError>,
}

impl RecipeRequest {
    pub fn id(&self) -> &str {
        &self.recipe.id
    }

    /// Fetch the recipe and compute its derived fields.
    pub async fn run<S>(mut self, source: &S) -> RecipeResponse
    where
        S: RecipeSource + ?Sized,
    {
        let result = self.recipe.load(source).await;
        if result.is_ok() {
            self.recipe.parse_ingredients();
            self.recipe.calc_cooking_time();
        }
        RecipeResponse {
            seq: self.seq,
            recipe: self.recipe,
            result,
        }
    }
}

/// Extract a recipe id from a navigation fragment such as `"#47746"`.
pub fn recipe_id_from_fragment(fragment: &str) -> Option<&str> {
    let id = fragment.trim();
    let id = id.strip_prefix('#').unwrap_or(id).trim();
    (!id.is_empty()).then_some(id)
}

pub struct App {
    api: Arc<dyn RecipeApi>,
    search: Option<Search>,
    recipe: Option<Recipe>,
    favourites: Favourites,
    shopping_list: ShoppingList,
    next_search_seq: u64,
    in_flight_search_seq: Option<u64>,
    next_recipe_seq: u64,
    in_flight_recipe_seq: Option<u64>,
    last_error: Option<String>,
}

impl App {
    pub fn new(api: Arc<dyn RecipeApi>, storage: Arc<dyn Storage>) -> Self {
        Self {
            api,
            search: None,
            recipe: None,
            favourites: Favourites::new(storage.clone()),
            shopping_list: ShoppingList::new(storage),
            next_search_seq: 0,
            in_flight_search_seq: None,
            next_recipe_seq: 0,
            in_flight_recipe_seq: None,
            last_error: None,
        }
    }

    /// Build the state and restore both stores from storage.
    pub fn start(api: Arc<dyn RecipeApi>, storage: Arc<dyn Storage>) -> Self {
        let mut app = Self::new(api, storage);
        app.favourites.restore();
        app.shopping_list.restore();
        info!(
            favourites = app.favourites.count(),
            shopping_items = app.shopping_list.len(),
            "state restored"
        );
        app
    }

    pub fn search(&self) -> Option<&Search> {
        self.search.as_ref()
    }

    pub fn recipe(&self) -> Option<&Recipe> {
        self.recipe.as_ref()
    }

    pub fn favourites(&self) -> &Favourites {
        &self.favourites
    }

    pub fn shopping_list(&self) -> &ShoppingList {
        &self.shopping_list
    }

    /// Message describing the most recent failed fetch, for the view to show.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_loading(&self, slot: Slot) -> bool {
        match slot {
            Slot::Search => self.in_flight_search_seq.is_some(),
            Slot::Recipe => self.in_flight_recipe_seq.is_some(),
        }
    }

    pub fn begin_search(&mut self, query: &str) -> Result<SearchRequest, AppError> {
        let search = Search::new(query)?;
        self.next_search_seq += 1;
        let seq = self.next_search_seq;
        self.in_flight_search_seq = Some(seq);
        Ok(SearchRequest { seq, search })
    }

    pub fn finish_search(&mut self, response: SearchResponse) -> Result<&Search, AppError> {
        if Some(response.seq) != self.in_flight_search_seq {
            warn!(query = response.search.query(), "discarding stale search response");
            return Err(AppError::Superseded);
        }
        self.in_flight_search_seq = None;

        let query = response.search.query().to_string();
        let search = self.search.insert(response.search);
        match response.result {
            Ok(()) => {
                self.last_error = None;
                info!(query = %query, hits = search.results().len(), "search completed");
                Ok(&*search)
            }
            Err(err) => {
                warn!(query = %query, error = %err, "search failed");
                self.last_error = Some(format!("Search for '{query}' failed: {err}"));
                Err(err.into())
            }
        }
    }

    pub async fn control_search(&mut self, query: &str) -> Result<&Search, AppError> {
        let request = self.begin_search(query)?;
        let api = Arc::clone(&self.api);
        let response = request.run(api.as_ref()).await;
        self.finish_search(response)
    }

    pub fn begin_recipe(&mut self, id: &str) -> Result<RecipeRequest, AppError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ValidationError("recipe id must not be empty".to_string()).into());
        }

        self.next_recipe_seq += 1;
        let seq = self.next_recipe_seq;
        self.in_flight_recipe_seq = Some(seq);
        Ok(RecipeRequest {
            seq,
            recipe: Recipe::new(id),
        })
    }

    /// Install a fetched recipe. A failed fetch leaves no recipe selected.
    pub fn finish_recipe(&mut self, response: RecipeResponse) -> Result<&Recipe, AppError> {
        if Some(response.seq) != self.in_flight_recipe_seq {
            warn!(id = %response.recipe.id, "discarding stale recipe response");
            return Err(AppError::Superseded);
        }
        self.in_flight_recipe_seq = None;

        match response.result {
            Ok(()) => {
                self.last_error = None;
                info!(id = %response.recipe.id, title = %response.recipe.title, "recipe loaded");
                Ok(&*self.recipe.insert(response.recipe))
            }
            Err(err) => {
                warn!(id = %response.recipe.id, error = %err, "recipe load failed");
                self.last_error = Some(format!(
                    "Loading recipe '{}' failed: {err}",
                    response.recipe.id
                ));
                self.recipe = None;
                Err(err.into())
            }
        }
    }

    pub async fn control_recipe(&mut self, id: &str) -> Result<&Recipe, AppError> {
        let request = self.begin_recipe(id)?;
        let api = Arc::clone(&self.api);
        let response = request.run(api.as_ref()).await;
        self.finish_recipe(response)
    }

    /// Returns `false` when a decrement was refused at one serving.
    pub fn update_servings(&mut self, direction: ServingsDirection) -> Result<bool, AppError> {
        let recipe = self.recipe.as_mut().ok_or(AppError::NoActiveRecipe)?;
        Ok(recipe.update_servings(direction))
    }

    /// Add one shopping item per ingredient of the active recipe, in a single write.
    pub fn add_recipe_to_shopping_list(&mut self) -> Result<Vec<ShoppingItem>, AppError> {
        let recipe = self.recipe.as_ref().ok_or(AppError::NoActiveRecipe)?;

        let added = self.shopping_list.add_many(recipe.ingredients.iter().map(|ingredient| {
            (
                ingredient.count,
                ingredient.unit.as_str(),
                ingredient.ingredient.as_str(),
            )
        }))?;
        info!(id = %recipe.id, items = added.len(), "recipe added to shopping list");
        Ok(added)
    }

    pub fn remove_shopping_item(&mut self, id: &str) -> Result<Option<ShoppingItem>, AppError> {
        Ok(self.shopping_list.remove(id)?)
    }

    pub fn update_shopping_item(&mut self, id: &str, count: f64) -> Result<bool, AppError> {
        Ok(self.shopping_list.update(id, count)?)
    }

    pub fn clear_shopping_list(&mut self) -> Result<(), AppError> {
        Ok(self.shopping_list.clear()?)
    }

    pub fn is_favourite(&self) -> bool {
        self.recipe
            .as_ref()
            .is_some_and(|recipe| self.favourites.contains(&recipe.id))
    }

    /// Like the active recipe if it is not a favourite yet, otherwise unlike it.
    /// Returns whether the recipe is a favourite afterwards.
    pub fn toggle_favourite(&mut self) -> Result<bool, AppError> {
        let recipe = self.recipe.as_ref().ok_or(AppError::NoActiveRecipe)?;

        if self.favourites.contains(&recipe.id) {
            self.favourites.remove(&recipe.id)?;
            info!(id = %recipe.id, "recipe unliked");
            Ok(false)
        } else {
            self.favourites.add(recipe)?;
            info!(id = %recipe.id, "recipe liked");
            Ok(true)
        }
    }

    pub fn unlike(&mut self, id: &str) -> Result<bool, AppError> {
        Ok(self.favourites.remove(id)?.is_some())
    }
}
