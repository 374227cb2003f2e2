//! Recipe browsing core: search, recipe scaling, favourites and a shopping list,
//! with the stores persisted through a pluggable key/value storage.

pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod favourites;
pub mod ingredient;
pub mod logging;
pub mod models;
pub mod recipe;
pub mod search;
pub mod shopping_list;
pub mod storage;

pub use api::{ForkifyClient, RecipeApi, RecipeSource, SearchSource};
pub use app::{App, Slot, recipe_id_from_fragment};
pub use config::Config;
pub use db::SqliteStorage;
pub use error::{AppError, FetchError, StoreError, ValidationError};
pub use favourites::Favourites;
pub use models::{FavouriteItem, Ingredient, RecipeData, SearchHit, ServingsDirection, ShoppingItem};
pub use recipe::Recipe;
pub use search::Search;
pub use shopping_list::ShoppingList;
pub use storage::{MemoryStorage, Storage};
