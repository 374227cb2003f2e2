use serde::{Deserialize, Serialize};

/// One structured ingredient line of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub count: Option<f64>,
    pub unit: String,
    pub ingredient: String,
}

impl Ingredient {
    pub fn new(count: Option<f64>, unit: impl Into<String>, ingredient: impl Into<String>) -> Self {
        Self {
            count,
            unit: unit.into(),
            ingredient: ingredient.into(),
        }
    }
}

/// A single entry of a search result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub author: String,
    pub image_url: String,
}

/// Raw recipe payload as returned by a recipe-data source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeData {
    pub title: String,
    pub author: String,
    pub image_url: String,
    pub source_url: String,
    /// Page of the recipe on the API's own site.
    pub url: String,
    pub ingredients: Vec<String>,
    pub servings: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavouriteItem {
    pub id: String,
    pub title: String,
    pub author: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: String,
    pub count: Option<f64>,
    pub unit: String,
    pub ingredient: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServingsDirection {
    Increment,
    Decrement,
}
