use tracing::debug;

use crate::api::RecipeSource;
use crate::error::FetchError;
use crate::ingredient::parse_ingredient;
use crate::models::{Ingredient, ServingsDirection};

/// Servings used when the fetched recipe does not state any.
pub const DEFAULT_SERVINGS: u32 = 4;
const BASE_COOKING_MINUTES: u32 = 15;
const MINUTES_PER_INGREDIENT: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: String,
    pub title: String,
    pub author: String,
    pub image_url: String,
    pub source_url: String,
    pub url: String,
    pub servings: u32,
    pub cooking_time_minutes: u32,
    pub ingredients: Vec<Ingredient>,
    raw_ingredients: Vec<String>,
}

impl Recipe {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            author: String::new(),
            image_url: String::new(),
            source_url: String::new(),
            url: String::new(),
            servings: DEFAULT_SERVINGS,
            cooking_time_minutes: 0,
            ingredients: Vec::new(),
            raw_ingredients: Vec::new(),
        }
    }

    /// Fetch this recipe's data. On failure the recipe is left as it was.
    ///
    /// Data without a title is rejected as malformed. A stated servings count
    /// of zero is treated as absent.
    pub async fn load<S>(&mut self, source: &S) -> Result<(), FetchError>
    where
        S: RecipeSource + ?Sized,
    {
        let data = source.fetch_recipe(&self.id).await?;
        if data.title.trim().is_empty() {
            return Err(FetchError::Malformed(format!(
                "recipe {} has no title",
                self.id
            )));
        }
        debug!(id = %self.id, ingredients = data.ingredients.len(), "recipe fetched");

        self.title = data.title;
        self.author = data.author;
        self.image_url = data.image_url;
        self.source_url = data.source_url;
        self.url = data.url;
        self.servings = data
            .servings
            .filter(|servings| *servings > 0)
            .unwrap_or(DEFAULT_SERVINGS);
        self.raw_ingredients = data.ingredients;
        self.ingredients.clear();
        Ok(())
    }

    pub fn raw_ingredients(&self) -> &[String] {
        &self.raw_ingredients
    }

    /// Replace the ingredient list with the parsed form of every raw line.
    pub fn parse_ingredients(&mut self) {
        self.ingredients = self
            .raw_ingredients
            .iter()
            .map(|line| parse_ingredient(line))
            .collect();
    }

    pub fn calc_cooking_time(&mut self) {
        let count = u32::try_from(self.raw_ingredients.len()).unwrap_or(u32::MAX);
        self.cooking_time_minutes =
            BASE_COOKING_MINUTES.saturating_add(count.saturating_mul(MINUTES_PER_INGREDIENT));
    }

    /// Step servings by one and rescale every known ingredient count.
    ///
    /// Returns `false` without touching anything when a decrement would drop
    /// below one serving.
    pub fn update_servings(&mut self, direction: ServingsDirection) -> bool {
        let new_servings = match direction {
            ServingsDirection::Increment => self.servings.saturating_add(1),
            ServingsDirection::Decrement if self.servings > 1 => self.servings - 1,
            ServingsDirection::Decrement => return false,
        };

        let (new, old) = (f64::from(new_servings), f64::from(self.servings));
        for ingredient in &mut self.ingredients {
            if let Some(count) = ingredient.count.as_mut() {
                *count = *count * new / old;
            }
        }
        self.servings = new_servings;
        true
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::models::RecipeData;

    struct StubSource {
        data: Option<RecipeData>,
    }

    #[async_trait]
    impl RecipeSource for StubSource {
        async fn fetch_recipe(&self, _id: &str) -> Result<RecipeData, FetchError> {
            self.data
                .clone()
                .ok_or_else(|| FetchError::Network("offline".to_string()))
        }
    }

    fn sample_data() -> RecipeData {
        RecipeData {
            title: "Pancakes".to_string(),
            author: "Kitchen".to_string(),
            image_url: "http://img".to_string(),
            source_url: "http://src".to_string(),
            url: "http://f2f/42".to_string(),
            ingredients: vec![
                "1 1/2 cups flour".to_string(),
                "1/3 cup sugar".to_string(),
                "2 eggs".to_string(),
                "salt to taste".to_string(),
            ],
            servings: None,
        }
    }

    async fn loaded_recipe() -> Recipe {
        let source = StubSource {
            data: Some(sample_data()),
        };
        let mut recipe = Recipe::new("42");
        recipe.load(&source).await.unwrap();
        recipe.parse_ingredients();
        recipe.calc_cooking_time();
        recipe
    }

    #[tokio::test]
    async fn load_populates_fields_and_defaults_servings() {
        let recipe = loaded_recipe().await;
        assert_eq!(recipe.title, "Pancakes");
        assert_eq!(recipe.author, "Kitchen");
        assert_eq!(recipe.url, "http://f2f/42");
        assert_eq!(recipe.servings, DEFAULT_SERVINGS);
        assert_eq!(recipe.cooking_time_minutes, 15 + 3 * 4);
        assert_eq!(recipe.ingredients.len(), 4);
        assert_eq!(recipe.ingredients[0], Ingredient::new(Some(1.5), "cups", "flour"));
        assert_eq!(recipe.ingredients[3].count, None);
    }

    #[tokio::test]
    async fn load_uses_fetched_servings() {
        let source = StubSource {
            data: Some(RecipeData {
                servings: Some(6),
                ..sample_data()
            }),
        };
        let mut recipe = Recipe::new("42");
        recipe.load(&source).await.unwrap();
        assert_eq!(recipe.servings, 6);
    }

    #[tokio::test]
    async fn failed_load_leaves_recipe_untouched() {
        let source = StubSource { data: None };
        let mut recipe = Recipe::new("42");
        let err = recipe.load(&source).await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
        assert_eq!(recipe, Recipe::new("42"));
    }

    #[tokio::test]
    async fn blank_title_is_malformed() {
        let source = StubSource {
            data: Some(RecipeData {
                title: "  ".to_string(),
                ..sample_data()
            }),
        };
        let mut recipe = Recipe::new("42");
        let err = recipe.load(&source).await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
        assert_eq!(recipe, Recipe::new("42"));
    }

    #[tokio::test]
    async fn zero_servings_falls_back_to_default() {
        let source = StubSource {
            data: Some(RecipeData {
                servings: Some(0),
                ingredients: vec!["2 cups flour".to_string()],
                ..sample_data()
            }),
        };
        let mut recipe = Recipe::new("42");
        recipe.load(&source).await.unwrap();
        recipe.parse_ingredients();
        assert_eq!(recipe.servings, DEFAULT_SERVINGS);

        assert!(recipe.update_servings(ServingsDirection::Increment));
        assert_eq!(recipe.ingredients[0].count, Some(2.5));
    }

    #[tokio::test]
    async fn increment_scales_counts() {
        let mut recipe = loaded_recipe().await;
        assert!(recipe.update_servings(ServingsDirection::Increment));
        assert_eq!(recipe.servings, 5);
        let flour = recipe.ingredients[0].count.unwrap();
        assert!((flour - 1.5 * 5.0 / 4.0).abs() < 1e-9);
        assert_eq!(recipe.ingredients[3].count, None);
    }

    #[tokio::test]
    async fn scaling_round_trip_restores_counts() {
        let mut recipe = loaded_recipe().await;
        let original: Vec<Option<f64>> = recipe.ingredients.iter().map(|i| i.count).collect();

        for _ in 0..5 {
            recipe.update_servings(ServingsDirection::Increment);
        }
        for _ in 0..7 {
            recipe.update_servings(ServingsDirection::Decrement);
        }
        for _ in 0..2 {
            recipe.update_servings(ServingsDirection::Increment);
        }
        assert_eq!(recipe.servings, DEFAULT_SERVINGS);

        for (before, after) in original.iter().zip(recipe.ingredients.iter()) {
            match (before, after.count) {
                (Some(before), Some(after)) => assert!((before - after).abs() < 1e-9),
                (None, None) => {}
                other => panic!("count presence changed: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn decrement_at_one_serving_is_rejected() {
        let mut recipe = loaded_recipe().await;
        while recipe.servings > 1 {
            assert!(recipe.update_servings(ServingsDirection::Decrement));
        }
        let snapshot = recipe.clone();

        assert!(!recipe.update_servings(ServingsDirection::Decrement));
        assert_eq!(recipe, snapshot);
    }
}
