//! Recipe-data and search collaborators.
//!
//! The models only depend on the [`RecipeSource`] and [`SearchSource`] traits;
//! [`ForkifyClient`] is the HTTP implementation used by the command-line front end.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::Config;
use crate::error::FetchError;
use crate::models::{RecipeData, SearchHit};

#[async_trait]
pub trait RecipeSource: Send + Sync {
    async fn fetch_recipe(&self, id: &str) -> Result<RecipeData, FetchError>;
}

#[async_trait]
pub trait SearchSource: Send + Sync {
    async fn search_recipes(&self, query: &str) -> Result<Vec<SearchHit>, FetchError>;
}

/// Both collaborators behind one handle, as held by the application container.
pub trait RecipeApi: RecipeSource + SearchSource {}

impl<T: RecipeSource + SearchSource> RecipeApi for T {}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    recipes: Option<Vec<HitPayload>>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HitPayload {
    recipe_id: String,
    title: String,
    #[serde(default)]
    publisher: String,
    #[serde(default)]
    image_url: String,
}

#[derive(Debug, Deserialize)]
struct GetPayload {
    recipe: Option<RecipePayload>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecipePayload {
    title: Option<String>,
    #[serde(default)]
    publisher: String,
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    source_url: String,
    #[serde(default)]
    f2f_url: String,
    ingredients: Option<Vec<String>>,
    servings: Option<u32>,
}

fn search_hits_from(payload: SearchPayload) -> Result<Vec<SearchHit>, FetchError> {
    let Some(recipes) = payload.recipes else {
        let reason = payload
            .error
            .unwrap_or_else(|| "missing recipe list".to_string());
        return Err(FetchError::Malformed(reason));
    };

    Ok(recipes
        .into_iter()
        .map(|hit| SearchHit {
            id: hit.recipe_id,
            title: hit.title,
            author: hit.publisher,
            image_url: hit.image_url,
        })
        .collect())
}

fn recipe_data_from(payload: GetPayload) -> Result<RecipeData, FetchError> {
    let Some(recipe) = payload.recipe else {
        let reason = payload.error.unwrap_or_else(|| "missing recipe".to_string());
        return Err(FetchError::Malformed(reason));
    };

    let title = recipe
        .title
        .filter(|title| !title.trim().is_empty())
        .ok_or_else(|| FetchError::Malformed("recipe has no title".to_string()))?;
    let ingredients = recipe
        .ingredients
        .ok_or_else(|| FetchError::Malformed("recipe has no ingredients".to_string()))?;

    Ok(RecipeData {
        title,
        author: recipe.publisher,
        image_url: recipe.image_url,
        source_url: recipe.source_url,
        url: recipe.f2f_url,
        ingredients,
        servings: recipe.servings.filter(|servings| *servings > 0),
    })
}

/// HTTP client for the public Forkify recipe API.
pub struct ForkifyClient {
    client: reqwest::Client,
    base_url: String,
}

impl ForkifyClient {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, ?query, "requesting");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl RecipeSource for ForkifyClient {
    async fn fetch_recipe(&self, id: &str) -> Result<RecipeData, FetchError> {
        let payload: GetPayload = self.get_json("get", &[("rId", id)]).await?;
        recipe_data_from(payload)
    }
}

#[async_trait]
impl SearchSource for ForkifyClient {
    async fn search_recipes(&self, query: &str) -> Result<Vec<SearchHit>, FetchError> {
        let payload: SearchPayload = self.get_json("search", &[("q", query)]).await?;
        search_hits_from(payload)
    }
}
