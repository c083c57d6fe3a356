use serde::Deserialize;

use crate::api::JsonApi;
use crate::{StreamError, StreamSettings};

#[derive(Debug, Deserialize)]
struct CategoriesResponse {
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FestivalsResponse {
    festivals: Vec<String>,
}

/// Lookups that populate the category and festival pickers.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    api: JsonApi,
}

impl CatalogClient {
    pub fn new(settings: StreamSettings) -> Result<Self, StreamError> {
        Ok(Self {
            api: JsonApi::new(settings)?,
        })
    }

    /// Top-level categories.
    pub async fn categories(&self) -> Result<Vec<String>, StreamError> {
        let response: CategoriesResponse = self.api.get("/api/config/categories", &[]).await?;
        Ok(response.categories)
    }

    pub async fn medium_categories(&self, cat1: &str) -> Result<Vec<String>, StreamError> {
        let response: CategoriesResponse = self
            .api
            .get("/api/config/categories/medium", &[("cat1", cat1)])
            .await?;
        Ok(response.categories)
    }

    pub async fn small_categories(
        &self,
        cat1: &str,
        cat2: &str,
    ) -> Result<Vec<String>, StreamError> {
        let response: CategoriesResponse = self
            .api
            .get(
                "/api/config/categories/small",
                &[("cat1", cat1), ("cat2", cat2)],
            )
            .await?;
        Ok(response.categories)
    }

    /// Festival names filed under a full category path.
    pub async fn festivals(
        &self,
        cat1: &str,
        cat2: &str,
        cat3: &str,
    ) -> Result<Vec<String>, StreamError> {
        let response: FestivalsResponse = self
            .api
            .get(
                "/api/config/festivals",
                &[("cat1", cat1), ("cat2", cat2), ("cat3", cat3)],
            )
            .await?;
        Ok(response.festivals)
    }
}
