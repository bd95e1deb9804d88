use axum::{extract::Query, response::Json};
use serde::Deserialize;

use crate::models::{compatible_accelerators, Catalog};

#[derive(Deserialize, Debug, Default)]
pub struct CatalogQuery {
    /// Type of an active accelerator; narrows the accelerator list to its family.
    pub active_type: Option<String>,
}

pub async fn catalog_get(Query(query): Query<CatalogQuery>) -> Json<Catalog> {
    let mut catalog = Catalog::load();
    if let Some(active) = query.active_type.as_deref().filter(|t| !t.trim().is_empty()) {
        catalog.accelerators = compatible_accelerators(Some(active));
    }
    Json(catalog)
}
