use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct CatalogItem {
    pub id: i64,
    pub descripcion: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    #[serde(default)]
    pub descripcion: String,
}

#[derive(Debug, Deserialize)]
pub struct EditItemRequest {
    pub id: Option<i64>,
    pub descripcion: Option<String>,
}
