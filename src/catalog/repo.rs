use std::marker::PhantomData;

use sqlx::SqlitePool;

use super::{dto::CatalogItem, kind::CatalogKind};

/// Queries over the catalog table named by `K`.
pub struct CatalogRepo<K> {
    _kind: PhantomData<K>,
}

impl<K: CatalogKind> CatalogRepo<K> {
    pub async fn list(db: &SqlitePool) -> sqlx::Result<Vec<CatalogItem>> {
        sqlx::query_as::<_, CatalogItem>(&format!(
            "SELECT id, descripcion FROM {} ORDER BY id",
            K::TABLE
        ))
        .fetch_all(db)
        .await
    }

    pub async fn search(db: &SqlitePool, pattern: &str) -> sqlx::Result<Vec<CatalogItem>> {
        sqlx::query_as::<_, CatalogItem>(&format!(
            "SELECT id, descripcion FROM {} WHERE UPPER(descripcion) LIKE UPPER(?1) ORDER BY id",
            K::TABLE
        ))
        .bind(pattern)
        .fetch_all(db)
        .await
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> sqlx::Result<Option<CatalogItem>> {
        sqlx::query_as::<_, CatalogItem>(&format!(
            "SELECT id, descripcion FROM {} WHERE id = ?1",
            K::TABLE
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn create(db: &SqlitePool, descripcion: &str) -> sqlx::Result<CatalogItem> {
        sqlx::query_as::<_, CatalogItem>(&format!(
            "INSERT INTO {} (descripcion) VALUES (?1) RETURNING id, descripcion",
            K::TABLE
        ))
        .bind(descripcion)
        .fetch_one(db)
        .await
    }

    pub async fn update(db: &SqlitePool, id: i64, descripcion: &str) -> sqlx::Result<u64> {
        let res = sqlx::query(&format!(
            "UPDATE {} SET descripcion = ?1 WHERE id = ?2",
            K::TABLE
        ))
        .bind(descripcion)
        .bind(id)
        .execute(db)
        .await?;
        Ok(res.rows_affected())
    }

    pub async fn delete(db: &SqlitePool, id: i64) -> sqlx::Result<u64> {
        let res = sqlx::query(&format!("DELETE FROM {} WHERE id = ?1", K::TABLE))
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected())
    }
}
