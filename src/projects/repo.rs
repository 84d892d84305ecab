use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Sqlite, SqlitePool};

use super::dto::{Project, ProjectChanges, ProjectStatus};

const PROJECT_COLUMNS: &str = "id, descripcion, fecha_inicio, fecha_cierre, estado, created_at";

pub async fn list(db: &SqlitePool) -> sqlx::Result<Vec<Project>> {
    sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY id"
    ))
    .fetch_all(db)
    .await
}

pub async fn search(db: &SqlitePool, pattern: &str) -> sqlx::Result<Vec<Project>> {
    sqlx::query_as::<_, Project>(&format!(
        r#"
        SELECT {PROJECT_COLUMNS}
        FROM projects
        WHERE UPPER(descripcion) LIKE UPPER(?1)
        ORDER BY id
        "#
    ))
    .bind(pattern)
    .fetch_all(db)
    .await
}

pub async fn find_by_id(db: &SqlitePool, id: i64) -> sqlx::Result<Option<Project>> {
    sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn exists(db: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1)"#)
        .bind(id)
        .fetch_one(db)
        .await
}

pub struct NewProject<'a> {
    pub descripcion: &'a str,
    pub fecha_inicio: &'a str,
    pub fecha_cierre: &'a str,
    pub created_at: &'a str,
}

pub async fn create(db: &SqlitePool, new: NewProject<'_>) -> sqlx::Result<Project> {
    sqlx::query_as::<_, Project>(&format!(
        r#"
        INSERT INTO projects (descripcion, fecha_inicio, fecha_cierre, estado, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING {PROJECT_COLUMNS}
        "#
    ))
    .bind(new.descripcion)
    .bind(new.fecha_inicio)
    .bind(new.fecha_cierre)
    .bind(ProjectStatus::Open.as_str())
    .bind(new.created_at)
    .fetch_one(db)
    .await
}

/// Writes only the columns present in `changes`. Callers skip empty changes.
pub async fn update(db: &SqlitePool, id: i64, changes: &ProjectChanges) -> sqlx::Result<u64> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE projects SET ");
    let mut set = qb.separated(", ");
    let columns = [
        ("descripcion", changes.descripcion.as_deref()),
        ("fecha_inicio", changes.fecha_inicio.as_deref()),
        ("fecha_cierre", changes.fecha_cierre.as_deref()),
        ("estado", changes.estado.map(ProjectStatus::as_str)),
    ];
    for (column, value) in columns {
        if let Some(value) = value {
            set.push(format!("{column} = "));
            set.push_bind_unseparated(value.to_string());
        }
    }
    qb.push(" WHERE id = ").push_bind(id);

    let res = qb.build().execute(db).await?;
    Ok(res.rows_affected())
}

pub async fn update_status(db: &SqlitePool, id: i64, estado: ProjectStatus) -> sqlx::Result<u64> {
    let res = sqlx::query(r#"UPDATE projects SET estado = ?1 WHERE id = ?2"#)
        .bind(estado.as_str())
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}

pub async fn delete(db: &SqlitePool, id: i64) -> sqlx::Result<u64> {
    let res = sqlx::query(r#"DELETE FROM projects WHERE id = ?1"#)
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}

/// Every project as raw rows, each decoded on its own so one bad row does
/// not sink the export.
pub async fn export_rows(db: &SqlitePool) -> sqlx::Result<Vec<sqlx::Result<Project>>> {
    let rows: Vec<SqliteRow> = sqlx::query(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY id"
    ))
    .fetch_all(db)
    .await?;
    Ok(rows.iter().map(Project::from_row).collect())
}
