use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use super::dto::{NewProjectData, ProjectDataChanges, ProjectDataRow};

const ROW_SELECT: &str = r#"
    SELECT pd.id, pd.activity, pd.fk_farm_task, pd.fk_project, pd.fk_user,
           pd.num_human_resources, pd.cost, pd.details,
           GROUP_CONCAT(pdt.fk_tools) AS tools
    FROM projects_data pd
    LEFT JOIN projects_data_tools pdt ON pdt.fk_projects_data = pd.id
"#;

/// Records matching the optional activity pattern and project, ordered by id.
pub async fn list(
    db: &SqlitePool,
    pattern: Option<&str>,
    project_id: Option<i64>,
) -> sqlx::Result<Vec<ProjectDataRow>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(ROW_SELECT);
    qb.push(" WHERE 1 = 1");
    if let Some(pattern) = pattern {
        qb.push(" AND UPPER(pd.activity) LIKE UPPER(")
            .push_bind(pattern.to_string())
            .push(")");
    }
    if let Some(project_id) = project_id {
        qb.push(" AND pd.fk_project = ").push_bind(project_id);
    }
    qb.push(" GROUP BY pd.id ORDER BY pd.id");

    qb.build_query_as::<ProjectDataRow>().fetch_all(db).await
}

/// No-op write that takes the database write lock for the surrounding
/// transaction. Returns 0 when the row does not exist.
pub async fn lock_row(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<u64> {
    let res = sqlx::query(r#"UPDATE projects_data SET details = details WHERE id = ?1"#)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected())
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> sqlx::Result<Option<ProjectDataRow>> {
    sqlx::query_as::<_, ProjectDataRow>(&format!(
        "{ROW_SELECT} WHERE pd.id = ?1 GROUP BY pd.id"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn insert(conn: &mut SqliteConnection, new: &NewProjectData) -> sqlx::Result<i64> {
    sqlx::query_scalar(
        r#"
        INSERT INTO projects_data
            (activity, fk_farm_task, fk_project, fk_user, num_human_resources, cost, details)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING id
        "#,
    )
    .bind(&new.activity)
    .bind(new.fk_farm_task)
    .bind(new.fk_project)
    .bind(new.fk_user)
    .bind(new.num_human_resources)
    .bind(new.cost)
    .bind(&new.details)
    .fetch_one(conn)
    .await
}

/// Writes only the columns present in `changes`. Callers skip empty changes.
pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    changes: &ProjectDataChanges,
) -> sqlx::Result<u64> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE projects_data SET ");
    let mut set = qb.separated(", ");
    if let Some(v) = &changes.activity {
        set.push("activity = ").push_bind_unseparated(v.clone());
    }
    if let Some(v) = changes.fk_farm_task {
        set.push("fk_farm_task = ").push_bind_unseparated(v);
    }
    if let Some(v) = changes.fk_project {
        set.push("fk_project = ").push_bind_unseparated(v);
    }
    if let Some(v) = changes.fk_user {
        set.push("fk_user = ").push_bind_unseparated(v);
    }
    if let Some(v) = changes.num_human_resources {
        set.push("num_human_resources = ").push_bind_unseparated(v);
    }
    if let Some(v) = changes.cost {
        set.push("cost = ").push_bind_unseparated(v);
    }
    if let Some(v) = &changes.details {
        set.push("details = ").push_bind_unseparated(v.clone());
    }
    qb.push(" WHERE id = ").push_bind(id);

    let res = qb.build().execute(conn).await?;
    Ok(res.rows_affected())
}

pub async fn link_tool(conn: &mut SqliteConnection, data_id: i64, tool_id: i64) -> sqlx::Result<()> {
    sqlx::query(r#"INSERT INTO projects_data_tools (fk_projects_data, fk_tools) VALUES (?1, ?2)"#)
        .bind(data_id)
        .bind(tool_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn unlink_tool(
    conn: &mut SqliteConnection,
    data_id: i64,
    tool_id: i64,
) -> sqlx::Result<()> {
    sqlx::query(r#"DELETE FROM projects_data_tools WHERE fk_projects_data = ?1 AND fk_tools = ?2"#)
        .bind(data_id)
        .bind(tool_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn delete(db: &SqlitePool, id: i64) -> sqlx::Result<u64> {
    let res = sqlx::query(r#"DELETE FROM projects_data WHERE id = ?1"#)
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}
