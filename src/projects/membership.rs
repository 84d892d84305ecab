use sqlx::SqlitePool;

use super::dto::{Membership, Project, UserProject};

pub const DEFAULT_ROLE_IN_PROJECT: &str = "colaborador";

pub async fn is_member(db: &SqlitePool, user_id: i64, project_id: i64) -> sqlx::Result<bool> {
    sqlx::query_scalar(
        r#"SELECT EXISTS(SELECT 1 FROM user_projects WHERE user_id = ?1 AND project_id = ?2)"#,
    )
    .bind(user_id)
    .bind(project_id)
    .fetch_one(db)
    .await
}

pub async fn assign(
    db: &SqlitePool,
    user_id: i64,
    project_id: i64,
    role_in_project: &str,
    assigned_at: &str,
) -> sqlx::Result<Membership> {
    sqlx::query_as::<_, Membership>(
        r#"
        INSERT INTO user_projects (user_id, project_id, role_in_project, assigned_at)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id, user_id, project_id, role_in_project, assigned_at
        "#,
    )
    .bind(user_id)
    .bind(project_id)
    .bind(role_in_project)
    .bind(assigned_at)
    .fetch_one(db)
    .await
}

/// Moves a membership to another project and refreshes its timestamp.
pub async fn change(
    db: &SqlitePool,
    user_id: i64,
    old_project_id: i64,
    new_project_id: i64,
    assigned_at: &str,
) -> sqlx::Result<u64> {
    let res = sqlx::query(
        r#"
        UPDATE user_projects
        SET project_id = ?1, assigned_at = ?2
        WHERE user_id = ?3 AND project_id = ?4
        "#,
    )
    .bind(new_project_id)
    .bind(assigned_at)
    .bind(user_id)
    .bind(old_project_id)
    .execute(db)
    .await?;
    Ok(res.rows_affected())
}

pub async fn remove(db: &SqlitePool, user_id: i64, project_id: i64) -> sqlx::Result<u64> {
    let res = sqlx::query(r#"DELETE FROM user_projects WHERE user_id = ?1 AND project_id = ?2"#)
        .bind(user_id)
        .bind(project_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}

pub async fn projects_of_user(db: &SqlitePool, user_id: i64) -> sqlx::Result<Vec<UserProject>> {
    sqlx::query_as::<_, UserProject>(
        r#"
        SELECT p.id, p.descripcion, p.fecha_inicio, p.fecha_cierre, p.estado, p.created_at,
               up.role_in_project
        FROM projects p
        JOIN user_projects up ON up.project_id = p.id
        WHERE up.user_id = ?1
        ORDER BY p.id
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Projects the user is not a member of.
pub async fn available_for_user(db: &SqlitePool, user_id: i64) -> sqlx::Result<Vec<Project>> {
    sqlx::query_as::<_, Project>(
        r#"
        SELECT p.id, p.descripcion, p.fecha_inicio, p.fecha_cierre, p.estado, p.created_at
        FROM projects p
        LEFT JOIN user_projects up ON up.project_id = p.id AND up.user_id = ?1
        WHERE up.id IS NULL
        ORDER BY p.id
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}
