use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::dto::{Role, User, UserChanges, UserWithHash};

const USER_COLUMNS: &str = "id, name, lastname, username, email, role";

pub async fn list(db: &SqlitePool) -> sqlx::Result<Vec<User>> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
        .fetch_all(db)
        .await
}

/// Case-insensitive match on name, lastname or username.
pub async fn search(db: &SqlitePool, pattern: &str) -> sqlx::Result<Vec<User>> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE UPPER(name) LIKE UPPER(?1)
           OR UPPER(lastname) LIKE UPPER(?1)
           OR UPPER(username) LIKE UPPER(?1)
        ORDER BY id
        "#
    ))
    .bind(pattern)
    .fetch_all(db)
    .await
}

pub async fn find_by_id(db: &SqlitePool, id: i64) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_by_email(db: &SqlitePool, email: &str) -> sqlx::Result<Option<UserWithHash>> {
    sqlx::query_as::<_, UserWithHash>(&format!(
        "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1 LIMIT 1"
    ))
    .bind(email)
    .fetch_optional(db)
    .await
}

pub async fn exists(db: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)"#)
        .bind(id)
        .fetch_one(db)
        .await
}

pub async fn username_taken(db: &SqlitePool, username: &str) -> sqlx::Result<bool> {
    sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)"#)
        .bind(username)
        .fetch_one(db)
        .await
}

pub async fn email_taken(db: &SqlitePool, email: &str) -> sqlx::Result<bool> {
    sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)"#)
        .bind(email)
        .fetch_one(db)
        .await
}

pub async fn role_exists(db: &SqlitePool, label: &str) -> sqlx::Result<bool> {
    sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM roles WHERE label = ?1)"#)
        .bind(label)
        .fetch_one(db)
        .await
}

pub async fn list_roles(db: &SqlitePool) -> sqlx::Result<Vec<Role>> {
    sqlx::query_as::<_, Role>(r#"SELECT id, label FROM roles ORDER BY id"#)
        .fetch_all(db)
        .await
}

pub struct NewUser<'a> {
    pub name: &'a str,
    pub lastname: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: &'a str,
}

pub async fn create(db: &SqlitePool, new: NewUser<'_>) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (name, lastname, username, email, password_hash, role)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(new.name)
    .bind(new.lastname)
    .bind(new.username)
    .bind(new.email)
    .bind(new.password_hash)
    .bind(new.role)
    .fetch_one(db)
    .await
}

/// Writes only the columns present in `changes`. Callers skip empty changes.
pub async fn update(db: &SqlitePool, id: i64, changes: &UserChanges) -> sqlx::Result<u64> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET ");
    let mut set = qb.separated(", ");
    let columns = [
        ("name", &changes.name),
        ("lastname", &changes.lastname),
        ("username", &changes.username),
        ("email", &changes.email),
        ("role", &changes.role),
    ];
    for (column, value) in columns {
        if let Some(value) = value {
            set.push(format!("{column} = "));
            set.push_bind_unseparated(value.clone());
        }
    }
    qb.push(" WHERE id = ").push_bind(id);

    let res = qb.build().execute(db).await?;
    Ok(res.rows_affected())
}

pub async fn delete(db: &SqlitePool, id: i64) -> sqlx::Result<u64> {
    let res = sqlx::query(r#"DELETE FROM users WHERE id = ?1"#)
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}
