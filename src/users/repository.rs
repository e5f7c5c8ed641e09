use rusqlite::{params, OptionalExtension};

use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

pub fn find_by_id(pool: &DbPool, id: &str) -> AppResult<Option<User>> {
    let conn = pool.get()?;
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", User::COLUMNS),
            params![id],
            User::from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn find_by_email(pool: &DbPool, email: &str) -> AppResult<Option<User>> {
    let conn = pool.get()?;
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE email = ?1", User::COLUMNS),
            params![email],
            User::from_row,
        )
        .optional()?;
    Ok(user)
}

/// Insert a user. The unique index on `email` decides duplicates, so two racing
/// registrations cannot both succeed.
pub fn insert(
    pool: &DbPool,
    email: &str,
    password_hash: &str,
    name: Option<&str>,
) -> AppResult<User> {
    let id = uuid::Uuid::now_v7().to_string();
    let conn = pool.get()?;

    let result = conn.execute(
        "INSERT INTO users (id, email, password_hash, name) VALUES (?1, ?2, ?3, ?4)",
        params![id, email, password_hash, name],
    );

    match result {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            return Err(AppError::Conflict("Email already registered".into()));
        }
        Err(e) => return Err(e.into()),
    }

    drop(conn);
    find_by_id(pool, &id)?.ok_or_else(|| AppError::Internal("User vanished after insert".into()))
}

/// Apply a partial profile update. `None` leaves a field alone, `Some(None)` clears it.
pub fn update_profile(
    pool: &DbPool,
    id: &str,
    name: Option<Option<String>>,
    image: Option<Option<String>>,
) -> AppResult<User> {
    let conn = pool.get()?;

    if let Some(name) = name {
        conn.execute(
            "UPDATE users SET name = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![name, id],
        )?;
    }
    if let Some(image) = image {
        conn.execute(
            "UPDATE users SET image = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![image, id],
        )?;
    }

    drop(conn);
    find_by_id(pool, id)?.ok_or(AppError::NotFound)
}

pub fn update_password_hash(pool: &DbPool, id: &str, password_hash: &str) -> AppResult<()> {
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE users SET password_hash = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![password_hash, id],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn pool() -> DbPool {
        let pool = db::memory_pool().unwrap();
        db::run_migrations(&pool).unwrap();
        pool
    }

    #[test]
    fn insert_then_find() {
        let pool = pool();
        let user = insert(&pool, "a@example.com", "hash", Some("Ana")).unwrap();
        assert_eq!(user.email, "a@example.com");
        assert_eq!(user.name.as_deref(), Some("Ana"));

        let by_email = find_by_email(&pool, "a@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.password_hash, "hash");

        assert!(find_by_id(&pool, "missing").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_conflict() {
        let pool = pool();
        insert(&pool, "a@example.com", "hash", None).unwrap();
        let err = insert(&pool, "a@example.com", "hash2", None).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn partial_profile_update() {
        let pool = pool();
        let user = insert(&pool, "a@example.com", "hash", Some("Ana")).unwrap();

        let updated =
            update_profile(&pool, &user.id, None, Some(Some("avatar.png".into()))).unwrap();
        assert_eq!(updated.name.as_deref(), Some("Ana"));
        assert_eq!(updated.image.as_deref(), Some("avatar.png"));

        let cleared = update_profile(&pool, &user.id, Some(None), None).unwrap();
        assert!(cleared.name.is_none());
        assert_eq!(cleared.image.as_deref(), Some("avatar.png"));
    }

    #[test]
    fn update_password_for_missing_user_is_not_found() {
        let pool = pool();
        let err = update_password_hash(&pool, "ghost", "hash").unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }
}
