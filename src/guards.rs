//! Request guards.
//!
//! Each guard resolves something from the request against the store and
//! either yields a typed context for the next step or fails the request.
//! Handlers run them left to right with `?`, so the first failure wins.

use std::sync::LazyLock;

use axum::http::HeaderMap;
use regex::Regex;
use uuid::Uuid;

use crate::{db::driver::Db, error::AppError};

/// Todos a free-tier user may hold before creation is refused.
pub const FREE_TIER_TODO_LIMIT: usize = 10;

static ID_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-5][0-9a-f]{3}-[089ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .unwrap()
});

/// A user resolved for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserCtx {
    pub user_id: Uuid,
}

/// A todo resolved for the current request, along with its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TodoCtx {
    pub user_id: Uuid,
    pub todo_id: Uuid,
}

fn username_header(headers: &HeaderMap) -> Option<&str> {
    headers.get("username").and_then(|v| v.to_str().ok())
}

pub fn is_valid_id(id: &str) -> bool {
    ID_FORMAT.is_match(id)
}

/// Resolves the user named by the `username` header.
pub fn user_by_header(db: &Db, headers: &HeaderMap) -> Result<UserCtx, AppError> {
    let user = username_header(headers)
        .and_then(|username| db.user_by_username(username))
        .ok_or_else(|| AppError::not_found("This username does not exist."))?;
    tracing::debug!(user_id = %user.id, "resolved user from header");
    Ok(UserCtx { user_id: user.id })
}

/// Refuses free-tier users that already hold a full quota of todos.
pub fn enforce_todo_quota(db: &Db, ctx: UserCtx) -> Result<UserCtx, AppError> {
    let user = db
        .user(ctx.user_id)
        .ok_or_else(|| AppError::not_found("This username does not exist."))?;
    // 10 todos allowed, the 11th refused
    if !user.pro && user.todos.len() > FREE_TIER_TODO_LIMIT - 1 {
        return Err(AppError::forbidden(
            " This user should be a pro to create more than 10 to do's",
        ));
    }
    Ok(ctx)
}

/// Resolves the todo named by the `id` path parameter, owned by the user
/// named in the `username` header. The id format is checked before any lookup.
pub fn todo_by_id(db: &Db, headers: &HeaderMap, id: &str) -> Result<TodoCtx, AppError> {
    if !is_valid_id(id) {
        return Err(AppError::bad_request("This id is invalid."));
    }
    let user = username_header(headers)
        .and_then(|username| db.user_by_username(username))
        .ok_or_else(|| AppError::not_found("This user does not exist."))?;
    let todo = user
        .todo_by_wire_id(id)
        .ok_or_else(|| AppError::not_found("This task does not exist."))?;
    tracing::debug!(user_id = %user.id, todo_id = %todo.id, "resolved todo");
    Ok(TodoCtx {
        user_id: user.id,
        todo_id: todo.id,
    })
}

/// Resolves the user named by the `id` path parameter.
pub fn user_by_id(db: &Db, id: &str) -> Result<UserCtx, AppError> {
    let user = db
        .user_by_wire_id(id)
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(UserCtx { user_id: user.id })
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderValue, StatusCode};
    use chrono::Utc;

    use super::*;
    use crate::models::{Todo, User};

    fn headers(username: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("username", HeaderValue::from_str(username).unwrap());
        headers
    }

    fn setup(todos: usize) -> (Db, Uuid) {
        let mut db = Db::new();
        let id = db
            .insert_user(User::new("Alice".to_string(), "alice".to_string()))
            .id;
        for n in 0..todos {
            db.push_todo(id, Todo::new(format!("todo {n}"), Utc::now()));
        }
        (db, id)
    }

    fn expect_err<T: std::fmt::Debug>(res: Result<T, AppError>, status: StatusCode, msg: &str) {
        let err = res.unwrap_err();
        assert_eq!(err.status(), status);
        assert_eq!(err.to_string(), msg);
    }

    #[test]
    fn test_id_format() {
        assert!(is_valid_id("b0a8f1f4-5d3c-4e2a-9f1b-0c2d3e4f5a6b"));
        assert!(is_valid_id("B0A8F1F4-5D3C-4E2A-9F1B-0C2D3E4F5A6B"));
        assert!(!is_valid_id("abc"));
        // version nibble above 5
        assert!(!is_valid_id("b0a8f1f4-5d3c-6e2a-9f1b-0c2d3e4f5a6b"));
        // variant nibble outside 0/8/9/a/b
        assert!(!is_valid_id("b0a8f1f4-5d3c-4e2a-cf1b-0c2d3e4f5a6b"));
        assert!(is_valid_id(&Uuid::new_v4().to_string()));
    }

    #[test]
    fn test_user_by_header() {
        let (db, id) = setup(0);
        assert_eq!(
            user_by_header(&db, &headers("alice")).unwrap(),
            UserCtx { user_id: id }
        );
        expect_err(
            user_by_header(&db, &headers("bob")),
            StatusCode::NOT_FOUND,
            "This username does not exist.",
        );
        expect_err(
            user_by_header(&db, &HeaderMap::new()),
            StatusCode::NOT_FOUND,
            "This username does not exist.",
        );
    }

    #[test]
    fn test_quota_allows_ten() {
        let (db, id) = setup(9);
        assert!(enforce_todo_quota(&db, UserCtx { user_id: id }).is_ok());
    }

    #[test]
    fn test_quota_blocks_eleventh() {
        let (db, id) = setup(10);
        let res = enforce_todo_quota(&db, UserCtx { user_id: id });
        assert_eq!(res.unwrap_err().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_quota_ignored_for_pro() {
        let (mut db, id) = setup(10);
        db.user_mut(id).unwrap().pro = true;
        assert!(enforce_todo_quota(&db, UserCtx { user_id: id }).is_ok());
    }

    #[test]
    fn test_todo_by_id() {
        let (db, id) = setup(2);
        let todo_id = db.user(id).unwrap().todos[1].id;
        let ctx = todo_by_id(&db, &headers("alice"), &todo_id.to_string()).unwrap();
        assert_eq!(ctx, TodoCtx { user_id: id, todo_id });
    }

    #[test]
    fn test_todo_by_id_checks_format_first() {
        let (db, _) = setup(1);
        expect_err(
            todo_by_id(&db, &headers("nobody"), "abc"),
            StatusCode::BAD_REQUEST,
            "This id is invalid.",
        );
    }

    #[test]
    fn test_todo_by_id_unknown_user_and_task() {
        let (db, id) = setup(1);
        let todo_id = db.user(id).unwrap().todos[0].id.to_string();
        expect_err(
            todo_by_id(&db, &headers("nobody"), &todo_id),
            StatusCode::NOT_FOUND,
            "This user does not exist.",
        );
        expect_err(
            todo_by_id(&db, &headers("alice"), &Uuid::new_v4().to_string()),
            StatusCode::NOT_FOUND,
            "This task does not exist.",
        );
    }

    #[test]
    fn test_user_by_id() {
        let (db, id) = setup(0);
        assert_eq!(
            user_by_id(&db, &id.to_string()).unwrap(),
            UserCtx { user_id: id }
        );
        expect_err(user_by_id(&db, "abc"), StatusCode::NOT_FOUND, "User not found");
        expect_err(
            user_by_id(&db, &Uuid::new_v4().to_string()),
            StatusCode::NOT_FOUND,
            "User not found",
        );
    }

    #[test]
    fn test_ids_resolve_by_exact_spelling() {
        let (db, id) = setup(1);
        for spelling in [id.simple().to_string(), id.urn().to_string(), id.braced().to_string()] {
            expect_err(user_by_id(&db, &spelling), StatusCode::NOT_FOUND, "User not found");
        }
        let upper = db.user(id).unwrap().todos[0].id.to_string().to_uppercase();
        expect_err(
            todo_by_id(&db, &headers("alice"), &upper),
            StatusCode::NOT_FOUND,
            "This task does not exist.",
        );
    }
}
