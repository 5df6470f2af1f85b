use axum::{
    extract::{FromRequest, Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, patch, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use crate::{
    db::driver::Db,
    error::AppError,
    guards,
    models::{deserialize_deadline, Todo, User},
    AppState,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/:id", get(get_user))
        .route("/users/:id/pro", patch(upgrade_to_pro))
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/:id", put(update_todo).delete(delete_todo))
        .route("/todos/:id/done", patch(mark_done))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// `Json` whose rejections render as `{"error": ..}` like every other failure
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
struct AppJson<T>(T);

// guards ran under the same lock, so a miss here is a store bug
fn resolved_user(db: &Db, user_id: Uuid) -> Result<&User, AppError> {
    db.user(user_id)
        .ok_or_else(|| anyhow::anyhow!("resolved user {user_id} missing from store").into())
}
fn resolved_user_mut(db: &mut Db, user_id: Uuid) -> Result<&mut User, AppError> {
    db.user_mut(user_id)
        .ok_or_else(|| anyhow::anyhow!("resolved user {user_id} missing from store").into())
}
fn resolved_todo_mut(db: &mut Db, ctx: guards::TodoCtx) -> Result<&mut Todo, AppError> {
    db.todo_mut(ctx.user_id, ctx.todo_id)
        .ok_or_else(|| anyhow::anyhow!("resolved todo {} missing from store", ctx.todo_id).into())
}

// === Users ===
#[derive(Deserialize)]
struct CreateUser {
    name: String,
    username: String,
}
async fn create_user(
    State(state): State<AppState>,
    AppJson(CreateUser { name, username }): AppJson<CreateUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let mut db = state.write().await;
    if db.username_exists(&username) {
        return Err(AppError::bad_request("Username already exists"));
    }
    let user = db.insert_user(User::new(name, username)).clone();
    info!(user_id = %user.id, username = %user.username, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let db = state.read().await;
    let ctx = guards::user_by_id(&db, &id)?;
    Ok(Json(resolved_user(&db, ctx.user_id)?.clone()))
}

async fn upgrade_to_pro(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let mut db = state.write().await;
    let ctx = guards::user_by_id(&db, &id)?;
    let user = resolved_user_mut(&mut db, ctx.user_id)?;
    if user.pro {
        return Err(AppError::bad_request("Pro plan is already activated."));
    }
    user.pro = true;
    info!(user_id = %user.id, "pro plan activated");
    Ok(Json(user.clone()))
}

// === Todos ===
#[derive(Deserialize)]
struct TodoBody {
    title: String,
    #[serde(deserialize_with = "deserialize_deadline")]
    deadline: DateTime<Utc>,
}

async fn list_todos(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Todo>>, AppError> {
    let db = state.read().await;
    let ctx = guards::user_by_header(&db, &headers)?;
    Ok(Json(resolved_user(&db, ctx.user_id)?.todos.clone()))
}

async fn create_todo(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(TodoBody { title, deadline }): AppJson<TodoBody>,
) -> Result<(StatusCode, Json<Todo>), AppError> {
    let mut db = state.write().await;
    let ctx = guards::user_by_header(&db, &headers)?;
    let ctx = guards::enforce_todo_quota(&db, ctx)?;
    let todo = db
        .push_todo(ctx.user_id, Todo::new(title, deadline))
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("resolved user {} missing from store", ctx.user_id))?;
    info!(user_id = %ctx.user_id, todo_id = %todo.id, "todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn update_todo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    AppJson(TodoBody { title, deadline }): AppJson<TodoBody>,
) -> Result<Json<Todo>, AppError> {
    let mut db = state.write().await;
    let ctx = guards::todo_by_id(&db, &headers, &id)?;
    let todo = resolved_todo_mut(&mut db, ctx)?;
    todo.title = title;
    todo.deadline = deadline;
    Ok(Json(todo.clone()))
}

async fn mark_done(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Todo>, AppError> {
    let mut db = state.write().await;
    let ctx = guards::todo_by_id(&db, &headers, &id)?;
    let todo = resolved_todo_mut(&mut db, ctx)?;
    todo.done = true;
    Ok(Json(todo.clone()))
}

async fn delete_todo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut db = state.write().await;
    let user = guards::user_by_header(&db, &headers)?;
    let todo = guards::todo_by_id(&db, &headers, &id)?;
    db.remove_todo(user.user_id, todo.todo_id)
        .ok_or_else(|| AppError::not_found("Todo not found"))?;
    info!(user_id = %user.user_id, todo_id = %todo.todo_id, "todo deleted");
    Ok(StatusCode::NO_CONTENT)
}
