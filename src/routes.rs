use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::gateway::UpdateGateway;
use crate::scheduler::DecayScheduler;
use crate::store::PetStore;
use crate::user::NewUser;

pub type AppState = Arc<UpdateGateway>;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct InteractRequest {
    pub speech: String,
}

pub fn build_router(gateway: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        // Accounts
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth", post(login_handler))
        .route("/api/auth/me", get(me_handler))
        // Todos
        .route("/api/todo", get(list_todos_handler).post(create_todo_handler))
        .route(
            "/api/todo/:id",
            get(get_todo_handler)
                .put(complete_todo_handler)
                .delete(delete_todo_handler),
        )
        // Pet
        .route("/api/pet/feed", post(feed_handler))
        .route("/api/pet/interact", post(interact_handler))
        .route("/api/pet/state", get(pet_state_handler))
        .layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                    .allow_headers(Any),
            ),
        )
        .with_state(gateway)
}

/// Build the store, gateway and scheduler, then serve until shutdown.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let store = Arc::new(tokio::sync::Mutex::new(PetStore::new(config.db_file())?));

    let gateway: AppState = Arc::new(UpdateGateway::new(&config, Arc::clone(&store))?);

    let scheduler = DecayScheduler::new(
        store,
        std::time::Duration::from_secs(config.decay_interval_secs),
    );
    tokio::spawn(scheduler.run());

    let app = build_router(gateway);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server listening on http://0.0.0.0:{}", config.port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn authenticate(gateway: &UpdateGateway, headers: &HeaderMap) -> Result<String> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    gateway.authenticate(header)
}

async fn root_handler() -> &'static str {
    "Hello, World!"
}

// ---- account handlers ----

async fn register_handler(
    State(gateway): State<AppState>,
    Json(new_user): Json<NewUser>,
) -> Result<impl IntoResponse> {
    let (token, user) = gateway.register(new_user).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful",
            "token": token,
            "user": user,
        })),
    ))
}

async fn login_handler(
    State(gateway): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let (token, user) = gateway.login(&request.email, &request.password).await?;
    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": user,
    })))
}

async fn me_handler(
    State(gateway): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let user_id = authenticate(&gateway, &headers)?;
    let user = gateway.me(&user_id).await?;
    Ok(Json(json!({ "user": user })))
}

// ---- todo handlers ----

async fn list_todos_handler(
    State(gateway): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let user_id = authenticate(&gateway, &headers)?;
    let todos = gateway.list_todos(&user_id).await?;
    Ok(Json(todos))
}

async fn create_todo_handler(
    State(gateway): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateTodoRequest>,
) -> Result<impl IntoResponse> {
    let user_id = authenticate(&gateway, &headers)?;
    let todo = gateway.create_todo(&user_id, &request.description).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn get_todo_handler(
    State(gateway): State<AppState>,
    headers: HeaderMap,
    Path(todo_id): Path<String>,
) -> Result<impl IntoResponse> {
    let user_id = authenticate(&gateway, &headers)?;
    let todo = gateway.get_todo(&user_id, &todo_id).await?;
    Ok(Json(todo))
}

async fn complete_todo_handler(
    State(gateway): State<AppState>,
    headers: HeaderMap,
    Path(todo_id): Path<String>,
) -> Result<impl IntoResponse> {
    let user_id = authenticate(&gateway, &headers)?;
    let state = gateway.complete_todo(&user_id, &todo_id).await?;
    Ok(Json(json!({
        "message": "Updated successfully",
        "pet_state": state,
    })))
}

async fn delete_todo_handler(
    State(gateway): State<AppState>,
    headers: HeaderMap,
    Path(todo_id): Path<String>,
) -> Result<impl IntoResponse> {
    let user_id = authenticate(&gateway, &headers)?;
    gateway.delete_todo(&user_id, &todo_id).await?;
    Ok(Json(json!({ "message": "Deleted successfully" })))
}

// ---- pet handlers ----

async fn feed_handler(
    State(gateway): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let user_id = authenticate(&gateway, &headers)?;

    let mut image = None;
    let mut filename = "upload.jpg".to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        if field.name() == Some("image") {
            if let Some(name) = field.file_name() {
                filename = name.to_string();
            }
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(e.to_string()))?;
            image = Some(bytes.to_vec());
        }
    }

    let image = image.ok_or_else(|| AppError::Validation("No image provided".to_string()))?;

    let (classification, state) = gateway.classify_food(&user_id, image, &filename).await?;
    Ok(Json(json!({
        "classification": classification,
        "pet_state": state,
    })))
}

async fn interact_handler(
    State(gateway): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<InteractRequest>,
) -> Result<impl IntoResponse> {
    let user_id = authenticate(&gateway, &headers)?;
    let (analysis, state) = gateway.record_interaction(&user_id, &request.speech).await?;
    Ok(Json(json!({
        "analysis": analysis,
        "pet_state": state,
    })))
}

async fn pet_state_handler(
    State(gateway): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let user_id = authenticate(&gateway, &headers)?;
    let view = gateway.pet_state(&user_id).await?;
    Ok(Json(view))
}
