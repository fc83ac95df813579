use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use crate::core::{parse_todo_id, ListQuery, TodoError, TodoService};
use crate::storage::Storage;

#[cfg(feature = "tracing")]
use tower_http::trace::TraceLayer;
#[cfg(feature = "tracing")]
use tracing::{debug, error, info, instrument};

pub const API_PREFIX: &str = "/api/v1";

type JsonBody = Result<Json<Map<String, Value>>, JsonRejection>;

pub struct HttpTransport<S: Storage + Send + Sync + 'static> {
    service: TodoService<S>,
}

impl<S: Storage + Send + Sync + 'static> HttpTransport<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            service: TodoService::new(storage),
        }
    }

    pub fn router(&self) -> Router {
        let api = Router::new()
            .route("/health", get(health))
            .route("/todos", get(list_todos::<S>).post(create_todo::<S>))
            .route(
                "/todos/{todo_id}",
                get(get_todo::<S>).put(update_todo::<S>).delete(delete_todo::<S>),
            )
            .with_state(self.service.clone());

        let router = Router::new()
            .nest(API_PREFIX, api)
            .layer(CorsLayer::permissive());

        #[cfg(feature = "tracing")]
        let router = router.layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                tracing::info_span!("http_request", method = ?request.method(), uri)
            },
        ));

        router
    }

    pub async fn serve(&self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        #[cfg(feature = "tracing")]
        info!(addr = %addr, "HTTP server started");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

impl IntoResponse for TodoError {
    fn into_response(self) -> Response {
        let status = match &self {
            TodoError::NotFound => StatusCode::NOT_FOUND,
            TodoError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        let message = match &self {
            TodoError::Storage(err) => {
                #[cfg(feature = "tracing")]
                error!(error = ?err, "Storage failure");
                #[cfg(not(feature = "tracing"))]
                eprintln!("Storage failure: {err:#}");
                "Internal server error".to_string()
            }
            other => {
                #[cfg(feature = "tracing")]
                debug!(error = %other, status = %status, "Rejected request");
                other.to_string()
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn health() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

fn json_object(body: JsonBody) -> Result<Map<String, Value>, TodoError> {
    body.map(|Json(map)| map).map_err(|_| TodoError::InvalidBody)
}

#[cfg_attr(feature = "tracing", instrument(skip(service)))]
async fn list_todos<S: Storage + Send + Sync + 'static>(
    State(service): State<TodoService<S>>,
    Query(query): Query<ListQuery>,
) -> Result<Response, TodoError> {
    let todos = service.list(query).await?;
    Ok((StatusCode::OK, Json(todos)).into_response())
}

#[cfg_attr(feature = "tracing", instrument(skip(service)))]
async fn get_todo<S: Storage + Send + Sync + 'static>(
    State(service): State<TodoService<S>>,
    Path(todo_id): Path<String>,
) -> Result<Response, TodoError> {
    let todo = service.get(parse_todo_id(&todo_id)?).await?;
    Ok((StatusCode::OK, Json(todo)).into_response())
}

#[cfg_attr(feature = "tracing", instrument(skip(service, body)))]
async fn create_todo<S: Storage + Send + Sync + 'static>(
    State(service): State<TodoService<S>>,
    body: JsonBody,
) -> Result<Response, TodoError> {
    let todo = service.create(json_object(body)?).await?;
    Ok((StatusCode::CREATED, Json(todo)).into_response())
}

#[cfg_attr(feature = "tracing", instrument(skip(service, body)))]
async fn update_todo<S: Storage + Send + Sync + 'static>(
    State(service): State<TodoService<S>>,
    Path(todo_id): Path<String>,
    body: JsonBody,
) -> Result<Response, TodoError> {
    let id = parse_todo_id(&todo_id)?;
    let todo = service.update(id, json_object(body)?).await?;
    Ok((StatusCode::OK, Json(todo)).into_response())
}

#[cfg_attr(feature = "tracing", instrument(skip(service)))]
async fn delete_todo<S: Storage + Send + Sync + 'static>(
    State(service): State<TodoService<S>>,
    Path(todo_id): Path<String>,
) -> Result<Response, TodoError> {
    let response = match service.delete(parse_todo_id(&todo_id)?).await? {
        Some(todo) => (StatusCode::OK, Json(todo)).into_response(),
        None => (StatusCode::OK, Json(json!({}))).into_response(),
    };
    Ok(response)
}
