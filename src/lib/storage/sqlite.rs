use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::core::{NewTodo, Todo, TodoFilter, TodoPatch};
use crate::storage::Storage;

#[cfg(feature = "tracing")]
use tracing::info;

const INSERT_TODO: &str = "INSERT INTO todos (title, description, completed, deadline_at, created_at, updated_at)
     VALUES (?, ?, ?, ?, ?, ?)
     RETURNING id, title, description, completed, deadline_at, created_at, updated_at";
const SELECT_TODO: &str = "SELECT id, title, description, completed, deadline_at, created_at, updated_at
     FROM todos WHERE id = ?";
const SELECT_ALL: &str = "SELECT id, title, description, completed, deadline_at, created_at, updated_at
     FROM todos ORDER BY id";
const SELECT_COMPLETED: &str = "SELECT id, title, description, completed, deadline_at, created_at, updated_at
     FROM todos WHERE completed = ? ORDER BY id";
const SELECT_DUE_BY: &str = "SELECT id, title, description, completed, deadline_at, created_at, updated_at
     FROM todos WHERE deadline_at IS NOT NULL AND deadline_at <= ? ORDER BY id";
const UPDATE_TODO: &str = "UPDATE todos
     SET title = ?, description = ?, completed = ?, deadline_at = ?, updated_at = ?
     WHERE id = ?";
const DELETE_TODO: &str = "DELETE FROM todos WHERE id = ?
     RETURNING id, title, description, completed, deadline_at, created_at, updated_at";

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Opens (creating if needed) the database at `url` and brings its schema up to date.
    pub async fn new(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url {url}"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open database {url}"))?;
        #[cfg(feature = "tracing")]
        info!(url = %url, "Database opened");
        Self::from_pool(pool).await
    }

    /// Private in-memory database. Each `:memory:` connection is its own database,
    /// so the pool holds exactly one connection for its whole life.
    pub async fn new_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("failed to open in-memory database")?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!()
            .run(&pool)
            .await
            .context("failed to run migrations")?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn insert_todo(&self, todo: NewTodo) -> Result<Todo> {
        sqlx::query_as::<_, Todo>(INSERT_TODO)
            .bind(&todo.title)
            .bind(&todo.description)
            .bind(todo.completed)
            .bind(todo.deadline_at)
            .bind(todo.created_at)
            .bind(todo.created_at)
            .fetch_one(&self.pool)
            .await
            .context("failed to insert todo")
    }

    async fn get_todo(&self, id: i64) -> Result<Option<Todo>> {
        sqlx::query_as::<_, Todo>(SELECT_TODO)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load todo {id}"))
    }

    async fn list_todos(&self, filter: &TodoFilter) -> Result<Vec<Todo>> {
        let query = match *filter {
            TodoFilter::All => sqlx::query_as::<_, Todo>(SELECT_ALL),
            TodoFilter::Completed(completed) => {
                sqlx::query_as::<_, Todo>(SELECT_COMPLETED).bind(completed)
            }
            TodoFilter::DueBy(cutoff) => sqlx::query_as::<_, Todo>(SELECT_DUE_BY).bind(cutoff),
        };
        query
            .fetch_all(&self.pool)
            .await
            .context("failed to list todos")
    }

    async fn update_todo(&self, id: i64, patch: TodoPatch) -> Result<Option<Todo>> {
        let mut tx = self.pool.begin().await.context("failed to begin transaction")?;
        let Some(mut todo) = sqlx::query_as::<_, Todo>(SELECT_TODO)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .with_context(|| format!("failed to load todo {id}"))?
        else {
            return Ok(None);
        };
        patch.apply(&mut todo);
        sqlx::query(UPDATE_TODO)
            .bind(&todo.title)
            .bind(&todo.description)
            .bind(todo.completed)
            .bind(todo.deadline_at)
            .bind(todo.updated_at)
            .bind(id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to update todo {id}"))?;
        tx.commit().await.context("failed to commit update")?;
        Ok(Some(todo))
    }

    async fn delete_todo(&self, id: i64) -> Result<Option<Todo>> {
        sqlx::query_as::<_, Todo>(DELETE_TODO)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to delete todo {id}"))
    }
}
