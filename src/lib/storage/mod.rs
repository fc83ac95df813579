pub mod memory;
#[cfg(feature = "storage")]
pub mod sqlite;

pub use memory::MemoryStorage;
#[cfg(feature = "storage")]
pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use crate::core::{NewTodo, Todo, TodoFilter, TodoPatch};

/// Persistence for todos. Lists come back in ascending id order.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn insert_todo(&self, todo: NewTodo) -> anyhow::Result<Todo>;
    async fn get_todo(&self, id: i64) -> anyhow::Result<Option<Todo>>;
    async fn list_todos(&self, filter: &TodoFilter) -> anyhow::Result<Vec<Todo>>;
    async fn update_todo(&self, id: i64, patch: TodoPatch) -> anyhow::Result<Option<Todo>>;
    async fn delete_todo(&self, id: i64) -> anyhow::Result<Option<Todo>>;
}
