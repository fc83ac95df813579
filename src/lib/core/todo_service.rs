use std::sync::Arc;

use serde_json::{Map, Value};

use crate::core::{now, ListQuery, Todo, TodoError, TodoFields};
use crate::storage::Storage;

#[cfg(feature = "tracing")]
use tracing::{debug, info, instrument};

/// Runs each todo operation against an injected store.
///
/// Every request body is validated in full before the store is touched, so a
/// rejected create or update leaves storage as it was.
pub struct TodoService<S: Storage + Send + Sync + 'static> {
    storage: Arc<S>,
}

impl<S: Storage + Send + Sync + 'static> Clone for TodoService<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: Storage + Send + Sync + 'static> TodoService<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub async fn list(&self, query: ListQuery) -> Result<Vec<Todo>, TodoError> {
        let filter = query.into_filter(now())?;
        #[cfg(feature = "tracing")]
        debug!(filter = ?filter, "Listing todos");
        Ok(self.storage.list_todos(&filter).await?)
    }

    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub async fn get(&self, id: i64) -> Result<Todo, TodoError> {
        self.storage.get_todo(id).await?.ok_or(TodoError::NotFound)
    }

    #[cfg_attr(feature = "tracing", instrument(skip(self, body)))]
    pub async fn create(&self, body: Map<String, Value>) -> Result<Todo, TodoError> {
        let new_todo = TodoFields::from_json(body)?.into_new_todo(now())?;
        let todo = self.storage.insert_todo(new_todo).await?;
        #[cfg(feature = "tracing")]
        info!(id = todo.id, "Todo created");
        Ok(todo)
    }

    #[cfg_attr(feature = "tracing", instrument(skip(self, body)))]
    pub async fn update(&self, id: i64, body: Map<String, Value>) -> Result<Todo, TodoError> {
        // A missing todo answers 404 before the body is even looked at.
        self.get(id).await?;
        let patch = TodoFields::from_json(body)?.into_patch(now())?;
        let todo = self
            .storage
            .update_todo(id, patch)
            .await?
            .ok_or(TodoError::NotFound)?;
        #[cfg(feature = "tracing")]
        info!(id = todo.id, "Todo updated");
        Ok(todo)
    }

    /// Deleting a todo that does not exist is a successful no-op.
    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub async fn delete(&self, id: i64) -> Result<Option<Todo>, TodoError> {
        let deleted = self.storage.delete_todo(id).await?;
        #[cfg(feature = "tracing")]
        match &deleted {
            Some(todo) => info!(id = todo.id, "Todo deleted"),
            None => debug!(id, "Nothing to delete"),
        }
        Ok(deleted)
    }
}
