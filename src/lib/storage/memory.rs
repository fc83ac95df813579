use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::{NewTodo, Todo, TodoFilter, TodoPatch};

use super::Storage;

/// Process-local store, handy for tests and throwaway servers.
#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    todos: BTreeMap<i64, Todo>,
    last_id: i64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn insert_todo(&self, todo: NewTodo) -> Result<Todo> {
        let mut inner = self.inner.write().await;
        // Ids keep climbing across deletes, never handed out twice.
        inner.last_id += 1;
        let todo = Todo {
            id: inner.last_id,
            title: todo.title,
            description: todo.description,
            completed: todo.completed,
            deadline_at: todo.deadline_at,
            created_at: todo.created_at,
            updated_at: todo.created_at,
        };
        inner.todos.insert(todo.id, todo.clone());
        Ok(todo)
    }

    async fn get_todo(&self, id: i64) -> Result<Option<Todo>> {
        Ok(self.inner.read().await.todos.get(&id).cloned())
    }

    async fn list_todos(&self, filter: &TodoFilter) -> Result<Vec<Todo>> {
        let inner = self.inner.read().await;
        Ok(inner
            .todos
            .values()
            .filter(|todo| filter.matches(todo))
            .cloned()
            .collect())
    }

    async fn update_todo(&self, id: i64, patch: TodoPatch) -> Result<Option<Todo>> {
        let mut inner = self.inner.write().await;
        Ok(inner.todos.get_mut(&id).map(|todo| {
            patch.apply(todo);
            todo.clone()
        }))
    }

    async fn delete_todo(&self, id: i64) -> Result<Option<Todo>> {
        Ok(self.inner.write().await.todos.remove(&id))
    }
}
