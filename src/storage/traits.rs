use chrono::{DateTime, Utc};

use crate::types::{NewTodo, Todo, TodoId};

pub trait StorageRead {
    fn load_todo(&self, id: TodoId) -> anyhow::Result<Option<Todo>>;
    /// All stored items in insertion order.
    fn list_todos(&self) -> anyhow::Result<Vec<Todo>>;
}

pub trait StorageWrite {
    /// Persist a new item stamped with `now` and return it as stored.
    fn insert_todo(&self, todo: &NewTodo, now: DateTime<Utc>) -> anyhow::Result<Todo>;
    /// Overwrite the mutable columns of `todo.id`. Returns the affected row count.
    fn update_todo(&self, todo: &Todo) -> anyhow::Result<usize>;
    /// Returns the affected row count.
    fn delete_todo(&self, id: TodoId) -> anyhow::Result<usize>;
}

/// A write scope. Nothing is visible to other connections until `commit`;
/// dropping the scope without committing discards every write made in it.
pub trait StorageTx: StorageRead + StorageWrite {
    fn commit(self) -> anyhow::Result<()>;
}

pub trait Storage: StorageRead {
    type Tx: StorageTx;

    fn begin_tx(&self) -> anyhow::Result<Self::Tx>;
}
