use chrono::{DateTime, Utc};

use crate::{
    storage::{Storage, StorageRead, StorageTx, StorageWrite},
    types::{NewTodo, Todo, TodoError, TodoId, TodoPatch},
};

type Clock = fn() -> DateTime<Utc>;

/// CRUD operations over an injected store handle.
///
/// Every write runs inside a single store transaction: either all of it
/// commits or none of it is visible.
#[derive(Clone)]
pub struct TodoRepository<S> {
    storage: S,
    clock: Clock,
}

impl<S: Storage> TodoRepository<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn create(&self, new: &NewTodo) -> Result<Todo, TodoError> {
        let now = (self.clock)();
        self.write("creating", |tx| {
            tx.insert_todo(new, now)
                .map_err(|e| TodoError::internal("creating", e))
        })
    }

    pub fn list(&self) -> Result<Vec<Todo>, TodoError> {
        self.storage
            .list_todos()
            .map_err(|e| TodoError::internal("retrieving", e))
    }

    pub fn get(&self, id: TodoId) -> Result<Todo, TodoError> {
        find(&self.storage, id, "retrieving")
    }

    /// Apply the fields present in `patch`. An empty patch changes nothing,
    /// not even `updated_at`.
    pub fn update(&self, id: TodoId, patch: &TodoPatch) -> Result<Todo, TodoError> {
        let now = (self.clock)();
        self.write("updating", |tx| {
            let mut todo = find(tx, id, "updating")?;
            if !patch.apply_to(&mut todo) {
                return Ok(todo);
            }
            todo.touch(now);

            let rows = tx
                .update_todo(&todo)
                .map_err(|e| TodoError::internal("updating", e))?;
            if rows == 0 {
                return Err(TodoError::NotFound(id));
            }
            Ok(todo)
        })
    }

    /// Remove the item. A missing id is `NotFound`, same as `get`.
    pub fn delete(&self, id: TodoId) -> Result<(), TodoError> {
        self.write("deleting", |tx| {
            find(tx, id, "deleting")?;
            let rows = tx
                .delete_todo(id)
                .map_err(|e| TodoError::internal("deleting", e))?;
            if rows == 0 {
                return Err(TodoError::NotFound(id));
            }
            Ok(())
        })
    }

    fn write<T, F>(&self, action: &'static str, f: F) -> Result<T, TodoError>
    where
        F: FnOnce(&S::Tx) -> Result<T, TodoError>,
    {
        let tx = self
            .storage
            .begin_tx()
            .map_err(|e| TodoError::internal(action, e))?;
        let out = f(&tx)?;
        tx.commit().map_err(|e| TodoError::internal(action, e))?;
        Ok(out)
    }
}

fn find<R: StorageRead + ?Sized>(
    reader: &R,
    id: TodoId,
    action: &'static str,
) -> Result<Todo, TodoError> {
    reader
        .load_todo(id)
        .map_err(|e| TodoError::internal(action, e))?
        .ok_or(TodoError::NotFound(id))
}
