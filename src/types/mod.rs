mod todo;
mod todo_error;

pub use todo::{NewTodo, Todo, TodoId, TodoPatch};
pub use todo_error::TodoError;
