//! Building blocks shared by the screens.

mod field;
mod task;
mod text;

pub use field::TextField;
pub use task::{TaskCompleted, TaskId, TaskKind, TaskSeq, TaskState, Tasks};
pub use text::{mask, truncate_with_ellipsis};
