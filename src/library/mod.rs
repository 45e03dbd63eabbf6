pub mod task;
pub mod walker;
