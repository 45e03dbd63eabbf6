pub mod fields;
pub mod mapper;
pub mod title;
pub mod writer;

pub use writer::WriteError;
