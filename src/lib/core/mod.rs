pub mod error;
pub mod todo;
pub mod request;
pub mod todo_service;

pub use error::*;
pub use todo::*;
pub use request::*;
pub use todo_service::*;
