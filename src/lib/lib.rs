//! A small JSON todo-tracking HTTP service.
//!
//! [`crate::adapters::HttpTransport`] serves the `/api/v1` routes on top of
//! [`crate::core::TodoService`], which runs every operation against any
//! [`crate::storage::Storage`] implementation.

pub mod adapters;
pub mod config;
pub mod core;
pub mod storage;

#[cfg(test)]
mod tests {
    mod test;
}
