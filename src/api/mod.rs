pub mod dto;
pub mod routes;

pub use routes::{create_router, ApiDoc, AppState};
