//! senvec server: HTTP surface over the encoders and the vector store.

pub mod error;
pub mod routes;
pub mod startup;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
