pub mod handlers;
pub mod middleware;
pub mod policy;
pub mod routes;
pub mod searcher;
pub mod suppressed;

pub use routes::create_router;
