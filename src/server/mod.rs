mod handlers;
mod models;
mod state;

pub use handlers::{build_router, run_server};
