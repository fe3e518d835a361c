pub mod api;
mod middleware;
mod public;

pub use api::{ApiState, build_api_router};
pub use public::{HttpState, LocalAssets, build_router};
