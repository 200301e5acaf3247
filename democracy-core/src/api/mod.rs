pub mod responses;
pub mod routes;

pub use responses::ApiResponse;
pub use routes::{utils, v1};
