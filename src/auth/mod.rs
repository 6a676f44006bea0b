pub mod middleware;
pub mod session;

pub use middleware::{session_token, Viewer};
pub use session::{generate_session_token, start_session};
