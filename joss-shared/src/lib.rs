pub mod types;
pub mod errors;
pub mod session;
pub mod middleware;
pub mod clients;

pub use types::*;
pub use errors::{AppError, ErrorCode, AppResult};
pub use session::{SessionKeys, SessionSecret};
