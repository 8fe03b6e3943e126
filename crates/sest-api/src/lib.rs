pub mod channels;
pub mod error;
pub mod middleware;
pub mod records;
pub mod routes;
pub mod state;
pub mod upload;
pub mod users;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};
