pub mod auth;
pub mod channels;
pub mod error;
pub mod rooms;

pub use error::ApiError;
