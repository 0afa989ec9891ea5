mod auth;
mod bearer;
pub mod config;
mod error;
mod password;
#[cfg(feature = "postgres")]
mod postgres;
mod routes;
mod store;
mod token;
mod types;

pub use auth::*;
pub use error::*;
pub use password::*;
#[cfg(feature = "postgres")]
pub use postgres::*;
pub use routes::*;
pub use store::*;
pub use token::*;
pub use types::*;
