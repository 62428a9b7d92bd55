pub mod client;
pub mod error;
pub mod http;
pub mod router;
pub mod store;
pub mod types;

pub use client::*;
pub use error::*;
pub use http::*;
pub use router::*;
pub use store::*;
pub use types::*;
