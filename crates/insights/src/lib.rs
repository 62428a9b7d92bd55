pub mod classify;
pub mod schema;
pub mod stats;
pub mod summary;

pub use classify::*;
pub use schema::*;
pub use stats::*;
pub use summary::*;
