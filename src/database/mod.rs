pub mod facts;
pub mod periods;
pub mod schema;

pub use facts::*;
pub use periods::*;
pub use schema::*;
