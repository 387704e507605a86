pub mod cache;
pub mod error;
pub mod traits;
pub mod types;

pub use cache::*;
pub use error::*;
pub use traits::*;
pub use types::*;
