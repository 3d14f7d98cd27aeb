/// Radio driver trait and reception errors
pub mod traits;

pub use traits::{Radio, ReceiveError};
