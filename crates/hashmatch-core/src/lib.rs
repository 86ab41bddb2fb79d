pub mod config;
pub mod error;
pub mod types;

pub use error::{HashmatchError, HashmatchResult};
pub use types::{Digest, DIGEST_HEX_LEN};
