pub mod errors;
pub mod id;

pub use errors::{ChorusError, ConfigError};
pub use id::{new_correlation_id, new_id, ConversationId};

pub type Result<T> = std::result::Result<T, ChorusError>;
