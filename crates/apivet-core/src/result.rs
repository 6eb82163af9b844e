//! Result type alias for apivet operations

use crate::error::ApiVetError;

/// Standard Result type for apivet operations
pub type Result<T> = std::result::Result<T, ApiVetError>;
