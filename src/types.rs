use std::sync::{Arc, RwLock};

use crate::error::SmallError;

// Type alias, not a new type, so the underlying methods keep working.
pub type Pod<T> = Arc<RwLock<T>>;

pub type ResultPod<T> = Result<Pod<T>, SmallError>;
pub type SmallResult = Result<(), SmallError>;
