mod queue_utils;

pub use queue_utils::*;
