pub(crate) mod json_error;

pub use json_error::*;
