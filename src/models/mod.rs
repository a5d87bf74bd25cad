pub mod directive;
pub mod disposition;
pub mod headers;
pub mod message;
