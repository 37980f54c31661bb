pub mod example;
pub mod language;
pub mod text;

pub use example::Example;
pub use language::{Language, detect_language};
