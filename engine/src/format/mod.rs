pub mod cursor;
pub mod envelope;
pub mod metadata;
pub mod stream;
