pub mod asymmetric;
pub mod kdf;
