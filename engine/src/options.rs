//! 引擎参数
//!
//! 格式本身不记录 chunk 大小与 KDF 参数，加密端与解密端必须使用相同的参数。

use crate::crypto::kdf::KdfParams;
use crate::error::EnvelopeError;
use crate::format::stream::DEFAULT_CHUNK_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// 明文 chunk 大小（字节）
    pub chunk_size: usize,
    pub kdf: KdfParams,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            kdf: KdfParams::INTERACTIVE,
        }
    }
}

impl EngineOptions {
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if self.chunk_size == 0 {
            return Err(EnvelopeError::InvalidOptions("chunk size must be positive"));
        }
        Ok(())
    }
}
