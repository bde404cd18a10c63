//! 错误分类
//!
//! 所有失败都会中止整个操作，不返回部分输出，也不做自动重试。
//! `hint()` 给出面向用户的补救建议，CLI 直接展示。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// 结构校验失败，尚未执行任何密码学运算
    #[error("not a file produced by filecrypt: {0}")]
    MalformedEnvelope(&'static str),

    #[error("key derivation failed")]
    KeyDerivationFailed,

    #[error("decryption failed, the password or private key does not match")]
    DecryptionFailed,

    #[error("could not unlock the private key")]
    KeyUnlockFailed,

    /// 流结束时没有遇到 FINAL chunk
    #[error("encrypted file is truncated")]
    TruncatedEnvelope,

    #[error("invalid key: {0}")]
    InvalidKey(&'static str),

    #[error("invalid file metadata: {0}")]
    InvalidDescriptor(&'static str),

    #[error("invalid engine options: {0}")]
    InvalidOptions(&'static str),

    #[error("encryption failed")]
    EncryptionFailed,
}

impl EnvelopeError {
    /// 面向终端用户的补救提示；没有可行建议时为 `None`
    pub fn hint(&self) -> Option<&'static str> {
        let hint = match self {
            Self::MalformedEnvelope(_) => {
                "the input was not encrypted by this tool or its header is damaged"
            }
            Self::DecryptionFailed => {
                "check the password, or that the private key matches the recipient used to encrypt"
            }
            Self::KeyUnlockFailed => "check the private key passphrase",
            Self::TruncatedEnvelope => "the encrypted file is incomplete, copy it again",
            Self::InvalidKey(_) => "supply an age recipient (age1...) or identity (AGE-SECRET-KEY-1...)",
            Self::KeyDerivationFailed => "not enough memory to derive the key",
            Self::Io(_) => "check that the input is readable and the output location is writable",
            Self::InvalidDescriptor(_) | Self::InvalidOptions(_) | Self::EncryptionFailed => {
                return None;
            }
        };
        Some(hint)
    }
}
