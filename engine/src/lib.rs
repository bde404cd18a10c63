//! filecrypt：密码与公钥两种方式的文件信封加密
//!
//! - 密码：Argon2id 派生密钥 + XChaCha20-Poly1305 secretstream 分块加密
//! - 公钥：age X25519，整条消息加密
//!
//! 两条路径共用同一个描述符前缀（文件名、类型、大小）。
//! 每个操作独占自己的密钥、salt、流头与流状态，可在不同线程上并发执行。

mod decrypt;
mod encrypt;
mod file;

pub mod crypto;
pub mod error;
pub mod format;
pub mod fs;
pub mod method;
pub mod options;
pub mod progress;

pub use crypto::kdf::KdfParams;
pub use error::EnvelopeError;
pub use file::{DecryptedFile, PlainFile};
pub use format::metadata::FileDescriptor;
pub use method::{DecryptMethod, EncryptMethod};
pub use options::EngineOptions;

use std::io::Read;

use progress::Progress;

/// 使用默认参数加密
pub fn encrypt<R: Read>(
    source: PlainFile<R>,
    method: EncryptMethod<'_>,
    on_progress: Option<&mut dyn FnMut(u8)>,
) -> Result<Vec<u8>, EnvelopeError> {
    encrypt_with_options(source, method, &EngineOptions::default(), on_progress)
}

/// 加密并返回完整信封
///
/// `options` 只作用于密码路径。
pub fn encrypt_with_options<R: Read>(
    source: PlainFile<R>,
    method: EncryptMethod<'_>,
    options: &EngineOptions,
    on_progress: Option<&mut dyn FnMut(u8)>,
) -> Result<Vec<u8>, EnvelopeError> {
    let mut progress = Progress::new(on_progress);

    match method {
        EncryptMethod::Password(password) => {
            encrypt::encrypt_with_password(source, password, options, &mut progress)
        }
        EncryptMethod::PublicKey(recipient) => {
            encrypt::encrypt_with_public_key(source, recipient, &mut progress)
        }
    }
}

/// 使用默认参数解密
pub fn decrypt(
    envelope: &[u8],
    method: DecryptMethod<'_>,
    on_progress: Option<&mut dyn FnMut(u8)>,
) -> Result<DecryptedFile, EnvelopeError> {
    decrypt_with_options(envelope, method, &EngineOptions::default(), on_progress)
}

/// 解密信封，返回原始字节与描述符
pub fn decrypt_with_options(
    envelope: &[u8],
    method: DecryptMethod<'_>,
    options: &EngineOptions,
    on_progress: Option<&mut dyn FnMut(u8)>,
) -> Result<DecryptedFile, EnvelopeError> {
    let mut progress = Progress::new(on_progress);

    match method {
        DecryptMethod::Password(password) => {
            decrypt::decrypt_with_password(envelope, password, options, &mut progress)
        }
        DecryptMethod::PrivateKey { key, passphrase } => {
            decrypt::decrypt_with_private_key(envelope, key, passphrase, &mut progress)
        }
    }
}
