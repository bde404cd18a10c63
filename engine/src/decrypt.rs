//! 解密流程实现
//!
//! 密码路径（严格顺序）：
//! 1. 解析并校验信封结构（失败即 `MalformedEnvelope`，不做任何密码学运算）
//! 2. 用信封中的 salt + 密码派生密钥
//! 3. 用流头重建 secretstream 状态
//! 4. 逐块解密，直到 FINAL；描述符中的大小决定最后一块的边界
//!
//! 公钥路径：解锁私钥 → age 解密 → 按同样的边界解析描述符前缀。

use tracing::{debug, warn};

use crate::crypto::{asymmetric, kdf};
use crate::error::EnvelopeError;
use crate::file::DecryptedFile;
use crate::format::envelope::PasswordEnvelope;
use crate::format::metadata;
use crate::format::stream::StreamDecryptor;
use crate::options::EngineOptions;
use crate::progress::Progress;

pub(crate) fn decrypt_with_password(
    input: &[u8],
    password: &str,
    options: &EngineOptions,
    progress: &mut Progress<'_>,
) -> Result<DecryptedFile, EnvelopeError> {
    options.validate()?;

    // ---------- 校验信封结构 ----------
    let envelope = PasswordEnvelope::parse(input).inspect_err(|e| {
        warn!(error = %e, "rejected password envelope");
    })?;

    // ---------- KDF 派生密钥 ----------
    let key = kdf::derive_key(password, &envelope.salt, &options.kdf)?;

    // ---------- Stream 解密 ----------
    let mut decryptor = StreamDecryptor::new(&key, &envelope.header, options.chunk_size)?;

    let mut bytes = Vec::with_capacity(envelope.chunks.len());
    let chunks = decryptor.decrypt(envelope.chunks, envelope.descriptor.size, &mut bytes, progress)?;

    debug!(
        chunks,
        size = bytes.len(),
        name = %envelope.descriptor.name,
        "password envelope opened"
    );

    progress.finish();
    Ok(DecryptedFile {
        descriptor: envelope.descriptor,
        bytes,
    })
}

pub(crate) fn decrypt_with_private_key(
    input: &[u8],
    key: &[u8],
    passphrase: Option<&str>,
    progress: &mut Progress<'_>,
) -> Result<DecryptedFile, EnvelopeError> {
    // ---------- 解锁私钥 ----------
    let identity = asymmetric::unlock_identity(key, passphrase)?;
    progress.report(20);

    // ---------- 解密整条消息 ----------
    let mut bytes = asymmetric::open(&identity, input, progress)?;

    // ---------- 拆出描述符 ----------
    let (descriptor, consumed) = metadata::decode(&bytes, 0).inspect_err(|e| {
        warn!(error = %e, "rejected public-key envelope payload");
    })?;
    bytes.drain(..consumed);

    debug!(size = bytes.len(), name = %descriptor.name, "public-key envelope opened");

    progress.finish();
    Ok(DecryptedFile { descriptor, bytes })
}
