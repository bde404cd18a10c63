//! 加密流程实现
//!
//! 密码路径（严格顺序）：
//! 1. 编码描述符
//! 2. 生成 salt，并用 KDF 派生密钥
//! 3. 初始化 secretstream，得到流头
//! 4. 一次性分配整个信封，写入前缀
//! 5. 逐块加密，chunk 直接写入信封
//!
//! 公钥路径：描述符前缀 + 文件字节拼成一条消息，整体交给 age。

use std::io::Read;

use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::{asymmetric, kdf};
use crate::error::EnvelopeError;
use crate::file::PlainFile;
use crate::format::metadata::{self, FileDescriptor, LEN_PREFIX, MAX_METADATA_LEN};
use crate::format::{envelope, stream};
use crate::options::EngineOptions;
use crate::progress::Progress;

/// 写入侧的描述符检查：保证生成的信封能被读取侧接受
fn encode_descriptor(descriptor: &FileDescriptor) -> Result<Vec<u8>, EnvelopeError> {
    if descriptor.name.is_empty() {
        return Err(EnvelopeError::InvalidDescriptor("file name is empty"));
    }

    let encoded = metadata::encode(descriptor)?;
    if encoded.len() - LEN_PREFIX > MAX_METADATA_LEN {
        return Err(EnvelopeError::InvalidDescriptor("file metadata too large"));
    }

    Ok(encoded)
}

pub(crate) fn encrypt_with_password<R: Read>(
    source: PlainFile<R>,
    password: &str,
    options: &EngineOptions,
    progress: &mut Progress<'_>,
) -> Result<Vec<u8>, EnvelopeError> {
    options.validate()?;

    let PlainFile { descriptor, reader } = source;

    // ---------- 描述符 ----------
    let encoded = encode_descriptor(&descriptor)?;

    // ---------- salt + KDF ----------
    let salt = kdf::generate_salt();
    let key = kdf::derive_key(password, &salt, &options.kdf)?;

    // ---------- 初始化 stream ----------
    let (mut encryptor, header) = stream::StreamEncryptor::new(&key, options.chunk_size)?;

    // ---------- 一次性分配信封 ----------
    let stream_len = stream::sealed_len(descriptor.size, options.chunk_size)
        .ok_or(EnvelopeError::InvalidDescriptor("file too large to buffer"))?;
    let mut out = envelope::begin(&encoded, &salt, &header, stream_len)?;

    // ---------- 逐块加密 ----------
    let chunks = encryptor.encrypt(reader, descriptor.size, &mut out, progress)?;

    debug!(
        size = descriptor.size,
        chunks,
        envelope_len = out.len(),
        "password envelope sealed"
    );

    progress.finish();
    Ok(out)
}

pub(crate) fn encrypt_with_public_key<R: Read>(
    source: PlainFile<R>,
    recipient: &str,
    progress: &mut Progress<'_>,
) -> Result<Vec<u8>, EnvelopeError> {
    let recipient = asymmetric::parse_recipient(recipient)?;

    let PlainFile { descriptor, reader } = source;
    let encoded = encode_descriptor(&descriptor)?;

    let capacity = usize::try_from(descriptor.size)
        .ok()
        .and_then(|size| size.checked_add(encoded.len()))
        .ok_or(EnvelopeError::InvalidDescriptor("file too large to buffer"))?;

    let mut plaintext = Zeroizing::new(Vec::new());
    plaintext
        .try_reserve_exact(capacity)
        .map_err(|_| EnvelopeError::InvalidDescriptor("file too large to buffer"))?;
    plaintext.extend_from_slice(&encoded);

    let read = reader.take(descriptor.size).read_to_end(&mut plaintext)?;
    if read as u64 != descriptor.size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "source shorter than its declared size",
        )
        .into());
    }

    progress.report(50);

    let out = asymmetric::seal(&recipient, &plaintext)?;

    debug!(
        size = descriptor.size,
        envelope_len = out.len(),
        "public-key envelope sealed"
    );

    progress.finish();
    Ok(out)
}
