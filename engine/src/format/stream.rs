//! 分块认证流（secretstream）
//!
//! 本模块负责密码路径中“数据流（Stream）”部分的加密与解密。
//!
//! 职责范围：
//! - 将任意大小的输入按固定大小切分为 chunk
//! - 通过 XChaCha20-Poly1305 secretstream 的链式状态逐块加密，
//!   第 i 块的认证依赖 0..i-1 块的历史，块不能被重排、丢弃或重复
//! - 最后一块（且仅最后一块）带 FINAL 标签，其余为 MESSAGE
//! - 解密时遇到 FINAL 即停止；输入耗尽仍未见 FINAL 视为截断
//!
//! 约束：
//! - 链式状态决定了处理只能串行进行
//! - 除输出缓冲外，工作内存只有一个 chunk

use std::io::Read;

use orion::hazardous::aead::streaming::{ABYTES, StreamTag, StreamXChaCha20Poly1305};
use orion::hazardous::stream::chacha20::SecretKey;
use orion::hazardous::stream::xchacha20::Nonce;
use rand::{RngCore, rngs::OsRng};
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::kdf::KEY_LEN;
use crate::error::EnvelopeError;
use crate::progress::{Progress, percent};

/// 流头（secretstream 的 nonce 材料）长度
pub const HEADER_LEN: usize = 24;

/// 每个 chunk 附加的认证开销：16 字节 MAC + 1 字节标签
pub const CHUNK_OVERHEAD: usize = ABYTES;

/// 默认明文 chunk 大小：64 MiB
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// 明文长度为 `plain_len` 时密文流的总长度
///
/// 空输入同样产生一个（空的）FINAL chunk。
pub fn sealed_len(plain_len: u64, chunk_size: usize) -> Option<u64> {
    let chunk_size = u64::try_from(chunk_size).ok().filter(|c| *c > 0)?;
    let chunks = plain_len.div_ceil(chunk_size).max(1);
    chunks
        .checked_mul(CHUNK_OVERHEAD as u64)?
        .checked_add(plain_len)
}

fn stream_state(key: &[u8; KEY_LEN], header: &[u8; HEADER_LEN]) -> Option<StreamXChaCha20Poly1305> {
    let secret = SecretKey::from_slice(key).ok()?;
    let nonce = Nonce::from_slice(header).ok()?;
    Some(StreamXChaCha20Poly1305::new(&secret, &nonce))
}

/// 流式加密器
pub struct StreamEncryptor {
    state: StreamXChaCha20Poly1305,
    chunk_size: usize,
}

impl StreamEncryptor {
    /// 以全新的随机流头初始化加密状态，返回加密器与流头
    pub fn new(
        key: &[u8; KEY_LEN],
        chunk_size: usize,
    ) -> Result<(Self, [u8; HEADER_LEN]), EnvelopeError> {
        if chunk_size == 0 {
            return Err(EnvelopeError::InvalidOptions("chunk size must be positive"));
        }

        let mut header = [0u8; HEADER_LEN];
        OsRng.fill_bytes(&mut header);

        let state = stream_state(key, &header).ok_or(EnvelopeError::EncryptionFailed)?;

        Ok((Self { state, chunk_size }, header))
    }

    /// 从 reader 读取恰好 `total` 字节明文，加密后追加到 `out`
    ///
    /// `out` 应预留 `sealed_len(total, chunk_size)` 的空间，
    /// 每个 chunk 直接封装进该缓冲区，不再产生中间分配。
    /// 返回写出的 chunk 数。
    pub fn encrypt<R: Read>(
        &mut self,
        mut reader: R,
        total: u64,
        out: &mut Vec<u8>,
        progress: &mut Progress<'_>,
    ) -> Result<usize, EnvelopeError> {
        let chunk = self.chunk_size as u64;
        let mut buffer = Zeroizing::new(vec![0u8; total.min(chunk) as usize]);
        let mut offset = 0u64;
        let mut chunks = 0usize;

        loop {
            let is_final = offset.saturating_add(chunk) >= total;
            let len = (total - offset).min(chunk) as usize;

            let plaintext = &mut buffer[..len];
            reader.read_exact(plaintext)?;

            let tag = if is_final {
                StreamTag::Finish
            } else {
                StreamTag::Message
            };

            let start = out.len();
            out.resize(start + len + CHUNK_OVERHEAD, 0);
            self.state
                .seal_chunk(plaintext, None, &mut out[start..], &tag)
                .map_err(|_| EnvelopeError::EncryptionFailed)?;

            offset += len as u64;
            chunks += 1;
            progress.report(percent(offset, total));

            if is_final {
                break;
            }
        }

        Ok(chunks)
    }
}

/// 流式解密器
pub struct StreamDecryptor {
    state: StreamXChaCha20Poly1305,
    chunk_size: usize,
}

impl StreamDecryptor {
    /// 根据密钥与信封中的流头重建解密状态
    pub fn new(
        key: &[u8; KEY_LEN],
        header: &[u8; HEADER_LEN],
        chunk_size: usize,
    ) -> Result<Self, EnvelopeError> {
        if chunk_size == 0 {
            return Err(EnvelopeError::InvalidOptions("chunk size must be positive"));
        }

        let state = stream_state(key, header).ok_or(EnvelopeError::DecryptionFailed)?;

        Ok(Self { state, chunk_size })
    }

    /// 逐块解密并校验 `stream`，明文追加到 `out`
    ///
    /// `plain_len` 为描述符中记录的明文大小，用来确定最后一块的边界；
    /// 超出 `sealed_len(plain_len)` 的字节不参与分帧。
    ///
    /// - 任一 chunk 认证失败：`DecryptionFailed`
    /// - 遇到 FINAL：停止，之后的字节被忽略
    /// - 输入耗尽仍未见 FINAL：`TruncatedEnvelope`
    pub fn decrypt(
        &mut self,
        stream: &[u8],
        plain_len: u64,
        out: &mut Vec<u8>,
        progress: &mut Progress<'_>,
    ) -> Result<usize, EnvelopeError> {
        let frame = self
            .chunk_size
            .checked_add(CHUNK_OVERHEAD)
            .ok_or(EnvelopeError::InvalidOptions("chunk size too large"))?;

        let bounded = match sealed_len(plain_len, self.chunk_size)
            .and_then(|len| usize::try_from(len).ok())
        {
            Some(expected) if expected < stream.len() => {
                debug!(trailing = stream.len() - expected, "ignoring bytes after final chunk");
                &stream[..expected]
            }
            _ => stream,
        };

        let mut consumed = 0usize;

        for (index, sealed) in bounded.chunks(frame).enumerate() {
            if sealed.len() < CHUNK_OVERHEAD {
                debug!(index, len = sealed.len(), "chunk shorter than its authentication tag");
                return Err(EnvelopeError::TruncatedEnvelope);
            }

            let start = out.len();
            out.resize(start + sealed.len() - CHUNK_OVERHEAD, 0);

            let tag = self
                .state
                .open_chunk(sealed, None, &mut out[start..])
                .map_err(|_| {
                    debug!(index, "chunk failed authentication");
                    EnvelopeError::DecryptionFailed
                })?;

            consumed += sealed.len();

            if matches!(tag, StreamTag::Finish) {
                if consumed < bounded.len() {
                    debug!(trailing = bounded.len() - consumed, "ignoring bytes after final chunk");
                }
                return Ok(index + 1);
            }

            progress.report(percent(consumed as u64, bounded.len() as u64));
        }

        Err(EnvelopeError::TruncatedEnvelope)
    }
}
