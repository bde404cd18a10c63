//! 密码信封的字节布局
//!
//! ```text
//! offset 0      : u32   metadataLength (10..=10000, LE)
//! offset 4      : bytes metadata
//! offset 4+L    : bytes salt[16]
//! offset 20+L   : bytes streamHeader[24]
//! offset 44+L   : bytes chunk stream
//! ```
//!
//! 信封是纯值：加密时构建一次，解密时解析一次。
//! 格式没有魔数和版本号，描述符解码即为格式识别。
//! 解析阶段的任何越界都返回 `MalformedEnvelope`，不会触达密码学原语。

use crate::crypto::kdf::SALT_LEN;
use crate::error::EnvelopeError;
use crate::format::cursor::ByteCursor;
use crate::format::metadata::{self, FileDescriptor, LEN_PREFIX, MIN_METADATA_LEN};
use crate::format::stream::HEADER_LEN;

/// 最小合法信封长度
pub const MIN_ENVELOPE_LEN: usize = LEN_PREFIX + MIN_METADATA_LEN + SALT_LEN + HEADER_LEN;

/// 解析后的密码信封，`chunks` 借用自原始输入
#[derive(Debug)]
pub struct PasswordEnvelope<'a> {
    pub descriptor: FileDescriptor,
    pub salt: [u8; SALT_LEN],
    pub header: [u8; HEADER_LEN],
    pub chunks: &'a [u8],
}

impl<'a> PasswordEnvelope<'a> {
    /// 校验并切分信封
    pub fn parse(bytes: &'a [u8]) -> Result<Self, EnvelopeError> {
        if bytes.len() < MIN_ENVELOPE_LEN {
            return Err(EnvelopeError::MalformedEnvelope("input too small"));
        }

        let mut cursor = ByteCursor::new(bytes);
        let descriptor = metadata::read_descriptor(&mut cursor)?;
        let salt = cursor.read_array::<SALT_LEN>()?;
        let header = cursor.read_array::<HEADER_LEN>()?;
        let chunks = cursor.rest();

        Ok(Self {
            descriptor,
            salt,
            header,
            chunks,
        })
    }
}

/// 写入信封前缀（长度前缀元数据、salt、流头），并为密文流预留空间
///
/// `encoded_metadata` 为 `metadata::encode` 的输出，`stream_len` 为
/// `stream::sealed_len` 的结果。返回的缓冲区容量恰好等于整个信封长度，
/// 之后追加 chunk 不会再触发扩容。
pub fn begin(
    encoded_metadata: &[u8],
    salt: &[u8; SALT_LEN],
    header: &[u8; HEADER_LEN],
    stream_len: u64,
) -> Result<Vec<u8>, EnvelopeError> {
    let total = u64::try_from(encoded_metadata.len() + SALT_LEN + HEADER_LEN)
        .ok()
        .and_then(|prefix| prefix.checked_add(stream_len))
        .and_then(|total| usize::try_from(total).ok())
        .ok_or(EnvelopeError::InvalidDescriptor("file too large to buffer"))?;

    let mut out = Vec::new();
    out.try_reserve_exact(total)
        .map_err(|_| EnvelopeError::InvalidDescriptor("file too large to buffer"))?;
    out.extend_from_slice(encoded_metadata);
    out.extend_from_slice(salt);
    out.extend_from_slice(header);
    Ok(out)
}
