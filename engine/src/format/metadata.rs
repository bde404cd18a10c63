//! 文件描述符（FileDescriptor）编解码
//!
//! 布局：`[len: u32 LE][UTF-8 JSON {"name", "type", "size"}]`
//!
//! 解码是“这是不是我们的文件”的唯一闸门：
//! - 长度必须位于 [MIN_METADATA_LEN, MAX_METADATA_LEN]
//! - 内容必须是 UTF-8 编码的 JSON 对象
//! - `name` 必须是非空字符串
//!
//! 任何一项失败都返回 `MalformedEnvelope`，此时尚未调用任何密码学原语。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EnvelopeError;
use crate::format::cursor::ByteCursor;

/// 长度前缀字节数
pub const LEN_PREFIX: usize = 4;

/// 读取侧下限，过滤垃圾输入
pub const MIN_METADATA_LEN: usize = 10;

/// 读取侧上限，防止恶意长度字段耗尽资源
pub const MAX_METADATA_LEN: usize = 10_000;

/// 原始文件的描述信息，随密文一同保存
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    #[serde(rename = "type", default)]
    pub content_type: String,
    #[serde(default)]
    pub size: u64,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            size,
        }
    }
}

/// 序列化描述符并加上长度前缀
///
/// 写入侧不做长度下限检查，下限只用于读取侧的合法性判断。
pub fn encode(descriptor: &FileDescriptor) -> Result<Vec<u8>, EnvelopeError> {
    let json = serde_json::to_vec(descriptor)
        .map_err(|_| EnvelopeError::InvalidDescriptor("metadata is not serializable"))?;
    let len = u32::try_from(json.len())
        .map_err(|_| EnvelopeError::InvalidDescriptor("file metadata too large"))?;

    let mut out = Vec::with_capacity(LEN_PREFIX + json.len());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&json);
    Ok(out)
}

/// 从 `offset` 处解析描述符，返回描述符与消耗的字节数（含长度前缀）
pub fn decode(bytes: &[u8], offset: usize) -> Result<(FileDescriptor, usize), EnvelopeError> {
    let mut cursor = ByteCursor::at(bytes, offset);
    let descriptor = read_descriptor(&mut cursor)?;
    Ok((descriptor, cursor.position() - offset))
}

/// 通过游标读取描述符，供信封解析器复用
pub(crate) fn read_descriptor(cursor: &mut ByteCursor<'_>) -> Result<FileDescriptor, EnvelopeError> {
    let len = cursor.read_u32_le()? as usize;

    if !(MIN_METADATA_LEN..=MAX_METADATA_LEN).contains(&len) {
        return Err(EnvelopeError::MalformedEnvelope(
            "metadata length out of bounds",
        ));
    }

    if len > cursor.remaining() {
        return Err(EnvelopeError::MalformedEnvelope(
            "metadata length exceeds input size",
        ));
    }

    let raw = cursor.read_bytes(len)?;

    let text = std::str::from_utf8(raw)
        .map_err(|_| EnvelopeError::MalformedEnvelope("metadata is not UTF-8"))?;

    let value: Value = serde_json::from_str(text)
        .map_err(|_| EnvelopeError::MalformedEnvelope("metadata is not JSON"))?;

    let record = value
        .as_object()
        .ok_or(EnvelopeError::MalformedEnvelope("metadata is not a record"))?;

    match record.get("name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => {}
        _ => {
            return Err(EnvelopeError::MalformedEnvelope(
                "metadata has no file name",
            ));
        }
    }

    serde_json::from_value(value)
        .map_err(|_| EnvelopeError::MalformedEnvelope("metadata fields have the wrong type"))
}
