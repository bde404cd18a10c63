//! 加密输入与解密输出

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use crate::format::metadata::FileDescriptor;

/// 待加密的文件：描述符 + 恰好提供 `descriptor.size` 字节的读取器
pub struct PlainFile<R> {
    pub descriptor: FileDescriptor,
    pub reader: R,
}

impl<R> PlainFile<R> {
    pub fn new(descriptor: FileDescriptor, reader: R) -> Self {
        Self { descriptor, reader }
    }
}

impl PlainFile<BufReader<File>> {
    /// 打开磁盘文件，文件名与大小取自文件系统
    pub fn open(path: &Path, content_type: impl Into<String>) -> io::Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "input path has no file name"))?;

        let file = File::open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            descriptor: FileDescriptor::new(name, content_type, size),
            reader: BufReader::new(file),
        })
    }
}

impl<'a> PlainFile<&'a [u8]> {
    pub fn from_bytes(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: &'a [u8],
    ) -> Self {
        Self {
            descriptor: FileDescriptor::new(name, content_type, bytes.len() as u64),
            reader: bytes,
        }
    }
}

/// 解密结果：原始字节与其描述符
#[derive(Clone, PartialEq, Eq)]
pub struct DecryptedFile {
    pub descriptor: FileDescriptor,
    pub bytes: Vec<u8>,
}

impl DecryptedFile {
    pub fn file_name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn content_type(&self) -> &str {
        &self.descriptor.content_type
    }

    pub fn into_parts(self) -> (Vec<u8>, String) {
        (self.bytes, self.descriptor.name)
    }
}

impl fmt::Debug for DecryptedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptedFile")
            .field("descriptor", &self.descriptor)
            .field("len", &self.bytes.len())
            .finish()
    }
}
