//! 加解密方式
//!
//! 两种信任模型各自携带自己的参数，不共用松散的选项结构。
//! `Debug` 输出不包含任何秘密。

use std::fmt;

#[derive(Clone, Copy)]
pub enum EncryptMethod<'a> {
    /// 由密码派生密钥的分块流信封
    Password(&'a str),
    /// 加密给 age 接收方公钥（`age1...`）
    PublicKey(&'a str),
}

#[derive(Clone, Copy)]
pub enum DecryptMethod<'a> {
    Password(&'a str),
    /// `key` 可以是明文 identity，也可以是口令保护的 identity 文件
    PrivateKey {
        key: &'a [u8],
        passphrase: Option<&'a str>,
    },
}

impl fmt::Debug for EncryptMethod<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("Password([REDACTED])"),
            Self::PublicKey(recipient) => f.debug_tuple("PublicKey").field(recipient).finish(),
        }
    }
}

impl fmt::Debug for DecryptMethod<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("Password([REDACTED])"),
            Self::PrivateKey { passphrase, .. } => f
                .debug_struct("PrivateKey")
                .field("key", &"[REDACTED]")
                .field("passphrase", &passphrase.map(|_| "[REDACTED]"))
                .finish(),
        }
    }
}
