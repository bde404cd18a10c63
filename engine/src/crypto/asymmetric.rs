//! 公钥信封（age X25519）
//!
//! 明文布局与密码信封共用描述符前缀：
//! `[metadataLength: u32 LE][metadata][file bytes]`，
//! 整个缓冲区作为一条消息交给 age 加密，nonce 与会话密钥由 age 自行管理。
//!
//! 私钥可以是明文 identity（`AGE-SECRET-KEY-1...`），也可以是用口令
//! 加密过的 identity 文件（二进制或 ASCII armor）。口令解锁失败返回
//! `KeyUnlockFailed`，与消息本身的 `DecryptionFailed` 区分开。

use std::io::{Read, Write};
use std::iter;

use age::armor::{ArmoredReader, ArmoredWriter, Format};
use age::x25519;
use secrecy::SecretString;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::EnvelopeError;
use crate::progress::Progress;

const IDENTITY_PREFIX: &str = "AGE-SECRET-KEY-";
const BINARY_MAGIC: &[u8] = b"age-encryption.org/";
const ARMOR_BEGIN: &[u8] = b"-----BEGIN AGE ENCRYPTED FILE-----";

/// 解析接收方公钥；允许 `#` 注释行与空行
pub fn parse_recipient(text: &str) -> Result<x25519::Recipient, EnvelopeError> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .ok_or(EnvelopeError::InvalidKey("no recipient found"))?
        .parse::<x25519::Recipient>()
        .map_err(|_| EnvelopeError::InvalidKey("not an age recipient"))
}

/// 从 identity 文本（可含注释）中解析私钥
pub fn parse_identity(text: &str) -> Result<x25519::Identity, EnvelopeError> {
    text.lines()
        .map(str::trim)
        .find(|line| line.starts_with(IDENTITY_PREFIX))
        .ok_or(EnvelopeError::InvalidKey("no age identity found"))?
        .parse::<x25519::Identity>()
        .map_err(|_| EnvelopeError::InvalidKey("malformed age identity"))
}

/// 私钥是否被口令保护
pub fn is_passphrase_protected(key: &[u8]) -> bool {
    let key = key.trim_ascii_start();
    key.starts_with(BINARY_MAGIC) || key.starts_with(ARMOR_BEGIN)
}

/// 得到可用于解密的私钥；受保护的私钥先用口令解锁
pub fn unlock_identity(
    key: &[u8],
    passphrase: Option<&str>,
) -> Result<x25519::Identity, EnvelopeError> {
    if !is_passphrase_protected(key) {
        let text = std::str::from_utf8(key)
            .map_err(|_| EnvelopeError::InvalidKey("private key is not text"))?;
        return parse_identity(text);
    }

    let passphrase = passphrase.ok_or(EnvelopeError::KeyUnlockFailed)?;

    let decryptor = age::Decryptor::new(ArmoredReader::new(key))
        .map_err(|_| EnvelopeError::InvalidKey("damaged encrypted private key"))?;

    if !decryptor.is_scrypt() {
        return Err(EnvelopeError::InvalidKey(
            "encrypted private key is not passphrase protected",
        ));
    }

    let unlock = age::scrypt::Identity::new(SecretString::from(passphrase.to_owned()));
    let mut reader = decryptor
        .decrypt(iter::once(&unlock as &dyn age::Identity))
        .map_err(|e| {
            debug!(error = %e, "private key passphrase rejected");
            EnvelopeError::KeyUnlockFailed
        })?;

    let mut text = Zeroizing::new(String::new());
    reader
        .read_to_string(&mut text)
        .map_err(|_| EnvelopeError::KeyUnlockFailed)?;

    parse_identity(&text)
}

/// 用口令保护 identity 文本，输出 ASCII armor
///
/// `work_factor` 为 scrypt 的 log2(N)。
pub fn protect_identity(
    identity_text: &str,
    passphrase: &str,
    work_factor: u8,
) -> Result<Vec<u8>, EnvelopeError> {
    let mut recipient = age::scrypt::Recipient::new(SecretString::from(passphrase.to_owned()));
    recipient.set_work_factor(work_factor);

    let encryptor = age::Encryptor::with_recipients(iter::once(&recipient as &dyn age::Recipient))
        .map_err(|_| EnvelopeError::EncryptionFailed)?;

    let mut sealed = Vec::new();
    let armored = ArmoredWriter::wrap_output(&mut sealed, Format::AsciiArmor)?;
    let mut writer = encryptor.wrap_output(armored)?;
    writer.write_all(identity_text.as_bytes())?;
    writer.finish()?.finish()?;

    Ok(sealed)
}

/// 将整条明文加密给接收方
pub fn seal(recipient: &x25519::Recipient, plaintext: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let encryptor = age::Encryptor::with_recipients(iter::once(recipient as &dyn age::Recipient))
        .map_err(|_| EnvelopeError::EncryptionFailed)?;

    let mut sealed = Vec::with_capacity(plaintext.len() + 512);
    let mut writer = encryptor.wrap_output(&mut sealed)?;
    writer.write_all(plaintext)?;
    writer.finish()?;

    Ok(sealed)
}

/// 解密整条消息，进度依次报告 40（读取头部）与 80（解密完成）
pub fn open(
    identity: &x25519::Identity,
    sealed: &[u8],
    progress: &mut Progress<'_>,
) -> Result<Vec<u8>, EnvelopeError> {
    let decryptor = age::Decryptor::new(ArmoredReader::new(sealed))
        .map_err(|_| EnvelopeError::MalformedEnvelope("not a public-key encrypted file"))?;

    progress.report(40);

    if decryptor.is_scrypt() {
        return Err(EnvelopeError::DecryptionFailed);
    }

    let mut reader = decryptor
        .decrypt(iter::once(identity as &dyn age::Identity))
        .map_err(|e| {
            debug!(error = %e, "age decryption rejected");
            EnvelopeError::DecryptionFailed
        })?;

    let mut plaintext = Vec::with_capacity(sealed.len());
    reader
        .read_to_end(&mut plaintext)
        .map_err(|_| EnvelopeError::DecryptionFailed)?;

    progress.report(80);

    Ok(plaintext)
}
