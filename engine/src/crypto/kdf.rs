//! 密钥派生函数（KDF）模块
//!
//! 通过 Argon2id 将用户密码派生为 32 字节对称密钥，供 secretstream 使用。
//!
//! 设计要点：
//! - 每次加密使用独立的 16 字节随机 salt
//! - 默认参数与 libsodium `crypto_pwhash` 的 INTERACTIVE 档位一致
//!   （64 MiB 内存、2 次迭代、并行度 1），与原有工具生成的文件互通
//! - 派生出的密钥使用 `Zeroizing` 包装，离开作用域即清零

use std::sync::OnceLock;

use argon2::{Algorithm, Argon2, Params, Version};
use rand::{RngCore, rngs::OsRng};
use tracing::warn;
use zeroize::Zeroizing;

use crate::error::EnvelopeError;

/// 派生密钥长度（256-bit）
pub const KEY_LEN: usize = 32;

/// salt 长度（字节）
pub const SALT_LEN: usize = 16;

/// Argon2id 成本参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// 内存成本（KiB）
    pub mem_cost_kib: u32,
    /// 迭代次数
    pub time_cost: u32,
}

impl KdfParams {
    /// libsodium INTERACTIVE 档位
    pub const INTERACTIVE: Self = Self {
        mem_cost_kib: 64 * 1024,
        time_cost: 2,
    };
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::INTERACTIVE
    }
}

/// 生成新的随机 salt
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// 根据密码和 salt 派生对称密钥
///
/// 相同 (password, salt, params) 总是得到相同密钥。
/// 参数非法或内存不足时返回 `KeyDerivationFailed`。
pub fn derive_key(
    password: &str,
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>, EnvelopeError> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);

    let hashed = if *params == KdfParams::INTERACTIVE {
        interactive_context()?.hash_password_into(password.as_bytes(), salt, &mut key[..])
    } else {
        build_context(params)
            .map_err(|e| {
                warn!(error = %e, "rejected Argon2id parameters");
                EnvelopeError::KeyDerivationFailed
            })?
            .hash_password_into(password.as_bytes(), salt, &mut key[..])
    };

    hashed.map_err(|e| {
        warn!(error = %e, "Argon2id key derivation failed");
        EnvelopeError::KeyDerivationFailed
    })?;

    Ok(key)
}

/// 进程内只构建一次的默认 Argon2 上下文
fn interactive_context() -> Result<&'static Argon2<'static>, EnvelopeError> {
    static CONTEXT: OnceLock<Result<Argon2<'static>, argon2::Error>> = OnceLock::new();

    CONTEXT
        .get_or_init(|| build_context(&KdfParams::INTERACTIVE))
        .as_ref()
        .map_err(|_| EnvelopeError::KeyDerivationFailed)
}

fn build_context(params: &KdfParams) -> Result<Argon2<'static>, argon2::Error> {
    let params = Params::new(params.mem_cost_kib, params.time_cost, 1, Some(KEY_LEN))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}
