//! 凭据存储
//!
//! API 密钥以认证加密（AES-256-GCM）的形式落盘，随机 nonce 与密文
//! 一起编码，保证可确定性解密。加密密钥保存在独立的密钥文件中，
//! 首次使用时自动生成。
//!
//! 不变式：明文密钥只存在于进程内存中，任何代码路径（包括日志）
//! 都不会把明文写入持久存储。

use std::fs;
use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::CredentialError;

/// GCM 标准 nonce 长度
const NONCE_LEN: usize = 12;

/// 凭据存储
///
/// 持有密钥文件路径；加解密每次从文件加载密钥，密钥文件不存在时
/// 生成新密钥并写入。
pub struct CredentialStore {
    key_path: PathBuf,
}

impl CredentialStore {
    pub fn new(key_path: impl Into<PathBuf>) -> Self {
        Self {
            key_path: key_path.into(),
        }
    }

    /// 加密文本，返回 base64(nonce ‖ 密文)
    ///
    /// 空文本原样返回空字符串
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CredentialError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        let key = self.load_or_create_key()?;
        let cipher = Aes256Gcm::new(&key);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CredentialError::Encryption)?;

        let mut stored = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        stored.extend_from_slice(nonce.as_slice());
        stored.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(stored))
    }

    /// 解密存储形式，返回明文
    ///
    /// 密文损坏或密钥不匹配时返回 `Decryption`；空输入返回空字符串
    pub fn decrypt(&self, stored: &str) -> Result<String, CredentialError> {
        if stored.is_empty() {
            return Ok(String::new());
        }
        let raw = BASE64
            .decode(stored)
            .map_err(|_| CredentialError::Decryption)?;
        if raw.len() <= NONCE_LEN {
            return Err(CredentialError::Decryption);
        }
        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);

        let key = self.load_or_create_key()?;
        let cipher = Aes256Gcm::new(&key);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CredentialError::Decryption)?;
        String::from_utf8(plaintext).map_err(|_| CredentialError::Decryption)
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    fn load_or_create_key(&self) -> Result<Key<Aes256Gcm>, CredentialError> {
        if self.key_path.exists() {
            let encoded = fs::read_to_string(&self.key_path)?;
            let bytes = BASE64
                .decode(encoded.trim())
                .map_err(|_| CredentialError::Decryption)?;
            if bytes.len() != 32 {
                return Err(CredentialError::Decryption);
            }
            Ok(*Key::<Aes256Gcm>::from_slice(&bytes))
        } else {
            let key = Aes256Gcm::generate_key(OsRng);
            fs::write(&self.key_path, BASE64.encode(key.as_slice()))?;
            Ok(key)
        }
    }
}
