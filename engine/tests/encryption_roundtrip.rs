use std::fs;

use filecrypt::format::metadata::LEN_PREFIX;
use filecrypt::format::stream::{CHUNK_OVERHEAD, HEADER_LEN};
use filecrypt::{
    DecryptMethod, EncryptMethod, EngineOptions, EnvelopeError, FileDescriptor, KdfParams, PlainFile,
};
use proptest::prelude::*;
use tempfile::tempdir;

const SALT_LEN: usize = 16;

// 测试使用较小的 chunk 与廉价 KDF，边界行为与默认参数一致
fn options(chunk_size: usize) -> EngineOptions {
    EngineOptions {
        chunk_size,
        kdf: KdfParams {
            mem_cost_kib: 64,
            time_cost: 1,
        },
    }
}

fn seal(data: &[u8], password: &str, opts: &EngineOptions) -> Vec<u8> {
    filecrypt::encrypt_with_options(
        PlainFile::from_bytes("report.pdf", "application/pdf", data),
        EncryptMethod::Password(password),
        opts,
        None,
    )
    .expect("encrypt")
}

fn open(envelope: &[u8], password: &str, opts: &EngineOptions) -> Result<filecrypt::DecryptedFile, EnvelopeError> {
    filecrypt::decrypt_with_options(envelope, DecryptMethod::Password(password), opts, None)
}

/// 信封中 chunk 流的起始偏移
fn stream_offset(envelope: &[u8]) -> usize {
    let metadata_len = u32::from_le_bytes(envelope[..4].try_into().unwrap()) as usize;
    LEN_PREFIX + metadata_len + SALT_LEN + HEADER_LEN
}

#[test]
fn encrypt_decrypt_roundtrip() {
    // 默认参数下加密后再解密能够恢复原始内容与描述符。
    let plaintext = b"filecrypt test payload";
    let envelope = filecrypt::encrypt(
        PlainFile::from_bytes("notes.txt", "text/plain", plaintext),
        EncryptMethod::Password("test-password"),
        None,
    )
    .expect("encrypt");

    let decrypted = filecrypt::decrypt(&envelope, DecryptMethod::Password("test-password"), None)
        .expect("decrypt");

    assert_eq!(decrypted.bytes, plaintext);
    assert_eq!(decrypted.file_name(), "notes.txt");
    assert_eq!(decrypted.content_type(), "text/plain");
    assert_eq!(decrypted.descriptor.size, plaintext.len() as u64);
}

#[test]
fn empty_file_roundtrip() {
    let opts = options(64);
    let envelope = seal(b"", "pw", &opts);

    assert_eq!(envelope.len(), stream_offset(&envelope) + CHUNK_OVERHEAD);

    let decrypted = open(&envelope, "pw", &opts).expect("decrypt");
    assert!(decrypted.bytes.is_empty());
    assert_eq!(decrypted.descriptor.size, 0);
}

#[test]
fn roundtrip_across_chunk_boundaries() {
    let chunk = 1024;
    let opts = options(chunk);

    for len in [chunk, chunk + 1, 3 * chunk, 3 * chunk - 1, 5 * chunk + 17] {
        let data: Vec<u8> = (0..len).map(|i| (i * 31 % 251) as u8).collect();
        let envelope = seal(&data, "boundary", &opts);

        let chunks = len.div_ceil(chunk);
        assert_eq!(
            envelope.len(),
            stream_offset(&envelope) + len + chunks * CHUNK_OVERHEAD,
            "len {len}"
        );

        let decrypted = open(&envelope, "boundary", &opts).expect("decrypt");
        assert_eq!(decrypted.bytes, data, "len {len}");
    }
}

#[test]
fn scaled_report_scenario() {
    // 150 MiB / 64 MiB 的比例缩小为 150 KiB / 64 KiB：两块 MESSAGE + 一块 FINAL
    let chunk = 64 * 1024;
    let opts = options(chunk);
    let data: Vec<u8> = (0..150 * 1024).map(|i| (i % 256) as u8).collect();

    let envelope = seal(&data, "correct-horse", &opts);
    let stream_len = envelope.len() - stream_offset(&envelope);
    assert_eq!(stream_len, data.len() + 3 * CHUNK_OVERHEAD);

    let decrypted = open(&envelope, "correct-horse", &opts).expect("decrypt");
    assert_eq!(decrypted.bytes, data);
    assert_eq!(decrypted.file_name(), "report.pdf");

    assert!(matches!(
        open(&envelope, "wrong-password", &opts),
        Err(EnvelopeError::DecryptionFailed)
    ));
}

#[test]
#[ignore = "allocates several hundred MiB"]
fn full_size_report_scenario() {
    let data = vec![0x5Au8; 150 * 1024 * 1024];
    let envelope = filecrypt::encrypt(
        PlainFile::from_bytes("report.pdf", "application/pdf", &data),
        EncryptMethod::Password("correct-horse"),
        None,
    )
    .expect("encrypt");

    let stream_len = envelope.len() - stream_offset(&envelope);
    assert_eq!(stream_len, data.len() + 3 * CHUNK_OVERHEAD);

    let decrypted =
        filecrypt::decrypt(&envelope, DecryptMethod::Password("correct-horse"), None).expect("decrypt");
    assert_eq!(decrypted.bytes.len(), data.len());
    assert_eq!(decrypted.file_name(), "report.pdf");
}

#[test]
fn decrypt_with_wrong_password_fails() {
    // 错误密码必须导致认证失败并返回错误。
    let opts = options(256);
    let envelope = seal(b"auth fail", "correct-password", &opts);

    assert!(matches!(
        open(&envelope, "wrong-password", &opts),
        Err(EnvelopeError::DecryptionFailed)
    ));
}

#[test]
fn tampered_chunk_bytes_are_detected() {
    let opts = options(128);
    let data = vec![7u8; 300];
    let envelope = seal(&data, "pw", &opts);
    let start = stream_offset(&envelope);

    for i in (start..envelope.len()).step_by(13).chain([start, envelope.len() - 1]) {
        let mut tampered = envelope.clone();
        tampered[i] ^= 0x80;
        assert!(
            matches!(open(&tampered, "pw", &opts), Err(EnvelopeError::DecryptionFailed)),
            "flip at {i} went unnoticed"
        );
    }
}

#[test]
fn tampered_salt_or_header_is_detected() {
    let opts = options(128);
    let envelope = seal(b"salted", "pw", &opts);
    let salt_at = stream_offset(&envelope) - HEADER_LEN - SALT_LEN;

    for i in [salt_at, salt_at + SALT_LEN - 1, salt_at + SALT_LEN, stream_offset(&envelope) - 1] {
        let mut tampered = envelope.clone();
        tampered[i] ^= 0x01;
        assert!(matches!(
            open(&tampered, "pw", &opts),
            Err(EnvelopeError::DecryptionFailed)
        ));
    }
}

#[test]
fn truncated_at_chunk_boundary_is_reported() {
    let chunk = 100;
    let opts = options(chunk);
    let envelope = seal(&[1u8; 250], "pw", &opts);

    let cut = stream_offset(&envelope) + 2 * (chunk + CHUNK_OVERHEAD);
    assert!(matches!(
        open(&envelope[..cut], "pw", &opts),
        Err(EnvelopeError::TruncatedEnvelope)
    ));

    let headers_only = stream_offset(&envelope);
    assert!(matches!(
        open(&envelope[..headers_only], "pw", &opts),
        Err(EnvelopeError::TruncatedEnvelope)
    ));
}

#[test]
fn trailing_padding_is_ignored() {
    let opts = options(100);
    let mut envelope = seal(b"padded", "pw", &opts);
    envelope.extend_from_slice(&[0u8; 64]);

    assert_eq!(open(&envelope, "pw", &opts).expect("decrypt").bytes, b"padded");
}

#[test]
fn trailing_padding_around_the_frame_edge() {
    let chunk = 64;
    let opts = options(chunk);

    // 满帧 FINAL，填充超过一整帧
    let full = vec![0x21u8; chunk];
    let mut envelope = seal(&full, "pw", &opts);
    envelope.extend(vec![0u8; chunk + CHUNK_OVERHEAD + 9]);
    assert_eq!(open(&envelope, "pw", &opts).expect("decrypt").bytes, full);

    // 一字节 FINAL，填充一字节
    let over = vec![0x42u8; chunk + 1];
    let mut envelope = seal(&over, "pw", &opts);
    envelope.push(0xFF);
    assert_eq!(open(&envelope, "pw", &opts).expect("decrypt").bytes, over);

    // 多块，FINAL 不足一帧
    let data = vec![0x07u8; 150];
    let mut envelope = seal(&data, "pw", &opts);
    envelope.extend_from_slice(b"PAD");
    assert_eq!(open(&envelope, "pw", &opts).expect("decrypt").bytes, data);
}

#[test]
fn unsatisfiable_declared_size_is_an_error() {
    let opts = options(1024);
    let source = PlainFile::new(FileDescriptor::new("big", "", 1 << 62), &b""[..]);

    let result = filecrypt::encrypt_with_options(source, EncryptMethod::Password("pw"), &opts, None);
    assert!(matches!(result, Err(EnvelopeError::InvalidDescriptor(_))));
}

#[test]
fn hostile_metadata_length_never_reaches_the_cipher() {
    let opts = options(100);
    let envelope = seal(b"x", "pw", &opts);

    for len in [0u32, 9, 10_001, envelope.len() as u32] {
        let mut crafted = envelope.clone();
        crafted[..4].copy_from_slice(&len.to_le_bytes());
        assert!(
            matches!(open(&crafted, "pw", &opts), Err(EnvelopeError::MalformedEnvelope(_))),
            "length {len}"
        );
    }
}

#[test]
fn decrypt_rejects_foreign_input() {
    // 非本工具生成的文件应在结构校验阶段被拒绝。
    let opts = options(100);
    for input in [&b"not an encrypted file"[..], &[0u8; 200][..], &b""[..]] {
        assert!(matches!(
            open(input, "password", &opts),
            Err(EnvelopeError::MalformedEnvelope(_))
        ));
    }
}

#[test]
fn progress_is_monotonic_and_completes() {
    let opts = options(1000);
    let data = vec![0u8; 4500];

    let mut seen = Vec::new();
    let mut sink = |p: u8| seen.push(p);
    let envelope = filecrypt::encrypt_with_options(
        PlainFile::from_bytes("p.bin", "", &data),
        EncryptMethod::Password("pw"),
        &opts,
        Some(&mut sink),
    )
    .expect("encrypt");

    assert_eq!(seen.len(), 5);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last(), Some(&100));

    let mut seen = Vec::new();
    let mut sink = |p: u8| seen.push(p);
    filecrypt::decrypt_with_options(&envelope, DecryptMethod::Password("pw"), &opts, Some(&mut sink))
        .expect("decrypt");

    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last(), Some(&100));
}

#[test]
fn mismatched_chunk_size_fails() {
    let envelope = seal(&[9u8; 500], "pw", &options(100));
    assert!(open(&envelope, "pw", &options(200)).is_err());
}

#[test]
fn zero_chunk_size_is_rejected() {
    let result = filecrypt::encrypt_with_options(
        PlainFile::from_bytes("a", "", b"data"),
        EncryptMethod::Password("pw"),
        &options(0),
        None,
    );
    assert!(matches!(result, Err(EnvelopeError::InvalidOptions(_))));
}

#[test]
fn encrypt_file_from_disk() {
    let temp_dir = tempdir().expect("create temp dir");
    let input_path = temp_dir.path().join("input.txt");
    fs::write(&input_path, b"from disk").expect("write plaintext");

    let opts = options(4);
    let source = PlainFile::open(&input_path, "text/plain").expect("open input");
    let envelope = filecrypt::encrypt_with_options(source, EncryptMethod::Password("pw"), &opts, None)
        .expect("encrypt");

    let decrypted = open(&envelope, "pw", &opts).expect("decrypt");
    assert_eq!(decrypted.bytes, b"from disk");
    assert_eq!(decrypted.file_name(), "input.txt");
}

#[test]
fn independent_operations_run_concurrently() {
    let opts = options(512);
    let handles: Vec<_> = (0..4u8)
        .map(|n| {
            std::thread::spawn(move || {
                let data = vec![n; 2000];
                let password = format!("pw-{n}");
                let envelope = seal(&data, &password, &opts);
                open(&envelope, &password, &opts).map(|d| d.bytes == data)
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().expect("thread").expect("decrypt"));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn any_payload_roundtrips(data in proptest::collection::vec(any::<u8>(), 0..2048), chunk in 1usize..600) {
        let opts = options(chunk);
        let envelope = seal(&data, "prop", &opts);
        let decrypted = open(&envelope, "prop", &opts).unwrap();
        prop_assert_eq!(decrypted.bytes, data);
    }
}
