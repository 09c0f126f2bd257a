//! Throughput of UnityCN block decryption
#![allow(clippy::expect_used, clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use ubundle_crypto::UnityCnCipher;

/// LZ4-shaped block: short literal runs separated by matches
fn sample_block(size: usize) -> Vec<u8> {
    let mut block = Vec::with_capacity(size);
    let mut n = 0u8;
    while block.len() + 12 < size {
        block.push(0x74);
        block.extend((0..7).map(|i| n.wrapping_add(i)));
        block.extend([0x08, 0x00]);
        n = n.wrapping_add(1);
    }
    block.push(0x00);
    block
}

fn bench_decrypt(c: &mut Criterion) {
    let cipher = UnityCnCipher::create(
        "00112233445566778899AABBCCDDEEFF",
        [
            0x7C, 0x2E, 0x05, 0xB9, 0x14, 0xD3, 0x6F, 0xA8, 0x31, 0x4B, 0x92, 0x07, 0xE5, 0x68,
            0x2D, 0xC0,
        ],
        [0x5A; 16],
        [0xC3; 16],
    )
    .expect("cipher creation");

    let mut group = c.benchmark_group("unity_cn_decrypt");
    for size in [16 * 1024, 128 * 1024] {
        let mut encrypted = sample_block(size);
        cipher.encrypt_block(&mut encrypted, 0).expect("encrypt");

        group.throughput(Throughput::Bytes(encrypted.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encrypted, |b, data| {
            b.iter(|| {
                let mut block = data.clone();
                cipher.decrypt_block(&mut block, 0).expect("decrypt");
                black_box(block)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decrypt);
criterion_main!(benches);
