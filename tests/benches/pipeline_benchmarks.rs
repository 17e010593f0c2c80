//! # Data-Pipeline Benchmarks
//!
//! | Group | What is measured |
//! |-------|------------------|
//! | envelope-codec | Encrypt + binary encode, decode + decrypt |
//! | handler-resolution | Closest-lower handler method lookup |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dp_02_subscriber::{most_suitable_handler_method, TargetModel};
use shared_crypto::{EncryptOptions, Encryptor, PipelineSecret, SymmetricEncryptor};
use shared_types::{Envelope, EventType, PipelineVersion};
use std::time::Duration;

// ============================================================================
// Envelope codec
// ============================================================================

fn bench_envelope_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope-codec");
    group.measurement_time(Duration::from_secs(10));

    let encryptor = SymmetricEncryptor::with_secret(PipelineSecret::new("bench secret"))
        .expect("secret")
        .with_api_key("bench-key");
    let options = EncryptOptions::new("shop-v1-orders", "Order_1_1", EventType::Updated);

    for size in [64usize, 1024, 16 * 1024] {
        let plaintext = vec![b'x'; size];
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("encrypt_encode", size), &plaintext, |b, p| {
            b.iter(|| {
                let envelope = encryptor.encrypt(black_box(p), &options).expect("encrypt");
                black_box(envelope.encode().expect("encode"))
            })
        });

        let bytes = encryptor
            .encrypt(&plaintext, &options)
            .expect("encrypt")
            .encode()
            .expect("encode");
        group.bench_with_input(BenchmarkId::new("decode_decrypt", size), &bytes, |b, bytes| {
            b.iter(|| {
                let envelope = Envelope::decode(black_box(bytes)).expect("decode");
                black_box(encryptor.decrypt(&envelope).expect("decrypt"))
            })
        });
    }

    group.finish();
}

// ============================================================================
// Handler resolution
// ============================================================================

fn bench_handler_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("handler-resolution");

    for methods in [4u32, 32, 256] {
        let model = (0..methods).fold(TargetModel::new("orders"), |model, minor| {
            model.with_method(PipelineVersion::new(1, minor * 2), |_, _| Ok(None))
        });
        let received = PipelineVersion::new(1, methods);

        group.bench_with_input(BenchmarkId::new("closest_lower", methods), &model, |b, m| {
            b.iter(|| black_box(most_suitable_handler_method(black_box(received), m).is_some()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_envelope_codec, bench_handler_resolution);
criterion_main!(benches);
