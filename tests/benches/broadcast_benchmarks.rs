//! # FleetLine Benchmarks
//!
//! | Component | Operation | Target |
//! |-----------|-----------|--------|
//! | Broadcaster | `on_sample` fan-out to N subscribers | < 50µs at N = 100 |
//! | LocationSample | parse + validate one frame | < 2µs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fl_02_location_gateway::ws::SubscriberHandle;
use fl_02_location_gateway::{Broadcaster, ConnectionRegistry, GatewayMetrics, LocationCache};
use shared_types::{ConnectionId, LocationSample, SubjectId};
use std::sync::Arc;

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fl-02-broadcast");

    for subscribers in [1usize, 10, 100, 1000] {
        let broadcaster = Broadcaster::new(
            Arc::new(ConnectionRegistry::new()),
            Arc::new(LocationCache::new()),
            Arc::new(GatewayMetrics::new()),
        );
        let subject = SubjectId::new("D1").unwrap();

        // Receivers are drained after every iteration so no queue fills up.
        let mut receivers: Vec<_> = (0..subscribers)
            .map(|_| {
                let (handle, rx) = SubscriberHandle::new(ConnectionId::new(), 16);
                broadcaster.registry().register_subscriber(subject.clone(), handle);
                rx
            })
            .collect();

        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::new("on_sample", subscribers),
            &subscribers,
            |b, _| {
                b.iter(|| {
                    let report =
                        broadcaster.on_sample(&subject, black_box(LocationSample::new(10.0, 20.0)));
                    for rx in receivers.iter_mut() {
                        while rx.try_recv().is_ok() {}
                    }
                    report
                })
            },
        );
    }

    group.finish();
}

fn bench_frame_parse(c: &mut Criterion) {
    let frame = r#"{"Latitude":47.6062,"Longitude":-122.3321}"#;
    c.bench_function("location_sample_from_frame", |b| {
        b.iter(|| LocationSample::from_frame(black_box(frame)))
    });
}

criterion_group!(benches, bench_fan_out, bench_frame_parse);
criterion_main!(benches);
