//! Sequencer Throughput Benchmarks
//!
//! Measures claim/publish cost on its own and burst hand-off from one or more
//! producers to a batch processor, across wait strategies.

use criterion::measurement::WallTime;
use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkGroup, BenchmarkId, Criterion, Throughput,
};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use seqgate::disruptor::{
    BatchEventProcessor, BusySpinWaitStrategy, DataProvider, DefaultEventFactory, EventHandler,
    EventProcessor, ProducerType, Result as SeqResult, RingBuffer, SequencerConfig,
    WaitStrategyConfig,
};

const BUFFER_SIZE: usize = 1024;
const BURST_SIZES: [u64; 3] = [1, 100, 1000];

#[derive(Debug, Default, Clone, Copy)]
struct BenchmarkEvent {
    value: i64,
}

/// Counts processed events
struct CountingSink {
    counter: Arc<AtomicI64>,
}

impl EventHandler<BenchmarkEvent> for CountingSink {
    fn on_event(&mut self, event: &BenchmarkEvent, _sequence: i64, _end_of_batch: bool) -> SeqResult<()> {
        black_box(event.value);
        self.counter.fetch_add(1, Ordering::Release);
        Ok(())
    }
}

/// Claim and publish with no consumer attached
fn claim_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("claim_publish");

    for producer_type in [ProducerType::Single, ProducerType::Multi] {
        let ring_buffer: RingBuffer<BenchmarkEvent> = SequencerConfig::new()
            .with_buffer_size(BUFFER_SIZE)
            .with_producer_type(producer_type)
            .with_wait_strategy(WaitStrategyConfig::BusySpin)
            .build_ring_buffer(DefaultEventFactory::new())
            .unwrap();

        group.throughput(Throughput::Elements(1));
        group.bench_function(BenchmarkId::new("publish_event", producer_type), |b| {
            b.iter(|| {
                ring_buffer
                    .publish_event(|event, seq| event.value = black_box(seq))
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn burst_to_processor(
    group: &mut BenchmarkGroup<WallTime>,
    name: &str,
    wait_strategy: WaitStrategyConfig,
    producer_type: ProducerType,
    burst_size: u64,
) {
    let ring_buffer: Arc<RingBuffer<BenchmarkEvent>> = Arc::new(
        SequencerConfig::new()
            .with_buffer_size(BUFFER_SIZE)
            .with_producer_type(producer_type)
            .with_wait_strategy(wait_strategy)
            .build_ring_buffer(DefaultEventFactory::new())
            .unwrap(),
    );

    let counter = Arc::new(AtomicI64::new(0));
    let processor = Arc::new(BatchEventProcessor::new(
        Arc::clone(&ring_buffer) as Arc<dyn DataProvider<BenchmarkEvent>>,
        ring_buffer.new_barrier(&[]),
        CountingSink {
            counter: Arc::clone(&counter),
        },
    ));
    ring_buffer.add_gating_sequences(&[processor.get_sequence()]);

    let worker = {
        let processor = Arc::clone(&processor);
        thread::spawn(move || processor.run())
    };

    group.throughput(Throughput::Elements(burst_size));
    group.bench_function(BenchmarkId::new(name, burst_size), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                let target = counter.load(Ordering::Acquire) + burst_size as i64;
                for i in 0..burst_size {
                    ring_buffer
                        .publish_event(|event, _| event.value = black_box(i as i64))
                        .unwrap();
                }
                while counter.load(Ordering::Acquire) < target {
                    std::hint::spin_loop();
                }
            }
            start.elapsed()
        })
    });

    processor.halt();
    worker.join().unwrap().unwrap();
}

fn spsc_bursts(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc_burst");
    for burst_size in BURST_SIZES {
        burst_to_processor(&mut group, "busy_spin", WaitStrategyConfig::BusySpin, ProducerType::Single, burst_size);
        burst_to_processor(
            &mut group,
            "yielding",
            WaitStrategyConfig::Yielding { spin_tries: 100 },
            ProducerType::Single,
            burst_size,
        );
        burst_to_processor(&mut group, "blocking", WaitStrategyConfig::Blocking, ProducerType::Single, burst_size);
    }
    group.finish();
}

/// Two producer threads racing on the multi-producer claim counter
fn mpsc_bursts(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpsc_burst");

    for burst_size in BURST_SIZES {
        let ring_buffer = Arc::new(
            RingBuffer::create_multi_producer(
                DefaultEventFactory::<BenchmarkEvent>::new(),
                BUFFER_SIZE,
                Arc::new(BusySpinWaitStrategy::new()),
            )
            .unwrap(),
        );
        let counter = Arc::new(AtomicI64::new(0));
        let processor = Arc::new(BatchEventProcessor::new(
            Arc::clone(&ring_buffer) as Arc<dyn DataProvider<BenchmarkEvent>>,
            ring_buffer.new_barrier(&[]),
            CountingSink {
                counter: Arc::clone(&counter),
            },
        ));
        ring_buffer.add_gating_sequences(&[processor.get_sequence()]);
        let worker = {
            let processor = Arc::clone(&processor);
            thread::spawn(move || processor.run())
        };

        group.throughput(Throughput::Elements(burst_size * 2));
        group.bench_function(BenchmarkId::new("two_producers", burst_size), |b| {
            b.iter_custom(|iters| {
                let start = Instant::now();
                for _ in 0..iters {
                    let target = counter.load(Ordering::Acquire) + 2 * burst_size as i64;
                    thread::scope(|scope| {
                        for _ in 0..2 {
                            scope.spawn(|| {
                                for i in 0..burst_size {
                                    ring_buffer
                                        .publish_event(|event, _| event.value = i as i64)
                                        .unwrap();
                                }
                            });
                        }
                    });
                    while counter.load(Ordering::Acquire) < target {
                        std::hint::spin_loop();
                    }
                }
                start.elapsed()
            })
        });

        processor.halt();
        worker.join().unwrap().unwrap();
    }

    group.finish();
}

criterion_group!(benches, claim_publish, spsc_bursts, mpsc_bursts);
criterion_main!(benches);
