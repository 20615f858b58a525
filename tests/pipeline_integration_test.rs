//! Pipeline Integration Tests
//!
//! End-to-end behaviour of producers, barriers and processors wired together
//! through the public API only.

use seqgate::disruptor::{
    BatchEventProcessor, BlockingWaitStrategy, DataProvider, DefaultEventFactory, DisruptorError,
    EventHandler, EventProcessor, ExceptionHandler, IgnoreExceptionHandler, ProducerType, Result,
    RingBuffer, Sequence, SequenceBarrier, SequencerConfig, WaitStrategyConfig, WorkHandler,
    WorkProcessor, YieldingWaitStrategy,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Order {
    id: i64,
    amount: i64,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn wait_until(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(1));
    }
}

fn single_producer(size: usize) -> Arc<RingBuffer<Order>> {
    Arc::new(
        RingBuffer::create_single_producer(
            DefaultEventFactory::new(),
            size,
            Arc::new(BlockingWaitStrategy::new()),
        )
        .unwrap(),
    )
}

/// Records every delivery as (sequence, end_of_batch)
struct Recorder {
    deliveries: Arc<Mutex<Vec<(i64, bool)>>>,
    fail_at: Option<i64>,
}

impl EventHandler<Order> for Recorder {
    fn on_event(&mut self, _event: &Order, sequence: i64, end_of_batch: bool) -> Result<()> {
        if Some(sequence) == self.fail_at {
            return Err(DisruptorError::handler(format!("rejected order at {sequence}")));
        }
        self.deliveries.lock().unwrap().push((sequence, end_of_batch));
        Ok(())
    }
}

#[test]
fn test_consumer_drains_published_batch() {
    init_tracing();
    let ring_buffer = single_producer(4);
    let barrier = ring_buffer.new_barrier(&[]);

    let deliveries = Arc::new(Mutex::new(Vec::new()));
    let processor = Arc::new(BatchEventProcessor::new(
        Arc::clone(&ring_buffer) as Arc<dyn DataProvider<Order>>,
        Arc::clone(&barrier) as Arc<dyn SequenceBarrier>,
        Recorder {
            deliveries: Arc::clone(&deliveries),
            fail_at: None,
        },
    ));
    ring_buffer.add_gating_sequences(&[processor.get_sequence()]);
    assert_eq!(processor.get_sequence().get(), -1);

    for id in 0..3 {
        ring_buffer.publish_event(|order, _| order.id = id).unwrap();
    }
    assert_eq!(barrier.wait_for(0).unwrap(), 2);

    let worker = {
        let processor = Arc::clone(&processor);
        thread::spawn(move || processor.run())
    };
    wait_until(|| processor.get_sequence().get() == 2);
    processor.halt();
    worker.join().unwrap().unwrap();

    assert_eq!(
        *deliveries.lock().unwrap(),
        vec![(0, false), (1, false), (2, true)]
    );
}

#[test]
fn test_try_publish_fails_when_full() {
    init_tracing();
    let ring_buffer = single_producer(4);
    let consumer = Arc::new(Sequence::default());
    ring_buffer.add_gating_sequences(&[Arc::clone(&consumer)]);

    for id in 0..4 {
        ring_buffer.publish_event(|order, _| order.id = id).unwrap();
    }

    let result = ring_buffer.try_next();
    assert!(matches!(result, Err(DisruptorError::InsufficientCapacity)));
    assert_eq!(ring_buffer.get_cursor(), 3);
}

#[test]
fn test_swallowed_failure_resumes_after_failing_slot() {
    init_tracing();
    let ring_buffer = single_producer(16);
    let deliveries = Arc::new(Mutex::new(Vec::new()));

    let processor = Arc::new(
        BatchEventProcessor::new(
            Arc::clone(&ring_buffer) as Arc<dyn DataProvider<Order>>,
            ring_buffer.new_barrier(&[]),
            Recorder {
                deliveries: Arc::clone(&deliveries),
                fail_at: Some(5),
            },
        )
        .with_exception_handler(IgnoreExceptionHandler::<Order>::new()),
    );
    ring_buffer.add_gating_sequences(&[processor.get_sequence()]);

    let worker = {
        let processor = Arc::clone(&processor);
        thread::spawn(move || processor.run())
    };

    for id in 0..6 {
        ring_buffer.publish_event(|order, _| order.id = id).unwrap();
    }
    wait_until(|| processor.get_sequence().get() == 5);

    ring_buffer.publish_event(|order, _| order.id = 6).unwrap();
    wait_until(|| processor.get_sequence().get() == 6);

    processor.halt();
    worker.join().unwrap().unwrap();

    let sequences: Vec<i64> = deliveries.lock().unwrap().iter().map(|(s, _)| *s).collect();
    assert_eq!(sequences, vec![0, 1, 2, 3, 4, 6]);
}

struct Collector {
    ids: Arc<Mutex<Vec<i64>>>,
}

impl WorkHandler<Order> for Collector {
    fn on_event(&mut self, event: &Order) -> Result<()> {
        self.ids.lock().unwrap().push(event.id);
        Ok(())
    }
}

#[test]
fn test_work_processors_share_events() {
    init_tracing();
    let ring_buffer: Arc<RingBuffer<Order>> = Arc::new(
        SequencerConfig::new()
            .with_buffer_size(16)
            .with_producer_type(ProducerType::Multi)
            .build_ring_buffer(DefaultEventFactory::new())
            .unwrap(),
    );
    let work_sequence = Arc::new(Sequence::default());
    let exception_handler: Arc<dyn ExceptionHandler<Order>> =
        Arc::new(IgnoreExceptionHandler::<Order>::new());

    let buckets: Vec<Arc<Mutex<Vec<i64>>>> = (0..2).map(|_| Arc::default()).collect();
    let workers: Vec<_> = buckets
        .iter()
        .map(|ids| {
            Arc::new(WorkProcessor::new(
                Arc::clone(&ring_buffer) as Arc<dyn DataProvider<Order>>,
                ring_buffer.new_barrier(&[]),
                Collector {
                    ids: Arc::clone(ids),
                },
                Arc::clone(&exception_handler),
                Arc::clone(&work_sequence),
            ))
        })
        .collect();

    let mut gating: Vec<Arc<Sequence>> = workers.iter().map(|w| w.get_sequence()).collect();
    gating.push(Arc::clone(&work_sequence));
    ring_buffer.add_gating_sequences(&gating);

    let threads: Vec<_> = workers
        .iter()
        .map(|w| {
            let w = Arc::clone(w);
            thread::spawn(move || w.run())
        })
        .collect();

    for id in 0..10 {
        ring_buffer.publish_event(|order, _| order.id = id).unwrap();
    }

    wait_until(|| buckets.iter().map(|b| b.lock().unwrap().len()).sum::<usize>() == 10);
    for w in &workers {
        w.halt();
    }
    for t in threads {
        t.join().unwrap().unwrap();
    }

    let first: BTreeSet<i64> = buckets[0].lock().unwrap().iter().copied().collect();
    let second: BTreeSet<i64> = buckets[1].lock().unwrap().iter().copied().collect();
    assert!(first.is_disjoint(&second));
    let all: BTreeSet<i64> = first.union(&second).copied().collect();
    assert_eq!(all, (0..10).collect());
}

/// One stage of a two-stage pipeline, recording any ordering violation
struct Stage {
    name: &'static str,
    last_seen: Arc<AtomicI64>,
    upstream: Option<Arc<AtomicI64>>,
    violations: Arc<Mutex<Vec<String>>>,
}

impl EventHandler<Order> for Stage {
    fn on_event(&mut self, event: &Order, sequence: i64, _end_of_batch: bool) -> Result<()> {
        if let Some(upstream) = &self.upstream {
            if upstream.load(Ordering::SeqCst) < sequence {
                self.violations
                    .lock()
                    .unwrap()
                    .push(format!("{} ran ahead at {sequence}", self.name));
            }
        }
        if event.amount != event.id * 10 {
            self.violations
                .lock()
                .unwrap()
                .push(format!("{} saw torn slot at {sequence}", self.name));
        }
        if self.last_seen.swap(sequence, Ordering::SeqCst) >= sequence {
            self.violations
                .lock()
                .unwrap()
                .push(format!("{} went backwards at {sequence}", self.name));
        }
        Ok(())
    }
}

#[test]
fn test_dependent_stage_never_overtakes_upstream() {
    init_tracing();
    let ring_buffer: Arc<RingBuffer<Order>> = Arc::new(
        RingBuffer::create_single_producer(
            DefaultEventFactory::new(),
            64,
            Arc::new(YieldingWaitStrategy::new()),
        )
        .unwrap(),
    );
    let violations = Arc::new(Mutex::new(Vec::new()));
    let first_seen = Arc::new(AtomicI64::new(-1));
    let second_seen = Arc::new(AtomicI64::new(-1));

    let first = Arc::new(BatchEventProcessor::new(
        Arc::clone(&ring_buffer) as Arc<dyn DataProvider<Order>>,
        ring_buffer.new_barrier(&[]),
        Stage {
            name: "first",
            last_seen: Arc::clone(&first_seen),
            upstream: None,
            violations: Arc::clone(&violations),
        },
    ));
    let second = Arc::new(BatchEventProcessor::new(
        Arc::clone(&ring_buffer) as Arc<dyn DataProvider<Order>>,
        ring_buffer.new_barrier(&[first.get_sequence()]),
        Stage {
            name: "second",
            last_seen: Arc::clone(&second_seen),
            upstream: Some(Arc::clone(&first_seen)),
            violations: Arc::clone(&violations),
        },
    ));
    ring_buffer.add_gating_sequences(&[second.get_sequence()]);

    let processors: Vec<Arc<dyn EventProcessor>> = vec![first.clone(), second.clone()];
    let threads: Vec<_> = processors
        .iter()
        .map(|p| {
            let p = Arc::clone(p);
            thread::spawn(move || p.run())
        })
        .collect();

    const EVENTS: i64 = 5_000;
    for id in 0..EVENTS {
        ring_buffer
            .publish_event(|order, _| {
                order.id = id;
                order.amount = id * 10;
            })
            .unwrap();
    }

    wait_until(|| second.get_sequence().get() == EVENTS - 1);
    for p in &processors {
        p.halt();
    }
    for t in threads {
        t.join().unwrap().unwrap();
    }

    assert!(violations.lock().unwrap().is_empty(), "{:?}", violations.lock().unwrap());
    assert_eq!(first_seen.load(Ordering::SeqCst), EVENTS - 1);
    assert_eq!(second_seen.load(Ordering::SeqCst), EVENTS - 1);
}

#[test]
fn test_timeout_config_drives_processor_timeouts() {
    init_tracing();

    struct TimeoutCounter(Arc<AtomicI64>);

    impl EventHandler<Order> for TimeoutCounter {
        fn on_event(&mut self, _event: &Order, _sequence: i64, _end_of_batch: bool) -> Result<()> {
            Ok(())
        }

        fn on_timeout(&mut self, _sequence: i64) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let config: SequencerConfig = serde_json::from_str(
        r#"{
            "buffer_size": 8,
            "producer_type": "single",
            "wait_strategy": { "type": "timeout_blocking", "timeout_ms": 2 }
        }"#,
    )
    .unwrap();
    assert_eq!(
        config.wait_strategy,
        WaitStrategyConfig::TimeoutBlocking { timeout_ms: 2 }
    );

    let ring_buffer: Arc<RingBuffer<Order>> =
        Arc::new(config.build_ring_buffer(DefaultEventFactory::new()).unwrap());
    let timeouts = Arc::new(AtomicI64::new(0));
    let processor = Arc::new(BatchEventProcessor::new(
        Arc::clone(&ring_buffer) as Arc<dyn DataProvider<Order>>,
        ring_buffer.new_barrier(&[]),
        TimeoutCounter(Arc::clone(&timeouts)),
    ));

    let worker = {
        let processor = Arc::clone(&processor);
        thread::spawn(move || processor.run())
    };
    wait_until(|| timeouts.load(Ordering::SeqCst) >= 3);
    processor.halt();
    worker.join().unwrap().unwrap();
}
