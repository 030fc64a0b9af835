//! Idempotence laws and boundary behaviours from spec §8, exercised as
//! integration tests against the public surface.

use spark_goroutine::channel::{Channel, Direction};
use spark_goroutine::context::Context;
use spark_goroutine::dataflow::{pipeline, Stage};
use spark_goroutine::error::CoreError;
use spark_goroutine::runtime::{Runtime, RuntimeConfig};
use spark_goroutine::sync::{Mutex, Semaphore};
use spark_goroutine::value::Value;

#[test]
fn channel_double_close_returns_already_closed() {
    let c = Channel::new(1, Direction::Bidirectional).unwrap();
    assert_eq!(c.close(), (true, None));
    assert_eq!(c.close(), (false, Some("already closed")));
}

#[test]
fn pool_close_unknown_name_twice_is_false_both_times() {
    let rt = Runtime::new(RuntimeConfig::default());
    assert!(!rt.pool_close("ghost"));
    assert!(!rt.pool_close("ghost"));
}

#[test]
fn pool_close_is_not_idempotently_true_on_a_real_pool() {
    // A real pool's name is removed from the registry on first close, so a
    // second `pool_close` with the same name is the "unknown pool" path.
    let rt = Runtime::new(RuntimeConfig::default());
    rt.pool_create("p", 1).unwrap();
    assert!(rt.pool_close("p"));
    assert!(!rt.pool_close("p"));
}

#[test]
fn context_cancel_twice_second_call_is_noop() {
    let root = Context::root();
    assert!(root.cancel());
    assert!(!root.cancel());
}

#[test]
fn channel_capacity_zero_send_blocks_until_matched_receive() {
    let c = Channel::new(0, Direction::Bidirectional).unwrap();
    let sender = {
        let c = c.clone();
        std::thread::spawn(move || c.send(Value::Bool(true)))
    };
    let (v, ok) = c.receive().unwrap();
    assert!(ok);
    assert!(matches!(v, Some(Value::Bool(true))));
    sender.join().unwrap().unwrap();
}

/// Regression coverage for the rendezvous handoff race: with several
/// senders and several receivers racing on the same capacity-0 channel,
/// every sender must eventually unblock having had its own value consumed,
/// and every value sent must be received exactly once.
#[test]
fn channel_capacity_zero_survives_concurrent_senders_and_receivers() {
    let c = Channel::new(0, Direction::Bidirectional).unwrap();

    let senders: Vec<_> = (0..6)
        .map(|i| {
            let c = c.clone();
            std::thread::spawn(move || c.send(Value::Number(i as f64)))
        })
        .collect();

    let receivers: Vec<_> = (0..6)
        .map(|_| {
            let c = c.clone();
            std::thread::spawn(move || {
                let (v, ok) = c.receive().unwrap();
                assert!(ok);
                match v {
                    Some(Value::Number(n)) => n as i64,
                    other => panic!("unexpected rendezvous value: {other:?}"),
                }
            })
        })
        .collect();

    for s in senders {
        s.join().unwrap().unwrap();
    }
    let mut received: Vec<i64> = receivers.into_iter().map(|h| h.join().unwrap()).collect();
    received.sort();
    assert_eq!(received, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn semaphore_capacity_one_behaves_like_a_mutex() {
    let sem = Semaphore::new(1);
    let mutex = Mutex::new();

    sem.acquire();
    assert!(!sem.try_acquire());
    sem.release();
    assert!(sem.try_acquire());
    sem.release();

    mutex.lock();
    assert!(!mutex.try_lock());
    mutex.unlock();
    assert!(mutex.try_lock());
    mutex.unlock();
}

#[test]
fn pool_with_one_worker_is_fifo_serialized() {
    let rt = Runtime::new(RuntimeConfig::default());
    let pool = rt.pool_create("serial", 1).unwrap();
    let order = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    for i in 0..10 {
        let order = std::sync::Arc::clone(&order);
        pool.submit(
            move |_args| {
                order.lock().push(i);
                Ok(vec![])
            },
            vec![],
        )
        .unwrap();
    }
    pool.wait();
    assert_eq!(*order.lock(), (0..10).collect::<Vec<_>>());
}

#[test]
fn pipeline_with_zero_stages_returns_input_channel_unchanged() {
    let input = Channel::new(1, Direction::Bidirectional).unwrap();
    input.send(Value::Number(1.0)).unwrap();
    input.close();
    let output = pipeline(input, Vec::<Stage<fn(Value) -> Result<Value, CoreError>>>::new()).unwrap();
    let (v, ok) = output.receive().unwrap();
    assert!(ok);
    assert!(matches!(v, Some(Value::Number(n)) if n == 1.0));
}
