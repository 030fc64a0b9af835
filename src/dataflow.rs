//! Composable dataflow patterns: pipeline, fan-out, fan-in (§4.10).
//!
//! None of these close a channel they did not themselves create — the
//! resolved Open Question from §9: "producer closes first" is the
//! required contract, so every stage here only ever closes its own output.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crate::channel::{Channel, Direction};
use crate::error::CoreError;
use crate::value::Value;

/// Default capacity for every intermediate channel this module creates
/// (§4.10: "capacity 10").
const STAGE_CAPACITY: usize = 10;

/// One stage of a [`pipeline`] call.
pub struct Stage<F>
where
    F: Fn(Value) -> Result<Value, CoreError> + Send + Sync + 'static,
{
    pub workers: usize,
    pub f: Arc<F>,
}

/// `pipeline(input, stages)` — chains `stages` behind `input`, returning
/// the final output channel. Each stage spawns `workers` threads pulling
/// from its input and pushing the transformed value to its output; a
/// single-worker stage preserves input order, a multi-worker stage does
/// not (§4.10).
///
/// Zero stages returns `input` unchanged, matching the boundary behaviour
/// in §8 ("pipeline with zero stages returns the input channel unchanged").
pub fn pipeline<F>(input: Channel, stages: Vec<Stage<F>>) -> Result<Channel, CoreError>
where
    F: Fn(Value) -> Result<Value, CoreError> + Send + Sync + 'static,
{
    let mut current = input;
    for stage in stages {
        if stage.workers < 1 {
            return Err(CoreError::invalid_argument("pipeline stage workers must be >= 1"));
        }
        let output = Channel::new(STAGE_CAPACITY, Direction::Bidirectional)?;
        let remaining = Arc::new(AtomicUsize::new(stage.workers));

        for _ in 0..stage.workers {
            let stage_in = current.clone();
            let stage_out = output.clone();
            let f = Arc::clone(&stage.f);
            let remaining = Arc::clone(&remaining);
            thread::spawn(move || {
                loop {
                    let (value, ok) = match stage_in.receive() {
                        Ok(r) => r,
                        Err(_) => break,
                    };
                    if !ok {
                        break;
                    }
                    if let Some(v) = value {
                        match f(v) {
                            Ok(transformed) => {
                                if stage_out.send(transformed).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!(target: "goroutine", error = %e, "pipeline stage fn error");
                            }
                        }
                    }
                }
                if remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
                    stage_out.close();
                }
            });
        }
        current = output;
    }
    Ok(current)
}

/// `fan_out(input, n)` — one consumer reads from `input` and broadcasts
/// every value to all `n` outputs, blocking on the slowest. All outputs
/// close when `input` closes.
pub fn fan_out(input: Channel, n: usize) -> Result<Vec<Channel>, CoreError> {
    if n == 0 {
        return Err(CoreError::invalid_argument("fan_out requires n >= 1"));
    }
    let outputs: Vec<Channel> = (0..n)
        .map(|_| Channel::new(STAGE_CAPACITY, Direction::Bidirectional))
        .collect::<Result<_, _>>()?;

    let outs = outputs.clone();
    thread::spawn(move || {
        loop {
            let (value, ok) = match input.receive() {
                Ok(r) => r,
                Err(_) => break,
            };
            if !ok {
                break;
            }
            if let Some(v) = value {
                for out in &outs {
                    if out.send(v.deep_copy_for_send()).is_err() {
                        // A closed output just stops receiving further
                        // broadcasts; the others keep going.
                    }
                }
            }
        }
        for out in &outs {
            out.close();
        }
    });

    Ok(outputs)
}

/// `fan_in(channels)` — merges all inputs into one output channel; the
/// output closes once every input has closed and drained.
pub fn fan_in(inputs: Vec<Channel>) -> Result<Channel, CoreError> {
    let output = Channel::new(STAGE_CAPACITY, Direction::Bidirectional)?;
    let remaining = Arc::new(AtomicUsize::new(inputs.len()));

    for input in inputs {
        let output = output.clone();
        let remaining = Arc::clone(&remaining);
        thread::spawn(move || {
            loop {
                let (value, ok) = match input.receive() {
                    Ok(r) => r,
                    Err(_) => break,
                };
                if !ok {
                    break;
                }
                if let Some(v) = value {
                    if output.send(v).is_err() {
                        break;
                    }
                }
            }
            if remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
                output.close();
            }
        });
    }

    Ok(output)
}
