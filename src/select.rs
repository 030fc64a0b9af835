//! Blocking and timed multi-case selection over channel operations
//! (§4.9 Select Multiplexer).
//!
//! Deliberately NOT goroutine-per-case: every candidate [`Channel`] already
//! exposes `receive_ready`/`send_ready`/`wait_for_activity` hooks backed by
//! its own `Condvar`, so this scans for a ready case, and when none are
//! ready, backs off on one of the candidate channels' condvars and
//! rescans — no thread is ever spawned per case, so there is nothing to
//! leak when only one case ends up firing.

use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::channel::Channel;
use crate::error::CoreError;
use crate::value::Value;

/// One case of a [`select`]/[`select_timeout`] call.
pub enum SelectOp<'a> {
    Receive {
        channel: &'a Channel,
        handler: Box<dyn FnMut(Value) + 'a>,
    },
    Send {
        channel: &'a Channel,
        value: Value,
        handler: Box<dyn FnMut() + 'a>,
    },
    Default {
        handler: Box<dyn FnMut() + 'a>,
    },
}

fn is_ready(op: &SelectOp) -> bool {
    match op {
        SelectOp::Receive { channel, .. } => channel.receive_ready(),
        SelectOp::Send { channel, .. } => channel.send_ready(),
        SelectOp::Default { .. } => false,
    }
}

/// Attempt to actually perform the case's operation now that it looked
/// ready. Returns `true` if it fired (the snapshot wasn't stale).
fn fire(op: &mut SelectOp) -> Result<bool, CoreError> {
    match op {
        SelectOp::Receive { channel, handler } => {
            let (value, ok) = channel.try_receive()?;
            if ok {
                handler(value.unwrap_or(Value::Nil));
                Ok(true)
            } else {
                Ok(false)
            }
        }
        SelectOp::Send { channel, value, handler } => {
            if channel.try_send(value.clone())? {
                handler();
                Ok(true)
            } else {
                Ok(false)
            }
        }
        SelectOp::Default { .. } => Ok(false),
    }
}

fn shuffled_indices(len: usize) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..len).collect();
    idx.shuffle(&mut thread_rng());
    idx
}

fn default_index(cases: &[SelectOp]) -> Option<usize> {
    cases.iter().position(|c| matches!(c, SelectOp::Default { .. }))
}

fn wait_backoff(cases: &[SelectOp], timeout: Option<Duration>) {
    for op in cases {
        match op {
            SelectOp::Receive { channel, .. } | SelectOp::Send { channel, .. } => {
                channel.wait_for_activity(timeout);
                return;
            }
            SelectOp::Default { .. } => {}
        }
    }
}

/// `select(cases)` — blocks until exactly one case fires; returns the
/// index of the fired case within `cases`.
pub fn select(mut cases: Vec<SelectOp>) -> Result<usize, CoreError> {
    if cases.is_empty() {
        return Err(CoreError::invalid_argument("select requires at least one case"));
    }
    let default_idx = default_index(&cases);

    loop {
        let order = shuffled_indices(cases.len());
        let mut ready: Vec<usize> = order
            .into_iter()
            .filter(|&i| !matches!(cases[i], SelectOp::Default { .. }) && is_ready(&cases[i]))
            .collect();
        ready.shuffle(&mut thread_rng());

        for &i in &ready {
            if fire(&mut cases[i])? {
                return Ok(i);
            }
        }

        if let Some(idx) = default_idx {
            if let SelectOp::Default { handler } = &mut cases[idx] {
                handler();
            }
            return Ok(idx);
        }

        wait_backoff(&cases, None);
    }
}

/// `select_timeout(timeout_ms, cases)` — like [`select`], but gives up
/// after `timeout_ms` milliseconds. Returns `(timed_out, index)`.
pub fn select_timeout(timeout_ms: u64, mut cases: Vec<SelectOp>) -> Result<(bool, usize), CoreError> {
    if cases.is_empty() {
        return Err(CoreError::invalid_argument("select requires at least one case"));
    }
    let default_idx = default_index(&cases);
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);

    loop {
        let order = shuffled_indices(cases.len());
        let mut ready: Vec<usize> = order
            .into_iter()
            .filter(|&i| !matches!(cases[i], SelectOp::Default { .. }) && is_ready(&cases[i]))
            .collect();
        ready.shuffle(&mut thread_rng());

        for &i in &ready {
            if fire(&mut cases[i])? {
                return Ok((false, i));
            }
        }

        if let Some(idx) = default_idx {
            if let SelectOp::Default { handler } = &mut cases[idx] {
                handler();
            }
            return Ok((false, idx));
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok((true, 0));
        }
        wait_backoff(&cases, Some(deadline - now));
    }
}
