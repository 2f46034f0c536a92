// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Wall-clock frame pump
//!
//! Fires every `interval_ms` while armed. Ticks are relative to when the pump
//! was armed, not to backend responses. Missed ticks collapse into one, so a
//! stalled driver never produces a burst of frames.

use crate::state_machine::NowMs;

#[derive(Debug, Clone)]
pub struct FramePump {
    interval_ms: u64,
    next_due_ms: Option<NowMs>,
}

impl FramePump {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            next_due_ms: None,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Arm the pump. The first tick is one interval from now. No-op when armed.
    pub fn arm(&mut self, now_ms: NowMs) {
        if self.next_due_ms.is_none() {
            self.next_due_ms = Some(now_ms.saturating_add(self.interval_ms));
        }
    }

    /// Cancel the pending tick
    pub fn disarm(&mut self) {
        self.next_due_ms = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_due_ms.is_some()
    }

    pub fn next_due_ms(&self) -> Option<NowMs> {
        self.next_due_ms
    }

    /// Returns true when a tick is due at `now_ms` and schedules the next one
    pub fn poll(&mut self, now_ms: NowMs) -> bool {
        let Some(due) = self.next_due_ms else {
            return false;
        };
        if now_ms < due {
            return false;
        }
        let missed = (now_ms - due) / self.interval_ms;
        self.next_due_ms = Some(due + (missed + 1) * self.interval_ms);
        true
    }
}
