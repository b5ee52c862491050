// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Rolling frame render time window.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Average reported when no frame has been recorded yet (60 FPS).
pub const DEFAULT_FRAME_TIME_MS: f32 = 16.67;

pub const DEFAULT_FRAME_WINDOW: usize = 60;

/// Bounded window of recent frame times, shared between frame reporters and
/// the polling loop.
#[derive(Debug)]
pub struct FrameTimeWindow {
    state: Mutex<WindowState>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct WindowState {
    samples: VecDeque<f32>,
    total_frames: u64,
}

impl Default for FrameTimeWindow {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_WINDOW)
    }
}

impl FrameTimeWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(WindowState::default()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn record(&self, render_time_ms: f32) {
        if !render_time_ms.is_finite() || render_time_ms < 0.0 {
            return;
        }
        let mut state = self.lock();
        state.samples.push_back(render_time_ms);
        state.total_frames += 1;
        while state.samples.len() > self.capacity {
            state.samples.pop_front();
        }
    }

    /// Mean of the retained samples.
    pub fn average(&self) -> f32 {
        let state = self.lock();
        if state.samples.is_empty() {
            return DEFAULT_FRAME_TIME_MS;
        }
        state.samples.iter().sum::<f32>() / state.samples.len() as f32
    }

    pub fn total_frames(&self) -> u64 {
        self.lock().total_frames
    }

    pub fn len(&self) -> usize {
        self.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().samples.is_empty()
    }

    pub fn clear(&self) {
        self.lock().samples.clear();
    }
}
