/*
 *  pacer.rs
 *
 *  departure-board - live departures on small matrix displays
 *  (c) 2020-26 Stuart Hunter
 *
 *  Fixed-rate frame pacing and effective frame rate measurement
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::time::{Duration, Instant};

use log::info;

fn frame_for(fps: u32) -> Duration {
    Duration::from_micros((1_000_000u32 / fps.max(1)) as u64)
}

/// Keeps the render loop on a fixed frame period.
pub struct Pacer {
    next_deadline: Instant,
    frame: Duration,
}

impl Pacer {
    pub fn new(target_fps: u32) -> Self {
        Self { next_deadline: Instant::now(), frame: frame_for(target_fps) }
    }

    #[inline]
    pub fn frame(&self) -> Duration {
        self.frame
    }

    /// True when a frame is due at `now`; if so the next deadline is scheduled.
    #[inline]
    pub fn due_at(&mut self, now: Instant) -> bool {
        if now >= self.next_deadline {
            // a late frame does not earn a burst of catch-up frames
            self.next_deadline = (self.next_deadline + self.frame).max(now);
            true
        } else {
            false
        }
    }

    /// Block the render thread until the next frame is due.
    pub fn wait(&mut self) -> Instant {
        let now = Instant::now();
        if now < self.next_deadline {
            std::thread::sleep(self.next_deadline - now);
        }
        let now = Instant::now();
        self.due_at(now);
        now
    }
}

/// Counts frames and reports the achieved rate every `interval`.
pub struct FpsMeter {
    interval: Duration,
    window_start: Instant,
    frames: u64,
    last_fps: f64,
}

impl FpsMeter {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self { interval, window_start: now, frames: 0, last_fps: 0.0 }
    }

    pub fn last_fps(&self) -> f64 {
        self.last_fps
    }

    /// Count one frame; returns the rate when a window closes.
    pub fn record(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.interval || elapsed.is_zero() {
            return None;
        }
        let fps = self.frames as f64 / elapsed.as_secs_f64();
        info!("effective frame rate {:.1} fps over {}s", fps, elapsed.as_secs());
        self.last_fps = fps;
        self.frames = 0;
        self.window_start = now;
        Some(fps)
    }
}
