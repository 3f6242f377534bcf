/*
 *  display/rotation.rs
 *
 *  departure-board - live departures on small matrix displays
 *  (c) 2020-26 Stuart Hunter
 *
 *  Time-sharing of the lower rows between departures and line status
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

use log::{debug, info};

/// Frame tick the status and calling-point rows are tuned for.
pub const ANIMATION_TICK_SECS: f64 = 0.02;
/// The same tick as a `Duration`; animated cells step once per tick.
pub const ANIMATION_TICK: Duration = Duration::from_millis(20);
/// A stalled frame advances the animation at most this far.
const MAX_CATCH_UP_STEPS: u32 = 5;
/// Fewer departures than this and the status banner never shows.
pub const MIN_DEPARTURES_FOR_STATUS: usize = 3;

/// How long a status banner of `text_width` pixels needs on screen:
/// roll-up, its pause, the scroll and the end pause, plus a second spare.
pub fn calculate_scroll_duration(text_width: u32) -> Duration {
    let frames = 10 + 20 + text_width / 2 + 8;
    Duration::from_secs_f64(frames as f64 * ANIMATION_TICK_SECS + 1.0)
}

/// Turns frame instants into whole animation steps on a fixed
/// [`ANIMATION_TICK`] grid, independent of the render frame rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepClock {
    last: Option<Instant>,
}

impl StepClock {
    /// Steps owed since the previous call. The first call owes one.
    pub fn steps_due(&mut self, now: Instant) -> u32 {
        let Some(last) = self.last else {
            self.last = Some(now);
            return 1;
        };
        let owed = now.saturating_duration_since(last).as_nanos() / ANIMATION_TICK.as_nanos();
        if owed > u128::from(MAX_CATCH_UP_STEPS) {
            debug!("animation fell {owed} steps behind, resyncing");
            self.last = Some(now);
            return MAX_CATCH_UP_STEPS;
        }
        let steps = owed as u32;
        self.last = Some(last + ANIMATION_TICK * steps);
        steps
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationSettings {
    pub status_enabled: bool,
    pub reshow_interval: Duration,
    pub alternation_enabled: bool,
    pub alternation_interval: Duration,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            status_enabled: false,
            reshow_interval: Duration::from_secs(60),
            alternation_enabled: true,
            alternation_interval: Duration::from_secs(7),
        }
    }
}

/// Result of an alternation query: which departure to show, and whether
/// this call flipped it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlternationStep {
    pub index: usize,
    pub switched: bool,
}

#[derive(Debug, Clone, Copy)]
struct Alternation {
    index: usize,
    last_switch: Option<Instant>,
}

impl Default for Alternation {
    fn default() -> Self {
        Self { index: 1, last_switch: None }
    }
}

/// Decides, frame by frame, when the bottom row gives way to the line
/// status banner and which of the later departures the row above shows
/// meanwhile.
#[derive(Debug, Clone)]
pub struct ContentRotationPolicy {
    settings: RotationSettings,
    current_status_text: Option<String>,
    // a poll that arrived while a rotation was on screen
    pending_status_text: Option<Option<String>>,
    last_shown_status_text: Option<String>,
    last_shown_at: Option<Instant>,
    rotation_started_at: Option<Instant>,
    rotation_duration: Duration,
    is_showing_status: bool,
    alternation: Alternation,
}

impl ContentRotationPolicy {
    pub fn new(settings: RotationSettings) -> Self {
        Self {
            settings,
            current_status_text: None,
            pending_status_text: None,
            last_shown_status_text: None,
            last_shown_at: None,
            rotation_started_at: None,
            rotation_duration: Duration::ZERO,
            is_showing_status: false,
            alternation: Alternation::default(),
        }
    }

    pub fn settings(&self) -> &RotationSettings { &self.settings }
    pub fn is_showing_status(&self) -> bool { self.is_showing_status }
    pub fn current_status_text(&self) -> Option<&str> { self.current_status_text.as_deref() }
    pub fn last_shown_status_text(&self) -> Option<&str> { self.last_shown_status_text.as_deref() }
    pub fn last_shown_at(&self) -> Option<Instant> { self.last_shown_at }
    pub fn rotation_started_at(&self) -> Option<Instant> { self.rotation_started_at }
    pub fn rotation_duration(&self) -> Duration { self.rotation_duration }

    /// Feed the latest polled status and decide whether the status banner
    /// owns the bottom row this frame.
    ///
    /// `measure` gives the pixel width of the status text and is only
    /// called when a rotation starts.
    pub fn should_show_status(
        &mut self,
        departure_count: usize,
        status_text: Option<&str>,
        now: Instant,
        measure: impl FnOnce(&str) -> u32,
    ) -> bool {
        self.observe_status(status_text);

        if self.is_showing_status {
            if departure_count < MIN_DEPARTURES_FOR_STATUS {
                self.cancel_rotation();
                return false;
            }
            let elapsed = self
                .rotation_started_at
                .map_or(Duration::MAX, |t| now.saturating_duration_since(t));
            if elapsed < self.rotation_duration {
                return true;
            }
            self.finish_rotation(now);
            return false;
        }

        if !self.settings.status_enabled || departure_count < MIN_DEPARTURES_FOR_STATUS {
            return false;
        }
        let Some(text) = self.current_status_text.as_deref() else {
            return false;
        };
        let changed = self.last_shown_status_text.as_deref() != Some(text);
        let reshow_due = self
            .last_shown_at
            .is_none_or(|t| now.saturating_duration_since(t) >= self.settings.reshow_interval);
        if !(changed || reshow_due) {
            return false;
        }

        let width = measure(text);
        self.rotation_duration = calculate_scroll_duration(width);
        self.rotation_started_at = Some(now);
        self.is_showing_status = true;
        info!(
            "showing line status for {:.2}s: {}",
            self.rotation_duration.as_secs_f64(),
            text
        );
        true
    }

    /// Abandon an on-screen rotation without marking the status as shown.
    pub fn cancel_rotation(&mut self) {
        if self.is_showing_status {
            debug!("status rotation cancelled");
        }
        self.is_showing_status = false;
        self.rotation_started_at = None;
        self.apply_pending();
    }

    /// Which of departures[1] / departures[2] the alternating row shows.
    pub fn should_alternate_departure(&mut self, now: Instant) -> AlternationStep {
        match self.alternation.last_switch {
            None => {
                self.alternation = Alternation { index: 1, last_switch: Some(now) };
                AlternationStep { index: 1, switched: true }
            }
            Some(t) if now.saturating_duration_since(t) >= self.settings.alternation_interval => {
                let index = if self.alternation.index == 1 { 2 } else { 1 };
                self.alternation = Alternation { index, last_switch: Some(now) };
                debug!("alternating row now shows departure {}", index + 1);
                AlternationStep { index, switched: true }
            }
            Some(_) => AlternationStep { index: self.alternation.index, switched: false },
        }
    }

    pub fn reset_alternation(&mut self) {
        self.alternation = Alternation::default();
    }

    fn observe_status(&mut self, status_text: Option<&str>) {
        if self.is_showing_status {
            if self.current_status_text.as_deref() != status_text {
                self.pending_status_text = Some(status_text.map(str::to_string));
            } else {
                self.pending_status_text = None;
            }
        } else if self.current_status_text.as_deref() != status_text {
            self.current_status_text = status_text.map(str::to_string);
        }
    }

    fn finish_rotation(&mut self, now: Instant) {
        self.last_shown_status_text = self.current_status_text.clone();
        self.last_shown_at = Some(now);
        self.is_showing_status = false;
        self.rotation_started_at = None;
        self.apply_pending();
        debug!("status rotation complete");
    }

    fn apply_pending(&mut self) {
        if let Some(pending) = self.pending_status_text.take() {
            self.current_status_text = pending;
        }
    }
}
