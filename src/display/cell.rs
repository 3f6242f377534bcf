/*
 *  display/cell.rs
 *
 *  departure-board - live departures on small matrix displays
 *  (c) 2020-26 Stuart Hunter
 *
 *  Per-slot roll-up and scroll animation state machine
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

use embedded_graphics::geometry::{Point, Size};
use embedded_graphics::primitives::Rectangle;
use log::trace;
use serde::{Deserialize, Serialize};

use super::bitmap::Bitmap;
use super::error::DisplayError;
use super::fonts::FontKind;
use super::text_metrics::TextMetrics;

/// A roll-up step taller than a text row skips the reveal entirely.
pub const MAX_ROLL_STEP: u32 = 16;
pub const MAX_SCROLL_SPEED: u32 = 64;

/// Frame-count tuning for one kind of animated cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellProfile {
    /// pixels revealed per frame while rolling up
    pub roll_step: u32,
    pub rollup_pause_frames: u32,
    pub end_pause_frames: u32,
    /// pixels moved left per frame while scrolling
    pub scroll_speed: u32,
}

impl CellProfile {
    pub const CALLING_POINTS: CellProfile = CellProfile {
        roll_step: 1,
        rollup_pause_frames: 20,
        end_pause_frames: 8,
        scroll_speed: 1,
    };
    pub const TFL_CALLING_POINTS: CellProfile = CellProfile {
        roll_step: 2,
        rollup_pause_frames: 20,
        end_pause_frames: 8,
        scroll_speed: 1,
    };
    pub const ALTERNATING_ROW: CellProfile = CellProfile {
        roll_step: 2,
        rollup_pause_frames: 10,
        end_pause_frames: 8,
        scroll_speed: 1,
    };
    pub const STATUS_BANNER: CellProfile = CellProfile {
        roll_step: 1,
        rollup_pause_frames: 20,
        end_pause_frames: 8,
        scroll_speed: 2,
    };

    pub fn validate(&self, name: &str) -> Result<(), DisplayError> {
        if !(1..=MAX_ROLL_STEP).contains(&self.roll_step) {
            return Err(DisplayError::invalid(format!(
                "{name}: roll_step must be between 1 and {MAX_ROLL_STEP}"
            )));
        }
        if !(1..=MAX_SCROLL_SPEED).contains(&self.scroll_speed) {
            return Err(DisplayError::invalid(format!(
                "{name}: scroll_speed must be between 1 and {MAX_SCROLL_SPEED}"
            )));
        }
        Ok(())
    }
}

impl Default for CellProfile {
    fn default() -> Self {
        Self::CALLING_POINTS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    RollingUp,
    PausedAfterRollUp,
    Scrolling,
    PausedAtScrollEnd,
}

/// One logical display slot that reveals its text by rolling it up from
/// below, then scrolls it left if it is wider than the slot.
///
/// Every call to [`AnimatedTextCell::render_to`] is one frame: the cell
/// draws its current state and then advances exactly one step. Handing it
/// different text resets it to `Idle` on that same call.
#[derive(Debug, Clone)]
pub struct AnimatedTextCell {
    name: &'static str,
    text: Option<String>,
    font: FontKind,
    profile: CellProfile,
    viewport: Size,
    phase: Phase,
    vertical_offset: u32,
    horizontal_offset: i32,
    pause_counter: u32,
    // fitted text that finished its roll-up stays on screen
    revealed: bool,
    one_shot: bool,
    completed: bool,
}

impl AnimatedTextCell {
    pub fn new(name: &'static str, font: FontKind, profile: CellProfile, viewport: Size) -> Self {
        Self {
            name,
            text: None,
            font,
            profile,
            viewport,
            phase: Phase::Idle,
            vertical_offset: 0,
            horizontal_offset: 0,
            pause_counter: 0,
            revealed: false,
            one_shot: false,
            completed: false,
        }
    }

    /// A one-shot cell plays a single roll-up/scroll cycle and then stays
    /// blank until it is reset or its text changes.
    pub fn one_shot(mut self) -> Self {
        self.one_shot = true;
        self
    }

    pub fn name(&self) -> &'static str { self.name }
    pub fn text(&self) -> Option<&str> { self.text.as_deref() }
    pub fn font(&self) -> FontKind { self.font }
    pub fn profile(&self) -> CellProfile { self.profile }
    pub fn viewport(&self) -> Size { self.viewport }
    pub fn phase(&self) -> Phase { self.phase }
    pub fn vertical_offset(&self) -> u32 { self.vertical_offset }
    pub fn horizontal_offset(&self) -> i32 { self.horizontal_offset }
    pub fn pause_counter(&self) -> u32 { self.pause_counter }
    pub fn is_revealed(&self) -> bool { self.revealed }
    pub fn is_completed(&self) -> bool { self.completed }

    /// Back to `Idle` with zero offsets; the roll-up replays on the next frame.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.vertical_offset = 0;
        self.horizontal_offset = 0;
        self.pause_counter = 0;
        self.revealed = false;
        self.completed = false;
    }

    pub fn set_profile(&mut self, profile: CellProfile) {
        if self.profile != profile {
            self.profile = profile;
            self.reset();
        }
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        if self.viewport != viewport {
            self.viewport = viewport;
            self.reset();
        }
    }

    /// Draw this frame into `target` with the slot's top-left at `origin`,
    /// clipped to the slot, then advance one step.
    pub fn render_to(&mut self, text: &str, metrics: &mut TextMetrics, target: &mut Bitmap, origin: Point) {
        self.render_steps(text, metrics, target, origin, 1);
    }

    /// As [`render_to`](Self::render_to), advancing `steps` animation
    /// steps afterwards. Zero redraws the current state unchanged.
    pub fn render_steps(
        &mut self,
        text: &str,
        metrics: &mut TextMetrics,
        target: &mut Bitmap,
        origin: Point,
        steps: u32,
    ) {
        let rendered = metrics.measure_and_rasterize(text, self.font);

        if self.text.as_deref() != Some(text) {
            trace!("{}: text changed, reset", self.name);
            self.text = Some(text.to_string());
            self.reset();
            return;
        }

        if let Some(at) = self.draw_position(rendered.height) {
            let clip = Rectangle::new(origin, self.viewport);
            target.blit(&rendered.bitmap, origin + at, &clip);
        }

        for _ in 0..steps {
            self.advance(rendered.width, rendered.height);
        }
    }

    /// Same frame as [`render_to`](Self::render_to) but into a fresh
    /// slot-sized bitmap.
    pub fn render_standalone(&mut self, text: &str, metrics: &mut TextMetrics) -> Bitmap {
        let mut out = Bitmap::new(self.viewport.width, self.viewport.height);
        self.render_to(text, metrics, &mut out, Point::zero());
        out
    }

    /// Offset of the text bitmap relative to the slot origin, None when hidden.
    fn draw_position(&self, text_height: u32) -> Option<Point> {
        match self.phase {
            Phase::Idle if self.revealed => Some(Point::zero()),
            Phase::Idle => None,
            Phase::RollingUp | Phase::PausedAfterRollUp => {
                let rise = text_height.saturating_sub(self.vertical_offset) as i32;
                Some(Point::new(self.horizontal_offset, rise))
            }
            Phase::Scrolling | Phase::PausedAtScrollEnd => Some(Point::new(self.horizontal_offset, 0)),
        }
    }

    fn advance(&mut self, text_width: u32, text_height: u32) {
        match self.phase {
            Phase::Idle => {
                if text_width > 0 && !self.revealed && !self.completed {
                    self.phase = Phase::RollingUp;
                    self.vertical_offset = 0;
                }
            }
            Phase::RollingUp => {
                if self.vertical_offset < text_height {
                    self.vertical_offset = self.vertical_offset.saturating_add(self.profile.roll_step).min(text_height);
                } else {
                    self.phase = Phase::PausedAfterRollUp;
                    self.pause_counter = 0;
                }
            }
            Phase::PausedAfterRollUp => {
                if self.pause_counter < self.profile.rollup_pause_frames {
                    self.pause_counter += 1;
                } else if text_width > self.viewport.width {
                    self.phase = Phase::Scrolling;
                    self.horizontal_offset = 0;
                } else {
                    trace!("{}: fits, settled", self.name);
                    self.phase = Phase::Idle;
                    self.revealed = true;
                }
            }
            Phase::Scrolling => {
                if self.horizontal_offset.unsigned_abs() < text_width {
                    let speed = i32::try_from(self.profile.scroll_speed).unwrap_or(i32::MAX);
                    self.horizontal_offset = self.horizontal_offset.saturating_sub(speed);
                } else {
                    self.phase = Phase::PausedAtScrollEnd;
                    self.pause_counter = 0;
                }
            }
            Phase::PausedAtScrollEnd => {
                if self.pause_counter < self.profile.end_pause_frames {
                    self.pause_counter += 1;
                } else {
                    trace!("{}: scroll cycle complete", self.name);
                    self.phase = Phase::Idle;
                    self.vertical_offset = 0;
                    self.horizontal_offset = 0;
                    self.pause_counter = 0;
                    self.revealed = false;
                    self.completed = self.one_shot;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: &str = "Twyford, Maidenhead, Slough and London Paddington";

    fn cell(width: u32) -> AnimatedTextCell {
        AnimatedTextCell::new("test", FontKind::Regular, CellProfile::CALLING_POINTS, Size::new(width, 10))
    }

    fn frame(c: &mut AnimatedTextCell, text: &str, tm: &mut TextMetrics) -> Bitmap {
        c.render_standalone(text, tm)
    }

    #[test]
    fn test_first_frame_only_adopts_text() {
        let mut tm = TextMetrics::default();
        let mut c = cell(100);
        let bmp = frame(&mut c, "Reading", &mut tm);
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.text(), Some("Reading"));
        assert_eq!(bmp.count_on(), 0);
        frame(&mut c, "Reading", &mut tm);
        assert_eq!(c.phase(), Phase::RollingUp);
        assert_eq!(c.vertical_offset(), 0);
    }

    #[test]
    fn test_roll_up_is_monotonic_and_saturates() {
        let mut tm = TextMetrics::default();
        let mut c = cell(100);
        let mut last = 0;
        for _ in 0..40 {
            frame(&mut c, "Reading", &mut tm);
            assert!(c.vertical_offset() <= 10);
            if c.phase() == Phase::RollingUp {
                assert!(c.vertical_offset() >= last);
                last = c.vertical_offset();
            }
        }
        assert_eq!(last, 10);
    }

    #[test]
    fn test_odd_step_never_overshoots() {
        let mut tm = TextMetrics::default();
        let profile = CellProfile { roll_step: 3, ..CellProfile::CALLING_POINTS };
        let mut c = AnimatedTextCell::new("odd", FontKind::Regular, profile, Size::new(100, 10));
        for _ in 0..10 {
            frame(&mut c, "Slough", &mut tm);
        }
        assert_eq!(c.vertical_offset(), 10);
        assert_eq!(c.phase(), Phase::PausedAfterRollUp);
    }

    #[test]
    fn test_fitting_text_never_scrolls() {
        let mut tm = TextMetrics::default();
        let mut c = cell(100);
        for _ in 0..200 {
            frame(&mut c, "Reading", &mut tm);
            assert_ne!(c.phase(), Phase::Scrolling);
            assert_ne!(c.phase(), Phase::PausedAtScrollEnd);
        }
        assert_eq!(c.phase(), Phase::Idle);
        assert!(c.is_revealed());
        // settled text stays drawn
        assert!(frame(&mut c, "Reading", &mut tm).count_on() > 0);
    }

    #[test]
    fn test_paused_after_roll_up_goes_straight_to_idle() {
        let mut tm = TextMetrics::default();
        let mut c = cell(100);
        let mut prev = c.phase();
        for _ in 0..100 {
            frame(&mut c, "Reading", &mut tm);
            if prev == Phase::PausedAfterRollUp && c.phase() != Phase::PausedAfterRollUp {
                assert_eq!(c.phase(), Phase::Idle);
                return;
            }
            prev = c.phase();
        }
        panic!("never left the roll-up pause");
    }

    #[test]
    fn test_scroll_completes_without_overshoot() {
        let mut tm = TextMetrics::default();
        let width = tm.width_of(LONG, FontKind::Regular) as i32;
        let profile = CellProfile { scroll_speed: 4, ..CellProfile::CALLING_POINTS };
        let mut c = AnimatedTextCell::new("scroll", FontKind::Regular, profile, Size::new(60, 10));
        let mut seen_end = false;
        let mut last_offset = 0;
        // 2 + 11 roll-up frames, 21 pause frames, W/4 scroll frames, 9 end pause frames
        let budget = 2 + 11 + 21 + (width / 4) as usize + 2 + 9 + 2;
        for _ in 0..budget {
            frame(&mut c, LONG, &mut tm);
            if c.phase() == Phase::Scrolling {
                assert!(c.horizontal_offset() <= last_offset);
                last_offset = c.horizontal_offset();
            }
            if c.phase() == Phase::PausedAtScrollEnd {
                seen_end = true;
                assert!(-c.horizontal_offset() >= width);
                assert!(-c.horizontal_offset() < width + 4);
            }
            if seen_end && c.phase() == Phase::Idle {
                assert_eq!(c.horizontal_offset(), 0);
                assert!(!c.is_revealed());
                return;
            }
        }
        panic!("scroll cycle did not complete within {budget} frames");
    }

    #[test]
    fn test_cycle_replays_after_scroll() {
        let mut tm = TextMetrics::default();
        let mut c = cell(60);
        let mut cycles = 0;
        let mut prev = c.phase();
        for _ in 0..2000 {
            frame(&mut c, LONG, &mut tm);
            if prev == Phase::Idle && c.phase() == Phase::RollingUp {
                cycles += 1;
            }
            prev = c.phase();
        }
        assert!(cycles >= 2);
    }

    #[test]
    fn test_text_change_mid_scroll_resets() {
        let mut tm = TextMetrics::default();
        let mut c = cell(60);
        for _ in 0..500 {
            frame(&mut c, LONG, &mut tm);
            if c.phase() == Phase::Scrolling && c.horizontal_offset() <= -40 {
                break;
            }
        }
        assert_eq!(c.phase(), Phase::Scrolling);
        frame(&mut c, "Oxford", &mut tm);
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.vertical_offset(), 0);
        assert_eq!(c.horizontal_offset(), 0);
        assert_eq!(c.text(), Some("Oxford"));
    }

    #[test]
    fn test_empty_text_stays_idle() {
        let mut tm = TextMetrics::default();
        let mut c = cell(60);
        for _ in 0..50 {
            let bmp = frame(&mut c, "", &mut tm);
            assert_eq!(bmp.count_on(), 0);
            assert_eq!(c.phase(), Phase::Idle);
        }
    }

    #[test]
    fn test_one_shot_stops_after_single_cycle() {
        let mut tm = TextMetrics::default();
        let mut c = cell(60).one_shot();
        for _ in 0..2000 {
            frame(&mut c, LONG, &mut tm);
        }
        assert!(c.is_completed());
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(frame(&mut c, LONG, &mut tm).count_on(), 0);
        c.reset();
        frame(&mut c, LONG, &mut tm);
        assert_eq!(c.phase(), Phase::RollingUp);
    }

    #[test]
    fn test_render_to_clips_to_slot() {
        let mut tm = TextMetrics::default();
        let mut c = cell(30);
        let mut canvas = Bitmap::new(100, 20);
        for _ in 0..40 {
            canvas.clear_off();
            c.render_to(LONG, &mut tm, &mut canvas, Point::new(10, 5));
        }
        let outside = canvas.count_on()
            - canvas.count_on_in(&Rectangle::new(Point::new(10, 5), Size::new(30, 10)));
        assert!(canvas.count_on() > 0);
        assert_eq!(outside, 0);
    }

    #[test]
    fn test_profile_change_resets() {
        let mut tm = TextMetrics::default();
        let mut c = cell(100);
        for _ in 0..5 {
            frame(&mut c, "Reading", &mut tm);
        }
        c.set_profile(CellProfile::ALTERNATING_ROW);
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.vertical_offset(), 0);
    }

    #[test]
    fn test_profile_validation() {
        assert!(CellProfile::STATUS_BANNER.validate("status").is_ok());
        let bad = CellProfile { scroll_speed: 0, ..CellProfile::STATUS_BANNER };
        assert!(bad.validate("status").is_err());
        let huge = CellProfile { scroll_speed: u32::MAX, ..CellProfile::STATUS_BANNER };
        assert!(huge.validate("status").is_err());
        let tall = CellProfile { roll_step: MAX_ROLL_STEP + 1, ..CellProfile::STATUS_BANNER };
        assert!(tall.validate("status").is_err());
        let edge = CellProfile { roll_step: MAX_ROLL_STEP, scroll_speed: MAX_SCROLL_SPEED, ..CellProfile::STATUS_BANNER };
        assert!(edge.validate("status").is_ok());
    }

    #[test]
    fn test_oversized_steps_saturate() {
        let mut tm = TextMetrics::default();
        let profile = CellProfile { roll_step: u32::MAX, scroll_speed: u32::MAX, ..CellProfile::CALLING_POINTS };
        let mut c = AnimatedTextCell::new("test", FontKind::Regular, profile, Size::new(40, 10));
        let mut scrolled = false;
        for _ in 0..200 {
            frame(&mut c, LONG, &mut tm);
            assert!(c.vertical_offset() <= 10);
            assert!(c.horizontal_offset() <= 0);
            scrolled |= c.phase() == Phase::PausedAtScrollEnd;
        }
        assert!(scrolled);
    }

    #[test]
    fn test_zero_steps_holds_state() {
        let mut tm = TextMetrics::default();
        let mut c = cell(100);
        let mut canvas = Bitmap::new(100, 10);
        frame(&mut c, "Reading", &mut tm);
        frame(&mut c, "Reading", &mut tm);
        frame(&mut c, "Reading", &mut tm);
        let offset = c.vertical_offset();
        assert_eq!(c.phase(), Phase::RollingUp);
        for _ in 0..10 {
            c.render_steps("Reading", &mut tm, &mut canvas, Point::zero(), 0);
        }
        assert_eq!(c.vertical_offset(), offset);

        c.render_steps("Reading", &mut tm, &mut canvas, Point::zero(), 3);
        assert_eq!(c.vertical_offset(), offset + 3);
    }
}
