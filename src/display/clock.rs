/*
 *  display/clock.rs
 *
 *  departure-board - live departures on small matrix displays
 *  (c) 2020-26 Stuart Hunter
 *
 *  Clock row and the blank-board ellipsis
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

use std::time::Duration;

use chrono::NaiveTime;
use embedded_graphics::geometry::{Point, Size};
use embedded_graphics::primitives::Rectangle;

use super::bitmap::Bitmap;
use super::fonts::FontKind;
use super::text_metrics::TextMetrics;

pub const CLOCK_ROW_Y: i32 = 50;
pub const CLOCK_ROW_HEIGHT: u32 = 14;

/// Dots appear one at a time, then the row blanks and starts again.
pub const ELLIPSIS_FRAMES: [&str; 4] = ["", ".", ".  .", ".  .  ."];
pub const ELLIPSIS_STEP: Duration = Duration::from_millis(500);

/// Which ellipsis frame to show `elapsed` after the blank board came up.
pub fn ellipsis_frame(elapsed: Duration) -> &'static str {
    let step = (elapsed.as_millis() / ELLIPSIS_STEP.as_millis()) as usize;
    ELLIPSIS_FRAMES[step % ELLIPSIS_FRAMES.len()]
}

/// Live wall clock along the bottom of the board: `HH:MM` in the large
/// face with a smaller `:SS` sitting on the same baseline.
#[derive(Debug, Clone, Copy)]
pub struct ClockRow {
    width: u32,
}

impl ClockRow {
    pub fn new(width: u32) -> Self {
        Self { width }
    }

    pub fn area(&self) -> Rectangle {
        Rectangle::new(Point::new(0, CLOCK_ROW_Y), Size::new(self.width, CLOCK_ROW_HEIGHT))
    }

    /// Draw `wall` into the clock row, returning the text shown.
    pub fn render(&self, wall: NaiveTime, metrics: &mut TextMetrics, target: &mut Bitmap) -> String {
        let hh_mm = wall.format("%H:%M").to_string();
        let ss = wall.format(":%S").to_string();

        let large = metrics.measure_and_rasterize(&hh_mm, FontKind::BoldLarge);
        let small = metrics.measure_and_rasterize(&ss, FontKind::BoldTall);
        // width of a fixed ":00" keeps the clock from shuffling sideways
        let seconds_width = metrics.width_of(":00", FontKind::BoldTall);

        let x = (self.width.saturating_sub(large.width + seconds_width) / 2) as i32;
        let seconds_y = CLOCK_ROW_Y + (large.height as i32 - small.height as i32);
        let clip = self.area();
        target.blit(&large.bitmap, Point::new(x, CLOCK_ROW_Y), &clip);
        target.blit(&small.bitmap, Point::new(x + large.width as i32, seconds_y), &clip);

        format!("{hh_mm}{ss}")
    }
}
