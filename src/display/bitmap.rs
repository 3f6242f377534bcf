/*
 *  display/bitmap.rs
 *
 *  departure-board - live departures on small matrix displays
 *  (c) 2020-26 Stuart Hunter
 *
 *  Runtime-sized monochrome raster used for text bitmaps and whole frames
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

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{ContainsPoint, Rectangle};

/// A runtime-sized monochrome bitmap for embedded-graphics.
///
/// Used both for the memoized text rasters and for the composited frame
/// that is handed to a display sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    buf: Vec<BinaryColor>,
    w: usize,
    h: usize,
}

impl Bitmap {
    pub fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![BinaryColor::Off; w * h], w, h }
    }

    pub fn width(&self) -> u32 { self.w as u32 }
    pub fn height(&self) -> u32 { self.h as u32 }

    /// Blank every pixel
    pub fn clear_off(&mut self) {
        self.buf.fill(BinaryColor::Off);
    }

    /// Map (x,y) to linear index; returns None if out of bounds
    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<BinaryColor> {
        self.idx(Point::new(x, y)).map(|i| self.buf[i])
    }

    pub fn is_on(&self, x: i32, y: i32) -> bool {
        self.pixel(x, y).is_some_and(|c| c.is_on())
    }

    pub fn count_on(&self) -> usize {
        self.buf.iter().filter(|c| c.is_on()).count()
    }

    /// Count lit pixels inside `area` (clipped to the bitmap)
    pub fn count_on_in(&self, area: &Rectangle) -> usize {
        let area = self.bounding_box().intersection(area);
        area.points().filter(|p| self.idx(*p).is_some_and(|i| self.buf[i].is_on())).count()
    }

    /// OR the lit pixels of `src` onto this bitmap with its top-left at `at`,
    /// touching nothing outside `clip`.
    pub fn blit(&mut self, src: &Bitmap, at: Point, clip: &Rectangle) {
        let bounds = self.bounding_box().intersection(clip);
        if bounds.is_zero_sized() || src.w == 0 || src.h == 0 {
            return;
        }
        for sy in 0..src.h {
            for sx in 0..src.w {
                if src.buf[sy * src.w + sx].is_off() {
                    continue;
                }
                let p = at + Point::new(sx as i32, sy as i32);
                if !bounds.contains(p) {
                    continue;
                }
                if let Some(i) = self.idx(p) {
                    self.buf[i] = BinaryColor::On;
                }
            }
        }
    }

    /// Plain PBM (P1) rendition, handy for previews and visual debugging
    pub fn to_pbm(&self) -> String {
        let mut out = String::with_capacity(self.buf.len() * 2 + 16);
        out.push_str("P1\n");
        out.push_str(&format!("{} {}\n", self.w, self.h));
        for row in self.buf.chunks(self.w.max(1)) {
            let line: Vec<&str> = row
                .iter()
                .map(|p| if p.is_on() { "1" } else { "0" })
                .collect();
            out.push_str(&line.join(" "));
            out.push('\n');
        }
        out
    }
}

impl OriginDimensions for Bitmap {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl DrawTarget for Bitmap {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.buf.fill(color);
        Ok(())
    }
}
