/*
 *  display/fonts.rs
 *
 *  departure-board - live departures on small matrix displays
 *  (c) 2020-26 Stuart Hunter
 *
 *  Font faces used on the departure board
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

use embedded_graphics::mono_font::{ascii, MonoFont};

/// The faces the board draws with.
///
/// Bold variants of the 6x10 and 6x9 faces are synthesised by drawing
/// the glyphs twice, offset one pixel to the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontKind {
    Regular,
    Bold,
    /// seconds on the clock
    BoldTall,
    /// hours and minutes on the clock
    BoldLarge,
}

impl FontKind {
    pub fn face(self) -> &'static MonoFont<'static> {
        match self {
            FontKind::Regular | FontKind::Bold => &ascii::FONT_6X10,
            FontKind::BoldTall => &ascii::FONT_6X9,
            FontKind::BoldLarge => &ascii::FONT_7X14_BOLD,
        }
    }

    pub fn synthetic_bold(self) -> bool {
        matches!(self, FontKind::Bold | FontKind::BoldTall)
    }

    pub fn line_height(self) -> u32 {
        self.face().character_size.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_heights() {
        assert_eq!(FontKind::Regular.line_height(), 10);
        assert_eq!(FontKind::Bold.line_height(), 10);
        assert_eq!(FontKind::BoldTall.line_height(), 9);
        assert_eq!(FontKind::BoldLarge.line_height(), 14);
    }

    #[test]
    fn test_bold_flags() {
        assert!(!FontKind::Regular.synthetic_bold());
        assert!(FontKind::Bold.synthetic_bold());
        assert!(!FontKind::BoldLarge.synthetic_bold());
    }
}
