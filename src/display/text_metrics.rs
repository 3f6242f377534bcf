/*
 *  display/text_metrics.rs
 *
 *  departure-board - live departures on small matrix displays
 *  (c) 2020-26 Stuart Hunter
 *
 *  Memoized text measurement and rasterization
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

use std::sync::Arc;

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::renderer::TextRenderer;
use embedded_graphics::text::{Baseline, Text};
use log::debug;
use mini_moka::sync::{Cache, ConcurrentCacheExt};

use super::bitmap::Bitmap;
use super::fonts::FontKind;

pub const DEFAULT_CACHE_CAPACITY: u64 = 256;

/// A string drawn once in a given face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedText {
    pub width: u32,
    pub height: u32,
    pub bitmap: Bitmap,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Width/height measurement and rasterization keyed on `(text, font)`.
///
/// Bounded so an endless stream of distinct destination strings cannot
/// grow it without limit.
pub struct TextMetrics {
    cache: Cache<(String, FontKind), Arc<RenderedText>>,
    stats: CacheStats,
}

impl TextMetrics {
    pub fn new(capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(capacity.max(1)).build();
        Self { cache, stats: CacheStats::default() }
    }

    pub fn measure_and_rasterize(&mut self, text: &str, font: FontKind) -> Arc<RenderedText> {
        let key = (text.to_string(), font);
        if let Some(hit) = self.cache.get(&key) {
            self.stats.hits += 1;
            return hit;
        }
        self.stats.misses += 1;
        let rendered = Arc::new(rasterize(text, font));
        self.cache.insert(key, Arc::clone(&rendered));
        rendered
    }

    pub fn width_of(&mut self, text: &str, font: FontKind) -> u32 {
        self.measure_and_rasterize(text, font).width
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Entries currently held, after flushing the cache's pending
    /// housekeeping so evictions are counted.
    pub fn cached_entries(&self) -> u64 {
        self.cache.sync();
        self.cache.entry_count()
    }

    pub fn log_stats(&self) {
        debug!(
            "text cache: {} entries, {} hits, {} misses",
            self.cached_entries(),
            self.stats.hits,
            self.stats.misses
        );
    }
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

/// Pixel width of `text` in `font` without touching any cache.
pub fn measure(text: &str, font: FontKind) -> u32 {
    let style = MonoTextStyle::new(font.face(), BinaryColor::On);
    let width = style
        .measure_string(text, Point::zero(), Baseline::Top)
        .bounding_box
        .size
        .width;
    if width > 0 && font.synthetic_bold() { width + 1 } else { width }
}

fn rasterize(text: &str, font: FontKind) -> RenderedText {
    let width = measure(text, font);
    let height = font.line_height();
    let mut bitmap = Bitmap::new(width, height);
    if width > 0 {
        let style = MonoTextStyle::new(font.face(), BinaryColor::On);
        let _ = Text::with_baseline(text, Point::zero(), style, Baseline::Top).draw(&mut bitmap);
        if font.synthetic_bold() {
            let _ = Text::with_baseline(text, Point::new(1, 0), style, Baseline::Top).draw(&mut bitmap);
        }
    }
    RenderedText { width, height, bitmap }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_pitch_widths() {
        let mut tm = TextMetrics::default();
        assert_eq!(tm.width_of("Exp 00:00", FontKind::Regular), 54);
        assert_eq!(tm.width_of("Plat 88", FontKind::Regular), 42);
        assert_eq!(tm.width_of("88 mins", FontKind::Regular), 42);
        assert_eq!(tm.width_of("Calling at: ", FontKind::Regular), 72);
    }

    #[test]
    fn test_bold_is_one_pixel_wider() {
        let mut tm = TextMetrics::default();
        assert_eq!(tm.width_of("London", FontKind::Bold), 37);
        assert_eq!(tm.width_of("", FontKind::Bold), 0);
    }

    #[test]
    fn test_empty_text() {
        let mut tm = TextMetrics::default();
        let r = tm.measure_and_rasterize("", FontKind::Regular);
        assert_eq!(r.width, 0);
        assert_eq!(r.height, 10);
        assert_eq!(r.bitmap.count_on(), 0);
    }

    #[test]
    fn test_rasterized_text_has_ink() {
        let mut tm = TextMetrics::default();
        let r = tm.measure_and_rasterize("Reading", FontKind::Regular);
        assert_eq!(r.bitmap.width(), 42);
        assert!(r.bitmap.count_on() > 0);
    }

    #[test]
    fn test_cache_hits_and_misses() {
        let mut tm = TextMetrics::default();
        let a = tm.measure_and_rasterize("Plat 4", FontKind::Regular);
        let b = tm.measure_and_rasterize("Plat 4", FontKind::Regular);
        assert!(Arc::ptr_eq(&a, &b));
        tm.measure_and_rasterize("Plat 4", FontKind::Bold);
        assert_eq!(tm.stats(), CacheStats { hits: 1, misses: 2 });
    }

    #[test]
    fn test_cache_stays_within_capacity() {
        let mut tm = TextMetrics::new(8);
        for i in 0..200 {
            let dest = format!("Destination {i}");
            assert_eq!(tm.width_of(&dest, FontKind::Regular), measure(&dest, FontKind::Regular));
        }
        assert!(tm.cached_entries() <= 8, "{} entries", tm.cached_entries());
        assert_eq!(tm.stats().misses, 200);
        // evicted strings still measure correctly
        assert_eq!(tm.width_of("Destination 0", FontKind::Regular), 78);
    }

    #[test]
    fn test_measure_matches_cache() {
        let mut tm = TextMetrics::default();
        assert_eq!(measure("On time", FontKind::Regular), tm.width_of("On time", FontKind::Regular));
    }
}
