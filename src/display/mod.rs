/*
 *  display/mod.rs
 *
 *  departure-board - live departures on small matrix displays
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem: text rendering, animation and frame composition
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

// Core types
pub mod error;
pub mod bitmap;
pub mod fonts;
pub mod text_metrics;

// Animation and layout
pub mod cell;
pub mod row;
pub mod rotation;
pub mod clock;

// Frame composition
pub mod viewport;

// Output
pub mod sink;

// Re-exports for convenience
pub use error::DisplayError;
pub use bitmap::Bitmap;
pub use fonts::FontKind;
pub use text_metrics::{RenderedText, TextMetrics};
pub use cell::{AnimatedTextCell, CellProfile, Phase};
pub use row::{RowComposer, RowFeatures, RowLayout, SlotKind};
pub use rotation::{
    calculate_scroll_duration, AlternationStep, ContentRotationPolicy, RotationSettings, StepClock, ANIMATION_TICK,
};
pub use clock::ClockRow;
pub use viewport::{AnimationProfiles, BoardMode, BoardSettings, Hotspot, HotspotKind, Tick, ViewportComposer};
pub use sink::{DisplaySink, MockSink, NullSink, PbmSink};
