/*
 *  display/row.rs
 *
 *  departure-board - live departures on small matrix displays
 *  (c) 2020-26 Stuart Hunter
 *
 *  Row slot layout: fixed measured slots around one flexible slot
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
use log::debug;

use super::error::DisplayError;
use super::fonts::FontKind;
use super::text_metrics::TextMetrics;

/// Gap between neighbouring slots of a departure row.
pub const SLOT_SPACING: u32 = 5;

// widest strings each fixed slot has to hold
pub const SAMPLE_STATUS: &str = "Exp 00:00";
pub const SAMPLE_PLATFORM: &str = "Plat 88";
pub const SAMPLE_TIME_TO_ARRIVAL: &str = "88 mins";
pub const CALLING_LABEL: &str = "Calling at: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Destination,
    TimeToArrival,
    Status,
    Platform,
    CallingLabel,
    CallingPoints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotWidth {
    Fixed(u32),
    Flexible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSpec {
    pub kind: SlotKind,
    pub width: SlotWidth,
}

impl SlotSpec {
    pub fn fixed(kind: SlotKind, width: u32) -> Self {
        Self { kind, width: SlotWidth::Fixed(width) }
    }

    pub fn flexible(kind: SlotKind) -> Self {
        Self { kind, width: SlotWidth::Flexible }
    }
}

/// Horizontal extent of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRect {
    pub kind: SlotKind,
    pub x: i32,
    pub width: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowLayout {
    slots: Vec<SlotRect>,
}

impl RowLayout {
    pub fn slots(&self) -> &[SlotRect] {
        &self.slots
    }

    pub fn slot(&self, kind: SlotKind) -> Option<SlotRect> {
        self.slots.iter().copied().find(|s| s.kind == kind)
    }

    /// The slot placed on a row whose top is `y`.
    pub fn rect(&self, kind: SlotKind, y: i32, height: u32) -> Option<Rectangle> {
        self.slot(kind)
            .map(|s| Rectangle::new(Point::new(s.x, y), Size::new(s.width, height)))
    }
}

/// Which optional slots a departure row carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowFeatures {
    pub tfl: bool,
    pub show_platform: bool,
}

/// Widths of the fixed slots, measured once from the sample strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FixedWidths {
    status: u32,
    platform: u32,
    time_to_arrival: u32,
    calling_label: u32,
}

impl FixedWidths {
    fn measure(metrics: &mut TextMetrics) -> Self {
        Self {
            status: metrics.width_of(SAMPLE_STATUS, FontKind::Regular),
            platform: metrics.width_of(SAMPLE_PLATFORM, FontKind::Regular),
            time_to_arrival: metrics.width_of(SAMPLE_TIME_TO_ARRIVAL, FontKind::Regular),
            calling_label: metrics.width_of(CALLING_LABEL, FontKind::Regular),
        }
    }
}

/// Lays slots out left to right. Exactly one slot is flexible and takes
/// whatever the fixed slots and the gaps between them leave over.
pub fn compose(width: u32, specs: &[SlotSpec], spacing: u32) -> Result<RowLayout, DisplayError> {
    let flexible = specs.iter().filter(|s| s.width == SlotWidth::Flexible).count();
    if flexible != 1 {
        return Err(DisplayError::invalid(format!(
            "a row needs exactly one flexible slot, found {flexible}"
        )));
    }
    let fixed: u32 = specs
        .iter()
        .map(|s| match s.width {
            SlotWidth::Fixed(w) => w,
            SlotWidth::Flexible => 0,
        })
        .sum();
    let gaps = spacing * (specs.len() as u32).saturating_sub(1);
    let required = fixed + gaps;
    if required > width {
        return Err(DisplayError::Layout { required, available: width });
    }
    let remainder = width - required;

    let mut slots = Vec::with_capacity(specs.len());
    let mut x = 0i32;
    for spec in specs {
        let w = match spec.width {
            SlotWidth::Fixed(w) => w,
            SlotWidth::Flexible => remainder,
        };
        slots.push(SlotRect { kind: spec.kind, x, width: w });
        x += (w + spacing) as i32;
    }
    Ok(RowLayout { slots })
}

/// Departure and calling-point row layouts for one viewport width.
///
/// The layouts are computed at construction and again only when the
/// feature set changes, so offsets stay put across frames.
#[derive(Debug, Clone)]
pub struct RowComposer {
    width: u32,
    features: RowFeatures,
    widths: FixedWidths,
    departure: RowLayout,
    calling: RowLayout,
}

impl RowComposer {
    pub fn new(width: u32, features: RowFeatures, metrics: &mut TextMetrics) -> Result<Self, DisplayError> {
        let widths = FixedWidths::measure(metrics);
        let departure = departure_layout(width, features, &widths)?;
        let calling = compose(
            width,
            &[
                SlotSpec::fixed(SlotKind::CallingLabel, widths.calling_label),
                SlotSpec::flexible(SlotKind::CallingPoints),
            ],
            0,
        )?;
        debug!("row layout {:?}: {:?}", features, departure.slots());
        Ok(Self { width, features, widths, departure, calling })
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn features(&self) -> RowFeatures { self.features }
    pub fn departure_row(&self) -> &RowLayout { &self.departure }
    pub fn calling_row(&self) -> &RowLayout { &self.calling }

    /// Returns true when the departure layout had to be recomputed.
    pub fn set_features(&mut self, features: RowFeatures) -> Result<bool, DisplayError> {
        if features == self.features {
            return Ok(false);
        }
        self.departure = departure_layout(self.width, features, &self.widths)?;
        self.features = features;
        debug!("row layout {:?}: {:?}", features, self.departure.slots());
        Ok(true)
    }
}

fn departure_layout(width: u32, features: RowFeatures, widths: &FixedWidths) -> Result<RowLayout, DisplayError> {
    let mut specs = vec![SlotSpec::flexible(SlotKind::Destination)];
    if features.tfl {
        specs.push(SlotSpec::fixed(SlotKind::TimeToArrival, widths.time_to_arrival));
    }
    specs.push(SlotSpec::fixed(SlotKind::Status, widths.status));
    if features.show_platform {
        specs.push(SlotSpec::fixed(SlotKind::Platform, widths.platform));
    }
    compose(width, &specs, SLOT_SPACING)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer(features: RowFeatures) -> RowComposer {
        let mut tm = TextMetrics::default();
        RowComposer::new(256, features, &mut tm).unwrap()
    }

    #[test]
    fn test_tfl_row_with_platform() {
        let rc = composer(RowFeatures { tfl: true, show_platform: true });
        let row = rc.departure_row();
        let kinds: Vec<SlotKind> = row.slots().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![SlotKind::Destination, SlotKind::TimeToArrival, SlotKind::Status, SlotKind::Platform]
        );
        assert_eq!(row.slot(SlotKind::Platform).unwrap().x, 214);
        assert_eq!(row.slot(SlotKind::Status).unwrap().x, 155);
        assert_eq!(row.slot(SlotKind::TimeToArrival).unwrap().x, 108);
        assert_eq!(row.slot(SlotKind::Destination).unwrap().width, 103);
    }

    #[test]
    fn test_rail_row_with_platform() {
        let rc = composer(RowFeatures { tfl: false, show_platform: true });
        let row = rc.departure_row();
        assert!(row.slot(SlotKind::TimeToArrival).is_none());
        assert_eq!(row.slot(SlotKind::Destination).unwrap().width, 150);
        let platform = row.slot(SlotKind::Platform).unwrap();
        assert_eq!(platform.x as u32 + platform.width, 256);
    }

    #[test]
    fn test_rail_row_without_platform() {
        let rc = composer(RowFeatures::default());
        let row = rc.departure_row();
        assert!(row.slot(SlotKind::Platform).is_none());
        let status = row.slot(SlotKind::Status).unwrap();
        assert_eq!(status.x, 202);
        assert_eq!(row.slot(SlotKind::Destination).unwrap().width, 197);
    }

    #[test]
    fn test_slots_never_overlap() {
        for tfl in [false, true] {
            for show_platform in [false, true] {
                let rc = composer(RowFeatures { tfl, show_platform });
                let slots = rc.departure_row().slots();
                for pair in slots.windows(2) {
                    assert!(pair[0].x + pair[0].width as i32 + SLOT_SPACING as i32 <= pair[1].x);
                }
                let last = slots[slots.len() - 1];
                assert_eq!(last.x as u32 + last.width, 256);
            }
        }
    }

    #[test]
    fn test_calling_row() {
        let rc = composer(RowFeatures::default());
        let row = rc.calling_row();
        assert_eq!(row.slot(SlotKind::CallingLabel).unwrap().width, 72);
        let points = row.slot(SlotKind::CallingPoints).unwrap();
        assert_eq!((points.x, points.width), (72, 184));
    }

    #[test]
    fn test_set_features_recomputes_only_on_change() {
        let mut rc = composer(RowFeatures::default());
        assert!(!rc.set_features(RowFeatures::default()).unwrap());
        assert!(rc.set_features(RowFeatures { tfl: false, show_platform: true }).unwrap());
        assert!(rc.departure_row().slot(SlotKind::Platform).is_some());
    }

    #[test]
    fn test_fixed_slots_too_wide() {
        let mut tm = TextMetrics::default();
        let err = RowComposer::new(100, RowFeatures { tfl: true, show_platform: true }, &mut tm).unwrap_err();
        assert!(matches!(err, DisplayError::Layout { required: 153, available: 100 }));
    }

    #[test]
    fn test_compose_needs_one_flexible_slot() {
        let specs = [SlotSpec::fixed(SlotKind::Status, 10), SlotSpec::fixed(SlotKind::Platform, 10)];
        assert!(matches!(compose(100, &specs, 5), Err(DisplayError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rect_places_slot_on_row() {
        let rc = composer(RowFeatures::default());
        let r = rc.departure_row().rect(SlotKind::Status, 24, 10).unwrap();
        assert_eq!(r.top_left, Point::new(202, 24));
        assert_eq!(r.size, Size::new(54, 10));
    }
}
