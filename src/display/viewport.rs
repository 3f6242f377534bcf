/*
 *  display/viewport.rs
 *
 *  departure-board - live departures on small matrix displays
 *  (c) 2020-26 Stuart Hunter
 *
 *  Composes every row of the board into one frame per tick
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

use chrono::{Local, NaiveTime};
use embedded_graphics::geometry::{Point, Size};
use embedded_graphics::primitives::Rectangle;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::departure::Departure;
use crate::feed::BoardSnapshot;

use super::bitmap::Bitmap;
use super::cell::{AnimatedTextCell, CellProfile};
use super::clock::{ellipsis_frame, ClockRow, CLOCK_ROW_HEIGHT, CLOCK_ROW_Y, ELLIPSIS_FRAMES};
use super::error::DisplayError;
use super::fonts::FontKind;
use super::rotation::{ContentRotationPolicy, RotationSettings, StepClock};
use super::row::{RowComposer, RowFeatures, SlotKind, CALLING_LABEL};
use super::text_metrics::TextMetrics;

pub const ROW_HEIGHT: u32 = 10;
/// Top edge of the four text rows.
pub const ROW_Y: [i32; 4] = [0, 12, 24, 36];

pub const SPLASH_TITLE: &str = "UK Train Departure Display";
pub const SPLASH_POWERED_BY: &str = "Powered by";
pub const WELCOME: &str = "Welcome to";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardMode {
    #[default]
    Rail,
    Tfl,
}

impl BoardMode {
    pub fn attribution(self) -> &'static str {
        match self {
            BoardMode::Rail => "National Rail Enquiries",
            BoardMode::Tfl => "Transport for London",
        }
    }
}

/// Animation tuning per kind of animated cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationProfiles {
    pub calling_points: CellProfile,
    pub tfl_calling_points: CellProfile,
    pub alternating_row: CellProfile,
    pub status_banner: CellProfile,
}

impl Default for AnimationProfiles {
    fn default() -> Self {
        Self {
            calling_points: CellProfile::CALLING_POINTS,
            tfl_calling_points: CellProfile::TFL_CALLING_POINTS,
            alternating_row: CellProfile::ALTERNATING_ROW,
            status_banner: CellProfile::STATUS_BANNER,
        }
    }
}

impl AnimationProfiles {
    pub fn validate(&self) -> Result<(), DisplayError> {
        self.calling_points.validate("calling_points")?;
        self.tfl_calling_points.validate("tfl_calling_points")?;
        self.alternating_row.validate("alternating_row")?;
        self.status_banner.validate("status_banner")
    }
}

/// Everything the composer needs to know about the board it draws.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSettings {
    pub width: u32,
    pub height: u32,
    pub mode: BoardMode,
    pub first_departure_bold: bool,
    pub show_departure_numbers: bool,
    pub show_platform: bool,
    pub profiles: AnimationProfiles,
    pub rotation: RotationSettings,
    pub text_cache_capacity: u64,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            width: 256,
            height: 64,
            mode: BoardMode::Rail,
            first_departure_bold: true,
            show_departure_numbers: true,
            show_platform: true,
            profiles: AnimationProfiles::default(),
            rotation: RotationSettings::default(),
            text_cache_capacity: 512,
        }
    }
}

impl BoardSettings {
    pub fn validate(&self) -> Result<(), DisplayError> {
        if self.width == 0 || self.height == 0 {
            return Err(DisplayError::invalid(format!(
                "viewport must not be empty, got {}x{}",
                self.width, self.height
            )));
        }
        let needed = (CLOCK_ROW_Y as u32) + CLOCK_ROW_HEIGHT;
        if self.height < needed {
            return Err(DisplayError::invalid(format!(
                "viewport height {} leaves no room for four rows and the clock ({needed} needed)",
                self.height
            )));
        }
        self.profiles.validate()?;
        if self.rotation.alternation_enabled && self.rotation.alternation_interval.is_zero() {
            return Err(DisplayError::invalid("alternating row interval must be non-zero"));
        }
        if self.text_cache_capacity == 0 {
            return Err(DisplayError::invalid("text cache capacity must be non-zero"));
        }
        Ok(())
    }

    fn features(&self) -> RowFeatures {
        RowFeatures { tfl: self.mode == BoardMode::Tfl, show_platform: self.show_platform }
    }

    fn calling_profile(&self) -> CellProfile {
        match self.mode {
            BoardMode::Rail => self.profiles.calling_points,
            BoardMode::Tfl => self.profiles.tfl_calling_points,
        }
    }
}

/// The instant a frame is drawn for, plus the wall-clock time the clock
/// row shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub at: Instant,
    pub wall: NaiveTime,
}

impl Tick {
    pub fn now() -> Self {
        Self { at: Instant::now(), wall: Local::now().time() }
    }

    /// The tick `d` later, both clocks advanced together.
    pub fn advanced(&self, d: Duration) -> Self {
        let wall = self.wall + chrono::Duration::from_std(d).unwrap_or(chrono::Duration::zero());
        Self { at: self.at + d, wall }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotspotKind {
    Destination,
    TimeToArrival,
    Status,
    Platform,
    CallingLabel,
    CallingPoints,
    AlternatingRow,
    StatusBanner,
    Welcome,
    Station,
    Ellipsis,
    Clock,
    Splash,
}

/// A named region drawn this frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotspot {
    pub row: usize,
    pub kind: HotspotKind,
    pub area: Rectangle,
    pub text: String,
}

#[derive(Debug, Clone, Copy)]
enum Align {
    Left,
    Right,
    Centre,
}

/// Draw `text` inside `area`, clipped to it.
fn draw_static(metrics: &mut TextMetrics, frame: &mut Bitmap, text: &str, font: FontKind, area: Rectangle, align: Align) {
    let rendered = metrics.measure_and_rasterize(text, font);
    let slack = (area.size.width as i32 - rendered.width as i32).max(0);
    let dx = match align {
        Align::Left => 0,
        Align::Right => slack,
        Align::Centre => slack / 2,
    };
    frame.blit(&rendered.bitmap, area.top_left + Point::new(dx, 0), &area);
}

fn row_area(width: u32, row: usize) -> Rectangle {
    Rectangle::new(Point::new(0, ROW_Y[row]), Size::new(width, ROW_HEIGHT))
}

/// Owns every animated cell on the board and composites them, plus the
/// static columns and the clock, into one frame per call.
pub struct ViewportComposer {
    settings: BoardSettings,
    metrics: TextMetrics,
    rows: RowComposer,
    clock: ClockRow,
    rotation: ContentRotationPolicy,
    step_clock: StepClock,
    // animation steps owed by the frame being drawn
    steps: u32,
    calling_cell: AnimatedTextCell,
    alternating_cell: AnimatedTextCell,
    status_cell: AnimatedTextCell,
    frame: Bitmap,
    hotspots: Vec<Hotspot>,
    last_departure_count: Option<usize>,
    blank_since: Option<Instant>,
    status_was_showing: bool,
    frames_rendered: u64,
}

impl ViewportComposer {
    pub fn new(settings: BoardSettings) -> Result<Self, DisplayError> {
        settings.validate()?;
        let mut metrics = TextMetrics::new(settings.text_cache_capacity);
        let rows = RowComposer::new(settings.width, settings.features(), &mut metrics)?;

        let points = rows
            .calling_row()
            .slot(SlotKind::CallingPoints)
            .map_or(Size::new(settings.width, ROW_HEIGHT), |s| Size::new(s.width, ROW_HEIGHT));
        let destination = rows
            .departure_row()
            .slot(SlotKind::Destination)
            .map_or(Size::new(settings.width, ROW_HEIGHT), |s| Size::new(s.width, ROW_HEIGHT));
        let full = Size::new(settings.width, ROW_HEIGHT);

        let calling_cell =
            AnimatedTextCell::new("calling_points", FontKind::Regular, settings.calling_profile(), points);
        let alternating_cell =
            AnimatedTextCell::new("alternating_row", FontKind::Regular, settings.profiles.alternating_row, destination);
        let status_cell =
            AnimatedTextCell::new("status_banner", FontKind::Regular, settings.profiles.status_banner, full).one_shot();

        info!(
            "board {}x{}, {:?} mode, platform {}, status {}",
            settings.width,
            settings.height,
            settings.mode,
            if settings.show_platform { "shown" } else { "hidden" },
            if settings.rotation.status_enabled { "enabled" } else { "disabled" }
        );

        Ok(Self {
            clock: ClockRow::new(settings.width),
            rotation: ContentRotationPolicy::new(settings.rotation),
            step_clock: StepClock::default(),
            steps: 0,
            frame: Bitmap::new(settings.width, settings.height),
            settings,
            metrics,
            rows,
            calling_cell,
            alternating_cell,
            status_cell,
            hotspots: Vec::new(),
            last_departure_count: None,
            blank_since: None,
            status_was_showing: false,
            frames_rendered: 0,
        })
    }

    pub fn settings(&self) -> &BoardSettings { &self.settings }
    pub fn metrics(&self) -> &TextMetrics { &self.metrics }
    pub fn rows(&self) -> &RowComposer { &self.rows }
    pub fn rotation(&self) -> &ContentRotationPolicy { &self.rotation }
    pub fn calling_cell(&self) -> &AnimatedTextCell { &self.calling_cell }
    pub fn alternating_cell(&self) -> &AnimatedTextCell { &self.alternating_cell }
    pub fn status_cell(&self) -> &AnimatedTextCell { &self.status_cell }
    pub fn frame(&self) -> &Bitmap { &self.frame }
    pub fn frames_rendered(&self) -> u64 { self.frames_rendered }

    /// Regions drawn by the last render call.
    pub fn hotspots(&self) -> &[Hotspot] {
        &self.hotspots
    }

    pub fn hotspot(&self, row: usize, kind: HotspotKind) -> Option<&Hotspot> {
        self.hotspots.iter().find(|h| h.row == row && h.kind == kind)
    }

    /// Switch board mode or the platform column at runtime.
    pub fn set_features(&mut self, mode: BoardMode, show_platform: bool) -> Result<(), DisplayError> {
        let mut next = self.settings.clone();
        next.mode = mode;
        next.show_platform = show_platform;
        if self.rows.set_features(next.features())? {
            self.settings = next;
            self.calling_cell.set_profile(self.settings.calling_profile());
            self.alternating_cell.reset();
            self.rotation.reset_alternation();
        }
        Ok(())
    }

    /// Startup screen: title, "Powered by" and the data attribution.
    pub fn render_splash(&mut self, _tick: &Tick) -> &Bitmap {
        self.frame.clear_off();
        self.hotspots.clear();
        let width = self.settings.width;
        let lines = [(0, SPLASH_TITLE), (2, SPLASH_POWERED_BY), (3, self.settings.mode.attribution())];
        for (row, text) in lines {
            let area = row_area(width, row);
            draw_static(&mut self.metrics, &mut self.frame, text, FontKind::Bold, area, Align::Centre);
            self.hotspots.push(Hotspot { row, kind: HotspotKind::Splash, area, text: text.to_string() });
        }
        &self.frame
    }

    /// Draw one frame of `board`. Animated cells advance by however many
    /// animation ticks have passed since the previous frame.
    pub fn render(&mut self, board: &BoardSnapshot, tick: &Tick) -> &Bitmap {
        self.frame.clear_off();
        self.hotspots.clear();

        let count = board.departures.len();
        self.steps = self.step_clock.steps_due(tick.at);
        self.track_departure_count(count, tick.at);
        if count == 0 {
            self.render_blank(&board.station_name, tick.at);
        } else {
            self.render_rows(board, tick.at);
        }
        self.render_clock(tick.wall);

        self.frames_rendered += 1;
        trace!("frame {} with {} departures", self.frames_rendered, count);
        &self.frame
    }

    fn track_departure_count(&mut self, count: usize, now: Instant) {
        let previous = self.last_departure_count.replace(count);
        if previous != Some(count) {
            debug!("departures {:?} -> {}", previous, count);
            if count < 3 {
                self.rotation.cancel_rotation();
                self.status_was_showing = false;
                self.status_cell.reset();
                self.alternating_cell.reset();
                self.rotation.reset_alternation();
            }
            if count == 0 {
                self.calling_cell.reset();
            }
        }
        if count == 0 {
            self.blank_since.get_or_insert(now);
        } else {
            self.blank_since = None;
        }
    }

    fn render_blank(&mut self, station: &str, now: Instant) {
        let width = self.settings.width;

        let area = row_area(width, 0);
        draw_static(&mut self.metrics, &mut self.frame, WELCOME, FontKind::Bold, area, Align::Centre);
        self.hotspots.push(Hotspot { row: 0, kind: HotspotKind::Welcome, area, text: WELCOME.to_string() });

        let area = row_area(width, 1);
        draw_static(&mut self.metrics, &mut self.frame, station, FontKind::Bold, area, Align::Centre);
        self.hotspots.push(Hotspot { row: 1, kind: HotspotKind::Station, area, text: station.to_string() });

        // anchor on the full ellipsis so the dots grow in place
        let full = ELLIPSIS_FRAMES[ELLIPSIS_FRAMES.len() - 1];
        let full_width = self.metrics.width_of(full, FontKind::Bold);
        let x = (width.saturating_sub(full_width) / 2) as i32;
        let area = Rectangle::new(Point::new(x, ROW_Y[2]), Size::new(width - x as u32, ROW_HEIGHT));
        let dots = ellipsis_frame(self.blank_since.map_or(Duration::ZERO, |t| now.saturating_duration_since(t)));
        draw_static(&mut self.metrics, &mut self.frame, dots, FontKind::Bold, area, Align::Left);
        self.hotspots.push(Hotspot { row: 2, kind: HotspotKind::Ellipsis, area, text: dots.to_string() });
    }

    fn render_rows(&mut self, board: &BoardSnapshot, now: Instant) {
        let departures = &board.departures;
        let count = departures.len();

        let first_font = if self.settings.first_departure_bold { FontKind::Bold } else { FontKind::Regular };
        self.render_departure_row(0, &departures[0], 1, first_font, false);
        self.render_calling_row(board.calling_points());

        let status_text = board.line_status.as_deref();
        let metrics = &mut self.metrics;
        let showing = self
            .rotation
            .should_show_status(count, status_text, now, |t| metrics.width_of(t, FontKind::Regular));

        if showing != self.status_was_showing {
            // either edge replays the rows that change hands
            self.status_cell.reset();
            self.alternating_cell.reset();
            self.rotation.reset_alternation();
            self.status_was_showing = showing;
        }

        if showing {
            if self.settings.rotation.alternation_enabled {
                let step = self.rotation.should_alternate_departure(now);
                if step.switched {
                    self.alternating_cell.reset();
                }
                self.render_departure_row(2, &departures[step.index], step.index + 1, FontKind::Regular, true);
            } else {
                self.render_departure_row(2, &departures[1], 2, FontKind::Regular, false);
            }
            self.render_status_banner();
        } else {
            for (row, departure) in departures.iter().enumerate().skip(1).take(2) {
                self.render_departure_row(row + 1, departure, row + 1, FontKind::Regular, false);
            }
        }
    }

    fn render_departure_row(&mut self, row: usize, departure: &Departure, pos: usize, font: FontKind, animated: bool) {
        let y = ROW_Y[row];
        let numbered = self.settings.show_departure_numbers;
        for slot in self.rows.departure_row().slots() {
            let area = Rectangle::new(Point::new(slot.x, y), Size::new(slot.width, ROW_HEIGHT));
            let (kind, text) = match slot.kind {
                SlotKind::Destination => {
                    let label = departure.destination_label(pos, numbered);
                    if animated {
                        self.alternating_cell.set_viewport(area.size);
                        let (metrics, frame) = (&mut self.metrics, &mut self.frame);
                        self.alternating_cell.render_steps(&label, metrics, frame, area.top_left, self.steps);
                        (HotspotKind::AlternatingRow, label)
                    } else {
                        draw_static(&mut self.metrics, &mut self.frame, &label, font, area, Align::Left);
                        (HotspotKind::Destination, label)
                    }
                }
                SlotKind::TimeToArrival => {
                    let tta = departure.time_to_arrival();
                    draw_static(&mut self.metrics, &mut self.frame, tta, FontKind::Regular, area, Align::Left);
                    (HotspotKind::TimeToArrival, tta.to_string())
                }
                SlotKind::Status => {
                    let status = departure.service_status();
                    draw_static(&mut self.metrics, &mut self.frame, &status, FontKind::Regular, area, Align::Right);
                    (HotspotKind::Status, status)
                }
                SlotKind::Platform => {
                    let Some(platform) = departure.platform_label() else {
                        continue;
                    };
                    draw_static(&mut self.metrics, &mut self.frame, &platform, FontKind::Regular, area, Align::Left);
                    (HotspotKind::Platform, platform)
                }
                SlotKind::CallingLabel | SlotKind::CallingPoints => continue,
            };
            self.hotspots.push(Hotspot { row, kind, area, text });
        }
    }

    fn render_calling_row(&mut self, points: &str) {
        let y = ROW_Y[1];
        if let Some(area) = self.rows.calling_row().rect(SlotKind::CallingLabel, y, ROW_HEIGHT) {
            draw_static(&mut self.metrics, &mut self.frame, CALLING_LABEL, FontKind::Regular, area, Align::Left);
            self.hotspots.push(Hotspot {
                row: 1,
                kind: HotspotKind::CallingLabel,
                area,
                text: CALLING_LABEL.to_string(),
            });
        }
        if let Some(area) = self.rows.calling_row().rect(SlotKind::CallingPoints, y, ROW_HEIGHT) {
            self.calling_cell.set_viewport(area.size);
            self.calling_cell.render_steps(points, &mut self.metrics, &mut self.frame, area.top_left, self.steps);
            self.hotspots.push(Hotspot { row: 1, kind: HotspotKind::CallingPoints, area, text: points.to_string() });
        }
    }

    fn render_status_banner(&mut self) {
        let Some(text) = self.rotation.current_status_text().map(str::to_string) else {
            return;
        };
        let area = row_area(self.settings.width, 3);
        self.status_cell.render_steps(&text, &mut self.metrics, &mut self.frame, area.top_left, self.steps);
        self.hotspots.push(Hotspot { row: 3, kind: HotspotKind::StatusBanner, area, text });
    }

    fn render_clock(&mut self, wall: NaiveTime) {
        let text = self.clock.render(wall, &mut self.metrics, &mut self.frame);
        self.hotspots.push(Hotspot { row: 4, kind: HotspotKind::Clock, area: self.clock.area(), text });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick() -> Tick {
        Tick { at: Instant::now(), wall: NaiveTime::from_hms_opt(10, 0, 0).unwrap() }
    }

    fn departure(dest: &str, aimed: &str, expected: &str, platform: &str) -> Departure {
        Departure {
            destination_name: dest.into(),
            platform: Some(platform.into()),
            aimed_departure_time: aimed.into(),
            expected_departure_time: expected.into(),
            calling_at_list: format!("Twyford and {dest}"),
            ..Default::default()
        }
    }

    fn board(n: usize) -> BoardSnapshot {
        let all = [
            departure("London Paddington", "10:15", "On time", "4"),
            departure("Oxford", "10:21", "10:25", "7"),
            departure("Didcot Parkway", "10:30", "Cancelled", "9"),
        ];
        BoardSnapshot {
            station_name: "Reading".into(),
            departures: all.into_iter().take(n).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_settings_validation() {
        assert!(BoardSettings::default().validate().is_ok());
        let small = BoardSettings { height: 32, ..BoardSettings::default() };
        assert!(matches!(small.validate(), Err(DisplayError::InvalidConfiguration(_))));
        let empty = BoardSettings { width: 0, ..BoardSettings::default() };
        assert!(ViewportComposer::new(empty).is_err());
    }

    #[test]
    fn test_row_layout_error_is_fatal() {
        let narrow = BoardSettings { width: 100, mode: BoardMode::Tfl, ..BoardSettings::default() };
        assert!(matches!(ViewportComposer::new(narrow), Err(DisplayError::Layout { .. })));
    }

    #[test]
    fn test_frame_matches_viewport() {
        let mut vc = ViewportComposer::new(BoardSettings::default()).unwrap();
        let frame = vc.render(&board(3), &tick());
        assert_eq!((frame.width(), frame.height()), (256, 64));
    }

    #[test]
    fn test_first_row_strings() {
        let mut vc = ViewportComposer::new(BoardSettings::default()).unwrap();
        vc.render(&board(3), &tick());
        assert_eq!(vc.hotspot(0, HotspotKind::Destination).unwrap().text, "1st  10:15  London Paddington");
        assert_eq!(vc.hotspot(0, HotspotKind::Status).unwrap().text, "On time");
        assert_eq!(vc.hotspot(0, HotspotKind::Platform).unwrap().text, "Plat 4");
        assert_eq!(vc.hotspot(2, HotspotKind::Status).unwrap().text, "Exp 10:25");
        assert_eq!(vc.hotspot(3, HotspotKind::Status).unwrap().text, "Cancelled");
    }

    #[test]
    fn test_hotspots_do_not_overlap() {
        let settings = BoardSettings { mode: BoardMode::Tfl, ..BoardSettings::default() };
        let mut vc = ViewportComposer::new(settings).unwrap();
        vc.render(&board(3), &tick());
        let spots = vc.hotspots();
        for (i, a) in spots.iter().enumerate() {
            for b in &spots[i + 1..] {
                assert!(
                    a.area.intersection(&b.area).is_zero_sized(),
                    "{:?} overlaps {:?}",
                    a.kind,
                    b.kind
                );
            }
        }
    }

    #[test]
    fn test_splash_screen() {
        let settings = BoardSettings { mode: BoardMode::Tfl, ..BoardSettings::default() };
        let mut vc = ViewportComposer::new(settings).unwrap();
        let frame = vc.render_splash(&tick());
        assert!(frame.count_on() > 0);
        let texts: Vec<&str> = vc.hotspots().iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, [SPLASH_TITLE, SPLASH_POWERED_BY, "Transport for London"]);
    }

    #[test]
    fn test_platform_toggle_recomputes_layout() {
        let mut vc = ViewportComposer::new(BoardSettings::default()).unwrap();
        vc.render(&board(3), &tick());
        assert!(vc.hotspot(0, HotspotKind::Platform).is_some());
        vc.set_features(BoardMode::Rail, false).unwrap();
        vc.render(&board(3), &tick());
        assert!(vc.hotspot(0, HotspotKind::Platform).is_none());
        assert_eq!(vc.hotspot(0, HotspotKind::Destination).unwrap().area.size.width, 197);
    }

    #[test]
    fn test_tick_advanced() {
        let t = tick();
        let later = t.advanced(Duration::from_millis(1500));
        assert_eq!(later.at - t.at, Duration::from_millis(1500));
        assert_eq!(later.wall, NaiveTime::from_hms_milli_opt(10, 0, 1, 500).unwrap());
    }
}
