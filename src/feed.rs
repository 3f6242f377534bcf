/*
 *  feed.rs
 *
 *  departure-board - live departures on small matrix displays
 *  (c) 2020-26 Stuart Hunter
 *
 *  Board snapshots, departure sources and the background poller
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

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveTime, Timelike};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use crate::departure::Departure;

/// Rows the board has room for.
pub const MAX_DEPARTURES: usize = 3;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("feed parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("feed unavailable: {0}")]
    Unavailable(String),

    #[error("invalid operating hours {0:?}, expected start-end hours such as 6-23")]
    InvalidHours(String),
}

/// Hours the departure feed runs, `start-end` on the 24 hour clock.
/// The end hour is exclusive; an end before the start runs overnight and
/// equal hours never close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperatingHours {
    start: u32,
    end: u32,
}

impl OperatingHours {
    pub fn new(start: u32, end: u32) -> Result<Self, FeedError> {
        if start > 23 || end > 23 {
            return Err(FeedError::InvalidHours(format!("{start}-{end}")));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        let hour = time.hour();
        match self.start.cmp(&self.end) {
            std::cmp::Ordering::Less => (self.start..self.end).contains(&hour),
            std::cmp::Ordering::Greater => hour >= self.start || hour < self.end,
            std::cmp::Ordering::Equal => true,
        }
    }
}

impl FromStr for OperatingHours {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FeedError::InvalidHours(s.to_string());
        let (start, end) = s.trim().split_once('-').ok_or_else(invalid)?;
        let start = start.trim().parse().map_err(|_| invalid())?;
        let end = end.trim().parse().map_err(|_| invalid())?;
        Self::new(start, end).map_err(|_| invalid())
    }
}

impl TryFrom<String> for OperatingHours {
    type Error = FeedError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<OperatingHours> for String {
    fn from(hours: OperatingHours) -> Self {
        hours.to_string()
    }
}

impl fmt::Display for OperatingHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Everything the render thread needs for one frame, published whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub station_name: String,
    #[serde(default)]
    pub departures: Vec<Departure>,
    /// overrides the first departure's calling list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calling_points: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_status: Option<String>,
}

impl BoardSnapshot {
    pub fn new(station_name: impl Into<String>) -> Self {
        Self { station_name: station_name.into(), ..Default::default() }
    }

    /// Text for the scrolling calling-points row.
    pub fn calling_points(&self) -> &str {
        match (&self.calling_points, self.departures.first()) {
            (Some(points), _) => points,
            (None, Some(first)) => &first.calling_at_list,
            (None, None) => "",
        }
    }

    /// Line name used to look up the line status, lowercased.
    pub fn status_line(&self) -> Option<String> {
        self.departures
            .first()
            .and_then(|d| d.line.as_deref())
            .filter(|l| !l.is_empty())
            .map(str::to_lowercase)
    }
}

/// Multi-line status messages are shown on a single scrolling row.
pub fn flatten_status(status: &str) -> String {
    status.lines().map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>().join(" ")
}

/// Where departures and line status come from.
pub trait DepartureSource: Send + Sync {
    /// Station name, up to [`MAX_DEPARTURES`] departures and optionally the calling points.
    fn departures(&self) -> impl Future<Output = Result<BoardSnapshot, FeedError>> + Send;

    /// Current status of `line`, or of the station's default line.
    fn line_status(&self, line: Option<&str>) -> impl Future<Output = Result<Option<String>, FeedError>> + Send;
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FeedFile {
    station_name: String,
    #[serde(default)]
    departures: Vec<Departure>,
    #[serde(default)]
    calling_points: Option<String>,
    #[serde(default)]
    line_status: Option<String>,
    /// keyed by lowercase line name
    #[serde(default)]
    line_statuses: HashMap<String, String>,
}

/// Reads the board from a YAML file, re-read on every poll so an external
/// fetcher can rewrite it.
#[derive(Debug, Clone)]
pub struct YamlFileSource {
    path: PathBuf,
}

impl YamlFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<FeedFile, FeedError> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_yaml::from_str(&text)?)
    }
}

impl DepartureSource for YamlFileSource {
    async fn departures(&self) -> Result<BoardSnapshot, FeedError> {
        let file = self.load().await?;
        let mut departures = file.departures;
        departures.truncate(MAX_DEPARTURES);
        Ok(BoardSnapshot {
            station_name: file.station_name,
            departures,
            calling_points: file.calling_points,
            line_status: None,
        })
    }

    async fn line_status(&self, line: Option<&str>) -> Result<Option<String>, FeedError> {
        let mut file = self.load().await?;
        let specific = line.and_then(|l| file.line_statuses.remove(&l.to_lowercase()));
        Ok(specific.or(file.line_status))
    }
}

/// Spoken announcements. Speech synthesis lives behind this trait.
pub trait Announcer: Send {
    fn announce_departure(&mut self, station: &str, departure: &Departure);
    fn announce_line_status(&mut self, status: &str);
}

/// Writes announcements to the log.
#[derive(Debug, Clone, Default)]
pub struct LogAnnouncer;

impl Announcer for LogAnnouncer {
    fn announce_departure(&mut self, station: &str, departure: &Departure) {
        let platform = departure.platform_label().unwrap_or_default();
        info!(
            "announce: {} the next service to {} {} {}",
            station,
            departure.destination_name,
            departure.aimed_departure_time,
            platform
        );
    }

    fn announce_line_status(&mut self, status: &str) {
        info!("announce: line status {status}");
    }
}

/// Fires at most once per `interval`.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    interval: Duration,
    last: Option<Instant>,
}

impl Cadence {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    pub fn due(&self, now: Instant) -> bool {
        self.last.is_none_or(|t| now.saturating_duration_since(t) >= self.interval)
    }

    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerSettings {
    pub refresh_interval: Duration,
    pub status_enabled: bool,
    pub status_interval: Duration,
    pub announcements: bool,
    pub announce_interval: Duration,
    /// outside these hours the board shows no departures
    pub operating_hours: Option<OperatingHours>,
    /// station name shown while closed, the last name seen when empty
    pub out_of_hours_name: String,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(180),
            status_enabled: false,
            status_interval: Duration::from_secs(180),
            announcements: false,
            announce_interval: Duration::from_secs(360),
            operating_hours: None,
            out_of_hours_name: String::new(),
        }
    }
}

/// Background task refreshing the board and publishing whole snapshots.
pub struct FeedPoller<S, A> {
    source: S,
    announcer: A,
    settings: PollerSettings,
    tx: watch::Sender<BoardSnapshot>,
    current: BoardSnapshot,
    departures_due: Cadence,
    status_due: Cadence,
    announce_due: Cadence,
}

impl<S: DepartureSource, A: Announcer> FeedPoller<S, A> {
    pub fn new(source: S, announcer: A, settings: PollerSettings, tx: watch::Sender<BoardSnapshot>) -> Self {
        let current = tx.borrow().clone();
        Self {
            source,
            announcer,
            departures_due: Cadence::new(settings.refresh_interval),
            status_due: Cadence::new(settings.status_interval),
            announce_due: Cadence::new(settings.announce_interval),
            settings,
            tx,
            current,
        }
    }

    pub fn current(&self) -> &BoardSnapshot {
        &self.current
    }

    /// Run whatever is due at `now`, with `wall` the local time of day; true
    /// when a new snapshot was published.
    pub async fn poll_once(&mut self, now: Instant, wall: NaiveTime) -> bool {
        if let Some(hours) = self.settings.operating_hours {
            if !hours.contains(wall) {
                return self.close(hours);
            }
        }

        let mut changed = false;

        if self.departures_due.due(now) {
            self.departures_due.mark(now);
            match self.source.departures().await {
                Ok(fresh) => {
                    let new_first = fresh.departures.first() != self.current.departures.first();
                    if fresh.station_name != self.current.station_name
                        || fresh.departures != self.current.departures
                        || fresh.calling_points != self.current.calling_points
                    {
                        info!("{}: {} departures", fresh.station_name, fresh.departures.len());
                        self.current.station_name = fresh.station_name;
                        self.current.departures = fresh.departures;
                        self.current.calling_points = fresh.calling_points;
                        changed = true;
                    }
                    if new_first && self.settings.announcements {
                        if let Some(first) = self.current.departures.first() {
                            self.announcer.announce_departure(&self.current.station_name, first);
                        }
                    }
                }
                Err(e) => warn!("departure refresh failed: {e}"),
            }
        }

        if self.settings.status_enabled && self.status_due.due(now) {
            self.status_due.mark(now);
            let line = self.current.status_line();
            let status = match self.source.line_status(line.as_deref()).await {
                Ok(status) => status.map(|s| flatten_status(&s)).filter(|s| !s.is_empty()),
                Err(e) => {
                    warn!("line status lookup failed: {e}");
                    None
                }
            };
            if status != self.current.line_status {
                debug!("line status now {:?}", status);
                self.current.line_status = status;
                changed = true;
            }
        }

        if self.settings.announcements && self.announce_due.due(now) {
            if let Some(status) = &self.current.line_status {
                self.announcer.announce_line_status(status);
                self.announce_due.mark(now);
            }
        }

        if changed {
            self.tx.send_replace(self.current.clone());
        }
        changed
    }

    /// Publish the empty out-of-hours board. Feeds are fetched again as
    /// soon as the window reopens.
    fn close(&mut self, hours: OperatingHours) -> bool {
        let station = if self.settings.out_of_hours_name.is_empty() {
            self.current.station_name.clone()
        } else {
            self.settings.out_of_hours_name.clone()
        };
        self.departures_due = Cadence::new(self.settings.refresh_interval);
        self.status_due = Cadence::new(self.settings.status_interval);

        let closed = BoardSnapshot::new(station);
        if closed == self.current {
            return false;
        }
        info!("{}: outside operating hours {hours}", closed.station_name);
        self.current = closed;
        self.tx.send_replace(self.current.clone());
        true
    }

    /// Poll until `shutdown` flips to true or its sender goes away.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "feed poller started: departures every {}s, status {}, hours {}",
            self.settings.refresh_interval.as_secs(),
            if self.settings.status_enabled { "on" } else { "off" },
            self.settings.operating_hours.map_or("all day".to_string(), |h| h.to_string())
        );
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once(Instant::now(), Local::now().time()).await;
                }
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("feed poller stopped");
    }
}
