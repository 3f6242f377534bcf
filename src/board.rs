/*
 *  board.rs
 *
 *  departure-board - live departures on small matrix displays
 *  (c) 2020-26 Stuart Hunter
 *
 *  Render loop: snapshot in, composited frame out, at a fixed rate
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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use tokio::sync::watch;

use crate::display::{DisplayError, DisplaySink, Tick, ViewportComposer};
use crate::feed::BoardSnapshot;
use crate::pacer::{FpsMeter, Pacer};

/// Log the text cache about once a minute at the target rate
const CACHE_LOG_SECS: u64 = 60;

/// Owns the composer and the sink; lives on its own blocking thread.
pub struct DisplayLoop<K: DisplaySink> {
    composer: ViewportComposer,
    sink: K,
    board_rx: watch::Receiver<BoardSnapshot>,
    board: BoardSnapshot,
    splash_frames: u32,
    frames: u64,
    sink_errors: u64,
}

impl<K: DisplaySink> DisplayLoop<K> {
    pub fn new(
        composer: ViewportComposer,
        sink: K,
        mut board_rx: watch::Receiver<BoardSnapshot>,
        splash_frames: u32,
    ) -> Result<Self, DisplayError> {
        let frame = composer.frame();
        let expected = sink.dimensions();
        if (frame.width(), frame.height()) != (expected.width, expected.height) {
            return Err(DisplayError::FrameSizeMismatch {
                expected: (expected.width, expected.height),
                actual: (frame.width(), frame.height()),
            });
        }
        let board = board_rx.borrow_and_update().clone();
        info!("display loop on {} sink, {} splash frames", sink.name(), splash_frames);
        Ok(Self { composer, sink, board_rx, board, splash_frames, frames: 0, sink_errors: 0 })
    }

    pub fn composer(&self) -> &ViewportComposer { &self.composer }
    pub fn sink(&self) -> &K { &self.sink }
    pub fn board(&self) -> &BoardSnapshot { &self.board }
    pub fn frames(&self) -> u64 { self.frames }
    pub fn sink_errors(&self) -> u64 { self.sink_errors }

    /// One frame: pick up a newer snapshot if there is one, render, hand
    /// the frame to the sink. Returns whether the sink took it.
    pub fn step(&mut self, tick: &Tick) -> bool {
        if self.board_rx.has_changed().unwrap_or(false) {
            self.board = self.board_rx.borrow_and_update().clone();
            debug!("new snapshot: {} departures", self.board.departures.len());
        }

        let frame = if self.frames < u64::from(self.splash_frames) {
            self.composer.render_splash(tick)
        } else {
            self.composer.render(&self.board, tick)
        };
        self.frames += 1;

        match self.sink.display(frame) {
            Ok(()) => true,
            Err(e) => {
                self.sink_errors += 1;
                if self.sink_errors == 1 {
                    error!("{} sink: {e}", self.sink.name());
                } else if self.sink_errors % 1000 == 0 {
                    warn!("{} sink: {} failed frames, latest: {e}", self.sink.name(), self.sink_errors);
                }
                false
            }
        }
    }

    /// Render at `target_fps` until `running` is cleared.
    pub fn run(mut self, target_fps: u32, fps_log_interval: Duration, running: Arc<AtomicBool>) -> Self {
        let mut pacer = Pacer::new(target_fps);
        let mut meter = FpsMeter::new(fps_log_interval, Instant::now());
        let cache_every = u64::from(target_fps.max(1)) * CACHE_LOG_SECS;
        info!("render loop started at {target_fps} fps");

        while running.load(Ordering::Relaxed) {
            pacer.wait();
            let tick = Tick::now();
            self.step(&tick);
            meter.record(tick.at);
            if self.frames % cache_every == 0 {
                self.composer.metrics().log_stats();
            }
        }

        if let Err(e) = self.sink.clear() {
            warn!("clearing {} sink: {e}", self.sink.name());
        }
        info!("render loop stopped after {} frames, {} sink errors", self.frames, self.sink_errors);
        self
    }
}
