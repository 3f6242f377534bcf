/*
 *  display/sink.rs
 *
 *  departure-board - live departures on small matrix displays
 *  (c) 2020-26 Stuart Hunter
 *
 *  Frame sinks: where composited frames end up
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

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use embedded_graphics::geometry::Size;
use log::{debug, info, warn};
use tokio::sync::mpsc::{self, error::TrySendError, Sender};

use super::bitmap::Bitmap;
use super::error::DisplayError;

/// Anything that accepts finished frames: a panel, a preview, a test double.
///
/// Sinks run on the render thread, so `display` must not block for long.
pub trait DisplaySink: Send {
    fn name(&self) -> &'static str;

    /// Frame size the sink accepts
    fn dimensions(&self) -> Size;

    fn display(&mut self, frame: &Bitmap) -> Result<(), DisplayError>;

    fn clear(&mut self) -> Result<(), DisplayError>;
}

fn check_frame(expected: Size, frame: &Bitmap) -> Result<(), DisplayError> {
    let actual = (frame.width(), frame.height());
    if actual != (expected.width, expected.height) {
        return Err(DisplayError::FrameSizeMismatch { expected: (expected.width, expected.height), actual });
    }
    Ok(())
}

impl DisplaySink for Box<dyn DisplaySink> {
    fn name(&self) -> &'static str { (**self).name() }
    fn dimensions(&self) -> Size { (**self).dimensions() }

    fn display(&mut self, frame: &Bitmap) -> Result<(), DisplayError> {
        (**self).display(frame)
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        (**self).clear()
    }
}

/// Discards every frame.
#[derive(Debug, Clone)]
pub struct NullSink {
    size: Size,
}

impl NullSink {
    pub fn new(width: u32, height: u32) -> Self {
        Self { size: Size::new(width, height) }
    }
}

impl DisplaySink for NullSink {
    fn name(&self) -> &'static str { "null" }
    fn dimensions(&self) -> Size { self.size }

    fn display(&mut self, frame: &Bitmap) -> Result<(), DisplayError> {
        check_frame(self.size, frame)
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }
}

/// Recording sink for tests
#[derive(Debug, Clone)]
pub struct MockSink {
    size: Size,
    state: Arc<Mutex<MockSinkState>>,
}

/// Shared so tests can inspect it after the sink moved to the render thread
#[derive(Debug, Default)]
pub struct MockSinkState {
    pub frames_displayed: usize,
    pub clear_count: usize,
    pub last_frame: Option<Bitmap>,
    /// lit pixel count of every frame, in order
    pub lit_history: Vec<usize>,
    pub simulate_failure: bool,
}

impl MockSink {
    pub fn new(width: u32, height: u32) -> Self {
        Self { size: Size::new(width, height), state: Arc::new(Mutex::new(MockSinkState::default())) }
    }

    pub fn state(&self) -> Arc<Mutex<MockSinkState>> {
        Arc::clone(&self.state)
    }

    fn lock(&self) -> MutexGuard<'_, MockSinkState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DisplaySink for MockSink {
    fn name(&self) -> &'static str { "mock" }
    fn dimensions(&self) -> Size { self.size }

    fn display(&mut self, frame: &Bitmap) -> Result<(), DisplayError> {
        check_frame(self.size, frame)?;
        let mut state = self.lock();
        if state.simulate_failure {
            return Err(DisplayError::Sink("simulated display failure".to_string()));
        }
        state.frames_displayed += 1;
        state.lit_history.push(frame.count_on());
        state.last_frame = Some(frame.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock();
        state.clear_count += 1;
        state.last_frame = None;
        Ok(())
    }
}

/// Writes every Nth frame to a PBM file for a live preview.
///
/// Files are written by a helper thread; when it is still busy with the
/// previous frame the new one is dropped rather than stalling the render
/// loop.
pub struct PbmSink {
    size: Size,
    path: PathBuf,
    every: u64,
    frames_seen: u64,
    frames_dropped: u64,
    tx: Option<Sender<Bitmap>>,
    writer: Option<JoinHandle<()>>,
}

impl PbmSink {
    pub fn new(width: u32, height: u32, path: impl AsRef<Path>, every: u64) -> Result<Self, DisplayError> {
        if every == 0 {
            return Err(DisplayError::invalid("pbm sink needs to write every 1 or more frames"));
        }
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let (tx, mut rx) = mpsc::channel::<Bitmap>(1);
        let target = path.clone();
        let writer = std::thread::Builder::new()
            .name("pbm-writer".into())
            .spawn(move || {
                while let Some(frame) = rx.blocking_recv() {
                    if let Err(e) = write_pbm(&target, &frame) {
                        warn!("pbm preview {}: {e}", target.display());
                    }
                }
                debug!("pbm writer finished");
            })?;

        info!("pbm preview every {every} frames to {}", path.display());
        Ok(Self {
            size: Size::new(width, height),
            path,
            every,
            frames_seen: 0,
            frames_dropped: 0,
            tx: Some(tx),
            writer: Some(writer),
        })
    }

    pub fn path(&self) -> &Path { &self.path }
    pub fn frames_dropped(&self) -> u64 { self.frames_dropped }
}

/// Write-then-rename so a viewer never sees half a file
fn write_pbm(path: &Path, frame: &Bitmap) -> std::io::Result<()> {
    let tmp = path.with_extension("pbm.tmp");
    fs::write(&tmp, frame.to_pbm())?;
    fs::rename(&tmp, path)
}

impl DisplaySink for PbmSink {
    fn name(&self) -> &'static str { "pbm" }
    fn dimensions(&self) -> Size { self.size }

    fn display(&mut self, frame: &Bitmap) -> Result<(), DisplayError> {
        check_frame(self.size, frame)?;
        self.frames_seen += 1;
        if self.frames_seen % self.every != 0 {
            return Ok(());
        }
        let Some(tx) = &self.tx else {
            return Err(DisplayError::Sink("pbm writer already shut down".into()));
        };
        match tx.try_send(frame.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.frames_dropped += 1;
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(DisplayError::Sink("pbm writer thread exited".into())),
        }
    }

    /// Queues a blank frame behind any frame the writer still holds, so the
    /// preview ends blank. Blocks while the writer is busy; call it from a
    /// blocking thread, never from inside an async task.
    fn clear(&mut self) -> Result<(), DisplayError> {
        let blank = Bitmap::new(self.size.width, self.size.height);
        match &self.tx {
            Some(tx) => {
                if let Err(unsent) = tx.blocking_send(blank) {
                    // writer gone, nothing left to race with
                    write_pbm(&self.path, &unsent.0)?;
                }
            }
            None => write_pbm(&self.path, &blank)?,
        }
        Ok(())
    }
}

impl Drop for PbmSink {
    fn drop(&mut self) {
        // closing the channel ends the writer loop
        self.tx.take();
        if let Some(handle) = self.writer.take() {
            let _ = handle.join();
        }
    }
}
