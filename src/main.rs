/*
 *  main.rs
 *
 *  departure-board - live departures on small matrix displays
 *  (c) 2020-26 Stuart Hunter
 *
 *  Entry point: configuration, logging, feed pollers and render threads
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

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinSet;

use departure_board::board::DisplayLoop;
use departure_board::config::{self, Cli, Screen, SinkKind};
use departure_board::display::{DisplayError, DisplaySink, NullSink, PbmSink, ViewportComposer};
use departure_board::feed::{BoardSnapshot, FeedPoller, LogAnnouncer, YamlFileSource};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Waits for SIGINT, SIGTERM or SIGHUP.
async fn signal_handler() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

fn build_sink(screen: &Screen) -> Result<Box<dyn DisplaySink>, DisplayError> {
    let (width, height) = (screen.board.width, screen.board.height);
    Ok(match screen.sink {
        SinkKind::Pbm => Box::new(PbmSink::new(width, height, screen.pbm_path.clone(), screen.pbm_every_frames)?),
        SinkKind::Null => Box::new(NullSink::new(width, height)),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli).context("loading configuration")?;

    if cli.dump_config {
        print!("{}", config::dump(&cfg)?);
        return Ok(());
    }

    let debug_enabled = cli.debug;
    let level = cfg
        .log_level
        .clone()
        .unwrap_or_else(|| if debug_enabled { "debug" } else { "info" }.to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("{} v.{} built {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (fps, fps_log, splash) = (cfg.target_fps(), cfg.fps_log_interval(), cfg.splash_frames());
    let running = Arc::new(AtomicBool::new(true));
    let mut pollers = Vec::new();
    let mut renders = JoinSet::new();

    for screen in cfg.screens() {
        let name = screen.name;
        let station = screen.station_name.clone();
        let (board_tx, board_rx) = watch::channel(BoardSnapshot::new(station.clone()));

        match screen.feed_source.clone() {
            Some(path) => {
                info!("{name}: polling departures from {}", path.display());
                let poller = FeedPoller::new(YamlFileSource::new(path), LogAnnouncer, screen.poller.clone(), board_tx);
                pollers.push(tokio::spawn(poller.run(shutdown_rx.clone())));
            }
            None => warn!("{name}: no feed configured, {station} will show the empty board"),
        }

        let sink = build_sink(&screen).with_context(|| format!("opening display sink for {name}"))?;
        let settings = screen.board;
        let flag = Arc::clone(&running);

        // the render loop blocks between frames, keep it off the async workers
        renders.spawn_blocking(move || -> Result<(&'static str, u64), DisplayError> {
            let composer = ViewportComposer::new(settings)?;
            let display = DisplayLoop::new(composer, sink, board_rx, splash)?;
            Ok((name, display.run(fps, fps_log, flag).frames()))
        });
    }

    let finished_early = tokio::select! {
        res = signal_handler() => {
            if let Err(e) = res {
                error!("signal handler: {e}");
            }
            None
        }
        Some(res) = renders.join_next() => Some(res),
    };

    running.store(false, Ordering::Relaxed);
    let _ = shutdown_tx.send(true);

    let mut outcomes = Vec::from_iter(finished_early);
    while let Some(res) = renders.join_next().await {
        outcomes.push(res);
    }
    for outcome in outcomes {
        let (name, frames) = outcome.context("render thread panicked")?.context("display")?;
        info!("{name}: rendered {frames} frames");
    }

    for handle in pollers {
        if let Err(e) = handle.await {
            warn!("feed poller: {e}");
        }
    }

    info!("shutdown complete");
    Ok(())
}
