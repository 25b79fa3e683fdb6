use std::{
    io::{Stdout, Write},
    sync::{
        Mutex as StdMutex,
        atomic::{AtomicBool, Ordering},
    },
};

use log::{debug, error, warn};
use qibla_logic::{
    GeoPoint, HeadingSource, LocationService, QiblaViewState, SensorEvent, StateUpdateSender,
};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, Lines},
    sync::Mutex,
};

use crate::{input::parse_line, prelude::*};

/// Location given on the command line, acquisition fails when there's none
pub struct FixedLocation(Option<GeoPoint>);

impl FixedLocation {
    pub fn new(point: Option<GeoPoint>) -> Self {
        Self(point)
    }
}

impl LocationService for FixedLocation {
    async fn get_loc(&self) -> Result<GeoPoint> {
        self.0.ok_or_else(|| anyhow!("No location given"))
    }
}

/// Heading source that plays back a recorded stream, one event per line
pub struct ReplayHeadingSource<R: AsyncBufRead + Unpin + Send> {
    lines: Mutex<Lines<R>>,
    closed: AtomicBool,
}

impl<R: AsyncBufRead + Unpin + Send> ReplayHeadingSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: Mutex::new(reader.lines()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn next_event(&self) -> SensorEvent {
        if self.is_closed() {
            return SensorEvent::Closed;
        }

        let mut lines = self.lines.lock().await;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_line(&line) {
                    Ok(Some(event)) => break event,
                    Ok(None) => {}
                    Err(why) => warn!("Skipping line: {why:?}"),
                },
                Ok(None) => break SensorEvent::Closed,
                Err(why) => {
                    error!("Failed to read heading stream: {why:?}");
                    break SensorEvent::Closed;
                }
            }
        }
    }
}

impl<R: AsyncBufRead + Unpin + Send> HeadingSource for ReplayHeadingSource<R> {
    async fn receive_events(&self) -> impl Iterator<Item = SensorEvent> {
        std::iter::once(self.next_event().await)
    }

    async fn unsubscribe(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("Heading stream released");
        }
    }
}

/// Writes every view state as one JSON line
pub struct JsonLinesSender<W: Write>(StdMutex<W>);

impl<W: Write> JsonLinesSender<W> {
    pub fn new(writer: W) -> Self {
        Self(StdMutex::new(writer))
    }

    pub fn into_inner(self) -> W {
        self.0.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl JsonLinesSender<Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> StateUpdateSender for JsonLinesSender<W> {
    fn send_update(&self, state: &QiblaViewState) {
        let mut writer = match self.0.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };

        let res = serde_json::to_writer(&mut *writer, state)
            .context("Failed to encode view state")
            .and_then(|_| writeln!(writer).context("Failed to write view state"));

        if let Err(why) = res {
            error!("Error sending view state: {why:?}");
        }
    }
}
