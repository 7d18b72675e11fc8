use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, TrySendError, sync_channel};

use log::warn;

use crate::core::clock::{Cu, TimelineMarker};
use crate::error::CoreError;

/// Discrete events emitted by the audio timeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimelineEvent {
    Beat { position: Cu },
    Marker { label: String, position: Cu },
}

impl TimelineEvent {
    #[inline(always)]
    pub const fn position(&self) -> Cu {
        match self {
            Self::Beat { position } | Self::Marker { position, .. } => *position,
        }
    }
}

/// Beats seen since the frame side last looked.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BeatTally {
    pub count: u64,
    pub last: Cu,
}

// Beats are coalesced into counters so they never take queue room from markers.
#[derive(Debug, Default)]
struct BeatCounter {
    count: AtomicU64,
    last: AtomicI64,
}

/// Producer half of the timeline hand-off. Cheap to clone and safe to move onto
/// the audio engine's callback thread; it never blocks.
#[derive(Clone, Debug)]
pub struct TimelineSender {
    tx: SyncSender<TimelineMarker>,
    beats: Arc<BeatCounter>,
}

impl TimelineSender {
    pub fn send(&self, event: TimelineEvent) -> Result<(), CoreError> {
        match event {
            TimelineEvent::Beat { position } => {
                self.beats.last.store(position, Ordering::Relaxed);
                self.beats.count.fetch_add(1, Ordering::Release);
                Ok(())
            }
            TimelineEvent::Marker { label, position } => {
                match self.tx.try_send(TimelineMarker { label, position }) {
                    Ok(()) => Ok(()),
                    Err(TrySendError::Full(m)) => {
                        warn!(
                            "Timeline queue full, dropping marker '{}' at {}",
                            m.label, m.position
                        );
                        Err(CoreError::TimelineQueueFull {
                            position: m.position,
                        })
                    }
                    Err(TrySendError::Disconnected(_)) => Err(CoreError::TimelineDisconnected),
                }
            }
        }
    }
}

/// Frame-side half of the timeline hand-off, drained once per frame.
#[derive(Debug)]
pub struct TimelineReceiver {
    rx: Receiver<TimelineMarker>,
    beats: Arc<BeatCounter>,
}

impl TimelineReceiver {
    /// Takes every queued marker, in arrival order.
    pub fn drain(&self) -> Vec<TimelineMarker> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(m) => out.push(m),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        out
    }

    /// Beats counted since the previous call, if any.
    pub fn take_beats(&self) -> Option<BeatTally> {
        let count = self.beats.count.swap(0, Ordering::Acquire);
        (count > 0).then(|| BeatTally {
            count,
            last: self.beats.last.load(Ordering::Relaxed),
        })
    }

    /// Drops every queued marker and beat. Returns how many markers were
    /// discarded.
    pub fn discard(&self) -> usize {
        self.take_beats();
        self.drain().len()
    }
}

/// Creates a hand-off holding at most `capacity` markers. Beats never count
/// against the capacity.
pub fn timeline_channel(capacity: usize) -> (TimelineSender, TimelineReceiver) {
    let (tx, rx) = sync_channel(capacity.max(1));
    let beats = Arc::new(BeatCounter::default());
    (
        TimelineSender {
            tx,
            beats: Arc::clone(&beats),
        },
        TimelineReceiver { rx, beats },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn marker(label: &str, position: Cu) -> TimelineEvent {
        TimelineEvent::Marker {
            label: label.to_string(),
            position,
        }
    }

    fn labels(markers: &[TimelineMarker]) -> Vec<&str> {
        markers.iter().map(|m| m.label.as_str()).collect()
    }

    #[test]
    fn markers_cross_threads_in_order() {
        let (tx, rx) = timeline_channel(16);
        let producer = thread::spawn(move || {
            for (i, label) in ["Intro", "Tutorial", "Loop1"].iter().enumerate() {
                tx.send(marker(label, i as Cu * 100)).unwrap();
            }
        });
        producer.join().unwrap();

        let got = rx.drain();
        assert_eq!(labels(&got), ["Intro", "Tutorial", "Loop1"]);
        assert_eq!(got[2].position, 200);
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn full_queue_rejects_without_blocking() {
        let (tx, rx) = timeline_channel(1);
        tx.send(marker("Intro", 0)).unwrap();
        let err = tx.send(marker("Tutorial", 480)).unwrap_err();
        assert_eq!(err, CoreError::TimelineQueueFull { position: 480 });
        assert_eq!(rx.discard(), 1);
    }

    #[test]
    fn beat_burst_leaves_room_for_markers() {
        let (tx, rx) = timeline_channel(1);
        for beat in 0..100 {
            tx.send(TimelineEvent::Beat { position: beat * 4 }).unwrap();
        }
        tx.send(marker("Intro", 9)).unwrap();
        assert_eq!(labels(&rx.drain()), ["Intro"]);
        assert_eq!(
            rx.take_beats(),
            Some(BeatTally {
                count: 100,
                last: 396
            })
        );
        assert_eq!(rx.take_beats(), None);
    }

    #[test]
    fn discard_clears_beats_too() {
        let (tx, rx) = timeline_channel(4);
        tx.send(TimelineEvent::Beat { position: 0 }).unwrap();
        tx.send(marker("Intro", 0)).unwrap();
        assert_eq!(rx.discard(), 1);
        assert_eq!(rx.take_beats(), None);
    }

    #[test]
    fn send_after_receiver_drop_reports_disconnect() {
        let (tx, rx) = timeline_channel(4);
        drop(rx);
        assert_eq!(
            tx.send(marker("Intro", 0)).unwrap_err(),
            CoreError::TimelineDisconnected
        );
    }
}
