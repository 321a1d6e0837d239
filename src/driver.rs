use crate::renderer::{FrameInput, SceneRenderer};
use crate::session::VizSession;
use crate::sync::PlaybackTimeSlot;
use crate::types::*;
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use log::{debug, info, trace};
use std::thread;
use std::time::{Duration, Instant};

/// Runs the frame procedure at a fixed rate and fans frames out to consumers.
///
/// Each frame: drain pending input, read the playback time slot, render, and
/// `try_send` the frame to every consumer. A consumer whose queue is full
/// misses that frame; one whose receiver is gone is dropped. Nothing in a
/// frame blocks.
pub struct FrameDriver {
    session: VizSession,
    renderer: SceneRenderer,
    slot: PlaybackTimeSlot,
    clock: SessionClock,
    input_rx: Receiver<InputEvent>,
    frame_txs: Vec<Sender<SceneFrame>>,
    pointer: Pointer,
    fps: u32,
}

impl FrameDriver {
    pub fn new(
        session: VizSession,
        renderer: SceneRenderer,
        slot: PlaybackTimeSlot,
        clock: SessionClock,
        input_rx: Receiver<InputEvent>,
        frame_txs: Vec<Sender<SceneFrame>>,
    ) -> Self {
        Self {
            session,
            renderer,
            slot,
            clock,
            input_rx,
            frame_txs,
            pointer: Pointer::default(),
            fps: 60,
        }
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps.max(1);
        self
    }

    pub fn session(&self) -> &VizSession {
        &self.session
    }

    /// Apply queued input. Returns false once the input side has hung up.
    fn drain_input(&mut self) -> bool {
        loop {
            match self.input_rx.try_recv() {
                Ok(InputEvent::Pointer { dx, dy }) => self.pointer = Pointer { dx, dy },
                Ok(InputEvent::Toggle) => {
                    let on = self.session.toggle_circles();
                    info!("Backdrop circles {}", if on { "ON" } else { "OFF" });
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    /// Render one frame at `wall_time` and broadcast it.
    pub fn step(&mut self, wall_time: f64) -> SceneFrame {
        self.drain_input();
        let input = FrameInput {
            wall_time,
            reported_time: self.slot.latest(),
            pointer: self.pointer,
        };
        let frame = self.renderer.render(&mut self.session, &input);
        self.broadcast(&frame);
        frame
    }

    fn broadcast(&mut self, frame: &SceneFrame) {
        self.frame_txs.retain(|tx| match tx.try_send(frame.clone()) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    /// Blocks the calling thread until input hangs up or every consumer
    /// has gone.
    pub fn run(&mut self) {
        info!("Frame driver running at {} fps", self.fps);
        let interval = Duration::from_secs_f64(1.0 / self.fps as f64);
        let mut next = Instant::now();
        let mut frame_count: u64 = 0;
        let mut was_synced = false;

        loop {
            if !self.drain_input() {
                info!("Input closed");
                break;
            }
            let frame = self.step(self.clock.now_secs());
            frame_count += 1;

            if frame.synced && !was_synced {
                debug!("First synced frame: {}", frame);
                was_synced = true;
            }
            if frame_count % 600 == 0 {
                debug!("Frame driver: {} frames rendered", frame_count);
                trace!("Latest: {}", frame);
            }

            if self.frame_txs.is_empty() {
                info!("No frame consumers left");
                break;
            }

            next += interval;
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            } else {
                // fell behind; don't try to catch up with a burst
                next = now;
            }
        }

        info!("Frame driver shutting down after {} frames", frame_count);
    }
}
