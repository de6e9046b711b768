//
// Two-slot audio playback on a dedicated worker thread.
//
// The conversation screen needs two logical outputs: the narration/question
// prompt and the per-turn reply. Each slot caches its clip bytes so replay
// can restart from zero, and a should-play flag so foregrounding can
// re-evaluate eligibility instead of blindly resuming.
//
// Playback failures (no output device, undecodable clip) are logged and
// swallowed: a broken speaker must never wedge the conversation.

use std::io::Cursor;
use std::sync::mpsc;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSlot {
    Prompt,
    Reply,
}

impl AudioSlot {
    fn index(self) -> usize {
        match self {
            AudioSlot::Prompt => 0,
            AudioSlot::Reply => 1,
        }
    }
}

enum Cmd {
    SetClip {
        slot: AudioSlot,
        bytes: Vec<u8>,
        should_play: bool,
    },
    Clear(AudioSlot),
    Replay(AudioSlot),
    Suspend,
    Resume,
    IsActive(AudioSlot, mpsc::Sender<bool>),
    Shutdown,
}

pub struct PlaybackController {
    cmd_tx: mpsc::Sender<Cmd>,
    worker_handle: Option<std::thread::JoinHandle<()>>,
}

impl PlaybackController {
    pub fn new() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Cmd>();
        let worker_handle = std::thread::spawn(move || run_worker(cmd_rx));
        Self {
            cmd_tx,
            worker_handle: Some(worker_handle),
        }
    }

    /// Load a clip into a slot. When `should_play` is set and the clip
    /// differs from the loaded one, playback starts from zero; when unset,
    /// the slot stops and its position resets.
    pub fn set_clip(&self, slot: AudioSlot, bytes: Vec<u8>, should_play: bool) {
        let _ = self.cmd_tx.send(Cmd::SetClip {
            slot,
            bytes,
            should_play,
        });
    }

    /// Stop a slot and forget its clip.
    pub fn clear(&self, slot: AudioSlot) {
        let _ = self.cmd_tx.send(Cmd::Clear(slot));
    }

    /// Restart the loaded clip from position zero, regardless of state.
    /// No-op when nothing is loaded.
    pub fn replay(&self, slot: AudioSlot) {
        let _ = self.cmd_tx.send(Cmd::Replay(slot));
    }

    /// App went to background: pause everything.
    pub fn suspend(&self) {
        let _ = self.cmd_tx.send(Cmd::Suspend);
    }

    /// App returned to foreground: resume slots whose should-play condition
    /// still holds (re-evaluated now, not assumed).
    pub fn resume(&self) {
        let _ = self.cmd_tx.send(Cmd::Resume);
    }

    /// Whether the slot still has queued audio (playing or paused).
    pub fn is_active(&self, slot: AudioSlot) -> bool {
        let (resp_tx, resp_rx) = mpsc::channel();
        if self.cmd_tx.send(Cmd::IsActive(slot, resp_tx)).is_err() {
            return false;
        }
        resp_rx.recv_timeout(Duration::from_secs(1)).unwrap_or(false)
    }

    /// Block until the slot has drained. Commands are processed in order, so
    /// a wait issued after `set_clip` observes that clip. Intended to be
    /// called off the event loop (e.g. `spawn_blocking`).
    pub fn wait_until_finished(&self, slot: AudioSlot) {
        loop {
            if !self.is_active(slot) {
                return;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        // Stop all sinks and drop the sources; no audio survives the owner.
        let _ = self.cmd_tx.send(Cmd::Shutdown);
        if let Some(h) = self.worker_handle.take() {
            let _ = h.join();
        }
    }
}

#[derive(Default)]
struct SlotState {
    clip: Option<Vec<u8>>,
    should_play: bool,
    sink: Option<Sink>,
}

impl SlotState {
    fn stop(&mut self) {
        // Dropping the sink stops playback; the next start decodes from the
        // cached bytes, which resets the position to zero.
        self.sink = None;
    }
}

fn run_worker(cmd_rx: mpsc::Receiver<Cmd>) {
    // Holding the OutputStream on this thread keeps the device alive; it is
    // not Send, which is why all playback lives here.
    let output = match OutputStream::try_default() {
        Ok((stream, handle)) => Some((stream, handle)),
        Err(e) => {
            log::warn!("no audio output device; playback disabled: {e}");
            None
        }
    };

    let mut slots: [SlotState; 2] = Default::default();
    let mut suspended = false;

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            Cmd::SetClip {
                slot,
                bytes,
                should_play,
            } => {
                let state = &mut slots[slot.index()];
                let same_clip = state.clip.as_deref() == Some(bytes.as_slice());
                state.should_play = should_play;

                if !should_play {
                    state.stop();
                    state.clip = Some(bytes);
                    continue;
                }

                if same_clip && state.sink.is_some() {
                    // Already loaded and playing (or paused by suspension).
                    continue;
                }

                state.clip = Some(bytes);
                state.stop();
                state.sink = start_sink(output.as_ref(), state.clip.as_deref(), suspended);
            }
            Cmd::Clear(slot) => {
                let state = &mut slots[slot.index()];
                state.stop();
                state.clip = None;
                state.should_play = false;
            }
            Cmd::Replay(slot) => {
                let state = &mut slots[slot.index()];
                if state.clip.is_none() {
                    continue;
                }
                state.should_play = true;
                state.stop();
                state.sink = start_sink(output.as_ref(), state.clip.as_deref(), suspended);
            }
            Cmd::Suspend => {
                suspended = true;
                for state in &mut slots {
                    if let Some(sink) = &state.sink {
                        sink.pause();
                    }
                }
            }
            Cmd::Resume => {
                suspended = false;
                for state in &mut slots {
                    if let Some(sink) = &state.sink {
                        if state.should_play {
                            sink.play();
                        } else {
                            state.stop();
                        }
                    }
                }
            }
            Cmd::IsActive(slot, resp) => {
                let state = &mut slots[slot.index()];
                let active = match &state.sink {
                    Some(sink) => {
                        if sink.empty() {
                            state.sink = None;
                            false
                        } else {
                            true
                        }
                    }
                    None => false,
                };
                let _ = resp.send(active);
            }
            Cmd::Shutdown => break,
        }
    }
    // Sinks drop here, stopping any remaining playback.
}

fn start_sink(
    output: Option<&(OutputStream, OutputStreamHandle)>,
    clip: Option<&[u8]>,
    suspended: bool,
) -> Option<Sink> {
    let (_, handle) = output?;
    let bytes = clip?;

    let sink = match Sink::try_new(handle) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("playback sink unavailable: {e}");
            return None;
        }
    };

    let source = match Decoder::new(Cursor::new(bytes.to_vec())) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("clip decode failed: {e}");
            return None;
        }
    };

    sink.append(source);
    if suspended {
        sink.pause();
    }
    Some(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests run without an output device (CI); the controller must be
    // fully operable in its silent mode.

    #[test]
    fn replay_without_a_clip_is_a_no_op() {
        let p = PlaybackController::new();
        p.replay(AudioSlot::Prompt);
        p.replay(AudioSlot::Prompt);
        assert!(!p.is_active(AudioSlot::Prompt));
    }

    #[test]
    fn wait_returns_immediately_when_nothing_plays() {
        let p = PlaybackController::new();
        p.set_clip(AudioSlot::Reply, vec![0u8; 4], true);
        // Undecodable clip: swallowed, slot never becomes active.
        p.wait_until_finished(AudioSlot::Reply);
    }

    #[test]
    fn suspend_and_resume_survive_empty_slots() {
        let p = PlaybackController::new();
        p.suspend();
        p.resume();
        p.clear(AudioSlot::Prompt);
        assert!(!p.is_active(AudioSlot::Prompt));
    }
}
