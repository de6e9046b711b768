//
// CPAL-based press-hold-release microphone capture.
//
// The hardware stream is owned by a worker thread that lives exactly as long
// as one recording session: `start` opens the device, `stop` collects the
// buffered samples and tears the stream down. Nothing keeps the microphone
// open between turns.

use std::sync::mpsc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat, SizedSample, Stream};

use crate::resample::resample_mono_f32;
use crate::wav::{CLIP_MIME_TYPE, CLIP_SAMPLE_RATE_HZ, encode_mono_wav};

#[derive(Debug, thiserror::Error)]
pub enum AudioCaptureError {
    #[error("no input device found")]
    NoInputDevice,

    #[error("microphone access denied")]
    PermissionDenied,

    #[error("failed to get default config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("audio worker failed: {0}")]
    Worker(String),

    #[error("audio worker startup timeout")]
    WorkerTimeout,

    #[error("recording stop timed out")]
    StopTimeout,

    #[error("failed to finalize clip: {0}")]
    Finalize(#[from] anyhow::Error),

    #[error("internal channel error")]
    Channel,
}

/// A finished utterance: encoded bytes plus the negotiated content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedClip {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

enum Cmd {
    Stop(mpsc::Sender<Vec<f32>>),
    Shutdown,
}

enum WorkerMsg {
    Ready,
    Error(String),
}

struct ActiveRecording {
    cmd_tx: mpsc::Sender<Cmd>,
    worker_handle: std::thread::JoinHandle<()>,
    sample_rate_hz: u32,
}

/// Owns at most one recording session at a time.
pub struct CaptureController {
    active: Option<ActiveRecording>,
}

impl CaptureController {
    pub fn new() -> Self {
        Self { active: None }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Open the default input device and begin buffering.
    ///
    /// A second `start` while a session is active is ignored: the press-hold
    /// gesture can glitch and re-fire, and the first session must win.
    pub fn start(&mut self) -> Result<(), AudioCaptureError> {
        if self.active.is_some() {
            log::warn!("start ignored: recording already active");
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(AudioCaptureError::NoInputDevice)?;

        // Capture at the device's native rate; normalize to 16k on stop.
        let default_cfg = device.default_input_config()?;
        let sample_rate_hz = default_cfg.sample_rate().0;

        let (cmd_tx, cmd_rx) = mpsc::channel::<Cmd>();
        let (worker_tx, worker_rx) = mpsc::channel::<WorkerMsg>();

        let worker_handle = std::thread::spawn(move || {
            let config = default_cfg;
            let sample_format = config.sample_format();
            let channels = config.channels() as usize;
            let (sample_tx, sample_rx) = mpsc::channel::<Vec<f32>>();

            let stream = match sample_format {
                SampleFormat::F32 => {
                    build_input_stream::<f32>(&device, &config.clone().into(), channels, sample_tx)
                }
                SampleFormat::I16 => {
                    build_input_stream::<i16>(&device, &config.clone().into(), channels, sample_tx)
                }
                SampleFormat::U16 => {
                    build_input_stream::<u16>(&device, &config.clone().into(), channels, sample_tx)
                }
                SampleFormat::I8 => {
                    build_input_stream::<i8>(&device, &config.clone().into(), channels, sample_tx)
                }
                SampleFormat::U8 => {
                    build_input_stream::<u8>(&device, &config.clone().into(), channels, sample_tx)
                }
                SampleFormat::I32 => {
                    build_input_stream::<i32>(&device, &config.clone().into(), channels, sample_tx)
                }
                SampleFormat::U32 => {
                    build_input_stream::<u32>(&device, &config.clone().into(), channels, sample_tx)
                }
                SampleFormat::F64 => {
                    build_input_stream::<f64>(&device, &config.clone().into(), channels, sample_tx)
                }
                _ => build_input_stream::<f32>(&device, &config.clone().into(), channels, sample_tx),
            };

            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    let _ = worker_tx.send(WorkerMsg::Error(format!("build stream: {e}")));
                    log::error!("Audio stream build failed: {e}");
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = worker_tx.send(WorkerMsg::Error(format!("play stream: {e}")));
                log::error!("Audio stream play failed: {e}");
                return;
            }

            let _ = worker_tx.send(WorkerMsg::Ready);

            run_consumer(sample_rx, cmd_rx);
            drop(stream);
        });

        // Block briefly until the worker has either started the stream or failed.
        match worker_rx.recv_timeout(Duration::from_secs(2)) {
            Ok(WorkerMsg::Ready) => {}
            Ok(WorkerMsg::Error(e)) => {
                let _ = worker_handle.join();
                return Err(classify_worker_error(e));
            }
            Err(mpsc::RecvTimeoutError::Timeout) => return Err(AudioCaptureError::WorkerTimeout),
            Err(_) => return Err(AudioCaptureError::Channel),
        }

        self.active = Some(ActiveRecording {
            cmd_tx,
            worker_handle,
            sample_rate_hz,
        });
        Ok(())
    }

    /// Stop buffering, release the hardware stream and finalize the clip.
    ///
    /// Returns `Ok(None)` when no recording is active: release without a
    /// matching press must be tolerated. The stream is always released, even
    /// when finalization fails.
    pub fn stop(&mut self) -> Result<Option<RecordedClip>, AudioCaptureError> {
        let Some(active) = self.active.take() else {
            return Ok(None);
        };

        let (resp_tx, resp_rx) = mpsc::channel();
        if active.cmd_tx.send(Cmd::Stop(resp_tx)).is_err() {
            let _ = active.worker_handle.join();
            return Err(AudioCaptureError::Channel);
        }

        let samples = resp_rx.recv_timeout(Duration::from_secs(3));

        // The worker exits after answering Stop; join before touching samples
        // so the device is closed no matter what happens below.
        let _ = active.cmd_tx.send(Cmd::Shutdown);
        let _ = active.worker_handle.join();

        let samples = samples.map_err(|e| match e {
            mpsc::RecvTimeoutError::Timeout => AudioCaptureError::StopTimeout,
            mpsc::RecvTimeoutError::Disconnected => AudioCaptureError::Channel,
        })?;

        let samples = if active.sample_rate_hz == CLIP_SAMPLE_RATE_HZ {
            samples
        } else {
            resample_mono_f32(&samples, active.sample_rate_hz, CLIP_SAMPLE_RATE_HZ)?
        };

        let bytes = encode_mono_wav(&samples, CLIP_SAMPLE_RATE_HZ)?;
        Ok(Some(RecordedClip {
            bytes,
            mime_type: CLIP_MIME_TYPE.into(),
        }))
    }

    /// Best-effort: stop and discard any in-flight recording.
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            let _ = active.cmd_tx.send(Cmd::Shutdown);
            let _ = active.worker_handle.join();
        }
    }
}

impl Default for CaptureController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn classify_worker_error(msg: String) -> AudioCaptureError {
    let lower = msg.to_lowercase();
    if lower.contains("permission") || lower.contains("access") || lower.contains("denied") {
        AudioCaptureError::PermissionDenied
    } else {
        AudioCaptureError::Worker(msg)
    }
}

fn build_input_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    sample_tx: mpsc::Sender<Vec<f32>>,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: Sample + SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    let cb = move |data: &[T], _: &cpal::InputCallbackInfo| {
        let mut buf = Vec::with_capacity(data.len() / channels.max(1));

        if channels == 1 {
            buf.extend(data.iter().map(|&s| s.to_sample::<f32>()));
        } else {
            for frame in data.chunks_exact(channels) {
                let mono = frame.iter().map(|&s| s.to_sample::<f32>()).sum::<f32>() / channels as f32;
                buf.push(mono);
            }
        }

        let _ = sample_tx.send(buf);
    };

    device.build_input_stream(
        config,
        cb,
        |err| {
            // These errors are crucial to debug "recording started but silent".
            log::error!("Audio stream error: {err}");
        },
        None,
    )
}

fn run_consumer(sample_rx: mpsc::Receiver<Vec<f32>>, cmd_rx: mpsc::Receiver<Cmd>) {
    let mut captured: Vec<f32> = Vec::new();

    loop {
        // Always drain commands promptly, even if the stream is stalled.
        while let Ok(cmd) = cmd_rx.try_recv() {
            match cmd {
                Cmd::Stop(resp) => {
                    let out = std::mem::take(&mut captured);
                    let _ = resp.send(out);
                    return;
                }
                Cmd::Shutdown => return,
            }
        }

        match sample_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(samples) => captured.extend_from_slice(&samples),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // No audio chunk yet; loop around to check commands again.
                continue;
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_error_classification_detects_permission() {
        assert!(matches!(
            classify_worker_error("build stream: Access denied by the OS".into()),
            AudioCaptureError::PermissionDenied
        ));
        assert!(matches!(
            classify_worker_error("build stream: device busy".into()),
            AudioCaptureError::Worker(_)
        ));
    }

    #[test]
    fn stop_without_start_is_a_no_op() {
        let mut c = CaptureController::new();
        assert!(matches!(c.stop(), Ok(None)));
    }

    #[test]
    fn consumer_answers_stop_with_buffered_samples() {
        let (sample_tx, sample_rx) = mpsc::channel();
        let (cmd_tx, cmd_rx) = mpsc::channel();

        let worker = std::thread::spawn(move || run_consumer(sample_rx, cmd_rx));

        sample_tx.send(vec![0.1, 0.2]).unwrap();
        sample_tx.send(vec![0.3]).unwrap();
        // Give the consumer a beat to drain the sample channel.
        std::thread::sleep(Duration::from_millis(120));

        let (resp_tx, resp_rx) = mpsc::channel();
        cmd_tx.send(Cmd::Stop(resp_tx)).unwrap();
        let out = resp_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(out, vec![0.1, 0.2, 0.3]);

        worker.join().unwrap();
    }
}
