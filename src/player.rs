use hound::{SampleFormat, WavReader};
use log::{error, info, warn};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

/// Callback receiving playback position in seconds. Called from the player's
/// own thread.
pub type TimeCallback = Box<dyn Fn(f64) + Send + 'static>;

/// Audio playback collaborator. `start` is fire-and-forget: it returns
/// immediately and reports progress through the registered callback.
pub trait MediaPlayer {
    fn on_time_update(&mut self, callback: TimeCallback);
    fn start(&mut self, path: &Path);
}

/// How often playback time is reported while pacing.
const REPORT_INTERVAL: Duration = Duration::from_millis(10);

/// Decodes a WAV file and plays it back at real-time pace, reporting the
/// playback position as it goes.
///
/// With the `audio` feature the samples go to the default output device and
/// the reported time follows samples consumed by the device. Without it the
/// player is a silent transport paced against the monotonic clock.
pub struct WavPlayer {
    callback: Option<TimeCallback>,
}

impl WavPlayer {
    pub fn new() -> Self {
        Self { callback: None }
    }
}

impl Default for WavPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaPlayer for WavPlayer {
    fn on_time_update(&mut self, callback: TimeCallback) {
        self.callback = Some(callback);
    }

    fn start(&mut self, path: &Path) {
        let callback = self.callback.take().unwrap_or_else(|| Box::new(|_: f64| {}));
        let path = path.to_path_buf();
        let spawned = thread::Builder::new()
            .name("wav-player".into())
            .spawn(move || {
                if let Some(track) = DecodedTrack::open(&path) {
                    track.play(callback);
                }
            });
        if let Err(e) = spawned {
            error!("Failed to spawn player thread: {}", e);
        }
    }
}

/// Mono f32 samples of a whole file.
pub struct DecodedTrack {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Magnitude of full scale for signed integer samples of `bits` width.
/// Header values outside 1..=32 are clamped.
fn int_full_scale(bits: u16) -> f32 {
    (1i64 << (bits.clamp(1, 32) - 1)) as f32
}

impl DecodedTrack {
    /// Decode `path`. Failures are logged; the caller keeps running unsynced.
    pub fn open(path: &Path) -> Option<Self> {
        let reader = match WavReader::open(path) {
            Ok(r) => r,
            Err(e) => {
                error!("Failed to open WAV file {:?}: {}", path, e);
                warn!("No audio clock — visualization stays unsynced");
                return None;
            }
        };

        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        info!(
            "WAV: {:?}  {} Hz  {} ch  {:?}  {} bit",
            path.file_name().unwrap_or_default(),
            spec.sample_rate,
            channels,
            spec.sample_format,
            spec.bits_per_sample,
        );

        let samples_f32: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .filter_map(|s| s.ok())
                .collect(),
            SampleFormat::Int => {
                let max = int_full_scale(spec.bits_per_sample);
                reader
                    .into_samples::<i32>()
                    .filter_map(|s| s.ok())
                    .map(|s| s as f32 / max)
                    .collect()
            }
        };

        let samples = if channels == 1 {
            samples_f32
        } else {
            samples_f32
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };

        Some(Self {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    #[cfg(not(feature = "audio"))]
    fn play(self, callback: TimeCallback) {
        let duration = self.duration_secs();
        info!("WAV: {:.2}s → silent transport at real-time pace", duration);
        pace(duration, &callback);
        info!("WAV playback complete.");
    }

    #[cfg(feature = "audio")]
    fn play(self, callback: TimeCallback) {
        let duration = self.duration_secs();
        match output::play(self.samples, self.sample_rate, &callback) {
            Ok(()) => info!("WAV playback complete."),
            Err(e) => {
                warn!("Audio output unavailable ({}); falling back to silent transport", e);
                pace(duration, &callback);
            }
        }
    }
}

/// Report elapsed time every `REPORT_INTERVAL` until `duration` has passed.
fn pace(duration: f64, callback: &TimeCallback) {
    let start = Instant::now();
    loop {
        let t = start.elapsed().as_secs_f64();
        if t >= duration {
            callback(duration);
            break;
        }
        callback(t);
        thread::sleep(REPORT_INTERVAL);
    }
}

/// Silent transport with no file: reports seconds since `start`, forever.
/// Lets a timeline be previewed without its audio.
pub struct FreeRunPlayer {
    callback: Option<TimeCallback>,
}

impl FreeRunPlayer {
    pub fn new() -> Self {
        Self { callback: None }
    }
}

impl Default for FreeRunPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaPlayer for FreeRunPlayer {
    fn on_time_update(&mut self, callback: TimeCallback) {
        self.callback = Some(callback);
    }

    fn start(&mut self, _path: &Path) {
        let callback = self.callback.take().unwrap_or_else(|| Box::new(|_: f64| {}));
        info!("Free-running transport (no audio)");
        let spawned = thread::Builder::new()
            .name("free-run".into())
            .spawn(move || pace(f64::INFINITY, &callback));
        if let Err(e) = spawned {
            error!("Failed to spawn transport thread: {}", e);
        }
    }
}

#[cfg(feature = "audio")]
mod output {
    use super::{TimeCallback, REPORT_INTERVAL};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{SampleFormat, StreamConfig};
    use log::{error, info};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    /// Play mono `samples` on the default output device, blocking until the
    /// device has consumed them. Reports position from the consumed count.
    pub fn play(samples: Vec<f32>, sample_rate: u32, callback: &TimeCallback) -> Result<(), String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| "No default audio output device found".to_string())?;

        info!(
            "Audio output: {}",
            device.name().unwrap_or_else(|_| "unknown".into())
        );

        let supported = device
            .default_output_config()
            .map_err(|e| format!("No supported output config: {e}"))?;
        if supported.sample_format() != SampleFormat::F32 {
            return Err(format!("unsupported sample format {:?}", supported.sample_format()));
        }

        let channels = supported.channels() as usize;
        let config = StreamConfig {
            channels: supported.channels(),
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let total = samples.len();
        let cursor = Arc::new(AtomicUsize::new(0));
        let cb_cursor = cursor.clone();
        let err_fn = |e: cpal::StreamError| error!("Audio stream error: {e}");

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = cb_cursor.load(Ordering::Relaxed);
                    for frame in data.chunks_mut(channels) {
                        let s = samples.get(pos).copied().unwrap_or(0.0);
                        for out in frame.iter_mut() {
                            *out = s;
                        }
                        if pos < total {
                            pos += 1;
                        }
                    }
                    cb_cursor.store(pos, Ordering::Relaxed);
                },
                err_fn,
                None,
            )
            .map_err(|e| format!("Failed to build output stream: {e}"))?;

        stream
            .play()
            .map_err(|e| format!("Failed to start output stream: {e}"))?;

        loop {
            let pos = cursor.load(Ordering::Relaxed);
            callback(pos as f64 / sample_rate as f64);
            if pos >= total {
                break;
            }
            thread::sleep(REPORT_INTERVAL);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn write_wav(path: &Path, sample_rate: u32, n: usize) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..n {
            let v = if i % 2 == 0 { 8000i16 } else { -8000i16 };
            w.write_sample(v).unwrap();
            w.write_sample(v).unwrap();
        }
        w.finalize().unwrap();
    }

    #[test]
    fn test_decode_mixes_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 8000, 800);
        let track = DecodedTrack::open(&path).unwrap();
        assert_eq!(track.samples.len(), 800);
        assert!((track.duration_secs() - 0.1).abs() < 1e-9);
        assert!((track.samples[0] - 8000.0 / 32768.0).abs() < 1e-6);
    }

    #[test]
    fn test_int_full_scale_tolerates_bad_headers() {
        assert_eq!(int_full_scale(16), 32768.0);
        assert_eq!(int_full_scale(24), 8_388_608.0);
        assert_eq!(int_full_scale(0), 1.0);
        assert_eq!(int_full_scale(u16::MAX), 2_147_483_648.0);
    }

    #[test]
    fn test_missing_file_is_none() {
        assert!(DecodedTrack::open(Path::new("/no/such/file.wav")).is_none());
    }

    #[test]
    fn test_pace_reports_increasing_times_and_ends_at_duration() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let cb: TimeCallback = Box::new(move |t| sink.lock().unwrap().push(t));
        pace(0.05, &cb);
        let seen = seen.lock().unwrap();
        assert!(seen.len() >= 2);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 0.05);
    }
}
