//! rodio output for the APU sample stream.

use std::sync::mpsc::{Receiver, SyncSender, sync_channel};

use famiclock::{AudioSink, Console, apu::apu::CPU_CLOCK_HZ};
use log::warn;
use rodio::{OutputStream, Source};

const OUTPUT_RATE: u32 = 44_100;

/// Half a second of buffered output.
const BUFFER_SAMPLES: usize = OUTPUT_RATE as usize / 2;

/// Averages APU samples down to the output rate and hands them to the audio thread.
struct RodioSink {
    tx: SyncSender<f32>,
    step: f64,
    phase: f64,
    sum: f32,
    count: u32,
}

impl RodioSink {
    fn new(tx: SyncSender<f32>) -> Self {
        Self {
            tx,
            step: OUTPUT_RATE as f64 / CPU_CLOCK_HZ,
            phase: 0.0,
            sum: 0.0,
            count: 0,
        }
    }
}

impl AudioSink for RodioSink {
    fn push_sample(&mut self, sample: f32) {
        self.sum += sample;
        self.count += 1;
        self.phase += self.step;

        if self.phase >= 1.0 {
            self.phase -= 1.0;
            let averaged = self.sum / self.count as f32;
            self.sum = 0.0;
            self.count = 0;
            // A full buffer means the emulator is ahead of playback; drop the sample.
            let _ = self.tx.try_send(averaged);
        }
    }
}

/// Streaming source backed by a channel. Outputs silence on underrun.
struct StreamSource {
    rx: Receiver<f32>,
}

impl Iterator for StreamSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        Some(self.rx.try_recv().unwrap_or(0.0))
    }
}

impl Source for StreamSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        OUTPUT_RATE
    }

    fn total_duration(&self) -> Option<std::time::Duration> {
        None
    }
}

/// Open the default output device and attach it to `console`. The returned stream must be kept
/// alive for playback to continue. Audio problems are not fatal.
pub fn start(console: &mut Console) -> Option<OutputStream> {
    let (stream, handle) = match OutputStream::try_default() {
        Ok(s) => s,
        Err(e) => {
            warn!("audio disabled: {e}");
            return None;
        }
    };

    let (tx, rx) = sync_channel(BUFFER_SAMPLES);
    if let Err(e) = handle.play_raw(StreamSource { rx }.convert_samples()) {
        warn!("audio disabled: {e}");
        return None;
    }

    console.set_audio_sink(RodioSink::new(tx));
    Some(stream)
}
