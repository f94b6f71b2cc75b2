/// Sound: procedural 8-bit style effects.
///
/// All sounds are generated as in-memory WAV buffers by the asset loader
/// (`SoundBank::generate`), so synthesis never runs on the game thread.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

use std::sync::Arc;

const SAMPLE_RATE: u32 = 22050;
const TAU: f32 = std::f32::consts::TAU;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sfx {
    Jump,
    Thud,
    Fall,
    Slip,
    Land,
    Splash,
    Submerge,
    Win,
    Blip,
}

impl Sfx {
    pub const ALL: [Sfx; 9] = [
        Sfx::Jump,
        Sfx::Thud,
        Sfx::Fall,
        Sfx::Slip,
        Sfx::Land,
        Sfx::Splash,
        Sfx::Submerge,
        Sfx::Win,
        Sfx::Blip,
    ];

    fn samples(self) -> Vec<f32> {
        match self {
            Sfx::Jump => gen_sweep(300.0, 700.0, 0.10, 0.25),
            Sfx::Thud => gen_thud(),
            Sfx::Fall => gen_sweep(600.0, 200.0, 0.15, 0.25),
            Sfx::Slip => gen_sweep(500.0, 380.0, 0.20, 0.15),
            Sfx::Land => gen_blip(180.0, 0.05, 0.3),
            Sfx::Splash => gen_noise(0.35, 0.35, 7),
            Sfx::Submerge => gen_bubbles(),
            Sfx::Win => gen_fanfare(),
            Sfx::Blip => gen_blip(880.0, 0.03, 0.2),
        }
    }
}

/// Pre-generated WAV buffers, one per `Sfx`.
#[derive(Clone, Debug, Default)]
pub struct SoundBank {
    buffers: Vec<Arc<Vec<u8>>>,
}

impl SoundBank {
    pub fn generate() -> Self {
        SoundBank {
            buffers: Sfx::ALL.iter().map(|s| Arc::new(make_wav(&s.samples()))).collect(),
        }
    }

    pub fn get(&self, sfx: Sfx) -> Option<&Arc<Vec<u8>>> {
        self.buffers.get(sfx as usize)
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::{Sfx, SoundBank};

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        bank: SoundBank,
    }

    impl SoundEngine {
        pub fn new(bank: SoundBank) -> Option<Self> {
            let (stream, handle) = OutputStream::try_default().ok()?;
            Some(SoundEngine { _stream: stream, handle, bank })
        }

        pub fn play(&self, sfx: Sfx) {
            let Some(buf) = self.bank.get(sfx) else { return };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: no-ops when the sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new(_bank: SoundBank) -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _sfx: Sfx) {}
}

// ════════════════════════════════════════════════════════════
//  Waveform generators: mono f32 samples
// ════════════════════════════════════════════════════════════

/// Simple sine blip at given frequency and duration
fn gen_blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
    let n = (SAMPLE_RATE as f32 * duration) as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32); // linear fade out
            (t * freq * TAU).sin() * env * volume
        })
        .collect()
}

/// Linear pitch sweep, used for jump (up), fall and slip (down)
fn gen_sweep(from: f32, to: f32, duration: f32, volume: f32) -> Vec<f32> {
    let n = (SAMPLE_RATE as f32 * duration) as usize;
    let mut phase = 0.0f32;
    (0..n)
        .map(|i| {
            let t = i as f32 / n as f32;
            let freq = from + (to - from) * t;
            phase += freq / SAMPLE_RATE as f32;
            let env = (1.0 - t).powf(0.6);
            (phase * TAU).sin() * env * volume
        })
        .collect()
}

/// LCG white noise with a decaying envelope
fn gen_noise(duration: f32, volume: f32, seed: u32) -> Vec<f32> {
    let n = (SAMPLE_RATE as f32 * duration) as usize;
    let mut rng: u32 = seed;
    (0..n)
        .map(|i| {
            let t = i as f32 / n as f32;
            rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
            let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
            noise * (1.0 - t).powf(1.5) * volume
        })
        .collect()
}

/// Wall hit: low tone plus a noise crack
fn gen_thud() -> Vec<f32> {
    let tone = gen_sweep(160.0, 60.0, 0.18, 0.5);
    let crack = gen_noise(0.05, 0.3, 99);
    tone.iter()
        .enumerate()
        .map(|(i, &s)| s + crack.get(i).copied().unwrap_or(0.0))
        .collect()
}

/// Going under: a few wobbling low bubbles
fn gen_bubbles() -> Vec<f32> {
    let mut samples = Vec::new();
    for &freq in &[220.0_f32, 180.0, 260.0, 150.0] {
        let n = (SAMPLE_RATE as f32 * 0.08) as usize;
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let wobble = 1.0 + 0.2 * (t * 30.0 * TAU).sin();
            let env = (1.0 - i as f32 / n as f32).powf(0.5);
            samples.push((t * freq * wobble * TAU).sin() * env * 0.3);
        }
    }
    samples
}

/// Reached the top: a rising arpeggio C5-E5-G5-C6 with the top note held.
fn gen_fanfare() -> Vec<f32> {
    let mut samples = Vec::new();
    for &freq in &[523.0_f32, 659.0, 784.0] {
        samples.extend(gen_chime(freq, 0.1, 0.3));
    }
    samples.extend(gen_chime(1047.0, 0.35, 1.0));
    samples
}

/// Sine with two overtones; `decay` is how much of the volume is lost
/// by the end of the note.
fn gen_chime(freq: f32, duration: f32, decay: f32) -> Vec<f32> {
    let n = (SAMPLE_RATE as f32 * duration) as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32) * decay;
            let wave = [(1.0, 0.6), (2.0, 0.3), (3.0, 0.1)]
                .iter()
                .map(|&(h, amp)| (t * freq * h * TAU).sin() * amp)
                .sum::<f32>();
            wave * env * 0.3
        })
        .collect()
}

// ════════════════════════════════════════════════════════════
//  WAV encoder: 16-bit mono PCM
// ════════════════════════════════════════════════════════════

fn make_wav(samples: &[f32]) -> Vec<u8> {
    const BYTES_PER_SAMPLE: u32 = 2;
    let data_size = samples.len() as u32 * BYTES_PER_SAMPLE;

    let mut buf = Vec::with_capacity(44 + data_size as usize);
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    for (value, width) in [
        (16, 4),                            // chunk size
        (1, 2),                             // PCM
        (1, 2),                             // channels
        (SAMPLE_RATE, 4),
        (SAMPLE_RATE * BYTES_PER_SAMPLE, 4), // byte rate
        (BYTES_PER_SAMPLE, 2),              // block align
        (16, 2),                            // bits per sample
    ] {
        buf.extend_from_slice(&value.to_le_bytes()[..width]);
    }

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &s in samples {
        let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
        buf.extend_from_slice(&val.to_le_bytes());
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_has_a_valid_wav_per_effect() {
        let bank = SoundBank::generate();
        for sfx in Sfx::ALL {
            let wav = bank.get(sfx).unwrap();
            assert_eq!(&wav[0..4], b"RIFF", "{sfx:?}");
            assert_eq!(&wav[8..12], b"WAVE");
            let data = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]) as usize;
            assert_eq!(wav.len(), 44 + data);
            assert!(data > 0);
        }
    }

    #[test]
    fn samples_stay_in_range() {
        for sfx in Sfx::ALL {
            assert!(sfx.samples().iter().all(|s| s.abs() <= 1.0), "{sfx:?}");
        }
    }
}
