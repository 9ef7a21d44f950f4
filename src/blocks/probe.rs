//! Probe: a complex sink that summarizes what it sees.
//!
//! Generics:
//! - `limit`: finish the run after this many samples;
//! - `path`: also write the trace as a two-channel float WAV (re, im);
//! - `rate`: WAV sample rate, default 48000.
//!
//! Results: `count`, `last`, `sum` and `peak` (largest magnitude).

use crate::block::{Block, ComponentKind, TypedStep};
use crate::context::{EpilogContext, InitContext, StepContext};
use crate::descriptor::{BlockPrototype, PortSpec};
use crate::error::BlockError;
use crate::plugin::BlockEntry;
use hound::{SampleFormat, WavSpec, WavWriter};
use num_complex::Complex64;
use std::fs::File;
use std::io::BufWriter;
use tracing::{debug, info};

/// Complex sink.
pub static PROTOTYPE: BlockPrototype = BlockPrototype {
    name: "probe",
    generics: &["limit", "path", "rate"],
    results: &["count", "last", "sum", "peak"],
    inputs: &[PortSpec::complex("in", 1)],
    outputs: &[],
};

const DEFAULT_RATE: u32 = 48_000;

#[derive(Default)]
struct Probe {
    limit: Option<u64>,
    count: u64,
    last: Complex64,
    sum: Complex64,
    peak: f64,
    wav: Option<WavWriter<BufWriter<File>>>,
}

fn wav_error(err: hound::Error) -> BlockError {
    BlockError::runtime(format!("wav output: {err}"))
}

impl Block for Probe {
    fn init(&mut self, cx: &mut InitContext<'_>) -> Result<(), BlockError> {
        let (limit, unlimited) = cx.get_or("limit", 0u64)?;
        self.limit = (!unlimited).then_some(limit);
        if let Some(path) = cx.value("path")? {
            let path: String = path.get().ok_or_else(|| BlockError::InvalidGeneric {
                name: "path".into(),
                expected: "text",
                found: path.type_name(),
            })?;
            let (rate, _) = cx.get_or("rate", DEFAULT_RATE)?;
            let spec = WavSpec {
                channels: 2,
                sample_rate: rate,
                bits_per_sample: 32,
                sample_format: SampleFormat::Float,
            };
            self.wav = Some(WavWriter::create(&path, spec).map_err(wav_error)?);
            debug!(component = cx.name(), %path, rate, "probe writing wav");
        }
        Ok(())
    }

    fn epilog(&mut self, cx: &mut EpilogContext<'_>) -> Result<(), BlockError> {
        if let Some(wav) = self.wav.take() {
            wav.finalize().map_err(wav_error)?;
        }
        cx.set("count", self.count)?;
        cx.set("last", self.last)?;
        cx.set("sum", self.sum)?;
        cx.set("peak", self.peak)?;
        info!(component = cx.name(), samples = self.count, peak = self.peak, "probe summary");
        Ok(())
    }
}

impl TypedStep<Complex64, Complex64> for Probe {
    fn step_one(
        &mut self,
        inputs: &[Complex64],
        _outputs: &mut [Complex64],
        cx: &mut StepContext<'_>,
    ) -> Result<(), BlockError> {
        if self.limit.is_some_and(|limit| self.count >= limit) {
            cx.finish();
            return Ok(());
        }
        let z = inputs[0];
        self.count += 1;
        self.last = z;
        self.sum += z;
        self.peak = self.peak.max(z.norm());
        if let Some(wav) = self.wav.as_mut() {
            wav.write_sample(z.re as f32).map_err(wav_error)?;
            wav.write_sample(z.im as f32).map_err(wav_error)?;
        }
        if self.limit == Some(self.count) {
            cx.finish();
        }
        Ok(())
    }
}

fn create() -> ComponentKind {
    ComponentKind::complex(Probe::default())
}

/// Module entry.
pub static ENTRY: BlockEntry = BlockEntry::new(&PROTOTYPE, create);
