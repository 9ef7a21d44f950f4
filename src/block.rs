//! Block behaviour: lifecycle hooks and the typed step kinds.
//!
//! Every block implements [`Block`] for its check/init/epilog hooks plus one
//! step capability, chosen when the block is wrapped in a [`ComponentKind`]:
//!
//! | kind            | trait                              |
//! |-----------------|------------------------------------|
//! | `Bytes`         | `ByteStep`                         |
//! | `Complex`       | `TypedStep<Complex64, Complex64>`  |
//! | `ComplexToInt`  | `TypedStep<Complex64, i32>`        |
//! | `IntToComplex`  | `TypedStep<i32, Complex64>`        |
//! | `Int`           | `TypedStep<i32, i32>`              |
//!
//! Connections always carry bytes. Typed kinds decode their staged inputs into
//! the element type before stepping and encode their outputs afterwards.

use crate::context::{CheckContext, EpilogContext, InitContext, StepContext};
use crate::descriptor::ElementType;
use crate::error::BlockError;
use num_complex::Complex64;

/// A sample type that typed step kinds can decode from and encode to bytes.
pub trait Sample: Copy + Default + 'static {
    /// Element type a port must declare to carry this sample.
    const ELEMENT: ElementType;

    /// Decode from exactly `ELEMENT.size()` bytes.
    fn decode(bytes: &[u8]) -> Self;

    /// Encode into exactly `ELEMENT.size()` bytes.
    fn encode(self, bytes: &mut [u8]);
}

impl Sample for Complex64 {
    const ELEMENT: ElementType = ElementType::COMPLEX;

    fn decode(bytes: &[u8]) -> Self {
        let mut re = [0u8; 8];
        let mut im = [0u8; 8];
        re.copy_from_slice(&bytes[..8]);
        im.copy_from_slice(&bytes[8..16]);
        Complex64::new(f64::from_ne_bytes(re), f64::from_ne_bytes(im))
    }

    fn encode(self, bytes: &mut [u8]) {
        bytes[..8].copy_from_slice(&self.re.to_ne_bytes());
        bytes[8..16].copy_from_slice(&self.im.to_ne_bytes());
    }
}

impl Sample for i32 {
    const ELEMENT: ElementType = ElementType::INT;

    fn decode(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes[..4]);
        i32::from_ne_bytes(raw)
    }

    fn encode(self, bytes: &mut [u8]) {
        bytes[..4].copy_from_slice(&self.to_ne_bytes());
    }
}

/// Lifecycle hooks shared by every block kind.
pub trait Block: 'static {
    /// Validate the wiring once ports are bound. Report defects through
    /// [`CheckContext::check_error`] so they are batched; return `Err` only
    /// for fatal problems.
    fn check(&mut self, _cx: &mut CheckContext<'_>) -> Result<(), BlockError> {
        Ok(())
    }

    /// Read generics and request buffer depths.
    fn init(&mut self, _cx: &mut InitContext<'_>) -> Result<(), BlockError> {
        Ok(())
    }

    /// Runs once after the last tick. The only place results can be set.
    fn epilog(&mut self, _cx: &mut EpilogContext<'_>) -> Result<(), BlockError> {
        Ok(())
    }
}

/// Step capability over raw bytes, for blocks that move elements without
/// interpreting them.
pub trait ByteStep: Block {
    /// Process `count` elements per port. `inputs[p]` holds
    /// `count * element_size` bytes for physical input `p`.
    ///
    /// The default calls [`step_one`](Self::step_one) `count` times.
    fn step(
        &mut self,
        count: usize,
        inputs: &[&[u8]],
        outputs: &mut [&mut [u8]],
        cx: &mut StepContext<'_>,
    ) -> Result<(), BlockError> {
        let in_sizes = cx.input_sizes().to_vec();
        let out_sizes = cx.output_sizes().to_vec();
        for i in 0..count {
            let ins: Vec<&[u8]> = inputs
                .iter()
                .zip(&in_sizes)
                .map(|(port, &size)| &port[i * size..(i + 1) * size])
                .collect();
            let mut outs: Vec<&mut [u8]> = outputs
                .iter_mut()
                .zip(&out_sizes)
                .map(|(port, &size)| &mut port[i * size..(i + 1) * size])
                .collect();
            self.step_one(&ins, &mut outs, cx)?;
        }
        Ok(())
    }

    /// Process one element per port.
    fn step_one(
        &mut self,
        _inputs: &[&[u8]],
        _outputs: &mut [&mut [u8]],
        _cx: &mut StepContext<'_>,
    ) -> Result<(), BlockError> {
        Err(BlockError::StepNotImplemented)
    }
}

/// Step capability over decoded samples.
pub trait TypedStep<I: Sample, O: Sample>: Block {
    /// Process `count` samples per port.
    ///
    /// The default calls [`step_one`](Self::step_one) once per sample index,
    /// gathering `inputs[p][i]` and scattering into `outputs[p][i]`.
    fn step(
        &mut self,
        count: usize,
        inputs: &[&[I]],
        outputs: &mut [&mut [O]],
        cx: &mut StepContext<'_>,
    ) -> Result<(), BlockError> {
        let mut ins = vec![I::default(); inputs.len()];
        let mut outs = vec![O::default(); outputs.len()];
        for i in 0..count {
            for (slot, port) in ins.iter_mut().zip(inputs) {
                *slot = port[i];
            }
            self.step_one(&ins, &mut outs, cx)?;
            for (port, value) in outputs.iter_mut().zip(&outs) {
                port[i] = *value;
            }
        }
        Ok(())
    }

    /// Process one sample per port.
    fn step_one(
        &mut self,
        _inputs: &[I],
        _outputs: &mut [O],
        _cx: &mut StepContext<'_>,
    ) -> Result<(), BlockError> {
        Err(BlockError::StepNotImplemented)
    }
}

/// The closed set of step kinds a component can have.
pub enum ComponentKind {
    /// Opaque elements of any size.
    Bytes(Box<dyn ByteStep>),
    /// Complex in, complex out.
    Complex(Box<dyn TypedStep<Complex64, Complex64>>),
    /// Complex in, integer out.
    ComplexToInt(Box<dyn TypedStep<Complex64, i32>>),
    /// Integer in, complex out.
    IntToComplex(Box<dyn TypedStep<i32, Complex64>>),
    /// Integer in, integer out.
    Int(Box<dyn TypedStep<i32, i32>>),
}

impl ComponentKind {
    /// Wrap a byte-level block.
    pub fn bytes(block: impl ByteStep) -> Self {
        ComponentKind::Bytes(Box::new(block))
    }

    /// Wrap a complex-only block.
    pub fn complex(block: impl TypedStep<Complex64, Complex64>) -> Self {
        ComponentKind::Complex(Box::new(block))
    }

    /// Wrap a complex-to-integer block.
    pub fn complex_to_int(block: impl TypedStep<Complex64, i32>) -> Self {
        ComponentKind::ComplexToInt(Box::new(block))
    }

    /// Wrap an integer-to-complex block.
    pub fn int_to_complex(block: impl TypedStep<i32, Complex64>) -> Self {
        ComponentKind::IntToComplex(Box::new(block))
    }

    /// Wrap an integer-only block.
    pub fn int(block: impl TypedStep<i32, i32>) -> Self {
        ComponentKind::Int(Box::new(block))
    }

    /// Kind name, for logs.
    pub fn label(&self) -> &'static str {
        match self {
            ComponentKind::Bytes(_) => "bytes",
            ComponentKind::Complex(_) => "complex",
            ComponentKind::ComplexToInt(_) => "complex-to-int",
            ComponentKind::IntToComplex(_) => "int-to-complex",
            ComponentKind::Int(_) => "int",
        }
    }

    /// Element types every input and output must carry, or `None` for bytes.
    pub fn element_types(&self) -> Option<(ElementType, ElementType)> {
        match self {
            ComponentKind::Bytes(_) => None,
            ComponentKind::Complex(_) => Some((Complex64::ELEMENT, Complex64::ELEMENT)),
            ComponentKind::ComplexToInt(_) => Some((Complex64::ELEMENT, i32::ELEMENT)),
            ComponentKind::IntToComplex(_) => Some((i32::ELEMENT, Complex64::ELEMENT)),
            ComponentKind::Int(_) => Some((i32::ELEMENT, i32::ELEMENT)),
        }
    }

    pub(crate) fn check(&mut self, cx: &mut CheckContext<'_>) -> Result<(), BlockError> {
        if let Some((input, output)) = self.element_types() {
            cx.require_element_types(input, output)?;
        }
        match self {
            ComponentKind::Bytes(b) => b.check(cx),
            ComponentKind::Complex(b) => b.check(cx),
            ComponentKind::ComplexToInt(b) => b.check(cx),
            ComponentKind::IntToComplex(b) => b.check(cx),
            ComponentKind::Int(b) => b.check(cx),
        }
    }

    pub(crate) fn init(&mut self, cx: &mut InitContext<'_>) -> Result<(), BlockError> {
        match self {
            ComponentKind::Bytes(b) => b.init(cx),
            ComponentKind::Complex(b) => b.init(cx),
            ComponentKind::ComplexToInt(b) => b.init(cx),
            ComponentKind::IntToComplex(b) => b.init(cx),
            ComponentKind::Int(b) => b.init(cx),
        }
    }

    pub(crate) fn epilog(&mut self, cx: &mut EpilogContext<'_>) -> Result<(), BlockError> {
        match self {
            ComponentKind::Bytes(b) => b.epilog(cx),
            ComponentKind::Complex(b) => b.epilog(cx),
            ComponentKind::ComplexToInt(b) => b.epilog(cx),
            ComponentKind::IntToComplex(b) => b.epilog(cx),
            ComponentKind::Int(b) => b.epilog(cx),
        }
    }

    /// Run one chunk over staged byte buffers.
    pub(crate) fn step(
        &mut self,
        count: usize,
        stage_in: &[Vec<u8>],
        stage_out: &mut [Vec<u8>],
        cx: &mut StepContext<'_>,
    ) -> Result<(), BlockError> {
        match self {
            ComponentKind::Bytes(b) => {
                let ins: Vec<&[u8]> = stage_in.iter().map(Vec::as_slice).collect();
                let mut outs: Vec<&mut [u8]> = stage_out.iter_mut().map(Vec::as_mut_slice).collect();
                b.step(count, &ins, &mut outs, cx)
            }
            ComponentKind::Complex(b) => step_typed(&mut **b, count, stage_in, stage_out, cx),
            ComponentKind::ComplexToInt(b) => step_typed(&mut **b, count, stage_in, stage_out, cx),
            ComponentKind::IntToComplex(b) => step_typed(&mut **b, count, stage_in, stage_out, cx),
            ComponentKind::Int(b) => step_typed(&mut **b, count, stage_in, stage_out, cx),
        }
    }
}

fn step_typed<I: Sample, O: Sample>(
    block: &mut dyn TypedStep<I, O>,
    count: usize,
    stage_in: &[Vec<u8>],
    stage_out: &mut [Vec<u8>],
    cx: &mut StepContext<'_>,
) -> Result<(), BlockError> {
    let inputs: Vec<Vec<I>> = stage_in
        .iter()
        .map(|bytes| bytes.chunks_exact(I::ELEMENT.size()).map(I::decode).collect())
        .collect();
    let mut outputs: Vec<Vec<O>> = vec![vec![O::default(); count]; stage_out.len()];
    {
        let ins: Vec<&[I]> = inputs.iter().map(Vec::as_slice).collect();
        let mut outs: Vec<&mut [O]> = outputs.iter_mut().map(Vec::as_mut_slice).collect();
        block.step(count, &ins, &mut outs, cx)?;
    }
    for (bytes, values) in stage_out.iter_mut().zip(&outputs) {
        for (raw, value) in bytes.chunks_exact_mut(O::ELEMENT.size()).zip(values) {
            value.encode(raw);
        }
    }
    Ok(())
}
