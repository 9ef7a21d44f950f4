//! Block and port descriptors.
//!
//! A block author writes a [`BlockPrototype`] as a `static`: names and port
//! layouts as `&'static` data, nothing allocated. The engine derives an owned
//! [`BlockDescriptor`] from it the first time the block kind is instantiated
//! and caches it for the rest of the process, so every component of a kind
//! shares one descriptor.

use crate::invariant_ppt::{assert_invariant, DESCRIPTOR_CACHED};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError};

/// Element type carried by a port: a type name and its size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementType {
    name: &'static str,
    size: usize,
}

impl ElementType {
    /// Double precision complex samples.
    pub const COMPLEX: ElementType = ElementType::new("complex", 16);
    /// 32-bit signed integer samples.
    pub const INT: ElementType = ElementType::new("int", 4);
    /// Double precision real samples.
    pub const REAL: ElementType = ElementType::new("real", 8);

    /// A custom element type. `size` must be non-zero.
    pub const fn new(name: &'static str, size: usize) -> Self {
        assert!(size > 0, "element size must be non-zero");
        Self { name, size }
    }

    /// Type name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Size of one element in bytes.
    pub const fn size(&self) -> usize {
        self.size
    }
}

/// Statically authored port layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSpec {
    /// Port name.
    pub name: &'static str,
    /// Element type.
    pub ty: ElementType,
    /// Whether the port expands to one physical connection per edge.
    pub multi: bool,
    /// Minimum buffer depth in elements.
    pub initial_chunk: usize,
}

impl PortSpec {
    /// A single-connection port.
    pub const fn new(name: &'static str, ty: ElementType, initial_chunk: usize) -> Self {
        Self {
            name,
            ty,
            multi: false,
            initial_chunk,
        }
    }

    /// A multi-port.
    pub const fn multi(name: &'static str, ty: ElementType, initial_chunk: usize) -> Self {
        Self {
            name,
            ty,
            multi: true,
            initial_chunk,
        }
    }

    /// A single complex port.
    pub const fn complex(name: &'static str, initial_chunk: usize) -> Self {
        Self::new(name, ElementType::COMPLEX, initial_chunk)
    }

    /// A single integer port.
    pub const fn int(name: &'static str, initial_chunk: usize) -> Self {
        Self::new(name, ElementType::INT, initial_chunk)
    }
}

/// Statically authored block prototype.
#[derive(Debug)]
pub struct BlockPrototype {
    /// Block name, unique within a registry.
    pub name: &'static str,
    /// Generic parameter names.
    pub generics: &'static [&'static str],
    /// Result names.
    pub results: &'static [&'static str],
    /// Input ports, in order.
    pub inputs: &'static [PortSpec],
    /// Output ports, in order.
    pub outputs: &'static [PortSpec],
}

impl BlockPrototype {
    /// Serialized textual prototype, see [`BlockDescriptor::to_prototype_string`].
    pub fn describe(&self) -> String {
        BlockDescriptor::from_prototype(self).to_prototype_string()
    }
}

/// Runtime description of one port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    /// Port name.
    pub name: String,
    /// Element type name.
    pub type_name: String,
    /// Element size in bytes, always non-zero.
    pub element_size: usize,
    /// Whether this is a multi-port.
    pub multi: bool,
    /// Minimum buffer depth in elements.
    pub initial_chunk: usize,
}

impl PortDescriptor {
    fn from_spec(spec: &PortSpec) -> Self {
        Self {
            name: spec.name.to_owned(),
            type_name: spec.ty.name().to_owned(),
            element_size: spec.ty.size(),
            multi: spec.multi,
            initial_chunk: spec.initial_chunk,
        }
    }

    /// Whether this port carries `ty`.
    pub fn carries(&self, ty: ElementType) -> bool {
        self.type_name == ty.name() && self.element_size == ty.size()
    }

    /// Whether two ports carry the same element type.
    pub fn same_type(&self, other: &PortDescriptor) -> bool {
        self.type_name == other.type_name && self.element_size == other.element_size
    }
}

/// Immutable metadata for a block kind, shared by all its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDescriptor {
    name: String,
    generics: Vec<String>,
    results: Vec<String>,
    inputs: Vec<PortDescriptor>,
    outputs: Vec<PortDescriptor>,
}

/// Errors reading a textual prototype.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParsePrototypeError {
    /// The text has no `block` line.
    #[error("prototype has no block line")]
    MissingBlock,
    /// A line could not be understood.
    #[error("line {line}: {reason}")]
    BadLine {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },
}

impl BlockDescriptor {
    /// Derive an owned descriptor from a static prototype.
    pub fn from_prototype(proto: &BlockPrototype) -> Self {
        Self {
            name: proto.name.to_owned(),
            generics: proto.generics.iter().map(|g| (*g).to_owned()).collect(),
            results: proto.results.iter().map(|r| (*r).to_owned()).collect(),
            inputs: proto.inputs.iter().map(PortDescriptor::from_spec).collect(),
            outputs: proto.outputs.iter().map(PortDescriptor::from_spec).collect(),
        }
    }

    /// Block name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Generic parameter names.
    pub fn generics(&self) -> &[String] {
        &self.generics
    }

    /// Result names.
    pub fn results(&self) -> &[String] {
        &self.results
    }

    /// Input ports.
    pub fn inputs(&self) -> &[PortDescriptor] {
        &self.inputs
    }

    /// Output ports.
    pub fn outputs(&self) -> &[PortDescriptor] {
        &self.outputs
    }

    /// Index of a generic by name.
    pub fn generic_index(&self, name: &str) -> Option<usize> {
        self.generics.iter().position(|g| g == name)
    }

    /// Index of a result by name.
    pub fn result_index(&self, name: &str) -> Option<usize> {
        self.results.iter().position(|r| r == name)
    }

    /// Index of an input port by name.
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|p| p.name == name)
    }

    /// Index of an output port by name.
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|p| p.name == name)
    }

    /// Line-oriented textual form:
    ///
    /// ```text
    /// block gain
    /// generic gain
    /// input in complex 16 single 1
    /// output out complex 16 single 1
    /// ```
    pub fn to_prototype_string(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "block {}", self.name);
        for g in &self.generics {
            let _ = writeln!(out, "generic {g}");
        }
        for r in &self.results {
            let _ = writeln!(out, "result {r}");
        }
        for (dir, ports) in [("input", &self.inputs), ("output", &self.outputs)] {
            for p in ports {
                let _ = writeln!(
                    out,
                    "{dir} {} {} {} {} {}",
                    p.name,
                    p.type_name,
                    p.element_size,
                    if p.multi { "multi" } else { "single" },
                    p.initial_chunk
                );
            }
        }
        out
    }

    /// Parse the output of [`to_prototype_string`](Self::to_prototype_string).
    pub fn parse_prototype(text: &str) -> Result<Self, ParsePrototypeError> {
        let mut name = None;
        let mut desc = Self {
            name: String::new(),
            generics: Vec::new(),
            results: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        };
        for (i, line) in text.lines().enumerate() {
            let bad = |reason: &str| ParsePrototypeError::BadLine {
                line: i + 1,
                reason: reason.to_owned(),
            };
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                [] => {}
                ["block", n] => name = Some((*n).to_owned()),
                ["generic", g] => desc.generics.push((*g).to_owned()),
                ["result", r] => desc.results.push((*r).to_owned()),
                [dir @ ("input" | "output"), port, ty, size, arity, chunk] => {
                    let element_size: usize = size.parse().map_err(|_| bad("bad element size"))?;
                    if element_size == 0 {
                        return Err(bad("element size must be non-zero"));
                    }
                    let multi = match *arity {
                        "single" => false,
                        "multi" => true,
                        _ => return Err(bad("arity must be single or multi")),
                    };
                    let initial_chunk = chunk.parse().map_err(|_| bad("bad initial chunk"))?;
                    let port = PortDescriptor {
                        name: (*port).to_owned(),
                        type_name: (*ty).to_owned(),
                        element_size,
                        multi,
                        initial_chunk,
                    };
                    if *dir == "input" {
                        desc.inputs.push(port);
                    } else {
                        desc.outputs.push(port);
                    }
                }
                _ => return Err(bad("unrecognized line")),
            }
        }
        desc.name = name.ok_or(ParsePrototypeError::MissingBlock)?;
        Ok(desc)
    }
}

lazy_static! {
    static ref DESCRIPTOR_CACHE: Mutex<HashMap<String, Arc<BlockDescriptor>>> =
        Mutex::new(HashMap::new());
}

/// Descriptor for `proto`, derived on first use and cached by block name.
pub fn cached_descriptor(proto: &BlockPrototype) -> Arc<BlockDescriptor> {
    let mut cache = DESCRIPTOR_CACHE
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let desc = cache
        .entry(proto.name.to_owned())
        .or_insert_with(|| Arc::new(BlockDescriptor::from_prototype(proto)))
        .clone();
    assert_invariant(
        DESCRIPTOR_CACHED,
        desc.name() == proto.name,
        "cached descriptor matches its block name",
        Some("cached_descriptor"),
    );
    desc
}
