//! Component: a runtime instance of a block.
//!
//! A component walks a fixed lifecycle. The driver moves it forward; calling
//! a phase out of order is a [`SimError::Lifecycle`] rather than a silent
//! no-op, so a misbehaving host cannot, say, tick a component whose buffers
//! were never attached.

use crate::block::ComponentKind;
use crate::connection::Connection;
use crate::context::{CheckContext, EpilogContext, InitContext, StepContext};
use crate::descriptor::BlockDescriptor;
use crate::error::{BlockError, CheckFailure, Result, SimError};
use crate::invariant_ppt::{assert_invariant, EPILOG_ONCE};
use crate::value::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Lifecycle states, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lifecycle {
    /// Constructed, nothing bound.
    Unbound,
    /// Name assigned.
    Named,
    /// Descriptor attached.
    Blocked,
    /// Generics and result storage bound.
    Configured,
    /// Check phase passed.
    Checked,
    /// Init phase ran; chunk requests recorded.
    Initialized,
    /// Connections attached; ticking.
    Running,
    /// Tick loop ended; waiting for epilog.
    Finishing,
    /// Epilog ran.
    Completed,
}

/// Handle to a value held by a [`ResourceArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(usize);

/// Owned auxiliary allocations, released in reverse registration order.
#[derive(Default)]
pub struct ResourceArena {
    items: Vec<Box<dyn Any>>,
}

impl ResourceArena {
    /// Take ownership of `value`.
    pub fn register<T: Any>(&mut self, value: T) -> ResourceId {
        self.items.push(Box::new(value));
        ResourceId(self.items.len() - 1)
    }

    /// Borrow a resource, if `id` holds a `T`.
    pub fn get<T: Any>(&self, id: ResourceId) -> Option<&T> {
        self.items.get(id.0)?.downcast_ref()
    }

    /// Mutably borrow a resource, if `id` holds a `T`.
    pub fn get_mut<T: Any>(&mut self, id: ResourceId) -> Option<&mut T> {
        self.items.get_mut(id.0)?.downcast_mut()
    }

    /// Number of held resources.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is held.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Drop for ResourceArena {
    fn drop(&mut self) {
        while let Some(item) = self.items.pop() {
            drop(item);
        }
    }
}

impl fmt::Debug for ResourceArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceArena")
            .field("len", &self.items.len())
            .finish()
    }
}

/// Runtime instance of a block.
pub struct Component {
    kind: ComponentKind,
    name: String,
    descriptor: Option<Arc<BlockDescriptor>>,
    state: Lifecycle,
    /// Physical input index -> declared input port index.
    input_ports: Vec<usize>,
    /// Physical output index -> declared output port index.
    output_ports: Vec<usize>,
    generics: Vec<Option<Value>>,
    results: Vec<Option<Value>>,
    in_chunks: Vec<usize>,
    out_chunks: Vec<usize>,
    in_sizes: Vec<usize>,
    out_sizes: Vec<usize>,
    inputs: Vec<Option<Connection>>,
    outputs: Vec<Option<Connection>>,
    stage_in: Vec<Vec<u8>>,
    stage_out: Vec<Vec<u8>>,
    finished: bool,
    finished_trigger: bool,
    arena: ResourceArena,
    // Dropped last: block code above may live in this library.
    _module: Option<Arc<libloading::Library>>,
}

impl Component {
    /// Wrap a block. The component starts [`Lifecycle::Unbound`].
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            name: String::new(),
            descriptor: None,
            state: Lifecycle::Unbound,
            input_ports: Vec::new(),
            output_ports: Vec::new(),
            generics: Vec::new(),
            results: Vec::new(),
            in_chunks: Vec::new(),
            out_chunks: Vec::new(),
            in_sizes: Vec::new(),
            out_sizes: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            stage_in: Vec::new(),
            stage_out: Vec::new(),
            finished: false,
            finished_trigger: false,
            arena: ResourceArena::default(),
            _module: None,
        }
    }

    pub(crate) fn with_module(mut self, module: Option<Arc<libloading::Library>>) -> Self {
        self._module = module;
        self
    }

    fn expect(&self, expected: Lifecycle) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SimError::Lifecycle {
                component: self.name.clone(),
                expected,
                found: self.state,
            })
        }
    }

    fn advance_to(&mut self, next: Lifecycle) {
        debug!(component = %self.name, from = ?self.state, to = ?next, "lifecycle");
        self.state = next;
    }

    fn bound(&self) -> Result<Arc<BlockDescriptor>> {
        self.descriptor.clone().ok_or_else(|| SimError::Lifecycle {
            component: self.name.clone(),
            expected: Lifecycle::Blocked,
            found: self.state,
        })
    }

    /// Assign the component name.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        if self.state > Lifecycle::Named {
            self.expect(Lifecycle::Named)?;
        }
        self.name = name.into();
        self.advance_to(Lifecycle::Named);
        Ok(())
    }

    /// Attach the block descriptor. Physical port counts default to the
    /// declared port counts.
    pub fn set_descriptor(&mut self, descriptor: Arc<BlockDescriptor>) -> Result<()> {
        self.expect(Lifecycle::Named)?;
        self.input_ports = (0..descriptor.inputs().len()).collect();
        self.output_ports = (0..descriptor.outputs().len()).collect();
        self.descriptor = Some(descriptor);
        self.advance_to(Lifecycle::Blocked);
        Ok(())
    }

    /// Replace the physical port layout after multi-port expansion. Each
    /// entry maps a physical port to the declared port it instantiates, so
    /// `vec![0, 0, 0]` gives a single multi-input block three inputs.
    pub fn bind_ports(&mut self, input_ports: Vec<usize>, output_ports: Vec<usize>) -> Result<()> {
        self.expect(Lifecycle::Blocked)?;
        self.input_ports = input_ports;
        self.output_ports = output_ports;
        Ok(())
    }

    /// Bind generic values and allocate result storage. Every name must be
    /// declared by the block.
    pub fn set_generics(&mut self, generics: &BTreeMap<String, Value>) -> Result<()> {
        self.expect(Lifecycle::Blocked)?;
        let desc = self.bound()?;
        let mut slots = vec![None; desc.generics().len()];
        for (name, value) in generics {
            let index = desc.generic_index(name).ok_or_else(|| {
                SimError::from_block(&self.name, BlockError::UndeclaredGeneric(name.clone()))
            })?;
            slots[index] = Some(value.clone());
        }
        self.generics = slots;
        self.results = vec![None; desc.results().len()];
        self.advance_to(Lifecycle::Configured);
        Ok(())
    }

    /// Run the check phase. Returns the batched defects; a fatal block error
    /// is returned as `Err`. The component only reaches
    /// [`Lifecycle::Checked`] when no defect was reported, so `init` stays
    /// unreachable after a failed check.
    pub fn check(&mut self) -> Result<Vec<CheckFailure>> {
        self.expect(Lifecycle::Configured)?;
        let desc = self.bound()?;
        let mut failures = Vec::new();
        let mut cx = CheckContext {
            component: &self.name,
            descriptor: &desc,
            input_ports: &self.input_ports,
            output_ports: &self.output_ports,
            failures: &mut failures,
        };
        self.kind
            .check(&mut cx)
            .map_err(|e| SimError::from_block(&self.name, e))?;
        if failures.is_empty() {
            self.advance_to(Lifecycle::Checked);
        }
        Ok(failures
            .into_iter()
            .map(|message| CheckFailure {
                component: self.name.clone(),
                message,
            })
            .collect())
    }

    /// Run the init phase. Every physical port starts with a depth of
    /// `max(chunk, initial_chunk)` that the block may raise.
    pub fn init(&mut self, chunk: usize) -> Result<()> {
        self.expect(Lifecycle::Checked)?;
        let desc = self.bound()?;
        self.in_chunks = self
            .input_ports
            .iter()
            .map(|&p| chunk.max(desc.inputs()[p].initial_chunk))
            .collect();
        self.out_chunks = self
            .output_ports
            .iter()
            .map(|&p| chunk.max(desc.outputs()[p].initial_chunk))
            .collect();
        self.in_sizes = self
            .input_ports
            .iter()
            .map(|&p| desc.inputs()[p].element_size)
            .collect();
        self.out_sizes = self
            .output_ports
            .iter()
            .map(|&p| desc.outputs()[p].element_size)
            .collect();
        let mut cx = InitContext {
            component: &self.name,
            descriptor: &desc,
            generics: &self.generics,
            in_chunks: &mut self.in_chunks,
            out_chunks: &mut self.out_chunks,
            arena: &mut self.arena,
        };
        self.kind
            .init(&mut cx)
            .map_err(|e| SimError::from_block(&self.name, e))?;
        self.inputs = vec![None; self.input_ports.len()];
        self.outputs = vec![None; self.output_ports.len()];
        self.advance_to(Lifecycle::Initialized);
        Ok(())
    }

    /// Bind physical input `index` to a reader connection.
    pub fn attach_input(&mut self, index: usize, conn: Connection) -> Result<()> {
        self.expect(Lifecycle::Initialized)?;
        let count = self.inputs.len();
        let slot = self.inputs.get_mut(index).ok_or_else(|| {
            SimError::from_block(
                &self.name,
                BlockError::PortOutOfRange {
                    direction: "input",
                    index,
                    count,
                },
            )
        })?;
        *slot = Some(conn);
        Ok(())
    }

    /// Bind physical output `index` to a writer connection.
    pub fn attach_output(&mut self, index: usize, conn: Connection) -> Result<()> {
        self.expect(Lifecycle::Initialized)?;
        let count = self.outputs.len();
        let slot = self.outputs.get_mut(index).ok_or_else(|| {
            SimError::from_block(
                &self.name,
                BlockError::PortOutOfRange {
                    direction: "output",
                    index,
                    count,
                },
            )
        })?;
        *slot = Some(conn);
        Ok(())
    }

    /// Enter the running state. Every port must be attached; staging
    /// buffers are sized for `count` elements per tick.
    pub fn start(&mut self, count: usize) -> Result<()> {
        self.expect(Lifecycle::Initialized)?;
        if let Some(index) = self.inputs.iter().position(Option::is_none) {
            return Err(self.unattached("input", index));
        }
        if let Some(index) = self.outputs.iter().position(Option::is_none) {
            return Err(self.unattached("output", index));
        }
        self.stage_in = self.in_sizes.iter().map(|s| vec![0u8; s * count]).collect();
        self.stage_out = self.out_sizes.iter().map(|s| vec![0u8; s * count]).collect();
        self.advance_to(Lifecycle::Running);
        Ok(())
    }

    fn unattached(&self, direction: &str, index: usize) -> SimError {
        SimError::Runtime {
            component: self.name.clone(),
            message: format!("{direction} {index} has no connection"),
        }
    }

    /// Move `count` elements through the block: read every input, step,
    /// write every output, advance every cursor.
    pub fn tick(&mut self, count: usize, tick: u64) -> Result<()> {
        self.expect(Lifecycle::Running)?;
        for (conn, stage) in self.inputs.iter().zip(self.stage_in.iter_mut()) {
            if let Some(conn) = conn {
                conn.read(count, stage);
            }
        }
        let mut cx = StepContext {
            component: &self.name,
            tick,
            finish_trigger: &mut self.finished_trigger,
            input_sizes: &self.in_sizes,
            output_sizes: &self.out_sizes,
        };
        self.kind
            .step(count, &self.stage_in, &mut self.stage_out, &mut cx)
            .map_err(|e| SimError::from_block(&self.name, e))?;
        for (conn, stage) in self.outputs.iter().zip(&self.stage_out) {
            if let Some(conn) = conn {
                conn.write(stage);
            }
        }
        for conn in self.inputs.iter_mut().chain(self.outputs.iter_mut()).flatten() {
            conn.advance(count);
        }
        Ok(())
    }

    /// Ask the driver to stop after the current tick. Idempotent.
    pub fn finish(&mut self) {
        self.finished_trigger = true;
    }

    /// Whether [`finish`](Self::finish) was requested, by the block or the host.
    pub fn finished_trigger(&self) -> bool {
        self.finished_trigger
    }

    /// Whether the driver has observed this component's finish request.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Leave the running state.
    pub(crate) fn mark_finishing(&mut self) -> Result<()> {
        self.expect(Lifecycle::Running)?;
        self.finished = self.finished_trigger;
        self.advance_to(Lifecycle::Finishing);
        Ok(())
    }

    /// Run the completion phase. `ticks` is the length of the run.
    pub fn epilog(&mut self, ticks: u64) -> Result<()> {
        self.expect(Lifecycle::Finishing)?;
        assert_invariant(
            EPILOG_ONCE,
            self.state != Lifecycle::Completed,
            "epilog runs at most once",
            Some(self.name.as_str()),
        );
        let desc = self.bound()?;
        let mut cx = EpilogContext {
            component: &self.name,
            descriptor: &desc,
            results: &mut self.results,
            ticks,
            finished: self.finished,
        };
        self.kind
            .epilog(&mut cx)
            .map_err(|e| SimError::from_block(&self.name, e))?;
        self.advance_to(Lifecycle::Completed);
        Ok(())
    }

    /// Take ownership of `value` until the component is dropped. Resources
    /// are released in reverse registration order.
    pub fn register_for_release<T: Any>(&mut self, value: T) -> ResourceId {
        self.arena.register(value)
    }

    /// Borrow a resource registered on this component.
    pub fn resource<T: Any>(&self, id: ResourceId) -> Option<&T> {
        self.arena.get(id)
    }

    /// Results set so far, by name. Unset results are omitted.
    pub fn results(&self) -> BTreeMap<String, Value> {
        let Some(desc) = &self.descriptor else {
            return BTreeMap::new();
        };
        desc.results()
            .iter()
            .zip(&self.results)
            .filter_map(|(name, value)| Some((name.clone(), value.clone()?)))
            .collect()
    }

    /// One result by name.
    pub fn result(&self, name: &str) -> Option<&Value> {
        let index = self.descriptor.as_ref()?.result_index(name)?;
        self.results.get(index)?.as_ref()
    }

    /// Buffer depth requested for physical input `index`.
    pub fn in_chunk(&self, index: usize) -> Option<usize> {
        self.in_chunks.get(index).copied()
    }

    /// Buffer depth requested for physical output `index`.
    pub fn out_chunk(&self, index: usize) -> Option<usize> {
        self.out_chunks.get(index).copied()
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        self.state
    }

    /// Component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block descriptor, once attached.
    pub fn descriptor(&self) -> Option<&Arc<BlockDescriptor>> {
        self.descriptor.as_ref()
    }

    /// Step kind label.
    pub fn kind_label(&self) -> &'static str {
        self.kind.label()
    }

    /// Number of physical inputs.
    pub fn n_in(&self) -> usize {
        self.input_ports.len()
    }

    /// Number of physical outputs.
    pub fn n_out(&self) -> usize {
        self.output_ports.len()
    }

    /// Connection on physical input `index`, once attached.
    pub fn input(&self, index: usize) -> Option<&Connection> {
        self.inputs.get(index)?.as_ref()
    }

    /// Connection on physical output `index`, once attached.
    pub fn output(&self, index: usize) -> Option<&Connection> {
        self.outputs.get(index)?.as_ref()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("kind", &self.kind.label())
            .field("block", &self.descriptor.as_ref().map(|d| d.name()))
            .field("state", &self.state)
            .field("n_in", &self.n_in())
            .field("n_out", &self.n_out())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, TypedStep};
    use crate::descriptor::{cached_descriptor, BlockPrototype, PortSpec};
    use num_complex::Complex64;
    use std::cell::RefCell;
    use std::rc::Rc;

    static SCALE: BlockPrototype = BlockPrototype {
        name: "component_test_scale",
        generics: &["k"],
        results: &["seen"],
        inputs: &[PortSpec::complex("in", 1)],
        outputs: &[PortSpec::complex("out", 1)],
    };

    #[derive(Default)]
    struct Scale {
        k: f64,
        seen: u64,
    }

    impl Block for Scale {
        fn init(&mut self, cx: &mut InitContext<'_>) -> std::result::Result<(), BlockError> {
            self.k = cx.get("k")?;
            cx.set_out_chunk(0, 8)
        }

        fn epilog(&mut self, cx: &mut EpilogContext<'_>) -> std::result::Result<(), BlockError> {
            cx.set("seen", self.seen)
        }
    }

    impl TypedStep<Complex64, Complex64> for Scale {
        fn step_one(
            &mut self,
            inputs: &[Complex64],
            outputs: &mut [Complex64],
            _cx: &mut StepContext<'_>,
        ) -> std::result::Result<(), BlockError> {
            self.seen += 1;
            outputs[0] = inputs[0] * self.k;
            Ok(())
        }
    }

    fn configured(generics: &[(&str, Value)]) -> Component {
        let mut comp = Component::new(ComponentKind::complex(Scale::default()));
        comp.set_name("scale").unwrap();
        comp.set_descriptor(cached_descriptor(&SCALE)).unwrap();
        let generics = generics
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect();
        comp.set_generics(&generics).unwrap();
        comp
    }

    #[test]
    fn out_of_order_phase_is_rejected() {
        let mut comp = Component::new(ComponentKind::complex(Scale::default()));
        comp.set_name("early").unwrap();
        let err = comp.init(1).unwrap_err();
        assert!(matches!(
            err,
            SimError::Lifecycle {
                expected: Lifecycle::Checked,
                found: Lifecycle::Named,
                ..
            }
        ));
    }

    #[test]
    fn undeclared_generic_is_rejected_at_configure() {
        let mut comp = Component::new(ComponentKind::complex(Scale::default()));
        comp.set_name("scale").unwrap();
        comp.set_descriptor(cached_descriptor(&SCALE)).unwrap();
        let mut generics = BTreeMap::new();
        generics.insert("gain".to_owned(), Value::Float(1.0));
        let err = comp.set_generics(&generics).unwrap_err();
        assert!(matches!(
            err,
            SimError::Block {
                source: BlockError::UndeclaredGeneric(_),
                ..
            }
        ));
    }

    #[test]
    fn init_records_chunk_requests() {
        let mut comp = configured(&[("k", Value::Float(2.0))]);
        assert!(comp.check().unwrap().is_empty());
        comp.init(2).unwrap();
        assert_eq!(comp.in_chunk(0), Some(2));
        assert_eq!(comp.out_chunk(0), Some(8));
        assert_eq!(comp.lifecycle(), Lifecycle::Initialized);
    }

    #[test]
    fn tick_moves_data_and_epilog_sets_results() {
        let mut comp = configured(&[("k", Value::Int(3))]);
        comp.check().unwrap();
        comp.init(2).unwrap();

        let source = Connection::writer(4, 16);
        let sink = Connection::writer(4, 16);
        let probe = Connection::reader(&sink, 0);
        source.write(&{
            let mut raw = [0u8; 32];
            crate::block::Sample::encode(Complex64::new(1.0, 0.0), &mut raw[..16]);
            crate::block::Sample::encode(Complex64::new(0.0, 2.0), &mut raw[16..]);
            raw
        });
        comp.attach_input(0, Connection::reader(&source, 0)).unwrap();
        comp.attach_output(0, sink).unwrap();
        comp.start(2).unwrap();
        comp.tick(2, 0).unwrap();

        let mut raw = [0u8; 32];
        probe.read(2, &mut raw);
        let first: Complex64 = crate::block::Sample::decode(&raw[..16]);
        let second: Complex64 = crate::block::Sample::decode(&raw[16..]);
        assert_eq!(first, Complex64::new(3.0, 0.0));
        assert_eq!(second, Complex64::new(0.0, 6.0));

        comp.mark_finishing().unwrap();
        comp.epilog(1).unwrap();
        assert_eq!(comp.result("seen"), Some(&Value::Int(2)));
        assert_eq!(comp.lifecycle(), Lifecycle::Completed);
    }

    static PICKY: BlockPrototype = BlockPrototype {
        name: "component_test_picky",
        generics: &[],
        results: &[],
        inputs: &[PortSpec::complex("in", 1)],
        outputs: &[],
    };

    struct Picky;

    impl Block for Picky {
        fn check(&mut self, cx: &mut CheckContext<'_>) -> std::result::Result<(), BlockError> {
            cx.check_error("never satisfied");
            Ok(())
        }
    }

    impl TypedStep<Complex64, Complex64> for Picky {
        fn step_one(
            &mut self,
            _inputs: &[Complex64],
            _outputs: &mut [Complex64],
            _cx: &mut StepContext<'_>,
        ) -> std::result::Result<(), BlockError> {
            Ok(())
        }
    }

    #[test]
    fn failed_check_keeps_init_out_of_reach() {
        let mut comp = Component::new(ComponentKind::complex(Picky));
        comp.set_name("picky").unwrap();
        comp.set_descriptor(cached_descriptor(&PICKY)).unwrap();
        comp.set_generics(&BTreeMap::new()).unwrap();

        let failures = comp.check().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].component, "picky");
        assert_eq!(comp.lifecycle(), Lifecycle::Configured);

        let err = comp.init(1).unwrap_err();
        assert!(matches!(
            err,
            SimError::Lifecycle {
                expected: Lifecycle::Checked,
                found: Lifecycle::Configured,
                ..
            }
        ));
        assert_eq!(comp.in_chunk(0), None);
    }

    #[test]
    fn second_epilog_is_a_lifecycle_error() {
        let mut comp = configured(&[("k", Value::Float(1.0))]);
        comp.check().unwrap();
        comp.init(1).unwrap();
        comp.attach_input(0, Connection::reader(&Connection::writer(1, 16), 0))
            .unwrap();
        comp.attach_output(0, Connection::writer(1, 16)).unwrap();
        comp.start(1).unwrap();
        comp.mark_finishing().unwrap();
        comp.epilog(1).unwrap();

        let err = comp.epilog(1).unwrap_err();
        assert!(matches!(
            err,
            SimError::Lifecycle {
                expected: Lifecycle::Finishing,
                found: Lifecycle::Completed,
                ..
            }
        ));
        assert_eq!(comp.result("seen"), Some(&Value::Int(0)));
    }

    #[test]
    fn host_can_expand_a_multi_port() {
        let mut comp = configured(&[("k", Value::Float(1.0))]);
        let err = comp.bind_ports(vec![0, 0], vec![0]).unwrap_err();
        assert!(matches!(err, SimError::Lifecycle { expected: Lifecycle::Blocked, .. }));

        let mut comp = Component::new(ComponentKind::complex(Scale::default()));
        comp.set_name("wide").unwrap();
        comp.set_descriptor(cached_descriptor(&SCALE)).unwrap();
        assert_eq!(comp.n_in(), 1);
        comp.bind_ports(vec![0, 0, 0], vec![0]).unwrap();
        assert_eq!(comp.n_in(), 3);
        assert_eq!(comp.n_out(), 1);
    }

    #[test]
    fn start_requires_every_port_attached() {
        let mut comp = configured(&[("k", Value::Float(1.0))]);
        comp.check().unwrap();
        comp.init(1).unwrap();
        comp.attach_output(0, Connection::writer(1, 16)).unwrap();
        assert!(matches!(comp.start(1), Err(SimError::Runtime { .. })));
    }

    #[test]
    fn finish_is_idempotent() {
        let mut comp = configured(&[]);
        comp.finish();
        comp.finish();
        assert!(comp.finished_trigger());
        assert!(!comp.is_finished());
    }

    struct DropRecorder(u32, Rc<RefCell<Vec<u32>>>);

    impl Drop for DropRecorder {
        fn drop(&mut self) {
            self.1.borrow_mut().push(self.0);
        }
    }

    #[test]
    fn resources_release_in_reverse_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut comp = configured(&[]);
        let first = comp.register_for_release(DropRecorder(1, Rc::clone(&order)));
        comp.register_for_release(DropRecorder(2, Rc::clone(&order)));
        comp.register_for_release(DropRecorder(3, Rc::clone(&order)));
        assert_eq!(comp.resource::<DropRecorder>(first).map(|r| r.0), Some(1));
        assert!(comp.resource::<String>(first).is_none());
        drop(comp);
        assert_eq!(*order.borrow(), vec![3, 2, 1]);
    }
}
