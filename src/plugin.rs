//! Block module ABI and the dynamic loader.
//!
//! A block module, linked in or loaded from a shared library, exposes one
//! [`BlockEntry`]. The entry's first field is the ABI version; the loader
//! reads it before touching anything else and refuses the module on
//! mismatch, so no block from an incompatible module is ever instantiated.
//!
//! Entries carry Rust types across the boundary. A plugin must be built with
//! the same compiler and the same `sdflow` version as the host; the version
//! tag is what catches the second half of that.

use crate::block::ComponentKind;
use crate::component::Component;
use crate::descriptor::BlockPrototype;
use crate::error::{Result, SimError};
use crate::invariant_ppt::{assert_invariant, ABI_VERSION_MATCHED};
use libloading::{Library, Symbol};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Engine ABI version. Bump whenever [`BlockEntry`] or any type reachable
/// from it changes.
pub const ABI_VERSION: u32 = 1;

/// Name of the entry function a plugin exports.
pub const ENTRY_SYMBOL: &str = "sdflow_block_entry";

/// Signature of the exported entry function.
pub type EntryFn = unsafe extern "C" fn() -> *const BlockEntry;

/// What a block module exposes: its prototype and a factory.
#[repr(C)]
#[derive(Debug)]
pub struct BlockEntry {
    /// Must equal [`ABI_VERSION`]. Kept first.
    pub abi_version: u32,
    /// Static prototype; `describe` serializes it without instantiating.
    pub prototype: &'static BlockPrototype,
    /// Build a fresh block.
    pub create: fn() -> ComponentKind,
}

impl BlockEntry {
    /// Entry tagged with this engine's [`ABI_VERSION`].
    pub const fn new(prototype: &'static BlockPrototype, create: fn() -> ComponentKind) -> Self {
        Self {
            abi_version: ABI_VERSION,
            prototype,
            create,
        }
    }
}

/// Declare the entry function of a plugin crate (`crate-type = ["cdylib"]`).
///
/// ```ignore
/// sdflow::export_block!(PROTOTYPE, create);
/// ```
#[macro_export]
macro_rules! export_block {
    ($prototype:path, $create:path $(,)?) => {
        static __SDFLOW_BLOCK_ENTRY: $crate::plugin::BlockEntry =
            $crate::plugin::BlockEntry::new(&$prototype, $create);

        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn sdflow_block_entry() -> *const $crate::plugin::BlockEntry {
            &__SDFLOW_BLOCK_ENTRY
        }
    };
}

/// A source of one block kind.
///
/// The prototype of a loaded module lives inside its library, so it is only
/// lent out for as long as the module itself is borrowed:
///
/// ```compile_fail
/// use sdflow::{BlockModule, BlockPrototype};
///
/// fn outlive(module: Box<dyn BlockModule>) -> &'static BlockPrototype {
///     module.prototype()
/// }
/// ```
pub trait BlockModule: Send + Sync {
    /// Prototype, borrowed from the module.
    fn prototype(&self) -> &BlockPrototype;

    /// Serialized prototype. Has no side effects and creates nothing.
    fn describe(&self) -> String {
        self.prototype().describe()
    }

    /// A fresh, unbound component.
    fn create(&self) -> Component;

    /// Where the module was loaded from, if anywhere.
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// Gate every module on the version tag it reports, before anything else
/// in its entry is read.
fn check_version(path: &Path, detected: u32) -> Result<()> {
    if detected != ABI_VERSION {
        return Err(SimError::PluginLoad {
            path: path.to_path_buf(),
            detected: Some(detected),
            expected: ABI_VERSION,
            reason: "ABI version mismatch".into(),
        });
    }
    assert_invariant(
        ABI_VERSION_MATCHED,
        detected == ABI_VERSION,
        "module ABI version matches the engine",
        Some(&path.to_string_lossy()),
    );
    Ok(())
}

/// A block compiled into the host.
#[derive(Debug)]
pub struct StaticModule {
    entry: &'static BlockEntry,
}

impl StaticModule {
    /// Wrap a linked-in entry, checking its version.
    pub fn new(entry: &'static BlockEntry) -> Result<Self> {
        check_version(Path::new("<static>"), entry.abi_version)?;
        Ok(Self { entry })
    }
}

impl BlockModule for StaticModule {
    fn prototype(&self) -> &BlockPrototype {
        self.entry.prototype
    }

    fn create(&self) -> Component {
        Component::new((self.entry.create)())
    }
}

/// A block loaded from a shared library. The library stays loaded while
/// this module or any component it created is alive.
pub struct PluginModule {
    path: PathBuf,
    // Only valid while `library` is loaded; never lent out past `&self`.
    entry: &'static BlockEntry,
    library: Option<Arc<Library>>,
}

impl PluginModule {
    /// Load a block module from a shared library.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let load_error = |reason: String| SimError::PluginLoad {
            path: path.to_path_buf(),
            detected: None,
            expected: ABI_VERSION,
            reason,
        };

        // SAFETY: loading a library runs its initializers; block modules are
        // trusted code built against this crate.
        let library = unsafe { Library::new(path) }.map_err(|e| load_error(e.to_string()))?;

        let entry_ptr = {
            // SAFETY: the symbol type matches what `export_block!` declares.
            let entry: Symbol<EntryFn> = unsafe { library.get(ENTRY_SYMBOL.as_bytes()) }
                .map_err(|e| load_error(format!("missing entry symbol `{ENTRY_SYMBOL}`: {e}")))?;
            // SAFETY: the entry function takes no arguments and only returns
            // the address of a static.
            unsafe { entry() }
        };
        if entry_ptr.is_null() {
            return Err(load_error("entry returned a null pointer".into()));
        }
        // SAFETY: `abi_version` is the first field of a `#[repr(C)]` struct,
        // so it is readable whatever layout the rest of the entry has.
        let detected = unsafe { (*entry_ptr).abi_version };
        check_version(path, detected)?;
        // SAFETY: the version matches, so the layout is ours. The static
        // lives as long as the library, which the module and every
        // component it creates keep alive through `library`.
        let entry: &'static BlockEntry = unsafe { &*entry_ptr };
        info!(path = %path.display(), block = entry.prototype.name, "block module loaded");
        Ok(Self::accept(path.to_path_buf(), entry, Some(Arc::new(library))))
    }

    /// Wrap an entry obtained elsewhere, checking its version. `library`
    /// is kept alive for as long as the module or its components are.
    pub fn from_entry(
        path: impl AsRef<Path>,
        entry: &'static BlockEntry,
        library: Option<Arc<Library>>,
    ) -> Result<Self> {
        let path = path.as_ref();
        check_version(path, entry.abi_version)?;
        Ok(Self::accept(path.to_path_buf(), entry, library))
    }

    fn accept(path: PathBuf, entry: &'static BlockEntry, library: Option<Arc<Library>>) -> Self {
        debug!(path = %path.display(), block = entry.prototype.name, "block entry accepted");
        Self {
            path,
            entry,
            library,
        }
    }
}

impl BlockModule for PluginModule {
    fn prototype(&self) -> &BlockPrototype {
        self.entry.prototype
    }

    fn create(&self) -> Component {
        Component::new((self.entry.create)()).with_module(self.library.clone())
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

impl std::fmt::Debug for PluginModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginModule")
            .field("path", &self.path)
            .field("block", &self.entry.prototype.name)
            .field("loaded", &self.library.is_some())
            .finish()
    }
}
