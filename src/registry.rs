//! Block registry: resolves block names to descriptors and factories.

use crate::blocks;
use crate::component::Component;
use crate::config::SimConfig;
use crate::descriptor::{cached_descriptor, BlockDescriptor};
use crate::error::{Result, SimError};
use crate::plugin::{BlockEntry, BlockModule, PluginModule, StaticModule};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Registered block modules, keyed by block name.
#[derive(Default)]
pub struct Registry {
    modules: BTreeMap<String, Arc<dyn BlockModule>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in blocks.
    ///
    /// Registering a built-in cannot fail: every entry in
    /// [`blocks::BUILTINS`] is built with [`BlockEntry::new`], so it carries
    /// this crate's ABI version, and no two share a name. A failure would be
    /// a bug in this crate, so it is logged rather than handed to callers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for entry in blocks::BUILTINS {
            if let Err(err) = registry.register_static(*entry) {
                tracing::error!(%err, "built-in block rejected");
            }
        }
        registry
    }

    /// Register a block compiled into the host.
    pub fn register_static(&mut self, entry: &'static BlockEntry) -> Result<()> {
        self.register_module(Arc::new(StaticModule::new(entry)?))
    }

    /// Register any block module.
    pub fn register_module(&mut self, module: Arc<dyn BlockModule>) -> Result<()> {
        let name = module.prototype().name.to_owned();
        if self.modules.contains_key(&name) {
            return Err(SimError::DuplicateBlock(name));
        }
        debug!(block = %name, path = ?module.path(), "block registered");
        self.modules.insert(name, module);
        Ok(())
    }

    /// Load a shared library and register its block. Returns the block name.
    pub fn load_plugin(&mut self, path: impl AsRef<Path>) -> Result<String> {
        let module = PluginModule::load(path)?;
        let name = module.prototype().name.to_owned();
        self.register_module(Arc::new(module))?;
        Ok(name)
    }

    /// Load every plugin listed in `config`, in order. Stops at the first
    /// failure.
    pub fn load_plugins(&mut self, config: &SimConfig) -> Result<Vec<String>> {
        config
            .plugin_paths
            .iter()
            .map(|path| self.load_plugin(path))
            .collect()
    }

    /// Whether a block of that name is registered.
    pub fn contains(&self, block: &str) -> bool {
        self.modules.contains_key(block)
    }

    /// Registered block names, sorted.
    pub fn block_names(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    fn module(&self, block: &str) -> Result<&Arc<dyn BlockModule>> {
        self.modules
            .get(block)
            .ok_or_else(|| SimError::UnknownBlock(block.to_owned()))
    }

    /// Serialized prototype of a block. Creates nothing.
    pub fn describe(&self, block: &str) -> Result<String> {
        Ok(self.module(block)?.describe())
    }

    /// Shared descriptor of a block.
    pub fn descriptor(&self, block: &str) -> Result<Arc<BlockDescriptor>> {
        Ok(cached_descriptor(self.module(block)?.prototype()))
    }

    /// Create a component of `block` named `name`, with its descriptor
    /// attached.
    pub fn instantiate(&self, block: &str, name: &str) -> Result<Component> {
        let module = self.module(block)?;
        let mut component = module.create();
        component.set_name(name)?;
        component.set_descriptor(cached_descriptor(module.prototype()))?;
        debug!(block, component = name, kind = component.kind_label(), "component created");
        Ok(component)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("blocks", &self.block_names())
            .finish()
    }
}
