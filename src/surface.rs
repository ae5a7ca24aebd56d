use crate::layer::LayerDescriptor;
use crate::models::{LayerHandle, LayerKey};
use crate::sync::MapCommand;

/// The map widget the viewer draws on.
///
/// Implementations must tolerate unknown handles (a layer may already be
/// gone when a command for it arrives) and must never fail the caller:
/// loading problems surface as empty layers.
pub trait MapSurface {
    /// Start showing `descriptor` on top of the current layers.
    fn mount(&mut self, handle: LayerHandle, descriptor: &LayerDescriptor);
    fn unmount(&mut self, handle: LayerHandle);
    fn bring_to_front(&mut self, handle: LayerHandle);
    fn bring_to_back(&mut self, handle: LayerHandle);
    /// Swap the tile layer underneath all data layers.
    fn set_basemap(&mut self, url: &str);
}

/// Run commands against a surface, in order.
pub fn execute<S: MapSurface + ?Sized>(surface: &mut S, commands: &[MapCommand]) {
    for command in commands {
        log::debug!("map command: {command:?}");
        match command {
            MapCommand::Mount { handle, descriptor } => surface.mount(*handle, descriptor),
            MapCommand::Unmount { handle, .. } => surface.unmount(*handle),
            MapCommand::BringToBack(handle) => surface.bring_to_back(*handle),
            MapCommand::BringToFront(handle) => surface.bring_to_front(*handle),
            MapCommand::SetBasemap(url) => surface.set_basemap(url),
        }
    }
}

/// In-memory surface keeping the layer stack, bottom first.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    layers: Vec<(LayerHandle, LayerDescriptor)>,
    mounts: Vec<(LayerHandle, LayerKey)>,
    basemap: Option<String>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attached layers, bottom first.
    pub fn layers(&self) -> &[(LayerHandle, LayerDescriptor)] {
        &self.layers
    }

    pub fn z_order(&self) -> Vec<&LayerKey> {
        self.layers.iter().map(|(_, d)| &d.key).collect()
    }

    pub fn is_attached(&self, handle: LayerHandle) -> bool {
        self.position(handle).is_some()
    }

    /// Every mount ever issued, oldest first.
    pub fn mount_history(&self) -> &[(LayerHandle, LayerKey)] {
        &self.mounts
    }

    pub fn mount_count(&self, key: &LayerKey) -> usize {
        self.mounts.iter().filter(|(_, k)| k == key).count()
    }

    pub fn basemap(&self) -> Option<&str> {
        self.basemap.as_deref()
    }

    fn position(&self, handle: LayerHandle) -> Option<usize> {
        self.layers.iter().position(|(h, _)| *h == handle)
    }
}

impl MapSurface for RecordingSurface {
    fn mount(&mut self, handle: LayerHandle, descriptor: &LayerDescriptor) {
        self.mounts.push((handle, descriptor.key.clone()));
        self.layers.push((handle, descriptor.clone()));
    }

    fn unmount(&mut self, handle: LayerHandle) {
        if let Some(i) = self.position(handle) {
            self.layers.remove(i);
        }
    }

    fn bring_to_front(&mut self, handle: LayerHandle) {
        if let Some(i) = self.position(handle) {
            let layer = self.layers.remove(i);
            self.layers.push(layer);
        }
    }

    fn bring_to_back(&mut self, handle: LayerHandle) {
        if let Some(i) = self.position(handle) {
            let layer = self.layers.remove(i);
            self.layers.insert(0, layer);
        }
    }

    fn set_basemap(&mut self, url: &str) {
        self.basemap = Some(url.to_string());
    }
}
