//! Per-build resolution of shared sub-resources.

use super::BuildError;
use crate::compiled::{ArenaTexture, Chonk, TileResources};
use crate::manager::CacheManager;
use crate::resource::{LoadError, ResourceDescriptor, SharedHandle};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Resolves descriptors through the resource cache and the resident arenas.
///
/// Each descriptor is resolved once per tile; repeats reuse the first
/// answer, including failures, so a missing resource yields one warning.
pub(super) struct Resolver<'a> {
    manager: &'a CacheManager,
    cancel: &'a CancellationToken,
    handles: HashMap<ResourceDescriptor, SharedHandle>,
    chonks: HashMap<ResourceDescriptor, Option<Arc<Chonk>>>,
    textures: HashMap<ResourceDescriptor, Option<Arc<ArenaTexture>>>,
    warnings: Vec<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(manager: &'a CacheManager, cancel: &'a CancellationToken) -> Self {
        Self {
            manager,
            cancel,
            handles: HashMap::new(),
            chonks: HashMap::new(),
            textures: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    fn load(&mut self, descriptor: &ResourceDescriptor) -> Result<SharedHandle, LoadError> {
        if let Some(handle) = self.handles.get(descriptor) {
            return Ok(Arc::clone(handle));
        }
        let handle = self
            .manager
            .resources()
            .get_or_load(descriptor, self.cancel)?;
        self.handles.insert(descriptor.clone(), Arc::clone(&handle));
        Ok(handle)
    }

    fn record_missing(&mut self, descriptor: &ResourceDescriptor, error: &LoadError) {
        let warning = BuildError::ResourceMissing {
            descriptor: descriptor.to_string(),
            reason: error.to_string(),
        };
        debug!(resource = %descriptor, error = %error, "Skipping unavailable resource");
        self.warnings.push(warning.to_string());
    }

    /// Compiled prototype for a model placement, or `None` if unavailable.
    pub fn chonk(&mut self, descriptor: &ResourceDescriptor) -> Result<Option<Arc<Chonk>>, BuildError> {
        if let Some(known) = self.chonks.get(descriptor) {
            return Ok(known.clone());
        }
        if self.cancel.is_cancelled() {
            return Err(BuildError::Canceled);
        }

        let resolved = self.load(descriptor).and_then(|handle| {
            let model = handle.as_model().ok_or_else(|| LoadError::Invalid {
                uri: descriptor.to_string(),
                reason: "not a model".to_string(),
            })?;
            let chonk = self
                .manager
                .resident()
                .chonks
                .try_get_or_create(descriptor, || Chonk::from_model(descriptor, model))?;
            Ok((chonk, model.skin.clone()))
        });

        match resolved {
            Ok((chonk, skin)) => {
                trace!(resource = %descriptor, "Resolved chonk");
                self.chonks
                    .insert(descriptor.clone(), Some(Arc::clone(&chonk)));
                if let Some(skin) = skin {
                    // An unavailable skin leaves the model untextured.
                    self.texture(&skin)?;
                }
                Ok(Some(chonk))
            }
            Err(LoadError::Canceled) => Err(BuildError::Canceled),
            Err(e) => {
                self.record_missing(descriptor, &e);
                self.chonks.insert(descriptor.clone(), None);
                Ok(None)
            }
        }
    }

    /// Compiled texture for a skin, or `None` if unavailable.
    pub fn texture(
        &mut self,
        descriptor: &ResourceDescriptor,
    ) -> Result<Option<Arc<ArenaTexture>>, BuildError> {
        if let Some(known) = self.textures.get(descriptor) {
            return Ok(known.clone());
        }
        if self.cancel.is_cancelled() {
            return Err(BuildError::Canceled);
        }

        let resolved = self.load(descriptor).and_then(|handle| {
            let image = handle.as_image().ok_or_else(|| LoadError::Invalid {
                uri: descriptor.to_string(),
                reason: "not an image".to_string(),
            })?;
            Ok(self
                .manager
                .resident()
                .textures
                .get_or_create(descriptor, || ArenaTexture::from_image(descriptor, image)))
        });

        match resolved {
            Ok(texture) => {
                self.textures
                    .insert(descriptor.clone(), Some(Arc::clone(&texture)));
                Ok(Some(texture))
            }
            Err(LoadError::Canceled) => Err(BuildError::Canceled),
            Err(e) => {
                self.record_missing(descriptor, &e);
                self.textures.insert(descriptor.clone(), None);
                Ok(None)
            }
        }
    }

    /// Hands over everything resolved: strong references and warnings.
    pub fn finish(self) -> (TileResources, Vec<String>) {
        let resources = TileResources {
            handles: self.handles.into_values().collect(),
            chonks: self.chonks.into_values().flatten().collect(),
            textures: self.textures.into_values().flatten().collect(),
        };
        (resources, self.warnings)
    }
}
