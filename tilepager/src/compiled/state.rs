use crate::content::RenderBin;
use crate::resource::ResourceDescriptor;
use serde::{Deserialize, Serialize};

/// Render state attached to a geometry batch.
///
/// Structurally equal states are deduplicated through the state cache so
/// that batches across tiles share one instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderState {
    pub texture: Option<ResourceDescriptor>,
    pub transparent: bool,
    pub two_sided: bool,
    pub render_bin: Option<RenderBin>,
}

impl RenderState {
    pub fn textured(texture: ResourceDescriptor) -> Self {
        Self {
            texture: Some(texture),
            ..Default::default()
        }
    }
}
