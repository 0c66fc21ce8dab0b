use crate::coord::MAX_LEVEL;
use crate::resource::ResourceDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named render bin with a sort order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderBin {
    pub order: i32,
    pub name: String,
}

/// Render settings applied to a whole tile after assembly.
///
/// `None` leaves the host's default in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderHints {
    pub depth_test: Option<bool>,
    pub backface_culling: Option<bool>,
    pub min_alpha: Option<f32>,
    pub render_bin: Option<RenderBin>,
    pub transparent: bool,
}

impl RenderHints {
    pub fn is_default(&self) -> bool {
        *self == RenderHints::default()
    }
}

/// How features of one level are turned into content.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub name: String,
    /// Attribute holding the extrusion height.
    pub height_attribute: Option<String>,
    pub default_height: f64,
    /// Extrusions never go below this height.
    pub min_height: f64,
    /// Attribute naming the model to place on point features.
    pub model_attribute: Option<String>,
    /// Texture applied to extruded walls.
    pub wall_skin: Option<ResourceDescriptor>,
    pub render: RenderHints,
}

impl Style {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            height_attribute: Some("height".to_string()),
            default_height: 10.0,
            min_height: 5.0,
            model_attribute: Some("model".to_string()),
            wall_skin: None,
            render: RenderHints::default(),
        }
    }

    /// Style named after a level, as looked up by the builder.
    pub fn for_level(level: u32) -> Self {
        Self::new(level.to_string())
    }

    pub fn with_height_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.height_attribute = Some(attribute.into());
        self
    }

    pub fn with_min_height(mut self, min_height: f64) -> Self {
        self.min_height = min_height;
        self
    }

    pub fn with_wall_skin(mut self, skin: ResourceDescriptor) -> Self {
        self.wall_skin = Some(skin);
        self
    }

    pub fn with_render(mut self, render: RenderHints) -> Self {
        self.render = render;
        self
    }
}

/// Named collection of styles.
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    styles: BTreeMap<String, Style>,
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a style by name.
    pub fn with_style(mut self, style: Style) -> Self {
        self.add(style);
        self
    }

    pub fn add(&mut self, style: Style) {
        self.styles.insert(style.name.clone(), style);
    }

    pub fn get(&self, name: &str) -> Option<&Style> {
        self.styles.get(name)
    }

    /// Style for the tiles of `level` (the style named `"{level}"`).
    pub fn style_for_level(&self, level: u32) -> Option<&Style> {
        self.get(&level.to_string())
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Lowest and highest level that have a style.
    ///
    /// With a single level style both bounds are that level. `None` when no
    /// style is named after a level.
    pub fn level_range(&self) -> Option<(u32, u32)> {
        let mut levels = (0..=MAX_LEVEL).filter(|l| self.style_for_level(*l).is_some());
        let min = levels.next()?;
        let max = levels.last().unwrap_or(min);
        Some((min, max))
    }
}
