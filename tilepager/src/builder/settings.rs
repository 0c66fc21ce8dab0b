//! Compiler settings for tile assembly.

/// Default vertex budget of one merged geometry batch.
pub const DEFAULT_MAX_VERTS_PER_BATCH: usize = 250_000;

/// Visibility band for content matching `tag`, as multiples of the tile range.
#[derive(Debug, Clone, PartialEq)]
pub struct LodBin {
    pub tag: String,
    pub lod_scale: f32,
    pub min_lod_scale: f32,
}

impl LodBin {
    pub fn new(tag: impl Into<String>, lod_scale: f32) -> Self {
        Self {
            tag: tag.into(),
            lod_scale,
            min_lod_scale: 0.0,
        }
    }

    pub fn with_min_lod_scale(mut self, min_lod_scale: f32) -> Self {
        self.min_lod_scale = min_lod_scale;
        self
    }

    /// `(min_range, max_range)` for a tile of visibility `range`.
    pub fn ranges(&self, range: f32) -> (f32, f32) {
        (range * self.min_lod_scale, range * self.lod_scale)
    }
}

/// Settings that shape how a tile is assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilerSettings {
    pub max_verts_per_batch: usize,
    pub lod_bins: Vec<LodBin>,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            max_verts_per_batch: DEFAULT_MAX_VERTS_PER_BATCH,
            lod_bins: Vec::new(),
        }
    }
}

impl CompilerSettings {
    pub fn with_max_verts_per_batch(mut self, max: usize) -> Self {
        self.max_verts_per_batch = max.max(1);
        self
    }

    pub fn with_lod_bin(mut self, bin: LodBin) -> Self {
        self.lod_bins.retain(|b| b.tag != bin.tag);
        self.lod_bins.push(bin);
        self
    }

    /// Bin for a single tag, falling back to full range.
    pub fn lod_bin_for_tag(&self, tag: &str) -> LodBin {
        self.lod_bins
            .iter()
            .find(|b| b.tag == tag)
            .cloned()
            .unwrap_or_else(|| LodBin::new(tag, 1.0))
    }

    /// Bin for the first of `tags` that has one, falling back to full range.
    pub fn lod_bin_for_tags(&self, tags: &[String]) -> LodBin {
        tags.iter()
            .find_map(|tag| self.lod_bins.iter().find(|b| &b.tag == tag))
            .cloned()
            .unwrap_or_else(|| LodBin::new("", 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CompilerSettings::default();
        assert_eq!(settings.max_verts_per_batch, 250_000);
        assert_eq!(settings.lod_bin_for_tag("walls").ranges(100.0), (0.0, 100.0));
    }

    #[test]
    fn test_lod_bin_lookup_by_tags() {
        let settings = CompilerSettings::default()
            .with_lod_bin(LodBin::new("tree", 0.5))
            .with_lod_bin(LodBin::new("lamp", 0.25).with_min_lod_scale(0.1));
        let tags = vec!["street".to_string(), "lamp".to_string()];
        let (min, max) = settings.lod_bin_for_tags(&tags).ranges(1000.0);
        assert!((min - 100.0).abs() < 1e-3);
        assert!((max - 250.0).abs() < 1e-3);
        assert_eq!(settings.lod_bin_for_tags(&[]).lod_scale, 1.0);
    }

    #[test]
    fn test_with_lod_bin_replaces_same_tag() {
        let settings = CompilerSettings::default()
            .with_lod_bin(LodBin::new("tree", 0.5))
            .with_lod_bin(LodBin::new("tree", 0.8));
        assert_eq!(settings.lod_bins.len(), 1);
        assert_eq!(settings.lod_bin_for_tag("tree").lod_scale, 0.8);
    }
}
