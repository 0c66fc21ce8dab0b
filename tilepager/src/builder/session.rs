use super::CompilerSettings;
use crate::content::StyleSheet;
use crate::manager::CacheManager;
use std::sync::Arc;

/// Everything builds of one paging session share.
pub struct Session {
    manager: Arc<CacheManager>,
    styles: StyleSheet,
    settings: CompilerSettings,
}

impl Session {
    pub fn new(manager: Arc<CacheManager>, styles: StyleSheet) -> Self {
        Self {
            manager,
            styles,
            settings: CompilerSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: CompilerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn manager(&self) -> &Arc<CacheManager> {
        &self.manager
    }

    pub fn styles(&self) -> &StyleSheet {
        &self.styles
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }
}
