use super::{AttributeValue, FeatureCursor, RawFeature};
use std::fmt;
use std::sync::Arc;

/// Per-feature predicate or transform.
///
/// Returning `None` drops the feature.
pub trait FeatureFilter: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, feature: RawFeature) -> Option<RawFeature>;
}

/// Ordered list of filters applied to every feature of a cursor.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn FeatureFilter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: impl FeatureFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn push(&mut self, filter: Arc<dyn FeatureFilter>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Runs a single feature through the chain.
    pub fn apply(&self, feature: RawFeature) -> Option<RawFeature> {
        self.filters
            .iter()
            .try_fold(feature, |feature, filter| filter.apply(feature))
    }

    /// Wraps a cursor so every item passes through the chain.
    pub fn filter_cursor(&self, cursor: FeatureCursor) -> FeatureCursor {
        if self.filters.is_empty() {
            return cursor;
        }
        let chain = self.clone();
        Box::new(cursor.filter_map(move |feature| chain.apply(feature)))
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|filter| filter.name()))
            .finish()
    }
}

/// Keeps features whose attribute is present and, optionally, equal to a value.
#[derive(Debug, Clone)]
pub struct AttributeFilter {
    name: String,
    attribute: String,
    expected: Option<AttributeValue>,
}

impl AttributeFilter {
    pub fn present(attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        Self {
            name: format!("has:{}", attribute),
            attribute,
            expected: None,
        }
    }

    pub fn equals(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        let attribute = attribute.into();
        let expected = value.into();
        Self {
            name: format!("{}={}", attribute, expected),
            attribute,
            expected: Some(expected),
        }
    }
}

impl FeatureFilter for AttributeFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, feature: RawFeature) -> Option<RawFeature> {
        let value = feature.attr(&self.attribute)?;
        match &self.expected {
            Some(expected) if expected != value => None,
            _ => Some(feature),
        }
    }
}
