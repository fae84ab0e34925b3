//! Mapping engine configuration

use serde::Deserialize;

use crate::error::{RmlError, RmlResult};

/// Default capacity of every bounded channel in a mapping run.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Default maximum concurrent blocking (function-valued) record evaluations.
///
/// Function-valued term maps call user functions that may block, so records of
/// triples maps containing them are mapped on the blocking pool. This bounds
/// how many of those run at once.
pub const DEFAULT_MAX_BLOCKING_EVALUATIONS: usize = 4;

/// Configuration for building and running a mapping
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RmlConfig {
    /// Base IRI used to resolve relative IRIs produced by term maps.
    ///
    /// If `None`, a generated lexical form that is not an absolute IRI is a
    /// term generation error.
    pub base_iri: Option<String>,

    /// Capacity of the record multicast and output channels.
    ///
    /// Producers wait when a consumer falls this far behind.
    /// Default: 1024
    pub channel_capacity: usize,

    /// Maximum number of function-valued record evaluations running on the
    /// blocking pool at the same time.
    /// Default: 4
    pub max_blocking_evaluations: usize,
}

impl Default for RmlConfig {
    fn default() -> Self {
        Self {
            base_iri: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_blocking_evaluations: DEFAULT_MAX_BLOCKING_EVALUATIONS,
        }
    }
}

impl RmlConfig {
    /// Create a configuration with a base IRI and default limits
    pub fn new(base_iri: impl Into<String>) -> Self {
        Self {
            base_iri: Some(base_iri.into()),
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> RmlResult<Self> {
        let config: RmlConfig =
            serde_json::from_str(json).map_err(|e| RmlError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builder method to set the base IRI
    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Self {
        self.base_iri = Some(base_iri.into());
        self
    }

    /// Builder method to set the channel capacity
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Builder method to set the blocking evaluation limit
    pub fn with_max_blocking_evaluations(mut self, permits: usize) -> Self {
        self.max_blocking_evaluations = permits;
        self
    }

    /// Check the configuration for values the engine cannot run with
    pub fn validate(&self) -> RmlResult<()> {
        if self.channel_capacity == 0 {
            return Err(RmlError::InvalidConfig(
                "channel_capacity must be greater than zero".to_string(),
            ));
        }
        if self.max_blocking_evaluations == 0 {
            return Err(RmlError::InvalidConfig(
                "max_blocking_evaluations must be greater than zero".to_string(),
            ));
        }
        if let Some(base) = &self.base_iri {
            oxiri::Iri::parse(base.as_str()).map_err(|e| {
                RmlError::InvalidConfig(format!("base IRI {base:?} is not absolute: {e}"))
            })?;
        }
        Ok(())
    }
}
