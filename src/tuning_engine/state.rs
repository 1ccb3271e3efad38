//! Persisted engine state.
//!
//! Serialized as JSON with the layout
//! `{ "tuningName", "scalaDir", "inputMappingMode", "cvMappingMode", "scale": [{ "cents", "enabled" }] }`.
//! Mapping modes are stored as integers (0 proximity, 1 proportional, 2 12-EDO isomorphic).

use serde::{Deserialize, Serialize};

use crate::tuning_engine::constants::UNKNOWN_TUNING_NAME;
use crate::tuning_engine::errors::StateError;
use crate::tuning_engine::quantizer::MappingMode;
use crate::tuning_engine::scale::{ScaleModel, ScaleStep};

fn unknown_tuning_name() -> String {
    UNKNOWN_TUNING_NAME.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default = "unknown_tuning_name")]
    pub tuning_name: String,

    #[serde(default)]
    pub scala_dir: String,

    #[serde(default)]
    pub input_mapping_mode: MappingMode,

    #[serde(default)]
    pub cv_mapping_mode: MappingMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Vec<ScaleStep>>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            tuning_name: unknown_tuning_name(),
            scala_dir: String::new(),
            input_mapping_mode: MappingMode::default(),
            cv_mapping_mode: MappingMode::default(),
            scale: None,
        }
    }
}

/// Persisted state with its scale validated, ready to apply without further checks.
#[derive(Debug, Clone, PartialEq)]
pub struct RestorableState {
    pub tuning_name: String,
    pub scala_dir: String,
    pub input_mapping_mode: MappingMode,
    pub cv_mapping_mode: MappingMode,
    pub scale: Option<ScaleModel>,
}

impl PersistedState {
    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StateError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validates the stored scale, if any.
    pub fn scale_model(&self) -> Result<Option<ScaleModel>, StateError> {
        match &self.scale {
            Some(steps) => Ok(Some(ScaleModel::from_steps(steps.clone())?)),
            None => Ok(None),
        }
    }

    /// Validates the stored scale and converts into a [`RestorableState`].
    pub fn into_restorable(self) -> Result<RestorableState, StateError> {
        let scale = self.scale_model()?;
        Ok(RestorableState {
            tuning_name: self.tuning_name,
            scala_dir: self.scala_dir,
            input_mapping_mode: self.input_mapping_mode,
            cv_mapping_mode: self.cv_mapping_mode,
            scale,
        })
    }
}
