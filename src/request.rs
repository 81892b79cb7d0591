//! Generation request model
//!
//! Immutable descriptions of what a session generates: groups sharing an output
//! location and default parameters, and the individual requests inside them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_WIDTH: u64 = 32;
pub const DEFAULT_HEIGHT: u64 = 32;
pub const DEFAULT_OUTLINE: &str = "single color outline";
pub const DEFAULT_SHADING: &str = "basic shading";
pub const DEFAULT_DETAIL: &str = "medium detail";
pub const DEFAULT_VIEW: &str = "high top-down";

/// Generation options keyed by option name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationParams(BTreeMap<String, Value>);

impl GenerationParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group defaults overridden per key by item overrides.
    pub fn merged(defaults: &GenerationParams, overrides: Option<&GenerationParams>) -> Self {
        let mut merged = defaults.clone();
        if let Some(overrides) = overrides {
            for (key, value) in &overrides.0 {
                merged.0.insert(key.clone(), value.clone());
            }
        }
        merged
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn width(&self) -> u64 {
        self.dimension("width", DEFAULT_WIDTH)
    }

    pub fn height(&self) -> u64 {
        self.dimension("height", DEFAULT_HEIGHT)
    }

    /// `WxH` label used in session records.
    pub fn size_label(&self) -> String {
        format!("{}x{}", self.width(), self.height())
    }

    pub fn text_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.0.get(key).and_then(Value::as_str).unwrap_or(default)
    }

    fn dimension(&self, key: &str, default: u64) -> u64 {
        match self.0.get(key) {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for GenerationParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One asset to generate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Unique within the owning group; also the output file stem.
    pub id: String,
    pub prompt: String,
    /// Effective parameters (group defaults plus item overrides).
    pub params: GenerationParams,
    #[serde(default)]
    pub notes: String,
}

impl GenerationRequest {
    pub fn new(
        id: impl Into<String>,
        prompt: impl Into<String>,
        defaults: &GenerationParams,
        overrides: Option<&GenerationParams>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            params: GenerationParams::merged(defaults, overrides),
            notes: notes.into(),
        }
    }

    /// `<output_location>/<id>.<extension>`
    pub fn output_path(&self, output_location: &Path, extension: &str) -> PathBuf {
        output_location.join(format!("{}.{}", self.id, extension))
    }
}

/// Requests sharing an output location and default parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationGroup {
    pub name: String,
    pub output_location: PathBuf,
    pub default_params: GenerationParams,
    pub requests: Vec<GenerationRequest>,
}

impl GenerationGroup {
    pub fn new(
        name: impl Into<String>,
        output_location: impl Into<PathBuf>,
        default_params: GenerationParams,
    ) -> Self {
        Self {
            name: name.into(),
            output_location: output_location.into(),
            default_params,
            requests: Vec::new(),
        }
    }

    /// Add a request, merging `overrides` onto the group defaults.
    pub fn push(
        &mut self,
        id: impl Into<String>,
        prompt: impl Into<String>,
        overrides: Option<&GenerationParams>,
        notes: impl Into<String>,
    ) -> &mut Self {
        let request = GenerationRequest::new(id, prompt, &self.default_params, overrides, notes);
        self.requests.push(request);
        self
    }
}

/// Wire payload for one image, built from a request's effective parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub description: String,
    pub image_size: ImageSize,
    pub no_background: bool,
    pub outline: String,
    pub shading: String,
    pub detail: String,
    pub view: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u64,
    pub height: u64,
}

impl ImageRequest {
    pub fn from_request(request: &GenerationRequest) -> Self {
        let params = &request.params;
        Self {
            description: request.prompt.clone(),
            image_size: ImageSize {
                width: params.width(),
                height: params.height(),
            },
            no_background: params
                .get("no_background")
                .and_then(Value::as_bool)
                .unwrap_or(true),
            outline: params.text_or("outline", DEFAULT_OUTLINE).to_string(),
            shading: params.text_or("shading", DEFAULT_SHADING).to_string(),
            detail: params.text_or("detail", DEFAULT_DETAIL).to_string(),
            view: params.text_or("view", DEFAULT_VIEW).to_string(),
        }
    }
}
