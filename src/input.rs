//! Session input
//!
//! Loading and structural validation of a session description, plus the flattened
//! task list view of it. Everything downstream assumes input that passed
//! [`SessionInput::validate`].

use crate::error::ApiError;
use crate::request::{GenerationGroup, GenerationParams};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Session description as written by users.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionInput {
    #[serde(default)]
    pub session_name: Option<String>,
    #[serde(default)]
    pub sprite_type: Option<String>,
    #[serde(default, alias = "groups")]
    pub sprite_groups: Option<Vec<GroupInput>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "output_location")]
    pub output_folder: Option<PathBuf>,
    #[serde(default)]
    pub default_params: GenerationParams,
    #[serde(default, alias = "items")]
    pub sprites: Option<Vec<ItemInput>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub params: Option<GenerationParams>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Validated session: a name plus immutable groups.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub session_name: String,
    pub sprite_type: String,
    pub groups: Vec<GenerationGroup>,
}

impl SessionPlan {
    pub fn total_items(&self) -> usize {
        self.groups.iter().map(|g| g.requests.len()).sum()
    }

    /// Flatten into one task per item, in processing order.
    pub fn tasks(&self, extension: &str) -> Vec<TaskEntry> {
        self.groups
            .iter()
            .flat_map(|group| {
                group.requests.iter().map(move |request| TaskEntry {
                    sprite_id: request.id.clone(),
                    group_name: group.name.clone(),
                    output_folder: group.output_location.clone(),
                    output_path: request.output_path(&group.output_location, extension),
                    prompt: request.prompt.clone(),
                    params: request.params.clone(),
                    notes: request.notes.clone(),
                })
            })
            .collect()
    }

    pub fn task_list(&self, extension: &str) -> TaskList {
        let tasks = self.tasks(extension);
        TaskList {
            session_name: self.session_name.clone(),
            total_sprites: tasks.len(),
            tasks,
        }
    }
}

/// One item of the flattened task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub sprite_id: String,
    pub group_name: String,
    pub output_folder: PathBuf,
    pub output_path: PathBuf,
    pub prompt: String,
    pub params: GenerationParams,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    pub session_name: String,
    pub total_sprites: usize,
    pub tasks: Vec<TaskEntry>,
}

impl SessionInput {
    pub fn from_json(raw: &str) -> Result<Self, ApiError> {
        serde_json::from_str(raw)
            .map_err(|e| ApiError::InvalidInput(vec![format!("invalid JSON: {}", e)]))
    }

    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ApiError::InvalidInput(vec![format!("cannot read {}: {}", path.display(), e)])
        })?;
        let input = Self::from_json(&raw)?;
        debug!(path = %path.display(), "Session input loaded");
        Ok(input)
    }

    /// Check structure and build the immutable groups. Every problem is reported.
    pub fn validate(&self) -> Result<SessionPlan, ApiError> {
        let mut problems = Vec::new();

        let session_name = non_empty(self.session_name.as_deref());
        if session_name.is_none() {
            problems.push("missing required field 'session_name'".to_string());
        }
        let sprite_type = non_empty(self.sprite_type.as_deref());
        if sprite_type.is_none() {
            problems.push("missing required field 'sprite_type'".to_string());
        }

        let groups_input = match &self.sprite_groups {
            Some(groups) if !groups.is_empty() => groups.as_slice(),
            _ => {
                problems.push("'sprite_groups' must be a non-empty array".to_string());
                &[]
            }
        };

        let mut groups = Vec::with_capacity(groups_input.len());
        let mut group_names = HashSet::new();

        for (index, group_input) in groups_input.iter().enumerate() {
            let label = match non_empty(group_input.name.as_deref()) {
                Some(name) => {
                    if !group_names.insert(name.to_string()) {
                        problems.push(format!("duplicate sprite group name '{}'", name));
                    }
                    name.to_string()
                }
                None => {
                    problems.push(format!("sprite group {} missing 'name'", index));
                    format!("#{}", index)
                }
            };

            let output = group_input
                .output_folder
                .clone()
                .filter(|p| !p.as_os_str().is_empty());
            if output.is_none() {
                problems.push(format!("sprite group '{}' missing 'output_folder'", label));
            }

            let items = match &group_input.sprites {
                Some(items) if !items.is_empty() => items.as_slice(),
                _ => {
                    problems.push(format!("sprite group '{}' missing 'sprites' array", label));
                    &[]
                }
            };

            let mut group = GenerationGroup::new(
                label.clone(),
                output.unwrap_or_default(),
                group_input.default_params.clone(),
            );
            let mut ids = HashSet::new();

            for (item_index, item) in items.iter().enumerate() {
                let Some(id) = non_empty(item.id.as_deref()) else {
                    problems.push(format!(
                        "sprite {} in group '{}' missing 'id'",
                        item_index, label
                    ));
                    continue;
                };
                if !is_plain_file_name(id) {
                    problems.push(format!(
                        "sprite id '{}' in group '{}' must be a plain file name",
                        id, label
                    ));
                    continue;
                }
                if !ids.insert(id.to_string()) {
                    problems.push(format!("duplicate sprite id '{}' in group '{}'", id, label));
                }
                let Some(prompt) = non_empty(item.prompt.as_deref()) else {
                    problems.push(format!("sprite '{}' missing 'prompt'", id));
                    continue;
                };
                group.push(
                    id,
                    prompt,
                    item.params.as_ref(),
                    item.notes.clone().unwrap_or_default(),
                );
            }

            groups.push(group);
        }

        if !problems.is_empty() {
            return Err(ApiError::InvalidInput(problems));
        }

        Ok(SessionPlan {
            session_name: session_name.unwrap_or_default().to_string(),
            sprite_type: sprite_type.unwrap_or_default().to_string(),
            groups,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Item ids become output file stems, so they must stay inside the group folder.
fn is_plain_file_name(id: &str) -> bool {
    id != "."
        && !id.contains("..")
        && !id.chars().any(|c| c == '/' || c == '\\' || c.is_control())
}
