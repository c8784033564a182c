//! Generated constants module.
//!
//! Values are collected into a structured list first and only then emitted,
//! so every literal goes through the same escaping pass and every identifier
//! is validated before anything is written.

use std::collections::HashSet;

use super::allowlist::GROUPS;
use super::projection::ContentMap;
use super::{ArtifactError, ArtifactTarget};

const HEADER: &str = "// This file is generated by `tidecast generate`. Do not edit.\n";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Constant {
    group: &'static str,
    identifier: String,
    value: String,
}

/// An ordered list of `(IDENTIFIER, value)` pairs, grouped for readability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstantsModule {
    constants: Vec<Constant>,
    identifiers: HashSet<String>,
}

impl ConstantsModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every allow-listed field, map value or hardcoded default.
    pub fn from_map(map: &ContentMap) -> Result<Self, ArtifactError> {
        let mut module = Self::new();
        for group in GROUPS {
            for field in group.fields {
                module.push(group.name, field.constant, map.value_or_default(field))?;
            }
        }
        Ok(module)
    }

    /// Append a constant. Identifiers must be `SCREAMING_SNAKE_CASE` and unique.
    pub fn push(
        &mut self,
        group: &'static str,
        identifier: &str,
        value: &str,
    ) -> Result<(), ArtifactError> {
        if !is_valid_identifier(identifier) {
            return Err(ArtifactError::encode(
                ArtifactTarget::Constants,
                format!("invalid identifier `{identifier}`"),
            ));
        }
        if !self.identifiers.insert(identifier.to_string()) {
            return Err(ArtifactError::encode(
                ArtifactTarget::Constants,
                format!("duplicate identifier `{identifier}`"),
            ));
        }
        self.constants.push(Constant {
            group,
            identifier: identifier.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Emit a TypeScript module. No timestamp, so unchanged input renders
    /// identical bytes.
    pub fn render(&self) -> Result<String, ArtifactError> {
        let mut out = String::from(HEADER);
        let mut current_group = None;

        for constant in &self.constants {
            if current_group != Some(constant.group) {
                out.push_str(&format!("\n// {}\n", constant.group));
                current_group = Some(constant.group);
            }
            let literal = serde_json::to_string(&constant.value)
                .map_err(|err| ArtifactError::encode(ArtifactTarget::Constants, err))?;
            out.push_str(&format!(
                "export const {} = {literal};\n",
                constant.identifier
            ));
        }

        Ok(out)
    }
}

pub fn render_constants(map: &ContentMap) -> Result<String, ArtifactError> {
    ConstantsModule::from_map(map)?.render()
}

fn is_valid_identifier(identifier: &str) -> bool {
    let mut chars = identifier.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
