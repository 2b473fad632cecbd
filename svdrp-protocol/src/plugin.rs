//! Plugin listing as returned by `PLUG`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SvdrpError};

/// A plugin loaded into the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl PluginInfo {
    /// Parse `<name> v<version> - <description>`.
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.splitn(4, ' ');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(name), Some(version), Some(_), Some(description)) if !name.is_empty() => {
                Ok(PluginInfo {
                    name: name.to_string(),
                    version: version.strip_prefix('v').unwrap_or(version).to_string(),
                    description: description.to_string(),
                })
            }
            _ => Err(SvdrpError::MalformedResponse(format!(
                "bad plugin line {:?}",
                line
            ))),
        }
    }
}

/// Loaded plugins in server order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Plugins {
    plugins: Vec<PluginInfo>,
}

impl Plugins {
    /// Parse plugin lines, without the heading and closing lines.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self> {
        let plugins = lines
            .iter()
            .map(|l| PluginInfo::parse(l.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { plugins })
    }

    /// True if a plugin with this name is loaded.
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&PluginInfo> {
        self.plugins.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PluginInfo> {
        self.plugins.iter()
    }
}
