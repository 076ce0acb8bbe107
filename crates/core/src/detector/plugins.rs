//! Plugin manifest handling and the update-check wire format.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::types::DetectorError;

/// The repository's plugin list.
///
/// Kept as the parsed JSON document so that a rewrite only touches the
/// patched values; key order and unknown fields survive.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginManifest {
    document: Value,
}

/// One pinned plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginEntry {
    /// Update-check key, e.g. `akismet/akismet.php`.
    pub key: String,
    pub version: String,
    pub download: Option<String>,
}

impl PluginManifest {
    /// Parses a manifest, requiring a `plugins` array of objects with
    /// string `key` and `version` fields.
    pub fn parse(content: &str) -> Result<Self, String> {
        let document: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
        let entries = document
            .get("plugins")
            .and_then(Value::as_array)
            .ok_or_else(|| "missing \"plugins\" array".to_string())?;

        for (index, entry) in entries.iter().enumerate() {
            for field in ["key", "version"] {
                if entry.get(field).and_then(Value::as_str).is_none() {
                    return Err(format!("plugin #{} has no string \"{}\"", index, field));
                }
            }
        }

        Ok(Self { document })
    }

    pub fn plugins(&self) -> Vec<PluginEntry> {
        self.entries()
            .iter()
            .map(|entry| PluginEntry {
                key: string_field(entry, "key"),
                version: string_field(entry, "version"),
                download: entry
                    .get("download")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Two-space indented JSON, in the order the document was read.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.document)
    }

    fn entries(&self) -> &[Value] {
        self.document
            .get("plugins")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn entries_mut(&mut self) -> impl Iterator<Item = &mut Map<String, Value>> {
        self.document
            .get_mut("plugins")
            .and_then(Value::as_array_mut)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object_mut)
    }
}

fn string_field(entry: &Value, field: &str) -> String {
    entry
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Body of an update-check request: plugin key to installed version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateCheckRequest {
    pub plugins: BTreeMap<String, InstalledPlugin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledPlugin {
    #[serde(rename = "Version")]
    pub version: String,
}

/// Plugins that have a newer version available.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateCheckResponse {
    #[serde(default, deserialize_with = "map_or_empty_list")]
    pub plugins: BTreeMap<String, PluginUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PluginUpdate {
    pub new_version: String,
    #[serde(default)]
    pub package: String,
}

/// The update-check API answers `[]` instead of `{}` when nothing is outdated.
fn map_or_empty_list<'de, D>(deserializer: D) -> Result<BTreeMap<String, PluginUpdate>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrList {
        Map(BTreeMap<String, PluginUpdate>),
        List(Vec<serde_json::Value>),
    }

    Ok(match MapOrList::deserialize(deserializer)? {
        MapOrList::Map(map) => map,
        MapOrList::List(_) => BTreeMap::new(),
    })
}

fn manifest_file(repo_path: &Path, manifest_path: &str) -> PathBuf {
    repo_path.join(manifest_path)
}

pub async fn read_manifest(
    repo_path: &Path,
    manifest_path: &str,
) -> Result<PluginManifest, DetectorError> {
    let path = manifest_file(repo_path, manifest_path);
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| DetectorError::Io {
            path: path.clone(),
            source,
        })?;

    PluginManifest::parse(&content).map_err(|reason| DetectorError::Manifest { path, reason })
}

/// Writes the manifest back as two-space indented JSON.
pub async fn write_manifest(
    repo_path: &Path,
    manifest_path: &str,
    manifest: &PluginManifest,
) -> Result<(), DetectorError> {
    let path = manifest_file(repo_path, manifest_path);
    let content = manifest.to_json_pretty().map_err(|e| DetectorError::Manifest {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    tokio::fs::write(&path, content)
        .await
        .map_err(|source| DetectorError::Io { path, source })
}

pub fn build_request(manifest: &PluginManifest) -> UpdateCheckRequest {
    let plugins = manifest
        .plugins()
        .into_iter()
        .map(|p| (p.key, InstalledPlugin { version: p.version }))
        .collect();

    UpdateCheckRequest { plugins }
}

/// Moves every listed plugin to its new version and download URL.
/// Returns how many manifest entries changed.
pub fn apply_updates(manifest: &mut PluginManifest, response: &UpdateCheckResponse) -> usize {
    let mut changed = 0;
    for entry in manifest.entries_mut() {
        let update = entry
            .get("key")
            .and_then(Value::as_str)
            .and_then(|key| response.plugins.get(key));
        if let Some(update) = update {
            entry.insert("version".to_string(), Value::from(update.new_version.clone()));
            entry.insert("download".to_string(), Value::from(update.package.clone()));
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"{
  "plugins": [
    {"key": "akismet/akismet.php", "version": "4.1.5", "name": "Akismet"},
    {"key": "redirection/redirection.php", "version": "4.8", "download": "https://old/redirection.zip"}
  ]
}"#;

    fn manifest() -> PluginManifest {
        PluginManifest::parse(MANIFEST).unwrap()
    }

    #[test]
    fn test_build_request() {
        let request = build_request(&manifest());
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"plugins": {
                "akismet/akismet.php": {"Version": "4.1.5"},
                "redirection/redirection.php": {"Version": "4.8"}
            }})
        );
    }

    #[test]
    fn test_response_with_updates() {
        let json = r#"{"plugins": {"akismet/akismet.php": {
            "slug": "akismet", "new_version": "4.1.6",
            "package": "https://downloads.wordpress.org/plugin/akismet.4.1.6.zip"
        }}, "translations": []}"#;
        let response: UpdateCheckResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.plugins.len(), 1);
        assert_eq!(response.plugins["akismet/akismet.php"].new_version, "4.1.6");
    }

    #[test]
    fn test_response_without_updates_is_empty_list() {
        let response: UpdateCheckResponse =
            serde_json::from_str(r#"{"plugins": [], "translations": []}"#).unwrap();
        assert!(response.plugins.is_empty());
    }

    #[test]
    fn test_apply_updates_keeps_other_fields() {
        let mut manifest = manifest();
        let response: UpdateCheckResponse = serde_json::from_str(
            r#"{"plugins": {"akismet/akismet.php": {"new_version": "4.1.6", "package": "https://x/a.zip"}}}"#,
        )
        .unwrap();

        assert_eq!(apply_updates(&mut manifest, &response), 1);
        let plugins = manifest.plugins();
        assert_eq!(plugins[0].version, "4.1.6");
        assert_eq!(plugins[0].download.as_deref(), Some("https://x/a.zip"));
        assert_eq!(plugins[1].version, "4.8");
        assert!(manifest.to_json_pretty().unwrap().contains("\"name\": \"Akismet\""));
    }

    #[test]
    fn test_apply_updates_ignores_unknown_keys() {
        let mut manifest = manifest();
        let before = manifest.clone();
        let response: UpdateCheckResponse = serde_json::from_str(
            r#"{"plugins": {"jetpack/jetpack.php": {"new_version": "9.0", "package": "https://x/j.zip"}}}"#,
        )
        .unwrap();

        assert_eq!(apply_updates(&mut manifest, &response), 0);
        assert_eq!(manifest, before);
    }

    #[test]
    fn test_rewrite_keeps_key_order() {
        let mut manifest = PluginManifest::parse(
            r#"{"version": 2, "plugins": [{"name": "Akismet", "key": "akismet/akismet.php", "version": "4.1.5", "download": "https://old/a.zip"}]}"#,
        )
        .unwrap();
        let response: UpdateCheckResponse = serde_json::from_str(
            r#"{"plugins": {"akismet/akismet.php": {"new_version": "4.1.6", "package": "https://x/a.zip"}}}"#,
        )
        .unwrap();
        apply_updates(&mut manifest, &response);

        let written = manifest.to_json_pretty().unwrap();
        let expected_order = [
            "\"version\": 2",
            "\"plugins\"",
            "\"name\"",
            "\"key\"",
            "\"4.1.6\"",
            "\"download\"",
        ];
        let positions: Vec<usize> = expected_order
            .iter()
            .map(|needle| written.find(needle).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_manifest_without_plugins_array_is_rejected() {
        assert!(PluginManifest::parse(r#"{"plugins": {}}"#).is_err());
        assert!(PluginManifest::parse(r#"{"plugins": [{"key": "a/a.php"}]}"#).is_err());
    }

    #[tokio::test]
    async fn test_manifest_round_trip_on_disk() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("init")).unwrap();
        std::fs::write(dir.path().join("init/plugin-list.json"), MANIFEST).unwrap();

        let mut loaded = read_manifest(dir.path(), "init/plugin-list.json").await.unwrap();
        let response: UpdateCheckResponse = serde_json::from_str(
            r#"{"plugins": {"redirection/redirection.php": {"new_version": "5.0", "package": "https://x/r.zip"}}}"#,
        )
        .unwrap();
        apply_updates(&mut loaded, &response);
        write_manifest(dir.path(), "init/plugin-list.json", &loaded)
            .await
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("init/plugin-list.json")).unwrap();
        assert!(written.contains("\n  \"plugins\": ["));
        let reloaded = read_manifest(dir.path(), "init/plugin-list.json").await.unwrap();
        assert_eq!(reloaded, loaded);
    }

    #[tokio::test]
    async fn test_missing_manifest_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = read_manifest(dir.path(), "init/plugin-list.json")
            .await
            .unwrap_err();
        assert!(matches!(err, DetectorError::Io { .. }));
    }
}
