// File-backed map registry: a TOML document with the map pool, waiting map and per-map settings.

use crate::domain::errors::{MapConfigError, MapError};
use crate::domain::ports::MapRegistry;
use crate::domain::{Arena, FloorLayer, Spawn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapsDocument {
    /// Game maps in the order they were added.
    #[serde(default)]
    pub maps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiting_map: Option<String>,
    #[serde(default)]
    pub map: BTreeMap<String, MapEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn: Option<Spawn>,
    #[serde(default)]
    pub death_height: i32,
    #[serde(default)]
    pub floors: Vec<FloorLayer>,
}

pub struct TomlMapRegistry {
    path: PathBuf,
    document: RwLock<MapsDocument>,
}

impl TomlMapRegistry {
    /// Reads the map file. A missing file is an empty configuration.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MapConfigError> {
        let path = path.into();
        let document = match std::fs::read_to_string(&path) {
            Ok(raw) => {
                toml::from_str(&raw).map_err(|e| MapConfigError::Parse(e.to_string()))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "map config not found; starting without maps");
                MapsDocument::default()
            }
            Err(source) => {
                return Err(MapConfigError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        Ok(Self::with_document(path, document))
    }

    pub fn with_document(path: impl Into<PathBuf>, document: MapsDocument) -> Self {
        Self {
            path: path.into(),
            document: RwLock::new(document),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MapsDocument> {
        self.document.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MapsDocument> {
        self.document.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn document(&self) -> MapsDocument {
        self.read().clone()
    }

    pub fn add_map(&self, name: &str) -> Result<(), MapConfigError> {
        let mut doc = self.write();
        if doc.maps.iter().any(|existing| existing == name) {
            return Err(MapConfigError::DuplicateMap(name.to_string()));
        }
        doc.maps.push(name.to_string());
        doc.map.entry(name.to_string()).or_default();
        info!(map_name = name, "map added");
        Ok(())
    }

    pub fn remove_map(&self, name: &str) -> Result<(), MapConfigError> {
        let mut doc = self.write();
        let before = doc.maps.len();
        doc.maps.retain(|existing| existing != name);
        if doc.maps.len() == before {
            return Err(MapConfigError::UnknownMap(name.to_string()));
        }
        doc.map.remove(name);
        info!(map_name = name, "map removed");
        Ok(())
    }

    pub fn set_waiting_map(&self, name: &str) {
        let mut doc = self.write();
        doc.waiting_map = Some(name.to_string());
        doc.map.entry(name.to_string()).or_default();
    }

    pub fn set_spawn(&self, name: &str, spawn: Spawn) -> Result<(), MapConfigError> {
        self.edit_entry(name, |entry| entry.spawn = Some(spawn))
    }

    pub fn set_death_height(&self, name: &str, death_height: i32) -> Result<(), MapConfigError> {
        self.edit_entry(name, |entry| entry.death_height = death_height)
    }

    pub fn add_floor(&self, name: &str, layer: FloorLayer) -> Result<(), MapConfigError> {
        self.edit_entry(name, |entry| entry.floors.push(layer))
    }

    // Only game maps and the waiting map have entries.
    fn edit_entry(
        &self,
        name: &str,
        edit: impl FnOnce(&mut MapEntry),
    ) -> Result<(), MapConfigError> {
        let mut doc = self.write();
        let entry = doc
            .map
            .get_mut(name)
            .ok_or_else(|| MapConfigError::UnknownMap(name.to_string()))?;
        edit(entry);
        Ok(())
    }

    /// Writes the current document back to its file.
    pub fn save(&self) -> Result<(), MapConfigError> {
        let raw = toml::to_string_pretty(&*self.read())
            .map_err(|e| MapConfigError::Encode(e.to_string()))?;
        std::fs::write(&self.path, raw).map_err(|source| MapConfigError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }
}

impl MapRegistry for TomlMapRegistry {
    fn list_maps(&self) -> Vec<String> {
        self.read().maps.clone()
    }

    fn waiting_map(&self) -> Option<String> {
        self.read().waiting_map.clone()
    }

    fn load_map(&self, name: &str) -> Result<Arena, MapError> {
        let doc = self.read();
        let entry = doc
            .map
            .get(name)
            .ok_or_else(|| MapError::NotFound(name.to_string()))?;
        if entry.floors.is_empty() {
            return Err(MapError::Unloadable {
                name: name.to_string(),
                reason: "no floors configured".to_string(),
            });
        }
        Ok(Arena::from_layers(name, &entry.floors))
    }

    fn spawn_point(&self, name: &str) -> Option<Spawn> {
        self.read().map.get(name).and_then(|entry| entry.spawn)
    }

    fn death_height(&self, name: &str) -> i32 {
        self.read().map.get(name).map_or(0, |entry| entry.death_height)
    }
}
