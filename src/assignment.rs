//! Location name -> coordinate mapping with durable storage.

use crate::coordinate::Coordinate;
use crate::layout::generate_grid_layout;
use crate::store::MappingStore;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Store key the mapping is persisted under
pub const MAPPING_KEY: &str = "coordinate_mapping";

pub type CoordinateMapping = BTreeMap<String, Coordinate>;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("failed to encode coordinate mapping: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode coordinate mapping: {0}")]
    Decode(#[source] serde_json::Error),
}

struct State {
    mapping: CoordinateMapping,
    store: Box<dyn MappingStore>,
}

/// Owns the coordinate mapping for one running application.
///
/// All access goes through an internal lock, and every mutation writes the
/// full mapping back to the store before returning. Store failures are logged
/// and never surface to callers; the in-memory mapping stays authoritative.
pub struct CoordinateAssignment {
    state: Mutex<State>,
}

impl CoordinateAssignment {
    /// Load the persisted mapping, falling back to empty on missing or corrupt data
    pub fn new(store: Box<dyn MappingStore>) -> Self {
        let mapping = load_mapping(store.as_ref());
        CoordinateAssignment {
            state: Mutex::new(State { mapping, store }),
        }
    }

    pub fn coordinate(&self, name: &str) -> Option<Coordinate> {
        self.lock().mapping.get(name).copied()
    }

    pub fn set_coordinate(&self, coordinate: Coordinate, name: &str) {
        let mut state = self.lock();
        state.mapping.insert(name.to_string(), coordinate);
        persist(&state);
    }

    pub fn remove_coordinate(&self, name: &str) {
        let mut state = self.lock();
        if state.mapping.remove(name).is_some() {
            debug!("Removed coordinate for {}", name);
        }
        persist(&state);
    }

    /// Generate a grid layout for `names` and merge it over the mapping
    pub fn apply_grid_layout<S: AsRef<str>>(&self, names: &[S]) {
        let layout = generate_grid_layout(names);
        let mut state = self.lock();
        info!("Applying grid layout to {} locations", layout.len());
        state.mapping.extend(layout);
        persist(&state);
    }

    /// Lay out `names` unless every one of them is already mapped.
    ///
    /// Returns `None` when nothing was laid out, otherwise the names whose
    /// existing coordinate the layout replaced.
    pub fn ensure_layout<S: AsRef<str>>(&self, names: &[S]) -> Option<Vec<String>> {
        let mut state = self.lock();
        if names.iter().all(|n| state.mapping.contains_key(n.as_ref())) {
            return None;
        }

        let layout = generate_grid_layout(names);
        let moved: Vec<String> = layout
            .iter()
            .filter(|(name, coordinate)| {
                state.mapping.get(*name).is_some_and(|old| old != *coordinate)
            })
            .map(|(name, _)| name.clone())
            .collect();
        if !moved.is_empty() {
            warn!(
                "Auto layout replaced positions of {} placed locations: {}",
                moved.len(),
                moved.join(", ")
            );
        }

        info!("Applying grid layout to {} locations", layout.len());
        state.mapping.extend(layout);
        persist(&state);
        Some(moved)
    }

    /// True iff every name is mapped (vacuously true for no names)
    pub fn has_coordinates<S: AsRef<str>>(&self, names: &[S]) -> bool {
        let state = self.lock();
        names.iter().all(|n| state.mapping.contains_key(n.as_ref()))
    }

    pub fn has_any_coordinates(&self) -> bool {
        !self.lock().mapping.is_empty()
    }

    /// Snapshot of the current mapping
    pub fn mapping(&self) -> CoordinateMapping {
        self.lock().mapping.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().mapping.is_empty()
    }

    /// Clear every mapped coordinate
    pub fn reset(&self) {
        let mut state = self.lock();
        state.mapping.clear();
        info!("Coordinate mapping reset");
        persist(&state);
    }

    pub fn export_mapping(&self) -> Result<Vec<u8>, MappingError> {
        let state = self.lock();
        serde_json::to_vec_pretty(&state.mapping).map_err(MappingError::Encode)
    }

    /// Replace the mapping with a previously exported one.
    ///
    /// On a decode failure the current mapping is left untouched.
    pub fn import_mapping(&self, bytes: &[u8]) -> Result<usize, MappingError> {
        let imported: CoordinateMapping =
            serde_json::from_slice(bytes).map_err(MappingError::Decode)?;
        let count = imported.len();

        let mut state = self.lock();
        state.mapping = imported;
        persist(&state);
        info!("Imported {} coordinates", count);
        Ok(count)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn load_mapping(store: &dyn MappingStore) -> CoordinateMapping {
    let bytes = match store.read(MAPPING_KEY) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            debug!("No stored coordinate mapping");
            return CoordinateMapping::new();
        }
        Err(e) => {
            warn!("Failed to read coordinate mapping: {:#}", e);
            return CoordinateMapping::new();
        }
    };

    match serde_json::from_slice::<CoordinateMapping>(&bytes) {
        Ok(mapping) => {
            debug!("Loaded {} coordinates", mapping.len());
            mapping
        }
        Err(e) => {
            warn!("Stored coordinate mapping is corrupt, starting empty: {}", e);
            CoordinateMapping::new()
        }
    }
}

fn persist(state: &State) {
    let bytes = match serde_json::to_vec(&state.mapping) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to encode coordinate mapping: {}", e);
            return;
        }
    };

    if let Err(e) = state.store.write(MAPPING_KEY, &bytes) {
        warn!("Failed to persist coordinate mapping: {:#}", e);
    }
}
