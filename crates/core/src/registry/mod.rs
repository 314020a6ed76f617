//! Pet registry: the in-memory set of pets and their schedules, plus JSON
//! persistence.
//!
//! The background poller never holds the lock across a tick; it clones a
//! [`Registry`] snapshot under a short read lock and works on that.

mod record;

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::entity::{EntryRef, Pet, PetId, QuietHours, ScheduleEntry};
use crate::error::PawError;
use crate::time::Timestamp;

use self::record::{EntryRecord, PetRecord, RegistryFile, FILE_VERSION};

/// All known pets in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pets: IndexMap<PetId, Pet>,
    /// Entry records that failed validation, kept so a save does not lose them.
    rejected: HashMap<PetId, Vec<EntryRecord>>,
}

/// Thread-safe handle shared by the foreground CLI and the poller.
pub type SharedRegistry = Arc<RwLock<Registry>>;

pub fn new_shared_registry(registry: Registry) -> SharedRegistry {
    Arc::new(RwLock::new(registry))
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file. A missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self, PawError> {
        if !path.exists() {
            debug!(path = %path.display(), "Registry file not found, starting empty");
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let registry = Self::from_json(&content)?;
        info!(path = %path.display(), pets = registry.len(), "Registry loaded");
        Ok(registry)
    }

    /// Write to a JSON file, creating parent directories as needed.
    ///
    /// The file is replaced atomically via a sibling temp file.
    pub fn save(&self, path: &Path) -> Result<(), PawError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = self.to_json()?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "Registry saved");
        Ok(())
    }

    pub fn from_json(content: &str) -> Result<Self, PawError> {
        let file: RegistryFile = serde_json::from_str(content)?;
        let mut registry = Self::new();
        for record in file.pets {
            let (pet, rejected) = record.into_pet();
            if !rejected.is_empty() {
                registry.rejected.insert(pet.id.clone(), rejected);
            }
            registry.pets.insert(pet.id.clone(), pet);
        }
        Ok(registry)
    }

    pub fn to_json(&self) -> Result<String, PawError> {
        let file = RegistryFile {
            version: FILE_VERSION,
            pets: self
                .pets
                .values()
                .map(|pet| {
                    let rejected = self.rejected.get(&pet.id).map(Vec::as_slice).unwrap_or(&[]);
                    PetRecord::from_pet(pet, rejected)
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn len(&self) -> usize {
        self.pets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pets.is_empty()
    }

    pub fn pets(&self) -> impl Iterator<Item = &Pet> {
        self.pets.values()
    }

    pub fn pets_mut(&mut self) -> impl Iterator<Item = &mut Pet> {
        self.pets.values_mut()
    }

    pub fn pet(&self, id: &PetId) -> Option<&Pet> {
        self.pets.get(id)
    }

    /// Case-insensitive lookup by display name.
    pub fn find_pet_by_name(&self, name: &str) -> Option<&Pet> {
        let wanted = name.trim().to_lowercase();
        self.pets.values().find(|p| p.name.to_lowercase() == wanted)
    }

    /// Register a new pet. Names are unique, ignoring case.
    pub fn add_pet(&mut self, name: &str) -> Result<PetId, PawError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PawError::Other("pet name cannot be empty".into()));
        }
        if self.find_pet_by_name(name).is_some() {
            return Err(PawError::DuplicatePet(name.to_string()));
        }
        let id = PetId::generate();
        self.pets.insert(id.clone(), Pet::new(id.clone(), name));
        Ok(id)
    }

    /// Attach an entry to a pet, re-homing its `subject_id`.
    pub fn add_entry(&mut self, pet: &PetId, mut entry: ScheduleEntry) -> Result<EntryRef, PawError> {
        let target = self
            .pets
            .get_mut(pet)
            .ok_or_else(|| PawError::PetNotFound(pet.to_string()))?;
        entry.subject_id = pet.clone();
        let entry_ref = entry.entry_ref();
        target.schedules.push(entry);
        Ok(entry_ref)
    }

    pub fn remove_entry(&mut self, entry_ref: &EntryRef) -> Result<ScheduleEntry, PawError> {
        let pet = self
            .pets
            .get_mut(&entry_ref.pet)
            .ok_or_else(|| PawError::PetNotFound(entry_ref.pet.to_string()))?;
        let idx = pet
            .schedules
            .iter()
            .position(|e| e.id == entry_ref.entry)
            .ok_or_else(|| PawError::EntryNotFound(entry_ref.to_string()))?;
        Ok(pet.schedules.remove(idx))
    }

    pub fn entry(&self, entry_ref: &EntryRef) -> Option<&ScheduleEntry> {
        self.pets
            .get(&entry_ref.pet)?
            .schedules
            .iter()
            .find(|e| e.id == entry_ref.entry)
    }

    pub fn entry_mut(&mut self, entry_ref: &EntryRef) -> Option<&mut ScheduleEntry> {
        self.pets
            .get_mut(&entry_ref.pet)?
            .schedules
            .iter_mut()
            .find(|e| e.id == entry_ref.entry)
    }

    /// Case-insensitive lookup of a pet's entry by label.
    pub fn find_entry_by_label(&self, pet: &PetId, label: &str) -> Option<&ScheduleEntry> {
        let wanted = label.trim().to_lowercase();
        self.pets
            .get(pet)?
            .schedules
            .iter()
            .find(|e| e.label.to_lowercase() == wanted)
    }

    pub fn set_snooze(&mut self, pet: &PetId, until: Option<Timestamp>) -> Result<(), PawError> {
        let target = self
            .pets
            .get_mut(pet)
            .ok_or_else(|| PawError::PetNotFound(pet.to_string()))?;
        target.suppression.snooze_until = until;
        Ok(())
    }

    pub fn set_quiet_hours(
        &mut self,
        pet: &PetId,
        quiet_hours: Option<QuietHours>,
    ) -> Result<(), PawError> {
        let target = self
            .pets
            .get_mut(pet)
            .ok_or_else(|| PawError::PetNotFound(pet.to_string()))?;
        target.suppression.quiet_hours = quiet_hours;
        Ok(())
    }

    pub fn clear_quiet_hours(&mut self, pet: &PetId) -> Result<(), PawError> {
        self.set_quiet_hours(pet, None)
    }

    /// Number of entry records held back because they failed validation.
    pub fn rejected_count(&self) -> usize {
        self.rejected.values().map(Vec::len).sum()
    }
}
