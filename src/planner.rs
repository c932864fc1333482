// --------------------------------------------------
// Owning context for one local task list and its settings.
//
// Responsibilities:
// - Load both documents from the store at startup
// - Create / update / delete tasks, toggle completion
// - Write through to the store on every accepted mutation
// - Keep free-text notes per month
// - Export / import the combined backup document
// --------------------------------------------------

use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ImportError, PlannerError, Result, StoreError, ValidationError};
use crate::models::{self, Backup, MonthNotes, Settings, Task, TaskRecord};
use crate::store::{self, KeyValueStore, NOTES_KEY, SETTINGS_KEY, TASKS_KEY};

#[derive(Debug, Default)]
struct PlannerState {
    tasks: Vec<Task>,
    settings: Settings,
    notes: MonthNotes,
}

impl PlannerState {
    fn backup(&self) -> Backup {
        Backup {
            tasks: self.tasks.clone(),
            settings: self.settings.clone(),
            notes: self.notes.clone(),
        }
    }
}

pub struct Planner {
    store: Arc<dyn KeyValueStore>,
    state: RwLock<PlannerState>,
}

impl Planner {
    /// Load tasks, settings and notes; absent documents start empty / default.
    pub fn load(store: Arc<dyn KeyValueStore>) -> std::result::Result<Self, StoreError> {
        let tasks: Vec<Task> = store::load_json(store.as_ref(), TASKS_KEY)?.unwrap_or_default();
        let settings: Settings = store::load_json(store.as_ref(), SETTINGS_KEY)?.unwrap_or_default();
        let notes: MonthNotes = store::load_json(store.as_ref(), NOTES_KEY)?.unwrap_or_default();
        tracing::info!(tasks = tasks.len(), daily_hours = settings.daily_hours, notes = notes.len(), "planner loaded");

        Ok(Self {
            store,
            state: RwLock::new(PlannerState { tasks, settings, notes }),
        })
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.read().tasks.clone()
    }

    pub fn settings(&self) -> Settings {
        self.state.read().settings.clone()
    }

    /// Validate and append a new task. The id is always freshly assigned.
    pub fn add_task(&self, record: TaskRecord) -> Result<Task> {
        let mut task = Task::try_from(record)?;
        task.set_id(Uuid::new_v4().to_string());

        self.mutate_tasks(|tasks| {
            tasks.push(task.clone());
            Ok(())
        })?;
        tracing::info!(id = task.id(), title = task.title(), "task created");
        Ok(task)
    }

    /// Replace a task's definition, keeping its id.
    pub fn update_task(&self, id: &str, record: TaskRecord) -> Result<Task> {
        let mut task = Task::try_from(record)?;
        task.set_id(id.to_string());

        self.mutate_tasks(|tasks| {
            let slot = find_mut(tasks, id)?;
            *slot = task.clone();
            Ok(())
        })?;
        tracing::info!(id, "task updated");
        Ok(task)
    }

    pub fn delete_task(&self, id: &str) -> Result<()> {
        self.mutate_tasks(|tasks| {
            let before = tasks.len();
            tasks.retain(|t| t.id() != id);
            if tasks.len() == before {
                return Err(PlannerError::NotFound(id.to_string()));
            }
            Ok(())
        })?;
        tracing::info!(id, "task deleted");
        Ok(())
    }

    /// Flip completion. Single tasks flip their own flag; recurring tasks
    /// toggle the occurrence on `date`, which is then required.
    pub fn toggle_completed(&self, id: &str, date: Option<NaiveDate>) -> Result<Task> {
        let mut updated = None;
        self.mutate_tasks(|tasks| {
            let task = find_mut(tasks, id)?;
            match task {
                Task::Single(t) => t.completed = !t.completed,
                Task::Recurring(t) => {
                    let date = date.ok_or(ValidationError::MissingField("date"))?;
                    if !t.completed_dates.remove(&date) {
                        t.completed_dates.insert(date);
                    }
                }
            }
            updated = Some(task.clone());
            Ok(())
        })?;
        updated.ok_or_else(|| PlannerError::NotFound(id.to_string()))
    }

    pub fn set_settings(&self, settings: Settings) -> Result<Settings> {
        settings.validate()?;
        let mut state = self.state.write();
        store::save_json(self.store.as_ref(), SETTINGS_KEY, &settings)?;
        state.settings = settings.clone();
        tracing::info!(step = settings.step, daily_hours = settings.daily_hours, "settings saved");
        Ok(settings)
    }

    /// Note of one month, empty when none was written.
    pub fn note(&self, year: i32, month: u32) -> Result<String> {
        let key = models::month_key(year, month)?;
        Ok(self.state.read().notes.get(&key).cloned().unwrap_or_default())
    }

    /// Store a month's note. Blank text removes it.
    pub fn set_note(&self, year: i32, month: u32, text: &str) -> Result<String> {
        let key = models::month_key(year, month)?;
        let mut state = self.state.write();
        let mut next = state.notes.clone();
        if text.trim().is_empty() {
            next.remove(&key);
        } else {
            next.insert(key.clone(), text.to_string());
        }
        store::save_json(self.store.as_ref(), NOTES_KEY, &next)?;
        state.notes = next;
        tracing::debug!(month = %key, "month note saved");
        Ok(state.notes.get(&key).cloned().unwrap_or_default())
    }

    pub fn export(&self) -> Backup {
        self.state.read().backup()
    }

    /// Replace tasks (and settings / notes, when present) from a backup
    /// document. Anything unrecognizable fails with `InvalidFormat` and
    /// changes nothing, in memory or in the store.
    pub fn import(&self, text: &str) -> std::result::Result<Backup, ImportError> {
        let doc: Value = serde_json::from_str(text).map_err(|e| ImportError::InvalidFormat(e.to_string()))?;

        let tasks_value = doc
            .get("tasks")
            .filter(|v| v.is_array())
            .ok_or_else(|| ImportError::InvalidFormat("missing tasks array".to_string()))?;
        let tasks: Vec<Task> =
            serde_json::from_value(tasks_value.clone()).map_err(|e| ImportError::InvalidFormat(e.to_string()))?;

        let mut state = self.state.write();
        let settings = match doc.get("settings") {
            None | Some(Value::Null) => state.settings.clone(),
            Some(v) => {
                let s: Settings =
                    serde_json::from_value(v.clone()).map_err(|e| ImportError::InvalidFormat(e.to_string()))?;
                s.validate().map_err(|e| ImportError::InvalidFormat(e.to_string()))?;
                s
            }
        };

        let notes = match doc.get("notes") {
            None | Some(Value::Null) => state.notes.clone(),
            Some(v) => {
                let raw: MonthNotes =
                    serde_json::from_value(v.clone()).map_err(|e| ImportError::InvalidFormat(e.to_string()))?;
                let mut notes = MonthNotes::new();
                for (key, text) in raw {
                    let key = models::parse_month_key(&key).map_err(|e| ImportError::InvalidFormat(e.to_string()))?;
                    notes.insert(key, text);
                }
                notes
            }
        };

        let next = Backup { tasks, settings, notes };
        if let Err(e) = self.write_backup(&next) {
            self.restore_backup(&state.backup());
            return Err(e.into());
        }
        state.tasks = next.tasks;
        state.settings = next.settings;
        state.notes = next.notes;
        tracing::info!(tasks = state.tasks.len(), notes = state.notes.len(), "backup imported");

        Ok(state.backup())
    }

    fn write_backup(&self, backup: &Backup) -> std::result::Result<(), StoreError> {
        store::save_json(self.store.as_ref(), TASKS_KEY, &backup.tasks)?;
        store::save_json(self.store.as_ref(), SETTINGS_KEY, &backup.settings)?;
        store::save_json(self.store.as_ref(), NOTES_KEY, &backup.notes)
    }

    // Put every document back after a partially written import.
    fn restore_backup(&self, backup: &Backup) {
        let results = [
            (TASKS_KEY, store::save_json(self.store.as_ref(), TASKS_KEY, &backup.tasks)),
            (SETTINGS_KEY, store::save_json(self.store.as_ref(), SETTINGS_KEY, &backup.settings)),
            (NOTES_KEY, store::save_json(self.store.as_ref(), NOTES_KEY, &backup.notes)),
        ];
        for (key, result) in results {
            if let Err(e) = result {
                tracing::error!(key, error = %e, "failed to restore document after import");
            }
        }
    }

    // Apply `f` to a copy of the list; commit only if both `f` and the write succeed.
    fn mutate_tasks<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<Task>) -> Result<()>,
    {
        let mut state = self.state.write();
        let mut next = state.tasks.clone();
        f(&mut next)?;
        store::save_json(self.store.as_ref(), TASKS_KEY, &next)?;
        state.tasks = next;
        Ok(())
    }
}

fn find_mut<'a>(tasks: &'a mut [Task], id: &str) -> Result<&'a mut Task> {
    tasks
        .iter_mut()
        .find(|t| t.id() == id)
        .ok_or_else(|| PlannerError::NotFound(id.to_string()))
}
