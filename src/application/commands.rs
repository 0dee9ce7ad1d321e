use crate::application::bootstrap::bootstrap_workspace;
use crate::application::day_transition::{DayTransitionScheduler, NowProvider, SchedulerHandle};
use crate::application::documents::DocumentStore;
use crate::application::events::{DocumentEvent, DocumentEvents};
use crate::domain::boundary::{apply_schedule_change, discarded_by_change};
use crate::domain::history::BlockHistory;
use crate::domain::models::{
    BlockContent, BlockSequence, CurrentBlock, Document, PriorityTag, ScheduleConfig,
    ScheduleError, WEEKDAYS, block_id, parse_document,
};
use crate::domain::mutation::{Selection, assign_block, clear_contents, merge_blocks, split_block};
use crate::domain::priority::{PriorityEntry, PriorityRegistry, color_for};
use crate::domain::time::{format_hhmm, parse_hhmm};
use crate::infrastructure::config::{
    TransitionConfig, ensure_default_configs, load_schedule_config, load_transition_config,
    read_timezone, save_schedule_config,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::store::{KeyValueStore, SqliteKeyValueStore};
use chrono::{Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{error, info};

pub struct AppState {
    config_dir: PathBuf,
    documents: DocumentStore,
    transitions: TransitionConfig,
    timezone: Tz,
    runtime: Mutex<RuntimeState>,
    now_provider: NowProvider,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let store = SqliteKeyValueStore::open(&bootstrap.database_path)?;
        Self::with_store(&bootstrap.config_dir, Arc::new(store))
    }

    pub fn with_store(config_dir: &Path, store: Arc<dyn KeyValueStore>) -> Result<Self, InfraError> {
        fs::create_dir_all(config_dir)?;
        ensure_default_configs(config_dir)?;
        let schedule = load_schedule_config(config_dir)?;
        let timezone = read_timezone(config_dir)?;
        let now_provider: NowProvider = Arc::new(Utc::now);

        Ok(Self {
            config_dir: config_dir.to_path_buf(),
            documents: DocumentStore::new(store, DocumentEvents::new())
                .with_clock(Arc::clone(&now_provider), timezone),
            transitions: load_transition_config(config_dir)?,
            timezone,
            runtime: Mutex::new(RuntimeState {
                schedule,
                histories: HashMap::new(),
            }),
            now_provider,
        })
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.documents = self
            .documents
            .clone()
            .with_clock(Arc::clone(&now_provider), self.timezone);
        self.now_provider = now_provider;
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn schedule(&self) -> Result<ScheduleConfig, InfraError> {
        Ok(lock_runtime(self)?.schedule)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.documents.events().subscribe()
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_error(&self, command: &str, message: &str) {
        error!(command, "{message}");
    }
}

#[derive(Debug)]
struct RuntimeState {
    schedule: ScheduleConfig,
    histories: HashMap<Document, BlockHistory>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockView {
    pub id: String,
    pub time: String,
    pub title: String,
    pub description: String,
    pub priority: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub document: String,
    pub blocks: Vec<BlockView>,
    pub can_undo: bool,
    pub can_redo: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PriorityView {
    pub tag: String,
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleUpdateResponse {
    pub interval_minutes: u16,
    pub day_start: String,
    pub day_end: String,
    pub adjusted: Vec<String>,
}

pub async fn load_blocks_impl(state: &AppState, document: String) -> Result<DocumentView, InfraError> {
    let document = resolve_document(&document)?;
    let schedule = state.schedule()?;
    let sequence = {
        let _edits = state.documents.lock_edits().await;
        state.documents.load_or_generate(document, &schedule).await?
    };
    document_view(state, document, &sequence).await
}

pub async fn assign_block_impl(
    state: &AppState,
    document: String,
    block_id: String,
    title: String,
    description: Option<String>,
    priority: Option<String>,
) -> Result<DocumentView, InfraError> {
    let document = resolve_document(&document)?;
    let priority = PriorityTag::new(priority.unwrap_or_default());
    if !priority.is_none() && state.documents.load_priorities().await?.get(&priority).is_none() {
        return Err(ScheduleError::UnknownPriority(priority.to_string()).into());
    }
    let content = BlockContent::new(
        title.trim(),
        description.unwrap_or_default().trim(),
        priority,
    );
    apply_mutation(state, "assign_block", document, |sequence| {
        Ok(assign_block(sequence, &block_id, content)?)
    })
    .await
}

pub async fn split_block_impl(
    state: &AppState,
    document: String,
    block_id: String,
) -> Result<DocumentView, InfraError> {
    let document = resolve_document(&document)?;
    let interval_minutes = state.schedule()?.interval_minutes;
    apply_mutation(state, "split_block", document, |sequence| {
        Ok(split_block(sequence, &block_id, interval_minutes)?)
    })
    .await
}

pub async fn merge_blocks_impl(
    state: &AppState,
    document: String,
    block_ids: Vec<String>,
) -> Result<DocumentView, InfraError> {
    let document = resolve_document(&document)?;
    apply_mutation(state, "merge_blocks", document, |sequence| {
        let selection = Selection::from_ids(sequence, &block_ids)?;
        Ok(merge_blocks(sequence, &selection)?)
    })
    .await
}

pub async fn select_block_impl(
    state: &AppState,
    document: String,
    selected: Vec<String>,
    pressed: String,
) -> Result<Vec<String>, InfraError> {
    let document = resolve_document(&document)?;
    let schedule = state.schedule()?;
    let sequence = {
        let _edits = state.documents.lock_edits().await;
        state.documents.load_or_generate(document, &schedule).await?
    };
    let mut selection = Selection::from_ids(&sequence, &selected)?;
    selection.press(sequence.require_position(&pressed)?);
    Ok(selection.ids())
}

/// Blanks every block of a document. Assigned content is only discarded
/// with `confirm`.
pub async fn reset_blocks_impl(
    state: &AppState,
    document: String,
    confirm: bool,
) -> Result<DocumentView, InfraError> {
    let document = resolve_document(&document)?;
    apply_mutation(state, "reset_blocks", document, |sequence| {
        let assigned = sequence
            .iter()
            .enumerate()
            .filter(|(_, block)| block.has_content())
            .map(|(index, _)| block_id(index))
            .collect::<Vec<_>>();
        if !confirm && !assigned.is_empty() {
            return Err(InfraError::ConfirmationRequired {
                action: "reset_blocks".to_string(),
                block_ids: assigned,
            });
        }
        Ok(clear_contents(sequence))
    })
    .await
}

pub async fn update_schedule_impl(
    state: &AppState,
    interval_minutes: u16,
    day_start: String,
    day_end: String,
    confirm_discard: bool,
) -> Result<ScheduleUpdateResponse, InfraError> {
    let next = ScheduleConfig::new(
        interval_minutes,
        parse_schedule_minute(&day_start, "dayStart")?,
        parse_schedule_minute(&day_end, "dayEnd")?,
    )?;
    let _edits = state.documents.lock_edits().await;
    let current = state.schedule()?;

    let mut stored = Vec::new();
    for document in all_documents() {
        if let Some(sequence) = state.documents.find(document).await? {
            stored.push((document, sequence));
        }
    }

    let discarded = stored
        .iter()
        .flat_map(|(document, sequence)| {
            discarded_by_change(sequence, &current, &next)
                .into_iter()
                .map(move |index| format!("{document}#{}", block_id(index)))
        })
        .collect::<Vec<_>>();
    if !confirm_discard && !discarded.is_empty() {
        return Err(InfraError::ConfirmationRequired {
            action: "update_schedule".to_string(),
            block_ids: discarded,
        });
    }

    let mut updates = Vec::new();
    for (document, sequence) in stored {
        let updated = apply_schedule_change(&sequence, &current, &next)?;
        if updated != sequence {
            updates.push((document, updated));
        }
    }
    // schedule.json is written only once every document is saved.
    let mut adjusted = Vec::new();
    for (document, updated) in updates {
        state.documents.save(document, &updated).await?;
        adjusted.push(document);
    }
    save_schedule_config(&state.config_dir, &next)?;
    lock_runtime(state)?.schedule = next;
    {
        let mut runtime = lock_runtime(state)?;
        for document in &adjusted {
            runtime.histories.remove(document);
        }
    }

    info!(
        interval_minutes = next.interval_minutes,
        day_start = %format_hhmm(next.day_start),
        day_end = %format_hhmm(next.day_end),
        adjusted = adjusted.len(),
        "schedule updated"
    );
    Ok(ScheduleUpdateResponse {
        interval_minutes: next.interval_minutes,
        day_start: format_hhmm(next.day_start),
        day_end: format_hhmm(next.day_end),
        adjusted: adjusted.iter().map(ToString::to_string).collect(),
    })
}

pub async fn undo_impl(state: &AppState, document: String) -> Result<Option<DocumentView>, InfraError> {
    let document = resolve_document(&document)?;
    let _edits = state.documents.lock_edits().await;
    let Some(current) = state.documents.find(document).await? else {
        return Ok(None);
    };
    let previous = lock_runtime(state)?
        .histories
        .entry(document)
        .or_default()
        .undo(current);
    let Some(previous) = previous else {
        return Ok(None);
    };
    state.documents.save(document, &previous).await?;
    info!(%document, "edit undone");
    document_view(state, document, &previous).await.map(Some)
}

pub async fn redo_impl(state: &AppState, document: String) -> Result<Option<DocumentView>, InfraError> {
    let document = resolve_document(&document)?;
    let _edits = state.documents.lock_edits().await;
    let Some(current) = state.documents.find(document).await? else {
        return Ok(None);
    };
    let next = lock_runtime(state)?
        .histories
        .entry(document)
        .or_default()
        .redo(current);
    let Some(next) = next else {
        return Ok(None);
    };
    state.documents.save(document, &next).await?;
    info!(%document, "edit redone");
    document_view(state, document, &next).await.map(Some)
}

pub async fn current_block_impl(state: &AppState) -> Result<Option<CurrentBlock>, InfraError> {
    let local = (state.now_provider)().with_timezone(&state.timezone);
    let minute = (local.hour() * 60 + local.minute()) as u16;
    let schedule = state.schedule()?;
    let _edits = state.documents.lock_edits().await;
    let today = state.documents.load_or_generate(Document::Today, &schedule).await?;
    Ok(today.locate(minute))
}

pub async fn list_priorities_impl(state: &AppState) -> Result<Vec<PriorityView>, InfraError> {
    let registry = state.documents.load_priorities().await?;
    Ok(registry
        .list()
        .into_iter()
        .map(|(tag, entry)| to_priority_view(tag, entry))
        .collect())
}

pub async fn add_priority_impl(state: &AppState) -> Result<PriorityView, InfraError> {
    update_priorities(state, "add_priority", |registry| Ok(registry.add())).await
}

pub async fn rename_priority_impl(
    state: &AppState,
    tag: String,
    label: String,
) -> Result<PriorityView, InfraError> {
    let tag = PriorityTag::new(tag);
    update_priorities(state, "rename_priority", |registry| {
        registry.rename(&tag, &label)?;
        Ok(tag.clone())
    })
    .await
}

pub async fn recolor_priority_impl(
    state: &AppState,
    tag: String,
    color: String,
) -> Result<PriorityView, InfraError> {
    let tag = PriorityTag::new(tag);
    update_priorities(state, "recolor_priority", |registry| {
        registry.recolor(&tag, &color)?;
        Ok(tag.clone())
    })
    .await
}

pub async fn delete_priority_impl(state: &AppState, tag: String) -> Result<bool, InfraError> {
    let tag = PriorityTag::new(tag);
    let mut registry = state.documents.load_priorities().await?;
    if registry.remove(&tag).is_err() {
        return Ok(false);
    }
    state.documents.save_priorities(&registry).await?;
    info!(tag = %tag, "priority deleted");
    Ok(true)
}

pub async fn priority_color_impl(state: &AppState, tag: String) -> Result<String, InfraError> {
    let registry = state.documents.load_priorities().await?;
    Ok(color_for(&PriorityTag::new(tag), &registry).to_string())
}

pub async fn start_scheduler(state: &AppState) -> Result<SchedulerHandle, InfraError> {
    let scheduler = Arc::new(
        DayTransitionScheduler::new(state.documents.clone(), state.transitions, state.timezone)
            .with_now_provider(Arc::clone(&state.now_provider)),
    );
    let applied = scheduler.catch_up().await?;
    if !applied.is_empty() {
        info!(count = applied.len(), "caught up on missed day transitions");
    }
    Ok(scheduler.spawn())
}

async fn apply_mutation<F>(
    state: &AppState,
    command: &str,
    document: Document,
    mutation: F,
) -> Result<DocumentView, InfraError>
where
    F: FnOnce(&BlockSequence) -> Result<BlockSequence, InfraError>,
{
    let _edits = state.documents.lock_edits().await;
    let schedule = state.schedule()?;
    let current = state.documents.load_or_generate(document, &schedule).await?;
    let updated = mutation(&current)?;
    state.documents.save(document, &updated).await?;
    lock_runtime(state)?
        .histories
        .entry(document)
        .or_default()
        .record(current, updated.clone());
    info!(
        command,
        %document,
        blocks = updated.len(),
        assigned = updated.assigned_count(),
        "blocks updated"
    );
    document_view(state, document, &updated).await
}

async fn update_priorities<F>(
    state: &AppState,
    command: &str,
    update: F,
) -> Result<PriorityView, InfraError>
where
    F: FnOnce(&mut PriorityRegistry) -> Result<PriorityTag, ScheduleError>,
{
    let mut registry = state.documents.load_priorities().await?;
    let tag = update(&mut registry)?;
    state.documents.save_priorities(&registry).await?;
    let entry = registry
        .get(&tag)
        .ok_or_else(|| ScheduleError::UnknownPriority(tag.to_string()))?;
    info!(command, tag = %tag, color = %entry.color, "priority updated");
    Ok(to_priority_view(&tag, entry))
}

async fn document_view(
    state: &AppState,
    document: Document,
    sequence: &BlockSequence,
) -> Result<DocumentView, InfraError> {
    let registry = state.documents.load_priorities().await?;
    let (can_undo, can_redo) = lock_runtime(state)?
        .histories
        .get(&document)
        .map_or((false, false), |history| (history.can_undo(), history.can_redo()));
    let blocks = sequence
        .iter()
        .enumerate()
        .map(|(index, block)| BlockView {
            id: block_id(index),
            time: block.range.to_string(),
            title: block.content.title.clone(),
            description: block.content.description.clone(),
            priority: block.content.priority.to_string(),
            color: color_for(&block.content.priority, &registry).to_string(),
        })
        .collect();
    Ok(DocumentView {
        document: document.to_string(),
        blocks,
        can_undo,
        can_redo,
    })
}

fn to_priority_view(tag: &PriorityTag, entry: &PriorityEntry) -> PriorityView {
    PriorityView {
        tag: tag.to_string(),
        label: entry.label.clone(),
        color: entry.color.clone(),
    }
}

fn all_documents() -> impl Iterator<Item = Document> {
    [Document::Today, Document::Tomorrow]
        .into_iter()
        .chain(WEEKDAYS.into_iter().map(Document::Routine))
}

fn resolve_document(value: &str) -> Result<Document, InfraError> {
    parse_document(value)
        .ok_or_else(|| ScheduleError::UnknownDocument(value.trim().to_string()).into())
}

fn parse_schedule_minute(value: &str, field_name: &str) -> Result<u16, InfraError> {
    parse_hhmm(value).ok_or_else(|| {
        ScheduleError::InvalidSchedule(format!("{field_name} '{}' must be HH:MM", value.trim())).into()
    })
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::Store(format!("runtime lock poisoned: {error}")))
}
