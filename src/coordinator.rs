//! Command dispatch over the registry state.
//!
//! All state lives in one [`RegistryState`] behind an async mutex that is never
//! held across a remote call, so an outstanding request only suspends the
//! command that issued it. Mutations are serialized among themselves by a
//! separate mutex and take the state lock only to apply the reloaded list.
//! Searches take it to obtain a sequence token and to apply their result; a
//! response that is no longer the latest issued is dropped.
//!
//! Rendered marker sets are cached per mode and store revision, so any store
//! change makes older renders unreachable.

use crate::config::Config;
use crate::errors::AppError;
use crate::forms::{apply_edit, build_draft, DraftDefaults, DraftForm, EditForm};
use crate::models::PropertyRecord;
use crate::popup::search_summary;
use crate::record_store::RecordStore;
use crate::registry_client::RegistryClient;
use crate::search::{nearby_query, AttributeCriteria, SearchOutcome, SearchSequencer, SearchService, SearchToken};
use crate::statistics::{compute_report, StatisticsReport};
use crate::sync::SyncClient;
use crate::visualization::{ColorToggle, MarkerSet, VisualizationEngine, VisualizationMode};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Everything the UI used to keep in ambient globals.
#[derive(Debug, Default)]
pub struct RegistryState {
    pub store: RecordStore,
    pub toggle: ColorToggle,
    /// Record picked for editing or deletion.
    pub selected: Option<PropertyRecord>,
    /// Mode of the last marker set handed out; `None` while markers are hidden.
    pub current_view: Option<VisualizationMode>,
    pub searches: SearchSequencer,
}

/// A form value that may arrive as text or as a number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

impl FieldValue {
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => n.to_string(),
        }
    }
}

/// One user action.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Full resync from the remote store, then the normal view.
    Reload,
    /// Alternates between the normal and the ratio-colored view.
    ToggleColorMode,
    ShowDebtOnly,
    ShowPaidOnly,
    HideMarkers,
    Search(AttributeCriteria),
    SearchNearby {
        reference: FieldValue,
        radius: FieldValue,
    },
    CreateRecord(DraftForm),
    SelectRecord {
        #[serde(default)]
        owner: Option<String>,
        #[serde(default)]
        id: Option<FieldValue>,
    },
    ClearSelection,
    SubmitEdit(EditForm),
    DeleteSelected,
    Statistics,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Render {
        markers: MarkerSet,
    },
    SearchResults {
        total: usize,
        summary: String,
        markers: MarkerSet,
    },
    /// A search or lookup matched nothing. The current markers stay as they are.
    NoMatch {
        message: String,
    },
    /// A newer search was issued while this one was in flight.
    Stale,
    Selected {
        record: PropertyRecord,
    },
    SelectionCleared,
    /// `reload_error` is set when the mutation went through but the list
    /// could not be fetched afterwards; `markers` then show the last loaded
    /// records.
    Created {
        id: i64,
        markers: MarkerSet,
        #[serde(skip_serializing_if = "Option::is_none")]
        reload_error: Option<String>,
    },
    Updated {
        id: i64,
        markers: MarkerSet,
        #[serde(skip_serializing_if = "Option::is_none")]
        reload_error: Option<String>,
    },
    Deleted {
        id: i64,
        markers: MarkerSet,
        #[serde(skip_serializing_if = "Option::is_none")]
        reload_error: Option<String>,
    },
    Statistics {
        report: StatisticsReport,
    },
}

pub struct Coordinator {
    sync: SyncClient,
    search: SearchService,
    engine: VisualizationEngine,
    defaults: DraftDefaults,
    state: Mutex<RegistryState>,
    /// Held for the whole remote round trip of a mutation or reload.
    mutations: Mutex<()>,
    render_cache: Cache<(VisualizationMode, u64), MarkerSet>,
}

impl Coordinator {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = RegistryClient::from_config(config)?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: RegistryClient, config: &Config) -> Self {
        Self {
            sync: SyncClient::new(client.clone()),
            search: SearchService::new(client),
            engine: VisualizationEngine::new(config.map_fit_padding),
            defaults: DraftDefaults::from(config),
            state: Mutex::new(RegistryState::default()),
            mutations: Mutex::new(()),
            render_cache: Cache::builder().max_capacity(16).build(),
        }
    }

    pub async fn dispatch(&self, command: Command) -> Result<CommandOutcome, AppError> {
        tracing::debug!("Dispatching command: {:?}", command);
        match command {
            Command::Reload => {
                let _serial = self.mutations.lock().await;
                let records = self.sync.fetch_all().await?;
                let mut state = self.state.lock().await;
                state.store.load(records);
                let markers = self.render(&mut state, VisualizationMode::Normal).await;
                Ok(CommandOutcome::Render { markers })
            }
            Command::ToggleColorMode => {
                let mut state = self.state.lock().await;
                let mode = state.toggle.activate();
                tracing::info!("Color toggle activated, rendering {:?}", mode);
                let markers = self.render(&mut state, mode).await;
                Ok(CommandOutcome::Render { markers })
            }
            Command::ShowDebtOnly => self.show(VisualizationMode::DebtOnly).await,
            Command::ShowPaidOnly => self.show(VisualizationMode::PaidOnly).await,
            Command::HideMarkers => {
                let mut state = self.state.lock().await;
                state.current_view = None;
                Ok(CommandOutcome::Render {
                    markers: MarkerSet::hidden(),
                })
            }
            Command::Search(criteria) => {
                criteria.to_query()?;
                let token = self.next_search_token().await;
                let result = self.search.search_by_attributes(&criteria).await;
                self.apply_search(token, result).await
            }
            Command::SearchNearby { reference, radius } => {
                let (reference, radius) = (reference.as_text(), radius.as_text());
                nearby_query(&reference, &radius)?;
                let token = self.next_search_token().await;
                let result = self.search.search_nearby(&reference, &radius).await;
                self.apply_search(token, result).await
            }
            Command::CreateRecord(form) => {
                let draft = build_draft(&form, &self.defaults)?;
                let _serial = self.mutations.lock().await;
                let synced = self.sync.create(&draft).await?;

                let mut state = self.state.lock().await;
                let (id, reload_error) = synced.apply(&mut state.store);
                let markers = self.render(&mut state, VisualizationMode::Normal).await;
                Ok(CommandOutcome::Created {
                    id,
                    markers,
                    reload_error: reload_error.map(|e| e.to_string()),
                })
            }
            Command::SelectRecord { owner, id } => self.select(owner, id).await,
            Command::ClearSelection => {
                self.state.lock().await.selected = None;
                Ok(CommandOutcome::SelectionCleared)
            }
            Command::SubmitEdit(form) => {
                let _serial = self.mutations.lock().await;
                let selected = self.state.lock().await.selected.clone().ok_or_else(|| {
                    AppError::Validation("No record selected for editing".to_string())
                })?;
                let edited = apply_edit(&selected, &form)?;
                let synced = self.sync.update(&edited).await?;

                let mut state = self.state.lock().await;
                let ((), reload_error) = synced.apply(&mut state.store);
                clear_selection_of(&mut state, edited.id);
                let markers = self.render(&mut state, VisualizationMode::Normal).await;
                Ok(CommandOutcome::Updated {
                    id: edited.id,
                    markers,
                    reload_error: reload_error.map(|e| e.to_string()),
                })
            }
            Command::DeleteSelected => {
                let _serial = self.mutations.lock().await;
                let id = self.state.lock().await.selected.as_ref().map(|r| r.id).ok_or_else(|| {
                    AppError::Validation("No record selected for deletion".to_string())
                })?;
                let synced = self.sync.delete(id).await?;

                let mut state = self.state.lock().await;
                let ((), reload_error) = synced.apply(&mut state.store);
                clear_selection_of(&mut state, id);
                let markers = self.render(&mut state, VisualizationMode::Normal).await;
                Ok(CommandOutcome::Deleted {
                    id,
                    markers,
                    reload_error: reload_error.map(|e| e.to_string()),
                })
            }
            Command::Statistics => Ok(CommandOutcome::Statistics {
                report: self.statistics().await,
            }),
        }
    }

    /// Marker set of the view currently shown.
    pub async fn current_markers(&self) -> MarkerSet {
        let mut state = self.state.lock().await;
        match state.current_view {
            Some(mode) => self.render(&mut state, mode).await,
            None => MarkerSet::hidden(),
        }
    }

    pub async fn statistics(&self) -> StatisticsReport {
        let state = self.state.lock().await;
        compute_report(state.store.records())
    }

    pub async fn records(&self) -> Vec<PropertyRecord> {
        self.state.lock().await.store.records().to_vec()
    }

    pub async fn selected(&self) -> Option<PropertyRecord> {
        self.state.lock().await.selected.clone()
    }

    async fn show(&self, mode: VisualizationMode) -> Result<CommandOutcome, AppError> {
        let mut state = self.state.lock().await;
        let markers = self.render(&mut state, mode).await;
        Ok(CommandOutcome::Render { markers })
    }

    async fn select(&self, owner: Option<String>, id: Option<FieldValue>) -> Result<CommandOutcome, AppError> {
        let owner = owner.map(|o| o.trim().to_string()).filter(|o| !o.is_empty());
        let id = id.and_then(|v| v.as_text().trim().parse::<i64>().ok());
        if owner.is_none() && id.is_none() {
            return Err(AppError::Validation(
                "Enter an owner or a record number to look up".to_string(),
            ));
        }

        let mut state = self.state.lock().await;
        let found = state.store.find_by_owner_or_id(owner.as_deref(), id).cloned();
        state.selected = found.clone();
        match found {
            Some(record) => {
                tracing::info!("Selected record {}", record.id);
                Ok(CommandOutcome::Selected { record })
            }
            None => Ok(CommandOutcome::NoMatch {
                message: "No record matches that owner or number".to_string(),
            }),
        }
    }

    async fn next_search_token(&self) -> SearchToken {
        self.state.lock().await.searches.issue()
    }

    async fn apply_search(
        &self,
        token: SearchToken,
        result: Result<SearchOutcome, AppError>,
    ) -> Result<CommandOutcome, AppError> {
        let mut state = self.state.lock().await;
        if !state.searches.is_current(token) {
            tracing::info!("Discarding stale search response {:?}", token);
            return Ok(CommandOutcome::Stale);
        }

        match result? {
            SearchOutcome::Empty => Ok(CommandOutcome::NoMatch {
                message: "No records matched the search".to_string(),
            }),
            SearchOutcome::Found { records, .. } => {
                let total = records.len();
                let summary = search_summary(&records);
                state.store.set_search_results(records);
                let markers = self.render(&mut state, VisualizationMode::SearchResult).await;
                Ok(CommandOutcome::SearchResults {
                    total,
                    summary,
                    markers,
                })
            }
        }
    }

    async fn render(&self, state: &mut RegistryState, mode: VisualizationMode) -> MarkerSet {
        state.current_view = Some(mode);
        let key = (mode, state.store.revision());
        if let Some(cached) = self.render_cache.get(&key).await {
            return cached;
        }

        let markers = self
            .engine
            .produce_markers(mode, state.store.records(), state.store.last_search());
        self.render_cache.insert(key, markers.clone()).await;
        markers
    }
}

/// Drops the selection if it still points at `id`; the user may have picked
/// another record while the mutation was in flight.
fn clear_selection_of(state: &mut RegistryState, id: i64) {
    if state.selected.as_ref().map(|r| r.id) == Some(id) {
        state.selected = None;
    }
}
