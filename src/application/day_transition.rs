use crate::application::documents::DocumentStore;
use crate::domain::models::Document;
use crate::infrastructure::config::TransitionConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::store::{STORED_DATE_FORMAT, last_run_key};
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

const MAX_SLEEP: Duration = Duration::from_secs(15 * 60);
const MIN_SLEEP: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionTask {
    PromoteTomorrow,
    InstantiateRoutine,
}

impl TransitionTask {
    pub const ALL: [Self; 2] = [Self::PromoteTomorrow, Self::InstantiateRoutine];

    pub fn name(self) -> &'static str {
        match self {
            Self::PromoteTomorrow => "promoteTomorrow",
            Self::InstantiateRoutine => "instantiateRoutine",
        }
    }

    pub fn trigger(self, config: &TransitionConfig) -> NaiveTime {
        match self {
            Self::PromoteTomorrow => config.promote_at,
            Self::InstantiateRoutine => config.routine_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Promoted,
    NothingToPromote,
    PlannedToday,
    RoutineLoaded(Weekday),
    NoRoutine(Weekday),
    TomorrowKept(Weekday),
}

/// Whether a task should fire at `local`. Without catch-up a missed trigger
/// is skipped until the next day.
pub fn is_due(
    trigger: NaiveTime,
    local: NaiveDateTime,
    last_run: Option<NaiveDate>,
    catch_up: bool,
) -> bool {
    if last_run == Some(local.date()) {
        return false;
    }
    let time = local.time();
    if time < trigger {
        return false;
    }
    catch_up || time - trigger < chrono::Duration::minutes(1)
}

pub fn delay_until_next_trigger(now: DateTime<Tz>, trigger: NaiveTime) -> Duration {
    let today = now.date_naive();
    let candidate = if now.time() < trigger {
        Some(today)
    } else {
        today.checked_add_days(Days::new(1))
    };
    let next = candidate
        .map(|date| date.and_time(trigger))
        .and_then(|naive| now.timezone().from_local_datetime(&naive).earliest());
    let Some(next) = next else {
        return MAX_SLEEP;
    };
    (next - now)
        .to_std()
        .unwrap_or(Duration::ZERO)
        .clamp(MIN_SLEEP, MAX_SLEEP)
}

pub struct DayTransitionScheduler {
    documents: DocumentStore,
    config: TransitionConfig,
    timezone: Tz,
    now_provider: NowProvider,
}

impl DayTransitionScheduler {
    pub fn new(documents: DocumentStore, config: TransitionConfig, timezone: Tz) -> Self {
        Self {
            documents,
            config,
            timezone,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.documents = self
            .documents
            .clone()
            .with_clock(Arc::clone(&now_provider), self.timezone);
        self.now_provider = now_provider;
        self
    }

    pub fn local_now(&self) -> DateTime<Tz> {
        (self.now_provider)().with_timezone(&self.timezone)
    }

    pub async fn last_run(&self, task: TransitionTask) -> Result<Option<NaiveDate>, InfraError> {
        let key = last_run_key(task.name());
        let Some(raw) = self.documents.store().get(&key).await? else {
            return Ok(None);
        };
        match NaiveDate::parse_from_str(raw.trim(), STORED_DATE_FORMAT) {
            Ok(date) => Ok(Some(date)),
            Err(error) => {
                warn!(task = task.name(), value = %raw, error = %error, "ignoring malformed last-run marker");
                Ok(None)
            }
        }
    }

    /// Tomorrow's plan only replaces today when it was written before
    /// `today`; a plan written today is still meant for the next day.
    pub async fn promote_tomorrow(&self, today: NaiveDate) -> Result<TransitionOutcome, InfraError> {
        let _edits = self.documents.lock_edits().await;
        let Some(tomorrow) = self.documents.find(Document::Tomorrow).await? else {
            return Ok(TransitionOutcome::NothingToPromote);
        };
        let written_on = self.documents.tomorrow_written_on().await?;
        if written_on.is_some_and(|date| date >= today) {
            return Ok(TransitionOutcome::PlannedToday);
        }
        self.documents.save(Document::Today, &tomorrow).await?;
        self.documents.clear(Document::Tomorrow).await?;
        Ok(TransitionOutcome::Promoted)
    }

    pub async fn instantiate_routine(&self, today: NaiveDate) -> Result<TransitionOutcome, InfraError> {
        let weekday = today.succ_opt().unwrap_or(today).weekday();
        let _edits = self.documents.lock_edits().await;
        let Some(routine) = self.documents.find(Document::Routine(weekday)).await? else {
            return Ok(TransitionOutcome::NoRoutine(weekday));
        };
        if !self.config.overwrite_tomorrow {
            let planned = self
                .documents
                .find(Document::Tomorrow)
                .await?
                .is_some_and(|tomorrow| tomorrow.assigned_count() > 0);
            if planned {
                return Ok(TransitionOutcome::TomorrowKept(weekday));
            }
        }
        self.documents.save(Document::Tomorrow, &routine).await?;
        Ok(TransitionOutcome::RoutineLoaded(weekday))
    }

    pub async fn run_task(
        &self,
        task: TransitionTask,
        today: NaiveDate,
    ) -> Result<TransitionOutcome, InfraError> {
        let outcome = match task {
            TransitionTask::PromoteTomorrow => self.promote_tomorrow(today).await?,
            TransitionTask::InstantiateRoutine => self.instantiate_routine(today).await?,
        };
        self.documents
            .store()
            .set(
                &last_run_key(task.name()),
                &today.format(STORED_DATE_FORMAT).to_string(),
            )
            .await?;
        info!(task = task.name(), date = %today, outcome = ?outcome, "day transition applied");
        Ok(outcome)
    }

    pub async fn run_if_due(
        &self,
        task: TransitionTask,
        catch_up: bool,
    ) -> Result<Option<TransitionOutcome>, InfraError> {
        let local = self.local_now().naive_local();
        let last_run = self.last_run(task).await?;
        if !is_due(task.trigger(&self.config), local, last_run, catch_up) {
            return Ok(None);
        }
        self.run_task(task, local.date()).await.map(Some)
    }

    pub async fn run_due(
        &self,
        catch_up: bool,
    ) -> Result<Vec<(TransitionTask, TransitionOutcome)>, InfraError> {
        let mut tasks = TransitionTask::ALL;
        tasks.sort_by_key(|task| task.trigger(&self.config));
        let mut applied = Vec::new();
        for task in tasks {
            if let Some(outcome) = self.run_if_due(task, catch_up).await? {
                applied.push((task, outcome));
            }
        }
        Ok(applied)
    }

    pub async fn catch_up(&self) -> Result<Vec<(TransitionTask, TransitionOutcome)>, InfraError> {
        self.run_due(self.config.catch_up_on_start).await
    }

    pub fn next_delay(&self, task: TransitionTask) -> Duration {
        delay_until_next_trigger(self.local_now(), task.trigger(&self.config))
    }

    pub fn spawn(self: Arc<Self>) -> SchedulerHandle {
        let (shutdown, _) = watch::channel(false);
        let tasks = TransitionTask::ALL
            .into_iter()
            .map(|task| {
                let scheduler = Arc::clone(&self);
                let mut stop = shutdown.subscribe();
                tokio::spawn(async move {
                    loop {
                        let delay = scheduler.next_delay(task);
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            changed = stop.changed() => {
                                if changed.is_err() || *stop.borrow() {
                                    break;
                                }
                            }
                        }
                        if let Err(run_error) = scheduler
                            .run_if_due(task, scheduler.config.catch_up_on_start)
                            .await
                        {
                            error!(task = task.name(), error = %run_error, "day transition failed");
                        }
                    }
                })
            })
            .collect();
        info!(timezone = %self.timezone, "day transition scheduler started");
        SchedulerHandle { shutdown, tasks }
    }
}

pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub async fn shutdown(self) -> Result<(), InfraError> {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            task.await?;
        }
        Ok(())
    }
}
