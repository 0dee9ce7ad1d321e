use crate::application::day_transition::NowProvider;
use crate::application::events::DocumentEvents;
use crate::domain::generator::generate_for;
use crate::domain::models::{BlockSequence, Document, ScheduleConfig};
use crate::domain::priority::PriorityRegistry;
use crate::infrastructure::block_codec::{
    decode_priorities, decode_sequence, encode_priorities, encode_sequence,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::store::{
    CUSTOM_PRIORITIES_KEY, KeyValueStore, STORED_DATE_FORMAT, TOMORROW_WRITTEN_ON_KEY,
    document_key,
};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;

#[derive(Clone)]
pub struct DocumentStore {
    store: Arc<dyn KeyValueStore>,
    events: DocumentEvents,
    edits: Arc<Mutex<()>>,
    now_provider: NowProvider,
    timezone: Tz,
}

impl DocumentStore {
    pub fn new(store: Arc<dyn KeyValueStore>, events: DocumentEvents) -> Self {
        Self {
            store,
            events,
            edits: Arc::new(Mutex::new(())),
            now_provider: Arc::new(Utc::now),
            timezone: chrono_tz::UTC,
        }
    }

    pub fn with_clock(mut self, now_provider: NowProvider, timezone: Tz) -> Self {
        self.now_provider = now_provider;
        self.timezone = timezone;
        self
    }

    /// Held from the first read to the last write of any document edit.
    pub async fn lock_edits(&self) -> MutexGuard<'_, ()> {
        self.edits.lock().await
    }

    pub fn local_today(&self) -> NaiveDate {
        (self.now_provider)().with_timezone(&self.timezone).date_naive()
    }

    pub fn events(&self) -> &DocumentEvents {
        &self.events
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub async fn find(&self, document: Document) -> Result<Option<BlockSequence>, InfraError> {
        let key = document_key(document);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };
        match decode_sequence(&raw) {
            Ok(sequence) => Ok(Some(sequence)),
            Err(error) => {
                warn!(%document, key = %key, error = %error, "ignoring malformed stored sequence");
                Ok(None)
            }
        }
    }

    pub async fn load_or_generate(
        &self,
        document: Document,
        schedule: &ScheduleConfig,
    ) -> Result<BlockSequence, InfraError> {
        if let Some(sequence) = self.find(document).await? {
            return Ok(sequence);
        }
        let sequence = generate_for(schedule);
        self.save(document, &sequence).await?;
        Ok(sequence)
    }

    pub async fn save(&self, document: Document, sequence: &BlockSequence) -> Result<(), InfraError> {
        let encoded = encode_sequence(sequence)?;
        self.store.set(&document_key(document), &encoded).await?;
        if document == Document::Tomorrow {
            let written_on = self.local_today().format(STORED_DATE_FORMAT).to_string();
            self.store.set(TOMORROW_WRITTEN_ON_KEY, &written_on).await?;
        }
        self.events.publish(document);
        Ok(())
    }

    pub async fn clear(&self, document: Document) -> Result<(), InfraError> {
        self.store.remove(&document_key(document)).await?;
        if document == Document::Tomorrow {
            self.store.remove(TOMORROW_WRITTEN_ON_KEY).await?;
        }
        self.events.publish(document);
        Ok(())
    }

    pub async fn tomorrow_written_on(&self) -> Result<Option<NaiveDate>, InfraError> {
        let Some(raw) = self.store.get(TOMORROW_WRITTEN_ON_KEY).await? else {
            return Ok(None);
        };
        match NaiveDate::parse_from_str(raw.trim(), STORED_DATE_FORMAT) {
            Ok(date) => Ok(Some(date)),
            Err(error) => {
                warn!(value = %raw, error = %error, "ignoring malformed tomorrow write date");
                Ok(None)
            }
        }
    }

    pub async fn load_priorities(&self) -> Result<PriorityRegistry, InfraError> {
        let Some(raw) = self.store.get(CUSTOM_PRIORITIES_KEY).await? else {
            return Ok(PriorityRegistry::default());
        };
        match decode_priorities(&raw) {
            Ok(registry) => Ok(registry),
            Err(error) => {
                warn!(error = %error, "ignoring malformed priority registry");
                Ok(PriorityRegistry::default())
            }
        }
    }

    pub async fn save_priorities(&self, registry: &PriorityRegistry) -> Result<(), InfraError> {
        let encoded = encode_priorities(registry)?;
        self.store.set(CUSTOM_PRIORITIES_KEY, &encoded).await
    }
}
