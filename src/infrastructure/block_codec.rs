use crate::domain::models::{
    BlockContent, BlockSequence, PriorityTag, ScheduleError, TimeBlock, block_id,
};
use crate::domain::priority::PriorityRegistry;
use crate::domain::time::TimeRange;
use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredBlock {
    #[serde(default)]
    pub id: String,
    pub time: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

pub fn encode_block(index: usize, block: &TimeBlock) -> StoredBlock {
    StoredBlock {
        id: block_id(index),
        time: block.range.to_string(),
        title: block.content.title.clone(),
        description: Some(block.content.description.clone()),
        priority: Some(block.content.priority.as_str().to_string()),
    }
}

pub fn decode_block(stored: &StoredBlock) -> Result<TimeBlock, InfraError> {
    let range = stored.time.parse::<TimeRange>()?;
    Ok(TimeBlock {
        range,
        content: BlockContent {
            title: stored.title.clone(),
            description: stored.description.clone().unwrap_or_default(),
            priority: stored
                .priority
                .as_deref()
                .map(PriorityTag::new)
                .unwrap_or_default(),
        },
    })
}

pub fn encode_sequence(sequence: &BlockSequence) -> Result<String, InfraError> {
    let stored = sequence
        .iter()
        .enumerate()
        .map(|(index, block)| encode_block(index, block))
        .collect::<Vec<_>>();
    Ok(serde_json::to_string(&stored)?)
}

pub fn decode_sequence(raw: &str) -> Result<BlockSequence, InfraError> {
    let stored: Vec<StoredBlock> = serde_json::from_str(raw)?;
    let blocks = stored
        .iter()
        .map(decode_block)
        .collect::<Result<Vec<_>, _>>()?;
    if blocks.is_empty() {
        return Err(InfraError::Schedule(ScheduleError::InvalidRange(
            "stored sequence has no blocks".to_string(),
        )));
    }
    Ok(BlockSequence::from_blocks(blocks)?)
}

pub fn encode_priorities(registry: &PriorityRegistry) -> Result<String, InfraError> {
    Ok(serde_json::to_string(registry)?)
}

pub fn decode_priorities(raw: &str) -> Result<PriorityRegistry, InfraError> {
    let registry: PriorityRegistry = serde_json::from_str(raw)?;
    registry
        .validate()
        .map_err(|error| InfraError::Schedule(ScheduleError::InvalidPriority(error)))?;
    Ok(registry)
}
