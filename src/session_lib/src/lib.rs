//==================================================================================================
// Configuration
//==================================================================================================
#![deny(clippy::all)]

//==================================================================================================
// Imports
//==================================================================================================
use mmu_lib::{MemError, MemState, MemoryManager};
use process_lib::Process;

use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

//==================================================================================================
// Structures
//==================================================================================================
/// Answer to an algorithm switch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmChange {
    pub status		: &'static str,
    pub algorithm	: String,
    pub frame_count	: usize,
    pub state		: MemState,
}

/// Answer to a batch replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub total_faults	: usize,
    pub final_state	: MemState,
    pub sequence	: Vec<i64>,
}

/// Shared handle on one simulation, for hosts that serve several callers.
///
/// Every operation takes the lock for its whole duration, so page references from different
/// callers are applied one at a time and never interleave inside an access.
#[derive(Clone)]
pub struct Session {
    process	: Arc<Mutex<Process>>,
}

//==================================================================================================
// Implementations
//==================================================================================================
impl Session {
    pub fn new(memory_manager: MemoryManager) -> Self {
	debug!(
	    "[SESSION] Creating session ({}, {} frames)",
	    memory_manager.algorithm_name(),
	    memory_manager.frame_count(),
	);

	Self {
	    process: Arc::new(Mutex::new(Process::new(memory_manager))),
	}
    }

    /// Session with the startup defaults (`FIFO`, 8 pages, 4 frames).
    pub fn with_defaults() -> Result<Self, MemError> {
	let mm = MemoryManager::new(
	    mmu_lib::PAGE_TABLE_SIZE,
	    mmu_lib::DEFAULT_ALGORITHM,
	    mmu_lib::FRAME_COUNT as i64,
	    None,
	)?;
	Ok(Self::new(mm))
    }

    pub async fn state(&self) -> MemState {
	self.process.lock().await.memory_manager_mut().get_state()
    }

    pub async fn access(&self, page: i64) -> Result<MemState, MemError> {
	let mut process = self.process.lock().await;
	process.memory_manager_mut().access_page(page).inspect_err(|e| {
	    if !e.is_validation() {
		warn!("[SESSION] Internal error while accessing page {}: {}", page, e);
	    }
	})
    }

    pub async fn set_algorithm(
	&self,
	algorithm	: &str,
	frame_count	: Option<i64>,
	reference	: Option<Vec<i64>>,
    ) -> Result<AlgorithmChange, MemError> {
	let mut process = self.process.lock().await;
	let mm = process.memory_manager_mut();
	mm.set_algorithm(algorithm, frame_count, reference)?;

	Ok(AlgorithmChange {
	    status: "ok",
	    algorithm: mm.algorithm_name().to_string(),
	    frame_count: mm.frame_count(),
	    state: mm.get_state(),
	})
    }

    pub async fn simulate(&self, sequence: Vec<i64>) -> Result<SimulationReport, MemError> {
	let mut process = self.process.lock().await;
	let total_faults = process.simulate(&sequence, false)?;

	Ok(SimulationReport {
	    total_faults,
	    final_state: process.memory_manager_mut().get_state(),
	    sequence,
	})
    }

    pub async fn reset(&self) -> MemState {
	let mut process = self.process.lock().await;
	let mm = process.memory_manager_mut();
	mm.reset();
	mm.get_state()
    }
}
