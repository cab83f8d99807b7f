//==================================================================================================
// Configuration
//==================================================================================================
#![deny(clippy::all)]

//==================================================================================================
// Imports
//==================================================================================================
use page_table_lib::{PageTable, PageTableError};
use replacement_lib::{Replacement, ReplacementError};
use log::debug;
use serde::Serialize;
use std::collections::{
    BTreeMap,
    BTreeSet,
    HashMap,
};
use thiserror::Error;

pub use replacement_lib::Algorithm;

//==================================================================================================
// Constants
//==================================================================================================
/// Number of logical pages in the simulated page table.
pub const PAGE_TABLE_SIZE: usize = 8;
/// Number of physical frames at startup.
pub const FRAME_COUNT: usize = 4;
/// Algorithm used at startup.
pub const DEFAULT_ALGORITHM: &str = "FIFO";

//==================================================================================================
// Enum
//==================================================================================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MemError {
    #[error("page {page} out of range (0..{})", .size.saturating_sub(1))]
    PageOutOfRange { page: i64, size: usize },

    #[error("frame_number must be a non-negative integer (got {0})")]
    InvalidFrame(i64),

    #[error("frame_count must be positive (got {0})")]
    InvalidFrameCount(i64),

    #[error("Unknown replacement algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("sequence must be list of integers: {0}")]
    InvalidSequence(String),

    #[error("page table size must be a positive integer")]
    InvalidPageTableSize,

    #[error("replacement policy didn't place page {page} into frames: {frames:?}")]
    PolicyInvariant { page: usize, frames: Vec<Option<usize>> },
}

/// Outcome of a single page reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessResult {
    Hit,
    Fault,
}

//==================================================================================================
// Structures
//==================================================================================================
/// Snapshot of the whole engine, as reported after every operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemState {
    pub algorithm	: String,
    /// page -> 1 if loaded, 0 otherwise
    pub page_table	: BTreeMap<usize, u8>,
    pub frames		: Vec<Option<usize>>,
    pub frame_occupancy	: Vec<u8>,
    pub last_fault	: bool,
    pub total_accesses	: u64,
    pub total_faults	: u64,
    pub hit_rate	: f64,
    pub frame_count	: usize,
}

/// Ties the page table to a replacement policy and keeps the access statistics.
#[derive(Debug, Clone)]
pub struct MemoryManager {
    page_table		: PageTable,
    replacement		: Replacement,
    frame_count		: usize,
    /// page -> frame slot, always rebuilt from the policy's frames
    frame_map		: HashMap<usize, usize>,
    last_fault		: bool,
    total_accesses	: u64,
    total_faults	: u64,
}

//==================================================================================================
// Implementations
//==================================================================================================
impl MemError {
    /// True for errors caused by caller input. Those never mutate the engine.
    pub fn is_validation(&self) -> bool {
	!matches!(self, MemError::PolicyInvariant { .. })
    }
}

impl From<PageTableError> for MemError {
    fn from(e: PageTableError) -> Self {
	match e {
	    PageTableError::InvalidSize => MemError::InvalidPageTableSize,
	    PageTableError::OutOfRange { page, size } => MemError::PageOutOfRange { page, size },
	    PageTableError::InvalidFrame(frame) => MemError::InvalidFrame(frame),
	}
    }
}

impl From<ReplacementError> for MemError {
    fn from(e: ReplacementError) -> Self {
	match e {
	    ReplacementError::UnknownAlgorithm(name) => MemError::UnknownAlgorithm(name),
	    ReplacementError::InvalidFrameCount(count) => {
		MemError::InvalidFrameCount(i64::try_from(count).unwrap_or(i64::MAX))
	    }
	}
    }
}

impl AccessResult {
    pub fn is_fault(&self) -> bool {
	matches!(self, AccessResult::Fault)
    }
}

impl MemoryManager {
    /// Creates a new memory manager.
    ///
    /// # Arguments
    /// * `page_table_size` - Number of logical pages;
    /// * `algorithm_name`  - One of `FIFO`, `LRU`, `MRU`, `OPTIMAL` (any case);
    /// * `frame_count`     - Number of physical frames;
    /// * `reference`       - Future reference string for `OPTIMAL`;
    ///
    /// # Returns
    /// * A new `MemoryManager`, or a validation error.
    pub fn new(
	page_table_size	: usize,
	algorithm_name	: &str,
	frame_count	: i64,
	reference	: Option<Vec<i64>>,
    ) -> Result<Self, MemError> {
	let frame_count = Self::check_frame_count(frame_count)?;
	let replacement = Replacement::from_name(algorithm_name, frame_count, reference)?;
	let page_table = PageTable::new(page_table_size)?;
	debug!(
	    "[MMU] Creating MMU ({} pages, {} frames, {})",
	    page_table_size,
	    frame_count,
	    replacement.algorithm(),
	);

	Ok(Self {
	    page_table,
	    replacement,
	    frame_count,
	    frame_map: HashMap::new(),
	    last_fault: false,
	    total_accesses: 0,
	    total_faults: 0,
	})
    }

    fn check_frame_count(frame_count: i64) -> Result<usize, MemError> {
	match usize::try_from(frame_count) {
	    Ok(count) if count > 0 => Ok(count),
	    _ => Err(MemError::InvalidFrameCount(frame_count)),
	}
    }

    pub fn algorithm(&self) -> Algorithm {
	self.replacement.algorithm()
    }

    pub fn algorithm_name(&self) -> &'static str {
	self.replacement.algorithm().name()
    }

    pub fn frame_count(&self) -> usize {
	self.frame_count
    }

    pub fn page_table(&self) -> &PageTable {
	&self.page_table
    }

    pub fn last_fault(&self) -> bool {
	self.last_fault
    }

    pub fn total_accesses(&self) -> u64 {
	self.total_accesses
    }

    pub fn total_faults(&self) -> u64 {
	self.total_faults
    }

    /// Checks that `page` addresses the page table.
    pub fn validate_page(&self, page: i64) -> Result<usize, MemError> {
	match usize::try_from(page) {
	    Ok(idx) if idx < self.page_table.size() => Ok(idx),
	    _ => Err(MemError::PageOutOfRange { page, size: self.page_table.size() }),
	}
    }

    /// Swaps in a fresh policy and clears all occupancy and counters.
    ///
    /// Nothing is changed if the name or the frame count is rejected.
    pub fn set_algorithm(
	&mut self,
	algorithm_name	: &str,
	frame_count	: Option<i64>,
	reference	: Option<Vec<i64>>,
    ) -> Result<(), MemError> {
	let frame_count = match frame_count {
	    Some(count) => Self::check_frame_count(count)?,
	    None => self.frame_count,
	};
	let replacement = Replacement::from_name(algorithm_name, frame_count, reference)?;
	debug!(
	    "[MMU] Switching to {} with {} frames",
	    replacement.algorithm(),
	    frame_count,
	);

	self.replacement = replacement;
	self.frame_count = frame_count;
	self.frame_map.clear();
	self.page_table.clear();
	self.last_fault = false;
	self.total_accesses = 0;
	self.total_faults = 0;

	Ok(())
    }

    /// Clears occupancy and counters, keeping the algorithm and frame count.
    pub fn reset(&mut self) {
	debug!("[MMU] Reset");
	self.frame_map.clear();
	self.page_table.clear();
	self.replacement.reset();
	self.last_fault = false;
	self.total_accesses = 0;
	self.total_faults = 0;
    }

    /// The policy's frames, forced to exactly `frame_count` slots.
    fn snapshot_frames(&self) -> Vec<Option<usize>> {
	let mut frames = self.replacement.get_frames();
	frames.resize(self.frame_count, None);
	frames
    }

    /// References `page`, faulting it in if needed.
    pub fn access_page(&mut self, page: i64) -> Result<MemState, MemError> {
	self.reference(page)?;
	Ok(self.get_state())
    }

    /// Same as `access_page`, without building a state snapshot.
    pub fn reference(&mut self, page: i64) -> Result<AccessResult, MemError> {
	let page = self.validate_page(page)?;
	self.total_accesses += 1;
	self.last_fault = false;

	if self.page_table.is_loaded(page as i64) {
	    self.replacement.access(page);
	    let frames = self.snapshot_frames();
	    self.sync_frames(&frames)?;
	    debug!("[MMU] Hit on page {}", page);
	    return Ok(AccessResult::Hit);
	}

	self.last_fault = true;
	self.total_faults += 1;
	debug!("[MMU] Page fault on page {}", page);

	let evicted = self.replacement.replace(page);
	let frames = self.snapshot_frames();

	// The snapshot is the ground truth: anything that was resident and is no longer in it
	// was evicted, reported or not.
	let resident: BTreeSet<usize> = frames.iter().flatten().copied().collect();
	let mut evicted_pages: BTreeSet<usize> = evicted.into_iter().collect();
	evicted_pages.extend(
	    self.frame_map
		.keys()
		.filter(|p| !resident.contains(*p))
		.copied(),
	);

	for victim in evicted_pages {
	    if self.page_table.is_loaded(victim as i64) {
		debug!("[MMU] Unloading page {}", victim);
		self.page_table.unload_page(victim as i64)?;
	    }
	    self.frame_map.remove(&victim);
	}

	let frame_number = frames
	    .iter()
	    .position(|slot| *slot == Some(page))
	    .ok_or_else(|| MemError::PolicyInvariant { page, frames: frames.clone() })?;

	self.page_table.load_page(page as i64, frame_number as i64)?;
	self.frame_map.insert(page, frame_number);
	self.sync_frames(&frames)?;

	Ok(AccessResult::Fault)
    }

    /// Points every resident page's table entry at the slot it occupies in `frames`.
    ///
    /// Policies shift pages between slots (FIFO/LRU/MRU pop from the head, LRU/MRU move hits to
    /// the tail), loaded bits never change here.
    fn sync_frames(&mut self, frames: &[Option<usize>]) -> Result<(), MemError> {
	for (slot, occupant) in frames.iter().enumerate() {
	    if let Some(p) = occupant {
		if self.page_table.get_frame(*p as i64)? != Some(slot) {
		    self.page_table.load_page(*p as i64, slot as i64)?;
		    self.frame_map.insert(*p, slot);
		}
	    }
	}

	Ok(())
    }

    /// Rebuilds the page -> frame index from the policy and reports the whole state.
    pub fn get_state(&mut self) -> MemState {
	let frames = self.snapshot_frames();

	self.frame_map = frames
	    .iter()
	    .enumerate()
	    .filter_map(|(idx, slot)| slot.map(|p| (p, idx)))
	    .collect();

	let page_table = (0..self.page_table.size())
	    .map(|p| (p, u8::from(self.page_table.is_loaded(p as i64))))
	    .collect();
	let frame_occupancy = frames.iter().map(|slot| u8::from(slot.is_some())).collect();

	MemState {
	    algorithm: self.algorithm_name().to_string(),
	    page_table,
	    frames,
	    frame_occupancy,
	    last_fault: self.last_fault,
	    total_accesses: self.total_accesses,
	    total_faults: self.total_faults,
	    hit_rate: hit_rate(self.total_accesses, self.total_faults),
	    frame_count: self.frame_count,
	}
    }
}

/// Percentage of hits, rounded to two decimals. `0.0` before the first access.
pub fn hit_rate(accesses: u64, faults: u64) -> f64 {
    if accesses == 0 {
	return 0.0;
    }
    let rate = (accesses - faults) as f64 / accesses as f64 * 100.0;
    round_cents(rate)
}

/// Rounds a non-negative `value` to two decimals, half to even, deciding on the exact binary
/// value rather than on `value * 100.0` (which may itself be rounded).
fn round_cents(value: f64) -> f64 {
    let bits = value.to_bits();
    let exp_bits = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exponent) = if exp_bits == 0 {
	(fraction, -1074)
    } else {
	(fraction | (1u64 << 52), exp_bits - 1075)
    };

    // value * 100 == scaled * 2^exponent
    let scaled = u128::from(mantissa) * 100;
    let cents: u128 = if exponent >= 0 {
	scaled << exponent
    } else {
	let shift = exponent.unsigned_abs();
	if shift >= 128 {
	    0
	} else {
	    let quotient = scaled >> shift;
	    let remainder = scaled & ((1u128 << shift) - 1);
	    let half = 1u128 << (shift - 1);
	    if remainder > half || (remainder == half && quotient & 1 == 1) {
		quotient + 1
	    } else {
		quotient
	    }
	}
    };

    cents as f64 / 100.0
}

//==================================================================================================
// Tests
//==================================================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn manager(algorithm: &str, frames: i64) -> MemoryManager {
	MemoryManager::new(PAGE_TABLE_SIZE, algorithm, frames, None).unwrap()
    }

    fn loaded_pages(state: &MemState) -> Vec<usize> {
	state.page_table.iter().filter(|(_, v)| **v == 1).map(|(p, _)| *p).collect()
    }

    fn resident_pages(state: &MemState) -> Vec<usize> {
	let mut pages: Vec<usize> = state.frames.iter().flatten().copied().collect();
	pages.sort_unstable();
	pages
    }

    fn assert_consistent(mm: &mut MemoryManager) {
	let state = mm.get_state();
	assert_eq!(loaded_pages(&state), resident_pages(&state));
	for (slot, page) in state.frames.iter().enumerate() {
	    if let Some(p) = page {
		assert_eq!(mm.page_table().get_frame(*p as i64).unwrap(), Some(slot));
	    }
	}
    }

    #[test]
    fn initial_state() {
	let mut mm = manager("fifo", 4);
	let state = mm.get_state();

	assert_eq!(state.algorithm, "FIFO");
	assert_eq!(state.frames, vec![None; 4]);
	assert_eq!(state.frame_occupancy, vec![0; 4]);
	assert_eq!(state.page_table.len(), PAGE_TABLE_SIZE);
	assert_eq!(state.total_accesses, 0);
	assert_eq!(state.hit_rate, 0.0);
	assert!(!state.last_fault);
    }

    #[test]
    fn constructor_validation() {
	assert_eq!(
	    MemoryManager::new(8, "LFU", 3, None).unwrap_err(),
	    MemError::UnknownAlgorithm("LFU".to_string())
	);
	assert_eq!(
	    MemoryManager::new(8, "LRU", 0, None).unwrap_err(),
	    MemError::InvalidFrameCount(0)
	);
	assert_eq!(
	    MemoryManager::new(0, "LRU", 2, None).unwrap_err(),
	    MemError::InvalidPageTableSize
	);
    }

    #[test]
    fn out_of_range_access_mutates_nothing() {
	let mut mm = manager("FIFO", 3);
	mm.access_page(1).unwrap();
	let before = mm.get_state();

	let err = mm.access_page(8).unwrap_err();
	assert_eq!(err, MemError::PageOutOfRange { page: 8, size: 8 });
	assert!(err.is_validation());
	assert!(matches!(mm.access_page(-1), Err(MemError::PageOutOfRange { .. })));

	assert_eq!(mm.get_state(), before);
    }

    #[test]
    fn fifo_evicts_oldest() {
	let mut mm = manager("FIFO", 3);
	for page in [0, 1, 2] {
	    assert!(mm.access_page(page).unwrap().last_fault);
	}
	let state = mm.access_page(3).unwrap();

	assert!(state.last_fault);
	assert_eq!(state.total_faults, 4);
	assert_eq!(state.frames, vec![Some(1), Some(2), Some(3)]);
	assert_eq!(state.page_table[&0], 0);
	assert_eq!(state.page_table[&3], 1);
	assert_consistent(&mut mm);
    }

    #[test]
    fn lru_hit_protects_page() {
	let mut mm = manager("LRU", 3);
	for page in [0, 1, 2, 0, 3] {
	    mm.access_page(page).unwrap();
	}
	let state = mm.get_state();

	assert_eq!(state.total_faults, 4);
	assert_eq!(state.page_table[&1], 0);
	assert_eq!(state.page_table[&0], 1);
	assert_eq!(resident_pages(&state), vec![0, 2, 3]);
	assert_consistent(&mut mm);
    }

    #[test]
    fn mru_evicts_recently_hit_page() {
	let mut mm = manager("MRU", 3);
	for page in [0, 1, 2, 0, 3] {
	    mm.access_page(page).unwrap();
	}
	let state = mm.get_state();

	assert_eq!(state.page_table[&0], 0);
	assert_eq!(resident_pages(&state), vec![1, 2, 3]);
	assert_consistent(&mut mm);
    }

    #[test]
    fn optimal_uses_reference_string() {
	let reference = vec![0, 1, 2, 3, 0, 1];
	let mut mm = MemoryManager::new(PAGE_TABLE_SIZE, "optimal", 3, Some(reference.clone())).unwrap();
	for page in &reference[..4] {
	    mm.access_page(*page).unwrap();
	}
	let state = mm.get_state();
	assert_eq!(state.frames, vec![Some(0), Some(1), Some(3)]);
	assert_eq!(state.page_table[&2], 0);

	let state = mm.access_page(0).unwrap();
	assert!(!state.last_fault);
	let state = mm.access_page(1).unwrap();
	assert!(!state.last_fault);
	assert_eq!(state.total_faults, 4);
	assert_consistent(&mut mm);
    }

    #[test]
    fn hit_changes_no_fault_state() {
	for algorithm in ["FIFO", "LRU", "MRU", "OPTIMAL"] {
	    let mut mm = manager(algorithm, 2);
	    mm.access_page(4).unwrap();
	    mm.access_page(5).unwrap();
	    let before = mm.get_state();

	    let after = mm.access_page(4).unwrap();
	    assert!(!after.last_fault);
	    assert_eq!(after.total_faults, before.total_faults);
	    assert_eq!(after.page_table, before.page_table);
	    assert_eq!(after.total_accesses, before.total_accesses + 1);
	}
    }

    #[test]
    fn hits_keep_table_on_current_slot() {
	for algorithm in ["LRU", "MRU"] {
	    let mut mm = manager(algorithm, 3);
	    for page in [0, 1, 2] {
		mm.access_page(page).unwrap();
	    }
	    let before = mm.get_state();

	    let state = mm.access_page(0).unwrap();
	    assert_eq!(state.frames, vec![Some(1), Some(2), Some(0)]);
	    assert_eq!(mm.page_table().get_frame(0).unwrap(), Some(2));
	    assert_eq!(mm.page_table().get_frame(1).unwrap(), Some(0));
	    assert_eq!(mm.page_table().get_frame(2).unwrap(), Some(1));
	    assert_eq!(state.page_table, before.page_table);
	    assert_eq!(state.total_faults, before.total_faults);
	    assert_consistent(&mut mm);
	}
    }

    #[test]
    fn frames_always_match_frame_count() {
	for algorithm in ["FIFO", "LRU", "MRU", "OPTIMAL"] {
	    let mut mm = manager(algorithm, 3);
	    for page in [7, 0, 1, 2, 0, 3, 0, 4, 2, 3, 0, 3, 2] {
		let state = mm.access_page(page).unwrap();
		assert_eq!(state.frames.len(), 3);
		assert_eq!(state.frame_occupancy.len(), 3);
	    }
	    assert_consistent(&mut mm);
	}
    }

    #[test]
    fn hit_rate_is_rounded() {
	assert_eq!(hit_rate(0, 0), 0.0);
	assert_eq!(hit_rate(3, 1), 66.67);
	assert_eq!(hit_rate(4, 4), 0.0);
	assert_eq!(hit_rate(8, 2), 75.0);
	// exact ties go to the even cent
	assert_eq!(hit_rate(32, 3), 90.62);
	assert_eq!(hit_rate(32, 29), 9.38);
	assert_eq!(hit_rate(16, 1), 93.75);

	let mut mm = manager("FIFO", 2);
	for page in [0, 1, 0] {
	    mm.access_page(page).unwrap();
	}
	assert_eq!(mm.get_state().hit_rate, 33.33);
    }

    #[test]
    fn set_algorithm_clears_everything() {
	let mut mm = manager("FIFO", 3);
	for page in [0, 1, 2, 0] {
	    mm.access_page(page).unwrap();
	}

	mm.set_algorithm("lru", Some(2), None).unwrap();
	let state = mm.get_state();

	assert_eq!(state.algorithm, "LRU");
	assert_eq!(state.frame_count, 2);
	assert_eq!(state.frames, vec![None, None]);
	assert!(loaded_pages(&state).is_empty());
	assert_eq!(state.total_accesses, 0);
	assert_eq!(state.total_faults, 0);
	assert!(!state.last_fault);
    }

    #[test]
    fn set_algorithm_keeps_frame_count_by_default() {
	let mut mm = manager("FIFO", 3);
	mm.set_algorithm("MRU", None, None).unwrap();
	assert_eq!(mm.frame_count(), 3);
	assert_eq!(mm.algorithm(), Algorithm::Mru);
    }

    #[test]
    fn rejected_set_algorithm_changes_nothing() {
	let mut mm = manager("FIFO", 3);
	mm.access_page(2).unwrap();
	let before = mm.get_state();

	assert_eq!(
	    mm.set_algorithm("CLOCK", Some(5), None).unwrap_err(),
	    MemError::UnknownAlgorithm("CLOCK".to_string())
	);
	assert_eq!(
	    mm.set_algorithm("LRU", Some(-2), None).unwrap_err(),
	    MemError::InvalidFrameCount(-2)
	);
	assert_eq!(mm.get_state(), before);
    }

    #[test]
    fn reset_is_idempotent() {
	let mut mm = manager("LRU", 3);
	for page in [0, 1, 2, 3] {
	    mm.access_page(page).unwrap();
	}

	mm.reset();
	let once = mm.get_state();
	mm.reset();
	let twice = mm.get_state();

	assert_eq!(once, twice);
	assert_eq!(once.algorithm, "LRU");
	assert_eq!(once.frame_count, 3);
	assert_eq!(once.frames, vec![None; 3]);
	assert_eq!(once.total_accesses, 0);
    }

    #[test]
    fn replay_is_deterministic() {
	let sequence = [1, 2, 3, 4, 1, 2, 5, 1, 2, 3, 4, 5];
	for algorithm in ["FIFO", "LRU", "MRU", "OPTIMAL"] {
	    let reference: Vec<i64> = sequence.to_vec();
	    let mut first = MemoryManager::new(8, algorithm, 3, Some(reference.clone())).unwrap();
	    let mut second = MemoryManager::new(8, algorithm, 3, Some(reference)).unwrap();
	    for page in sequence {
		first.access_page(page).unwrap();
		second.access_page(page).unwrap();
	    }
	    assert_eq!(first.get_state(), second.get_state());
	}
    }

    #[test]
    fn belady_sequence_fault_counts() {
	let sequence = [1, 2, 3, 4, 1, 2, 5, 1, 2, 3, 4, 5];
	let expected = [("FIFO", 9), ("LRU", 10), ("MRU", 7), ("OPTIMAL", 7)];
	for (algorithm, faults) in expected {
	    let mut mm = MemoryManager::new(8, algorithm, 3, Some(sequence.to_vec())).unwrap();
	    for page in sequence {
		mm.access_page(page).unwrap();
	    }
	    assert_eq!(mm.total_faults(), faults, "{}", algorithm);
	}
    }

    #[test]
    fn policy_invariant_is_not_validation() {
	let err = MemError::PolicyInvariant { page: 3, frames: vec![Some(1), None] };
	assert!(!err.is_validation());
	assert!(err.to_string().contains("didn't place page 3"));
    }

    #[test]
    fn state_serializes_with_original_keys() {
	let mut mm = manager("FIFO", 2);
	let state = mm.access_page(1).unwrap();
	let json = serde_json::to_value(&state).unwrap();

	assert_eq!(json["algorithm"], "FIFO");
	assert_eq!(json["frames"], serde_json::json!([1, null]));
	assert_eq!(json["page_table"]["1"], 1);
	assert_eq!(json["frame_occupancy"], serde_json::json!([1, 0]));
	assert_eq!(json["last_fault"], true);
	assert_eq!(json["hit_rate"], 0.0);
    }
}
