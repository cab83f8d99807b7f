//==================================================================================================
// Configuration
//==================================================================================================
#![deny(clippy::all)]

//==================================================================================================
// Imports
//==================================================================================================
use mmu_lib::{MemError, MemoryManager};
use log::info;

//==================================================================================================
// Structures
//==================================================================================================
/// Replays page reference strings through a `MemoryManager`.
#[derive(Debug, Clone)]
pub struct Process
{
    /// The memory manager every reference goes through (private field)
    memory_manager	: MemoryManager,
    /// Last reference string replayed (private field)
    page_sequence	: Vec<i64>,
}

//==================================================================================================
// Implementations
//==================================================================================================
impl Process
{
    /// Creates a new Process instance.
    ///
    /// # Arguments
    /// * `memory_manager` - The manager that will serve every page reference;
    ///
    /// # Returns
    /// * A new `Process` instance
    pub fn new(memory_manager: MemoryManager) -> Self
    {
	Self {
	    memory_manager,
	    page_sequence: Vec::new(),
	}
    }

    /// Feeds every page of `sequence` through the memory manager, in order.
    ///
    /// # Arguments
    /// * `sequence`     - The page reference string;
    /// * `reset_before` - Reset the manager before the first reference;
    ///
    /// # Returns
    ///
    /// * `Ok(usize)`     - number of references that page faulted
    /// * `Err(MemError)` - if any page is out of range. The whole sequence is checked before the
    ///   first reference, so nothing is replayed in that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mmu_lib::MemoryManager;
    /// use process_lib::Process;
    ///
    /// let mm = MemoryManager::new(8, "FIFO", 3, None).unwrap();
    /// let mut process = Process::new(mm);
    /// let faults = process.simulate(&[0, 1, 2, 3], false).unwrap();
    /// assert_eq!(faults, 4);
    /// ```
    pub fn simulate(&mut self, sequence: &[i64], reset_before: bool) -> Result<usize, MemError>
    {
	for &page in sequence {
	    self.memory_manager.validate_page(page)?;
	}

	if reset_before {
	    self.memory_manager.reset();
	}
	self.page_sequence = sequence.to_vec();

	let mut faults = 0;
	for &page in sequence {
	    if self.memory_manager.reference(page)?.is_fault() {
		faults += 1;
	    }
	}
	info!(
	    "[PROCESS] {} faults over {} references ({})",
	    faults,
	    sequence.len(),
	    self.memory_manager.algorithm_name(),
	);

	Ok(faults)
    }

    pub fn page_sequence(&self) -> &[i64]
    {
	&self.page_sequence
    }

    pub fn memory_manager(&self) -> &MemoryManager
    {
	&self.memory_manager
    }

    pub fn memory_manager_mut(&mut self) -> &mut MemoryManager
    {
	&mut self.memory_manager
    }
}

/// Parses a reference string given as separate tokens (`["1", " 2", "3"]`).
///
/// Empty tokens are skipped; anything else that is not an integer rejects the whole input.
pub fn parse_sequence<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<i64>, MemError>
{
    tokens
	.iter()
	.map(|t| t.as_ref().trim())
	.filter(|t| !t.is_empty())
	.map(|t| t.parse::<i64>().map_err(|_| MemError::InvalidSequence(t.to_string())))
	.collect()
}

/// Parses a comma separated reference string (`"7,0,1,2"`).
pub fn parse_sequence_str(raw: &str) -> Result<Vec<i64>, MemError>
{
    let tokens: Vec<&str> = raw.split(',').collect();
    parse_sequence(&tokens)
}
