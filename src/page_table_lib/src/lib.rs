//==================================================================================================
// Configuration
//==================================================================================================
#![deny(clippy::all)]

//==================================================================================================
// Imports
//==================================================================================================
use log::debug;
use thiserror::Error;

//==================================================================================================
// Enum
//==================================================================================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageTableError {
    #[error("page table size must be a positive integer")]
    InvalidSize,

    #[error("page {page} out of range (0..{})", .size.saturating_sub(1))]
    OutOfRange { page: i64, size: usize },

    #[error("frame_number must be a non-negative integer (got {0})")]
    InvalidFrame(i64),
}

//==================================================================================================
// Structures
//==================================================================================================
/// One row of the page table, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTableEntry {
    pub page: usize,
    pub frame_number: Option<usize>,
    pub present: bool,
}

/// Fixed-size mapping from page number to the frame currently holding it.
///
/// The table does not check that a frame is claimed by a single page; the memory manager owns
/// that invariant.
#[derive(Debug, Clone)]
pub struct PageTable {
    pt_size	: usize,
    pt_entries	: Vec<Option<usize>>,
}

//==================================================================================================
// Implementations
//==================================================================================================
impl PageTable {
    pub fn new(size: usize) -> Result<Self, PageTableError> {
	if size == 0 {
	    return Err(PageTableError::InvalidSize);
	}
	debug!("[PT] Creating page table with {} entries", size);

	Ok(Self {
	    pt_size: size,
	    pt_entries: vec![None; size],
	})
    }

    pub fn size(&self) -> usize {
	self.pt_size
    }

    fn index(&self, page: i64) -> Result<usize, PageTableError> {
	match usize::try_from(page) {
	    Ok(idx) if idx < self.pt_size => Ok(idx),
	    _ => Err(PageTableError::OutOfRange { page, size: self.pt_size }),
	}
    }

    /// True iff `page` is in range and has a frame assigned.
    pub fn is_loaded(&self, page: i64) -> bool {
	self.index(page)
	    .map(|idx| self.pt_entries[idx].is_some())
	    .unwrap_or(false)
    }

    pub fn get_frame(&self, page: i64) -> Result<Option<usize>, PageTableError> {
	let idx = self.index(page)?;
	Ok(self.pt_entries[idx])
    }

    pub fn load_page(&mut self, page: i64, frame_number: i64) -> Result<(), PageTableError> {
	let frame = usize::try_from(frame_number)
	    .map_err(|_| PageTableError::InvalidFrame(frame_number))?;
	let idx = self.index(page)?;
	self.pt_entries[idx] = Some(frame);

	Ok(())
    }

    pub fn unload_page(&mut self, page: i64) -> Result<(), PageTableError> {
	let idx = self.index(page)?;
	self.pt_entries[idx] = None;

	Ok(())
    }

    pub fn clear(&mut self) {
	self.pt_entries.iter_mut().for_each(|entry| *entry = None);
    }

    pub fn entries(&self) -> Vec<PageTableEntry> {
	self.pt_entries
	    .iter()
	    .enumerate()
	    .map(|(page, frame)| PageTableEntry {
		page,
		frame_number: *frame,
		present: frame.is_some(),
	    })
	    .collect()
    }
}
