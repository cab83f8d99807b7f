//==================================================================================================
// Configuration
//==================================================================================================
#![deny(clippy::all)]

//==================================================================================================
// Imports
//==================================================================================================
use log::debug;
use std::{
    collections::VecDeque,
    fmt,
    str::FromStr,
};
use thiserror::Error;

//==================================================================================================
// Enum
//==================================================================================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplacementError {
    #[error("Unknown replacement algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("frame_count must be positive (got {0})")]
    InvalidFrameCount(usize),
}

/// The known replacement algorithms, addressed by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Fifo,
    Lru,
    Mru,
    Optimal,
}

/// Page replacement policy state machines.
///
/// Every variant tracks which pages occupy its `frame_count` frames and in which order they should
/// be evicted. A policy never holds more than `frame_count` pages.
#[derive(Debug, Clone)]
pub enum Replacement {
    /// Insertion-ordered queue, head is the oldest page.
    Fifo {
	frame_count	: usize,
	queue		: VecDeque<usize>,
    },
    /// Recency order, head is the least recently used page.
    Lru {
	frame_count	: usize,
	usage		: VecDeque<usize>,
    },
    /// Same recency order as `Lru`, but the tail is evicted.
    Mru {
	frame_count	: usize,
	usage		: VecDeque<usize>,
    },
    /// Belady's algorithm, driven by the known future reference string.
    Optimal {
	frame_count	: usize,
	reference	: Vec<i64>,
	frames		: Vec<usize>,
	cursor		: usize,
    },
}

//==================================================================================================
// Implementations
//==================================================================================================
impl Algorithm {
    pub const ALL: [Algorithm; 4] = [Algorithm::Fifo, Algorithm::Lru, Algorithm::Mru, Algorithm::Optimal];

    pub fn name(&self) -> &'static str {
	match self {
	    Algorithm::Fifo => "FIFO",
	    Algorithm::Lru => "LRU",
	    Algorithm::Mru => "MRU",
	    Algorithm::Optimal => "OPTIMAL",
	}
    }
}

impl FromStr for Algorithm {
    type Err = ReplacementError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
	match name.trim().to_uppercase().as_str() {
	    "FIFO" => Ok(Algorithm::Fifo),
	    "LRU" => Ok(Algorithm::Lru),
	    "MRU" => Ok(Algorithm::Mru),
	    "OPTIMAL" => Ok(Algorithm::Optimal),
	    _ => Err(ReplacementError::UnknownAlgorithm(name.to_string())),
	}
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
	f.write_str(self.name())
    }
}

impl Replacement {
    /// Builds a fresh policy for `algorithm`.
    ///
    /// # Arguments
    /// * `algorithm`   - Which policy to build;
    /// * `frame_count` - Number of physical frames, must be positive;
    /// * `reference`   - Future reference string, only used by `Optimal`;
    pub fn new(
	algorithm	: Algorithm,
	frame_count	: usize,
	reference	: Option<Vec<i64>>,
    ) -> Result<Self, ReplacementError> {
	if frame_count == 0 {
	    return Err(ReplacementError::InvalidFrameCount(frame_count));
	}
	debug!("[REPLACEMENT] Creating {} policy with {} frames", algorithm, frame_count);

	let policy = match algorithm {
	    Algorithm::Fifo => Replacement::Fifo {
		frame_count,
		queue: VecDeque::with_capacity(frame_count),
	    },
	    Algorithm::Lru => Replacement::Lru {
		frame_count,
		usage: VecDeque::with_capacity(frame_count),
	    },
	    Algorithm::Mru => Replacement::Mru {
		frame_count,
		usage: VecDeque::with_capacity(frame_count),
	    },
	    Algorithm::Optimal => Replacement::Optimal {
		frame_count,
		reference: reference.unwrap_or_default(),
		frames: Vec::with_capacity(frame_count),
		cursor: 0,
	    },
	};

	Ok(policy)
    }

    /// Factory keyed by algorithm name (case-insensitive).
    pub fn from_name(
	name		: &str,
	frame_count	: usize,
	reference	: Option<Vec<i64>>,
    ) -> Result<Self, ReplacementError> {
	Self::new(name.parse()?, frame_count, reference)
    }

    pub fn algorithm(&self) -> Algorithm {
	match self {
	    Replacement::Fifo { .. } => Algorithm::Fifo,
	    Replacement::Lru { .. } => Algorithm::Lru,
	    Replacement::Mru { .. } => Algorithm::Mru,
	    Replacement::Optimal { .. } => Algorithm::Optimal,
	}
    }

    pub fn frame_count(&self) -> usize {
	match self {
	    Replacement::Fifo { frame_count, .. }
	    | Replacement::Lru { frame_count, .. }
	    | Replacement::Mru { frame_count, .. }
	    | Replacement::Optimal { frame_count, .. } => *frame_count,
	}
    }

    /// Makes `page` resident, returning the page evicted to make room for it (if any).
    ///
    /// A page that is already resident is left where it is and nothing is evicted.
    pub fn replace(&mut self, page: usize) -> Option<usize> {
	match self {
	    Replacement::Fifo { frame_count, queue } => {
		if queue.contains(&page) {
		    return None;
		}
		let evicted = if queue.len() >= *frame_count {
		    queue.pop_front()
		} else {
		    None
		};
		queue.push_back(page);
		if let Some(victim) = evicted {
		    debug!("[FIFO] Evicted page {} for page {}", victim, page);
		}
		evicted
	    }
	    Replacement::Lru { frame_count, usage } => {
		if usage.contains(&page) {
		    return None;
		}
		let evicted = if usage.len() >= *frame_count {
		    usage.pop_front()
		} else {
		    None
		};
		usage.push_back(page);
		if let Some(victim) = evicted {
		    debug!("[LRU] Evicted page {} for page {}", victim, page);
		}
		evicted
	    }
	    Replacement::Mru { frame_count, usage } => {
		if usage.contains(&page) {
		    return None;
		}
		let evicted = if usage.len() >= *frame_count {
		    usage.pop_back()
		} else {
		    None
		};
		usage.push_back(page);
		if let Some(victim) = evicted {
		    debug!("[MRU] Evicted page {} for page {}", victim, page);
		}
		evicted
	    }
	    Replacement::Optimal { frame_count, reference, frames, cursor } => {
		if frames.contains(&page) {
		    *cursor += 1;
		    return None;
		}
		let mut evicted = None;
		if frames.len() < *frame_count {
		    frames.push(page);
		} else if let Some(slot) = Self::furthest_slot(frames, reference, *cursor) {
		    debug!(
			"[OPTIMAL] Evicted page {} (slot {}) for page {} at position {}",
			frames[slot],
			slot,
			page,
			*cursor,
		    );
		    evicted = Some(std::mem::replace(&mut frames[slot], page));
		}
		*cursor += 1;
		evicted
	    }
	}
    }

    /// Picks the frame slot whose page is referenced furthest in the future, strictly after
    /// `cursor`. Pages that never recur count as infinitely far; ties go to the lowest slot.
    fn furthest_slot(frames: &[usize], reference: &[i64], cursor: usize) -> Option<usize> {
	let future = reference.get(cursor + 1..).unwrap_or(&[]);

	let mut victim: Option<(usize, usize)> = None;
	for (slot, &resident) in frames.iter().enumerate() {
	    let next_use = future
		.iter()
		.position(|&r| r == resident as i64)
		.unwrap_or(usize::MAX);
	    match victim {
		Some((_, furthest)) if next_use <= furthest => {}
		_ => victim = Some((slot, next_use)),
	    }
	}

	victim.map(|(slot, _)| slot)
    }

    /// Notifies the policy that a resident page was referenced again.
    pub fn access(&mut self, page: usize) {
	match self {
	    Replacement::Fifo { .. } => {}
	    Replacement::Lru { usage, .. } | Replacement::Mru { usage, .. } => {
		if let Some(pos) = usage.iter().position(|&p| p == page) {
		    usage.remove(pos);
		    usage.push_back(page);
		}
	    }
	    Replacement::Optimal { cursor, .. } => {
		*cursor += 1;
	    }
	}
    }

    /// Resident pages by frame slot, padded with empty slots up to `frame_count`.
    pub fn get_frames(&self) -> Vec<Option<usize>> {
	let frame_count = self.frame_count();
	let resident: Vec<usize> = match self {
	    Replacement::Fifo { queue, .. } => queue.iter().copied().collect(),
	    Replacement::Lru { usage, .. } | Replacement::Mru { usage, .. } => {
		usage.iter().copied().collect()
	    }
	    Replacement::Optimal { frames, .. } => frames.clone(),
	};

	let mut frames: Vec<Option<usize>> = resident.into_iter().map(Some).collect();
	frames.resize(frame_count, None);
	frames
    }

    pub fn reset(&mut self) {
	debug!("[REPLACEMENT] Resetting {} policy", self.algorithm());
	match self {
	    Replacement::Fifo { queue, .. } => queue.clear(),
	    Replacement::Lru { usage, .. } | Replacement::Mru { usage, .. } => usage.clear(),
	    Replacement::Optimal { frames, cursor, .. } => {
		frames.clear();
		*cursor = 0;
	    }
	}
    }
}
