//==================================================================================================
// Configuration
//==================================================================================================
#![deny(clippy::all)]

//==================================================================================================
// Modules
//==================================================================================================
mod args;

//==================================================================================================
// Imports
//==================================================================================================
use anyhow::Result;
use args::Args;
use mmu_lib::{MemState, MemoryManager};
use session_lib::Session;
use log::{debug, info};
use tokio::runtime::Builder;

use rand::{
    Rng,
    SeedableRng,
    rngs::StdRng,
};

//==================================================================================================
// Functions
//==================================================================================================
/// Reproducible reference string of `length` pages in `0..page_table_size`.
fn random_sequence(length: usize, page_table_size: usize, seed: u64) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..length)
	.map(|_| rng.gen_range(0..page_table_size) as i64)
	.collect()
}

fn format_frames(state: &MemState) -> String {
    let slots: Vec<String> = state.frames
	.iter()
	.map(|slot| match slot {
	    Some(page) => page.to_string(),
	    None => "-".to_string(),
	})
	.collect();
    format!("[{}]", slots.join(" "))
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Args = Args::parse(std::env::args().collect())?;
    anyhow::ensure!(args.page_table_size() > 0, "page table size must be a positive integer");
    let sequence: Vec<i64> = match args.sequence() {
	Some(seq) => seq.to_vec(),
	None => random_sequence(args.random_length(), args.page_table_size(), args.seed()),
    };

    let mm = MemoryManager::new(
	args.page_table_size(),
	args.algorithm(),
	args.frame_count(),
	Some(sequence.clone()),
    )?;
    let session = Session::new(mm);

    let runtime = Builder::new_current_thread()
	.enable_all()
	.build()?;

    runtime.block_on(async {
	debug!("Replaying {} references", sequence.len());

	for &page in &sequence {
	    let state = session.access(page).await?;
	    if args.json() {
		println!("{}", serde_json::to_string(&state)?);
	    } else {
		println!(
		    "Page {} -> {} {}",
		    page,
		    if state.last_fault { "FAULT" } else { "HIT" },
		    format_frames(&state),
		);
	    }
	}

	let state = session.state().await;
	info!("{} finished: {} faults", state.algorithm, state.total_faults);
	if args.json() {
	    println!("{}", serde_json::to_string_pretty(&state)?);
	} else {
	    println!(
		"{},{},{},{},{:.2}",
		state.algorithm,
		state.frame_count,
		state.total_accesses,
		state.total_faults,
		state.hit_rate,
	    );
	}

	Ok::<(), anyhow::Error>(())
    })
}
