//==================================================================================================
// Structures
//==================================================================================================
use ::anyhow::Result;
use process_lib::parse_sequence_str;

pub struct Args{
    /// Number of logical pages in the page table
    page_table_size: usize,
    /// Number of physical frames
    frame_count: i64,
    /// Replacement algorithm (FIFO, LRU, MRU, OPTIMAL)
    algorithm: String,
    /// Reference string given on the command line
    sequence: Option<Vec<i64>>,
    /// Length of a random reference string, when no sequence is given
    random: usize,
    /// Seed of the random reference string
    seed: u64,
    /// Print snapshots as JSON
    json: bool,
}

//==================================================================================================
// Implementation
//==================================================================================================
impl Args {
    const OPT_HELP: &'static str = "--help";
    const OPT_PAGE_TABLE_SIZE: &'static str = "--page_table_size";
    const OPT_FRAMES: &'static str = "--frames";
    const OPT_ALGORITHM: &'static str = "--algorithm";
    const OPT_SEQUENCE: &'static str = "--sequence";
    const OPT_RANDOM: &'static str = "--random";
    const OPT_SEED: &'static str = "--seed";
    const OPT_JSON: &'static str = "--json";

    pub fn parse(args: Vec<String>) -> Result<Self> {
	let mut page_table_size: usize = mmu_lib::PAGE_TABLE_SIZE;
	let mut frame_count: i64 = mmu_lib::FRAME_COUNT as i64;
	let mut algorithm: String = mmu_lib::DEFAULT_ALGORITHM.to_string();
	let mut sequence: Option<Vec<i64>> = None;
	let mut random: usize = 20;
	let mut seed: u64 = 1;
	let mut json: bool = false;

	let program_name = args.first().map(String::as_str).unwrap_or("v_sim");
	let mut i: usize = 1;
	while i < args.len() {
	    match args[i].as_str() {
		Self::OPT_HELP => {
		    Self::usage(program_name);
		    return Err(anyhow::anyhow!("wrong usage"));
		}
		Self::OPT_PAGE_TABLE_SIZE => {
		    page_table_size = Self::value(&args, &mut i)?.parse::<usize>()?;
		},
		Self::OPT_FRAMES => {
		    frame_count = Self::value(&args, &mut i)?.parse::<i64>()?;
		},
		Self::OPT_ALGORITHM => {
		    algorithm = Self::value(&args, &mut i)?.to_string();
		}
		Self::OPT_SEQUENCE => {
		    sequence = Some(parse_sequence_str(Self::value(&args, &mut i)?)?);
		}
		Self::OPT_RANDOM => {
		    random = Self::value(&args, &mut i)?.parse::<usize>()?;
		}
		Self::OPT_SEED => {
		    seed = Self::value(&args, &mut i)?.parse::<u64>()?;
		}
		Self::OPT_JSON => {
		    json = true;
		}
		other => {
		    return Err(anyhow::anyhow!("invalid argument: {}", other));
		}
	    }

	    i += 1;
	}

	Ok(Self {
	    page_table_size,
	    frame_count,
	    algorithm,
	    sequence,
	    random,
	    seed,
	    json,
	})
    }

    fn value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str> {
	let option = &args[*i];
	*i += 1;
	args.get(*i)
	    .map(String::as_str)
	    .ok_or_else(|| anyhow::anyhow!("missing value for {}", option))
    }

    pub fn usage(program_name: &str) {
	println!(
	    "Usage: {} [{} <pages> {} <frames> {} <['FIFO', 'LRU', 'MRU', 'OPTIMAL']> {} <p0,p1,...> {} <length> {} <seed> {}]",
	    program_name,
	    Self::OPT_PAGE_TABLE_SIZE,
	    Self::OPT_FRAMES,
	    Self::OPT_ALGORITHM,
	    Self::OPT_SEQUENCE,
	    Self::OPT_RANDOM,
	    Self::OPT_SEED,
	    Self::OPT_JSON,
	);
    }

    pub fn page_table_size(&self) -> usize {
	self.page_table_size
    }

    pub fn frame_count(&self) -> i64 {
	self.frame_count
    }

    pub fn algorithm(&self) -> &str {
	&self.algorithm
    }

    pub fn sequence(&self) -> Option<&[i64]> {
	self.sequence.as_deref()
    }

    pub fn random_length(&self) -> usize {
	self.random
    }

    pub fn seed(&self) -> u64 {
	self.seed
    }

    pub fn json(&self) -> bool {
	self.json
    }
}
