/// Default number of simulated games per venue matchup
pub const DEFAULT_GAME_TRIALS: usize = 15_000;

/// Default number of simulated series per matchup
pub const DEFAULT_SERIES_TRIALS: usize = 15_000;

/// First season in which the first round was played as a best-of-7
pub const BEST_OF_FIVE_CUTOFF_YEAR: i32 = 2003;

/// Trials handled by a single random stream
pub const TRIAL_CHUNK_SIZE: usize = 1024;

/// Points per made basket type: three pointer, two pointer, free throw
pub const POINTS_PER_MADE_3: f64 = 3.0;
pub const POINTS_PER_MADE_2: f64 = 2.0;
pub const POINTS_PER_MADE_FT: f64 = 1.0;

/// Seeds per conference
pub const SEEDS_PER_CONFERENCE: usize = 8;

/// First-round seed pairings in bracket order
pub const FIRST_ROUND_PAIRS: [(u8, u8); 4] = [(1, 8), (4, 5), (2, 7), (3, 6)];

/// Relative pivot below which the regression design matrix is treated as singular
pub const SINGULARITY_TOLERANCE: f64 = 1e-10;
