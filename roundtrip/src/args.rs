use clap::{Parser, ValueEnum};
use serde::Serialize;
use sql_marshal::LengthSemantics;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Scenario {
    BasicTypes,
    TextBlob,
    BinaryBlob,
    IncorrectTypes,
}

impl Scenario {
    pub(crate) const ALL: [Scenario; 4] = [
        Scenario::BasicTypes,
        Scenario::TextBlob,
        Scenario::BinaryBlob,
        Scenario::IncorrectTypes,
    ];
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Round-trip every column type through SQLite")]
pub(crate) struct Args {
    /// Scenarios to run; all of them when omitted
    #[arg(long, value_enum)]
    pub(crate) scenario: Vec<Scenario>,
    /// Database file; an in-memory database when omitted
    #[arg(long)]
    pub(crate) db: Option<PathBuf>,
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    #[arg(long, default_value_t = 10)]
    pub(crate) rows: u32,
    #[arg(long, default_value_t = 50_000)]
    pub(crate) blob_size: usize,
    #[arg(long, value_enum, default_value = "characters")]
    pub(crate) length_semantics: LengthSemantics,
    #[arg(long)]
    pub(crate) log: Option<PathBuf>,
    #[arg(long)]
    pub(crate) quick: bool,
    /// Only report mismatches on the console; the log file still gets everything
    #[arg(long)]
    pub(crate) quiet: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RunConfig {
    pub(crate) scenarios: Vec<Scenario>,
    pub(crate) db: String,
    pub(crate) seed: u64,
    pub(crate) rows: u32,
    pub(crate) blob_size: usize,
    pub(crate) length_semantics: LengthSemantics,
    pub(crate) log: Option<PathBuf>,
    pub(crate) quiet: bool,
    pub(crate) preset: Option<String>,
}

impl RunConfig {
    pub(crate) fn from_args(args: Args) -> Self {
        let scenarios = if args.scenario.is_empty() {
            Scenario::ALL.to_vec()
        } else {
            args.scenario
        };
        let mut config = RunConfig {
            scenarios,
            db: args
                .db
                .map_or_else(|| ":memory:".to_string(), |path| path.to_string_lossy().into_owned()),
            seed: args.seed.unwrap_or_else(random_seed),
            rows: clamp_rows(args.rows),
            blob_size: args.blob_size.max(1),
            length_semantics: args.length_semantics,
            log: args.log,
            quiet: args.quiet,
            preset: None,
        };

        if args.quick {
            config.apply_quick();
        }

        config
    }

    fn apply_quick(&mut self) {
        self.preset = Some("quick".to_string());
        self.rows = 3;
        self.blob_size = 4_096;
    }
}

// Row i writes i characters into VARCHAR(10) and uses i + 1 as a month number.
fn clamp_rows(rows: u32) -> u32 {
    rows.clamp(1, 11)
}

fn random_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    now.as_secs() ^ u64::from(now.subsec_nanos())
}
