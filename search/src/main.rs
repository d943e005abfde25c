use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use search::run_search;
use skipdex_core::{IndexPaths, NormalizerConfig, SearchConfig, StemmingNormalizer, DEFAULT_TOP_K};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "search")]
#[command(about = "Rank documents for each query with lnc.ltc cosine scoring", long_about = None)]
struct Args {
    /// Term dictionary file written by the indexer
    #[arg(short = 'd', value_name = "DICTIONARY")]
    dictionary: PathBuf,
    /// Postings file written by the indexer
    #[arg(short = 'p', value_name = "POSTINGS")]
    postings: PathBuf,
    /// File of queries, one per line
    #[arg(short = 'q', value_name = "QUERIES")]
    queries: PathBuf,
    /// Output file of results, one line per query
    #[arg(short = 'o', value_name = "RESULTS")]
    output: PathBuf,
    /// Document length file (defaults to <DICTIONARY>.lengths)
    #[arg(long)]
    lengths: Option<PathBuf>,
    /// Maximum documents returned per query
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,
    /// Number of worker threads for evaluating queries; 0 lets rayon decide
    #[arg(long, default_value_t = 0)]
    jobs: usize,
    /// Drop English stopwords before stemming; must match the indexer
    #[arg(long, default_value_t = false)]
    stopwords: bool,
}

/// Missing or malformed arguments print the usage line to stdout and exit 2.
fn parse_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(_) => {
            println!("{}", Args::command().render_usage());
            std::process::exit(2);
        }
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let args = parse_args();
    if args.jobs > 0 {
        rayon::ThreadPoolBuilder::new().num_threads(args.jobs).build_global()?;
    }

    let mut paths = IndexPaths::new(&args.dictionary, &args.postings);
    if let Some(lengths) = &args.lengths {
        paths = paths.with_lengths(lengths);
    }
    let normalizer = StemmingNormalizer::new(NormalizerConfig { remove_stopwords: args.stopwords });
    let answered = run_search(
        &paths,
        &args.queries,
        &args.output,
        SearchConfig { top_k: args.top_k },
        &normalizer,
    )?;
    tracing::info!(answered, "done");
    Ok(())
}
