use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use skipdex_core::{build, build_parallel, DirectorySource, IndexPaths, NormalizerConfig, StemmingNormalizer};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a skip-pointer inverted index from a directory of documents", long_about = None)]
struct Cli {
    /// Directory of documents, one file per document named by its numeric id
    #[arg(short = 'i', value_name = "DIR")]
    input: PathBuf,
    /// Output term dictionary file
    #[arg(short = 'd', value_name = "DICTIONARY")]
    dictionary: PathBuf,
    /// Output postings file
    #[arg(short = 'p', value_name = "POSTINGS")]
    postings: PathBuf,
    /// Output document length file (defaults to <DICTIONARY>.lengths)
    #[arg(long)]
    lengths: Option<PathBuf>,
    /// Number of worker threads; 1 builds sequentially
    #[arg(long, default_value_t = 1)]
    jobs: usize,
    /// Drop English stopwords before stemming
    #[arg(long, default_value_t = false)]
    stopwords: bool,
}

/// Missing or malformed arguments print the usage line to stdout and exit 2.
fn parse_args() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(_) => {
            println!("{}", Cli::command().render_usage());
            std::process::exit(2);
        }
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let cli = parse_args();
    build_index(&cli)
}

fn build_index(cli: &Cli) -> Result<()> {
    let mut paths = IndexPaths::new(&cli.dictionary, &cli.postings);
    if let Some(lengths) = &cli.lengths {
        paths = paths.with_lengths(lengths);
    }
    let normalizer = StemmingNormalizer::new(NormalizerConfig { remove_stopwords: cli.stopwords });
    let source = DirectorySource::new(&cli.input);

    tracing::info!(input = %cli.input.display(), jobs = cli.jobs, "indexing");
    let built = if cli.jobs > 1 {
        rayon::ThreadPoolBuilder::new().num_threads(cli.jobs).build_global()?;
        build_parallel(&source, &normalizer, cli.jobs)?
    } else {
        build(&source, &normalizer)?
    };
    built.write(&paths)?;

    tracing::info!(
        dictionary = %paths.dictionary.display(),
        postings = %paths.postings.display(),
        num_docs = built.num_docs,
        "index build complete"
    );
    Ok(())
}
