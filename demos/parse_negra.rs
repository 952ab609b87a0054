//! Print the trees of a NEGRA export or TIGER-XML corpus
//!
//! ```text
//! RUST_LOG=treebank=debug cargo run --example parse_negra -- corpus.export [--morph]
//! cargo run --example parse_negra -- tiger.xml
//! ```

use std::env;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use treebank::{BuildOptions, CorpusFormat, Treebank};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(path) = args.iter().find(|a| !a.starts_with("--")) else {
        eprintln!("usage: parse_negra <corpus> [--morph]");
        return ExitCode::FAILURE;
    };
    let options = if args.iter().any(|a| a == "--morph") {
        BuildOptions::morph()
    } else {
        BuildOptions::default()
    };
    let format = if path.ends_with(".xml") || path.ends_with(".xml.gz") {
        CorpusFormat::Tiger
    } else {
        CorpusFormat::default()
    };

    let corpus = Treebank::from_file(path, format);
    let trees = match corpus.parsed_sents(options) {
        Ok(trees) => trees,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut count = 0;
    for tree in trees {
        println!("{tree}");
        count += 1;
    }
    tracing::info!(count, "done");
    ExitCode::SUCCESS
}
