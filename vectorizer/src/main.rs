use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sparsify::compact::{compact_path, CompactionMap};
use sparsify::features::{generate, FeatureKind};
use sparsify::sparse::{write_line, DocRegistry, SparseVector};
use sparsify::tokenizer::tokenize;
use sparsify::vocab::{resolve, MphVocabulary};
use sparsify::DocId;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "vectorizer")]
#[command(about = "Turn labeled text corpora into sparse feature vector files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a directory of text files into sparse feature-count files
    Vectorize {
        /// Directory of text documents (one file per document, not recursed)
        #[arg(long)]
        input: String,
        /// Output directory for sparse files
        #[arg(long)]
        output: String,
        /// Minimum-perfect-hash key artifact
        #[arg(long)]
        keys: String,
        /// Verification signature artifact
        #[arg(long)]
        signature: String,
        /// Feature kind: one-gram..five-gram, gappy-bigram, gappy-bigram-tagged, osb
        #[arg(long)]
        feature: FeatureKind,
        /// Maximum token gap for the gap-driven feature kinds
        #[arg(long, default_value_t = 0)]
        max_gap: usize,
    },
    /// Rewrite sparse files with small sequential feature ids
    Compact {
        /// Sparse file or directory of sparse files
        #[arg(long)]
        input: String,
        /// Output directory for compacted files
        #[arg(long)]
        output: String,
        /// Persisted large-to-small id map (created if absent)
        #[arg(long)]
        map: String,
        /// Descend into subdirectories of the input directory
        #[arg(long, default_value_t = false)]
        recursive: bool,
    },
    /// Build membership artifacts from a list of feature strings
    BuildVocab {
        /// Text file with one accepted feature string per line
        #[arg(long)]
        features: String,
        /// Minimum-perfect-hash key artifact to write
        #[arg(long)]
        keys: String,
        /// Verification signature artifact to write
        #[arg(long)]
        signature: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Vectorize {
            input,
            output,
            keys,
            signature,
            feature,
            max_gap,
        } => vectorize(&input, &output, &keys, &signature, feature, max_gap),
        Commands::Compact {
            input,
            output,
            map,
            recursive,
        } => compact(&input, &output, &map, recursive),
        Commands::BuildVocab {
            features,
            keys,
            signature,
        } => build_vocab(&features, &keys, &signature),
    }
}

#[derive(Debug, Serialize)]
struct RunMeta {
    num_docs: u32,
    features_kept: u64,
    features_dropped: u64,
    feature_kind: String,
    max_gap: usize,
    created_at: String,
    version: u32,
}

fn vectorize(
    input: &str,
    output: &str,
    keys: &str,
    signature: &str,
    feature: FeatureKind,
    max_gap: usize,
) -> Result<()> {
    let vocab = MphVocabulary::open(Path::new(keys), Path::new(signature))
        .context("loading membership artifacts")?;
    tracing::info!(entries = vocab.len(), "vocabulary loaded");

    let out_dir = Path::new(output);
    fs::create_dir_all(out_dir)?;

    // Flat scan: subdirectories of the text directory are ignored. Sorted so
    // document id assignment is deterministic across runs over the same tree.
    let mut registry = DocRegistry::new();
    let mut kept_total = 0u64;
    let mut dropped_total = 0u64;
    for entry in WalkDir::new(input)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let doc_id = registry.id_for(&name);
        match vectorize_doc(path, doc_id, &vocab, feature, max_gap, out_dir) {
            Ok((kept, dropped)) => {
                kept_total += kept;
                dropped_total += dropped;
                tracing::debug!(doc = name, doc_id, kept, dropped, "document vectorized");
            }
            Err(err) => {
                // One unreadable document fails alone; siblings continue.
                tracing::warn!(doc = name, %err, "skipping document");
            }
        }
    }

    let meta = RunMeta {
        num_docs: registry.len() as u32,
        features_kept: kept_total,
        features_dropped: dropped_total,
        feature_kind: feature.to_string(),
        max_gap,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        version: 1,
    };
    // Written beside the output directory so the sparse directory holds
    // nothing but sparse files for the compaction pass.
    let meta_path = PathBuf::from(format!("{}.meta.json", output.trim_end_matches('/')));
    fs::write(&meta_path, serde_json::to_string_pretty(&meta)?)?;

    tracing::info!(
        num_docs = registry.len(),
        kept = kept_total,
        dropped = dropped_total,
        output,
        "vectorize complete"
    );
    Ok(())
}

/// Tokenize a document phrase by phrase, generate features, resolve them
/// against the vocabulary and write one sparse line for the whole document.
/// Returns (kept, dropped) feature counts.
fn vectorize_doc(
    path: &Path,
    doc_id: DocId,
    vocab: &MphVocabulary,
    feature: FeatureKind,
    max_gap: usize,
    out_dir: &Path,
) -> Result<(u64, u64)> {
    let reader = BufReader::new(File::open(path)?);
    let mut vector = SparseVector::new();
    let mut kept = 0u64;
    let mut dropped = 0u64;

    for line in reader.lines() {
        let line = line?;
        let tokens = tokenize(&line);
        if tokens.is_empty() {
            continue;
        }
        for feat in generate(&tokens, max_gap, feature) {
            match resolve(vocab, &feat) {
                Some(id) => {
                    *vector.entry(id).or_insert(0) += 1;
                    kept += 1;
                }
                None => dropped += 1,
            }
        }
    }

    let out_path: PathBuf = out_dir.join(path.file_name().unwrap_or_default());
    let mut writer = BufWriter::new(File::create(&out_path)?);
    write_line(&mut writer, doc_id, &vector)?;
    writer.flush()?;
    Ok((kept, dropped))
}

fn compact(input: &str, output: &str, map: &str, recursive: bool) -> Result<()> {
    let map_path = Path::new(map);
    let mut compaction_map = CompactionMap::load(map_path).context("loading compaction map")?;
    let loaded = compaction_map.len();
    tracing::info!(entries = loaded, "compaction map ready");

    let report = compact_path(Path::new(input), &mut compaction_map, Path::new(output), recursive)?;
    compaction_map.persist(map_path).context("persisting compaction map")?;

    for (file, count) in &report.malformed {
        tracing::warn!(file = %file.display(), count, "malformed records skipped");
    }
    for file in &report.failed {
        tracing::warn!(file = %file.display(), "file could not be compacted");
    }
    tracing::info!(
        files = report.files_processed,
        new_ids = compaction_map.len() - loaded,
        total_ids = compaction_map.len(),
        output,
        "compaction pass complete"
    );
    Ok(())
}

fn build_vocab(features: &str, keys: &str, signature: &str) -> Result<()> {
    let reader = BufReader::new(File::open(features).context("opening feature list")?);
    let mut accepted: Vec<String> = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            accepted.push(line);
        }
    }

    let vocab = MphVocabulary::build(&accepted);
    vocab.save(Path::new(keys), Path::new(signature))?;
    tracing::info!(entries = vocab.len(), keys, signature, "vocabulary artifacts written");
    Ok(())
}
