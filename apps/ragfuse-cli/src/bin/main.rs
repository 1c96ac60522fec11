use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use ragfuse_core::chunking::source_name;
use ragfuse_core::config::RagConfig;
use ragfuse_core::types::{meta_keys, IngestDocument, QueryEvent, QueryOptions, RagResponse};
use ragfuse_pipeline::{sample_corpus, PipelineBuilder, RagPipeline};

const USAGE: &str = "Usage: ragfuse <ingest|query|stream|compare> [args...]

  ingest [DIR] [--sample]           index .txt/.md files under DIR (or the built-in sample corpus)
  query \"<question>\" [--no-rerank] [--vector-only]
  stream \"<question>\" [--no-rerank] [--vector-only]
  compare \"<question>\"";

struct Args {
    cmd: String,
    positional: Vec<String>,
    options: QueryOptions,
    sample: bool,
}

fn parse_args() -> Args {
    let mut raw: Vec<String> = env::args().skip(1).collect();
    if raw.is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }
    let cmd = raw.remove(0);
    let mut args = Args { cmd, positional: Vec::new(), options: QueryOptions::default(), sample: false };
    for a in raw {
        match a.as_str() {
            "--no-rerank" => args.options.use_reranking = false,
            "--vector-only" => args.options.use_hybrid_search = false,
            "--sample" => args.sample = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            flag if flag.starts_with('-') => {
                eprintln!("Unknown flag: {flag}\n\n{USAGE}");
                std::process::exit(1);
            }
            _ => args.positional.push(a),
        }
    }
    args
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn collect_documents(dir: &Path) -> Result<Vec<IngestDocument>> {
    let mut docs = Vec::new();
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        let is_text = path.extension().and_then(|e| e.to_str()).is_some_and(|e| e == "txt" || e == "md");
        if !entry.file_type().is_file() || !is_text {
            continue;
        }
        let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let mut doc = IngestDocument::new(content).with_meta(meta_keys::SOURCE, source_name(path));
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            doc = doc.with_meta(meta_keys::TITLE, stem.replace(['-', '_'], " "));
        }
        docs.push(doc);
    }
    Ok(docs)
}

async fn ingest(pipeline: &RagPipeline, docs: &[IngestDocument]) -> Result<()> {
    if docs.is_empty() {
        println!("No documents to ingest");
        return Ok(());
    }
    let pb = ProgressBar::new(docs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents {msg}")?
            .progress_chars("#>-"),
    );
    let mut chunks = 0usize;
    for doc in docs {
        let report = pipeline.ingest(std::slice::from_ref(doc)).await?;
        chunks += report.chunks;
        pb.inc(1);
        pb.set_message(doc.metadata.get(meta_keys::SOURCE).cloned().unwrap_or_default());
    }
    pb.finish_with_message("done");
    println!("✅ Ingested {} documents into {} chunks", docs.len(), chunks);
    Ok(())
}

/// The mock index lives in memory, so each mock run starts from the sample corpus.
async fn seed_if_mock(config: &RagConfig, pipeline: &RagPipeline) -> Result<()> {
    if config.mock_mode && pipeline.index().count().await? == 0 {
        println!("(mock mode: seeding the in-memory index with the sample corpus)");
        pipeline.ingest(&sample_corpus()).await?;
    }
    Ok(())
}

fn print_response(label: &str, response: &RagResponse) {
    println!("\n=== {label} ===");
    println!("{}\n", response.answer);
    for (i, s) in response.sources.iter().enumerate() {
        let name = s
            .metadata
            .get(meta_keys::TITLE)
            .or_else(|| s.metadata.get(meta_keys::SOURCE))
            .map(String::as_str)
            .unwrap_or("untitled");
        let preview: String = s.content.chars().take(80).collect();
        println!("  [{}] score={:.4}  {}  {}", i + 1, s.score, name, preview.replace('\n', " "));
    }
    let m = &response.metrics;
    println!(
        "⏱  retrieval {:.1}ms · rerank {:.1}ms · generation {:.1}ms · total {:.1}ms",
        m.retrieval_time.as_secs_f64() * 1000.0,
        m.reranking_time.as_secs_f64() * 1000.0,
        m.generation_time.as_secs_f64() * 1000.0,
        m.total_time.as_secs_f64() * 1000.0
    );
}

fn question(args: &Args) -> String {
    if args.positional.is_empty() {
        eprintln!("Usage: ragfuse {} \"<question>\"", args.cmd);
        std::process::exit(1);
    }
    args.positional.join(" ")
}

#[tokio::main]
async fn main() {
    let args = parse_args();
    init_tracing();
    if let Err(e) = run(args).await {
        match e.downcast_ref::<ragfuse_core::Error>().and_then(|err| err.stage()) {
            Some(stage) => eprintln!("Error while {stage}: {e:#}"),
            None => eprintln!("Error: {e:#}"),
        }
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = RagConfig::load().context("loading config")?;
    let pipeline = PipelineBuilder::from_config(config.clone()).await?;

    match args.cmd.as_str() {
        "ingest" => {
            let docs = if args.sample {
                sample_corpus()
            } else {
                let dir = args.positional.first().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./data/docs"));
                println!("Ingesting from {}", dir.display());
                collect_documents(&dir)?
            };
            ingest(&pipeline, &docs).await?;
        }
        "query" => {
            let q = question(&args);
            seed_if_mock(&config, &pipeline).await?;
            let response = pipeline.query(&q, args.options).await?;
            print_response(&q, &response);
        }
        "stream" => {
            let q = question(&args);
            seed_if_mock(&config, &pipeline).await?;
            let mut events = pipeline.stream_query(&q, args.options);
            while let Some(event) = events.next().await {
                match event? {
                    QueryEvent::RetrievalStarted => eprintln!("… retrieving"),
                    QueryEvent::RetrievalFinished { result_count } => eprintln!("… {result_count} candidates"),
                    QueryEvent::RerankingStarted => eprintln!("… reranking"),
                    QueryEvent::RerankingFinished { result_count } => eprintln!("… kept {result_count}"),
                    QueryEvent::Generation { delta } => {
                        print!("{delta}");
                        std::io::stdout().flush()?;
                    }
                    QueryEvent::Complete { sources, metrics } => {
                        println!();
                        println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                            "sources": sources.len(),
                            "metrics": metrics,
                        }))?);
                    }
                }
            }
        }
        "compare" => {
            let q = question(&args);
            seed_if_mock(&config, &pipeline).await?;
            let cmp = pipeline.compare(&q).await?;
            print_response("vector only", &cmp.vector_only);
            print_response("hybrid", &cmp.hybrid);
            print_response("hybrid + rerank", &cmp.hybrid_reranked);
        }
        other => {
            eprintln!("Unknown command: {other}\n\n{USAGE}");
            std::process::exit(1);
        }
    }
    Ok(())
}
