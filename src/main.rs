use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use finrag::{
    config::Config,
    embedding::get_embedding_client,
    logging,
    partition::get_partitioner,
    processing::{
        BatchOptions, BatchProcessor, DEFAULT_TOP_K, QueryOptions, QueryPipeline, Summarizer,
        UpsertOptions, UpsertPipeline,
    },
    qdrant::{MetadataFilter, QdrantService, YearRange},
    summarization::get_summarization_client,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "finrag",
    version,
    about = "Turn financial PDF reports into summarized, searchable vectors"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert every PDF of the dataset directory into a JSON record file.
    Prepare {
        #[arg(long)]
        dataset_dir: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Summarize record files in place.
    Summarize {
        /// Single record file; defaults to every file of the output directory.
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Regenerate summaries that already exist.
        #[arg(long)]
        overwrite: bool,
    },
    /// Embed summarized records and upsert them into the vector index.
    Upsert {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Search the vector index.
    Query {
        question: String,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        year_from: Option<i32>,
        #[arg(long)]
        year_to: Option<i32>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
}

impl Command {
    fn stage(&self) -> &'static str {
        match self {
            Command::Prepare { .. } => "prepare",
            Command::Summarize { .. } => "summarize",
            Command::Upsert { .. } => "upsert",
            Command::Query { .. } => "query",
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("failed to load configuration")?;
    logging::init_tracing(cli.command.stage());
    tracing::debug!(
        dataset_dir = %config.extraction.dataset_dir.display(),
        output_dir = %config.extraction.output_dir.display(),
        partitioner = ?config.extraction.partitioner,
        index = %config.vector_store.index_name,
        embedding_provider = ?config.embedding.provider,
        embedding_model = %config.embedding.model,
        "Loaded configuration"
    );

    match cli.command {
        Command::Prepare {
            dataset_dir,
            output_dir,
            year,
        } => {
            let mut options = BatchOptions::from(&config.extraction);
            if let Some(dir) = dataset_dir {
                options.dataset_dir = dir;
            }
            if let Some(dir) = output_dir {
                options.output_dir = dir;
            }
            if let Some(year) = year {
                options.year = year;
            }
            let partitioner =
                get_partitioner(&config.extraction).context("failed to build partitioner")?;
            let report = BatchProcessor::new(options, partitioner)
                .process_all()
                .await
                .context("batch conversion aborted")?;
            for path in &report.written {
                println!("saved {}", path.display());
            }
            if !report.is_success() {
                bail!("{} document(s) failed to convert", report.failed.len());
            }
        }
        Command::Summarize {
            file,
            dir,
            overwrite,
        } => {
            let client = get_summarization_client(&config.llm)
                .context("failed to build summarization client")?;
            let summarizer = Summarizer::new(client).with_overwrite(overwrite);
            let report = match file {
                Some(path) => summarizer.summarize_file(&path).await,
                None => {
                    let dir = dir.unwrap_or_else(|| config.extraction.output_dir.clone());
                    summarizer.summarize_dir(&dir).await
                }
            }
            .context("summarization pass failed")?;
            println!(
                "summarized {}, sentinel {}, kept {}, failed {}, failed files {}",
                report.summarized,
                report.sentinel,
                report.kept,
                report.failed,
                report.failed_files
            );
            if report.failed_files > 0 {
                bail!("{} record file(s) could not be summarized", report.failed_files);
            }
        }
        Command::Upsert { dir } => {
            let embedder = get_embedding_client(&config.embedding)
                .context("failed to build embedding client")?;
            let store = QdrantService::new(&config.vector_store)
                .context("failed to configure vector store")?;
            let pipeline =
                UpsertPipeline::new(UpsertOptions::from(&config), embedder, Box::new(store));
            let dir = dir.unwrap_or_else(|| config.extraction.output_dir.clone());
            let report = pipeline.run(&dir).await.context("upsert failed")?;
            println!(
                "upserted {} of {} records in {} batch(es)",
                report.upserted, report.records, report.batches
            );
        }
        Command::Query {
            question,
            company,
            year,
            year_from,
            year_to,
            page,
            top_k,
        } => {
            let embedder = get_embedding_client(&config.embedding)
                .context("failed to build embedding client")?;
            let store = QdrantService::new(&config.vector_store)
                .context("failed to configure vector store")?;
            let pipeline =
                QueryPipeline::new(QueryOptions::from(&config), embedder, Box::new(store));

            let year_range = (year_from.is_some() || year_to.is_some()).then_some(YearRange {
                start: year_from,
                end: year_to,
            });
            let filter = MetadataFilter {
                company,
                year,
                year_range,
                page,
            };
            let filter = (filter != MetadataFilter::default()).then_some(filter);

            let matches = pipeline.query(&question, filter, top_k).await;
            if matches.is_empty() {
                println!("no matches");
            }
            for (rank, hit) in matches.iter().enumerate() {
                println!(
                    "{}. [{:.3}] {} {} p.{}",
                    rank + 1,
                    hit.score,
                    hit.company.as_deref().unwrap_or("?"),
                    hit.year.map(|year| year.to_string()).unwrap_or_default(),
                    hit.page.map(|page| page.to_string()).unwrap_or_default()
                );
                if let Some(summary) = hit.summarized.as_deref() {
                    println!("   {summary}");
                }
            }
        }
    }

    Ok(())
}
