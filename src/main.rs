//! kg-summarizer CLI: query reasoning services and inspect answer evidence.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use kg_summarizer::config::SummarizerConfig;
use kg_summarizer::extract::{CanonicalEdge, Extractor, GraphContainer, result_summaries};
use kg_summarizer::normalize::CachingNormalizer;
use kg_summarizer::paths::AppPaths;
use kg_summarizer::pubmed::CachedResolver;
use kg_summarizer::query::{ResponseCache, Target};
use kg_summarizer::summarize::{OpenAiClient, general_summary};
use kg_summarizer::trapi::{GraphType, QueryGraph, Response};

#[derive(Parser)]
#[command(
    name = "kg-summarizer",
    version,
    about = "Extract and summarize evidence from TRAPI knowledge-graph answers"
)]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/kg-summarizer/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache directory for responses and abstracts.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Reasoning service: aragorn, robokop or strider.
    #[arg(long, global = true)]
    target: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a query graph and save the response.
    Query {
        /// Path to the query graph JSON.
        #[arg(long)]
        graph: PathBuf,
        /// Always hit the service, ignoring cached responses.
        #[arg(long)]
        no_cache: bool,
        /// Write the raw response JSON here.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List the top results as edge statements.
    Results {
        #[arg(long)]
        graph: PathBuf,
        /// Saved response JSON; queries the target (cached) if omitted.
        #[arg(long)]
        response: Option<PathBuf>,
        #[arg(long, default_value = "5")]
        top: usize,
    },

    /// Show the evidence graph of one result.
    Show {
        #[arg(long)]
        graph: PathBuf,
        #[arg(long)]
        response: Option<PathBuf>,
        /// Result rank (0 = best score).
        #[arg(long, default_value = "0")]
        index: usize,
        /// Print the evidence graph as JSON.
        #[arg(long)]
        json: bool,
        /// Skip fetching publication abstracts.
        #[arg(long)]
        no_publications: bool,
    },

    /// Summarize the publication evidence of one result with a language model.
    Summarize {
        #[arg(long)]
        graph: PathBuf,
        #[arg(long)]
        response: Option<PathBuf>,
        #[arg(long, default_value = "0")]
        index: usize,
        /// Which top-level edge of the result to summarize.
        #[arg(long, default_value = "0")]
        edge: usize,
    },
}

/// Resolved settings shared by all subcommands.
struct Context {
    config: SummarizerConfig,
    cache_root: PathBuf,
}

impl Context {
    fn load(cli: &Cli) -> Result<Self> {
        let paths = AppPaths::resolve()?;
        paths.ensure_dirs()?;
        let config_path = cli.config.clone().unwrap_or_else(|| paths.config_file());
        let mut config = SummarizerConfig::load_or_default(&config_path)?.with_env()?;

        if let Some(dir) = &cli.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        if let Some(target) = &cli.target {
            config.target = target.parse::<Target>()?;
        }

        let cache_root = config.cache_root(&paths);
        Ok(Self { config, cache_root })
    }

    fn query_graph(&self, path: &Path) -> Result<QueryGraph> {
        let text = std::fs::read_to_string(path).into_diagnostic()?;
        Ok(QueryGraph::from_json(&text)?)
    }

    /// Raw response JSON: from `--response`, the cache, or a fresh query.
    fn response_json(
        &self,
        query_graph: &QueryGraph,
        path: Option<&Path>,
    ) -> Result<serde_json::Value> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).into_diagnostic()?;
                serde_json::from_str(&text).into_diagnostic()
            }
            None => {
                let cache = ResponseCache::new(&self.cache_root);
                let client = self.config.query_client();
                Ok(cache.fetch_or_query(&client, query_graph, self.config.target)?)
            }
        }
    }

    fn response(&self, query_graph: &QueryGraph, path: Option<&Path>) -> Result<Response> {
        let response = Response::from_value(self.response_json(query_graph, path)?)?;
        if response.message.results.is_empty() {
            miette::bail!("query returned no results");
        }
        Ok(response)
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = Context::load(&cli)?;

    let normalizer = CachingNormalizer::new(ctx.config.node_norm_client());
    let pubmed = CachedResolver::new(&ctx.cache_root, ctx.config.pubmed_client());

    match &cli.command {
        Commands::Query {
            graph,
            no_cache,
            out,
        } => {
            let query_graph = ctx.query_graph(graph)?;
            let target = ctx.config.target;
            let json = if *no_cache {
                let json = ctx.config.query_client().submit(&query_graph, target)?;
                ResponseCache::new(&ctx.cache_root).store(&query_graph, target, &json)?;
                json
            } else {
                ctx.response_json(&query_graph, None)?
            };

            let response = Response::from_value(json.clone())?;
            println!(
                "{} returned {} results ({} query)",
                target,
                response.message.results.len(),
                query_graph.graph_type()
            );
            if let Some(out) = out {
                let text = serde_json::to_string_pretty(&json).into_diagnostic()?;
                std::fs::write(out, text).into_diagnostic()?;
                println!("Saved response to {}", out.display());
            }
        }

        Commands::Results {
            graph,
            response,
            top,
        } => {
            let query_graph = ctx.query_graph(graph)?;
            let response = ctx.response(&query_graph, response.as_deref())?;
            let rows = result_summaries(
                Extractor::without_publications(&normalizer),
                query_graph.graph_type(),
                &response.message,
                *top,
            )?;

            for row in rows {
                println!("\nResult {} (score {:.4})", row.index, row.score);
                match row.outcome {
                    Ok(statements) => {
                        for s in statements {
                            println!("  {s}");
                        }
                    }
                    Err(e) => println!("  could not be displayed: {e}"),
                }
            }
        }

        Commands::Show {
            graph,
            response,
            index,
            json,
            no_publications,
        } => {
            let query_graph = ctx.query_graph(graph)?;
            let response = ctx.response(&query_graph, response.as_deref())?;
            let extractor = if *no_publications {
                Extractor::without_publications(&normalizer)
            } else {
                Extractor::new(&normalizer, &pubmed)
            };

            let container = match GraphContainer::new(query_graph, response, *index, extractor) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Result {index} could not be displayed.");
                    return Err(e.into());
                }
            };

            if *json {
                let out = serde_json::to_string_pretty(&container.snapshot()).into_diagnostic()?;
                println!("{out}");
            } else {
                print_container(&container);
            }
        }

        Commands::Summarize {
            graph,
            response,
            index,
            edge,
        } => {
            let query_graph = ctx.query_graph(graph)?;
            let response = ctx.response(&query_graph, response.as_deref())?;
            let container = GraphContainer::new(
                query_graph,
                response,
                *index,
                Extractor::new(&normalizer, &pubmed),
            )?;

            let Some(top_edge) = container.edges().get(*edge) else {
                miette::bail!(
                    "result {index} has {} edges; --edge {edge} is out of range",
                    container.edges().len()
                );
            };

            let client = OpenAiClient::new(
                ctx.config.llm_base_url.clone(),
                ctx.config.llm_model.clone(),
                ctx.config.llm_temperature,
                std::env::var("OPENAI_API_KEY").ok(),
            )?
            .with_organization(std::env::var("OPENAI_ORGANIZATION_ID").ok());

            // Creative answers carry their evidence on the support-graph edges.
            let targets: Vec<(String, &CanonicalEdge)> = match container.graph_type() {
                GraphType::Lookup => vec![(top_edge.statement(), top_edge)],
                GraphType::Creative => top_edge
                    .support_graphs
                    .iter()
                    .flat_map(|sg| sg.edges.iter().map(|e| (sg.sentence.clone(), e)))
                    .collect(),
            };

            for (statement, edge) in targets {
                println!("\n== {}", edge.statement());
                match general_summary(&client, edge, &statement)? {
                    Some(summary) => {
                        println!("{}\n", summary.evidence);
                        println!("{}", summary.grouped);
                    }
                    None => println!("No publication evidence"),
                }
            }
        }
    }

    Ok(())
}

fn print_edge_evidence(edge: &CanonicalEdge, indent: &str) {
    if edge.publications.is_empty() {
        println!("{indent}No publication evidence");
        return;
    }
    for publication in &edge.publications {
        match &publication.abstract_text {
            Some(text) => println!("{indent}{}: {}", publication.id, text),
            None => println!("{indent}{}", publication.id),
        }
    }
}

fn print_container(container: &GraphContainer<'_>) {
    let graph = container.graph();
    println!(
        "Result {} of {} (score {:.4}, {} query)",
        graph.result_index,
        container.result_count(),
        graph.score,
        graph.graph_type
    );

    println!("\nNodes ({}):", graph.nodes.len());
    for (label, node) in &graph.nodes {
        println!("  {label}");
        if !node.description.is_empty() {
            println!("    description: {}", node.description);
        }
        if !node.same_as.is_empty() {
            println!("    same as:     {}", node.same_as.join(", "));
        }
        if !node.smiles.is_empty() {
            println!("    smiles:      {}", node.smiles);
        }
        if let Some(parent) = &node.subclass_of {
            println!("    subclass of: {}", parent.label);
        }
    }

    match graph.graph_type {
        GraphType::Lookup => {
            println!("\nEdges ({}):", graph.edges.len());
            for edge in &graph.edges {
                println!("  {}", edge.statement());
                print_edge_evidence(edge, "    ");
            }
        }
        GraphType::Creative => {
            for edge in &graph.edges {
                println!("\nInferred relationship: {}", edge.statement());
                println!("Support graphs ({}):", edge.support_graphs.len());
                for sg in &edge.support_graphs {
                    println!("  [{}] {}", sg.id, sg.sentence);
                    for step in &sg.edges {
                        println!("    {}", step.statement());
                        print_edge_evidence(step, "      ");
                    }
                }
            }
        }
    }

    if !graph.cooccurrence.is_empty() {
        println!("\nLiterature co-occurrence support graphs ({}):", graph.cooccurrence.len());
        for sg in &graph.cooccurrence {
            println!("  [{}] {}", sg.id, sg.sentence);
        }
    }
}
