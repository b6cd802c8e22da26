use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use postlens_core::export::{write_csv, write_parquet};
use postlens_core::insights::{
    interaction_correlation, monthly_totals, segment_posts, top_posts, topic_segments,
    weekday_breakdown, Segment,
};
use postlens_core::{
    Analysis, Analyzer, AnalyzerConfig, BrandAssignment, ColumnMapping, MappingOverrides,
    PipelineError, Report, Role, SourceInput, SourceKind,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod render;

const CONFIG_ENV: &str = "POSTLENS_CONFIG";

#[derive(Parser, Debug)]
#[command(author, version, about = "Engagement analytics for social media CSV exports", long_about = None)]
struct Cli {
    /// Analyzer configuration (TOML). Falls back to $POSTLENS_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show which parser reads a file and the proposed column mapping
    Detect(DetectArgs),
    /// Summarize a main export, optionally benchmarked against a competitor
    Analyze(AnalyzeArgs),
    /// Write the enriched main export as CSV or Parquet
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct DetectArgs {
    file: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[arg(long)]
    main: PathBuf,

    #[arg(long)]
    competitor: Option<PathBuf>,

    /// Override the main mapping, e.g. `--map likes=Reactions` or `--map views=`
    #[arg(long = "map", value_name = "ROLE=COLUMN")]
    map: Vec<String>,

    /// Override the competitor mapping
    #[arg(long = "competitor-map", value_name = "ROLE=COLUMN")]
    competitor_map: Vec<String>,

    /// Brand label for the main export instead of its most frequent author
    #[arg(long)]
    brand: Option<String>,

    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ExportFormat {
    Csv,
    Parquet,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[arg(long)]
    main: PathBuf,

    #[arg(long = "map", value_name = "ROLE=COLUMN")]
    map: Vec<String>,

    #[arg(long)]
    brand: Option<String>,

    #[arg(long)]
    out: PathBuf,

    #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
    format: ExportFormat,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;
    let analyzer = Analyzer::new(config);

    match cli.command {
        Command::Detect(args) => detect(&analyzer, args),
        Command::Analyze(args) => analyze(&analyzer, args),
        Command::Export(args) => export(&analyzer, args),
    }
}

fn load_config(flag: Option<PathBuf>) -> Result<AnalyzerConfig> {
    let path = flag.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    match path {
        Some(path) => AnalyzerConfig::load(&path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(AnalyzerConfig::default()),
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn parse_overrides(pairs: &[String]) -> Result<MappingOverrides> {
    MappingOverrides::parse_pairs(pairs).map_err(|message| anyhow!(message))
}

fn required_roles(analyzer: &Analyzer) -> Vec<Role> {
    analyzer.config().enrich_options().required_roles()
}

fn detect(analyzer: &Analyzer, args: DetectArgs) -> Result<()> {
    let bytes = read_input(&args.file)?;
    let inspected = analyzer
        .inspect(&bytes)
        .with_context(|| format!("could not decode {}", args.file.display()))?;
    let required = required_roles(analyzer);
    let missing = inspected.detected.missing(&required);
    let table = &inspected.decoded.table;

    if args.json {
        let output = serde_json::json!({
            "parser": inspected.decoded.parser,
            "rows": table.row_count(),
            "skipped_rows": inspected.decoded.skipped_rows,
            "columns": table.column_names(),
            "mapping": inspected.detected,
            "missing": missing,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{}: parser {}, {} rows, {} columns, {} skipped",
        args.file.display(),
        inspected.decoded.parser,
        table.row_count(),
        table.column_count(),
        inspected.decoded.skipped_rows
    );
    println!("{}", render::mapping_table(&inspected.detected, &required));
    if !missing.is_empty() {
        println!("missing required roles: {}", role_list(&missing));
    }
    Ok(())
}

fn analyze(analyzer: &Analyzer, args: AnalyzeArgs) -> Result<()> {
    let main_bytes = read_input(&args.main)?;
    let competitor_bytes = args.competitor.as_deref().map(read_input).transpose()?;
    let main_overrides = parse_overrides(&args.map)?;
    let competitor_overrides = parse_overrides(&args.competitor_map)?;

    let main = SourceInput::new(&main_bytes, &main_overrides);
    let competitor = competitor_bytes
        .as_deref()
        .map(|bytes| SourceInput::new(bytes, &competitor_overrides));

    let analysis = analyzer
        .analyze(main, competitor, args.brand.as_deref())
        .context("analysis failed")?;

    let report = match analysis {
        Analysis::Complete(report) => report,
        Analysis::AwaitingMapping {
            source,
            mapping,
            missing,
        } => return Err(awaiting_mapping(analyzer, source, &mapping, &missing)),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report_json(analyzer, &report))?);
    } else {
        print_report(analyzer, &report);
    }
    Ok(())
}

fn export(analyzer: &Analyzer, args: ExportArgs) -> Result<()> {
    let bytes = read_input(&args.main)?;
    let overrides = parse_overrides(&args.map)?;
    let inspected = analyzer
        .inspect(&bytes)
        .with_context(|| format!("could not decode {}", args.main.display()))?;
    let proposed = analyzer.proposed_mapping(&inspected, &overrides)?;

    let resolved = match analyzer.resolve(inspected, &overrides) {
        Ok(resolved) => resolved,
        Err(PipelineError::MappingIncomplete(incomplete)) => {
            return Err(awaiting_mapping(
                analyzer,
                SourceKind::Main,
                &proposed,
                &incomplete.missing,
            ))
        }
        Err(err) => return Err(err.into()),
    };

    let brand = analyzer.main_brand(&resolved, args.brand.as_deref());
    let set = analyzer.enrich(&resolved, &BrandAssignment::Label(brand))?;

    let file = File::create(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    let writer = BufWriter::new(file);
    match args.format {
        ExportFormat::Csv => write_csv(&set, writer)?,
        ExportFormat::Parquet => write_parquet(&set, writer)?,
    }

    info!(path = %args.out.display(), rows = set.len(), format = ?args.format, "export written");
    Ok(())
}

fn awaiting_mapping(
    analyzer: &Analyzer,
    source: SourceKind,
    mapping: &ColumnMapping,
    missing: &[Role],
) -> anyhow::Error {
    let flag = match source {
        SourceKind::Main => "--map",
        SourceKind::Competitor => "--competitor-map",
    };
    println!("{source} mapping:");
    println!("{}", render::mapping_table(mapping, &required_roles(analyzer)));
    anyhow!(
        "{source} source is missing required roles: {}; assign them with {flag} role=column",
        role_list(missing)
    )
}

fn role_list(roles: &[Role]) -> String {
    roles
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_report(analyzer: &Analyzer, report: &Report) {
    let config = analyzer.config();

    println!("Primary brand: {} (parser {})", report.primary_brand, report.main_parser);
    println!("{}", render::mapping_table(report.mapping(), &required_roles(analyzer)));

    println!("\nBrand summaries");
    println!("{}", render::summaries_table(&report.summaries, &report.primary_brand));

    if !report.comparisons.is_empty() {
        println!("\nCompared with {}", report.primary_brand);
        println!("{}", render::comparisons_table(&report.comparisons));
    }

    let main = &report.main;
    println!("\nTop {} posts", config.top_posts);
    println!("{}", render::posts_table(main, &top_posts(main, config.top_posts)));

    println!(
        "\n'{}' posts (high performer: >= {} interactions)",
        config.topic_keyword, config.high_performer_threshold
    );
    println!(
        "{}",
        render::segments_table(&topic_segments(main, config.high_performer_threshold))
    );

    let low_topic = segment_posts(main, Segment::LowTopic, config.high_performer_threshold);
    if !low_topic.is_empty() {
        println!("\nLow performers mentioning '{}'", config.topic_keyword);
        println!("{}", render::posts_table(main, &low_topic));
    }

    println!("\nBy weekday");
    println!("{}", render::weekday_table(&weekday_breakdown(main)));

    println!("\nBy month");
    println!("{}", render::monthly_table(&monthly_totals(main)));

    match interaction_correlation(main) {
        Some(r) => println!("\nCorrelation of comments with total interactions: {r:.3}"),
        None => println!("\nCorrelation of comments with total interactions: n/a"),
    }
}

fn report_json(analyzer: &Analyzer, report: &Report) -> serde_json::Value {
    let config = analyzer.config();
    let main = &report.main;
    let top: Vec<serde_json::Value> = top_posts(main, config.top_posts)
        .into_iter()
        .map(|record| render::record_json(main, record))
        .collect();
    let low_topic: Vec<serde_json::Value> =
        segment_posts(main, Segment::LowTopic, config.high_performer_threshold)
            .into_iter()
            .map(|record| render::record_json(main, record))
            .collect();

    serde_json::json!({
        "primary_brand": report.primary_brand,
        "main_parser": report.main_parser,
        "competitor_parser": report.competitor_parser,
        "mapping": report.mapping(),
        "summaries": report.summaries,
        "comparisons": report.comparisons,
        "top_posts": top,
        "topic_segments": topic_segments(main, config.high_performer_threshold),
        "low_performing_topic_posts": low_topic,
        "weekdays": weekday_breakdown(main),
        "months": monthly_totals(main),
        "interaction_correlation": interaction_correlation(main),
    })
}
