use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use updateinfo_filter::config::{non_empty, parse_date, read_package_list, DEFAULT_AFTER_DATE};
use updateinfo_filter::{run, DigestAlgorithm, FilterConfig, FilterStats, Renderer, SECURITY_TYPE};

/// A simple CLI to filter and render updateinfo XML files
#[derive(Parser, Debug)]
#[command(name = "updateinfo-filter", version)]
#[command(after_help = "Examples:
  updateinfo-filter updateinfo.xml                                   # Render every update issued before today
  updateinfo-filter -s -a 2023-01-01 -b 2024-01-01 updateinfo.xml    # Security updates issued in 2023
  updateinfo-filter -p packages.txt -o report.txt updateinfo.xml     # Updates touching listed packages
  updateinfo-filter -t custom.hbs --digest sha256 updateinfo.xml     # Custom template plus checksum
  zcat updateinfo.xml.gz | updateinfo-filter -s -                    # Read the feed from stdin")]
struct Cli {
    /// Path to the updateinfo file (or - for stdin)
    updateinfo: PathBuf,

    /// Filter updates released strictly before the given date (format: 'YYYY-MM-DD'). Defaults to current date
    #[arg(short = 'b', long = "beforeDate")]
    before_date: Option<String>,

    /// Filter updates released strictly after the given date (format: 'YYYY-MM-DD')
    #[arg(short = 'a', long = "afterDate", default_value = DEFAULT_AFTER_DATE)]
    after_date: String,

    /// Output file. Defaults to stdout (also when empty)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Custom Handlebars template file for each update. Empty uses the built-in layout
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Package list file (one name per line) to keep only updates modifying any of them.
    /// Blank lines and '#' comments are skipped, so a file without names keeps every update
    #[arg(short, long)]
    packages: Option<PathBuf>,

    /// Match only security updates
    #[arg(short, long)]
    security: bool,

    /// Compute checksum of the rendered output (sha256, sha512)
    #[arg(long)]
    digest: Option<DigestAlgorithm>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match execute(cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> anyhow::Result<FilterStats> {
    let input = cli.updateinfo.as_path();
    if input != Path::new("-") && !input.exists() {
        anyhow::bail!("could not find updateinfo file '{}'", input.display());
    }

    let before = match &cli.before_date {
        Some(value) => parse_date("before", value)?,
        None => Utc::now().date_naive(),
    };
    let after = parse_date("after", &cli.after_date)?;

    let packages_path = non_empty(cli.packages.as_deref());
    let packages = read_package_list(packages_path)?;
    if packages_path.is_some() {
        tracing::info!("Loaded {} packages from whitelist", packages.len());
    }

    let update_type = if cli.security { SECURITY_TYPE } else { "" };
    let config = FilterConfig::new(before, after)
        .with_update_type(update_type)
        .with_packages(packages);

    let renderer = match non_empty(cli.template.as_deref()) {
        Some(path) => Renderer::from_file(path)?,
        None => Renderer::new()?,
    };

    let stats = match non_empty(cli.output.as_deref()) {
        Some(output_path) => {
            let file = File::create(output_path)
                .with_context(|| format!("creating output file '{}'", output_path.display()))?;
            let mut output = BufWriter::new(file);
            let stats = run(input, &config, &renderer, &mut output, cli.digest)?;
            output.flush()?;
            tracing::info!("Written to {}", output_path.display());
            stats
        }
        None => {
            let mut output = BufWriter::new(io::stdout().lock());
            let stats = run(input, &config, &renderer, &mut output, cli.digest)?;
            output.flush()?;
            stats
        }
    };

    if let (Some(algorithm), Some(checksum)) = (cli.digest, &stats.digest) {
        eprintln!("{}: {}", algorithm.name(), checksum);
    }

    Ok(stats)
}
