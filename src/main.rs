use clap::Parser;
use linkscope::{AnalysisError, Analyzer, AnalysisStatus, PageInput, ReportRecord};
use std::path::Path;
use std::process::ExitCode;

mod args;
use args::{Args, OutputFormat};

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr, the report to stdout
    env_logger::init();

    let args = Args::parse();
    ::log::info!("Analyzing {} from {}", args.url, args.html_file.display());

    let record = run(&args).await;
    let rendered = match args.format {
        OutputFormat::Json => match record.to_json() {
            Ok(json) => json,
            Err(e) => {
                ::log::error!("Failed to serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        },
        OutputFormat::Text => record.to_text(),
    };
    println!("{rendered}");

    if record.text("status") == Some(AnalysisStatus::Error.as_str()) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn run(args: &Args) -> ReportRecord {
    let mut analyzer = Analyzer::new();
    if let Some(path) = &args.config {
        analyzer = match analyzer.with_config_file(path) {
            Ok(analyzer) => analyzer,
            Err(e) => {
                ::log::error!("Failed to load config {}: {}", path.display(), e);
                return ReportRecord::from_error(&args.url, &e);
            }
        };
    }
    analyzer = analyzer
        .with_env()
        .with_semantic(!args.no_semantic)
        .offline(args.offline);
    if let Some(endpoint) = &args.endpoint {
        analyzer = analyzer.with_endpoint(endpoint);
    }

    let mut page = match read_page(&args.url, &args.html_file) {
        Ok(page) => page,
        Err(e) => return ReportRecord::from_error(&args.url, &e),
    };
    if let Some(title) = &args.title {
        page = page.with_title(title.as_str());
    }

    let mut peers = Vec::with_capacity(args.peers.len());
    for (url, path) in &args.peers {
        match read_page(url, path) {
            Ok(peer) => peers.push(peer),
            Err(e) => ::log::warn!("Skipping peer {}: {}", url, e),
        }
    }

    let start_time = std::time::Instant::now();
    let record = analyzer.analyze(&page, &peers).await;
    ::log::info!(
        "Analysis complete in {:.2} seconds with {} peers",
        start_time.elapsed().as_secs_f64(),
        peers.len()
    );
    record
}

fn read_page(url: &str, path: &Path) -> Result<PageInput, AnalysisError> {
    let html = std::fs::read_to_string(path)?;
    Ok(PageInput::new(url, html))
}
