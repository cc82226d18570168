use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "linkscope")]
#[command(about = "Internal-link opportunity and content similarity analysis for crawled pages")]
#[command(version)]
pub struct Args {
    /// HTML file of the page to analyze
    pub html_file: PathBuf,

    /// URL the page was crawled from
    #[arg(short, long)]
    pub url: String,

    /// Page title (defaults to <title> or the first <h1>)
    #[arg(short, long)]
    pub title: Option<String>,

    /// Other page of the site as URL=FILE, used for similarity and clustering
    #[arg(short, long = "peer", value_parser = parse_peer)]
    pub peers: Vec<(String, PathBuf)>,

    /// Path to a JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Skip embedding, similarity and clustering
    #[arg(long)]
    pub no_semantic: bool,

    /// Never contact the embedding service
    #[arg(long)]
    pub offline: bool,

    /// Embedding service endpoint
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

/// Split `URL=FILE` on the last `=` so query strings survive
pub fn parse_peer(value: &str) -> Result<(String, PathBuf), String> {
    match value.rsplit_once('=') {
        Some((url, file)) if !url.is_empty() && !file.is_empty() => {
            Ok((url.to_string(), PathBuf::from(file)))
        }
        _ => Err(format!("expected URL=FILE, got '{value}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_peer() {
        let (url, file) = parse_peer("https://e.com/search?q=fees=pages/fees.html").unwrap();
        assert_eq!(url, "https://e.com/search?q=fees");
        assert_eq!(file, PathBuf::from("pages/fees.html"));
        assert!(parse_peer("no-separator").is_err());
        assert!(parse_peer("https://e.com/=").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "linkscope",
            "page.html",
            "--url",
            "https://e.com/learn/staking",
            "--peer",
            "https://e.com/fees=fees.html",
            "--format",
            "text",
            "--no-semantic",
        ])
        .unwrap();
        assert_eq!(args.peers.len(), 1);
        assert_eq!(args.format, OutputFormat::Text);
        assert!(args.no_semantic);
        assert!(!args.offline);
    }
}
