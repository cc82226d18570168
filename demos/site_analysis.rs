use linkscope::{Analyzer, PageInput};
use std::error::Error;

const PAGES: &[(&str, &str, &str)] = &[
    (
        "https://example.com/learn/what-is-staking",
        "What is staking",
        "Staking lets holders lock coins with a validator and earn rewards for securing the \
         network. Rewards depend on validator uptime, commission and the total amount staked. \
         Unbonding periods mean staked funds cannot be withdrawn instantly.",
    ),
    (
        "https://example.com/learn/staking-risks",
        "Staking risks",
        "Validators that misbehave are slashed and delegators lose part of their stake. \
         Unbonding periods lock funds, and validator commission can change without notice. \
         Spread delegation across several validators to reduce slashing exposure.",
    ),
    (
        "https://example.com/fees",
        "Trading fees",
        "Spot trading fees depend on your thirty day volume. Makers pay less than takers and \
         holding the platform token lowers fees further. Withdrawal fees vary by network.",
    ),
];

fn page_html(title: &str, body: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#" See <a href="{href}">{href}</a>."#))
        .collect();
    format!(
        "<html><head><title>{title}</title></head><body>\
         <nav><a href=\"/\">Home</a><a href=\"/markets\">Markets</a></nav>\
         <article><h1>{title}</h1><p>{body}{anchors}</p><p>{body}</p></article>\
         <footer><a href=\"/legal/terms\">Terms</a></footer></body></html>"
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let pages: Vec<PageInput> = PAGES
        .iter()
        .map(|(url, title, body)| PageInput::new(*url, page_html(title, body, &["/learn"])))
        .collect();

    // Fallback embeddings only, so the demo runs without an embedding service
    let analyzer = Analyzer::new().with_env().offline(true);
    let mut session = analyzer.session()?;

    for page in &pages {
        let record = analyzer.analyze_with(&mut session, page, &pages).await;
        println!("{}\n", record.to_text());
    }

    let stats = session.stats();
    println!(
        "fallback vectors: {}, cache hits: {}",
        stats.fallback_generations, stats.cache_hits
    );
    Ok(())
}
