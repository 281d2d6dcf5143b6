use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use indicatif::{ProgressBar, ProgressStyle};

use plantcare_core::config::{Config, Settings};
use plantcare_core::dataset::DatasetSource;
use plantcare_core::logging;
use plantcare_core::traits::DocumentStore;
use plantcare_rag::{shared_store, KnowledgeLoader, Mode, TipsGenerator};

const USAGE: &str = "Usage: plantcare <tips|compare|lookup|search|load|stats> [args...]

  tips <species> [question]      care tips, grounded in the knowledge base when available
  compare <species> [question]   RAG and direct answers side by side
  lookup <species>               exact knowledge-base entry for a species
  search <query> [limit]         most similar knowledge-base entries
  load                           seed the knowledge base if it is empty
  stats                          knowledge-base document count";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() { eprintln!("{}", USAGE); std::process::exit(1); }
    let cmd = args.remove(0);
    (cmd, args)
}

fn arg<'a>(args: &'a [String], i: usize, usage: &str) -> anyhow::Result<&'a str> {
    args.get(i).map(String::as_str).filter(|s| !s.trim().is_empty()).ok_or_else(|| anyhow!("Usage: plantcare {}", usage))
}

fn with_spinner<T>(msg: &str, f: impl FnOnce() -> T) -> T {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") { pb.set_style(style); }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    let out = f();
    pb.finish_and_clear();
    out
}

fn loader(settings: &Settings) -> KnowledgeLoader {
    KnowledgeLoader::new(DatasetSource::from_option(settings.data.dataset_path()))
}

/// Shared store, seeded if empty.
fn knowledge_base(settings: &Settings) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let store = shared_store(&settings.store, &settings.embed)?;
    with_spinner("Preparing knowledge base...", || loader(settings).load_if_empty(store.as_ref()))?;
    Ok(store)
}

fn main() -> anyhow::Result<()> {
    let settings = Config::load().and_then(|c| c.settings()).context("Error loading config")?;
    logging::init(&settings.logging);
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "tips" => {
            let species = arg(&args, 0, "tips <species> [question]")?;
            let question = args.get(1).map(String::as_str);
            let tips = TipsGenerator::from_settings(&settings)?;
            if tips.mode() == Mode::Direct { eprintln!("⚠️  Knowledge base unavailable, answering without retrieval"); }
            let answer = with_spinner(&format!("Generating care tips for {}...", species), || tips.generate_tips(species, question))?;
            println!("🌿 Care tips for {}\n\n{}", species, answer);
        }
        "compare" => {
            let species = arg(&args, 0, "compare <species> [question]")?;
            let question = args.get(1).map(String::as_str);
            let tips = TipsGenerator::from_settings(&settings)?;
            let cmp = with_spinner("Generating both answers...", || tips.compare(species, question))?;
            println!("📚 Retrieved context ({} documents)", cmp.context.len());
            for doc in &cmp.context { println!("  - {} [{}]", doc.species, doc.id); }
            match &cmp.rag {
                Some(answer) => println!("\n=== With retrieval ===\n{}", answer),
                None => println!("\n=== With retrieval ===\n(unavailable)"),
            }
            println!("\n=== Direct ===\n{}", cmp.direct);
        }
        "lookup" => {
            let species = arg(&args, 0, "lookup <species>")?;
            let store = knowledge_base(&settings)?;
            match store.find_exact(species)? {
                Some(doc) => {
                    println!("✅ {} [{}] source={}", doc.species, doc.id, doc.metadata.source);
                    if let Some(section) = &doc.metadata.section { println!("   section={}", section); }
                    println!("\n{}", doc.text);
                }
                None => println!("No exact match for '{}'. Try: plantcare search \"{}\"", species, species),
            }
        }
        "search" => {
            let query = arg(&args, 0, "search <query> [limit]")?;
            let limit = match args.get(1) { Some(n) => n.parse::<usize>().context("limit must be a positive integer")?, None => 3 };
            let store = knowledge_base(&settings)?;
            let hits = store.find_similar(query, limit.max(1))?;
            if hits.is_empty() { println!("No similar plants found for '{}'", query); }
            for (rank, hit) in hits.iter().enumerate() {
                println!("{:>2}. {:.3}  {} [{}]", rank + 1, hit.score, hit.document.species, hit.document.id);
            }
        }
        "load" => {
            let store = shared_store(&settings.store, &settings.embed)?;
            let added = with_spinner("Loading plant care data...", || loader(&settings).load_if_empty(store.as_ref()))?;
            if added == 0 { println!("Knowledge base already populated"); } else { println!("✅ Loaded {} documents", added); }
            println!("📊 total_documents: {}", store.stats()?.total_documents);
        }
        "stats" => {
            let store = shared_store(&settings.store, &settings.embed)?;
            println!("📊 total_documents: {}", store.stats()?.total_documents);
        }
        _ => { eprintln!("Unknown command: {}\n\n{}", cmd, USAGE); std::process::exit(1); }
    }
    Ok(())
}
