//! Citation Sentiment Classifier
//!
//! Trains, evaluates and applies the citation sentiment model over the
//! citation sentiment corpus.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use scriba_core::reader::citations::{CITATION_CLASSES, read_citation_sentiment_file};
use scriba_models::{
    Classifier, ClassifierConfig, TrainingConfig, WordEmbeddings, holdout_split,
};

/// Name of the persisted model, also its artifact subdirectory.
const MODEL_NAME: &str = "citations";

/// CLI arguments
#[derive(Parser)]
#[command(name = "citation-classifier")]
#[command(about = "Sentiment classification of citation passages")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Model artifact directory
    #[arg(long, default_value = "data/models")]
    model_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Train on the full corpus and save the model
    Train {
        /// Citation sentiment corpus file
        #[arg(long, default_value = "data/citations/citation_sentiment_corpus.txt")]
        corpus: PathBuf,
        /// Pretrained word embeddings file (text format)
        #[arg(long)]
        embeddings: PathBuf,
        /// Number of folds; 1 trains a single model
        #[arg(long, default_value_t = 1)]
        fold_count: usize,
    },
    /// Train on 90% of the corpus, evaluate on the held-out 10%, save
    TrainEval {
        /// Citation sentiment corpus file
        #[arg(long, default_value = "data/citations/citation_sentiment_corpus.txt")]
        corpus: PathBuf,
        /// Pretrained word embeddings file (text format)
        #[arg(long)]
        embeddings: PathBuf,
        /// Number of folds; 1 trains a single model
        #[arg(long, default_value_t = 1)]
        fold_count: usize,
    },
    /// Classify texts with a previously saved model, printing JSON
    Classify {
        /// Texts to classify; defaults to a few sample passages
        texts: Vec<String>,
    },
}

fn sample_texts() -> Vec<String> {
    vec![
        "One successful strategy [15] computes the set-similarity involving (multi-word) \
         keyphrases about the mentions and the entities, collected from the KG."
            .to_string(),
        "Unfortunately, fewer than half of the OCs in the DAML02 OC catalog (Dias et al. 2002) \
         are suitable for use with the isochrone-fitting method because of the lack of a \
         prominent main sequence, in addition to an absence of radial velocity and \
         proper-motion data."
            .to_string(),
        "However, we found that the pairwise approach LambdaMART [41] achieved the best \
         performance on our datasets among most learning to rank algorithms."
            .to_string(),
    ]
}

fn classes() -> Vec<String> {
    CITATION_CLASSES.iter().map(|c| c.to_string()).collect()
}

fn build_classifier(embeddings_path: &PathBuf) -> Result<Classifier> {
    let embeddings = WordEmbeddings::load(embeddings_path)
        .with_context(|| format!("loading embeddings from {}", embeddings_path.display()))?;
    let config = ClassifierConfig::new(MODEL_NAME, classes())?
        .with_word_embedding_size(embeddings.dim())?;
    Ok(Classifier::new(config, TrainingConfig::default(), embeddings)?)
}

fn train(cli: &Cli, corpus: &PathBuf, embeddings: &PathBuf, fold_count: usize) -> Result<()> {
    info!("loading citation sentiment corpus...");
    let (x, y) = read_citation_sentiment_file(corpus)?;
    info!(texts = x.len(), "corpus loaded");

    let mut model = build_classifier(embeddings)?;
    if fold_count == 1 {
        model.train(&x, &y, None)?;
    } else {
        model.train_nfold(&x, &y, fold_count, None)?;
    }
    let saved = model.save(&cli.model_dir)?;
    println!("model saved under {}", saved.display());
    Ok(())
}

fn train_eval(cli: &Cli, corpus: &PathBuf, embeddings: &PathBuf, fold_count: usize) -> Result<()> {
    info!("loading citation sentiment corpus...");
    let (x, y) = read_citation_sentiment_file(corpus)?;

    let (x_train, y_train, x_test, y_test) = holdout_split(&x, &y, 0.9, 42);
    info!(train = x_train.len(), test = x_test.len(), "corpus split");

    let mut model = build_classifier(embeddings)?;
    if fold_count == 1 {
        model.train(&x_train, &y_train, None)?;
    } else {
        model.train_nfold(&x_train, &y_train, fold_count, None)?;
    }

    let report = model.eval(&x_test, &y_test)?;
    println!("{report}");

    let saved = model.save(&cli.model_dir)?;
    println!("model saved under {}", saved.display());
    Ok(())
}

fn classify(cli: &Cli, texts: Vec<String>) -> Result<()> {
    let texts = if texts.is_empty() { sample_texts() } else { texts };

    let model = Classifier::load(&cli.model_dir, MODEL_NAME)?;
    let start = Instant::now();
    let probabilities = model.predict_proba(&texts)?;
    let runtime = (start.elapsed().as_secs_f64() * 1000.0).round() / 1000.0;

    let classifications: Vec<serde_json::Value> = texts
        .iter()
        .zip(&probabilities)
        .map(|(text, scores)| {
            let mut entry = serde_json::Map::new();
            entry.insert("text".to_string(), serde_json::json!(text));
            for (class, score) in CITATION_CLASSES.iter().zip(scores) {
                entry.insert(class.to_string(), serde_json::json!(score));
            }
            serde_json::Value::Object(entry)
        })
        .collect();

    let result = serde_json::json!({
        "model": MODEL_NAME,
        "classifications": classifications,
        "runtime": runtime,
    });
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Train { corpus, embeddings, fold_count } => {
            if *fold_count < 1 {
                bail!("fold-count should be equal or more than 1");
            }
            train(&cli, corpus, embeddings, *fold_count)
        }
        Commands::TrainEval { corpus, embeddings, fold_count } => {
            if *fold_count < 1 {
                bail!("fold-count should be equal or more than 1");
            }
            train_eval(&cli, corpus, embeddings, *fold_count)
        }
        Commands::Classify { texts } => classify(&cli, texts.clone()),
    }
}
