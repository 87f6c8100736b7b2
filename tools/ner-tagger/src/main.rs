//! Named Entity Recognizer
//!
//! Trains, evaluates and applies the sequence labelling model over
//! CoNLL 2003 style corpora.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use scriba_core::reader::conll::read_conll_file;
use scriba_models::{SequenceConfig, SequenceTagger, TrainingConfig, WordEmbeddings};

/// Name of the persisted model, also its artifact subdirectory.
const MODEL_NAME: &str = "ner";

/// CLI arguments
#[derive(Parser)]
#[command(name = "ner-tagger")]
#[command(about = "Named entity recognizer over CoNLL-style corpora")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Model artifact directory
    #[arg(long, default_value = "data/models")]
    model_dir: PathBuf,

    /// CoNLL training set
    #[arg(long, default_value = "data/conll/eng.train")]
    train_set: PathBuf,

    /// CoNLL validation set
    #[arg(long, default_value = "data/conll/eng.testa")]
    validation_set: PathBuf,

    /// CoNLL evaluation set
    #[arg(long, default_value = "data/conll/eng.testb")]
    test_set: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Train on train + validation sets and save the model
    Train {
        /// Pretrained word embeddings file (text format)
        #[arg(long)]
        embeddings: PathBuf,
    },
    /// Train on the training set, evaluate on the test set, save
    TrainEval {
        /// Pretrained word embeddings file (text format)
        #[arg(long)]
        embeddings: PathBuf,
        /// Number of folds; 1 trains a single model
        #[arg(long, default_value_t = 1)]
        fold_count: usize,
    },
    /// Evaluate a previously saved model on the test set
    Eval,
    /// Tag texts with a previously saved model, printing JSON
    Tag {
        /// Texts to tag; defaults to a few sample sentences
        texts: Vec<String>,
    },
}

fn sample_texts() -> Vec<String> {
    vec![
        "The University of California has found that 40 percent of its students suffer food \
         insecurity. At four state universities in Illinois, that number is 35 percent."
            .to_string(),
        "President Obama is not speaking anymore from the White House.".to_string(),
    ]
}

fn build_tagger(embeddings_path: &PathBuf) -> Result<SequenceTagger> {
    let embeddings = WordEmbeddings::load(embeddings_path)
        .with_context(|| format!("loading embeddings from {}", embeddings_path.display()))?;
    let config =
        SequenceConfig::new(MODEL_NAME)?.with_word_embedding_size(embeddings.dim())?;
    Ok(SequenceTagger::new(config, TrainingConfig::default(), embeddings)?)
}

fn train(cli: &Cli, embeddings: &PathBuf) -> Result<()> {
    info!("loading data...");
    let mut corpus = read_conll_file(&cli.train_set)?;
    let validation = read_conll_file(&cli.validation_set)?;

    // Train on the concatenation of the train and validation sets.
    corpus.sentences.extend(validation.sentences);
    corpus.labels.extend(validation.labels);
    info!(sentences = corpus.len(), "train sequences");

    let mut model = build_tagger(embeddings)?;
    let start = Instant::now();
    model.train(&corpus.sentences, &corpus.labels, None)?;
    info!(runtime = ?start.elapsed(), "training complete");

    let saved = model.save(&cli.model_dir)?;
    println!("model saved under {}", saved.display());
    Ok(())
}

fn train_eval(cli: &Cli, embeddings: &PathBuf, fold_count: usize) -> Result<()> {
    info!("loading data...");
    let corpus = read_conll_file(&cli.train_set)?;
    let test = read_conll_file(&cli.test_set)?;
    info!(train = corpus.len(), test = test.len(), "sequences loaded");

    let mut model = build_tagger(embeddings)?;
    let start = Instant::now();
    if fold_count == 1 {
        model.train(&corpus.sentences, &corpus.labels, None)?;
    } else {
        model.train_nfold(&corpus.sentences, &corpus.labels, fold_count, None)?;
    }
    info!(runtime = ?start.elapsed(), "training complete");

    println!("evaluation on test set:");
    let report = model.eval(&test.sentences, &test.labels)?;
    println!("{report}");

    let saved = model.save(&cli.model_dir)?;
    println!("model saved under {}", saved.display());
    Ok(())
}

fn eval(cli: &Cli) -> Result<()> {
    info!("loading data...");
    let test = read_conll_file(&cli.test_set)?;
    info!(sequences = test.len(), "evaluation sequences");

    let model = SequenceTagger::load(&cli.model_dir, MODEL_NAME)?;
    let start = Instant::now();
    let report = model.eval(&test.sentences, &test.labels)?;
    let runtime = (start.elapsed().as_secs_f64() * 1000.0).round() / 1000.0;
    println!("{report}");
    println!("runtime: {runtime} seconds");
    Ok(())
}

fn tag(cli: &Cli, texts: Vec<String>) -> Result<()> {
    let texts = if texts.is_empty() { sample_texts() } else { texts };

    let model = SequenceTagger::load(&cli.model_dir, MODEL_NAME)?;
    let start = Instant::now();
    let annotations = model.tag(&texts)?;
    let runtime = (start.elapsed().as_secs_f64() * 1000.0).round() / 1000.0;

    let result = serde_json::json!({
        "model": MODEL_NAME,
        "texts": annotations,
        "runtime": runtime,
    });
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Train { embeddings } => train(&cli, embeddings),
        Commands::TrainEval { embeddings, fold_count } => {
            if *fold_count < 1 {
                bail!("fold-count should be equal or more than 1");
            }
            train_eval(&cli, embeddings, *fold_count)
        }
        Commands::Eval => eval(&cli),
        Commands::Tag { texts } => tag(&cli, texts.clone()),
    }
}
