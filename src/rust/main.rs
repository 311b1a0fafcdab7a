use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde::Deserialize;

use pictionary::{
    ClassifierAdapter, ClassifierError, DirectorySink, GuessOutcome, LabelDistribution, ModelError, ModelManager,
    OnnxModelConfig, OnnxSketchModel, PipelineConfig, RuntimeConfig, SketchSession, StrokePoint,
};

#[derive(Parser)]
#[command(author, version, about = "Guess the animal in a sketch", long_about = None)]
struct Args {
    /// JSON files of normalized points, `[[x, y], ...]`; a guess is made after each
    #[arg(required = true)]
    strokes: Vec<PathBuf>,

    /// Path of an ONNX model file
    #[arg(short, long, conflicts_with = "model_name")]
    model: Option<PathBuf>,

    /// Name of an installed model in the models directory
    #[arg(short = 'n', long)]
    model_name: Option<String>,

    /// Models directory, instead of $PICTIONARY_MODELS or the cache dir
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Expected SHA-256 of the model file
    #[arg(long)]
    sha256: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Confidence threshold above which a percentage is shown
    #[arg(short, long)]
    threshold: Option<f32>,

    /// Write every normalized raster as a PNG into this directory
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Print the full distribution, most likely label first
    #[arg(long)]
    top: bool,

    /// Start a fresh drawing for every strokes file
    #[arg(long)]
    clear: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    pipeline: PipelineConfig,
    model: OnnxModelConfig,
    runtime: RuntimeConfig,
}

fn read_config(path: Option<&Path>) -> Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    let config = serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

fn read_strokes(path: &Path) -> Result<Vec<StrokePoint>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading strokes {}", path.display()))?;
    let points: Vec<[f32; 2]> =
        serde_json::from_str(&text).with_context(|| format!("parsing strokes {}", path.display()))?;
    Ok(points.into_iter().map(StrokePoint::from).collect())
}

/// Finds the model file and, for installed models, their label list
fn resolve_model(args: &Args) -> Result<Option<(PathBuf, Option<Vec<String>>)>, ModelError> {
    if let Some(path) = &args.model {
        if let Some(expected) = &args.sha256 {
            ModelManager::verify_file(path, expected)?;
        }
        return Ok(Some((path.clone(), None)));
    }

    let Some(name) = &args.model_name else {
        return Ok(None);
    };
    let manager = match &args.models_dir {
        Some(dir) => ModelManager::new(dir)?,
        None => ModelManager::new_default()?,
    };
    info!("Looking for model '{}' in {}", name, manager.models_dir().display());
    let path = manager.resolve_model(name, args.sha256.as_deref())?;
    let labels = manager.load_labels(name)?;
    Ok(Some((path, labels)))
}

/// Loads the classifier. Any problem finding, verifying or loading the model
/// leaves the adapter unavailable instead of aborting.
fn load_classifier(args: &Args, config: &FileConfig) -> ClassifierAdapter {
    let (path, labels) = match resolve_model(args) {
        Ok(Some(found)) => found,
        Ok(None) => return ClassifierAdapter::unavailable("no model given"),
        Err(e) => return ClassifierAdapter::load::<OnnxSketchModel, _>(Err(e)),
    };

    let mut builder = OnnxSketchModel::builder()
        .with_runtime_config(config.runtime.clone())
        .with_config(config.model.clone());
    if let Some(labels) = labels {
        builder = builder.with_labels(labels);
    }
    let loaded = builder.with_model_file(&path).and_then(|b| b.build());
    ClassifierAdapter::load::<_, ClassifierError>(loaded)
}

fn print_outcome(outcome: &GuessOutcome, distribution: Option<&LabelDistribution>, top: bool) {
    println!("Predicted Animal: {}", outcome.display());
    if !top {
        return;
    }
    if let Some(distribution) = distribution {
        for (label, probability) in distribution.ranked() {
            println!("    {}: {:.1}%", label, probability * 100.0);
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = read_config(args.config.as_deref())?;
    if let Some(threshold) = args.threshold {
        config.pipeline.policy.threshold = threshold;
    }

    let start_time = Instant::now();
    let classifier = load_classifier(&args, &config);
    info!("Classifier ready in {:.2?} (available: {})", start_time.elapsed(), classifier.is_available());

    let mut session = SketchSession::new(config.pipeline, classifier)?;
    if let Some(dir) = &args.debug_dir {
        let sink = DirectorySink::new(dir).with_context(|| format!("creating debug dir {}", dir.display()))?;
        session = session.with_debug_sink(sink);
    }

    for path in &args.strokes {
        if args.clear {
            session.clear();
        }
        for point in read_strokes(path)? {
            session.add_point(point);
        }
        info!("{}: {} point(s) in session", path.display(), session.strokes().len());

        let guess_start = Instant::now();
        let (outcome, distribution) = session.guess_with_distribution();
        info!("Guess took {:.2?}", guess_start.elapsed());
        print_outcome(&outcome, distribution.as_ref(), args.top);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("pictionary-cli-tests").join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn parse(args: &[&str]) -> Args {
        Args::parse_from(std::iter::once("pictionary").chain(args.iter().copied()).chain(["strokes.json"]))
    }

    #[test]
    fn test_no_model_given() {
        let classifier = load_classifier(&parse(&[]), &FileConfig::default());
        assert!(!classifier.is_available());
    }

    #[test]
    fn test_missing_models_are_unavailable_either_way() {
        let dir = scratch_dir("missing");
        let missing_path = dir.join("nope.onnx");
        let by_path = parse(&["--model", missing_path.to_str().unwrap()]);
        let by_name = parse(&["--model-name", "nope", "--models-dir", dir.to_str().unwrap()]);

        assert!(matches!(resolve_model(&by_name), Err(ModelError::NotFound(_))));
        assert!(!load_classifier(&by_path, &FileConfig::default()).is_available());
        assert!(!load_classifier(&by_name, &FileConfig::default()).is_available());
    }

    #[test]
    fn test_hash_mismatch_leaves_classifier_unavailable() {
        let dir = scratch_dir("mismatch");
        let model_path = dir.join("model.onnx");
        fs::write(&model_path, b"not a model").unwrap();
        let wrong = "0".repeat(64);
        let args = parse(&["--model", model_path.to_str().unwrap(), "--sha256", wrong.as_str()]);

        assert!(matches!(resolve_model(&args), Err(ModelError::HashMismatch { .. })));
        assert!(!load_classifier(&args, &FileConfig::default()).is_available());
    }

    #[test]
    fn test_installed_model_resolves_with_labels() {
        let dir = scratch_dir("installed");
        fs::create_dir_all(dir.join("animals")).unwrap();
        fs::write(dir.join("animals").join("model.onnx"), b"weights").unwrap();
        fs::write(dir.join("animals").join("labels.json"), r#"["cat", "cow"]"#).unwrap();
        let args = parse(&["--model-name", "animals", "--models-dir", dir.to_str().unwrap()]);

        let (path, labels) = resolve_model(&args).unwrap().unwrap();
        assert_eq!(path, dir.join("animals").join("model.onnx"));
        assert_eq!(labels, Some(vec!["cat".to_string(), "cow".to_string()]));
    }
}
