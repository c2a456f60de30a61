use anyhow::{bail, Context, Result};
use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::built_info;
use crate::error::ModuleError;
use crate::model::deepar::{DeepArConfig, DeepArModel};
use crate::model::mqf2::{Mqf2Config, Mqf2MultiHorizonModel};
use crate::model::simple_feedforward::{SimpleFeedForwardConfig, SimpleFeedForwardModel};

/// A module that can be rebuilt from a serializable configuration.
pub trait ConfiguredModel<B: Backend>: Module<B> + Sized {
    type Config: Serialize + DeserializeOwned;

    /// Name stored in the metadata to guard against loading the wrong model.
    const KIND: &'static str;

    fn model_config(&self) -> &Self::Config;

    fn from_config(config: &Self::Config, device: &B::Device) -> Result<Self, ModuleError>;
}

impl<B: Backend> ConfiguredModel<B> for DeepArModel<B> {
    type Config = DeepArConfig;
    const KIND: &'static str = "deepar";

    fn model_config(&self) -> &Self::Config {
        self.config()
    }

    fn from_config(config: &Self::Config, device: &B::Device) -> Result<Self, ModuleError> {
        DeepArModel::new(config.clone(), device)
    }
}

impl<B: Backend> ConfiguredModel<B> for Mqf2MultiHorizonModel<B> {
    type Config = Mqf2Config;
    const KIND: &'static str = "mqf2";

    fn model_config(&self) -> &Self::Config {
        self.config()
    }

    fn from_config(config: &Self::Config, device: &B::Device) -> Result<Self, ModuleError> {
        Mqf2MultiHorizonModel::new(config.clone(), device)
    }
}

impl<B: Backend> ConfiguredModel<B> for SimpleFeedForwardModel<B> {
    type Config = SimpleFeedForwardConfig;
    const KIND: &'static str = "simple_feedforward";

    fn model_config(&self) -> &Self::Config {
        self.config()
    }

    fn from_config(config: &Self::Config, device: &B::Device) -> Result<Self, ModuleError> {
        SimpleFeedForwardModel::new(config.clone(), device)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ModelMetadata {
    pub version: String,
    pub timestamp: u64,
    pub kind: String,
    pub config: serde_json::Value,
}

impl ModelMetadata {
    pub fn new(kind: &str, config: serde_json::Value) -> Self {
        Self {
            version: built_info::PKG_VERSION.to_string(),
            timestamp: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            kind: kind.to_string(),
            config,
        }
    }
}

/// Append `suffix` to the file name, keeping any dots already in it.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Save the model weights to `path.bin` and its metadata to `path.meta.json`.
pub fn save_model_with_metadata<B: Backend, M: ConfiguredModel<B>>(
    model: &M,
    path: impl AsRef<Path>,
) -> Result<ModelMetadata> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create model parent directory")?;
    }

    let config = serde_json::to_value(model.model_config())
        .context("Failed to serialize model configuration")?;
    let metadata = ModelMetadata::new(M::KIND, config);

    let model_path = with_suffix(path, ".bin");
    model
        .clone()
        .save_file::<BinFileRecorder<FullPrecisionSettings>, _>(&model_path, &Default::default())
        .context("Failed to save model")?;

    let metadata_path = with_suffix(path, ".meta.json");
    let metadata_json =
        serde_json::to_string_pretty(&metadata).context("Failed to serialize metadata")?;
    std::fs::write(&metadata_path, metadata_json).context("Failed to write metadata file")?;

    info!("Saved {} model to {}", M::KIND, model_path.display());
    Ok(metadata)
}

/// Rebuild a model from its stored configuration and load its weights.
pub fn load_model_with_metadata<B: Backend, M: ConfiguredModel<B>>(
    path: impl AsRef<Path>,
    device: &B::Device,
) -> Result<(M, ModelMetadata)> {
    let path = path.as_ref();

    let metadata_path = with_suffix(path, ".meta.json");
    let metadata_json =
        std::fs::read_to_string(&metadata_path).context("Failed to read metadata file")?;
    let metadata: ModelMetadata =
        serde_json::from_str(&metadata_json).context("Failed to parse metadata")?;

    if metadata.kind != M::KIND {
        bail!(
            "Model file holds a '{}' model, expected '{}'",
            metadata.kind,
            M::KIND
        );
    }

    let config: M::Config = serde_json::from_value(metadata.config.clone())
        .context("Failed to parse model configuration")?;
    let model = M::from_config(&config, device).context("Failed to rebuild model")?;

    let model_path = with_suffix(path, ".bin");
    let model = model
        .load_file::<BinFileRecorder<FullPrecisionSettings>, _>(&model_path, &Default::default(), device)
        .context("Failed to load model")?;

    info!("Loaded {} model from {}", M::KIND, model_path.display());
    Ok((model, metadata))
}
