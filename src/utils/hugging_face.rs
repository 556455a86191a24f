use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use hf_hub::api::tokio::Api;
use serde::Deserialize;

/// The part of a model `config.json` that describes its classes
#[derive(Debug, Deserialize)]
struct ModelConfig {
    #[serde(default)]
    id2label: BTreeMap<String, String>,
}

/// Download a model config from Hugging Face Hub
/// If file exists in cache, it will not be downloaded again
pub async fn download_hf_config(model_name: &str) -> anyhow::Result<PathBuf> {
    let api = Api::new()?;
    let repo = api.model(model_name.to_string());

    repo.get("config.json").await.map_err(|e| {
        anyhow!(
            "Failed to download: {} config with name: config.json from HuggingFace Hub: {}",
            model_name,
            e
        )
    })
}

/// Read the ordered label vocabulary from the `id2label` map of a model config
pub async fn read_id2label(config_file: &Path) -> anyhow::Result<Vec<String>> {
    let contents = tokio::fs::read_to_string(config_file).await?;
    let config: ModelConfig = serde_json::from_str(&contents)?;

    let mut classes = config
        .id2label
        .into_iter()
        .map(|(id, label)| -> anyhow::Result<(usize, String)> {
            let id = id
                .parse::<usize>()
                .map_err(|e| anyhow!("Invalid class id {:?} in id2label: {}", id, e))?;

            Ok((id, label))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    if classes.is_empty() {
        return Err(anyhow!(
            "No id2label map found in {}",
            config_file.display()
        ));
    }

    classes.sort_by_key(|(id, _)| *id);

    if let Some((position, (id, _))) = classes
        .iter()
        .enumerate()
        .find(|(position, (id, _))| position != id)
    {
        return Err(anyhow!(
            "Class ids in id2label must be contiguous from 0, expected {} but found {}",
            position,
            id
        ));
    }

    Ok(classes.into_iter().map(|(_, label)| label).collect())
}

/// Fetch the label vocabulary of a Hugging Face model
pub async fn hf_labels(model_name: &str) -> anyhow::Result<Vec<String>> {
    let config_file = download_hf_config(model_name).await?;

    read_id2label(&config_file).await
}
