//! Command line host for running a stage over a batch of requests

use anyhow::{anyhow, Result};
use burn::{backend::NdArray, config::Config};
use pico_args::Arguments;
use text_pipeline_stages::{
    pipelines::{
        label_decoding::Decoder, tokenization::Batcher, ItemResult, Pipeline, Request, Stage,
        StageConfig,
    },
    utils::{files, hugging_face},
};

const HELP: &str = "\
Usage: infer PIPELINE [OPTIONS]

Arguments:
  PIPELINE             The stage to run ('tokenizer' or 'label-decoder')

Options:
  -h, --help           Print help
  -c, --config         A JSON stage config to start from
  -t, --tokenizer      A tokenizer.json path or Hugging Face model id
  -l, --labels         A file with one label per line
      --labels-from    A Hugging Face model id whose config.json holds id2label
  -n, --max-length     The fixed sequence length of every encoded row
  -i, --input          Read input lines from this file instead of stdin

The tokenizer reads one text per line. The label decoder reads one JSON array of logits
per line, e.g. [-2.1, 3.4]. Each response is printed as one JSON line.
";

#[derive(Debug)]
struct Args {
    /// Prints the usage menu
    help: bool,

    /// The stage to run
    pipeline: Option<String>,

    /// A JSON stage config
    config: Option<String>,

    /// The tokenizer source
    tokenizer: Option<String>,

    /// A label vocabulary file
    labels: Option<String>,

    /// A Hugging Face model to read the label vocabulary from
    labels_from: Option<String>,

    /// The fixed sequence length
    max_length: Option<usize>,

    /// The input file
    input: Option<String>,
}

fn parse_args() -> Result<Args, pico_args::Error> {
    let mut pargs = Arguments::from_env();

    let args = Args {
        help: pargs.contains(["-h", "--help"]),
        config: pargs.opt_value_from_str(["-c", "--config"])?,
        tokenizer: pargs.opt_value_from_str(["-t", "--tokenizer"])?,
        labels: pargs.opt_value_from_str(["-l", "--labels"])?,
        labels_from: pargs.opt_value_from_str("--labels-from")?,
        max_length: pargs.opt_value_from_str(["-n", "--max-length"])?,
        input: pargs.opt_value_from_str(["-i", "--input"])?,
        pipeline: pargs.opt_free_from_str()?,
    };

    Ok(args)
}

async fn stage_config(args: &Args) -> Result<StageConfig> {
    let mut config = match &args.config {
        Some(path) => StageConfig::load(path)
            .map_err(|e| anyhow!("Unable to read stage config {}: {}", path, e))?,
        None => StageConfig::new(),
    };

    if let Some(tokenizer) = &args.tokenizer {
        config.tokenizer_source = tokenizer.clone();
    }

    if let Some(max_length) = args.max_length {
        config.max_sequence_length = max_length;
    }

    if let Some(path) = &args.labels {
        config.label_vocabulary = files::read_labels(path).await?;
    } else if let Some(model) = &args.labels_from {
        config.label_vocabulary = hugging_face::hf_labels(model).await?;
    }

    Ok(config)
}

async fn read_input(args: &Args) -> Result<Vec<String>> {
    let lines = match &args.input {
        Some(path) => files::read_file(path).await?,
        None => files::read_lines(tokio::io::stdin()).await?,
    };

    Ok(lines)
}

fn requests(pipeline: Pipeline, lines: Vec<String>) -> Result<Vec<Request>> {
    match pipeline {
        Pipeline::Tokenizer => Ok(lines.into_iter().map(Request::text).collect()),
        Pipeline::LabelDecoder => lines
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let row: Vec<f32> = serde_json::from_str(line)
                    .map_err(|e| anyhow!("Invalid logits row {:?}: {}", line, e))?;

                Ok(Request::with_logits(vec![row]))
            })
            .collect(),
    }
}

fn print_responses(responses: Vec<ItemResult>) -> Result<()> {
    for response in responses {
        let line = match response {
            Ok(response) => serde_json::to_string(&response)?,
            Err(error) => serde_json::json!({ "error": error.to_string() }).to_string(),
        };

        println!("{}", line);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = parse_args()?;

    if args.help {
        println!("{}", HELP);
        return Ok(());
    }

    let pipeline = match &args.pipeline {
        Some(pipeline) => Pipeline::try_from(pipeline.as_str())?,
        None => {
            println!("{}", HELP);
            return Err(anyhow!("Missing required argument: PIPELINE"));
        }
    };

    let config = stage_config(&args).await?;
    let requests = requests(pipeline, read_input(&args).await?)?;

    log::info!("Running {} over {} requests", pipeline, requests.len());

    let responses = match pipeline {
        Pipeline::Tokenizer => Batcher::<NdArray>::initialize(config)?.execute(requests)?,
        Pipeline::LabelDecoder => Decoder::initialize(config)?.execute(requests)?,
    };

    print_responses(responses)
}
