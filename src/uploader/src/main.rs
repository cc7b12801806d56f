// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Uploads a local file to Backblaze B2.

const DESCRIPTION: &str = concat!(
    "Uploads a local file to Backblaze B2. Small files are uploaded with a",
    " single request, larger files are uploaded as large files, with several",
    " parts in flight. The application key is read from the",
    " B2_APPLICATION_KEY_ID and B2_APPLICATION_KEY environment variables.",
    " On success the uploaded file is printed as JSON."
);

use b2_storage::client::Storage;
use b2_storage::model::File;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = enable_tracing();

    let args = Args::parse();
    tracing::info!("{args:?}");

    let client = Storage::builder().build().await?;
    let source = tokio::fs::File::open(&args.file).await?;
    let upload = client
        .upload_object(args.bucket_id.clone(), args.name.clone(), source)
        .with_file_info(args.info.clone())
        .with_cancel_on_error(!args.keep_on_error);
    let upload = match args.content_type {
        Some(ref v) => upload.with_content_type(v),
        None => upload,
    };
    let upload = match args.part_size {
        Some(v) => upload.with_part_size(v),
        None => upload,
    };
    let upload = match args.concurrency {
        Some(v) => upload.with_concurrency(v),
        None => upload,
    };
    let upload = match args.resume_file_id {
        Some(ref id) => upload.with_resume(
            File::new()
                .set_file_id(id)
                .set_file_name(&args.name)
                .set_bucket_id(&args.bucket_id),
        ),
        None => upload,
    };

    let file = upload.send().await?;
    tracing::info!(file_id = %file.file_id, "DONE");
    println!("{}", serde_json::to_string_pretty(&file)?);
    Ok(())
}

fn enable_tracing() -> tracing::dispatcher::DefaultGuard {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_level(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_default(subscriber)
}

/// Uploads a local file to Backblaze B2.
#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = DESCRIPTION)]
struct Args {
    /// The bucket receiving the object.
    #[arg(long)]
    bucket_id: String,

    /// The object name.
    #[arg(long)]
    name: String,

    /// The MIME type of the object.
    ///
    /// When not set the service guesses the type from the object name.
    #[arg(long)]
    content_type: Option<String>,

    /// Overrides the part size recommended by the service, e.g. `100MiB`.
    #[arg(long, value_parser = parse_size_arg)]
    part_size: Option<u64>,

    /// The maximum number of parts uploaded in parallel.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Continue the large file with this id, skipping the parts already
    /// uploaded.
    #[arg(long)]
    resume_file_id: Option<String>,

    /// Custom metadata, in `key=value` format. May be repeated.
    #[arg(long, value_parser = parse_info_arg)]
    info: Vec<(String, String)>,

    /// Keep the large file if the upload fails, so it can be resumed.
    #[arg(long, default_value_t = false)]
    keep_on_error: bool,

    /// The local file to upload.
    file: std::path::PathBuf,
}

fn parse_size_arg(arg: &str) -> anyhow::Result<u64> {
    let value = parse_size::parse_size(arg)?;
    Ok(value)
}

fn parse_info_arg(arg: &str) -> anyhow::Result<(String, String)> {
    match arg.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(anyhow::Error::msg(format!(
            "invalid file info `{arg}`, expected `key=value`"
        ))),
    }
}
