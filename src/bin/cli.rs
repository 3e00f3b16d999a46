// Announce Core - Audio clip library and announcement builder
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


use anyhow::{Context, Result};
use announce_core::audio::AudioFormat;
use announce_core::{init_logging, AudioLibrary, Category, IncomingFile, LibraryConfig};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "announce-cli")]
#[command(about = "Announce CLI - Manage the audio clip library", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Audio root directory (overrides configuration)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error, off
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List files and folders
    List,
    /// Create a folder
    Mkdir {
        /// Parent folder, e.g. /audio
        parent: String,
        name: String,
    },
    /// Rename a folder in place
    RenameFolder { path: String, new_name: String },
    /// Move a folder below another folder
    MoveFolder { source: String, target_parent: String },
    /// Delete a folder and its contents
    Rmdir { path: String },
    /// Upload a clip
    Upload {
        /// Local file to upload
        file: PathBuf,
        /// Target folder
        #[arg(short, long, default_value = "/audio")]
        to: String,
        /// Category to assign
        #[arg(long)]
        category: Option<String>,
        /// Declared media type (guessed from the extension when omitted)
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Rename a file
    Rename { path: String, new_name: String },
    /// Delete a file
    Rm { path: String },
    /// Set the category of a file
    Category { path: String, category: String },
    /// Concatenate clips into a new announcement at the library root
    Concat {
        /// Output file name, e.g. final.mp3
        output: String,
        /// Input clips in playback order
        #[arg(required = true)]
        inputs: Vec<String>,
    },
    /// Reconcile the metadata index with the audio root
    Scan,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let mut config = LibraryConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(root) = cli.root {
        config.audio_root = root;
    }
    let library = AudioLibrary::open(config)
        .await
        .context("opening audio library")?;

    match cli.command {
        Commands::List => print_json(&library.list().await)?,
        Commands::Mkdir { parent, name } => {
            print_json(&library.create_folder(&parent, &name).await?)?
        }
        Commands::RenameFolder { path, new_name } => {
            print_json(&library.rename_folder(&path, &new_name).await?)?
        }
        Commands::MoveFolder {
            source,
            target_parent,
        } => print_json(&library.move_folder(&source, &target_parent).await?)?,
        Commands::Rmdir { path } => {
            library.delete_folder(&path).await?;
            print_json(&serde_json::json!({}))?
        }
        Commands::Upload {
            file,
            to,
            category,
            content_type,
        } => {
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .context("upload path has no file name")?;
            let content_type = content_type
                .or_else(|| AudioFormat::from_name(&file_name).map(|f| f.mime_type().to_string()))
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let category = category
                .map(|c| {
                    c.parse::<Category>()
                        .map_err(|c| anyhow::anyhow!("unknown category '{}'", c))
                })
                .transpose()?;
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;

            let incoming = IncomingFile::new(file_name, content_type, bytes);
            print_json(&library.upload_file(&to, &incoming, category).await?)?
        }
        Commands::Rename { path, new_name } => {
            print_json(&library.rename_file(&path, &new_name).await?)?
        }
        Commands::Rm { path } => {
            library.delete_file(&path).await?;
            print_json(&serde_json::json!({}))?
        }
        Commands::Category { path, category } => {
            print_json(&library.set_category(&path, &category).await?)?
        }
        Commands::Concat { output, inputs } => {
            print_json(&library.concatenate(&inputs, &output).await?)?
        }
        Commands::Scan => print_json(&library.scan().await?)?,
    }

    Ok(())
}
