//! CLI module for tkgraph.
//!
//! Subcommands:
//! - `init`: Create graph constraints and indexes
//! - `ingest`: Ingest a document into the temporal graph
//! - `query`: Retrieve evidence for a question, optionally answering it
//! - `explore`: Answer a question with the iterative Cypher agent

mod explore;
mod ingest;
mod init;
mod query;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// tkgraph - Temporal knowledge graph
#[derive(Parser)]
#[command(name = "tkgraph")]
#[command(about = "Temporal knowledge graph - ingest documents and answer time-aware questions")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create constraints, the full-text index and vector indexes
    Init,

    /// Ingest a text document
    Ingest {
        /// Path of the document to ingest
        file: PathBuf,

        /// Source id recorded on chunks and relations
        #[arg(long)]
        source: Option<String>,
    },

    /// Retrieve ranked evidence for a question
    Query {
        question: String,

        /// Also generate an answer from the evidence
        #[arg(long)]
        answer: bool,
    },

    /// Answer a question by letting the model query the graph
    Explore {
        question: String,

        /// Maximum model turns (defaults to agent.max_steps)
        #[arg(long)]
        max_steps: Option<usize>,
    },
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> color_eyre::Result<()> {
        match &self.command {
            Command::Init => self.run_init().await,
            Command::Ingest { file, source } => self.run_ingest(file, source.as_deref()).await,
            Command::Query { question, answer } => self.run_query(question, *answer).await,
            Command::Explore {
                question,
                max_steps,
            } => self.run_explore(question, *max_steps).await,
        }
    }
}
