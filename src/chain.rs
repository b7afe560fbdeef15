//! Summarization chain over loaded documents.

use crate::error::{Error, Result};
use crate::llm::LlmClient;
use crate::loader::Document;
use serde::Serialize;
use std::str::FromStr;
use tracing::info;

const STUFF_PROMPT: &str = "Write a concise summary of the following:\n\n\n\"{text}\"\n\n\nCONCISE SUMMARY:";

const DOCUMENT_SEPARATOR: &str = "\n\n";

/// How documents are combined before summarization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainType {
    /// Concatenate every document into one prompt.
    #[default]
    Stuff,
}

impl FromStr for ChainType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "stuff" => Ok(Self::Stuff),
            other => Err(Error::config(format!(
                "unsupported chain type '{other}' (supported: stuff)"
            ))),
        }
    }
}

/// Raw chain result; `--debug` prints this as-is.
#[derive(Debug, Clone, Serialize)]
pub struct ChainOutput {
    pub input_documents: Vec<Document>,
    pub output_text: String,
}

pub struct SummarizeChain<'a> {
    llm: &'a LlmClient,
    chain_type: ChainType,
}

impl<'a> SummarizeChain<'a> {
    pub fn load(llm: &'a LlmClient, chain_type: ChainType) -> Self {
        Self { llm, chain_type }
    }

    pub async fn invoke(&self, docs: Vec<Document>) -> Result<ChainOutput> {
        let prompt = match self.chain_type {
            ChainType::Stuff => stuff_prompt(&docs),
        };
        info!(
            documents = docs.len(),
            prompt_chars = prompt.len(),
            model = %self.llm.model(),
            "summarizing"
        );

        let output_text = self.llm.complete(&prompt).await?.trim().to_string();
        Ok(ChainOutput {
            input_documents: docs,
            output_text,
        })
    }
}

fn stuff_prompt(docs: &[Document]) -> String {
    let text = docs
        .iter()
        .map(|d| d.page_content.as_str())
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR);
    STUFF_PROMPT.replace("{text}", &text)
}
