// ============================================================
// Layer 4 — Text Corpus Loader
// ============================================================
// The bundled dataset provider. Reads three plain-text split files
// from a directory and turns each into one flat token stream.
//
// Accepted file names (first match wins):
//   train: train.txt | wiki.train.raw
//   valid: valid.txt | wiki.valid.raw
//   test:  test.txt  | wiki.test.raw
//
// Per line:
//   1. encode with the word-level tokenizer
//   2. skip lines that produce no tokens (blank lines)
//   3. append <eos> and concatenate onto the stream
//
// The vocabulary comes from the training lines only; see
// infra::tokenizer_store.
//
// Reference: Rust Book §9 (Error Handling), §12 (I/O)

use std::{fs, path::{Path, PathBuf}};

use anyhow::{Context, Result};
use tokenizers::Tokenizer;

use crate::data::dataset::TokenSplits;
use crate::domain::traits::TokenSource;
use crate::infra::tokenizer_store::{TokenizerStore, EOS_TOKEN, PAD_TOKEN};

const TRAIN_FILES: [&str; 2] = ["train.txt", "wiki.train.raw"];
const VALID_FILES: [&str; 2] = ["valid.txt", "wiki.valid.raw"];
const TEST_FILES:  [&str; 2] = ["test.txt", "wiki.test.raw"];

pub struct TextCorpus {
    dir:       PathBuf,
    tokenizer: TokenizerStore,
}

impl TextCorpus {
    pub fn new(dir: impl Into<PathBuf>, tokenizer: TokenizerStore) -> Self {
        Self { dir: dir.into(), tokenizer }
    }

    fn read_split(&self, candidates: &[&str]) -> Result<Vec<String>> {
        let path = candidates
            .iter()
            .map(|name| self.dir.join(name))
            .find(|p| p.exists())
            .with_context(|| format!(
                "None of {:?} found in '{}'",
                candidates,
                self.dir.display()
            ))?;
        read_lines(&path)
    }
}

impl TokenSource for TextCorpus {
    fn load_splits(&self) -> Result<TokenSplits> {
        let train_lines = self.read_split(&TRAIN_FILES)?;
        let valid_lines = self.read_split(&VALID_FILES)?;
        let test_lines  = self.read_split(&TEST_FILES)?;

        let tokenizer = self.tokenizer.load_or_build(&train_lines)?;
        let pad_token = special_id(&tokenizer, PAD_TOKEN)?;

        let splits = TokenSplits {
            train:      encode_lines(&tokenizer, &train_lines)?,
            valid:      encode_lines(&tokenizer, &valid_lines)?,
            test:       encode_lines(&tokenizer, &test_lines)?,
            pad_token,
            vocab_size: tokenizer.get_vocab_size(true),
        };

        tracing::info!(
            "Corpus '{}': {} / {} / {} tokens, vocabulary {}",
            self.dir.display(),
            splits.train.len(),
            splits.valid.len(),
            splits.test.len(),
            splits.vocab_size,
        );
        Ok(splits)
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    Ok(text.lines().map(str::to_string).collect())
}

fn special_id(tokenizer: &Tokenizer, token: &str) -> Result<u32> {
    tokenizer
        .token_to_id(token)
        .with_context(|| format!("Tokenizer has no '{token}' entry"))
}

/// Flatten lines into one stream, terminating every non-empty line
/// with <eos>.
pub fn encode_lines(tokenizer: &Tokenizer, lines: &[String]) -> Result<Vec<u32>> {
    let eos        = special_id(tokenizer, EOS_TOKEN)?;
    let mut stream = Vec::new();

    for line in lines {
        let enc = tokenizer
            .encode(line.as_str(), false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
        if enc.get_ids().is_empty() {
            continue;
        }
        stream.extend_from_slice(enc.get_ids());
        stream.push(eos);
    }
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, text: &str) {
        fs::write(dir.join(name), text).unwrap();
    }

    #[test]
    fn test_loads_three_splits() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "train.txt", "the cat sat\n\nthe dog sat\n");
        write(dir.path(), "valid.txt", "the cat\n");
        write(dir.path(), "wiki.test.raw", "a bird\n");

        let corpus = TextCorpus::new(dir.path(), TokenizerStore::new(dir.path().join("vocab")));
        let splits = corpus.load_splits().unwrap();

        // sat=3, the=4 (tied, alphabetical), cat=5, dog=6; blank line skipped
        assert_eq!(splits.train, vec![4, 5, 3, 2, 4, 6, 3, 2]);
        assert_eq!(splits.valid, vec![4, 5, 2]);
        // both test words are unknown
        assert_eq!(splits.test, vec![1, 1, 2]);
        assert_eq!(splits.pad_token, 0);
        assert_eq!(splits.vocab_size, 7);
    }

    #[test]
    fn test_missing_split_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "train.txt", "words\n");
        let corpus = TextCorpus::new(dir.path(), TokenizerStore::new(dir.path()));
        let err = corpus.load_splits().unwrap_err();
        assert!(err.to_string().contains("valid.txt"));
    }
}
