// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Builds, saves and reloads the word-level vocabulary.
//
// The vocabulary is built from the TRAINING split only. Validation
// and test words never seen in training map to <unk>.
//
// Id assignment:
//   <pad> = 0, <unk> = 1, <eos> = 2
//   then every training word, most frequent first, ties broken
//   alphabetically so the same corpus always yields the same ids.
//
// Rather than driving the tokenizers trainer API, the tokenizer is
// written out as HuggingFace JSON by hand and loaded back with
// Tokenizer::from_file: a WordLevel model behind a Lowercase
// normalizer and a BERT pre-tokenizer (whitespace + punctuation
// splits).
//
// Reference: tokenizers crate documentation (WordLevel)

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tokenizers::{
    normalizers::Lowercase,
    pre_tokenizers::bert::BertPreTokenizer,
    NormalizedString, Normalizer, OffsetReferential, OffsetType,
    PreTokenizedString, PreTokenizer, Tokenizer,
};

pub const PAD_TOKEN: &str = "<pad>";
pub const UNK_TOKEN: &str = "<unk>";
pub const EOS_TOKEN: &str = "<eos>";

const SPECIALS: [&str; 3] = [PAD_TOKEN, UNK_TOKEN, EOS_TOKEN];

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join("tokenizer.json")
    }

    /// Load the saved tokenizer or build one from the training lines
    pub fn load_or_build(&self, train_lines: &[String]) -> Result<Tokenizer> {
        if self.path().exists() {
            tracing::info!("Loading existing tokenizer from '{}'", self.path().display());
            self.load()
        } else {
            tracing::info!("Building word-level vocabulary from {} training lines", train_lines.len());
            self.build_and_save(train_lines)
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {e}", path.display()))
    }

    fn build_and_save(&self, train_lines: &[String]) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        // ── Step 1: Count word frequencies ───────────────────────────────────
        let mut freq: HashMap<String, usize> = HashMap::new();
        for line in train_lines {
            for word in pre_tokenize(line)? {
                *freq.entry(word).or_insert(0) += 1;
            }
        }

        let mut words: Vec<(String, usize)> = freq
            .into_iter()
            .filter(|(w, _)| !SPECIALS.contains(&w.as_str()))
            .collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        // ── Step 2: Assign ids ───────────────────────────────────────────────
        let mut vocab = serde_json::Map::new();
        for (id, special) in SPECIALS.iter().enumerate() {
            vocab.insert((*special).to_string(), serde_json::json!(id));
        }
        for (offset, (word, _)) in words.iter().enumerate() {
            vocab.insert(word.clone(), serde_json::json!(SPECIALS.len() + offset));
        }
        let vocab_size = vocab.len();

        // ── Step 3: Write tokenizer JSON in HuggingFace format ───────────────
        let added_tokens: Vec<serde_json::Value> = SPECIALS
            .iter()
            .enumerate()
            .map(|(id, content)| serde_json::json!({
                "id": id, "content": content, "single_word": false,
                "lstrip": false, "rstrip": false, "normalized": false, "special": true
            }))
            .collect();

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": { "type": "Lowercase" },
            "pre_tokenizer": { "type": "BertPreTokenizer" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": UNK_TOKEN
            }
        });

        let path = self.path();
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer JSON to '{}'", path.display()))?;

        tracing::info!("Tokenizer built with {} entries, saved to '{}'", vocab_size, path.display());
        self.load()
    }
}

/// The pieces the saved tokenizer sees for `line`: its Lowercase
/// normalizer followed by its BERT pre-tokenizer. Counting words
/// with anything else would leave training words outside the
/// vocabulary.
pub fn pre_tokenize(line: &str) -> Result<Vec<String>> {
    let mut normalized = NormalizedString::from(line);
    Lowercase
        .normalize(&mut normalized)
        .map_err(|e| anyhow::anyhow!("Cannot normalise '{line}': {e}"))?;

    let mut pieces = PreTokenizedString::from(normalized);
    BertPreTokenizer
        .pre_tokenize(&mut pieces)
        .map_err(|e| anyhow::anyhow!("Cannot pre-tokenize '{line}': {e}"))?;

    Ok(pieces
        .get_splits(OffsetReferential::Normalized, OffsetType::Byte)
        .into_iter()
        .map(|(piece, _, _)| piece.to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pre_tokenize_splits_punctuation() {
        assert_eq!(
            pre_tokenize("Hello, World!  again").unwrap(),
            vec!["hello", ",", "world", "!", "again"]
        );
    }

    #[test]
    fn test_unicode_punctuation_splits_like_the_encoder() {
        assert_eq!(
            pre_tokenize("a\u{2014}b \u{ab}Word\u{bb}").unwrap(),
            vec!["a", "\u{2014}", "b", "\u{ab}", "word", "\u{bb}"]
        );
    }

    #[test]
    fn test_training_words_never_encode_to_unk() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let train = lines(&["a\u{2014}b \u{ab}quoted\u{bb} words", "Caf\u{e9} na\u{ef}ve \u{2013} done."]);
        let tok   = store.load_or_build(&train).unwrap();

        let unk = tok.token_to_id(UNK_TOKEN).unwrap();
        for line in &train {
            let enc = tok.encode(line.as_str(), false).unwrap();
            assert!(!enc.get_ids().is_empty());
            assert!(enc.get_ids().iter().all(|&id| id != unk), "{line:?} -> {:?}", enc.get_ids());
        }
    }

    #[test]
    fn test_specials_have_fixed_ids() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let tok   = store.load_or_build(&lines(&["the cat", "the dog"])).unwrap();

        assert_eq!(tok.token_to_id(PAD_TOKEN), Some(0));
        assert_eq!(tok.token_to_id(UNK_TOKEN), Some(1));
        assert_eq!(tok.token_to_id(EOS_TOKEN), Some(2));
        // most frequent word first, then alphabetical
        assert_eq!(tok.token_to_id("the"), Some(3));
        assert_eq!(tok.token_to_id("cat"), Some(4));
        assert_eq!(tok.token_to_id("dog"), Some(5));
        assert_eq!(tok.get_vocab_size(true), 6);
    }

    #[test]
    fn test_unseen_words_map_to_unk() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let tok   = store.load_or_build(&lines(&["the cat"])).unwrap();

        let enc = tok.encode("The zebra", false).unwrap();
        assert_eq!(enc.get_ids(), &[3, 1]);
    }

    #[test]
    fn test_reloads_saved_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        TokenizerStore::new(dir.path())
            .load_or_build(&lines(&["alpha beta beta"]))
            .unwrap();

        // A different corpus must not change the saved ids
        let tok = TokenizerStore::new(dir.path())
            .load_or_build(&lines(&["gamma"]))
            .unwrap();
        assert_eq!(tok.token_to_id("beta"), Some(3));
        assert_eq!(tok.token_to_id("gamma"), None);
    }
}
