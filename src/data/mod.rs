// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw split files to device-ready windows:
//
//   train/valid/test text
//       │
//       ▼
//   TextCorpus         → reads files, encodes lines, appends <eos>
//       │
//       ▼
//   TokenSplits        → three flat token streams + pad id
//       │
//       ▼
//   batchify           → padded, batch-parallel WindowLayout
//       │
//       ▼
//   get_batch_s2s      → (context, next token) for one position
//       │
//       ▼
//   WindowBatcher      → Int tensors on the model's device
//
// Reference: Burn Book §4 (Datasets)

/// Reads split files and tokenises them
pub mod corpus;

/// Token streams and their windowed layouts
pub mod dataset;

/// Flat stream → padded layout, and window extraction
pub mod windower;

/// Host windows → tensors
pub mod batcher;
