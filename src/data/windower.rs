// ============================================================
// Layer 4 — Corpus Windower
// ============================================================
// Reshapes one flat token stream into a batch-parallel layout
// from which fixed-width (context, next-token) windows are cut.
//
// Step 1 — columns:
//   seq_len = (len - 1) / C. The first C * seq_len tokens are split
//   into C contiguous sub-sequences, one per column. Any tail that
//   does not fill a whole row is dropped.
//
// Step 2 — lead-in:
//   W rows are prepended so that the very first window already has
//   a full W-token context. Column 0 gets pad tokens; every other
//   column gets the LAST W tokens of the column to its left.
//
// Example, stream 1..=10, C = 2, W = 2, pad = 0:
//
//   seq_len = 9 / 2 = 4        columns: [1 2 3 4] [5 6 7 8]
//
//   row 0 │ 0 3      ← lead-in (pad | tail of column 0)
//   row 1 │ 0 4
//   row 2 │ 1 5      ← real rows
//   row 3 │ 2 6
//   row 4 │ 3 7
//   row 5 │ 4 8
//
// Window i takes rows i..i+W as context (transposed, one row per
// column) and row i+W as the target: there are rows - W = seq_len
// windows and none reads past the last row.
//
// Reference: Rust Book §8 (Vectors), §4 (Slices)

use crate::domain::error::HarnessError;

// ─── WindowLayout ─────────────────────────────────────────────────────────────
/// Row-major `[rows, columns]` token grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowLayout {
    rows:    usize,
    columns: usize,
    data:    Vec<u32>,
}

impl WindowLayout {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn get(&self, row: usize, column: usize) -> u32 {
        self.data[row * self.columns + column]
    }

    pub fn row(&self, row: usize) -> &[u32] {
        &self.data[row * self.columns..(row + 1) * self.columns]
    }

    /// Number of valid window start positions for `window`
    pub fn num_windows(&self, window: usize) -> usize {
        self.rows.saturating_sub(window)
    }
}

// ─── WindowSample ─────────────────────────────────────────────────────────────
/// One extracted window, still on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSample {
    /// Batch-major context, `columns * window` ids
    pub inputs:  Vec<u32>,
    /// Next token for every column, `columns` ids
    pub targets: Vec<u32>,
    pub columns: usize,
    pub window:  usize,
}

#[cfg(test)]
impl WindowSample {
    /// Context of one column
    pub fn context(&self, column: usize) -> &[u32] {
        &self.inputs[column * self.window..(column + 1) * self.window]
    }
}

/// Build the padded, batch-parallel layout for `stream`.
pub fn batchify(
    stream:  &[u32],
    columns: usize,
    window:  usize,
    pad:     u32,
) -> Result<WindowLayout, HarnessError> {
    if columns == 0 || window == 0 {
        return Err(HarnessError::degenerate(format!(
            "columns ({columns}) and window ({window}) must both be positive"
        )));
    }

    let seq_len = stream.len().saturating_sub(1) / columns;
    if seq_len == 0 {
        return Err(HarnessError::degenerate(format!(
            "a stream of {} tokens cannot fill {columns} columns",
            stream.len()
        )));
    }
    // The lead-in of column c is the tail of column c-1, which must
    // hold at least `window` tokens.
    if seq_len < window {
        return Err(HarnessError::degenerate(format!(
            "{seq_len} rows per column is shorter than the window ({window})"
        )));
    }

    let rows     = seq_len + window;
    let mut data = Vec::with_capacity(rows * columns);

    // Lead-in rows
    for k in 0..window {
        data.push(pad);
        let source_row = seq_len - window + k;
        for column in 1..columns {
            data.push(stream[(column - 1) * seq_len + source_row]);
        }
    }

    // Column c holds stream[c * seq_len .. (c + 1) * seq_len]
    for row in 0..seq_len {
        for column in 0..columns {
            data.push(stream[column * seq_len + row]);
        }
    }

    tracing::debug!(
        "Windowed {} tokens into {} rows x {} columns ({} tokens dropped)",
        stream.len(),
        rows,
        columns,
        stream.len() - seq_len * columns,
    );

    Ok(WindowLayout { rows, columns, data })
}

/// Cut window `i`: context rows `i..i+window` transposed to
/// batch-major, target row `i+window`.
///
/// # Panics
/// Panics if `i + window >= layout.rows()`.
pub fn get_batch_s2s(layout: &WindowLayout, i: usize, window: usize) -> WindowSample {
    assert!(
        i + window < layout.rows,
        "window start {i} out of range for {} rows and window {window}",
        layout.rows
    );

    let columns    = layout.columns;
    let mut inputs = Vec::with_capacity(columns * window);
    for column in 0..columns {
        for row in i..i + window {
            inputs.push(layout.get(row, column));
        }
    }
    let targets = layout.row(i + window).to_vec();

    WindowSample { inputs, targets, columns, window }
}
