// Copyright 2026 The Stockflow Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::Serialize;

/// Every stock and variable value as of the end of one step.
pub type Snapshot = BTreeMap<String, i64>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Results {
    /// stocks in declaration order, followed by variables
    #[serde(skip)]
    pub columns: Vec<String>,
    pub snapshots: Vec<Snapshot>,
}

impl Results {
    pub fn new(columns: Vec<String>) -> Self {
        Results {
            columns,
            snapshots: Vec::new(),
        }
    }

    pub fn step_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Snapshot> {
        self.snapshots.iter()
    }

    /// The value of `name` at every step.
    pub fn series(&self, name: &str) -> Option<Vec<i64>> {
        self.snapshots
            .iter()
            .map(|snapshot| snapshot.get(name).copied())
            .collect()
    }

    /// One header line, then one line per step.  Steps are numbered from 1.
    pub fn write_tsv(&self, out: &mut dyn Write) -> io::Result<()> {
        write!(out, "step")?;
        for column in self.columns.iter() {
            write!(out, "\t{column}")?;
        }
        writeln!(out)?;

        for (i, snapshot) in self.snapshots.iter().enumerate() {
            write!(out, "{}", i + 1)?;
            for column in self.columns.iter() {
                match snapshot.get(column) {
                    Some(val) => write!(out, "\t{val}")?,
                    None => write!(out, "\t")?,
                }
            }
            writeln!(out)?;
        }

        Ok(())
    }

    /// The snapshot sequence as a JSON array of objects.
    pub fn write_json(&self, out: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, &self.snapshots)?;
        writeln!(out)
    }
}
