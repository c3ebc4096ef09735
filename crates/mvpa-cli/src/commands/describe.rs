//! Dataset summaries

use clap::Args;
use serde::Serialize;
use std::fmt::Write as _;

use mvpa_core::dataset::CountTable;
use mvpa_core::{Attribute, Collection, Dataset};

use crate::error::CliResult;
use crate::registry::Execute;
use crate::session::Session;

/// Uniques shown per attribute in text output
const MAX_UNIQUES: usize = 5;

/// Describe shape, attributes and sample counts of a dataset
#[derive(Args, Debug)]
pub struct DescribeCommand {
    /// Dataset or session:NAME
    pub input: String,

    /// Sample attribute for the rows of the count table
    #[arg(long, default_value = "targets")]
    pub targets_attr: String,

    /// Sample attribute for the columns of the count table
    #[arg(long, default_value = "chunks")]
    pub chunks_attr: String,

    /// Emit JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct AttributeSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub nunique: usize,
    pub uniques: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Description {
    pub nsamples: usize,
    pub nfeatures: usize,
    pub sa: Vec<AttributeSummary>,
    pub fa: Vec<AttributeSummary>,
    pub a: Vec<AttributeSummary>,
    pub counts: Option<CountTable>,
}

fn summarize(collection: &Collection) -> Vec<AttributeSummary> {
    collection
        .iter()
        .map(|(name, attr): (&String, &Attribute)| {
            let unique = attr.unique();
            AttributeSummary {
                name: name.clone(),
                kind: attr.type_name(),
                nunique: unique.len(),
                uniques: unique.iter().map(ToString::to_string).collect(),
            }
        })
        .collect()
}

pub fn describe(ds: &Dataset, rows: &str, cols: &str) -> Description {
    Description {
        nsamples: ds.nsamples(),
        nfeatures: ds.nfeatures(),
        sa: summarize(ds.sa()),
        fa: summarize(ds.fa()),
        a: summarize(ds.a()),
        counts: ds.count_table(rows, cols).ok(),
    }
}

fn render(d: &Description, rows: &str, cols: &str) -> String {
    let mut out = format!("Dataset: {} samples x {} features", d.nsamples, d.nfeatures);
    for (title, attrs) in [("Sample attributes", &d.sa), ("Feature attributes", &d.fa), ("Dataset attributes", &d.a)] {
        if attrs.is_empty() {
            continue;
        }
        let _ = write!(out, "\n{}:", title);
        for attr in attrs {
            let mut shown = attr.uniques.iter().take(MAX_UNIQUES).cloned().collect::<Vec<_>>().join(" ");
            if attr.nunique > MAX_UNIQUES {
                shown.push_str(" ...");
            }
            let _ = write!(out, "\n  {:<16}{:<8}{:>6} unique: {}", attr.name, attr.kind, attr.nunique, shown);
        }
    }
    if let Some(table) = &d.counts {
        let _ = write!(out, "\nSamples per {} (rows) x {} (columns):", rows, cols);
        let header: Vec<String> = table.col_values.iter().map(|v| format!("{:>6}", v.to_string())).collect();
        let _ = write!(out, "\n  {:<12}{}", "", header.join(""));
        for (value, counts) in table.row_values.iter().zip(&table.counts) {
            let cells: Vec<String> = counts.iter().map(|c| format!("{:>6}", c)).collect();
            let _ = write!(out, "\n  {:<12}{}", value.to_string(), cells.join(""));
        }
    }
    out
}

impl Execute for DescribeCommand {
    const NAME: &'static str = "describe";
    const ABOUT: &'static str = "Summarize a dataset";

    fn execute(self, session: &mut Session) -> CliResult<()> {
        let ds = session.resolve_dataset(&self.input)?;
        let description = describe(&ds, &self.targets_attr, &self.chunks_attr);
        if self.json {
            println!("{}", serde_json::to_string_pretty(&description)?);
        } else {
            println!("{}", render(&description, &self.targets_attr, &self.chunks_attr));
        }
        Ok(())
    }
}
