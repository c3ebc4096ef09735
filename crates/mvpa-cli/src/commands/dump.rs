//! Export samples or a single attribute as text

use clap::{Args, ValueEnum};
use ndarray::Array2;
use serde_json::{json, Value};
use std::path::PathBuf;

use mvpa_core::Attribute;

use super::common::write_text;
use crate::error::{CliError, CliResult};
use crate::registry::Execute;
use crate::session::Session;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Txt,
    Csv,
    Json,
}

impl Format {
    fn separator(self) -> &'static str {
        match self {
            Format::Csv => ",",
            _ => " ",
        }
    }
}

/// Write samples or one attribute of a dataset
#[derive(Args, Debug)]
pub struct DumpCommand {
    /// Dataset or session:NAME
    pub input: String,

    /// Dump the samples matrix
    #[arg(short, long)]
    pub samples: bool,

    /// Dump a sample attribute
    #[arg(long, value_name = "NAME")]
    pub sa: Option<String>,

    /// Dump a feature attribute
    #[arg(long, value_name = "NAME")]
    pub fa: Option<String>,

    /// Dump a dataset attribute
    #[arg(long, value_name = "NAME")]
    pub da: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "txt")]
    pub format: Format,

    /// Output file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn matrix_text(samples: &Array2<f64>, format: Format) -> String {
    if format == Format::Json {
        let rows: Vec<Vec<f64>> = samples.rows().into_iter().map(|r| r.to_vec()).collect();
        return json!(rows).to_string();
    }
    samples
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(format.separator())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn attribute_json(attr: &Attribute) -> Value {
    match attr {
        Attribute::Int(v) => json!(v),
        Attribute::Float(v) => json!(v),
        Attribute::Str(v) => json!(v),
        Attribute::Coords(v) => json!(v),
    }
}

fn attribute_text(attr: &Attribute, format: Format) -> String {
    if format == Format::Json {
        return attribute_json(attr).to_string();
    }
    match attr {
        Attribute::Coords(coords) => coords
            .iter()
            .map(|c| {
                c.iter()
                    .map(i64::to_string)
                    .collect::<Vec<_>>()
                    .join(format.separator())
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other
            .values()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

impl Execute for DumpCommand {
    const NAME: &'static str = "dump";
    const ABOUT: &'static str = "Export samples or an attribute as txt, csv or json";

    fn execute(self, session: &mut Session) -> CliResult<()> {
        let chosen = [self.samples, self.sa.is_some(), self.fa.is_some(), self.da.is_some()]
            .iter()
            .filter(|&&c| c)
            .count();
        if chosen != 1 {
            return Err(CliError::invalid_args(
                "give exactly one of --samples, --sa, --fa or --da",
            ));
        }
        let ds = session.resolve_dataset(&self.input)?;
        let text = match (&self.sa, &self.fa, &self.da) {
            _ if self.samples => matrix_text(ds.samples(), self.format),
            (Some(name), _, _) => attribute_text(ds.sa_get(name)?, self.format),
            (_, Some(name), _) => attribute_text(ds.fa_get(name)?, self.format),
            (_, _, Some(name)) => attribute_text(ds.a_get(name)?, self.format),
            (None, None, None) => return Err(CliError::invalid_args("nothing to dump")),
        };
        write_text(&text, self.output.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn formats_matrix() {
        let m = array![[1.0, 2.5], [3.0, -1.0]];
        assert_eq!(matrix_text(&m, Format::Txt), "1 2.5\n3 -1");
        assert_eq!(matrix_text(&m, Format::Csv), "1,2.5\n3,-1");
        assert_eq!(matrix_text(&m, Format::Json), "[[1.0,2.5],[3.0,-1.0]]");
    }

    #[test]
    fn formats_attributes() {
        let coords = Attribute::Coords(vec![vec![0, 1], vec![2, 3]]);
        assert_eq!(attribute_text(&coords, Format::Csv), "0,1\n2,3");
        let labels = Attribute::Str(vec!["a".into(), "b".into()]);
        assert_eq!(attribute_text(&labels, Format::Txt), "a\nb");
        assert_eq!(attribute_text(&labels, Format::Json), r#"["a","b"]"#);
    }
}
