//! Event-related dataset construction

use clap::Args;
use std::path::PathBuf;
use tracing::info;

use mvpa_core::events::{eventrelated_dataset, events_from_table, BoxcarOptions, Event};
use mvpa_core::io::TextTable;

use super::common::save;
use crate::error::{CliError, CliResult};
use crate::registry::Execute;
use crate::session::Session;

/// Turn events into samples by concatenating consecutive input samples
#[derive(Args, Debug)]
pub struct MkevdsCommand {
    /// Input dataset or session:NAME
    pub input: String,

    /// Event table with a header; needs an `onset` column
    #[arg(long, value_name = "FILE", conflicts_with = "onsets")]
    pub events: Option<PathBuf>,

    /// Event onsets
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub onsets: Vec<f64>,

    /// Duration in samples for events given with --onsets
    #[arg(long)]
    pub duration: Option<usize>,

    /// Samples added to every onset
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub event_offset: i64,

    /// Duration in samples overriding every event's own
    #[arg(long)]
    pub event_duration: Option<usize>,

    /// Sample attribute holding acquisition times; onsets are matched to it
    #[arg(long)]
    pub time_attr: Option<String>,

    /// Drop events that reach beyond the dataset instead of failing
    #[arg(long)]
    pub skip_incomplete: bool,

    /// Output dataset
    #[arg(short, long)]
    pub output: PathBuf,
}

impl MkevdsCommand {
    fn events(&self) -> CliResult<Vec<Event>> {
        if let Some(path) = &self.events {
            return Ok(events_from_table(&TextTable::read(path)?)?);
        }
        if self.onsets.is_empty() {
            return Err(CliError::invalid_args("give --events or --onsets"));
        }
        Ok(self.onsets.iter().map(|&onset| Event::new(onset, self.duration)).collect())
    }
}

impl Execute for MkevdsCommand {
    const NAME: &'static str = "mkevds";
    const ABOUT: &'static str = "Create an event-related dataset";

    fn execute(self, session: &mut Session) -> CliResult<()> {
        let ds = session.resolve_dataset(&self.input)?;
        let events = self.events()?;
        let opts = BoxcarOptions {
            time_attr: self.time_attr.clone(),
            offset: self.event_offset,
            duration: self.event_duration,
            skip_incomplete: self.skip_incomplete,
        };
        let out = eventrelated_dataset(&ds, &events, &opts)?;
        info!("{} events -> {} samples", events.len(), out.nsamples());
        save(&out, &self.output)
    }
}
