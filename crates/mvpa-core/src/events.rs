//! Event-related datasets
//!
//! Every event selects a boxcar of consecutive samples, which is flattened
//! into a single output sample (all features of the first sample, then all
//! features of the second, ...).

use log::debug;
use ndarray::{s, Array2};
use std::collections::BTreeMap;

use crate::attr::{AttrValue, Attribute};
use crate::channels;
use crate::dataset::Dataset;
use crate::error::{MvpaError, Result};
use crate::io::TextTable;

/// One event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Onset, in samples or in units of the time attribute
    pub onset: f64,
    /// Length of the boxcar in samples
    pub duration: Option<usize>,
    /// Additional attributes carried into the output sample
    pub attrs: BTreeMap<String, AttrValue>,
}

impl Event {
    /// Event without extra attributes
    pub fn new(onset: f64, duration: Option<usize>) -> Self {
        Self {
            onset,
            duration,
            attrs: BTreeMap::new(),
        }
    }
}

/// Read events from a table with an `onset` column and optional `duration`
pub fn events_from_table(table: &TextTable) -> Result<Vec<Event>> {
    let onset_col = table
        .column_index("onset")
        .ok_or_else(|| MvpaError::format("events table has no 'onset' column"))?;
    let duration_col = table.column_index("duration");
    table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let onset = row[onset_col].parse::<f64>().map_err(|_| {
                MvpaError::format(format!("event {}: invalid onset '{}'", i + 1, row[onset_col]))
            })?;
            let duration = match duration_col {
                Some(c) => Some(parse_duration(&row[c]).ok_or_else(|| {
                    MvpaError::format(format!("event {}: invalid duration '{}'", i + 1, row[c]))
                })?),
                None => None,
            };
            let attrs = table
                .columns
                .iter()
                .enumerate()
                .filter(|(c, _)| *c != onset_col && Some(*c) != duration_col)
                .map(|(c, name)| (name.clone(), AttrValue::parse(&row[c])))
                .collect();
            Ok(Event {
                onset,
                duration,
                attrs,
            })
        })
        .collect()
}

// Durations are sample counts; "4.0" is accepted, "4.5" is not.
fn parse_duration(token: &str) -> Option<usize> {
    let value = token.parse::<f64>().ok()?;
    (value >= 0.0 && value.fract() == 0.0).then_some(value as usize)
}

/// How events are turned into boxcars
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxcarOptions {
    /// Map onsets through this sample attribute instead of sample indices
    pub time_attr: Option<String>,
    /// Shift added to every start sample
    pub offset: i64,
    /// Override for all event durations
    pub duration: Option<usize>,
    /// Drop events whose boxcar leaves the dataset instead of failing
    pub skip_incomplete: bool,
}

fn onset_index(ds: &Dataset, onset: f64, time_attr: Option<&str>) -> Result<i64> {
    match time_attr {
        None => {
            if onset.fract() != 0.0 {
                return Err(MvpaError::param(format!(
                    "onset {} is not a sample index; use a time attribute",
                    onset
                )));
            }
            Ok(onset as i64)
        }
        Some(name) => {
            let times = ds
                .sa_get(name)?
                .as_floats()
                .ok_or_else(|| MvpaError::attribute(name, "time attribute must be numeric"))?;
            // onsets after the last sample map past the end
            Ok(times
                .iter()
                .position(|&t| t >= onset)
                .unwrap_or(times.len()) as i64)
        }
    }
}

/// Build an event-related dataset with one sample per event
pub fn eventrelated_dataset(ds: &Dataset, events: &[Event], opts: &BoxcarOptions) -> Result<Dataset> {
    let nf = ds.nfeatures();
    let mut boxcars: Vec<(usize, usize, &Event)> = Vec::with_capacity(events.len());
    let mut length: Option<usize> = None;
    for (i, event) in events.iter().enumerate() {
        let duration = opts.duration.or(event.duration).ok_or_else(|| {
            MvpaError::param(format!("event {} has no duration and none was given", i))
        })?;
        if duration == 0 {
            return Err(MvpaError::param(format!("event {} has zero duration", i)));
        }
        let start = onset_index(ds, event.onset, opts.time_attr.as_deref())? + opts.offset;
        if start < 0 || start as usize + duration > ds.nsamples() {
            if opts.skip_incomplete {
                debug!(target: channels::EVENTS, "skipping event {} at sample {}", i, start);
                continue;
            }
            return Err(MvpaError::param(format!(
                "event {} covers samples {}..{} outside of 0..{}",
                i,
                start,
                start + duration as i64,
                ds.nsamples()
            )));
        }
        match length {
            None => length = Some(duration),
            Some(l) if l != duration => {
                return Err(MvpaError::param(format!(
                    "event {} lasts {} samples, previous events {}",
                    i, duration, l
                )))
            }
            _ => {}
        }
        boxcars.push((start as usize, duration, event));
    }
    let duration = length.ok_or_else(|| MvpaError::EmptySelection {
        reason: "no events within the dataset".into(),
    })?;

    let mut samples = Array2::zeros((boxcars.len(), duration * nf));
    for (row, &(start, _, _)) in boxcars.iter().enumerate() {
        let block = ds.samples().slice(s![start..start + duration, ..]);
        for (k, value) in block.iter().enumerate() {
            samples[[row, k]] = *value;
        }
    }
    let mut out = Dataset::new(samples);

    let starts: Vec<usize> = boxcars.iter().map(|b| b.0).collect();
    for (name, attr) in ds.sa() {
        out.set_sa(name.clone(), attr.take(&starts))?;
    }
    let mut names: Vec<&String> = boxcars.iter().flat_map(|b| b.2.attrs.keys()).collect();
    names.sort();
    names.dedup();
    for name in names {
        let values = boxcars
            .iter()
            .map(|b| {
                b.2.attrs.get(name).cloned().ok_or_else(|| {
                    MvpaError::format(format!("event attribute '{}' missing for some events", name))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        out.set_sa(name.clone(), Attribute::from_values(values)?)?;
    }
    out.set_sa(
        "event_onsetidx",
        Attribute::Int(starts.iter().map(|&s| s as i64).collect()),
    )?;

    let feature_index: Vec<usize> = (0..duration).flat_map(|_| 0..nf).collect();
    for (name, attr) in ds.fa() {
        out.set_fa(name.clone(), attr.take(&feature_index))?;
    }
    out.set_fa(
        "event_offsetidx",
        Attribute::Int((0..duration as i64).flat_map(|o| std::iter::repeat(o).take(nf)).collect()),
    )?;
    for (name, attr) in ds.a() {
        out.set_a(name.clone(), attr.clone());
    }
    debug!(
        target: channels::EVENTS,
        "{} events x {} samples -> {:?}",
        boxcars.len(),
        duration,
        out.shape()
    );
    Ok(out)
}
