//! Sub-command implementations for mvpa

use crate::registry::{CommandEntry, Handler};

pub mod common;

pub mod crossval;
pub mod describe;
pub mod dump;
pub mod exec;
pub mod info;
pub mod mkds;
pub mod mkevds;
pub mod ofmotionqc;
pub mod preproc;
pub mod searchlight;
pub mod select;
pub mod ttest;

#[cfg(feature = "atlas")]
pub mod atlaslabeler;

#[cfg(feature = "atlas")]
fn atlaslabeler_entry() -> CommandEntry {
    CommandEntry::Available(Handler::<atlaslabeler::AtlasLabelerCommand>::boxed())
}

#[cfg(not(feature = "atlas"))]
fn atlaslabeler_entry() -> CommandEntry {
    CommandEntry::Disabled {
        name: "atlaslabeler",
        reason: "built without the 'atlas' feature".to_string(),
    }
}

/// Handler for a command name
///
/// Names without an implementation in this build resolve to a disabled entry.
pub fn resolve(name: &'static str) -> CommandEntry {
    match name {
        "info" => CommandEntry::Available(Handler::<info::InfoCommand>::boxed()),
        "mkds" => CommandEntry::Available(Handler::<mkds::MkdsCommand>::boxed()),
        "mkevds" => CommandEntry::Available(Handler::<mkevds::MkevdsCommand>::boxed()),
        "describe" => CommandEntry::Available(Handler::<describe::DescribeCommand>::boxed()),
        "dump" => CommandEntry::Available(Handler::<dump::DumpCommand>::boxed()),
        "preproc" => CommandEntry::Available(Handler::<preproc::PreprocCommand>::boxed()),
        "crossval" => CommandEntry::Available(Handler::<crossval::CrossvalCommand>::boxed()),
        "searchlight" => CommandEntry::Available(Handler::<searchlight::SearchlightCommand>::boxed()),
        "select" => CommandEntry::Available(Handler::<select::SelectCommand>::boxed()),
        "atlaslabeler" => atlaslabeler_entry(),
        "exec" => CommandEntry::Available(Box::new(exec::ExecHandler)),
        "ofmotionqc" => CommandEntry::Available(Handler::<ofmotionqc::OfmotionqcCommand>::boxed()),
        "ttest" => CommandEntry::Available(Handler::<ttest::TtestCommand>::boxed()),
        _ => CommandEntry::Disabled {
            name,
            reason: "no implementation in this build".to_string(),
        },
    }
}
