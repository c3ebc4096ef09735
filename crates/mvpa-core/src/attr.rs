//! Attribute columns attached to samples, features or the whole dataset

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{MvpaError, Result};

/// Named attribute columns, ordered by name
pub type Collection = BTreeMap<String, Attribute>;

/// One attribute column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    /// Integer values (chunk numbers, run indices)
    Int(Vec<i64>),
    /// Floating point values (onsets, weights)
    Float(Vec<f64>),
    /// Labels
    Str(Vec<String>),
    /// Integer coordinate tuples (voxel indices)
    Coords(Vec<Vec<i64>>),
}

/// A single attribute value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AttrValue {
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// String
    Str(String),
    /// Coordinate tuple
    Coords(Vec<i64>),
}

impl AttrValue {
    /// Parse a token, preferring integer, then float, then string
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        if let Ok(i) = token.parse::<i64>() {
            AttrValue::Int(i)
        } else if let Ok(f) = token.parse::<f64>() {
            AttrValue::Float(f)
        } else {
            AttrValue::Str(token.to_string())
        }
    }

    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(i) => Some(*i as f64),
            AttrValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            AttrValue::Int(_) | AttrValue::Float(_) => 0,
            AttrValue::Str(_) => 1,
            AttrValue::Coords(_) => 2,
        }
    }
}

impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AttrValue {}

impl PartialOrd for AttrValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Numbers compare by value across Int/Float so `chunks<3` works on either.
impl Ord for AttrValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (AttrValue::Int(a), AttrValue::Int(b)) => a.cmp(b),
            (AttrValue::Str(a), AttrValue::Str(b)) => a.cmp(b),
            (AttrValue::Coords(a), AttrValue::Coords(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.rank().cmp(&b.rank()),
            },
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Int(i) => write!(f, "{}", i),
            AttrValue::Float(x) => write!(f, "{}", x),
            AttrValue::Str(s) => write!(f, "{}", s),
            AttrValue::Coords(c) => {
                let parts: Vec<String> = c.iter().map(|v| v.to_string()).collect();
                write!(f, "({})", parts.join(","))
            }
        }
    }
}

impl Attribute {
    /// Number of entries in the column
    pub fn len(&self) -> usize {
        match self {
            Attribute::Int(v) => v.len(),
            Attribute::Float(v) => v.len(),
            Attribute::Str(v) => v.len(),
            Attribute::Coords(v) => v.len(),
        }
    }

    /// Whether the column is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human readable type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Attribute::Int(_) => "int",
            Attribute::Float(_) => "float",
            Attribute::Str(_) => "str",
            Attribute::Coords(_) => "coords",
        }
    }

    /// Value at `index`
    ///
    /// Panics if `index` is out of bounds, like slice indexing.
    pub fn get(&self, index: usize) -> AttrValue {
        match self {
            Attribute::Int(v) => AttrValue::Int(v[index]),
            Attribute::Float(v) => AttrValue::Float(v[index]),
            Attribute::Str(v) => AttrValue::Str(v[index].clone()),
            Attribute::Coords(v) => AttrValue::Coords(v[index].clone()),
        }
    }

    /// All values as owned [`AttrValue`]s
    pub fn values(&self) -> Vec<AttrValue> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }

    /// Column of the entries at `indices`, in that order (repeats allowed)
    pub fn take(&self, indices: &[usize]) -> Attribute {
        match self {
            Attribute::Int(v) => Attribute::Int(indices.iter().map(|&i| v[i]).collect()),
            Attribute::Float(v) => Attribute::Float(indices.iter().map(|&i| v[i]).collect()),
            Attribute::Str(v) => Attribute::Str(indices.iter().map(|&i| v[i].clone()).collect()),
            Attribute::Coords(v) => {
                Attribute::Coords(indices.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }

    /// Append another column of a compatible type
    pub fn concat(&self, other: &Attribute) -> Result<Attribute> {
        let mut values = self.values();
        values.extend(other.values());
        Attribute::from_values(values)
    }

    /// Sorted unique values
    pub fn unique(&self) -> Vec<AttrValue> {
        let mut values = self.values();
        values.sort();
        values.dedup();
        values
    }

    /// Values rendered as labels
    pub fn labels(&self) -> Vec<String> {
        self.values().iter().map(|v| v.to_string()).collect()
    }

    /// Numeric view of the column
    pub fn as_floats(&self) -> Option<Vec<f64>> {
        match self {
            Attribute::Int(v) => Some(v.iter().map(|&i| i as f64).collect()),
            Attribute::Float(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Coordinate view of the column
    pub fn as_coords(&self) -> Option<&[Vec<i64>]> {
        match self {
            Attribute::Coords(v) => Some(v),
            _ => None,
        }
    }

    /// Build a homogeneous column from values
    ///
    /// Integers mixed with floats are promoted to floats; any other mix of
    /// kinds is rejected.
    pub fn from_values(values: Vec<AttrValue>) -> Result<Attribute> {
        let all = |pred: fn(&AttrValue) -> bool| values.iter().all(pred);
        if all(|v| matches!(v, AttrValue::Int(_))) {
            Ok(Attribute::Int(
                values
                    .into_iter()
                    .map(|v| match v {
                        AttrValue::Int(i) => i,
                        _ => unreachable!(),
                    })
                    .collect(),
            ))
        } else if all(|v| v.as_f64().is_some()) {
            Ok(Attribute::Float(
                values.iter().filter_map(AttrValue::as_f64).collect(),
            ))
        } else if all(|v| matches!(v, AttrValue::Str(_))) {
            Ok(Attribute::Str(values.iter().map(|v| v.to_string()).collect()))
        } else if all(|v| matches!(v, AttrValue::Coords(_))) {
            Ok(Attribute::Coords(
                values
                    .into_iter()
                    .filter_map(|v| match v {
                        AttrValue::Coords(c) => Some(c),
                        _ => None,
                    })
                    .collect(),
            ))
        } else {
            Err(MvpaError::format("attribute values mix incompatible types"))
        }
    }

    /// Infer a column from text entries, one entry per sample or feature
    ///
    /// Entries holding several integer tokens become coordinates; otherwise
    /// every entry is parsed as a single token and the column takes the
    /// narrowest type all entries share, falling back to strings.
    pub fn infer<S: AsRef<str>>(entries: &[S]) -> Attribute {
        let split = |s: &str| -> Vec<String> {
            s.split(|c: char| c.is_whitespace() || c == ',')
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        };
        let tokenized: Vec<Vec<String>> = entries.iter().map(|e| split(e.as_ref())).collect();
        let multi = tokenized.iter().any(|t| t.len() > 1);
        if multi {
            let coords: Option<Vec<Vec<i64>>> = tokenized
                .iter()
                .map(|t| t.iter().map(|x| x.parse::<i64>().ok()).collect())
                .collect();
            if let Some(coords) = coords {
                return Attribute::Coords(coords);
            }
            return Attribute::Str(entries.iter().map(|e| e.as_ref().trim().to_string()).collect());
        }
        let values: Vec<AttrValue> = entries.iter().map(|e| AttrValue::parse(e.as_ref())).collect();
        Attribute::from_values(values).unwrap_or_else(|_| {
            Attribute::Str(entries.iter().map(|e| e.as_ref().trim().to_string()).collect())
        })
    }
}
