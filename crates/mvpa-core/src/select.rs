//! Attribute filter expressions
//!
//! A filter compares one attribute against one or more values:
//!
//! ```text
//! targets==face,house     membership
//! targets!=rest           exclusion
//! chunks<3  chunks>=1     numeric or lexical comparison
//! ```
//!
//! Several filters are combined with AND.

use std::fmt;
use std::str::FromStr;

use crate::attr::{AttrValue, Attribute, Collection};
use crate::error::{MvpaError, Result};

/// Comparison operator of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Value is one of the listed values
    In,
    /// Value is none of the listed values
    NotIn,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::In => "==",
            Op::NotIn => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
        }
    }
}

/// One attribute filter
#[derive(Debug, Clone, PartialEq)]
pub struct AttrFilter {
    /// Attribute name
    pub attr: String,
    /// Operator
    pub op: Op,
    /// Right-hand side values
    pub values: Vec<AttrValue>,
}

impl FromStr for AttrFilter {
    type Err = MvpaError;

    fn from_str(s: &str) -> Result<Self> {
        // Two-character operators first so `<=` is not read as `<`.
        const OPS: [(&str, Op); 7] = [
            ("==", Op::In),
            ("!=", Op::NotIn),
            ("<=", Op::Le),
            (">=", Op::Ge),
            ("<", Op::Lt),
            (">", Op::Gt),
            ("=", Op::In),
        ];
        let (pos, sym, op) = OPS
            .iter()
            .filter_map(|(sym, op)| s.find(sym).map(|pos| (pos, *sym, *op)))
            .min_by_key(|(pos, sym, _)| (*pos, std::cmp::Reverse(sym.len())))
            .ok_or_else(|| MvpaError::format(format!("no operator in filter '{}'", s)))?;
        let attr = s[..pos].trim();
        let rhs = s[pos + sym.len()..].trim();
        if attr.is_empty() || rhs.is_empty() {
            return Err(MvpaError::format(format!("incomplete filter '{}'", s)));
        }
        let values: Vec<AttrValue> = rhs.split(',').map(AttrValue::parse).collect();
        if !matches!(op, Op::In | Op::NotIn) && values.len() != 1 {
            return Err(MvpaError::format(format!(
                "operator '{}' takes a single value in '{}'",
                sym, s
            )));
        }
        Ok(AttrFilter {
            attr: attr.to_string(),
            op,
            values,
        })
    }
}

impl fmt::Display for AttrFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.values.iter().map(|v| v.to_string()).collect();
        write!(f, "{}{}{}", self.attr, self.op.symbol(), values.join(","))
    }
}

impl AttrFilter {
    /// Whether a single value passes the filter
    pub fn matches(&self, value: &AttrValue) -> bool {
        match self.op {
            Op::In => self.values.iter().any(|v| v == value),
            Op::NotIn => self.values.iter().all(|v| v != value),
            Op::Lt => value < &self.values[0],
            Op::Le => value <= &self.values[0],
            Op::Gt => value > &self.values[0],
            Op::Ge => value >= &self.values[0],
        }
    }

    /// Boolean mask over an attribute column
    pub fn mask(&self, attr: &Attribute) -> Vec<bool> {
        (0..attr.len()).map(|i| self.matches(&attr.get(i))).collect()
    }
}

/// Indices passing every filter over the given collection
///
/// `len` is the number of entries (samples or features) the collection
/// describes, which matters when there are no filters.
pub fn filter_indices(
    collection: &Collection,
    collection_name: &'static str,
    len: usize,
    filters: &[AttrFilter],
) -> Result<Vec<usize>> {
    let mut keep = vec![true; len];
    for filter in filters {
        let attr = collection
            .get(&filter.attr)
            .ok_or_else(|| MvpaError::MissingAttribute {
                collection: collection_name,
                name: filter.attr.clone(),
            })?;
        for (k, m) in keep.iter_mut().zip(filter.mask(attr)) {
            *k &= m;
        }
    }
    Ok(keep
        .iter()
        .enumerate()
        .filter_map(|(i, &k)| k.then_some(i))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_operators() {
        let f: AttrFilter = "targets==face,house".parse().unwrap();
        assert_eq!(f.op, Op::In);
        assert_eq!(f.values.len(), 2);

        let f: AttrFilter = "chunks<=3".parse().unwrap();
        assert_eq!(f.op, Op::Le);
        assert_eq!(f.values, vec![AttrValue::Int(3)]);

        let f: AttrFilter = "targets!=rest".parse().unwrap();
        assert_eq!(f.op, Op::NotIn);

        assert!("targets".parse::<AttrFilter>().is_err());
        assert!("chunks<1,2".parse::<AttrFilter>().is_err());
        assert!("==x".parse::<AttrFilter>().is_err());
    }

    #[test]
    fn filters_combine_with_and() {
        let mut sa = Collection::new();
        sa.insert(
            "targets".into(),
            Attribute::Str(vec!["a".into(), "b".into(), "a".into(), "rest".into()]),
        );
        sa.insert("chunks".into(), Attribute::Int(vec![0, 1, 2, 3]));
        let filters: Vec<AttrFilter> = vec![
            "targets!=rest".parse().unwrap(),
            "chunks>0".parse().unwrap(),
        ];
        assert_eq!(filter_indices(&sa, "sa", 4, &filters).unwrap(), vec![1, 2]);
        assert_eq!(filter_indices(&sa, "sa", 4, &[]).unwrap(), vec![0, 1, 2, 3]);

        let missing = vec!["nope==1".parse().unwrap()];
        assert!(filter_indices(&sa, "sa", 4, &missing).is_err());
    }
}
