//! Filter chains for lookup tools.
//!
//! A lookup binding matches extracted data against an external table. Its
//! filters are evaluated in list order: index 0 is the primary filter.

use serde::{Deserialize, Serialize};
use sieve_core::{Direction, Error, Result};
use strum::{AsRefStr, Display, EnumString};

use crate::reference::ReferenceAddress;

/// Comparison applied by a column filter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FilterOperator {
    /// Whole-value match.
    #[default]
    Equals,
    /// Substring match.
    Contains,
    /// Prefix match.
    #[serde(alias = "startsWith")]
    StartsWith,
    /// Suffix match.
    #[serde(alias = "endsWith")]
    EndsWith,
}

/// Match tolerance of a filter, always a multiple of 10 in `0..=100`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(from = "u8", into = "u8")]
pub struct Fuzziness(u8);

impl Fuzziness {
    /// Exact matching.
    pub const EXACT: Self = Self(0);

    /// Quantizes to the nearest multiple of 10, clamped to 100.
    pub fn new(value: u8) -> Self {
        let value = value.min(100);
        Self((value + 5) / 10 * 10)
    }

    /// Returns the quantized value.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Returns the display label for this tolerance.
    pub fn label(self) -> &'static str {
        match self.0 {
            0 => "Exact",
            1..=30 => "Low",
            31..=60 => "Medium",
            _ => "High",
        }
    }
}

impl From<u8> for Fuzziness {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<Fuzziness> for u8 {
    fn from(value: Fuzziness) -> Self {
        value.0
    }
}

/// A single column filter of a lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct ColumnFilter {
    /// Lookup table column the filter applies to.
    pub column: String,
    /// Comparison operator.
    #[serde(default)]
    pub operator: FilterOperator,
    /// Earlier output the column is compared against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_input_reference: Option<ReferenceAddress>,
    /// Match tolerance.
    #[serde(default)]
    pub fuzziness: Fuzziness,
}

impl ColumnFilter {
    /// Creates an exact `equals` filter on a column.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator: FilterOperator::default(),
            bound_input_reference: None,
            fuzziness: Fuzziness::EXACT,
        }
    }
}

/// Ordered filters of a lookup, highest priority first.
///
/// Index-based operations with an index outside the chain do nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(transparent)]
pub struct FilterChain(Vec<ColumnFilter>);

impl FilterChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the filters in priority order.
    pub fn filters(&self) -> &[ColumnFilter] {
        &self.0
    }

    /// Returns the number of filters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the chain has no filters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends a filter at the lowest priority and returns its index.
    pub fn append_filter(&mut self, column: impl Into<String>) -> usize {
        self.0.push(ColumnFilter::new(column));
        self.0.len() - 1
    }

    /// Swaps a filter with its neighbour. Returns `false` when nothing moved.
    pub fn reorder(&mut self, index: usize, direction: Direction) -> bool {
        let target = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => index.checked_add(1),
        };
        match target {
            Some(target) if index < self.0.len() && target < self.0.len() => {
                self.0.swap(index, target);
                true
            }
            _ => false,
        }
    }

    /// Removes and returns the filter at `index`.
    pub fn remove_filter(&mut self, index: usize) -> Option<ColumnFilter> {
        (index < self.0.len()).then(|| self.0.remove(index))
    }

    /// Sets the fuzziness of a filter, quantized.
    pub fn set_fuzziness(&mut self, index: usize, value: u8) -> bool {
        self.with_filter(index, |filter| filter.fuzziness = Fuzziness::new(value))
    }

    /// Sets the operator of a filter.
    pub fn set_operator(&mut self, index: usize, operator: FilterOperator) -> bool {
        self.with_filter(index, |filter| filter.operator = operator)
    }

    /// Points a filter at an earlier output, or clears it.
    pub fn bind_input(&mut self, index: usize, reference: Option<ReferenceAddress>) -> bool {
        self.with_filter(index, |filter| filter.bound_input_reference = reference)
    }

    fn with_filter(&mut self, index: usize, apply: impl FnOnce(&mut ColumnFilter)) -> bool {
        match self.0.get_mut(index) {
            Some(filter) => {
                apply(filter);
                true
            }
            None => false,
        }
    }
}

impl FromIterator<ColumnFilter> for FilterChain {
    fn from_iter<I: IntoIterator<Item = ColumnFilter>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Configuration of a lookup binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct LookupConfig {
    /// Column filters in priority order.
    #[serde(default)]
    pub filters: FilterChain,
    /// Optional column used to narrow the lookup by category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_column: Option<String>,
    /// Column whose content becomes the extracted value.
    pub output_column: String,
    /// Set when a bound input no longer resolves.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stale: bool,
}

impl LookupConfig {
    /// Creates a configuration with no filters.
    pub fn new(output_column: impl Into<String>) -> Self {
        Self {
            filters: FilterChain::new(),
            category_column: None,
            output_column: output_column.into(),
            stale: false,
        }
    }

    /// Checks that the mandatory columns are named.
    pub fn validate(&self) -> Result<()> {
        if self.output_column.trim().is_empty() {
            return Err(Error::invalid_operation().with_message("lookup output column is required"));
        }
        if let Some(position) = self
            .filters
            .filters()
            .iter()
            .position(|filter| filter.column.trim().is_empty())
        {
            return Err(Error::invalid_operation()
                .with_message(format!("lookup filter {position} has no column")));
        }
        Ok(())
    }

    /// Returns the addresses the filters are bound to.
    pub fn bound_references(&self) -> impl Iterator<Item = &ReferenceAddress> {
        self.filters
            .filters()
            .iter()
            .filter_map(|filter| filter.bound_input_reference.as_ref())
    }

    pub(crate) fn bound_references_mut(&mut self) -> impl Iterator<Item = &mut ReferenceAddress> {
        self.filters
            .0
            .iter_mut()
            .filter_map(|filter| filter.bound_input_reference.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(chain: &FilterChain) -> Vec<&str> {
        chain.filters().iter().map(|filter| filter.column.as_str()).collect()
    }

    #[test]
    fn test_fuzziness_quantization() {
        assert_eq!(Fuzziness::new(0).get(), 0);
        assert_eq!(Fuzziness::new(4).get(), 0);
        assert_eq!(Fuzziness::new(5).get(), 10);
        assert_eq!(Fuzziness::new(64).get(), 60);
        assert_eq!(Fuzziness::new(95).get(), 100);
        assert_eq!(Fuzziness::new(250).get(), 100);
    }

    #[test]
    fn test_fuzziness_labels() {
        assert_eq!(Fuzziness::new(0).label(), "Exact");
        assert_eq!(Fuzziness::new(30).label(), "Low");
        assert_eq!(Fuzziness::new(40).label(), "Medium");
        assert_eq!(Fuzziness::new(60).label(), "Medium");
        assert_eq!(Fuzziness::new(70).label(), "High");
    }

    #[test]
    fn test_fuzziness_deserializes_quantized() {
        let filter: ColumnFilter =
            serde_json::from_str(r#"{"column":"Name","fuzziness":47}"#).unwrap();
        assert_eq!(filter.fuzziness.get(), 50);
        assert_eq!(filter.operator, FilterOperator::Equals);
    }

    #[test]
    fn test_operator_accepts_camel_case() {
        let operator: FilterOperator = serde_json::from_str(r#""startsWith""#).unwrap();
        assert_eq!(operator, FilterOperator::StartsWith);
        assert_eq!(
            serde_json::to_string(&FilterOperator::EndsWith).unwrap(),
            r#""ends_with""#
        );
    }

    #[test]
    fn test_reorder_and_remove() {
        let mut chain = FilterChain::new();
        chain.append_filter("SSN");
        let name = chain.append_filter("Name");
        chain.set_fuzziness(name, 60);

        assert!(chain.reorder(name, Direction::Up));
        assert_eq!(columns(&chain), ["Name", "SSN"]);
        assert_eq!(chain.filters()[0].fuzziness.get(), 60);

        assert!(!chain.reorder(0, Direction::Up));
        assert!(!chain.reorder(1, Direction::Down));
        assert!(!chain.reorder(7, Direction::Up));
        assert_eq!(columns(&chain), ["Name", "SSN"]);

        chain.remove_filter(1);
        assert!(!chain.reorder(0, Direction::Down));
        assert!(chain.remove_filter(0).is_some());
        assert!(chain.is_empty());
        assert!(chain.remove_filter(0).is_none());
    }

    #[test]
    fn test_out_of_range_edits_are_noops() {
        let mut chain = FilterChain::new();
        chain.append_filter("SSN");
        assert!(!chain.set_fuzziness(3, 50));
        assert!(!chain.set_operator(3, FilterOperator::Contains));
        assert_eq!(chain.filters()[0], ColumnFilter::new("SSN"));
    }

    #[test]
    fn test_lookup_requires_output_column() {
        let config = LookupConfig::new("  ");
        assert!(config.validate().is_err());

        let mut config = LookupConfig::new("Salary");
        config.filters.append_filter("");
        assert!(config.validate().is_err());
    }
}
