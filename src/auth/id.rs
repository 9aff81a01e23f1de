//! Strongly typed identifiers used across the client.

// self
use crate::_prelude::*;

/// Server-assigned identifier of an uploaded dataset (and its analysis job).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(pub u64);
impl DatasetId {
	/// Returns the raw numeric identifier.
	pub const fn get(self) -> u64 {
		self.0
	}
}
impl From<u64> for DatasetId {
	fn from(value: u64) -> Self {
		Self(value)
	}
}
impl Debug for DatasetId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Dataset({})", self.0)
	}
}
impl Display for DatasetId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		Display::fmt(&self.0, f)
	}
}
impl FromStr for DatasetId {
	type Err = DatasetIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		s.trim()
			.parse::<u64>()
			.map(Self)
			.map_err(|_| DatasetIdError::NotNumeric { value: s.to_owned() })
	}
}

/// Error returned when a dataset identifier cannot be parsed.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum DatasetIdError {
	/// The identifier is not a non-negative integer.
	#[error("Dataset identifier `{value}` is not numeric.")]
	NotNumeric {
		/// Rejected input.
		value: String,
	},
}
