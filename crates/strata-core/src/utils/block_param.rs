//! Block references and hex quantities as they appear on the wire.
//!
//! Block-tag parameters (`eth_getBalance`'s second argument and friends) are
//! either a tag name or a `0x`-prefixed quantity. Block numbers in results,
//! such as `eth_blockNumber` or a header's `number`, are always quantities.

use serde_json::Value;

/// Named block tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Earliest,
    /// Not yet mined; its contents change between calls.
    Pending,
    Safe,
    Finalized,
}

impl BlockTag {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "latest" => Some(Self::Latest),
            "earliest" => Some(Self::Earliest),
            "pending" => Some(Self::Pending),
            "safe" => Some(Self::Safe),
            "finalized" => Some(Self::Finalized),
            _ => None,
        }
    }
}

/// The block a request is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRef {
    Number(u64),
    Tag(BlockTag),
}

impl BlockRef {
    /// Reads a block-tag parameter.
    ///
    /// Returns `None` for anything that is neither a known tag nor a hex
    /// quantity; decimal strings are not valid block parameters.
    ///
    /// ```
    /// use strata_core::utils::{BlockRef, BlockTag};
    ///
    /// assert_eq!(BlockRef::parse("pending"), Some(BlockRef::Tag(BlockTag::Pending)));
    /// assert_eq!(BlockRef::parse("0x10"), Some(BlockRef::Number(16)));
    /// assert_eq!(BlockRef::parse("16"), None);
    /// ```
    #[must_use]
    pub fn parse(param: &str) -> Option<Self> {
        BlockTag::from_name(param).map(Self::Tag).or_else(|| parse_quantity(param).map(Self::Number))
    }
}

/// Parses a `0x`-prefixed hex quantity.
#[must_use]
pub fn parse_quantity(s: &str) -> Option<u64> {
    let digits = s.strip_prefix("0x")?;
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Reads a quantity out of a JSON result value.
#[must_use]
pub fn quantity(value: &Value) -> Option<u64> {
    value.as_str().and_then(parse_quantity)
}

/// Formats `number` as a `0x`-prefixed hex quantity.
#[must_use]
pub fn to_quantity(number: u64) -> String {
    format!("0x{number:x}")
}
