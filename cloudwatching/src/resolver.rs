// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Leaf resolvers used by the configuration compiler.
//!
//! Dimension filters arrive as plain strings and are compiled into
//! [`Regex`] values here, while the default-statistic policy is narrowed into
//! the closed [`StatDefault`] enum. Both operations are pure and
//! deterministic.

use std::collections::BTreeMap;

use regex::Regex;
use serde::Serialize;

use crate::error::Error;

/// Behavior applied when a requested statistic has no datapoint for a
/// period.
///
/// The only way to obtain a value from configuration input is
/// [`StatDefault::resolve`], so downstream code never observes an
/// unrecognized policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize,)]
pub enum StatDefault
{
    /// No policy configured; the export pipeline skips missing datapoints.
    #[default]
    Unset,
    /// Repeat the last value observed for the series.
    Prior,
    /// Substitute `0`.
    Zero,
    /// Substitute not-a-number.
    NaN,
}

impl StatDefault
{
    /// Resolves a policy name as written in configuration.
    ///
    /// Matching is exact and case-sensitive. The empty string maps to
    /// [`StatDefault::Unset`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEnum`] for any other non-empty value.
    ///
    /// # Examples
    ///
    /// ```
    /// use cloudwatching::StatDefault;
    ///
    /// assert_eq!(StatDefault::resolve("Zero",).unwrap(), StatDefault::Zero);
    /// assert_eq!(StatDefault::resolve("",).unwrap(), StatDefault::Unset);
    /// assert!(StatDefault::resolve("zero",).is_err());
    /// ```
    pub fn resolve(name: &str,) -> Result<Self, Error,>
    {
        match name {
            "" => Ok(Self::Unset,),
            "Prior" => Ok(Self::Prior,),
            "Zero" => Ok(Self::Zero,),
            "NaN" => Ok(Self::NaN,),
            other => Err(Error::InvalidEnum {
                value: other.to_owned(),
            },),
        }
    }

    /// Returns `true` unless the policy is [`StatDefault::Unset`].
    pub fn is_set(self,) -> bool
    {
        !matches!(self, Self::Unset)
    }
}

/// Compiles every dimension pattern of a match or no-match mapping.
///
/// `field` names the configuration key the mapping came from and is echoed
/// in the error so users can locate the offending entry.
///
/// # Errors
///
/// Returns [`Error::PatternCompile`] for the first pattern (in dimension
/// order) that the regex engine rejects.
pub fn compile_patterns(
    field: &'static str,
    patterns: &BTreeMap<String, String,>,
) -> Result<BTreeMap<String, Regex,>, Error,>
{
    patterns
        .iter()
        .map(|(dimension, pattern,)| {
            Regex::new(pattern,)
                .map(|compiled| (dimension.clone(), compiled,),)
                .map_err(|source| Error::PatternCompile {
                    field,
                    dimension: dimension.clone(),
                    pattern: pattern.clone(),
                    source,
                },)
        },)
        .collect()
}
