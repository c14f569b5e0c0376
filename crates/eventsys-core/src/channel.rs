//! Channel set expressions
//!
//! A channel partitions the event space. Expressions:
//!
//! - `@all`: every channel (the wildcard)
//! - `!@all`: no channel
//! - `user` or `user,admin`: include list
//! - `!user` or `!user,admin`: exclude list (dispatch side only)

use std::collections::BTreeSet;

/// Wildcard channel expression
pub const ALL: &str = "@all";

/// Empty channel expression
pub const NONE: &str = "!@all";

/// Parsed channel expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSet {
    /// Every channel
    All,
    /// No channel
    None,
    /// Only the listed channels
    Include(BTreeSet<String>),
    /// Every channel except the listed ones
    Exclude(BTreeSet<String>),
}

impl ChannelSet {
    /// Parse a channel expression
    ///
    /// A blank expression names the blank channel. Blank entries inside a list are ignored.
    pub fn parse(expr: &str) -> ChannelSet {
        let expr = expr.trim();
        match expr {
            ALL => return ChannelSet::All,
            NONE => return ChannelSet::None,
            "" => return ChannelSet::Include(BTreeSet::from([String::new()])),
            _ => {}
        }

        let (exclude, list) = match expr.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, expr),
        };

        let channels: BTreeSet<String> = list
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();

        if channels.contains(ALL) {
            return if exclude { ChannelSet::None } else { ChannelSet::All };
        }

        match (exclude, channels.is_empty()) {
            (_, true) => ChannelSet::None,
            (true, false) => ChannelSet::Exclude(channels),
            (false, false) => ChannelSet::Include(channels),
        }
    }

    /// Whether `channel` is in this set
    pub fn contains(&self, channel: &str) -> bool {
        match self {
            ChannelSet::All => true,
            ChannelSet::None => false,
            ChannelSet::Include(set) => set.contains(channel),
            ChannelSet::Exclude(set) => !set.contains(channel),
        }
    }

    /// Whether a listener declared with this set receives a dispatch to `requested`
    pub fn listens_to(&self, requested: &ChannelSet) -> bool {
        match (self, requested) {
            (ChannelSet::None, _) | (_, ChannelSet::None) => false,
            (ChannelSet::All, _) | (_, ChannelSet::All) => true,
            (ChannelSet::Include(own), other) => own.iter().any(|c| other.contains(c)),
            (ChannelSet::Exclude(_), ChannelSet::Include(wanted)) => {
                wanted.iter().any(|c| self.contains(c))
            }
            // two exclude lists always leave some channel in common
            (ChannelSet::Exclude(_), ChannelSet::Exclude(_)) => true,
        }
    }

    /// Whether this is an exclude expression (including `!@all`)
    pub fn is_exclude(&self) -> bool {
        matches!(self, ChannelSet::Exclude(_) | ChannelSet::None)
    }

    /// Channels this set names, `@all` for the wildcard
    pub fn channels(&self) -> Vec<String> {
        match self {
            ChannelSet::All => vec![ALL.to_string()],
            ChannelSet::None => Vec::new(),
            ChannelSet::Include(set) | ChannelSet::Exclude(set) => set.iter().cloned().collect(),
        }
    }
}
