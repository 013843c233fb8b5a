use itertools::Itertools;

use crate::index::{Entry, SeasonIndex};
use crate::model::PlayerRecord;
use crate::normalize::fold;

/// Most suggestions returned while the user is typing.
pub const MAX_SUGGESTIONS: usize = 10;

/// Outcome of resolving a submitted name against an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<'a> {
    Found(&'a PlayerRecord),
    /// Several players match; the caller has to pick one.
    Ambiguous(Vec<&'a PlayerRecord>),
    NotFound,
}

impl<'a> Lookup<'a> {
    fn from_matches(matches: Vec<&'a PlayerRecord>) -> Option<Self> {
        match matches.len() {
            0 => None,
            1 => Some(Lookup::Found(matches[0])),
            _ => Some(Lookup::Ambiguous(matches)),
        }
    }
}

/// Entries matching `pred`, ordered by where the query starts in the name
/// and then alphabetically.
fn ranked<'a>(
    index: &'a SeasonIndex,
    query: &str,
    pred: impl Fn(&Entry) -> bool,
) -> Vec<&'a PlayerRecord> {
    index
        .entries()
        .iter()
        .filter(|e| pred(*e))
        .filter_map(|e| {
            let byte_pos = e.folded.find(query)?;
            let pos = e.folded[..byte_pos].chars().count();
            Some((pos, e))
        })
        .sorted_by(|(a_pos, a), (b_pos, b)| {
            a_pos
                .cmp(b_pos)
                .then_with(|| a.folded.cmp(&b.folded))
                .then_with(|| a.record.team.cmp(&b.record.team))
        })
        .map(|(_, e)| &e.record)
        .collect()
}

/// Players whose name contains `query`, case- and whitespace-insensitively,
/// capped at [`MAX_SUGGESTIONS`].
pub fn suggest<'a>(index: &'a SeasonIndex, query: &str) -> Vec<&'a PlayerRecord> {
    let query = fold(query);
    if query.is_empty() {
        return Vec::new();
    }
    let mut matches = ranked(index, &query, |_| true);
    matches.truncate(MAX_SUGGESTIONS);
    matches
}

/// Resolve a submitted name to a single player.
///
/// Tries, in order: exact name, whole leading token (a surname shared by
/// several players), then substring. The first tier with any match decides:
/// one match is [`Lookup::Found`], more is [`Lookup::Ambiguous`]. A lookup
/// never picks one of several candidates on its own.
pub fn lookup<'a>(index: &'a SeasonIndex, query: &str) -> Lookup<'a> {
    let query = fold(query);
    if query.is_empty() {
        return Lookup::NotFound;
    }

    let exact = ranked(index, &query, |e| e.folded == query);
    let token_prefix = || {
        ranked(index, &query, |e| {
            e.folded
                .strip_prefix(query.as_str())
                .is_some_and(|rest| rest.starts_with(' '))
        })
    };
    let substring = || ranked(index, &query, |_| true);

    Lookup::from_matches(exact)
        .or_else(|| Lookup::from_matches(token_prefix()))
        .or_else(|| Lookup::from_matches(substring()))
        .unwrap_or(Lookup::NotFound)
}
