use std::str::FromStr;

use itertools::Itertools;

use crate::model::{PlayerRecord, Position};
use crate::scraper::stats_table::RawRow;

/// Why a scraped row was dropped.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("row has no player name")]
    EmptyName,

    #[error("column {column} is not a valid number: {text:?}")]
    Field { column: &'static str, text: String },

    #[error("points {points} != goals {goals} + assists {assists}")]
    PointsMismatch { points: u32, goals: u32, assists: u32 },
}

/// Canonical display form of a name: trimmed, inner whitespace runs collapsed
/// to one space, casing untouched.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().join(" ")
}

/// Search key for a name or a query: canonical form, lowercased, `ё` folded to `е`.
pub fn fold(text: &str) -> String {
    normalize_name(text)
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c == 'ё' { 'е' } else { c })
        .collect()
}

/// Strict parser for non-negative counts. Only ASCII digits are accepted.
fn parse_count(column: &'static str, text: &str) -> Result<u32, RowError> {
    let text = text.trim();
    let invalid = || RowError::Field {
        column,
        text: text.to_string(),
    };
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    text.parse().map_err(|_| invalid())
}

/// Strict parser for plus/minus, which may carry a leading `+`, `-` or `−`.
fn parse_signed(column: &'static str, text: &str) -> Result<i32, RowError> {
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.chars().next() {
        Some('+') => (false, &trimmed[1..]),
        Some('-') => (true, &trimmed[1..]),
        Some('−') => (true, &trimmed['−'.len_utf8()..]),
        _ => (false, trimmed),
    };
    let magnitude = parse_count(column, digits).map_err(|_| RowError::Field {
        column,
        text: trimmed.to_string(),
    })?;
    let magnitude = i32::try_from(magnitude).map_err(|_| RowError::Field {
        column,
        text: trimmed.to_string(),
    })?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// Turn one raw row into a typed record, or reject it.
///
/// Numbers fail closed: a cell that is not a clean integer drops the row
/// instead of defaulting to zero. Points are taken from the table and must
/// equal goals + assists.
pub fn normalize_row(row: &RawRow) -> Result<PlayerRecord, RowError> {
    let name = normalize_name(&row.name);
    if name.is_empty() {
        return Err(RowError::EmptyName);
    }

    let games = parse_count("games", &row.games)?;
    let goals = parse_count("goals", &row.goals)?;
    let assists = parse_count("assists", &row.assists)?;
    let points = parse_count("points", &row.points)?;
    let plus_minus = parse_signed("plus_minus", &row.plus_minus)?;
    let penalty = parse_count("penalty", &row.penalty)?;

    check_points(points, goals, assists)?;

    Ok(PlayerRecord {
        name,
        team: normalize_name(&row.team),
        team_abbr: normalize_name(&row.team_abbr),
        position: Position::from_str(row.position.trim()).unwrap_or_default(),
        games,
        goals,
        assists,
        points,
        plus_minus,
        penalty,
    })
}

fn check_points(points: u32, goals: u32, assists: u32) -> Result<(), RowError> {
    if goals.checked_add(assists) != Some(points) {
        return Err(RowError::PointsMismatch {
            points,
            goals,
            assists,
        });
    }
    Ok(())
}

/// Re-check a record that arrived already typed, e.g. from a snapshot file.
///
/// Names are canonicalized again; an empty name or inconsistent points drop
/// the record just like a scraped row.
pub fn revalidate(record: PlayerRecord) -> Result<PlayerRecord, RowError> {
    let name = normalize_name(&record.name);
    if name.is_empty() {
        return Err(RowError::EmptyName);
    }
    check_points(record.points, record.goals, record.assists)?;
    Ok(PlayerRecord {
        name,
        team: normalize_name(&record.team),
        team_abbr: normalize_name(&record.team_abbr),
        ..record
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> RawRow {
        RawRow {
            name: "  Овечкин \t Александр ".to_string(),
            team: "Динамо  Москва".to_string(),
            team_abbr: "ДИН".to_string(),
            position: "Н".to_string(),
            games: "60".to_string(),
            goals: "30".to_string(),
            assists: "20".to_string(),
            points: "50".to_string(),
            plus_minus: "+12".to_string(),
            penalty: "24".to_string(),
        }
    }

    #[test]
    fn test_normalize_row() {
        let record = normalize_row(&row()).unwrap();
        assert_eq!(record.name, "Овечкин Александр");
        assert_eq!(record.team, "Динамо Москва");
        assert_eq!(record.position, Position::Forward);
        assert_eq!(record.games, 60);
        assert_eq!(record.points, 50);
        assert_eq!(record.plus_minus, 12);
    }

    #[test]
    fn test_numeric_garbage_is_rejected() {
        for garbage in ["", "н/д", "12a", "1.5", "-3", "+3", " ", "１２"] {
            let mut bad = row();
            bad.games = garbage.to_string();
            assert!(
                matches!(normalize_row(&bad), Err(RowError::Field { column: "games", .. })),
                "games = {garbage:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_plus_minus_signs() {
        for (text, expected) in [("0", 0), ("+7", 7), ("-7", -7), ("−3", -3), (" 5 ", 5)] {
            let mut r = row();
            r.plus_minus = text.to_string();
            assert_eq!(normalize_row(&r).unwrap().plus_minus, expected, "{text:?}");
        }
        for text in ["", "+", "--1", "+-1", "x"] {
            let mut r = row();
            r.plus_minus = text.to_string();
            assert!(normalize_row(&r).is_err(), "{text:?} should be rejected");
        }
    }

    #[test]
    fn test_points_must_add_up() {
        let mut r = row();
        r.points = "51".to_string();
        assert_eq!(
            normalize_row(&r),
            Err(RowError::PointsMismatch {
                points: 51,
                goals: 30,
                assists: 20
            })
        );
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let mut r = row();
        r.name = " \n ".to_string();
        assert_eq!(normalize_row(&r), Err(RowError::EmptyName));
    }

    #[test]
    fn test_unknown_position() {
        let mut r = row();
        r.position = "?".to_string();
        assert_eq!(normalize_row(&r).unwrap().position, Position::Unknown);
    }

    #[test]
    fn test_normalize_name_is_idempotent() {
        for name in ["Петров Иван", "  Петров   Иван ", "\tA\u{a0}B  C\n", "", "Ёлкин Пётр"] {
            let once = normalize_name(name);
            assert_eq!(normalize_name(&once), once);
            let folded = fold(name);
            assert_eq!(fold(&folded), folded);
        }
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold("  ПЕТРОВ   Иван "), "петров иван");
        assert_eq!(fold("Ёлкин Пётр"), "елкин петр");
    }

    #[test]
    fn test_revalidate_typed_record() {
        let record = normalize_row(&row()).unwrap();
        let spaced = PlayerRecord {
            name: " Овечкин   Александр".to_string(),
            ..record.clone()
        };
        assert_eq!(revalidate(spaced), Ok(record.clone()));

        let blank = PlayerRecord {
            name: "   ".to_string(),
            ..record.clone()
        };
        assert_eq!(revalidate(blank), Err(RowError::EmptyName));

        let inflated = PlayerRecord {
            points: 51,
            ..record
        };
        assert!(matches!(
            revalidate(inflated),
            Err(RowError::PointsMismatch { points: 51, .. })
        ));
    }
}
