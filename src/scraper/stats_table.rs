use ::scraper::{ElementRef, Html, Selector};
use itertools::Itertools;
use tracing::{debug, warn};

use crate::error::{KhlError, Result};
use crate::model::{PlayerRecord, SeasonKey};
use crate::normalize::normalize_row;
use crate::scraper::cell_text;

/// Header label that identifies the player statistics table.
const PLAYER_LABEL: &str = "Игрок";

/// Text of one table row, split into the columns we care about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub name: String,
    pub team: String,
    pub team_abbr: String,
    pub position: String,
    pub games: String,
    pub goals: String,
    pub assists: String,
    pub points: String,
    pub plus_minus: String,
    pub penalty: String,
}

/// Rows pulled out of a statistics table, plus how many were skipped.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub rows: Vec<RawRow>,
    pub malformed: usize,
}

/// Column positions of the fields in the table.
///
/// Defaults follow the source's layout:
/// `№, Игрок, Команда, Ком, Амп, О, Ш, А, И, +/-, Штр, ...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    name: usize,
    team: usize,
    team_abbr: usize,
    position: usize,
    points: usize,
    goals: usize,
    assists: usize,
    games: usize,
    plus_minus: usize,
    penalty: usize,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            name: 1,
            team: 2,
            team_abbr: 3,
            position: 4,
            points: 5,
            goals: 6,
            assists: 7,
            games: 8,
            plus_minus: 9,
            penalty: 10,
        }
    }
}

impl Columns {
    /// Locate columns by their header labels, keeping the default position
    /// for any label the header does not carry.
    fn from_header(labels: &[String]) -> Self {
        let find = |label: &str, fallback: usize| {
            labels
                .iter()
                .position(|l| l == label)
                .unwrap_or(fallback)
        };
        let default = Self::default();
        Self {
            name: find(PLAYER_LABEL, default.name),
            team: find("Команда", default.team),
            team_abbr: find("Ком", default.team_abbr),
            position: find("Амп", default.position),
            points: find("О", default.points),
            goals: find("Ш", default.goals),
            assists: find("А", default.assists),
            games: find("И", default.games),
            plus_minus: find("+/-", default.plus_minus),
            penalty: find("Штр", default.penalty),
        }
    }

    /// Minimum number of cells a data row needs.
    fn width(&self) -> usize {
        [
            self.name,
            self.team,
            self.team_abbr,
            self.position,
            self.points,
            self.goals,
            self.assists,
            self.games,
            self.plus_minus,
            self.penalty,
        ]
        .into_iter()
        .max()
        .unwrap_or_default()
            + 1
    }

    fn pick(&self, cells: &[String]) -> RawRow {
        RawRow {
            name: cells[self.name].clone(),
            team: cells[self.team].clone(),
            team_abbr: cells[self.team_abbr].clone(),
            position: cells[self.position].clone(),
            games: cells[self.games].clone(),
            goals: cells[self.goals].clone(),
            assists: cells[self.assists].clone(),
            points: cells[self.points].clone(),
            plus_minus: cells[self.plus_minus].clone(),
            penalty: cells[self.penalty].clone(),
        }
    }
}

/// Pull raw player rows out of a statistics page.
///
/// Rows with too few cells are counted in [`Extraction::malformed`] and
/// skipped; rows with only empty cells (spacers) are ignored.
pub fn extract(document: &str) -> Result<Extraction> {
    let html = Html::parse_document(document);
    let table = find_stats_table(&html)?.ok_or(KhlError::TableNotFound)?;

    let row_selector = Selector::parse("tr")?;
    let cell_selector = Selector::parse("th, td")?;
    let row_cells = |row: ElementRef| row.select(&cell_selector).map(|c| cell_text(&c)).collect_vec();

    let mut rows = table.select(&row_selector);
    let header = rows.next().map(row_cells).unwrap_or_default();
    let columns = Columns::from_header(&header);
    let width = columns.width();

    let mut extraction = Extraction::default();
    for cells in rows.map(row_cells) {
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        if cells.len() < width {
            debug!(found = cells.len(), expected = width, "skipping short row");
            extraction.malformed += 1;
            continue;
        }
        extraction.rows.push(columns.pick(&cells));
    }
    Ok(extraction)
}

fn find_stats_table(html: &Html) -> Result<Option<ElementRef<'_>>> {
    let table_selector = Selector::parse("table")?;
    let header_selector = Selector::parse("th, td")?;
    Ok(html.select(&table_selector).find(|table| {
        table
            .select(&header_selector)
            .any(|cell| cell_text(&cell) == PLAYER_LABEL)
    }))
}

/// Extract and normalize a whole season page.
///
/// Fails with [`KhlError::EmptySeason`] when no row survives.
pub fn parse_season_page(document: &str, key: &SeasonKey) -> Result<Vec<PlayerRecord>> {
    let extraction = extract(document)?;
    let mut malformed = extraction.malformed;
    let mut records = Vec::with_capacity(extraction.rows.len());
    for row in &extraction.rows {
        match normalize_row(row) {
            Ok(record) => records.push(record),
            Err(e) => {
                debug!(error = %e, name = %row.name, "dropping row");
                malformed += 1;
            }
        }
    }

    if malformed > 0 {
        warn!(%key, malformed, kept = records.len(), "dropped malformed rows");
    }
    if records.is_empty() {
        return Err(KhlError::EmptySeason {
            season: key.season,
            mode: key.mode,
        });
    }
    debug!(%key, count = records.len(), "parsed season table");
    Ok(records)
}
