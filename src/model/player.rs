use serde::{Deserialize, Serialize};

/// Playing position as listed in the "Амп" column.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[strum(serialize = "В", serialize = "в", serialize = "G", serialize = "goaltender")]
    Goaltender,
    #[strum(serialize = "З", serialize = "з", serialize = "D", serialize = "defenseman")]
    Defenseman,
    #[strum(serialize = "Н", serialize = "н", serialize = "F", serialize = "forward")]
    Forward,
    #[default]
    #[serde(other)]
    #[strum(disabled)]
    Unknown,
}

/// One player's line in a season statistics table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Canonical "Surname Name" form.
    pub name: String,
    pub team: String,
    pub team_abbr: String,
    #[serde(default)]
    pub position: Position,
    pub games: u32,
    pub goals: u32,
    pub assists: u32,
    pub points: u32,
    pub plus_minus: i32,
    /// Penalty minutes.
    pub penalty: u32,
}

/// Autocomplete entry returned while the user is typing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub name: String,
    pub team: String,
}

impl From<&PlayerRecord> for Suggestion {
    fn from(record: &PlayerRecord) -> Self {
        Self {
            name: record.name.clone(),
            team: record.team.clone(),
        }
    }
}
