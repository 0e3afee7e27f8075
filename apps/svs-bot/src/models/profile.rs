//! Per-user profile data.
//!
//! A profile holds the attributes that persist across events (profession,
//! level, units, equipment) together with the attendance status for the
//! currently active event.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Discord user ID.
pub type UserId = u64;

/// Attendance intent for the active event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    Yes,
    Maybe,
    #[default]
    No,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Yes, Status::Maybe, Status::No];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Yes => "YES",
            Status::Maybe => "MAYBE",
            Status::No => "NO",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "YES" => Ok(Status::Yes),
            "MAYBE" => Ok(Status::Maybe),
            "NO" => Ok(Status::No),
            other => Err(Error::Validation(format!("Unknown status '{other}'"))),
        }
    }
}

// Level labels are indexed by `level - 1`.
const COMBAT_ENGINEER_LEVELS: &[&str] = &["1-29", "30-44", "45-59", "60"];
const MASTERMIND_LEVELS: &[&str] = &["1-19", "20-39", "40-54", "55-59", "60"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, poise::ChoiceParameter)]
pub enum Profession {
    #[name = "Combat Engineer"]
    #[name = "CE"]
    CombatEngineer,
    #[name = "Mastermind"]
    #[name = "MM"]
    Mastermind,
}

impl Profession {
    pub const ALL: [Profession; 2] = [Profession::CombatEngineer, Profession::Mastermind];

    /// Short code used in storage and in the roster export.
    pub fn code(self) -> &'static str {
        match self {
            Profession::CombatEngineer => "CE",
            Profession::Mastermind => "MM",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Profession::CombatEngineer => "Combat Engineer",
            Profession::Mastermind => "Mastermind",
        }
    }

    fn level_table(self) -> &'static [&'static str] {
        match self {
            Profession::CombatEngineer => COMBAT_ENGINEER_LEVELS,
            Profession::Mastermind => MASTERMIND_LEVELS,
        }
    }

    pub fn max_level(self) -> u8 {
        self.level_table().len() as u8
    }

    /// Human-readable label for a stored level ordinal.
    pub fn level_label(self, level: u8) -> Option<&'static str> {
        let index = usize::from(level).checked_sub(1)?;
        self.level_table().get(index).copied()
    }

    /// Only Masterminds carry traps.
    pub fn uses_traps(self) -> bool {
        matches!(self, Profession::Mastermind)
    }
}

impl FromStr for Profession {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Profession::ALL
            .into_iter()
            .find(|p| p.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Validation(format!("Unknown class '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, poise::ChoiceParameter)]
pub enum Unit {
    Army,
    Navy,
    #[name = "Air Force"]
    AirForce,
}

impl Unit {
    pub const ALL: [Unit; 3] = [Unit::Army, Unit::Navy, Unit::AirForce];

    pub fn code(self) -> &'static str {
        match self {
            Unit::Army => "A",
            Unit::Navy => "N",
            Unit::AirForce => "F",
        }
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::ALL
            .into_iter()
            .find(|u| u.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Validation(format!("Unknown unit '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, poise::ChoiceParameter)]
pub enum Trap {
    Landmine,
    Barricade,
    Turret,
    Snare,
}

impl Trap {
    pub const ALL: [Trap; 4] = [Trap::Landmine, Trap::Barricade, Trap::Turret, Trap::Snare];

    /// Abbreviation shown in the roster export.
    pub fn code(self) -> &'static str {
        match self {
            Trap::Landmine => "LM",
            Trap::Barricade => "BC",
            Trap::Turret => "TR",
            Trap::Snare => "SN",
        }
    }
}

impl FromStr for Trap {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Trap::ALL
            .into_iter()
            .find(|t| t.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Validation(format!("Unknown trap '{s}'")))
    }
}

/// The profession half of a profile, supplied by the user at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDetails {
    pub profession: Profession,
    pub level: u8,
    pub units: Vec<Unit>,
    pub march_size: String,
    pub alliance: String,
    pub traps: Vec<Trap>,
    pub skins: Vec<String>,
}

impl ProfileDetails {
    /// Check the details are internally consistent.
    ///
    /// Units must be a non-empty set, the level must exist for the
    /// profession, and traps are only accepted for professions that use them.
    pub fn validate(&self) -> Result<(), Error> {
        if self.units.is_empty() {
            return Err(Error::Validation("At least one unit type is required.".into()));
        }
        for (i, unit) in self.units.iter().enumerate() {
            if self.units[..i].contains(unit) {
                return Err(Error::Validation(format!(
                    "Unit '{}' was given more than once.",
                    unit.code()
                )));
            }
        }
        if self.profession.level_label(self.level).is_none() {
            return Err(Error::Validation(format!(
                "Level must be between 1 and {} for {}.",
                self.profession.max_level(),
                self.profession.display_name()
            )));
        }
        if !self.traps.is_empty() && !self.profession.uses_traps() {
            return Err(Error::Validation(format!(
                "{} does not use traps.",
                self.profession.display_name()
            )));
        }
        if self.march_size.trim().is_empty() || self.alliance.trim().is_empty() {
            return Err(Error::Validation(
                "March size and alliance must not be empty.".into(),
            ));
        }
        Ok(())
    }
}

/// A registered user's stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEntry {
    pub id: UserId,
    pub details: ProfileDetails,
    pub status: Status,
    pub lottery_opt_in: bool,
    pub interacted_with_event: bool,
}

impl ProfileEntry {
    /// A freshly registered profile: status NO, lottery opted in.
    pub fn new(id: UserId, details: ProfileDetails) -> Self {
        Self {
            id,
            details,
            status: Status::No,
            lottery_opt_in: true,
            interacted_with_event: false,
        }
    }
}

/// Join codes the way they are stored: `"A, N"`.
pub(crate) fn join_list<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Inverse of [`join_list`]; blank input yields an empty list.
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
