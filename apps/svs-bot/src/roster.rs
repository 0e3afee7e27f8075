//! Roster export.
//!
//! Turns the flat profile rows of an event into the grouped, sorted,
//! side-by-side CSV handed to organisers when signups close. The work is a
//! pipeline of pure stages (filter, lottery, partition, sort, render, pad,
//! write) so each one can be checked on its own.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::error::Error;
use crate::models::{Profession, ProfileEntry, Status, Unit};
use crate::platform::Platform;
use crate::store::Store;

/// Columns every group occupies, including its trailing gap. A Combat
/// Engineer group is 5 cells wide plus a 2-cell gap; a Mastermind group is 6
/// cells (traps last) plus a 1-cell gap, so the two line up column for column.
const GROUP_STRIDE: usize = 7;
const ANNOTATION_COLUMN: usize = 3 * GROUP_STRIDE - 1;
const SEPARATOR_ROWS: usize = 5;
const COLUMN_TITLES: [&str; 5] = ["Name", "Class", "Units", "Level", "Skins"];
const TRAPS_TITLE: &str = "Traps";

/// Which attendees an export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum ExportFilter {
    /// Only `YES`; used when an event is closed.
    #[name = "yes"]
    Yes,
    /// `YES` or `MAYBE`.
    #[name = "attending"]
    Attending,
    /// Everyone in the database.
    #[name = "all"]
    All,
}

impl ExportFilter {
    pub fn statuses(self) -> &'static [Status] {
        match self {
            ExportFilter::Yes => &[Status::Yes],
            ExportFilter::Attending => &[Status::Yes, Status::Maybe],
            ExportFilter::All => &Status::ALL,
        }
    }
}

/// A profile paired with the name it is exported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
    pub name: String,
    pub profile: ProfileEntry,
}

/// Reduce a display name to its ASCII characters.
///
/// Returns `None` when nothing printable is left, in which case the user is
/// left out of exports.
pub fn sanitize_name(raw: &str) -> Option<String> {
    let ascii: String = raw.chars().filter(char::is_ascii).collect();
    let trimmed = ascii.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Load the profiles matching `filter` and resolve their export names.
pub async fn load_rows(
    store: &Store,
    platform: &dyn Platform,
    filter: ExportFilter,
) -> Result<Vec<RosterRow>, Error> {
    let profiles = store.profiles_with_status(filter.statuses()).await?;
    let total = profiles.len();
    let rows = resolve_names(platform, profiles).await;

    info!(?filter, total, exported = rows.len(), "Loaded roster rows");
    Ok(rows)
}

/// Load everyone who reacted to the current event.
pub async fn load_interaction_rows(
    store: &Store,
    platform: &dyn Platform,
) -> Result<Vec<RosterRow>, Error> {
    let profiles = store.interacted_profiles().await?;
    let total = profiles.len();
    let rows = resolve_names(platform, profiles).await;

    info!(total, exported = rows.len(), "Loaded interaction rows");
    Ok(rows)
}

async fn resolve_names(platform: &dyn Platform, profiles: Vec<ProfileEntry>) -> Vec<RosterRow> {
    let mut rows = Vec::with_capacity(profiles.len());
    for profile in profiles {
        match platform.display_name(profile.id).await.as_deref().and_then(sanitize_name) {
            Some(name) => rows.push(RosterRow { name, profile }),
            None => debug!(user = %profile.id, "Skipping profile without a usable display name"),
        }
    }
    rows
}

/// Pick up to `count` lottery winners uniformly among opted-in rows.
pub fn select_lottery_winners<R>(rows: &[RosterRow], count: usize, rng: &mut R) -> Vec<String>
where
    R: Rng + ?Sized,
{
    let mut eligible: Vec<&str> = rows
        .iter()
        .filter(|row| row.profile.lottery_opt_in)
        .map(|row| row.name.as_str())
        .collect();

    eligible.shuffle(rng);
    eligible.truncate(count);
    eligible.into_iter().map(str::to_string).collect()
}

/// Rows split into the groups the export lays out.
#[derive(Debug, Default)]
pub struct Partition<'a> {
    pub multi_unit: BTreeMap<Profession, Vec<&'a RosterRow>>,
    pub single_unit: BTreeMap<(Profession, Unit), Vec<&'a RosterRow>>,
}

pub fn partition(rows: &[RosterRow]) -> Partition<'_> {
    let mut groups = Partition::default();
    for row in rows {
        let details = &row.profile.details;
        match details.units.as_slice() {
            [] => {}
            [unit] => groups
                .single_unit
                .entry((details.profession, *unit))
                .or_default()
                .push(row),
            _ => groups
                .multi_unit
                .entry(details.profession)
                .or_default()
                .push(row),
        }
    }
    groups
}

/// Most unit types first, then highest level. Stable.
pub fn sort_multi_unit(rows: &mut [&RosterRow]) {
    rows.sort_by(|a, b| {
        let (a, b) = (&a.profile.details, &b.profile.details);
        b.units
            .len()
            .cmp(&a.units.len())
            .then(b.level.cmp(&a.level))
    });
}

/// Highest level first. Stable.
pub fn sort_single_unit(rows: &mut [&RosterRow]) {
    rows.sort_by(|a, b| b.profile.details.level.cmp(&a.profile.details.level));
}

fn group_width(profession: Profession) -> usize {
    if profession.uses_traps() {
        COLUMN_TITLES.len() + 1
    } else {
        COLUMN_TITLES.len()
    }
}

/// Human-readable cells for one row; Mastermind rows carry a trailing traps
/// cell, Combat Engineer rows have none.
pub fn render_cells(row: &RosterRow) -> Vec<String> {
    let d = &row.profile.details;
    let mut cells = vec![
        row.name.clone(),
        d.profession.code().to_string(),
        d.units.iter().map(|u| u.code()).collect::<Vec<_>>().join(" "),
        d.profession.level_label(d.level).unwrap_or_default().to_string(),
        d.skins.join(" "),
    ];
    if d.profession.uses_traps() {
        cells.push(d.traps.iter().map(|t| t.code()).collect::<Vec<_>>().join(" "));
    }
    cells
}

fn column_titles(profession: Profession) -> Vec<String> {
    let mut titles: Vec<String> = COLUMN_TITLES.iter().map(|t| t.to_string()).collect();
    if profession.uses_traps() {
        titles.push(TRAPS_TITLE.to_string());
    }
    titles
}

/// One column group of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub title: String,
    pub width: usize,
    pub rows: Vec<Vec<String>>,
}

/// Lay columns side by side, each starting at a multiple of the group stride.
/// Shorter columns are padded with blank rows so every column has the same
/// row count; real rows keep their order.
pub fn pad_side_by_side(columns: &[Column]) -> Vec<Vec<String>> {
    let height = columns.iter().map(|c| c.rows.len()).max().unwrap_or(0);

    (0..height)
        .map(|i| {
            let mut line = Vec::new();
            for (n, column) in columns.iter().enumerate() {
                let start = n * GROUP_STRIDE;
                line.resize(start, String::new());
                match column.rows.get(i) {
                    Some(cells) => line.extend(cells.iter().cloned()),
                    None => line.extend(std::iter::repeat(String::new()).take(column.width)),
                }
            }
            line
        })
        .collect()
}

fn block_header(columns: &[Column], annotation: Option<&str>) -> Vec<String> {
    let mut header = Vec::new();
    for (n, column) in columns.iter().enumerate() {
        header.resize(n * GROUP_STRIDE, String::new());
        header.push(column.title.clone());
    }
    if let Some(annotation) = annotation {
        header.resize(ANNOTATION_COLUMN, String::new());
        header.push(annotation.to_string());
    }
    header
}

fn title_row(professions: &[Profession]) -> Vec<String> {
    let mut titles = Vec::new();
    for (n, profession) in professions.iter().enumerate() {
        titles.resize(n * GROUP_STRIDE, String::new());
        titles.extend(column_titles(*profession));
    }
    titles
}

fn column(title: String, profession: Profession, rows: Option<&Vec<&RosterRow>>) -> Column {
    Column {
        title,
        width: group_width(profession),
        rows: rows
            .map(|rows| rows.iter().map(|r| render_cells(r)).collect())
            .unwrap_or_default(),
    }
}

fn unit_name(unit: Unit) -> &'static str {
    match unit {
        Unit::Army => "Army",
        Unit::Navy => "Navy",
        Unit::AirForce => "Air Force",
    }
}

/// Build the full roster export for `rows`.
pub fn build_roster_csv<R>(rows: &[RosterRow], lottery_count: usize, rng: &mut R) -> String
where
    R: Rng + ?Sized,
{
    let winners = select_lottery_winners(rows, lottery_count, rng);
    let mut groups = partition(rows);
    for group in groups.multi_unit.values_mut() {
        sort_multi_unit(group);
    }
    for group in groups.single_unit.values_mut() {
        sort_single_unit(group);
    }

    let mut lines: Vec<Vec<String>> = Vec::new();

    let multi: Vec<Column> = Profession::ALL
        .iter()
        .map(|p| column(format!("{} multi units", p.code()), *p, groups.multi_unit.get(p)))
        .collect();
    lines.push(block_header(
        &multi,
        Some("Sorted by number of units followed by level"),
    ));
    lines.push(title_row(&Profession::ALL));
    lines.extend(pad_side_by_side(&multi));

    for (n, profession) in Profession::ALL.iter().enumerate() {
        lines.extend(std::iter::repeat(Vec::new()).take(SEPARATOR_ROWS));

        let singles: Vec<Column> = Unit::ALL
            .iter()
            .map(|u| {
                column(
                    format!("{} single units - {}", profession.code(), unit_name(*u)),
                    *profession,
                    groups.single_unit.get(&(*profession, *u)),
                )
            })
            .collect();
        let annotation = (n == 0).then_some("Grouped by unit type - sorted by level");
        lines.push(block_header(&singles, annotation));
        lines.push(title_row(&[*profession; 3]));
        lines.extend(pad_side_by_side(&singles));
    }

    lines.extend(std::iter::repeat(Vec::new()).take(SEPARATOR_ROWS));
    lines.push(vec!["Lottery Winners".to_string()]);
    lines.push(Vec::new());
    lines.extend(winners.into_iter().map(|w| vec![w]));

    render_csv(&lines)
}

/// Export of everyone who touched the event: name, status and alliance,
/// grouped YES, MAYBE, NO.
pub fn build_interaction_csv(rows: &[RosterRow]) -> String {
    let mut sorted: Vec<&RosterRow> = rows.iter().collect();
    sorted.sort_by_key(|r| {
        let rank = Status::ALL.iter().position(|s| *s == r.profile.status);
        (rank, r.name.to_ascii_lowercase())
    });

    let mut lines = vec![vec!["Name".to_string(), "Status".to_string(), "Alliance".to_string()]];
    lines.extend(sorted.into_iter().map(|r| {
        vec![
            r.name.clone(),
            r.profile.status.to_string(),
            r.profile.details.alliance.clone(),
        ]
    }));
    render_csv(&lines)
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Comma-separated rows, minimal quoting, `\n` line endings.
pub fn render_csv(lines: &[Vec<String>]) -> String {
    let mut out = String::new();
    for line in lines {
        let fields: Vec<String> = line.iter().map(|f| escape_field(f)).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}
