use candid::{CandidType, Deserialize};
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

// =============================================================================
// CONSTANTS
// =============================================================================

// Virtual canvas the Mondrian generator subdivides (not the placement grid).
pub const VIRTUAL_CANVAS_WIDTH: u32 = 1000;
pub const VIRTUAL_CANVAS_HEIGHT: u32 = 1000;
pub const TARGET_BLOCKS: usize = 400;
pub const MIN_BLOCK_SIZE: u32 = 25;

pub const DEFAULT_GRID_WIDTH: u16 = 20;
pub const DEFAULT_GRID_HEIGHT: u16 = 20;
pub const DEFAULT_PIXEL_SIZE: u16 = 30;
pub const DEFAULT_COOLDOWN_MINUTES: u64 = 60;
pub const DEFAULT_POINT_COST: u64 = 1;
pub const CAMPAIGN_DURATION_DAYS: u64 = 7;

pub const NS_PER_SECOND: u64 = 1_000_000_000;
pub const NS_PER_MINUTE: u64 = 60 * NS_PER_SECOND;
pub const NS_PER_HOUR: u64 = 60 * NS_PER_MINUTE;
pub const NS_PER_DAY: u64 = 24 * NS_PER_HOUR;

// Campaign deadlines are pinned to fixed times of day (UTC).
pub const CAMPAIGN_END_CUTOFF_HOUR: u64 = 10; // end date counts from 10:00
pub const WIPE_HOUR: u64 = 23; // wipe fires at 23:59 of the declaration day
pub const WIPE_MINUTE: u64 = 59;
pub const NEW_CAMPAIGN_START_HOUR: u64 = 6; // next campaign opens 06:00 tomorrow

pub const UNAFFILIATED_COLOR: &str = "#cccccc";

// =============================================================================
// HOUSES
// =============================================================================

#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum House {
    Phoenix,
    Dragon,
    Hydra,
    Griffin,
    Staff,
}

impl House {
    /// The four houses that compete for territory. Staff is a protected
    /// pseudo-faction and never wins automatic detection.
    pub const COMPETING: [House; 4] = [House::Phoenix, House::Dragon, House::Hydra, House::Griffin];
    pub const ALL: [House; 5] = [
        House::Phoenix,
        House::Dragon,
        House::Hydra,
        House::Griffin,
        House::Staff,
    ];

    pub fn color(&self) -> &'static str {
        match self {
            House::Phoenix => "#dc143c",
            House::Dragon => "#228b22",
            House::Hydra => "#4169e1",
            House::Griffin => "#ff8c00",
            House::Staff => "#000000",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            House::Phoenix => "Phoenix",
            House::Dragon => "Dragon",
            House::Hydra => "Hydra",
            House::Griffin => "Griffin",
            House::Staff => "Staff",
        }
    }

    pub fn from_name(name: &str) -> Option<House> {
        match name.trim() {
            "Phoenix" => Some(House::Phoenix),
            "Dragon" => Some(House::Dragon),
            "Hydra" => Some(House::Hydra),
            "Griffin" => Some(House::Griffin),
            "Staff" => Some(House::Staff),
            _ => None,
        }
    }
}

impl fmt::Display for House {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// TERRITORY & LOGS
// =============================================================================

/// One claimed grid cell. The territory ledger holds at most one per cell.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Pixel {
    pub row: u16,
    pub col: u16,
    pub color: String,
    pub placed_by: String,
    pub placed_at_ns: u64,
    pub house: House,
    pub student_name: String,
}

/// Stable-map key for a grid cell. Independent of grid width so settings
/// changes never scramble existing keys.
pub fn cell_key(row: u16, col: u16) -> u32 {
    ((row as u32) << 16) | col as u32
}

/// Append-only audit row, one per successful placement.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct ActivityEntry {
    pub placed_at_ns: u64,
    pub email: String,
    pub name: String,
    pub house: House,
    pub row: u16,
    pub col: u16,
    pub color: String,
    pub points_spent: u64,
    pub session_id: String,
}

/// One credit row in the external house-points ledger. The student column may
/// hold an email or a display name; the points subsystem is inconsistent about
/// which, which is why balance matching is tolerant (see policy.rs).
#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct PointsCredit {
    pub awarded_at_ns: u64,
    pub student: String,
    pub points: i64,
    pub note: String,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct RosterEntry {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub house: House,
}

/// Incrementally maintained per-participant aggregate, updated in the same
/// message as every placement write. Replaces full activity-log rescans for
/// the spent side of the balance and for cooldown lookups.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Default)]
pub struct ParticipantAggregate {
    pub spent_points: u64,
    pub last_placed_ns: u64,
    pub pixels_placed: u64,
}

// =============================================================================
// SETTINGS & CAMPAIGN
// =============================================================================

#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct CanvasSettings {
    pub grid_width: u16,
    pub grid_height: u16,
    pub pixel_size: u16,
    pub cooldown_minutes: u64,
    pub point_cost_per_pixel: u64,
    pub allow_overwrite: bool,
    pub allow_staff_overwrite: bool,
    pub show_countdown: bool,
    pub happy_hour_active: bool,
    pub happy_hour_pixels_allowed: u32,
    pub leaderboard_password: String,
    pub admin_password: String,
    // Staff detection: address in the staff domain without the student marker.
    pub staff_domain: String,
    pub student_marker: String,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            grid_width: DEFAULT_GRID_WIDTH,
            grid_height: DEFAULT_GRID_HEIGHT,
            pixel_size: DEFAULT_PIXEL_SIZE,
            cooldown_minutes: DEFAULT_COOLDOWN_MINUTES,
            point_cost_per_pixel: DEFAULT_POINT_COST,
            allow_overwrite: false,
            allow_staff_overwrite: false,
            show_countdown: true,
            happy_hour_active: false,
            happy_hour_pixels_allowed: 5,
            leaderboard_password: "canvas2025".to_string(),
            admin_password: "admin2025".to_string(),
            staff_domain: "@engelska.se".to_string(),
            student_marker: ".student.".to_string(),
        }
    }
}

impl CanvasSettings {
    pub fn total_cells(&self) -> u64 {
        self.grid_width as u64 * self.grid_height as u64
    }
}

/// Partial settings update for the admin endpoint. `None` fields are left
/// untouched. Grid dimensions are deliberately absent: changing them without
/// a wipe would orphan the persisted layout.
#[derive(CandidType, Deserialize, Clone, Debug, Default)]
pub struct SettingsPatch {
    pub pixel_size: Option<u16>,
    pub cooldown_minutes: Option<u64>,
    pub point_cost_per_pixel: Option<u64>,
    pub allow_overwrite: Option<bool>,
    pub allow_staff_overwrite: Option<bool>,
    pub show_countdown: Option<bool>,
    pub happy_hour_active: Option<bool>,
    pub happy_hour_pixels_allowed: Option<u32>,
    pub leaderboard_password: Option<String>,
    pub admin_password: Option<String>,
}

impl SettingsPatch {
    pub fn apply(&self, settings: &mut CanvasSettings) {
        if let Some(v) = self.pixel_size {
            settings.pixel_size = v;
        }
        if let Some(v) = self.cooldown_minutes {
            settings.cooldown_minutes = v;
        }
        if let Some(v) = self.point_cost_per_pixel {
            settings.point_cost_per_pixel = v;
        }
        if let Some(v) = self.allow_overwrite {
            settings.allow_overwrite = v;
        }
        if let Some(v) = self.allow_staff_overwrite {
            settings.allow_staff_overwrite = v;
        }
        if let Some(v) = self.show_countdown {
            settings.show_countdown = v;
        }
        if let Some(v) = self.happy_hour_active {
            settings.happy_hour_active = v;
        }
        if let Some(v) = self.happy_hour_pixels_allowed {
            settings.happy_hour_pixels_allowed = v;
        }
        if let Some(v) = &self.leaderboard_password {
            settings.leaderboard_password = v.clone();
        }
        if let Some(v) = &self.admin_password {
            settings.admin_password = v.clone();
        }
    }
}

/// One rectangle of the Mondrian subdivision, mapped onto one grid cell.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub id: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub row: u16,
    pub col: u16,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WinReason {
    AbsoluteMajority,
    MathematicalCertainty,
    DeadlineReached,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct DeclaredWinner {
    pub house: House,
    pub percentage: u32,
    pub declared_at_ns: u64,
    pub wipe_scheduled_ns: u64,
    pub reason: WinReason,
}

/// The one live campaign: layout generated at open, placements accepted while
/// active and inside the date window, winner recorded on declaration.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Default)]
pub struct Campaign {
    pub start_ns: u64,
    pub end_ns: u64,
    pub active: bool,
    pub layout: Vec<Block>,
    pub winner: Option<DeclaredWinner>,
}

impl Campaign {
    pub fn is_initialized(&self) -> bool {
        !self.layout.is_empty()
    }
}

/// Frozen snapshot appended when a campaign ends. Never mutated.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct CampaignRecord {
    pub ended_at_ns: u64,
    pub winning_house: Option<House>,
    pub winning_percentage: u32,
    pub total_pixels: u64,
    pub phoenix_pct: u32,
    pub dragon_pct: u32,
    pub hydra_pct: u32,
    pub griffin_pct: u32,
    pub staff_pct: u32,
}

// =============================================================================
// STATS
// =============================================================================

#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HouseCount {
    pub count: u64,
    pub percentage: u32,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct CanvasStats {
    pub phoenix: HouseCount,
    pub dragon: HouseCount,
    pub hydra: HouseCount,
    pub griffin: HouseCount,
    pub staff: HouseCount,
    pub total: u64,
}

impl CanvasStats {
    pub fn get(&self, house: House) -> HouseCount {
        match house {
            House::Phoenix => self.phoenix,
            House::Dragon => self.dragon,
            House::Hydra => self.hydra,
            House::Griffin => self.griffin,
            House::Staff => self.staff,
        }
    }

    pub fn get_mut(&mut self, house: House) -> &mut HouseCount {
        match house {
            House::Phoenix => &mut self.phoenix,
            House::Dragon => &mut self.dragon,
            House::Hydra => &mut self.hydra,
            House::Griffin => &mut self.griffin,
            House::Staff => &mut self.staff,
        }
    }

    /// Competing houses sorted by count descending. Staff excluded.
    pub fn competing_ranked(&self) -> Vec<(House, u64)> {
        let mut ranked: Vec<(House, u64)> = House::COMPETING
            .iter()
            .map(|&h| (h, self.get(h).count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

// =============================================================================
// API PAYLOADS
// =============================================================================

#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct CanvasDimensions {
    pub width: u16,
    pub height: u16,
    pub pixel_size: u16,
    pub layout: Vec<Block>,
}

#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct CanvasStateView {
    pub pixels: Vec<Pixel>,
    pub settings: CanvasDimensions,
}

#[derive(CandidType, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CooldownStatus {
    pub on_cooldown: bool,
    pub minutes_remaining: u64,
    pub last_placed_ns: Option<u64>,
}

#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct StudentStatus {
    pub email: String,
    pub name: String,
    pub house: Option<House>,
    pub is_staff: bool,
    pub color: String,
    pub point_balance: i64,
    pub can_place: bool,
    pub cooldown: CooldownStatus,
    pub cooldown_minutes: u64,
    pub point_cost: u64,
    pub campaign_active: bool,
    pub campaign_end_ns: u64,
}

#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct PlacePixelRequest {
    pub email: String,
    pub row: i32,
    pub col: i32,
    pub session_id: Option<String>,
}

#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct PlacePixelResult {
    pub pixel: Pixel,
    pub new_balance: i64,
    pub stats: CanvasStats,
}

#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct WinnerInfo {
    pub house: House,
    pub percentage: u32,
    pub declared_at_ns: u64,
}

#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct WinnerStatus {
    pub has_winner: bool,
    pub winner: Option<WinnerInfo>,
    pub wipe_scheduled_ns: Option<u64>,
    pub leader: Option<House>,
    pub remaining_cells: u64,
    pub message: String,
}

#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct WipeOutcome {
    pub winning_house: Option<House>,
    pub winning_percentage: u32,
    pub final_stats: CanvasStats,
    pub new_campaign_start_ns: u64,
    pub new_campaign_end_ns: u64,
}

#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct ScheduledWipeStatus {
    pub performed: bool,
    pub wipe_scheduled_ns: Option<u64>,
    pub outcome: Option<WipeOutcome>,
}

#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct ActivityView {
    pub placed_at_ns: u64,
    pub house: House,
    pub row: u16,
    pub col: u16,
    pub color: String,
}

#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct PreviousWinner {
    pub ended_at_ns: u64,
    pub house: Option<House>,
    pub percentage: u32,
    pub total_pixels: u64,
}

#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct StudentLeaderboardEntry {
    pub email: String,
    pub name: String,
    pub house: House,
    pub pixels_placed: u64,
}

#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct HouseLeaderboardEntry {
    pub house: House,
    pub pixels_placed: u64,
}

#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct LeaderboardView {
    pub students: Vec<StudentLeaderboardEntry>,
    pub houses: Vec<HouseLeaderboardEntry>,
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(CandidType, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum CanvasError {
    InvalidCoordinate { row: i32, col: i32 },
    CellAlreadyClaimed,
    CellProtected,
    InsufficientBalance { needed: u64, available: i64 },
    OnCooldown { minutes_remaining: u64 },
    CampaignInactive,
    CampaignNotStarted,
    CampaignEnded,
    ParticipantNotFound,
    Unauthorized,
    StoreUnavailable { reason: String },
}

impl fmt::Display for CanvasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanvasError::InvalidCoordinate { .. } => write!(f, "Invalid coordinates."),
            CanvasError::CellAlreadyClaimed => {
                write!(f, "This pixel has already been claimed! No overwrites allowed.")
            }
            CanvasError::CellProtected => write!(f, "Staff pixels cannot be overwritten!"),
            CanvasError::InsufficientBalance { needed, .. } => write!(
                f,
                "You need at least {} house point(s) to place a pixel. Earn points first!",
                needed
            ),
            CanvasError::OnCooldown { minutes_remaining } => write!(
                f,
                "Please wait {} more minute(s) before placing another pixel.",
                minutes_remaining
            ),
            CanvasError::CampaignInactive => {
                write!(f, "Canvas campaign is not currently active.")
            }
            CanvasError::CampaignNotStarted => {
                write!(f, "Canvas campaign has not started yet.")
            }
            CanvasError::CampaignEnded => write!(f, "Canvas campaign has ended."),
            CanvasError::ParticipantNotFound => write!(f, "Student not found in roster."),
            CanvasError::Unauthorized => write!(f, "Invalid admin password."),
            CanvasError::StoreUnavailable { reason } => {
                write!(f, "Canvas storage unavailable: {}", reason)
            }
        }
    }
}

// =============================================================================
// STORABLE IMPLS
// =============================================================================

impl ic_stable_structures::Storable for Pixel {
    fn to_bytes(&self) -> Cow<[u8]> {
        Cow::Owned(serde_json::to_vec(self).unwrap())
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        serde_json::from_slice(&bytes).unwrap()
    }

    const BOUND: ic_stable_structures::storable::Bound =
        ic_stable_structures::storable::Bound::Unbounded;
}

impl ic_stable_structures::Storable for ActivityEntry {
    fn to_bytes(&self) -> Cow<[u8]> {
        Cow::Owned(serde_json::to_vec(self).unwrap())
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        serde_json::from_slice(&bytes).unwrap()
    }

    const BOUND: ic_stable_structures::storable::Bound =
        ic_stable_structures::storable::Bound::Unbounded;
}

impl ic_stable_structures::Storable for PointsCredit {
    fn to_bytes(&self) -> Cow<[u8]> {
        Cow::Owned(serde_json::to_vec(self).unwrap())
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        serde_json::from_slice(&bytes).unwrap()
    }

    const BOUND: ic_stable_structures::storable::Bound =
        ic_stable_structures::storable::Bound::Unbounded;
}

impl ic_stable_structures::Storable for RosterEntry {
    fn to_bytes(&self) -> Cow<[u8]> {
        Cow::Owned(serde_json::to_vec(self).unwrap())
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        serde_json::from_slice(&bytes).unwrap()
    }

    const BOUND: ic_stable_structures::storable::Bound =
        ic_stable_structures::storable::Bound::Unbounded;
}

impl ic_stable_structures::Storable for ParticipantAggregate {
    fn to_bytes(&self) -> Cow<[u8]> {
        Cow::Owned(serde_json::to_vec(self).unwrap())
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        serde_json::from_slice(&bytes).unwrap()
    }

    const BOUND: ic_stable_structures::storable::Bound =
        ic_stable_structures::storable::Bound::Unbounded;
}

impl ic_stable_structures::Storable for CanvasSettings {
    fn to_bytes(&self) -> Cow<[u8]> {
        Cow::Owned(serde_json::to_vec(self).unwrap())
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        serde_json::from_slice(&bytes).unwrap_or_default()
    }

    const BOUND: ic_stable_structures::storable::Bound =
        ic_stable_structures::storable::Bound::Unbounded;
}

impl ic_stable_structures::Storable for Campaign {
    fn to_bytes(&self) -> Cow<[u8]> {
        Cow::Owned(serde_json::to_vec(self).unwrap())
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        serde_json::from_slice(&bytes).unwrap_or_default()
    }

    const BOUND: ic_stable_structures::storable::Bound =
        ic_stable_structures::storable::Bound::Unbounded;
}

impl ic_stable_structures::Storable for CampaignRecord {
    fn to_bytes(&self) -> Cow<[u8]> {
        Cow::Owned(serde_json::to_vec(self).unwrap())
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        serde_json::from_slice(&bytes).unwrap()
    }

    const BOUND: ic_stable_structures::storable::Bound =
        ic_stable_structures::storable::Bound::Unbounded;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_house_colors_and_names_round_trip() {
        for house in House::ALL {
            assert_eq!(House::from_name(house.name()), Some(house));
            assert!(house.color().starts_with('#'));
        }
        assert_eq!(House::from_name("Slytherin"), None);
    }

    #[test]
    fn test_cell_key_uniqueness() {
        let mut seen = std::collections::HashSet::new();
        for row in 0..DEFAULT_GRID_HEIGHT {
            for col in 0..DEFAULT_GRID_WIDTH {
                assert!(seen.insert(cell_key(row, col)), "duplicate key");
            }
        }
    }

    #[test]
    fn test_settings_patch_leaves_unset_fields() {
        let mut settings = CanvasSettings::default();
        let patch = SettingsPatch {
            cooldown_minutes: Some(15),
            allow_overwrite: Some(true),
            ..Default::default()
        };
        patch.apply(&mut settings);
        assert_eq!(settings.cooldown_minutes, 15);
        assert!(settings.allow_overwrite);
        // Untouched fields keep their defaults.
        assert_eq!(settings.point_cost_per_pixel, DEFAULT_POINT_COST);
        assert_eq!(settings.admin_password, "admin2025");
    }

    #[test]
    fn test_competing_ranked_excludes_staff() {
        let mut stats = CanvasStats::default();
        stats.get_mut(House::Staff).count = 100;
        stats.get_mut(House::Dragon).count = 5;
        let ranked = stats.competing_ranked();
        assert_eq!(ranked.len(), 4);
        assert_eq!(ranked[0], (House::Dragon, 5));
    }

    #[test]
    fn test_error_messages_are_user_facing() {
        let err = CanvasError::OnCooldown { minutes_remaining: 12 };
        assert_eq!(
            err.to_string(),
            "Please wait 12 more minute(s) before placing another pixel."
        );
        let err = CanvasError::InsufficientBalance { needed: 1, available: 0 };
        assert!(err.to_string().contains("at least 1 house point(s)"));
    }
}
