//! Territory ledger, canvas statistics, win detection, and the campaign
//! lifecycle (Active -> WinDeclared -> Wiped -> new campaign).
//!
//! Everything here is synchronous and runs inside a single canister message,
//! so a balance check, the territory write, and the aggregate update can
//! never interleave with another placement or with a wipe.

use ic_stable_structures::memory_manager::MemoryId;
use ic_stable_structures::{StableBTreeMap, StableCell};
use std::cell::RefCell;
use std::collections::HashMap;

use crate::layout::{self, LayoutConfig};
use crate::policy;
use crate::rng::Sha256Rng;
use crate::roster;
use crate::types::*;
use crate::{
    Memory, MEMORY_ID_ACTIVITY, MEMORY_ID_CAMPAIGN, MEMORY_ID_HISTORY, MEMORY_ID_PIXELS,
    MEMORY_ID_SETTINGS,
};

thread_local! {
    static PIXELS: RefCell<StableBTreeMap<u32, Pixel, Memory>> = RefCell::new(
        StableBTreeMap::init(
            crate::MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(MEMORY_ID_PIXELS))),
        )
    );

    static ACTIVITY: RefCell<StableBTreeMap<u64, ActivityEntry, Memory>> = RefCell::new(
        StableBTreeMap::init(
            crate::MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(MEMORY_ID_ACTIVITY))),
        )
    );

    static HISTORY: RefCell<StableBTreeMap<u64, CampaignRecord, Memory>> = RefCell::new(
        StableBTreeMap::init(
            crate::MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(MEMORY_ID_HISTORY))),
        )
    );

    static SETTINGS: RefCell<StableCell<CanvasSettings, Memory>> = RefCell::new(
        StableCell::init(
            crate::MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(MEMORY_ID_SETTINGS))),
            CanvasSettings::default()
        ).expect("Failed to initialize SETTINGS")
    );

    static CAMPAIGN: RefCell<StableCell<Campaign, Memory>> = RefCell::new(
        StableCell::init(
            crate::MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(MEMORY_ID_CAMPAIGN))),
            Campaign::default()
        ).expect("Failed to initialize CAMPAIGN")
    );
}

// =============================================================================
// STATE ACCESS
// =============================================================================

pub fn settings() -> CanvasSettings {
    SETTINGS.with(|s| s.borrow().get().clone())
}

pub fn set_settings(settings: CanvasSettings) {
    SETTINGS.with(|s| {
        s.borrow_mut().set(settings).expect("Failed to update SETTINGS");
    });
}

pub fn campaign() -> Campaign {
    CAMPAIGN.with(|c| c.borrow().get().clone())
}

fn set_campaign(campaign: Campaign) {
    CAMPAIGN.with(|c| {
        c.borrow_mut().set(campaign).expect("Failed to update CAMPAIGN");
    });
}

fn require_initialized() -> Result<Campaign, CanvasError> {
    let campaign = campaign();
    if campaign.is_initialized() {
        Ok(campaign)
    } else {
        Err(CanvasError::StoreUnavailable {
            reason: "canvas has not been initialized".to_string(),
        })
    }
}

pub fn verify_admin(password: &str) -> Result<(), CanvasError> {
    if password == settings().admin_password {
        Ok(())
    } else {
        Err(CanvasError::Unauthorized)
    }
}

pub fn verify_leaderboard(password: &str) -> Result<(), CanvasError> {
    if password == settings().leaderboard_password {
        Ok(())
    } else {
        Err(CanvasError::Unauthorized)
    }
}

// =============================================================================
// TIME ARITHMETIC (UTC)
// =============================================================================

pub fn day_start_ns(ns: u64) -> u64 {
    ns - ns % NS_PER_DAY
}

/// The end date counts as reached at a fixed morning cutoff of its calendar
/// day, not at the stored instant.
pub fn campaign_end_cutoff(end_ns: u64) -> u64 {
    day_start_ns(end_ns) + CAMPAIGN_END_CUTOFF_HOUR * NS_PER_HOUR
}

/// Wipes run at 23:59 of the day the winner was declared.
pub fn wipe_time(declared_ns: u64) -> u64 {
    day_start_ns(declared_ns) + WIPE_HOUR * NS_PER_HOUR + WIPE_MINUTE * NS_PER_MINUTE
}

/// The next campaign opens at 06:00 the following day.
pub fn next_campaign_start(now_ns: u64) -> u64 {
    day_start_ns(now_ns) + NS_PER_DAY + NEW_CAMPAIGN_START_HOUR * NS_PER_HOUR
}

// =============================================================================
// CAMPAIGN LIFECYCLE
// =============================================================================

/// Generate a layout and open a fresh campaign. The old campaign (if any) is
/// replaced wholesale.
pub fn open_campaign(start_ns: u64, end_ns: u64, seed: [u8; 32]) -> Campaign {
    let settings = settings();
    let mut rng = Sha256Rng::from_seed(seed);
    let layout = layout::generate_layout(
        &LayoutConfig::default(),
        settings.grid_width,
        settings.grid_height,
        &mut rng,
    );

    let campaign = Campaign {
        start_ns,
        end_ns,
        active: true,
        layout,
        winner: None,
    };
    set_campaign(campaign.clone());
    campaign
}

/// First-run setup: open an initial campaign starting now. A no-op when a
/// campaign already exists (e.g. after an upgrade).
pub fn initialize(now_ns: u64, seed: [u8; 32]) {
    if !campaign().is_initialized() {
        open_campaign(now_ns, now_ns + CAMPAIGN_DURATION_DAYS * NS_PER_DAY, seed);
    }
}

pub fn extend_campaign(new_end_ns: u64) -> Result<(), CanvasError> {
    let mut campaign = require_initialized()?;
    campaign.end_ns = new_end_ns;
    set_campaign(campaign);
    Ok(())
}

// =============================================================================
// TERRITORY LEDGER
// =============================================================================

fn append_activity(entry: ActivityEntry) {
    ACTIVITY.with(|log| {
        let mut log = log.borrow_mut();
        let id = log.len();
        log.insert(id, entry);
    });
}

pub fn place_pixel(req: &PlacePixelRequest, now_ns: u64) -> Result<PlacePixelResult, CanvasError> {
    let settings = settings();
    let campaign = require_initialized()?;

    if !campaign.active {
        return Err(CanvasError::CampaignInactive);
    }
    if now_ns < campaign.start_ns {
        return Err(CanvasError::CampaignNotStarted);
    }
    if now_ns > campaign.end_ns {
        return Err(CanvasError::CampaignEnded);
    }

    let participant = roster::resolve(&req.email, &settings);
    let faction = participant.faction().ok_or(CanvasError::ParticipantNotFound)?;

    if req.row < 0
        || req.row >= settings.grid_height as i32
        || req.col < 0
        || req.col >= settings.grid_width as i32
    {
        return Err(CanvasError::InvalidCoordinate { row: req.row, col: req.col });
    }
    let row = req.row as u16;
    let col = req.col as u16;

    let cost = settings.point_cost_per_pixel;
    let balance = policy::point_balance(&participant.email_lower, &participant.name);
    if balance < cost as i64 {
        return Err(CanvasError::InsufficientBalance { needed: cost, available: balance });
    }

    let cooldown =
        policy::cooldown_status(&participant.email_lower, settings.cooldown_minutes, now_ns);
    if cooldown.on_cooldown {
        return Err(CanvasError::OnCooldown { minutes_remaining: cooldown.minutes_remaining });
    }

    let key = cell_key(row, col);
    if let Some(existing) = PIXELS.with(|p| p.borrow().get(&key)) {
        if !settings.allow_overwrite {
            return Err(CanvasError::CellAlreadyClaimed);
        }
        // Staff pixels are identified by color so that rostered staff
        // (black pixels counting toward a house) stay protected too.
        if existing.color == House::Staff.color() && !settings.allow_staff_overwrite {
            return Err(CanvasError::CellProtected);
        }
    }

    let pixel = Pixel {
        row,
        col,
        color: participant.color(),
        placed_by: participant.email.clone(),
        placed_at_ns: now_ns,
        house: faction,
        student_name: participant.name.clone(),
    };
    PIXELS.with(|p| p.borrow_mut().insert(key, pixel.clone()));
    append_activity(ActivityEntry {
        placed_at_ns: now_ns,
        email: participant.email.clone(),
        name: participant.name.clone(),
        house: faction,
        row,
        col,
        color: pixel.color.clone(),
        points_spent: cost,
        session_id: req.session_id.clone().unwrap_or_else(|| "none".to_string()),
    });
    policy::record_placement(&participant.email_lower, cost, now_ns);

    // Territory shifted: re-evaluate the win conditions immediately.
    let stats = calculate_stats();
    if campaign.winner.is_none() {
        let check = evaluate_win(&stats, &settings, &campaign, now_ns);
        if let Some((house, reason, declared_at)) = check.winner {
            declare_winner(house, stats.get(house).percentage, reason, declared_at);
        }
    }

    Ok(PlacePixelResult { pixel, new_balance: balance - cost as i64, stats })
}

pub fn canvas_state() -> Result<CanvasStateView, CanvasError> {
    let settings = settings();
    let campaign = require_initialized()?;
    let pixels = PIXELS.with(|p| p.borrow().iter().map(|(_, pixel)| pixel).collect());

    Ok(CanvasStateView {
        pixels,
        settings: CanvasDimensions {
            width: settings.grid_width,
            height: settings.grid_height,
            pixel_size: settings.pixel_size,
            layout: campaign.layout,
        },
    })
}

// =============================================================================
// STATISTICS
// =============================================================================

fn percentage(count: u64, total: u64) -> u32 {
    if total == 0 {
        0
    } else {
        ((count as f64 / total as f64) * 100.0).round() as u32
    }
}

/// Per-faction share of *placed* pixels (not of the whole grid).
pub fn calculate_stats() -> CanvasStats {
    let mut stats = CanvasStats::default();

    PIXELS.with(|p| {
        for (_, pixel) in p.borrow().iter() {
            stats.get_mut(pixel.house).count += 1;
            stats.total += 1;
        }
    });

    for house in House::ALL {
        let count = stats.get(house).count;
        stats.get_mut(house).percentage = percentage(count, stats.total);
    }
    stats
}

// =============================================================================
// WIN DETECTION
// =============================================================================

pub struct WinCheck {
    /// `(house, reason, declared_at_ns)` when a win condition holds.
    pub winner: Option<(House, WinReason, u64)>,
    pub leader: House,
    pub leader_count: u64,
    pub remaining_cells: u64,
}

/// Evaluate the three win conditions over the four competing houses. Staff
/// never wins here, but staff pixels do count as claimed cells when computing
/// how many contestable cells remain.
pub fn evaluate_win(
    stats: &CanvasStats,
    settings: &CanvasSettings,
    campaign: &Campaign,
    now_ns: u64,
) -> WinCheck {
    let total_cells = settings.total_cells();
    let remaining = total_cells.saturating_sub(stats.total);

    let ranked = stats.competing_ranked();
    let (leader, leader_count) = ranked[0];
    let (_, second_count) = ranked[1];

    let winner = if leader_count * 2 > total_cells {
        // Strictly more than half of all cells.
        Some((leader, WinReason::AbsoluteMajority, now_ns))
    } else if second_count + remaining < leader_count {
        // Even taking every unclaimed cell, second place falls short.
        // Equality is NOT a win: second place could still tie.
        Some((leader, WinReason::MathematicalCertainty, now_ns))
    } else {
        let cutoff = campaign_end_cutoff(campaign.end_ns);
        if now_ns >= cutoff {
            Some((leader, WinReason::DeadlineReached, cutoff))
        } else {
            None
        }
    };

    WinCheck { winner, leader, leader_count, remaining_cells: remaining }
}

/// Transition Active -> WinDeclared: record the winner, schedule the wipe for
/// 23:59 of the declaration day, and stop accepting placements.
pub fn declare_winner(house: House, percentage: u32, reason: WinReason, declared_at_ns: u64) {
    let mut campaign = campaign();
    campaign.winner = Some(DeclaredWinner {
        house,
        percentage,
        declared_at_ns,
        wipe_scheduled_ns: wipe_time(declared_at_ns),
        reason,
    });
    campaign.active = false;
    set_campaign(campaign);
}

pub fn winner_status(now_ns: u64) -> Result<WinnerStatus, CanvasError> {
    let settings = settings();
    let campaign = require_initialized()?;
    let stats = calculate_stats();
    let remaining = settings.total_cells().saturating_sub(stats.total);

    if let Some(w) = &campaign.winner {
        return Ok(WinnerStatus {
            has_winner: true,
            winner: Some(WinnerInfo {
                house: w.house,
                percentage: w.percentage,
                declared_at_ns: w.declared_at_ns,
            }),
            wipe_scheduled_ns: Some(w.wipe_scheduled_ns),
            leader: Some(w.house),
            remaining_cells: remaining,
            message: format!(
                "{} has won with {}%! Canvas will reset tonight at 23:59.",
                w.house, w.percentage
            ),
        });
    }

    // No declared winner yet; a win condition may have newly become true.
    let check = evaluate_win(&stats, &settings, &campaign, now_ns);
    if let Some((house, reason, declared_at)) = check.winner {
        let pct = stats.get(house).percentage;
        declare_winner(house, pct, reason, declared_at);
        return Ok(WinnerStatus {
            has_winner: true,
            winner: Some(WinnerInfo { house, percentage: pct, declared_at_ns: declared_at }),
            wipe_scheduled_ns: Some(wipe_time(declared_at)),
            leader: Some(house),
            remaining_cells: check.remaining_cells,
            message: format!(
                "{} has won with {}%! Come back tomorrow to play again!",
                house, pct
            ),
        });
    }

    Ok(WinnerStatus {
        has_winner: false,
        winner: None,
        wipe_scheduled_ns: None,
        leader: Some(check.leader),
        remaining_cells: check.remaining_cells,
        message: String::new(),
    })
}

// =============================================================================
// WIPE
// =============================================================================

/// End the current campaign: freeze a history record, clear all territory,
/// and open the next campaign on a fresh layout. The only path that bulk
/// deletes placements.
pub fn perform_wipe(now_ns: u64, seed: [u8; 32]) -> Result<WipeOutcome, CanvasError> {
    let campaign = require_initialized()?;
    let stats = calculate_stats();

    let (winning_house, winning_percentage) = match &campaign.winner {
        Some(w) => (Some(w.house), w.percentage),
        None => {
            // Admin wipe without a declared winner: current leader by raw
            // count, staff included (a staff-painted canvas is a staff win).
            let mut best: Option<(House, u64)> = None;
            for house in House::ALL {
                let count = stats.get(house).count;
                if count > best.map(|(_, c)| c).unwrap_or(0) {
                    best = Some((house, count));
                }
            }
            match best {
                Some((house, _)) => (Some(house), stats.get(house).percentage),
                None => (None, 0),
            }
        }
    };

    HISTORY.with(|h| {
        let mut history = h.borrow_mut();
        let id = history.len();
        history.insert(
            id,
            CampaignRecord {
                ended_at_ns: now_ns,
                winning_house,
                winning_percentage,
                total_pixels: stats.total,
                phoenix_pct: stats.phoenix.percentage,
                dragon_pct: stats.dragon.percentage,
                hydra_pct: stats.hydra.percentage,
                griffin_pct: stats.griffin.percentage,
                staff_pct: stats.staff.percentage,
            },
        );
    });

    PIXELS.with(|p| {
        let mut pixels = p.borrow_mut();
        let keys: Vec<u32> = pixels.iter().map(|(k, _)| k).collect();
        for key in keys {
            pixels.remove(&key);
        }
    });

    let start_ns = next_campaign_start(now_ns);
    let end_ns = start_ns + CAMPAIGN_DURATION_DAYS * NS_PER_DAY;
    open_campaign(start_ns, end_ns, seed);

    Ok(WipeOutcome {
        winning_house,
        winning_percentage,
        final_stats: stats,
        new_campaign_start_ns: start_ns,
        new_campaign_end_ns: end_ns,
    })
}

/// The hourly tick. Fires the wipe only when a winner was declared and its
/// scheduled time has passed; otherwise a no-op.
pub fn check_scheduled_wipe(now_ns: u64, seed: [u8; 32]) -> Result<ScheduledWipeStatus, CanvasError> {
    let campaign = require_initialized()?;

    match campaign.winner {
        None => Ok(ScheduledWipeStatus { performed: false, wipe_scheduled_ns: None, outcome: None }),
        Some(w) if now_ns >= w.wipe_scheduled_ns => {
            let outcome = perform_wipe(now_ns, seed)?;
            Ok(ScheduledWipeStatus {
                performed: true,
                wipe_scheduled_ns: Some(w.wipe_scheduled_ns),
                outcome: Some(outcome),
            })
        }
        Some(w) => Ok(ScheduledWipeStatus {
            performed: false,
            wipe_scheduled_ns: Some(w.wipe_scheduled_ns),
            outcome: None,
        }),
    }
}

// =============================================================================
// PARTICIPANT STATUS & READ VIEWS
// =============================================================================

pub fn student_status(email: &str, now_ns: u64) -> Result<StudentStatus, CanvasError> {
    let settings = settings();
    let campaign = require_initialized()?;

    let participant = roster::resolve(email, &settings);
    let balance = policy::point_balance(&participant.email_lower, &participant.name);
    let cooldown =
        policy::cooldown_status(&participant.email_lower, settings.cooldown_minutes, now_ns);
    let in_window = now_ns >= campaign.start_ns && now_ns <= campaign.end_ns;

    Ok(StudentStatus {
        can_place: balance >= settings.point_cost_per_pixel as i64
            && !cooldown.on_cooldown
            && campaign.active
            && in_window,
        color: participant.color(),
        email: participant.email,
        name: participant.name,
        house: participant.house,
        is_staff: participant.is_staff,
        point_balance: balance,
        cooldown,
        cooldown_minutes: settings.cooldown_minutes,
        point_cost: settings.point_cost_per_pixel,
        campaign_active: campaign.active,
        campaign_end_ns: campaign.end_ns,
    })
}

pub fn recent_activity(limit: usize) -> Vec<ActivityView> {
    ACTIVITY.with(|log| {
        log.borrow()
            .iter()
            .rev()
            .take(limit)
            .map(|(_, e)| ActivityView {
                placed_at_ns: e.placed_at_ns,
                house: e.house,
                row: e.row,
                col: e.col,
                color: e.color,
            })
            .collect()
    })
}

/// The last five campaign outcomes, most recent first.
pub fn previous_winners() -> Vec<PreviousWinner> {
    HISTORY.with(|h| {
        h.borrow()
            .iter()
            .rev()
            .take(5)
            .map(|(_, r)| PreviousWinner {
                ended_at_ns: r.ended_at_ns,
                house: r.winning_house,
                percentage: r.winning_percentage,
                total_pixels: r.total_pixels,
            })
            .collect()
    })
}

/// Pixels placed per student (top 10) and per house, over the whole activity
/// log. Counts placements made, not territory currently held.
pub fn leaderboard() -> LeaderboardView {
    let mut per_student: HashMap<String, StudentLeaderboardEntry> = HashMap::new();
    let mut per_house: HashMap<House, u64> = HashMap::new();

    ACTIVITY.with(|log| {
        for (_, entry) in log.borrow().iter() {
            per_student
                .entry(entry.email.clone())
                .or_insert_with(|| StudentLeaderboardEntry {
                    email: entry.email.clone(),
                    name: entry.name.clone(),
                    house: entry.house,
                    pixels_placed: 0,
                })
                .pixels_placed += 1;
            *per_house.entry(entry.house).or_insert(0) += 1;
        }
    });

    let mut students: Vec<StudentLeaderboardEntry> = per_student.into_values().collect();
    students.sort_by(|a, b| b.pixels_placed.cmp(&a.pixels_placed).then(a.email.cmp(&b.email)));
    students.truncate(10);

    let mut houses: Vec<HouseLeaderboardEntry> = House::ALL
        .iter()
        .map(|&house| HouseLeaderboardEntry {
            house,
            pixels_placed: per_house.get(&house).copied().unwrap_or(0),
        })
        .collect();
    houses.sort_by(|a, b| b.pixels_placed.cmp(&a.pixels_placed));

    LeaderboardView { students, houses }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_from_counts(phoenix: u64, dragon: u64, hydra: u64, griffin: u64, staff: u64) -> CanvasStats {
        let total = phoenix + dragon + hydra + griffin + staff;
        let mut stats = CanvasStats {
            phoenix: HouseCount { count: phoenix, percentage: 0 },
            dragon: HouseCount { count: dragon, percentage: 0 },
            hydra: HouseCount { count: hydra, percentage: 0 },
            griffin: HouseCount { count: griffin, percentage: 0 },
            staff: HouseCount { count: staff, percentage: 0 },
            total,
        };
        for house in House::ALL {
            let count = stats.get(house).count;
            stats.get_mut(house).percentage = percentage(count, total);
        }
        stats
    }

    fn active_campaign() -> Campaign {
        Campaign {
            start_ns: 0,
            end_ns: 100 * NS_PER_DAY,
            active: true,
            layout: Vec::new(),
            winner: None,
        }
    }

    #[test]
    fn test_absolute_majority_win() {
        // 210 of 400 is strictly over half; remaining cells are irrelevant.
        let stats = stats_from_counts(210, 90, 70, 30, 0);
        let check = evaluate_win(&stats, &CanvasSettings::default(), &active_campaign(), 0);
        let (house, reason, _) = check.winner.expect("majority should win");
        assert_eq!(house, House::Phoenix);
        assert_eq!(reason, WinReason::AbsoluteMajority);
    }

    #[test]
    fn test_exactly_half_is_not_a_majority() {
        // 200 of 400: second at 150 plus 50 remaining can still reach 200.
        let stats = stats_from_counts(200, 150, 0, 0, 0);
        let check = evaluate_win(&stats, &CanvasSettings::default(), &active_campaign(), 0);
        assert!(check.winner.is_none());
        assert_eq!(check.leader, House::Phoenix);
        assert_eq!(check.remaining_cells, 50);

        // One more cell tips it over half.
        let stats = stats_from_counts(201, 150, 0, 0, 0);
        let check = evaluate_win(&stats, &CanvasSettings::default(), &active_campaign(), 0);
        let (house, reason, _) = check.winner.expect("201 of 400 is a majority");
        assert_eq!(house, House::Phoenix);
        assert_eq!(reason, WinReason::AbsoluteMajority);
    }

    #[test]
    fn test_mathematical_certainty_strict_boundary() {
        // total 400, placed 370, remaining 30.
        // leader 180, second 149: 149 + 30 = 179 < 180 -> win.
        let stats = stats_from_counts(180, 149, 41, 0, 0);
        let check = evaluate_win(&stats, &CanvasSettings::default(), &active_campaign(), 0);
        let (house, reason, _) = check.winner.expect("catch-up impossible");
        assert_eq!(house, House::Phoenix);
        assert_eq!(reason, WinReason::MathematicalCertainty);

        // leader 180, second 150: 150 + 30 = 180, equality -> second can
        // still tie, no win.
        let stats = stats_from_counts(180, 150, 40, 0, 0);
        let check = evaluate_win(&stats, &CanvasSettings::default(), &active_campaign(), 0);
        assert!(check.winner.is_none());
        assert_eq!(check.remaining_cells, 30);
    }

    #[test]
    fn test_staff_cells_count_as_claimed_but_never_win() {
        // Staff holds 390 cells; Dragon leads the houses 6 to 4.
        // remaining = 0, second(4) + 0 < 6 -> Dragon wins by certainty.
        let stats = stats_from_counts(0, 6, 4, 0, 390);
        let check = evaluate_win(&stats, &CanvasSettings::default(), &active_campaign(), 0);
        let (house, reason, _) = check.winner.expect("staff blocks the grid");
        assert_eq!(house, House::Dragon);
        assert_eq!(reason, WinReason::MathematicalCertainty);
    }

    #[test]
    fn test_deadline_win_at_morning_cutoff() {
        let stats = stats_from_counts(10, 5, 0, 0, 0);
        let settings = CanvasSettings::default();
        let mut campaign = active_campaign();
        campaign.end_ns = 10 * NS_PER_DAY + 6 * NS_PER_HOUR; // day 10, 06:00

        let cutoff = 10 * NS_PER_DAY + 10 * NS_PER_HOUR;

        // One nanosecond before the 10:00 cutoff: no deadline win.
        let check = evaluate_win(&stats, &settings, &campaign, cutoff - 1);
        assert!(check.winner.is_none());

        // At the cutoff: the current leader wins, declared at the cutoff.
        let check = evaluate_win(&stats, &settings, &campaign, cutoff);
        let (house, reason, declared_at) = check.winner.expect("deadline reached");
        assert_eq!(house, House::Phoenix);
        assert_eq!(reason, WinReason::DeadlineReached);
        assert_eq!(declared_at, cutoff);
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 2), 50);
        assert_eq!(percentage(210, 400), 53); // 52.5 rounds up
    }

    #[test]
    fn test_wipe_schedule_times() {
        let declared = 5 * NS_PER_DAY + 14 * NS_PER_HOUR; // day 5, 14:00
        assert_eq!(wipe_time(declared), 5 * NS_PER_DAY + 23 * NS_PER_HOUR + 59 * NS_PER_MINUTE);
        assert_eq!(next_campaign_start(declared), 6 * NS_PER_DAY + 6 * NS_PER_HOUR);
    }
}
