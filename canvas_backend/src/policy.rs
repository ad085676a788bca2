//! Balance and cooldown policy.
//!
//! Earned points come from the external house-points ledger, matched with a
//! deliberately tolerant identity predicate (the ledger stores emails and
//! display names interchangeably). Spent points and the cooldown clock come
//! from an incrementally maintained per-participant aggregate, updated in the
//! same message as every placement write, so neither requires a rescan of the
//! activity log.

use ic_stable_structures::memory_manager::MemoryId;
use ic_stable_structures::StableBTreeMap;
use std::cell::RefCell;

use crate::types::{CooldownStatus, ParticipantAggregate, PointsCredit, NS_PER_MINUTE};
use crate::{Memory, MEMORY_ID_AGGREGATES, MEMORY_ID_POINTS};

thread_local! {
    static POINTS_CREDITS: RefCell<StableBTreeMap<u64, PointsCredit, Memory>> = RefCell::new(
        StableBTreeMap::init(
            crate::MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(MEMORY_ID_POINTS))),
        )
    );

    static AGGREGATES: RefCell<StableBTreeMap<String, ParticipantAggregate, Memory>> = RefCell::new(
        StableBTreeMap::init(
            crate::MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(MEMORY_ID_AGGREGATES))),
        )
    );
}

// =============================================================================
// IDENTITY MATCHING
// =============================================================================

/// Tolerant comparison between a stored ledger identifier and a participant.
///
/// A row matches if the stored value equals, contains, or is contained by
/// either the participant's email or display name (case-insensitive,
/// trimmed). This is preserved compatibility behavior: the points ledger is
/// inconsistent about storing `barry.shaw`, `barry.shaw@...`, or
/// `Barry Shaw`, and all of them must credit the same participant.
pub fn identity_matches(stored: &str, email_lower: &str, name_lower: &str) -> bool {
    let stored = stored.trim().to_lowercase();
    if stored.is_empty() {
        return false;
    }

    let has_name = !name_lower.is_empty();

    stored == email_lower
        || (has_name && stored == name_lower)
        || stored.contains(email_lower)
        || (has_name && stored.contains(name_lower))
        || email_lower.contains(&stored)
        || (has_name && name_lower.contains(&stored))
}

// =============================================================================
// BALANCE
// =============================================================================

/// Sum of matching credit rows in the points ledger.
pub fn earned_points(email_lower: &str, name: &str) -> i64 {
    let name_lower = name.trim().to_lowercase();
    POINTS_CREDITS.with(|credits| {
        credits
            .borrow()
            .iter()
            .filter(|(_, c)| identity_matches(&c.student, email_lower, &name_lower))
            .map(|(_, c)| c.points)
            .sum()
    })
}

pub fn spent_points(email_lower: &str) -> u64 {
    AGGREGATES.with(|a| a.borrow().get(&email_lower.to_string()))
        .map(|agg| agg.spent_points)
        .unwrap_or(0)
}

/// Spendable balance: credits minus everything already charged for
/// placements. Can be negative as a value (credits may be revoked); the
/// placement pre-check keeps it from going negative as an effect of a
/// placement.
pub fn point_balance(email_lower: &str, name: &str) -> i64 {
    earned_points(email_lower, name) - spent_points(email_lower) as i64
}

// =============================================================================
// COOLDOWN
// =============================================================================

pub fn cooldown_status(email_lower: &str, cooldown_minutes: u64, now_ns: u64) -> CooldownStatus {
    let last = AGGREGATES.with(|a| a.borrow().get(&email_lower.to_string()))
        .map(|agg| agg.last_placed_ns)
        .unwrap_or(0);

    if last == 0 {
        return CooldownStatus::default();
    }

    let cooldown_ns = cooldown_minutes * NS_PER_MINUTE;
    let elapsed = now_ns.saturating_sub(last);
    if elapsed < cooldown_ns {
        let remaining_ns = cooldown_ns - elapsed;
        CooldownStatus {
            on_cooldown: true,
            // Ceiling: 59m01s left reads as 60 minutes.
            minutes_remaining: remaining_ns.div_ceil(NS_PER_MINUTE),
            last_placed_ns: Some(last),
        }
    } else {
        CooldownStatus {
            on_cooldown: false,
            minutes_remaining: 0,
            last_placed_ns: Some(last),
        }
    }
}

// =============================================================================
// WRITES
// =============================================================================

/// Charge a placement against the participant's aggregate. Called in the same
/// message as the territory write so the two can never be observed apart.
pub fn record_placement(email_lower: &str, cost: u64, now_ns: u64) {
    AGGREGATES.with(|a| {
        let mut aggregates = a.borrow_mut();
        let key = email_lower.to_string();
        let mut agg = aggregates.get(&key).unwrap_or_default();
        agg.spent_points += cost;
        agg.last_placed_ns = now_ns;
        agg.pixels_placed += 1;
        aggregates.insert(key, agg);
    });
}

/// Append a credit row. This is the interface the external house-points
/// subsystem writes through; the canvas itself only reads credits.
pub fn record_credit(credit: PointsCredit) -> u64 {
    POINTS_CREDITS.with(|credits| {
        let mut credits = credits.borrow_mut();
        let id = credits.len();
        credits.insert(id, credit);
        id
    })
}

pub fn aggregate(email_lower: &str) -> ParticipantAggregate {
    AGGREGATES.with(|a| a.borrow().get(&email_lower.to_string())).unwrap_or_default()
}
