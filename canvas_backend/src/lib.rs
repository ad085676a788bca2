//! House Canvas Backend
//!
//! Territory game for the school house-points program: students spend earned
//! points to claim cells of a shared Mondrian-style canvas for their house.
//! A campaign runs on a week-long window; territory shifts are re-checked
//! against the win conditions on every placement, and a declared win schedules
//! a canvas wipe and a fresh campaign on a new layout.
//!
//! All state lives in stable structures and survives upgrades. Updates are
//! single-message and never await mid-sequence, so the canister's actor model
//! is the only concurrency control needed.

use ic_cdk::management_canister::raw_rand;
use ic_cdk::{init, post_upgrade, pre_upgrade, query, update};
use ic_stable_structures::memory_manager::{MemoryId, MemoryManager, VirtualMemory};
use ic_stable_structures::{DefaultMemoryImpl, StableCell};
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::time::Duration;

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod game;
pub mod layout;
pub mod policy;
pub mod rng;
pub mod roster;
pub mod types;


use crate::rng::Sha256Rng;
use crate::types::*;

// ============================================================================
// STABLE MEMORY
// ============================================================================

pub type Memory = VirtualMemory<DefaultMemoryImpl>;

pub(crate) const MEMORY_ID_PIXELS: u8 = 0;
pub(crate) const MEMORY_ID_ACTIVITY: u8 = 1;
pub(crate) const MEMORY_ID_POINTS: u8 = 2;
pub(crate) const MEMORY_ID_ROSTER: u8 = 3;
pub(crate) const MEMORY_ID_AGGREGATES: u8 = 4;
pub(crate) const MEMORY_ID_SETTINGS: u8 = 5;
pub(crate) const MEMORY_ID_CAMPAIGN: u8 = 6;
pub(crate) const MEMORY_ID_HISTORY: u8 = 7;
pub(crate) const MEMORY_ID_SEED: u8 = 8;

thread_local! {
    pub static MEMORY_MANAGER: RefCell<MemoryManager<DefaultMemoryImpl>> =
        RefCell::new(MemoryManager::init(DefaultMemoryImpl::default()));

    // 32 VRF bytes once initialize_seed has run; empty before that.
    static SEED_CELL: RefCell<StableCell<Vec<u8>, Memory>> = RefCell::new(
        StableCell::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(MEMORY_ID_SEED))),
            Vec::new()
        ).expect("Failed to initialize SEED_CELL")
    );
}

// ============================================================================
// RANDOMNESS
// ============================================================================

/// Fetch a VRF seed and store it. Safe to call repeatedly; only the first
/// successful call writes.
async fn initialize_seed() {
    let already_initialized = SEED_CELL.with(|c| c.borrow().get().len() == 32);
    if already_initialized {
        return;
    }

    let random_bytes = match raw_rand().await {
        Ok(bytes) => bytes,
        Err(_) => {
            // Fallback: combine timestamp with caller principal
            let time = ic_cdk::api::time();
            let caller = ic_cdk::api::msg_caller();
            let mut hasher = Sha256::new();
            hasher.update(time.to_be_bytes());
            hasher.update(caller.as_slice());
            hasher.finalize().to_vec()
        }
    };

    let seed = Sha256Rng::derive_seed(&[&random_bytes]);
    SEED_CELL.with(|c| {
        c.borrow_mut().set(seed.to_vec()).expect("Failed to store seed");
    });
    ic_cdk::println!("Canvas: randomness seed initialized");
}

fn base_seed() -> [u8; 32] {
    let stored = SEED_CELL.with(|c| c.borrow().get().clone());
    if stored.len() == 32 {
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&stored);
        seed
    } else {
        // VRF seed not available yet (first message after install).
        Sha256Rng::derive_seed(&[&ic_cdk::api::time().to_be_bytes()])
    }
}

/// Per-campaign layout seed: VRF base mixed with the current time, so each
/// wipe produces a fresh layout even within one seed lifetime.
fn campaign_seed(now_ns: u64) -> [u8; 32] {
    Sha256Rng::derive_seed(&[&base_seed(), &now_ns.to_be_bytes()])
}

// ============================================================================
// LIFECYCLE HOOKS
// ============================================================================

fn start_wipe_timer() {
    ic_cdk_timers::set_timer_interval(Duration::from_secs(3600), || async {
        let now = ic_cdk::api::time();
        match game::check_scheduled_wipe(now, campaign_seed(now)) {
            Ok(status) if status.performed => {
                ic_cdk::println!("Hourly check: canvas wiped, new campaign opened");
            }
            Ok(_) => {}
            Err(e) => ic_cdk::println!("Hourly check failed: {}", e),
        }
    });
}

#[init]
fn canister_init() {
    let now = ic_cdk::api::time();
    game::initialize(now, campaign_seed(now));
    start_wipe_timer();

    // Fetch the VRF seed with a one-shot timer (init itself cannot await)
    ic_cdk_timers::set_timer(Duration::ZERO, async {
        initialize_seed().await;
    });

    ic_cdk::println!("Canvas Backend Initialized - House Territory Game");
}

#[pre_upgrade]
fn pre_upgrade() {
    ic_cdk::println!("Pre-upgrade: state persists automatically");
}

#[post_upgrade]
fn post_upgrade() {
    start_wipe_timer();

    ic_cdk_timers::set_timer(Duration::ZERO, async {
        initialize_seed().await;
    });

    ic_cdk::println!("Post-upgrade: timers restarted");
}

// ============================================================================
// CANVAS QUERIES
// ============================================================================

#[query]
fn get_canvas_state() -> Result<CanvasStateView, CanvasError> {
    game::canvas_state()
}

#[query]
fn get_canvas_stats() -> CanvasStats {
    game::calculate_stats()
}

#[query]
fn get_canvas_settings() -> CanvasSettings {
    game::settings()
}

#[query]
fn get_student_canvas_status(email: String) -> Result<StudentStatus, CanvasError> {
    game::student_status(&email, ic_cdk::api::time())
}

#[query]
fn get_canvas_recent_activity(limit: u64) -> Vec<ActivityView> {
    game::recent_activity(limit as usize)
}

#[query]
fn get_previous_winners() -> Vec<PreviousWinner> {
    game::previous_winners()
}

#[query]
fn get_canvas_leaderboard(password: String) -> Result<LeaderboardView, CanvasError> {
    game::verify_leaderboard(&password)?;
    Ok(game::leaderboard())
}

// ============================================================================
// CANVAS UPDATES
// ============================================================================

#[update]
fn place_pixel(request: PlacePixelRequest) -> Result<PlacePixelResult, CanvasError> {
    game::place_pixel(&request, ic_cdk::api::time())
}

/// Update rather than query: reading the status may itself declare a newly
/// detected winner (e.g. the deadline passed with no placements since).
#[update]
fn get_canvas_winner_status() -> Result<WinnerStatus, CanvasError> {
    game::winner_status(ic_cdk::api::time())
}

#[update]
fn wipe_canvas(password: String) -> Result<WipeOutcome, CanvasError> {
    game::verify_admin(&password)?;
    let now = ic_cdk::api::time();
    let outcome = game::perform_wipe(now, campaign_seed(now))?;
    match outcome.winning_house {
        Some(house) => ic_cdk::println!(
            "Canvas wiped: {} won with {}%",
            house,
            outcome.winning_percentage
        ),
        None => ic_cdk::println!("Canvas wiped: no pixels placed, no winner"),
    }
    Ok(outcome)
}

#[update]
fn extend_campaign(new_end_ns: u64, password: String) -> Result<(), CanvasError> {
    game::verify_admin(&password)?;
    game::extend_campaign(new_end_ns)
}

#[update]
fn update_canvas_settings(
    patch: SettingsPatch,
    password: String,
) -> Result<CanvasSettings, CanvasError> {
    game::verify_admin(&password)?;
    let mut settings = game::settings();
    patch.apply(&mut settings);
    game::set_settings(settings.clone());
    Ok(settings)
}

#[update]
fn check_scheduled_wipe() -> Result<ScheduledWipeStatus, CanvasError> {
    let now = ic_cdk::api::time();
    game::check_scheduled_wipe(now, campaign_seed(now))
}

// ============================================================================
// EXTERNAL SUBSYSTEM INTERFACES
// ============================================================================

/// Append one credit row from the house-points award flow. Returns the row id.
#[update]
fn log_points(credit: PointsCredit) -> u64 {
    policy::record_credit(credit)
}

#[update]
fn upsert_roster_entry(entry: RosterEntry, password: String) -> Result<u64, CanvasError> {
    game::verify_admin(&password)?;
    roster::upsert(entry);
    Ok(roster::roster_size())
}

ic_cdk::export_candid!();
