//! Participant resolution against the student roster.

use ic_stable_structures::memory_manager::MemoryId;
use ic_stable_structures::StableBTreeMap;
use std::cell::RefCell;

use crate::types::{CanvasSettings, House, RosterEntry, UNAFFILIATED_COLOR};
use crate::{Memory, MEMORY_ID_ROSTER};

thread_local! {
    // Keyed by lowercased, trimmed email.
    static ROSTER: RefCell<StableBTreeMap<String, RosterEntry, Memory>> = RefCell::new(
        StableBTreeMap::init(
            crate::MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(MEMORY_ID_ROSTER))),
        )
    );
}

/// A resolved participant. `house` is `None` when the email is not in the
/// roster; staff are recognized by address shape and need no roster entry.
#[derive(Clone, Debug)]
pub struct Participant {
    pub email: String,
    pub email_lower: String,
    pub name: String,
    pub house: Option<House>,
    pub is_staff: bool,
}

impl Participant {
    /// Staff pixels are always black; otherwise the house color, falling back
    /// to a neutral grey for unaffiliated addresses.
    pub fn color(&self) -> String {
        if self.is_staff {
            House::Staff.color().to_string()
        } else {
            self.house
                .map(|h| h.color().to_string())
                .unwrap_or_else(|| UNAFFILIATED_COLOR.to_string())
        }
    }

    /// The faction a placement by this participant counts toward. Rostered
    /// staff keep their house; unrostered staff count as the Staff faction.
    pub fn faction(&self) -> Option<House> {
        self.house.or(if self.is_staff { Some(House::Staff) } else { None })
    }
}

/// Staff addresses live in the staff domain and lack the student marker,
/// e.g. `jane.doe@engelska.se` but not `jane.doe.student.vasteras@engelska.se`.
pub fn is_staff_address(email: &str, settings: &CanvasSettings) -> bool {
    let email = email.trim().to_lowercase();
    email.contains(&settings.staff_domain) && !email.contains(&settings.student_marker)
}

pub fn resolve(email: &str, settings: &CanvasSettings) -> Participant {
    let email_lower = email.trim().to_lowercase();
    let entry = ROSTER.with(|r| r.borrow().get(&email_lower));

    let (name, house) = match entry {
        Some(e) => (format!("{} {}", e.first_name, e.last_name), Some(e.house)),
        None => (String::new(), None),
    };

    Participant {
        email: email.trim().to_string(),
        is_staff: is_staff_address(email, settings),
        email_lower,
        name,
        house,
    }
}

pub fn upsert(entry: RosterEntry) {
    let key = entry.email.trim().to_lowercase();
    ROSTER.with(|r| r.borrow_mut().insert(key, entry));
}

pub fn roster_size() -> u64 {
    ROSTER.with(|r| r.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_roster() {
        upsert(RosterEntry {
            first_name: "Maya".to_string(),
            last_name: "Lindqvist".to_string(),
            email: "Maya.Lindqvist.student.vasteras@engelska.se".to_string(),
            house: House::Hydra,
        });
    }

    #[test]
    fn test_resolve_rostered_student() {
        seed_roster();
        let settings = CanvasSettings::default();
        // Lookup is case-insensitive and trimmed.
        let p = resolve("  maya.lindqvist.STUDENT.vasteras@engelska.se ", &settings);
        assert_eq!(p.name, "Maya Lindqvist");
        assert_eq!(p.house, Some(House::Hydra));
        assert!(!p.is_staff);
        assert_eq!(p.color(), House::Hydra.color());
        assert_eq!(p.faction(), Some(House::Hydra));
    }

    #[test]
    fn test_resolve_unknown_student() {
        let settings = CanvasSettings::default();
        let p = resolve("nobody.student.vasteras@engelska.se", &settings);
        assert_eq!(p.house, None);
        assert!(!p.is_staff);
        assert_eq!(p.faction(), None);
        assert_eq!(p.color(), UNAFFILIATED_COLOR);
    }

    #[test]
    fn test_staff_detection() {
        let settings = CanvasSettings::default();
        let staff = resolve("barry.shaw@engelska.se", &settings);
        assert!(staff.is_staff);
        assert_eq!(staff.faction(), Some(House::Staff));
        assert_eq!(staff.color(), "#000000");

        // Student marker disqualifies.
        let student = resolve("barry.shaw.student.vasteras@engelska.se", &settings);
        assert!(!student.is_staff);

        // Outside domain entirely.
        let outsider = resolve("someone@gmail.com", &settings);
        assert!(!outsider.is_staff);
    }

    #[test]
    fn test_rostered_staff_keeps_house_with_black_color() {
        upsert(RosterEntry {
            first_name: "Erik".to_string(),
            last_name: "Berg".to_string(),
            email: "erik.berg@engelska.se".to_string(),
            house: House::Dragon,
        });
        let settings = CanvasSettings::default();
        let p = resolve("erik.berg@engelska.se", &settings);
        assert!(p.is_staff);
        // Placements count toward Dragon but render as staff black.
        assert_eq!(p.faction(), Some(House::Dragon));
        assert_eq!(p.color(), "#000000");
    }

    #[test]
    fn test_upsert_replaces_existing_entry() {
        seed_roster();
        upsert(RosterEntry {
            first_name: "Maya".to_string(),
            last_name: "Lindqvist".to_string(),
            email: "maya.lindqvist.student.vasteras@engelska.se".to_string(),
            house: House::Phoenix,
        });
        let settings = CanvasSettings::default();
        let p = resolve("maya.lindqvist.student.vasteras@engelska.se", &settings);
        assert_eq!(p.house, Some(House::Phoenix));
        assert_eq!(roster_size(), 1);
    }
}
