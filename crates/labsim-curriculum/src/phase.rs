//! Per-family phase state machines.
//!
//! Each experiment family tracks its sub-procedure progress in a tagged
//! [`PhaseMachine`] variant with an explicit, finite flag set:
//!
//! - **Comparison** — two independent phases A and B. Completing one raises
//!   a reset prompt; completing the second (with the first already done)
//!   finishes the experiment without another reset.
//! - **MaterialStudy** — three rounds tested in order. Chemical gating for
//!   round r lives in the session (it needs session membership); the machine
//!   only carries the tested flags and a display step offset.
//! - **Titration** — a monotonic drop counter. Completion is authoritative
//!   here: the counter crossing [`TITRATION_THRESHOLD`] flips the flag, and
//!   the signature-lookup path never completes this family.

use labsim_core::registry::Rgba;
use serde::{Deserialize, Serialize};

/// Drop count at which a titration snaps to the shifted colour and
/// completes.
pub const TITRATION_THRESHOLD: u32 = 5;

/// Phase progress for one experiment, tagged by family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseMachine {
    Comparison { a_done: bool, b_done: bool },
    MaterialStudy { tested: [bool; 3] },
    Titration { drops: u32, complete: bool },
}

impl PhaseMachine {
    pub fn comparison() -> Self {
        PhaseMachine::Comparison {
            a_done: false,
            b_done: false,
        }
    }

    pub fn material_study() -> Self {
        PhaseMachine::MaterialStudy {
            tested: [false; 3],
        }
    }

    pub fn titration() -> Self {
        PhaseMachine::Titration {
            drops: 0,
            complete: false,
        }
    }

    pub fn phase_count(&self) -> u8 {
        match self {
            PhaseMachine::Comparison { .. } => 2,
            PhaseMachine::MaterialStudy { .. } => 3,
            PhaseMachine::Titration { .. } => 1,
        }
    }

    pub fn completed_count(&self) -> u8 {
        match self {
            PhaseMachine::Comparison { a_done, b_done } => *a_done as u8 + *b_done as u8,
            PhaseMachine::MaterialStudy { tested } => {
                tested.iter().map(|&t| t as u8).sum()
            }
            PhaseMachine::Titration { complete, .. } => *complete as u8,
        }
    }

    pub fn is_phase_complete(&self, phase: u8) -> bool {
        match self {
            PhaseMachine::Comparison { a_done, b_done } => match phase {
                0 => *a_done,
                1 => *b_done,
                _ => false,
            },
            PhaseMachine::MaterialStudy { tested } => {
                tested.get(phase as usize).copied().unwrap_or(false)
            }
            PhaseMachine::Titration { complete, .. } => phase == 0 && *complete,
        }
    }

    /// Set one phase flag. Out-of-range phases are no-ops; for Titration
    /// the flag is owned by the drop counter and this does nothing.
    pub fn complete_phase(&mut self, phase: u8) {
        match self {
            PhaseMachine::Comparison { a_done, b_done } => match phase {
                0 => *a_done = true,
                1 => *b_done = true,
                _ => {}
            },
            PhaseMachine::MaterialStudy { tested } => {
                if let Some(flag) = tested.get_mut(phase as usize) {
                    *flag = true;
                }
            }
            PhaseMachine::Titration { .. } => {}
        }
    }

    pub fn all_phases_complete(&self) -> bool {
        self.completed_count() == self.phase_count()
    }

    /// Clear every flag (fresh run).
    pub fn reset_fresh(&mut self) {
        *self = match self {
            PhaseMachine::Comparison { .. } => PhaseMachine::comparison(),
            PhaseMachine::MaterialStudy { .. } => PhaseMachine::material_study(),
            PhaseMachine::Titration { .. } => PhaseMachine::titration(),
        };
    }

    /// Increment the titration drop counter. Returns the new count, or None
    /// for other families. Sets the completion flag at the threshold.
    pub fn add_drop(&mut self) -> Option<u32> {
        let PhaseMachine::Titration { drops, complete } = self else {
            return None;
        };
        *drops += 1;
        if *drops >= TITRATION_THRESHOLD {
            *complete = true;
        }
        Some(*drops)
    }

    /// Display-only step offset for a material study: two display steps per
    /// tested round, plus one while the reset prompt is showing.
    pub fn step_offset(&self, reset_prompt_shown: bool) -> u8 {
        match self {
            PhaseMachine::MaterialStudy { tested } => {
                let done: u8 = tested.iter().map(|&t| t as u8).sum();
                done * 2 + reset_prompt_shown as u8
            }
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Titration colour interpolation
// ---------------------------------------------------------------------------

/// Blend the indicator colour toward the shifted colour for a given drop
/// count. Deliberately non-linear: drops below the threshold move the colour
/// by a near-invisible amount (1% per drop), and the threshold snaps to the
/// fully shifted colour.
pub fn titration_blend(from: Rgba, to: Rgba, drops: u32) -> Rgba {
    if drops >= TITRATION_THRESHOLD {
        return to;
    }
    // 1% per drop, in integer per-mille to stay deterministic.
    let t = drops * 10; // out of 1000
    let lerp = |a: u8, b: u8| -> u8 {
        let a = a as i32;
        let b = b as i32;
        (a + (b - a) * t as i32 / 1000) as u8
    };
    Rgba {
        r: lerp(from.r, to.r),
        g: lerp(from.g, to.g),
        b: lerp(from.b, to.b),
        a: lerp(from.a, to.a),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Comparison
    // -----------------------------------------------------------------------

    #[test]
    fn comparison_completes_after_both_phases() {
        let mut m = PhaseMachine::comparison();
        assert!(!m.all_phases_complete());
        m.complete_phase(0);
        assert_eq!(m.completed_count(), 1);
        assert!(!m.all_phases_complete());
        m.complete_phase(1);
        assert!(m.all_phases_complete());
    }

    #[test]
    fn comparison_phases_are_order_independent() {
        let mut m = PhaseMachine::comparison();
        m.complete_phase(1);
        assert!(m.is_phase_complete(1));
        assert!(!m.is_phase_complete(0));
    }

    // -----------------------------------------------------------------------
    // Material study
    // -----------------------------------------------------------------------

    #[test]
    fn material_study_tracks_three_rounds() {
        let mut m = PhaseMachine::material_study();
        for round in 0..3 {
            assert!(!m.all_phases_complete());
            m.complete_phase(round);
        }
        assert!(m.all_phases_complete());
    }

    #[test]
    fn step_offset_counts_rounds_and_prompt() {
        let mut m = PhaseMachine::material_study();
        assert_eq!(m.step_offset(false), 0);
        assert_eq!(m.step_offset(true), 1);
        m.complete_phase(0);
        assert_eq!(m.step_offset(false), 2);
        assert_eq!(m.step_offset(true), 3);
    }

    #[test]
    fn out_of_range_phase_is_noop() {
        let mut m = PhaseMachine::material_study();
        m.complete_phase(7);
        assert_eq!(m.completed_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Titration
    // -----------------------------------------------------------------------

    #[test]
    fn drops_below_threshold_do_not_complete() {
        let mut m = PhaseMachine::titration();
        for expected in 1..TITRATION_THRESHOLD {
            assert_eq!(m.add_drop(), Some(expected));
            assert!(!m.all_phases_complete());
        }
    }

    #[test]
    fn threshold_drop_completes() {
        let mut m = PhaseMachine::titration();
        for _ in 0..TITRATION_THRESHOLD {
            m.add_drop();
        }
        assert!(m.all_phases_complete());
        assert!(m.is_phase_complete(0));
    }

    #[test]
    fn complete_phase_never_completes_titration() {
        // The drop counter is authoritative; the signature path can't
        // complete this family.
        let mut m = PhaseMachine::titration();
        m.complete_phase(0);
        assert!(!m.all_phases_complete());
    }

    #[test]
    fn add_drop_is_titration_only() {
        let mut m = PhaseMachine::comparison();
        assert_eq!(m.add_drop(), None);
    }

    // -----------------------------------------------------------------------
    // Colour interpolation
    // -----------------------------------------------------------------------

    #[test]
    fn early_drops_barely_move_the_colour() {
        let clear = Rgba::opaque(255, 255, 255);
        let pink = Rgba::opaque(255, 105, 180);
        for drops in 1..TITRATION_THRESHOLD {
            let blended = titration_blend(clear, pink, drops);
            // Largest channel delta is 150; 4 drops shift at most 4% of it.
            assert!((blended.b as i32 - clear.b as i32).unsigned_abs() <= 6);
            assert_ne!(blended, pink);
        }
    }

    #[test]
    fn threshold_snaps_to_target() {
        let clear = Rgba::opaque(255, 255, 255);
        let pink = Rgba::opaque(255, 105, 180);
        assert_eq!(titration_blend(clear, pink, TITRATION_THRESHOLD), pink);
        assert_eq!(titration_blend(clear, pink, TITRATION_THRESHOLD + 3), pink);
    }

    #[test]
    fn reset_fresh_clears_all_flags() {
        let mut m = PhaseMachine::comparison();
        m.complete_phase(0);
        m.complete_phase(1);
        m.reset_fresh();
        assert_eq!(m.completed_count(), 0);

        let mut t = PhaseMachine::titration();
        for _ in 0..TITRATION_THRESHOLD {
            t.add_drop();
        }
        t.reset_fresh();
        assert_eq!(t, PhaseMachine::titration());
    }
}
