//! Pure count/outs derivation over the pitch stream of an open at-bat.
//!
//! Everything here is replayable: the same event sequence always derives the
//! same count, so local state can be rebuilt from the cached buffer at any
//! time.

use crate::dao::models::{AtBatResultKind, PitchOutcome};
use crate::state::game::PitchEvent;

/// Balls needed to award a walk.
pub const BALLS_FOR_WALK: u8 = 4;
/// Effective strikes needed to complete a strikeout.
pub const STRIKES_FOR_STRIKEOUT: u8 = 3;
/// Highest strike count the scoreboard displays.
pub const DISPLAYED_STRIKE_CAP: u8 = STRIKES_FOR_STRIKEOUT - 1;

/// Running ball/strike tally within an at-bat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Count {
    /// Balls taken.
    pub balls: u8,
    /// Strikes including the one that would complete a strikeout.
    pub effective_strikes: u8,
}

impl Count {
    /// Strike count shown on the scoreboard, capped at two.
    pub fn displayed_strikes(&self) -> u8 {
        self.effective_strikes.min(DISPLAYED_STRIKE_CAP)
    }

    /// Terminal result the count itself forces, if any.
    ///
    /// These are derived transitions: the lifecycle controller checks them
    /// after every new pitch rather than storing them as events.
    pub fn auto_resolution(&self) -> Option<AutoResolution> {
        if self.balls >= BALLS_FOR_WALK {
            Some(AutoResolution::Walk)
        } else if self.effective_strikes >= STRIKES_FOR_STRIKEOUT {
            Some(AutoResolution::Strikeout)
        } else {
            None
        }
    }
}

/// At-bat ending forced by the count alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoResolution {
    /// Ball four.
    Walk,
    /// Strike three.
    Strikeout,
}

impl AutoResolution {
    /// The result kind to resolve the at-bat with.
    pub fn result_kind(&self) -> AtBatResultKind {
        match self {
            AutoResolution::Walk => AtBatResultKind::Walk,
            AutoResolution::Strikeout => AtBatResultKind::Strikeout,
        }
    }
}

/// Replay the pitch sequence into a count.
///
/// A called or swinging strike always increments; a foul increments only
/// while the running count is below two, so a foul can never complete a
/// strikeout on its own.
pub fn derive_count(events: &[PitchEvent]) -> Count {
    let mut count = Count::default();
    for event in events {
        match event.outcome {
            PitchOutcome::Ball => count.balls += 1,
            PitchOutcome::CalledStrike | PitchOutcome::SwingingStrike => {
                count.effective_strikes += 1;
            }
            PitchOutcome::Foul if count.effective_strikes < DISPLAYED_STRIKE_CAP => {
                count.effective_strikes += 1;
            }
            PitchOutcome::Foul | PitchOutcome::InPlay | PitchOutcome::HitByPitch => {}
        }
    }
    count
}

/// Outs a result contributes to the half-inning.
///
/// Membership in the out set is fixed by enumeration; nothing is inferred
/// from naming.
pub fn outs_contributed(result: AtBatResultKind) -> u8 {
    match result {
        AtBatResultKind::DoublePlay => 2,
        AtBatResultKind::TriplePlay => 3,
        AtBatResultKind::Strikeout
        | AtBatResultKind::Groundout
        | AtBatResultKind::Flyout
        | AtBatResultKind::Lineout
        | AtBatResultKind::Popout
        | AtBatResultKind::FieldersChoice
        | AtBatResultKind::ForceOut
        | AtBatResultKind::TagOut
        | AtBatResultKind::CaughtStealing
        | AtBatResultKind::SacrificeFly
        | AtBatResultKind::SacrificeBunt => 1,
        AtBatResultKind::Single
        | AtBatResultKind::Double
        | AtBatResultKind::Triple
        | AtBatResultKind::HomeRun
        | AtBatResultKind::Walk
        | AtBatResultKind::HitByPitch
        | AtBatResultKind::ReachedOnError => 0,
    }
}
