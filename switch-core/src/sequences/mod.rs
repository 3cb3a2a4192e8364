//! Button sequence configuration shared by the simulator and its drivers.
//!
//! A [`SequenceConfig`] fixes everything a single simulated run needs: the
//! positions the button moves between, the switch features that decide which
//! events are reported, and the timing of either a long press or a
//! multi-press burst. Configs are plain `Copy` data so they can be built at
//! compile time or assembled from REPL arguments.

use core::time::Duration;

use thiserror::Error;

use crate::switch::SwitchFeatures;

/// Timing of a single long press.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LongPressTiming {
    /// Time between the initial press and the `LongPress` event.
    pub delay: Duration,
    /// Total time the button stays pressed.
    pub duration: Duration,
}

impl LongPressTiming {
    #[must_use]
    pub const fn new(delay: Duration, duration: Duration) -> Self {
        Self { delay, duration }
    }

    /// Time the button remains pressed after `LongPress` was signaled.
    ///
    /// Saturates at zero for timings that fail validation.
    #[must_use]
    pub fn hold_after_signal(&self) -> Duration {
        self.duration.saturating_sub(self.delay)
    }
}

/// Timing of a multi-press burst.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MultiPressTiming {
    /// Time each press is held.
    pub hold: Duration,
    /// Time the button rests released between presses.
    pub gap: Duration,
    /// Number of presses in the burst.
    pub presses: u8,
    /// Largest count the switch reports; action switches report `0` above it.
    pub max: u8,
}

impl MultiPressTiming {
    #[must_use]
    pub const fn new(hold: Duration, gap: Duration, presses: u8, max: u8) -> Self {
        Self {
            hold,
            gap,
            presses,
            max,
        }
    }

    /// Length of one press/release cycle, saturating at `Duration::MAX`.
    #[must_use]
    pub fn cycle(&self) -> Duration {
        self.hold.saturating_add(self.gap)
    }

    /// Time covered by every press/release cycle of the burst, saturating at
    /// `Duration::MAX`.
    #[must_use]
    pub fn all_cycles(&self) -> Duration {
        self.cycle().saturating_mul(u32::from(self.presses))
    }

    /// Exact burst length, or `None` when it does not fit a `Duration`.
    #[must_use]
    pub fn checked_all_cycles(&self) -> Option<Duration> {
        self.hold
            .checked_add(self.gap)?
            .checked_mul(u32::from(self.presses))
    }
}

/// Shape of a simulated sequence.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SequenceMode {
    LongPress(LongPressTiming),
    MultiPress(MultiPressTiming),
}

/// Reasons a [`SequenceConfig`] is refused.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum SequenceConfigError {
    #[error("idle and pressed positions are both {0}")]
    SamePositions(u8),
    #[error("long press duration must exceed its delay")]
    LongPressTooShort,
    #[error("multi-press hold time must be positive")]
    ZeroHold,
    #[error("multi-press gap time must be positive")]
    ZeroGap,
    #[error("multi-press count must be positive")]
    ZeroPresses,
    #[error("multi-press burst is too long to schedule")]
    BurstTooLong,
}

/// Immutable parameters of one simulated run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SequenceConfig {
    pub idle_position: u8,
    pub pressed_position: u8,
    pub features: SwitchFeatures,
    pub mode: SequenceMode,
}

impl SequenceConfig {
    #[must_use]
    pub const fn new(
        idle_position: u8,
        pressed_position: u8,
        features: SwitchFeatures,
        mode: SequenceMode,
    ) -> Self {
        Self {
            idle_position,
            pressed_position,
            features,
            mode,
        }
    }

    /// Convenience constructor for a long press.
    #[must_use]
    pub const fn long_press(
        idle_position: u8,
        pressed_position: u8,
        features: SwitchFeatures,
        timing: LongPressTiming,
    ) -> Self {
        Self::new(
            idle_position,
            pressed_position,
            features,
            SequenceMode::LongPress(timing),
        )
    }

    /// Convenience constructor for a multi-press burst.
    #[must_use]
    pub const fn multi_press(
        idle_position: u8,
        pressed_position: u8,
        features: SwitchFeatures,
        timing: MultiPressTiming,
    ) -> Self {
        Self::new(
            idle_position,
            pressed_position,
            features,
            SequenceMode::MultiPress(timing),
        )
    }

    /// Checks the start preconditions of the configured mode.
    pub fn validate(&self) -> Result<(), SequenceConfigError> {
        if self.idle_position == self.pressed_position {
            return Err(SequenceConfigError::SamePositions(self.idle_position));
        }

        match self.mode {
            SequenceMode::LongPress(timing) => {
                if timing.duration <= timing.delay {
                    return Err(SequenceConfigError::LongPressTooShort);
                }
            }
            SequenceMode::MultiPress(timing) => {
                if timing.hold.is_zero() {
                    return Err(SequenceConfigError::ZeroHold);
                }
                if timing.gap.is_zero() {
                    return Err(SequenceConfigError::ZeroGap);
                }
                if timing.presses == 0 {
                    return Err(SequenceConfigError::ZeroPresses);
                }
                if timing.checked_all_cycles().is_none() {
                    return Err(SequenceConfigError::BurstTooLong);
                }
            }
        }

        Ok(())
    }

    /// Returns `true` when the action-switch feature collapses multi-press
    /// bursts into a single hold.
    #[must_use]
    pub fn is_action_switch(&self) -> bool {
        self.features.contains(SwitchFeatures::ACTION_SWITCH)
    }

    /// Time from `execute` to the completion callback.
    #[must_use]
    pub fn run_duration(&self) -> Duration {
        match self.mode {
            SequenceMode::LongPress(timing) => timing.duration,
            // Both multi-press shapes wait out the release gap after the last press.
            SequenceMode::MultiPress(timing) => timing.all_cycles(),
        }
    }
}
