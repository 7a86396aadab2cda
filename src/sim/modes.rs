//! Move-mode state machine
//!
//! Every mode change goes through `set_move_mode`. Leaving a mode runs that
//! mode's stop hook, so boosts and timers can never outlive their mode.
//! Re-entering the current mode is a no-op: no hooks run and no timers reset.

use super::profile::Capability;
use super::sprite::{MoveMode, Sprite};
use crate::tuning::{KnockbackStrength, PhysParams, Tuning};

impl Sprite {
    /// Request a mode change. Returns true if the mode actually changed.
    ///
    /// While stunned every transition is refused; `clear_stun` is the only
    /// way out.
    pub fn set_move_mode(&mut self, mode: MoveMode, tuning: &Tuning, frame: u32, cause: &str) -> bool {
        if self.move_mode == MoveMode::Stunned && mode != MoveMode::Stunned {
            log::debug!(
                "Frame {} {:?} stays STUNNED, refused {} ({})",
                frame,
                self.stype,
                mode,
                cause
            );
            return false;
        }
        self.transition(mode, tuning, frame, cause)
    }

    fn transition(&mut self, mode: MoveMode, tuning: &Tuning, frame: u32, cause: &str) -> bool {
        if self.move_mode == mode {
            return false;
        }
        let params = *self.params(tuning);
        if mode != MoveMode::Jump {
            self.stop_jump_boost(&params, cause);
        }
        if mode != MoveMode::Dash {
            self.stop_dash_boost(&params, cause);
        }
        if mode != MoveMode::Knockback {
            self.stop_knockback(cause);
        }
        if mode != MoveMode::ButtDash {
            self.stop_buttstomp(cause);
        }

        log::debug!(
            "Frame {} {:?} {} -> {} ({})",
            frame,
            self.stype,
            self.move_mode,
            mode,
            cause
        );
        self.move_mode = mode;
        true
    }

    /// End the jump boost window. Idempotent.
    pub fn stop_jump_boost(&mut self, params: &PhysParams, cause: &str) {
        if self.jump_frame_num < params.max_jump_boost_frames {
            log::trace!("{:?} jump boost stopped ({})", self.stype, cause);
            self.jump_frame_num = params.max_jump_boost_frames;
        }
    }

    /// End an active dash boost and start the cooldown. Idempotent, and a
    /// running cooldown is left alone.
    pub fn stop_dash_boost(&mut self, params: &PhysParams, cause: &str) {
        if self.dash_frame_num > 0 {
            log::trace!("{:?} dash boost stopped ({})", self.stype, cause);
            self.dash_frame_num = -params.dash_delay_frames.max(0);
        }
    }

    pub fn stop_knockback(&mut self, cause: &str) {
        if self.knockback_frame_num != 0 {
            log::trace!("{:?} knockback stopped ({})", self.stype, cause);
            self.knockback_frame_num = 0;
        }
    }

    pub fn stop_buttstomp(&mut self, cause: &str) {
        if self.buttdash_frame_num != 0 {
            log::trace!("{:?} buttstomp stopped ({})", self.stype, cause);
            self.buttdash_frame_num = 0;
        }
    }

    /// Start a jump on a fresh press while grounded or within coyote time
    pub fn try_jump(&mut self, tuning: &Tuning, frame: u32) -> bool {
        if !self.input.jump_pressed() {
            return false;
        }
        if matches!(
            self.move_mode,
            MoveMode::Jump
                | MoveMode::Knockback
                | MoveMode::Stunned
                | MoveMode::ButtDash
                | MoveMode::ButtBounce
        ) {
            return false;
        }
        let coyote = self
            .last_grounded_frame
            .is_some_and(|g| frame.saturating_sub(g) <= tuning.coyote_frames);
        if !self.is_grounded && !coyote {
            return false;
        }
        if !self.set_move_mode(MoveMode::Jump, tuning, frame, "jump pressed") {
            return false;
        }
        self.jump_frame_num = 0;
        self.sub_vel.y = self.sub_vel.y.min(0);
        true
    }

    /// Apply jump force while the button is held inside the boost window
    pub fn try_continue_jump(&mut self, params: &PhysParams) {
        if self.move_mode != MoveMode::Jump {
            return;
        }
        if self.jump_frame_num >= params.max_jump_boost_frames {
            self.stop_jump_boost(params, "boost window over");
            return;
        }
        if self.input.jump > 0 {
            self.sub_vel.y -= params.jump_force;
            self.jump_frame_num += 1;
        } else {
            self.stop_jump_boost(params, "jump released");
        }
    }

    /// Start a dash on a fresh run press while walking
    pub fn try_dash(&mut self, tuning: &Tuning, frame: u32) -> bool {
        if !self.has(Capability::SpecialMoves) || !self.input.run_pressed() {
            return false;
        }
        if !self.is_grounded || self.move_mode != MoveMode::Walk || self.dash_frame_num != 0 {
            return false;
        }
        if !self.set_move_mode(MoveMode::Dash, tuning, frame, "dash pressed") {
            return false;
        }
        self.dash_frame_num = 1;
        true
    }

    /// Apply dash force while run is held; drop back to walk/fall after
    pub fn try_continue_dash(&mut self, tuning: &Tuning, frame: u32) {
        if self.move_mode != MoveMode::Dash {
            return;
        }
        let params = *self.params(tuning);
        if self.dash_frame_num > 0
            && self.dash_frame_num <= params.max_dash_frames
            && self.input.run > 0
        {
            self.sub_vel.x += self.facing_sign() * params.dash_force;
            self.dash_frame_num += 1;
            return;
        }
        let next = if self.is_grounded {
            MoveMode::Walk
        } else {
            MoveMode::Fall
        };
        self.set_move_mode(next, tuning, frame, "dash over");
    }

    /// Start a buttstomp on a fresh run press in the air
    pub fn try_buttdash(&mut self, tuning: &Tuning, frame: u32) -> bool {
        if !self.has(Capability::SpecialMoves) || !self.input.run_pressed() || self.is_grounded {
            return false;
        }
        if !matches!(
            self.move_mode,
            MoveMode::Fall | MoveMode::Jump | MoveMode::ButtBounce
        ) {
            return false;
        }
        self.begin_buttdash(tuning, frame, "buttstomp pressed")
    }

    fn begin_buttdash(&mut self, tuning: &Tuning, frame: u32, cause: &str) -> bool {
        if !self.set_move_mode(MoveMode::ButtDash, tuning, frame, cause) {
            return false;
        }
        let params = self.params(tuning);
        self.sub_vel.x = 0;
        self.sub_vel.y = self.sub_vel.y.max(params.buttdash_speed);
        self.buttdash_frame_num = 1;
        true
    }

    /// Once a buttbounce stops rising (`vel.y >= 0`) it returns to BUTTDASH,
    /// but only while the dash (run) button is held, the same input that
    /// starts a buttstomp in the air. Without it the bounce ends in FALL, so
    /// a capped bounce cannot chain forever on its own.
    pub fn check_buttbounce_apex(&mut self, tuning: &Tuning, frame: u32) {
        if self.move_mode != MoveMode::ButtBounce || self.sub_vel.y < 0 {
            return;
        }
        if self.input.run > 0 && self.has(Capability::SpecialMoves) {
            self.begin_buttdash(tuning, frame, "buttbounce apex, run held");
        } else {
            self.set_move_mode(MoveMode::Fall, tuning, frame, "buttbounce apex");
        }
    }

    /// Landing from a buttstomp: bounce by the distance fallen
    pub fn buttbounce(&mut self, tuning: &Tuning, frame: u32) {
        let fall = self.feet_y() - self.highest_y_sub_pos_in_jump;
        let vel = tuning.buttbounce_vel(fall);
        if self.set_move_mode(MoveMode::ButtBounce, tuning, frame, "buttstomp landed") {
            self.sub_vel.y = -vel;
            log::debug!("{:?} buttbounce {} after falling {}", self.stype, vel, fall);
        }
    }

    /// Knock the sprite away from a source (`away` is -1 or 1).
    ///
    /// Refused while already in knockback. A stunned sprite only receives
    /// the impulse and stays stunned.
    pub fn apply_knockback(
        &mut self,
        strength: KnockbackStrength,
        away: i32,
        tuning: &Tuning,
        frame: u32,
        cause: &str,
    ) -> bool {
        if self.move_mode == MoveMode::Knockback {
            return false;
        }
        let impulse = tuning.knockback.impulse(strength);
        self.sub_vel.x = away.signum() * impulse.x;
        if strength == KnockbackStrength::Hard {
            self.invuln_frames = tuning.hard_invuln_frames;
            self.sub_vel.y = self.sub_vel.y.min(0);
        }
        self.sub_vel.y += impulse.y;

        if self.move_mode == MoveMode::Stunned {
            log::debug!("Frame {} {:?} nudged while stunned ({})", frame, self.stype, cause);
            return true;
        }
        self.set_move_mode(MoveMode::Knockback, tuning, frame, cause);
        self.knockback_frame_num = 0;
        true
    }

    pub fn stun(&mut self, tuning: &Tuning, frame: u32, cause: &str) -> bool {
        if !self.set_move_mode(MoveMode::Stunned, tuning, frame, cause) {
            return false;
        }
        self.stun_frame_num = 0;
        self.sub_vel.x = 0;
        true
    }

    /// Leave STUNNED, bypassing the stun lock
    pub fn clear_stun(&mut self, tuning: &Tuning, frame: u32) {
        if self.move_mode == MoveMode::Stunned {
            self.stun_frame_num = 0;
            self.transition(MoveMode::Fall, tuning, frame, "stun cleared");
        }
    }

    /// Per-frame mode counters: dash cooldown, knockback/stun expiry,
    /// buttstomp duration
    pub fn tick_mode_timers(&mut self, tuning: &Tuning, frame: u32) {
        let params = *self.params(tuning);
        if self.dash_frame_num < 0 {
            self.dash_frame_num += 1;
        }
        match self.move_mode {
            MoveMode::Knockback => {
                self.knockback_frame_num += 1;
                if self.knockback_frame_num >= params.max_knockback_frames {
                    self.set_move_mode(MoveMode::Fall, tuning, frame, "knockback over");
                }
            }
            MoveMode::Stunned => {
                self.stun_frame_num += 1;
                if self.stun_frame_num >= params.max_knockback_frames {
                    self.clear_stun(tuning, frame);
                }
            }
            MoveMode::ButtDash => self.buttdash_frame_num += 1,
            _ => {}
        }
    }

    /// Ground contact changes: landing ends airborne modes, a buttstomp
    /// landing bounces, walking off a ledge starts a fall
    pub fn update_ground_mode(&mut self, tuning: &Tuning, frame: u32) {
        if self.is_grounded {
            match self.move_mode {
                MoveMode::ButtDash => self.buttbounce(tuning, frame),
                MoveMode::Fall | MoveMode::Jump if self.sub_vel.y >= 0 => {
                    self.set_move_mode(MoveMode::Walk, tuning, frame, "landed");
                }
                MoveMode::ButtBounce if self.sub_vel.y >= 0 => {
                    self.set_move_mode(MoveMode::Walk, tuning, frame, "landed");
                }
                _ => {}
            }
        } else if self.move_mode == MoveMode::Walk {
            self.set_move_mode(MoveMode::Fall, tuning, frame, "left the ground");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::input::Buttons;
    use crate::sim::profile::SpriteType;
    use crate::sim::state::SpriteHandle;
    use glam::IVec2;

    fn player() -> Sprite {
        Sprite::new(SpriteType::Player, SpriteHandle::new(0, 0), IVec2::new(32, 32), 0)
    }

    #[test]
    fn test_same_mode_is_noop() {
        let tuning = Tuning::default();
        let mut spr = player();
        assert!(spr.set_move_mode(MoveMode::Walk, &tuning, 1, "test"));
        spr.dash_frame_num = -10;
        assert!(!spr.set_move_mode(MoveMode::Walk, &tuning, 2, "again"));
        assert_eq!(spr.dash_frame_num, -10);

        spr.set_move_mode(MoveMode::Jump, &tuning, 3, "test");
        spr.jump_frame_num = 3;
        assert!(!spr.set_move_mode(MoveMode::Jump, &tuning, 4, "again"));
        assert_eq!(spr.jump_frame_num, 3);
    }

    #[test]
    fn test_leaving_jump_ends_boost() {
        let tuning = Tuning::default();
        let mut spr = player();
        spr.set_move_mode(MoveMode::Jump, &tuning, 1, "test");
        spr.jump_frame_num = 2;
        spr.set_move_mode(MoveMode::Fall, &tuning, 2, "test");
        assert_eq!(spr.jump_frame_num, tuning.player.max_jump_boost_frames);
    }

    #[test]
    fn test_jump_out_of_dash_starts_cooldown() {
        let tuning = Tuning::default();
        let mut spr = player();
        spr.is_grounded = true;
        spr.set_move_mode(MoveMode::Walk, &tuning, 1, "test");
        spr.input.refresh(Buttons::RUN);
        assert!(spr.try_dash(&tuning, 2));
        assert_eq!(spr.dash_frame_num, 1);

        spr.input.refresh(Buttons::RUN | Buttons::JUMP);
        assert!(spr.try_jump(&tuning, 3));
        assert_eq!(spr.move_mode(), MoveMode::Jump);
        assert_eq!(spr.dash_frame_num, -tuning.player.dash_delay_frames);
    }

    #[test]
    fn test_dash_needs_cooldown() {
        let tuning = Tuning::default();
        let mut spr = player();
        spr.is_grounded = true;
        spr.set_move_mode(MoveMode::Walk, &tuning, 1, "test");
        spr.dash_frame_num = -3;
        spr.input.refresh(Buttons::RUN);
        assert!(!spr.try_dash(&tuning, 2));
        for frame in 0..3 {
            spr.tick_mode_timers(&tuning, 3 + frame);
        }
        assert_eq!(spr.dash_frame_num, 0);
        spr.input.refresh(Buttons::empty());
        spr.input.refresh(Buttons::RUN);
        assert!(spr.try_dash(&tuning, 7));
    }

    #[test]
    fn test_stun_blocks_transitions_until_cleared() {
        let tuning = Tuning::default();
        let mut spr = player();
        assert!(spr.stun(&tuning, 1, "test"));
        assert!(!spr.set_move_mode(MoveMode::Walk, &tuning, 2, "test"));
        // Impulse lands, mode does not change
        assert!(spr.apply_knockback(KnockbackStrength::Nudge, 1, &tuning, 2, "test"));
        assert_eq!(spr.sub_vel.x, tuning.knockback.nudge.x);
        assert_eq!(spr.move_mode(), MoveMode::Stunned);
        spr.clear_stun(&tuning, 3);
        assert_eq!(spr.move_mode(), MoveMode::Fall);
    }

    #[test]
    fn test_stun_expires_with_knockback_window() {
        let tuning = Tuning::default();
        let last = tuning.player.max_knockback_frames as u32;
        let mut spr = player();
        spr.stun(&tuning, 0, "test");
        for frame in 1..last {
            spr.tick_mode_timers(&tuning, frame);
            assert_eq!(spr.move_mode(), MoveMode::Stunned);
        }
        spr.tick_mode_timers(&tuning, last);
        assert_eq!(spr.move_mode(), MoveMode::Fall);
    }

    #[test]
    fn test_knockback_refused_while_knocked_back() {
        let tuning = Tuning::default();
        let mut spr = player();
        assert!(spr.apply_knockback(KnockbackStrength::Soft, -1, &tuning, 1, "test"));
        assert_eq!(spr.sub_vel.x, -tuning.knockback.soft.x);
        assert!(!spr.apply_knockback(KnockbackStrength::Hard, 1, &tuning, 2, "test"));
        assert_eq!(spr.sub_vel.x, -tuning.knockback.soft.x);
    }

    #[test]
    fn test_hard_knockback_zeroes_fall_and_grants_invuln() {
        let tuning = Tuning::default();
        let mut spr = player();
        spr.sub_vel.y = 100;
        spr.apply_knockback(KnockbackStrength::Hard, 1, &tuning, 1, "test");
        assert_eq!(spr.sub_vel.y, tuning.knockback.hard.y);
        assert_eq!(spr.invuln_frames, tuning.hard_invuln_frames);
    }

    #[test]
    fn test_coyote_jump() {
        let tuning = Tuning::default();
        let mut spr = player();
        spr.last_grounded_frame = Some(10);
        spr.is_grounded = false;
        spr.sub_vel.y = 30;
        spr.input.refresh(Buttons::JUMP);
        assert!(spr.try_jump(&tuning, 10 + tuning.coyote_frames));
        assert_eq!(spr.sub_vel.y, 0);

        let mut late = player();
        late.last_grounded_frame = Some(10);
        late.input.refresh(Buttons::JUMP);
        assert!(!late.try_jump(&tuning, 11 + tuning.coyote_frames));
    }

    #[test]
    fn test_no_coyote_jump_before_first_landing() {
        let tuning = Tuning::default();
        let mut spr = player();
        assert_eq!(spr.last_grounded_frame, None);
        spr.input.refresh(Buttons::JUMP);
        assert!(!spr.try_jump(&tuning, 1));
        assert_eq!(spr.move_mode(), MoveMode::Fall);
    }

    #[test]
    fn test_buttbounce_apex() {
        let tuning = Tuning::default();
        let mut spr = player();
        spr.set_move_mode(MoveMode::ButtBounce, &tuning, 1, "test");
        spr.sub_vel.y = -5;
        spr.input.refresh(Buttons::RUN);
        spr.check_buttbounce_apex(&tuning, 2);
        assert_eq!(spr.move_mode(), MoveMode::ButtBounce);

        spr.sub_vel.y = 0;
        spr.check_buttbounce_apex(&tuning, 3);
        assert_eq!(spr.move_mode(), MoveMode::ButtDash);
        assert_eq!(spr.sub_vel.y, tuning.player.buttdash_speed);

        let mut idle = player();
        idle.set_move_mode(MoveMode::ButtBounce, &tuning, 1, "test");
        idle.sub_vel.y = 3;
        idle.check_buttbounce_apex(&tuning, 2);
        assert_eq!(idle.move_mode(), MoveMode::Fall);
    }

    #[test]
    fn test_buttbounce_clamped() {
        let tuning = Tuning::default();
        let mut spr = player();
        spr.set_move_mode(MoveMode::ButtDash, &tuning, 1, "test");
        spr.highest_y_sub_pos_in_jump = spr.feet_y() - 100_000;
        spr.is_grounded = true;
        spr.update_ground_mode(&tuning, 2);
        assert_eq!(spr.move_mode(), MoveMode::ButtBounce);
        assert_eq!(spr.sub_vel.y, -tuning.buttbounce_max_vel);
    }
}
