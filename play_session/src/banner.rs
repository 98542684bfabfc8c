//! Level-change banner overlay.

use skill_ladder::{Transition, TransitionKind};

/// Portion of the banner's life spent fading in, and fading out.
const FADE: f32 = 0.2;

/// Timed overlay announcing a level change.
#[derive(Clone, Debug, PartialEq)]
pub struct Banner {
    pub kind:     TransitionKind,
    pub level:    u32,
    /// Seconds shown so far.
    pub age:      f32,
    pub duration: f32,
}

impl Banner {
    pub fn level_change(t: &Transition, duration: f32) -> Self {
        Banner { kind: t.kind, level: t.to, age: 0.0, duration: duration.max(0.0) }
    }

    /// Advance by `dt` seconds. Returns true once the banner has expired.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.age = (self.age + dt).min(self.duration);
        self.done()
    }

    pub fn done(&self) -> bool { self.age >= self.duration }

    /// Opacity 0.0–1.0: ramps up, holds, ramps down.
    pub fn alpha(&self) -> f32 {
        if self.duration <= 0.0 { return 0.0; }
        let t = self.age / self.duration;
        if t < FADE {
            t / FADE
        } else if t > 1.0 - FADE {
            ((1.0 - t) / FADE).max(0.0)
        } else {
            1.0
        }
    }

    pub fn text(&self) -> String {
        match self.kind {
            TransitionKind::Up   => format!("LEVEL UP! {}", self.level),
            TransitionKind::Down => format!("LEVEL DOWN {}", self.level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn up() -> Banner {
        Banner::level_change(&Transition { kind: TransitionKind::Up, from: 1, to: 2 }, 2.0)
    }

    #[test]
    fn banner_expires_after_duration() {
        let mut b = up();
        let mut done = false;
        for _ in 0..200 {
            if b.tick(1.0 / 60.0) { done = true; break; }
        }
        assert!(done);
        assert_eq!(b.alpha(), 0.0);
    }

    #[test]
    fn banner_fades_in_then_holds() {
        let mut b = up();
        assert_eq!(b.alpha(), 0.0);
        b.tick(0.2);
        assert!(b.alpha() > 0.0 && b.alpha() < 1.0);
        b.tick(0.8);
        assert_eq!(b.alpha(), 1.0);
        assert_eq!(b.text(), "LEVEL UP! 2");
    }
}
