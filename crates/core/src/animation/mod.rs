use std::{f32::consts::PI, time::Duration};

use tracing::debug;

use crate::{AnimationConfig, ResourceHandle, ResourceKind, Result};

/// Endless back-and-forth tween of a single value.
///
/// Each leg runs from one bound to the other over `period`, eased in and out,
/// and the next leg runs in reverse.
#[derive(Debug, Clone)]
pub struct LoopAnimation {
    from: f32,
    to: f32,
    period: Duration,
    elapsed: Duration,
}

impl LoopAnimation {
    pub fn new(from: f32, to: f32, period: Duration) -> Self {
        Self {
            from,
            to,
            period,
            elapsed: Duration::ZERO,
        }
    }

    pub fn advance(&mut self, delta: Duration) {
        self.elapsed = self.elapsed.saturating_add(delta);
    }

    /// Current animated value.
    pub fn value(&self) -> f32 {
        if self.period.is_zero() {
            return self.from;
        }
        let phase = self.elapsed.as_secs_f64() / self.period.as_secs_f64();
        let leg = phase.floor();
        let mut progress = (phase - leg) as f32;
        if leg as u64 % 2 == 1 {
            progress = 1.0 - progress;
        }
        self.from + (self.to - self.from) * ease_in_out(progress)
    }
}

fn ease_in_out(t: f32) -> f32 {
    0.5 - (PI * t).cos() * 0.5
}

/// Vertical bobbing of the image in the animation section.
#[derive(Debug)]
pub struct AnimationHandle {
    amplitude: f32,
    period: Duration,
    running: Option<LoopAnimation>,
    translation_y: f32,
}

impl AnimationHandle {
    pub fn new(config: &AnimationConfig) -> Self {
        Self {
            amplitude: config.amplitude,
            period: Duration::from_millis(config.period_ms),
            running: None,
            translation_y: 0.0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn translation_y(&self) -> f32 {
        self.translation_y
    }

    /// Begins a fresh loop, replacing any loop already running.
    pub fn start(&mut self) {
        let animation = LoopAnimation::new(-self.amplitude, self.amplitude, self.period);
        self.translation_y = animation.value();
        self.running = Some(animation);
    }

    /// Advances the running loop by one frame.
    pub fn tick(&mut self, delta: Duration) {
        if let Some(animation) = self.running.as_mut() {
            animation.advance(delta);
            self.translation_y = animation.value();
        }
    }

    /// Cancels the loop, leaving the image where it is.
    pub fn cancel(&mut self) {
        if self.running.take().is_some() {
            debug!(translation_y = self.translation_y, "animation cancelled");
        }
    }
}

impl ResourceHandle for AnimationHandle {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Animation
    }

    fn is_active(&self) -> bool {
        self.is_running()
    }

    fn start(&mut self) -> Result<()> {
        AnimationHandle::start(self);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.cancel();
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.cancel();
        self.translation_y = 0.0;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        ResourceHandle::reset(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn loop_reverses_each_leg() {
        let mut animation = LoopAnimation::new(-20.0, 20.0, ms(700));
        assert!((animation.value() + 20.0).abs() < 1e-4);

        animation.advance(ms(350));
        assert!(animation.value().abs() < 1e-3);

        animation.advance(ms(350));
        assert!((animation.value() - 20.0).abs() < 1e-3);

        animation.advance(ms(700));
        assert!((animation.value() + 20.0).abs() < 1e-3);
    }

    #[test]
    fn easing_is_slow_near_the_bounds() {
        let mut animation = LoopAnimation::new(0.0, 1.0, ms(1000));
        animation.advance(ms(100));
        let near_start = animation.value();
        animation.advance(ms(400));
        let middle = animation.value();

        assert!(near_start < 0.1);
        assert!((middle - 0.5).abs() < 1e-3);
    }

    #[test]
    fn zero_period_stays_at_start() {
        let mut animation = LoopAnimation::new(-5.0, 5.0, Duration::ZERO);
        animation.advance(ms(10));
        assert_eq!(animation.value(), -5.0);
    }

    #[test]
    fn reset_returns_translation_to_neutral() {
        let mut handle = AnimationHandle::new(&AnimationConfig::default());
        AnimationHandle::start(&mut handle);
        handle.tick(ms(100));
        assert!(handle.is_active());
        assert!(handle.translation_y() != 0.0);

        ResourceHandle::reset(&mut handle).unwrap();

        assert!(!handle.is_active());
        assert_eq!(handle.translation_y(), 0.0);
    }

    #[test]
    fn tick_without_loop_does_nothing() {
        let mut handle = AnimationHandle::new(&AnimationConfig::default());
        handle.tick(ms(500));
        assert_eq!(handle.translation_y(), 0.0);
    }

    #[test]
    fn restart_replaces_running_loop() {
        let mut handle = AnimationHandle::new(&AnimationConfig::default());
        AnimationHandle::start(&mut handle);
        handle.tick(ms(350));

        AnimationHandle::start(&mut handle);

        assert!((handle.translation_y() + 20.0).abs() < 1e-4);
    }
}
