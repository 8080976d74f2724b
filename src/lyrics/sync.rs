//! Lyrics synchronization and scrolling layout
//!
//! Given the current playback position, the engine finds the active line and,
//! when it changes, produces one [`LayoutInstruction`] per line: where the line
//! should sit relative to the viewport, how blurred it is, whether it is
//! highlighted and how long the renderer should wait before moving it.
//!
//! The engine never measures or schedules anything itself. Line heights come
//! from a [`LineMetrics`] provider owned by the renderer, and the renderer is
//! responsible for honouring `transition_delay_ms`.

use super::parser::Timeline;
use serde::Serialize;

/// Line height source supplied by the renderer.
pub trait LineMetrics {
    /// Height of line `index`, in the renderer's vertical units.
    fn height_of(&self, index: usize) -> f32;
}

impl<F> LineMetrics for F
where
    F: Fn(usize) -> f32,
{
    fn height_of(&self, index: usize) -> f32 {
        self(index)
    }
}

/// Layout constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncConfig {
    /// Gap between consecutive lines
    pub line_spacing: f32,
    /// Where the active line's top edge sits, measured from the viewport top
    pub anchor_offset: f32,
    /// Delay added per line of distance from the active line
    pub stagger_step_ms: u32,
    /// Past this many lines (distance + 1) the delay drops back to zero
    pub stagger_cap: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            line_spacing: 20.0,
            anchor_offset: 0.0,
            stagger_step_ms: 60,
            stagger_cap: 10,
        }
    }
}

impl SyncConfig {
    /// Places the active line at `viewport_height / divisor`.
    pub fn anchored(mut self, viewport_height: f32, divisor: f32) -> Self {
        self.anchor_offset = if divisor > 0.0 && viewport_height.is_finite() {
            viewport_height / divisor
        } else {
            0.0
        };
        self
    }
}

/// Visual target for one line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutInstruction {
    pub index: usize,
    pub vertical_offset: f32,
    pub blur_radius: f32,
    pub emphasize: bool,
    pub transition_delay_ms: u32,
}

/// Result of one tick. `layout` is empty when nothing changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickOutcome {
    pub active_index: Option<usize>,
    pub layout: Vec<LayoutInstruction>,
}

/// Index of the last line whose time is `<= position`.
///
/// `None` for an empty timeline, a position before the first line, or a
/// non-finite position.
pub fn active_index(timeline: &Timeline, position: f64) -> Option<usize> {
    if !position.is_finite() {
        return None;
    }
    timeline
        .partition_point(|line| line.time <= position)
        .checked_sub(1)
}

/// One synchronization step as a pure function of its inputs.
///
/// Layout is only produced when the active index differs from `previous`.
/// `staggered` is false for the first layout of a freshly loaded timeline so
/// the initial placement is immediate.
pub fn on_tick(
    position: f64,
    timeline: &Timeline,
    previous: Option<usize>,
    staggered: bool,
    metrics: &dyn LineMetrics,
    config: &SyncConfig,
) -> TickOutcome {
    let active = active_index(timeline, position);
    if active == previous || timeline.is_empty() {
        return TickOutcome {
            active_index: active,
            layout: Vec::new(),
        };
    }

    let layout = compute_layout(timeline.len(), active, staggered, metrics, config);
    TickOutcome {
        active_index: active,
        layout,
    }
}

/// Layout for `len` lines around `active`.
///
/// Without an active line the list rests on line 0 and nothing is emphasized.
pub fn compute_layout(
    len: usize,
    active: Option<usize>,
    staggered: bool,
    metrics: &dyn LineMetrics,
    config: &SyncConfig,
) -> Vec<LayoutInstruction> {
    if len == 0 {
        return Vec::new();
    }
    let anchor = active.unwrap_or(0).min(len - 1);

    // tops[i]: distance from line 0's top edge to line i's top edge
    let mut tops = Vec::with_capacity(len);
    let mut acc = 0.0_f32;
    for i in 0..len {
        tops.push(acc);
        let h = metrics.height_of(i);
        acc += if h.is_finite() { h.max(0.0) } else { 0.0 } + config.line_spacing;
    }
    let anchor_top = tops[anchor];

    tops.iter()
        .enumerate()
        .map(|(i, top)| {
            let distance = i.abs_diff(anchor);
            LayoutInstruction {
                index: i,
                vertical_offset: top - anchor_top + config.anchor_offset,
                blur_radius: distance as f32,
                emphasize: active == Some(i),
                transition_delay_ms: if staggered {
                    stagger_delay(distance, config)
                } else {
                    0
                },
            }
        })
        .collect()
}

/// Delay for a line `distance` lines away from the active one.
fn stagger_delay(distance: usize, config: &SyncConfig) -> u32 {
    let n = distance.saturating_add(1);
    let n = if n > config.stagger_cap { 0 } else { n };
    u32::try_from(n)
        .unwrap_or(0)
        .saturating_mul(config.stagger_step_ms)
}

/// Stateful wrapper owning the timeline and the last active index.
///
/// One engine lives as long as the player view; `load_track` swaps the
/// timeline and `on_tick` is the only thing that advances state.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    config: SyncConfig,
    timeline: Timeline,
    previous_active: Option<usize>,
    /// Set once a tick has laid out the current timeline
    laid_out: bool,
}

impl SyncEngine {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            timeline: Timeline::empty(),
            previous_active: None,
            laid_out: false,
        }
    }

    /// Replace the timeline and return its resting layout (line 0 anchored,
    /// nothing emphasized, no delays).
    pub fn load_track(
        &mut self,
        timeline: Timeline,
        metrics: &dyn LineMetrics,
    ) -> Vec<LayoutInstruction> {
        self.timeline = timeline;
        self.previous_active = None;
        self.laid_out = false;
        compute_layout(self.timeline.len(), None, false, metrics, &self.config)
    }

    pub fn on_tick(&mut self, position: f64, metrics: &dyn LineMetrics) -> TickOutcome {
        let outcome = on_tick(
            position,
            &self.timeline,
            self.previous_active,
            self.laid_out,
            metrics,
            &self.config,
        );
        self.previous_active = outcome.active_index;
        self.laid_out |= !outcome.layout.is_empty();
        outcome
    }

    /// Full layout for the current state, e.g. after the viewport resized.
    pub fn relayout(&mut self, config: SyncConfig, metrics: &dyn LineMetrics) -> Vec<LayoutInstruction> {
        self.config = config;
        compute_layout(
            self.timeline.len(),
            self.previous_active,
            false,
            metrics,
            &self.config,
        )
    }

    #[cfg(test)]
    pub fn active_index(&self) -> Option<usize> {
        self.previous_active
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::parser::LyricLine;

    /// Every line has the same height.
    struct UniformMetrics(f32);

    impl LineMetrics for UniformMetrics {
        fn height_of(&self, _index: usize) -> f32 {
            self.0
        }
    }

    fn abc() -> Timeline {
        vec![
            LyricLine::new(0.0, "a"),
            LyricLine::new(5.0, "b"),
            LyricLine::new(10.0, "c"),
        ]
        .into_iter()
        .collect()
    }

    fn numbered(n: usize) -> Timeline {
        (0..n)
            .map(|i| LyricLine::new(i as f64, format!("line {i}")))
            .collect()
    }

    #[test]
    fn test_active_index() {
        let t = abc();
        assert_eq!(active_index(&t, 0.0), Some(0));
        assert_eq!(active_index(&t, 4.999), Some(0));
        assert_eq!(active_index(&t, 5.0), Some(1));
        assert_eq!(active_index(&t, 10.5), Some(2));
        assert_eq!(active_index(&t, -1.0), None);
    }

    #[test]
    fn test_active_index_non_finite() {
        let t = abc();
        assert_eq!(active_index(&t, f64::NAN), None);
        assert_eq!(active_index(&t, f64::INFINITY), None);
        assert_eq!(active_index(&t, f64::NEG_INFINITY), None);
        assert_eq!(active_index(&Timeline::empty(), 3.0), None);
    }

    #[test]
    fn test_active_index_ties_pick_last() {
        let t: Timeline = vec![LyricLine::new(1.0, "x"), LyricLine::new(1.0, "y")]
            .into_iter()
            .collect();
        assert_eq!(active_index(&t, 1.0), Some(1));
    }

    #[test]
    fn test_no_relayout_when_unchanged() {
        let mut engine = SyncEngine::default();
        let metrics = UniformMetrics(10.0);
        engine.load_track(abc(), &metrics);

        let first = engine.on_tick(6.0, &metrics);
        assert_eq!(first.active_index, Some(1));
        assert_eq!(first.layout.len(), 3);

        let second = engine.on_tick(6.0, &metrics);
        assert_eq!(second.active_index, Some(1));
        assert!(second.layout.is_empty());

        let still = engine.on_tick(9.9, &metrics);
        assert!(still.layout.is_empty());
    }

    #[test]
    fn test_backward_seek_jumps_directly() {
        let mut engine = SyncEngine::default();
        let metrics = UniformMetrics(10.0);
        engine.load_track(abc(), &metrics);

        assert_eq!(engine.on_tick(12.0, &metrics).active_index, Some(2));
        let seek = engine.on_tick(0.0, &metrics);
        assert_eq!(seek.active_index, Some(0));
        assert!(seek.layout[0].emphasize);
        assert!(!seek.layout[1].emphasize);
    }

    #[test]
    fn test_vertical_offsets() {
        let heights = [10.0_f32, 30.0, 20.0, 40.0];
        let metrics = |i: usize| heights[i];
        let config = SyncConfig {
            line_spacing: 5.0,
            anchor_offset: 100.0,
            ..SyncConfig::default()
        };
        let layout = compute_layout(4, Some(1), true, &metrics, &config);
        let offsets: Vec<f32> = layout.iter().map(|l| l.vertical_offset).collect();
        // line 0 sits one (10 + 5) above, line 2 one (30 + 5) below, line 3 a further (20 + 5)
        assert_eq!(offsets, vec![85.0, 100.0, 135.0, 160.0]);
    }

    #[test]
    fn test_blur_and_emphasis() {
        let layout = compute_layout(5, Some(2), true, &UniformMetrics(1.0), &SyncConfig::default());
        let blur: Vec<f32> = layout.iter().map(|l| l.blur_radius).collect();
        assert_eq!(blur, vec![2.0, 1.0, 0.0, 1.0, 2.0]);
        let emphasized: Vec<usize> = layout.iter().filter(|l| l.emphasize).map(|l| l.index).collect();
        assert_eq!(emphasized, vec![2]);
    }

    #[test]
    fn test_stagger_cap() {
        let mut engine = SyncEngine::default();
        let metrics = UniformMetrics(10.0);
        engine.load_track(numbered(30), &metrics);
        // establish a previous line so the stagger is active
        engine.on_tick(1.0, &metrics);
        let outcome = engine.on_tick(0.0, &metrics);
        assert_eq!(outcome.active_index, Some(0));

        let delay = |i: usize| outcome.layout[i].transition_delay_ms;
        assert_eq!(delay(0), 60);
        assert_eq!(delay(1), 120);
        assert_eq!(delay(9), 600);
        assert_eq!(delay(10), 0);
        assert_eq!(delay(25), 0);
    }

    #[test]
    fn test_first_pass_not_staggered() {
        let mut engine = SyncEngine::default();
        let metrics = UniformMetrics(10.0);
        let resting = engine.load_track(numbered(5), &metrics);
        assert!(resting.iter().all(|l| l.transition_delay_ms == 0 && !l.emphasize));

        let first = engine.on_tick(2.5, &metrics);
        assert_eq!(first.active_index, Some(2));
        assert!(first.layout.iter().all(|l| l.transition_delay_ms == 0));
        assert!(first.layout[2].emphasize);

        let next = engine.on_tick(3.0, &metrics);
        assert!(next.layout.iter().any(|l| l.transition_delay_ms > 0));
    }

    #[test]
    fn test_reentry_after_seek_before_first_line_is_staggered() {
        let timeline: Timeline = (0..5)
            .map(|i| LyricLine::new(2.0 + i as f64, format!("line {i}")))
            .collect();
        let mut engine = SyncEngine::default();
        let metrics = UniformMetrics(1.0);
        engine.load_track(timeline, &metrics);

        engine.on_tick(3.0, &metrics);
        let back = engine.on_tick(0.0, &metrics);
        assert_eq!(back.active_index, None);
        let delays: Vec<u32> = back.layout.iter().map(|l| l.transition_delay_ms).collect();
        assert_eq!(delays, vec![60, 120, 180, 240, 300]);

        let again = engine.on_tick(4.0, &metrics);
        assert_eq!(again.active_index, Some(2));
        let delays: Vec<u32> = again.layout.iter().map(|l| l.transition_delay_ms).collect();
        assert_eq!(delays, vec![180, 120, 60, 120, 180]);
    }

    #[test]
    fn test_load_track_restores_immediate_first_pass() {
        let mut engine = SyncEngine::default();
        let metrics = UniformMetrics(1.0);
        engine.load_track(numbered(5), &metrics);
        engine.on_tick(1.0, &metrics);
        engine.on_tick(3.0, &metrics);

        engine.load_track(numbered(5), &metrics);
        let first = engine.on_tick(3.0, &metrics);
        assert!(first.layout.iter().all(|l| l.transition_delay_ms == 0));
    }

    #[test]
    fn test_before_first_line_does_not_count_as_laid_out() {
        let timeline: Timeline = vec![LyricLine::new(4.0, "late"), LyricLine::new(8.0, "later")]
            .into_iter()
            .collect();
        let mut engine = SyncEngine::default();
        let metrics = UniformMetrics(1.0);
        engine.load_track(timeline, &metrics);

        assert!(engine.on_tick(1.0, &metrics).layout.is_empty());
        let first = engine.on_tick(5.0, &metrics);
        assert!(first.layout.iter().all(|l| l.transition_delay_ms == 0));
    }

    #[test]
    fn test_seek_before_first_line_rests_on_line_zero() {
        let timeline: Timeline = vec![LyricLine::new(4.0, "late"), LyricLine::new(8.0, "later")]
            .into_iter()
            .collect();
        let mut engine = SyncEngine::default();
        let metrics = UniformMetrics(10.0);
        engine.load_track(timeline, &metrics);

        assert!(engine.on_tick(1.0, &metrics).layout.is_empty());
        engine.on_tick(9.0, &metrics);
        let back = engine.on_tick(1.0, &metrics);
        assert_eq!(back.active_index, None);
        assert_eq!(back.layout.len(), 2);
        assert!(back.layout.iter().all(|l| !l.emphasize));
        assert_eq!(back.layout[0].blur_radius, 0.0);
    }

    #[test]
    fn test_empty_timeline_is_noop() {
        let mut engine = SyncEngine::default();
        let metrics = UniformMetrics(10.0);
        assert!(engine.load_track(Timeline::empty(), &metrics).is_empty());
        for pos in [0.0, 5.0, -3.0, f64::NAN, f64::INFINITY] {
            let outcome = engine.on_tick(pos, &metrics);
            assert_eq!(outcome, TickOutcome::default());
        }
    }

    #[test]
    fn test_bad_heights_do_not_poison_offsets() {
        let metrics = |i: usize| if i == 1 { f32::NAN } else { 10.0 };
        let layout = compute_layout(3, Some(0), false, &metrics, &SyncConfig::default());
        assert!(layout.iter().all(|l| l.vertical_offset.is_finite()));
    }

    #[test]
    fn test_load_track_resets_previous() {
        let mut engine = SyncEngine::default();
        let metrics = UniformMetrics(1.0);
        engine.load_track(abc(), &metrics);
        engine.on_tick(6.0, &metrics);
        assert_eq!(engine.active_index(), Some(1));

        engine.load_track(abc(), &metrics);
        assert_eq!(engine.active_index(), None);
        // same position as before still relayouts on the fresh timeline
        assert_eq!(engine.on_tick(6.0, &metrics).layout.len(), 3);
    }

    #[test]
    fn test_anchored_config() {
        let config = SyncConfig::default().anchored(35.0, 3.5);
        assert_eq!(config.anchor_offset, 10.0);
        assert_eq!(SyncConfig::default().anchored(35.0, 0.0).anchor_offset, 0.0);
    }
}
