//! # Kernel Tests
//!
//! Scheduling, delta-cycle settling, clocks, and the observer contract.

use pretty_assertions::assert_eq;

use probebench_core::common::{HierPath, SimError, SimTime, Value};
use probebench_core::sim::{Design, EvalCtx, Observer, SignalId, SignalKind, Simulator, Step, Unit};

/// `y = !a`, one delta after `a` changes.
struct Inverter {
    path: HierPath,
    a: SignalId,
    y: SignalId,
}

impl Unit for Inverter {
    fn path(&self) -> &HierPath {
        &self.path
    }

    fn evaluate(&mut self, ctx: &mut EvalCtx<'_>) {
        if ctx.changed(self.a) {
            match ctx.bit(self.a) {
                Some(b) => ctx.drive(self.y, !b),
                None => ctx.drive(self.y, Value::X),
            }
        }
    }
}

/// Drives its own input inverted forever.
struct Loop {
    path: HierPath,
    a: SignalId,
}

impl Unit for Loop {
    fn path(&self) -> &HierPath {
        &self.path
    }

    fn evaluate(&mut self, ctx: &mut EvalCtx<'_>) {
        if let Some(b) = ctx.bit(self.a) {
            ctx.drive(self.a, !b);
        }
    }
}

/// Records `(time, a, y, a rose)` once per step.
#[derive(Default)]
struct Recorder {
    a: Option<SignalId>,
    y: Option<SignalId>,
    seen: Vec<(SimTime, Value, Value, bool)>,
}

impl Observer for Recorder {
    fn on_step(&mut self, step: &mut Step<'_>) -> Result<(), SimError> {
        let (Some(a), Some(y)) = (self.a, self.y) else {
            return Ok(());
        };
        self.seen
            .push((step.time(), step.value(a).clone(), step.value(y).clone(), step.rose(a)));
        Ok(())
    }
}

fn inverter_sim() -> (Simulator, SignalId, SignalId) {
    let mut design = Design::new();
    let top = design.add_unit("top").unwrap();
    let a = design.declare(&top, "a", SignalKind::WIRE).unwrap();
    let y = design.declare(&top, "y", SignalKind::WIRE).unwrap();
    let mut sim = Simulator::new(design);
    sim.add_unit(Box::new(Inverter { path: top, a, y }));
    (sim, a, y)
}

#[test]
fn observer_sees_settled_values_once_per_step() {
    let (mut sim, a, y) = inverter_sim();
    sim.schedule(10, a, true).unwrap();
    sim.schedule(20, a, false).unwrap();

    let mut rec = Recorder {
        a: Some(a),
        y: Some(y),
        ..Recorder::default()
    };
    sim.run_until(100, &mut rec).unwrap();

    assert_eq!(
        rec.seen,
        vec![
            (10, Value::bit(true), Value::bit(false), true),
            (20, Value::bit(false), Value::bit(true), false),
        ]
    );
    assert_eq!(sim.now(), 100);
    assert_eq!(sim.steps(), 2);
}

#[test]
fn scheduling_in_the_past_fails() {
    let (mut sim, a, _) = inverter_sim();
    sim.run_until(50, &mut ()).unwrap();
    assert_eq!(
        sim.schedule(49, a, true),
        Err(SimError::ScheduleInPast { at: 49, now: 50 })
    );
    assert!(sim.schedule_in(0, a, true).is_ok());
}

#[test]
fn value_wider_than_net_is_rejected() {
    let (mut sim, a, _) = inverter_sim();
    assert!(matches!(
        sim.schedule(0, a, 2_u64),
        Err(SimError::ValueMismatch { .. })
    ));
}

#[test]
fn clock_toggles_every_half_period() {
    let mut design = Design::new();
    let top = design.add_unit("top").unwrap();
    let clk = design.declare(&top, "clk", SignalKind::WIRE).unwrap();
    let mut sim = Simulator::new(design);
    sim.add_clock(clk, 1000, 0).unwrap();

    let mut levels = Vec::new();
    for t in (0..=3000).step_by(500) {
        sim.run_until(t, &mut ()).unwrap();
        levels.push(sim.value(clk).as_bit());
    }
    assert_eq!(
        levels,
        vec![
            Some(false),
            Some(true),
            Some(false),
            Some(true),
            Some(false),
            Some(true),
            Some(false)
        ]
    );
}

#[test]
fn combinational_loop_hits_delta_limit() {
    let mut design = Design::new();
    let top = design.add_unit("top").unwrap();
    let a = design.declare(&top, "a", SignalKind::WIRE).unwrap();
    let mut sim = Simulator::new(design).with_delta_limit(8);
    sim.add_unit(Box::new(Loop { path: top, a }));
    sim.schedule(5, a, true).unwrap();
    assert_eq!(
        sim.run_until(5, &mut ()),
        Err(SimError::DeltaOverflow { time: 5, limit: 8 })
    );
}

/// Tries to annotate a design net.
struct Vandal(SignalId);

impl Observer for Vandal {
    fn on_step(&mut self, step: &mut Step<'_>) -> Result<(), SimError> {
        step.annotate(self.0, true)
    }
}

#[test]
fn observers_cannot_write_design_nets() {
    let (mut sim, a, y) = inverter_sim();
    sim.schedule(1, a, true).unwrap();
    let err = sim.run_until(1, &mut Vandal(y)).unwrap_err();
    assert_eq!(err, SimError::NotAnnotation("top.y".to_string()));
}

/// Writes a label on every step.
struct Labeler(SignalId);

impl Observer for Labeler {
    fn on_step(&mut self, step: &mut Step<'_>) -> Result<(), SimError> {
        let label = format!("t={}", step.time());
        step.annotate(self.0, label.as_str())
    }
}

#[test]
fn annotations_are_visible_after_the_step() {
    let mut design = Design::new();
    let top = design.add_unit("top").unwrap();
    let probes = design.add_unit("top.probes").unwrap();
    let a = design.declare(&top, "a", SignalKind::WIRE).unwrap();
    let info = design
        .declare_annotation(&probes, "info", SignalKind::Text)
        .unwrap();
    let mut sim = Simulator::new(design);
    sim.schedule(7, a, false).unwrap();
    sim.run_until(10, &mut Labeler(info)).unwrap();
    assert_eq!(sim.value(info).as_text(), Some("t=7"));
}
