//! VCD waveform capture.
//!
//! Writes the probe namespace (scope `probes`) and the testbench annotation
//! nets (scope `tb`) as a value change dump. Aliases are emitted from their
//! source nets, so an alias and its source can never disagree in the dump.
//! Several aliases of one net share the net's changes.
//!
//! Text annotations use the `string` variable type understood by GTKWave;
//! spaces are replaced by underscores.

use std::collections::BTreeMap;
use std::io::{self, Write};

use tracing::error;

use crate::common::{SimError, SimTime, Value, Width};
use crate::probe::ProbeNamespace;
use crate::sim::{Design, Observer, SignalId, SignalKind, Step};

#[derive(Debug, Clone)]
struct Var {
    code: String,
    width: Width,
}

impl Var {
    fn change(&self, value: &Value) -> String {
        match (self.width, value) {
            (0, Value::Text(s)) if s.is_empty() => format!("s- {}", self.code),
            (0, Value::Text(s)) => format!("s{} {}", s.replace(' ', "_"), self.code),
            (0, _) => format!("s- {}", self.code),
            (1, v) => match v.as_bit() {
                Some(true) => format!("1{}", self.code),
                Some(false) => format!("0{}", self.code),
                None => format!("x{}", self.code),
            },
            (w, v) => format!("b{} {}", v.to_bin(w), self.code),
        }
    }
}

/// Short identifier `n` in VCD's printable alphabet (`!` to `~`).
fn short_code(mut n: usize) -> String {
    let mut code = String::new();
    loop {
        code.push(char::from(b'!' + (n % 94) as u8));
        n /= 94;
        if n == 0 {
            break;
        }
        n -= 1;
    }
    code
}

/// VCD writer observing the kernel.
///
/// The first I/O error stops the capture; it is reported by [`finish`](Self::finish).
#[derive(Debug)]
pub struct VcdWriter<W: Write> {
    out: W,
    vars: BTreeMap<SignalId, Vec<Var>>,
    error: Option<io::Error>,
    last_time: Option<SimTime>,
}

impl<W: Write> VcdWriter<W> {
    /// Writes the header and the initial values at time `now`.
    ///
    /// `annotations` lists the testbench nets to dump under `tb`.
    pub fn new(
        mut out: W,
        design: &Design,
        probes: &ProbeNamespace,
        annotations: &[(&str, SignalId)],
        now: SimTime,
    ) -> io::Result<Self> {
        let mut vars: BTreeMap<SignalId, Vec<Var>> = BTreeMap::new();
        let mut next = 0;
        let mut declare = |id: SignalId, width: Width| {
            let var = Var {
                code: short_code(next),
                width,
            };
            next += 1;
            vars.entry(id).or_default().push(var.clone());
            var
        };

        writeln!(out, "$version probebench {} $end", env!("CARGO_PKG_VERSION"))?;
        writeln!(out, "$timescale 1ps $end")?;

        writeln!(out, "$scope module probes $end")?;
        for alias in probes.iter() {
            let var = declare(alias.source(), alias.width());
            writeln!(
                out,
                "$var wire {} {} {} $end",
                alias.width(),
                var.code,
                alias.name()
            )?;
        }
        writeln!(out, "$upscope $end")?;

        writeln!(out, "$scope module tb $end")?;
        for (name, id) in annotations {
            match design.store().kind(*id) {
                SignalKind::Text => {
                    let var = declare(*id, 0);
                    writeln!(out, "$var string 1 {} {name} $end", var.code)?;
                }
                SignalKind::Logic(w) => {
                    let var = declare(*id, w);
                    writeln!(out, "$var wire {w} {} {name} $end", var.code)?;
                }
            }
        }
        writeln!(out, "$upscope $end")?;
        writeln!(out, "$enddefinitions $end")?;

        writeln!(out, "#{now}")?;
        writeln!(out, "$dumpvars")?;
        for (id, list) in &vars {
            let value = design.store().get(*id);
            for var in list {
                writeln!(out, "{}", var.change(value))?;
            }
        }
        writeln!(out, "$end")?;

        Ok(Self {
            out,
            vars,
            error: None,
            last_time: Some(now),
        })
    }

    /// Number of dumped variables.
    pub fn var_count(&self) -> usize {
        self.vars.values().map(Vec::len).sum()
    }

    /// Flushes and returns the sink, or the first I/O error.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_step(&mut self, step: &Step<'_>) -> io::Result<()> {
        let mut lines = Vec::new();
        for (id, old) in step.changes() {
            let Some(list) = self.vars.get(&id) else {
                continue;
            };
            let value = step.value(id);
            if value == old {
                continue;
            }
            lines.extend(list.iter().map(|v| v.change(value)));
        }
        if lines.is_empty() {
            return Ok(());
        }
        if self.last_time != Some(step.time()) {
            writeln!(self.out, "#{}", step.time())?;
            self.last_time = Some(step.time());
        }
        for line in lines {
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }
}

impl<W: Write> Observer for VcdWriter<W> {
    fn on_step(&mut self, step: &mut Step<'_>) -> Result<(), SimError> {
        if self.error.is_none() {
            if let Err(e) = self.write_step(step) {
                error!("waveform capture stopped: {e}");
                self.error = Some(e);
            }
        }
        Ok(())
    }
}
