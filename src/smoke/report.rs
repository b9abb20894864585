//! Per-step outcomes and the final summary printed by the smoke test.

use std::fmt;

/// The fixed steps of a smoke-test run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Connect,
    CreateNode,
    ReadNode,
    RunTransaction,
    Cleanup,
}

impl Step {
    /// Human-readable name used in the summary.
    pub fn label(self) -> &'static str {
        match self {
            Step::Connect => "Connect",
            Step::CreateNode => "Create node",
            Step::ReadNode => "Read node",
            Step::RunTransaction => "Run transaction",
            Step::Cleanup => "Clean up test data",
        }
    }
}

/// Outcome of one step plus the diagnostic line printed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub step: Step,
    pub passed: bool,
    pub detail: String,
}

impl StepResult {
    pub fn pass(step: Step, detail: impl Into<String>) -> Self {
        Self {
            step,
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn fail(step: Step, detail: impl Into<String>) -> Self {
        Self {
            step,
            passed: false,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.passed { "✅" } else { "❌" };
        write!(f, "{mark} {}", self.detail)
    }
}

/// Everything a run produced.
///
/// `steps` is empty when the connection step failed, since nothing else runs
/// in that case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeReport {
    pub test_id: String,
    pub connect: StepResult,
    pub steps: Vec<StepResult>,
}

impl SmokeReport {
    /// True only when the connection and every later step passed.
    pub fn passed(&self) -> bool {
        self.connect.passed && self.steps.iter().all(|s| s.passed)
    }

    /// Process exit code for scripts: 0 on full success, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.passed() {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for SmokeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.connect.passed {
            return writeln!(
                f,
                "\n❌ TEST FAILED: could not establish a connection. Aborting tests."
            );
        }

        writeln!(f, "\n📊 TEST SUMMARY:")?;
        for step in &self.steps {
            let status = if step.passed { "✅ PASSED" } else { "❌ FAILED" };
            writeln!(f, "{status} - {}", step.step.label())?;
        }

        let verdict = if self.passed() {
            "🎉 ALL TESTS PASSED"
        } else {
            "❌ SOME TESTS FAILED"
        };
        writeln!(f, "\n{verdict}")
    }
}
