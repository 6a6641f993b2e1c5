//! Shared UI icons and emojis.

use console::Emoji;

use crate::phase::StageType;
use crate::payload::{Severity, TaskStatus};

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "[SKIP]");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "[T]");
pub static MEMORY: Emoji<'_, '_> = Emoji("🧠 ", "[MEM]");

// Stage indicators
pub static PLANNER: Emoji<'_, '_> = Emoji("🗺️  ", "[P]");
pub static EXECUTOR: Emoji<'_, '_> = Emoji("⚙️  ", "[E]");
pub static CRITIC: Emoji<'_, '_> = Emoji("🔍 ", "[C]");
pub static REFINER: Emoji<'_, '_> = Emoji("🪄 ", "[R]");

// Task and critique indicators
pub static PENDING: Emoji<'_, '_> = Emoji("○ ", "[ ]");
pub static ACTIVE: Emoji<'_, '_> = Emoji("▶️  ", "[>]");
pub static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "[!]");
pub static CRITICAL: Emoji<'_, '_> = Emoji("🚨 ", "[!!]");

pub fn stage_icon(stage: StageType) -> &'static Emoji<'static, 'static> {
    match stage {
        StageType::Planner => &PLANNER,
        StageType::Executor => &EXECUTOR,
        StageType::Critic => &CRITIC,
        StageType::Refiner => &REFINER,
    }
}

pub fn task_icon(status: TaskStatus) -> &'static Emoji<'static, 'static> {
    match status {
        TaskStatus::Pending => &PENDING,
        TaskStatus::Active => &ACTIVE,
        TaskStatus::Completed => &CHECK,
    }
}

pub fn severity_icon(severity: Severity) -> &'static Emoji<'static, 'static> {
    match severity {
        Severity::Pass => &CHECK,
        Severity::Warning => &WARNING,
        Severity::Critical => &CRITICAL,
    }
}
