use routing::{Maneuver, Step};

/// A formatted instruction for one step of the active route.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub step_index: usize,
    pub text: String,
    pub maneuver: Maneuver,
}

impl Instruction {
    #[must_use]
    pub fn for_step(step_index: usize, step: &Step) -> Self {
        Self { step_index, text: format_instruction(step), maneuver: step.maneuver.clone() }
    }
}

/// Render the spoken/displayed text for a step, e.g. "Turn left in 120 meters".
#[must_use]
pub fn format_instruction(step: &Step) -> String {
    if step.maneuver.kind.is_empty() && step.instruction.is_empty() {
        return "Continue straight".to_string();
    }

    let text = if step.instruction.is_empty() { "Continue" } else { step.instruction.as_str() };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let meters = step.distance_meters.max(0.0).round() as u64;

    if meters > 0 { format!("{text} in {meters} meters") } else { text.to_string() }
}
