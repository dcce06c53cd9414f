//! Growth command implementation.

use super::format_bytes;
use audiofs_vfile::growth;
use serde::Serialize;

/// Steps listed before the schedule is elided.
const MAX_LISTED_STEPS: usize = 32;

/// Size-class schedule for one growth request.
#[derive(Debug, Serialize)]
pub struct GrowthPlan {
    /// Starting capacity.
    pub from: u64,
    /// Requested capacity.
    pub required: u64,
    /// Final capacity after growth.
    pub target: u64,
    /// Leading size classes visited on the way.
    pub steps: Vec<u64>,
    /// True if more steps exist than are listed.
    pub truncated: bool,
}

/// Computes the schedule from `from` to `required`.
pub fn plan(from: u64, required: u64) -> Result<GrowthPlan, Box<dyn std::error::Error>> {
    let target = growth::target_capacity(from, required)
        .ok_or_else(|| format!("capacity for {required} bytes cannot be represented"))?;
    let steps = growth::schedule(from, required, MAX_LISTED_STEPS);
    let truncated = steps.last().is_some_and(|last| *last < target);

    Ok(GrowthPlan {
        from,
        required,
        target,
        steps,
        truncated,
    })
}

/// Runs the growth command.
pub fn run(required: u64, from: u64, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let plan = plan(from, required)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        _ => {
            println!(
                "Growing from {} to at least {}",
                format_bytes(plan.from),
                format_bytes(plan.required)
            );
            println!();
            if plan.steps.is_empty() {
                println!("No growth needed");
            }
            for (i, step) in plan.steps.iter().enumerate() {
                println!("  {:>3}. {:>12} ({})", i + 1, step, format_bytes(*step));
            }
            if plan.truncated {
                println!("  ...");
            }
            println!();
            println!("Final capacity: {} ({})", plan.target, format_bytes(plan.target));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_across_bands() {
        let plan = plan(1024, 40 * 1024 * 1024).unwrap();
        assert_eq!(plan.target, 48 * 1024 * 1024);
        assert_eq!(plan.steps.len(), 5);
        assert!(!plan.truncated);
    }

    #[test]
    fn plan_already_large_enough() {
        let plan = plan(65536, 100).unwrap();
        assert_eq!(plan.target, 65536);
        assert!(plan.steps.is_empty());
        assert!(!plan.truncated);
    }

    #[test]
    fn plan_long_schedule_is_truncated() {
        let plan = plan(0, 1 << 40).unwrap();
        assert_eq!(plan.steps.len(), MAX_LISTED_STEPS);
        assert!(plan.truncated);
        assert_eq!(plan.target, 1 << 40);
    }

    #[test]
    fn plan_unrepresentable_fails() {
        assert!(plan(0, u64::MAX).is_err());
    }
}
