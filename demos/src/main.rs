//! Locomotion policy demos
//!
//! Runs the recurrent mixture policy against a synthetic 20-joint robot on
//! the NdArray backend.
//!
//! ```bash
//! # Sample a rollout, then replay it through the PPO statistics scan
//! cargo run --release -p demos -- rollout [seed]
//!
//! # Same rollout, per-step statistics table
//! cargo run --release -p demos -- stats [seed]
//!
//! # Default model configuration as JSON
//! cargo run --release -p demos -- config
//! ```

mod toy_robot;

use std::error::Error;

use burn::backend::NdArray;
use locomotion_policy::{
    fold_trajectory_with_key, ModelConfig, PolicyError, RestPose, RngKey, TrajectoryStatistics,
};

use toy_robot::{collect, layouts, ToyRobot, NUM_JOINTS};

type B = NdArray<f32>;
type DemoResult<T> = Result<T, Box<dyn Error>>;

const NUM_ENVS: usize = 8;
const ROLLOUT_STEPS: usize = 32;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let seed = args
        .get(2)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    if args.len() > 1 {
        let result = match args[1].as_str() {
            "rollout" => rollout(seed, false),
            "stats" => rollout(seed, true),
            "config" => print_config(),
            _ => {
                println!("Unknown command: {}", args[1]);
                println!();
                print_usage();
                Ok(())
            }
        };
        if let Err(err) = result {
            eprintln!("error: {}", err);
            std::process::exit(1);
        }
    } else {
        print_usage();
    }
}

fn model_config() -> ModelConfig {
    let (actor, critic) = layouts();
    ModelConfig::new(actor, critic, RestPose::zeros(NUM_JOINTS))
        .with_hidden_size(64)
        .with_depth(2)
}

fn rollout(seed: u64, per_step: bool) -> DemoResult<()> {
    let device = Default::default();
    let (model_key, rollout_key, scan_key) = {
        let keys = RngKey::new(seed).split_n(3);
        (keys[0], keys[1], keys[2])
    };

    let config = model_config();
    let model = config.init::<B>(model_key, &device)?;
    println!(
        "Model: actor {} inputs, critic {} inputs, {} joints x {} mixtures, GRU {}x{}",
        config.actor_input_size,
        config.critic_input_size,
        config.num_actions,
        config.num_mixtures,
        config.depth,
        config.hidden_size
    );

    let mut robot = ToyRobot::new(NUM_ENVS, config.rest_pose.angles().to_vec(), [0.5, 0.0]);
    let trajectory = collect(&model, &mut robot, ROLLOUT_STEPS, rollout_key, &device)?;
    println!(
        "Collected {} steps x {} envs, {} episode ends",
        trajectory.len(),
        NUM_ENVS,
        trajectory.num_dones()
    );

    let start = model.initial_carry(NUM_ENVS, &device);
    let (_, stats) = fold_trajectory_with_key(&model, start, &trajectory, scan_key)?;

    if per_step {
        print_table(&stats)?;
    }
    print_summary(&stats)
}

fn host<const D: usize>(tensor: burn::tensor::Tensor<B, D>) -> Result<Vec<f32>, PolicyError> {
    Ok(tensor.into_data().to_vec::<f32>()?)
}

fn print_table(stats: &TrajectoryStatistics<B>) -> DemoResult<()> {
    let log_probs = host(stats.joint_log_probs())?;
    let values = host(stats.values.clone())?;
    let entropy = host(stats.entropy.clone())?;

    println!();
    println!("{:>5} {:>14} {:>12} {:>12}", "step", "mean log-prob", "mean value", "entropy");
    println!("{}", "-".repeat(46));
    for t in 0..stats.len() {
        let row = t * NUM_ENVS..(t + 1) * NUM_ENVS;
        println!(
            "{:>5} {:>14.3} {:>12.4} {:>12.3}",
            t,
            mean(&log_probs[row.clone()]),
            mean(&values[row.clone()]),
            mean(&entropy[row])
        );
    }
    println!();
    Ok(())
}

fn print_summary(stats: &TrajectoryStatistics<B>) -> DemoResult<()> {
    let log_probs = host(stats.joint_log_probs())?;
    let values = host(stats.values.clone())?;
    println!(
        "Scan: mean joint log-prob {:.3}, mean value {:.4}",
        mean(&log_probs),
        mean(&values)
    );
    Ok(())
}

fn mean(xs: &[f32]) -> f32 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f32>() / xs.len() as f32
}

fn print_config() -> DemoResult<()> {
    println!("{}", config_json(&model_config())?);
    Ok(())
}

/// Validated configuration as pretty-printed JSON.
fn config_json(config: &ModelConfig) -> DemoResult<String> {
    config.validate()?;
    Ok(serde_json::to_string_pretty(config)?)
}

fn print_usage() {
    println!("Usage: cargo run --release -p demos -- <command> [seed]");
    println!();
    println!("  rollout    Sample {} steps on {} toy robots, then run the PPO scan", ROLLOUT_STEPS, NUM_ENVS);
    println!("  stats      Same as rollout, with a per-step statistics table");
    println!("  config     Print the model configuration as JSON");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_json_round_trips_widths() {
        let json = config_json(&model_config()).unwrap();
        let parsed: ModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, model_config());
    }

    #[test]
    fn test_config_json_reports_invalid_config() {
        let err = config_json(&model_config().with_depth(0)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PolicyError>(),
            Some(&PolicyError::InvalidCount { field: "depth", value: 0 })
        );
    }
}
