//! Romi control daemon
//!
//! Wires the control stack to the simulated rig: builds the devices, the
//! signal bus, and the scheduler, then runs the mission until Ctrl-C. A
//! background thread advances the simulated world in real time and presses
//! the virtual user button once the IMU reports calibrated.

use romi_control::config::RobotConfig;
use romi_control::drivers::{share_imu, OperatingMode};
use romi_control::error::Result;
use romi_control::scheduler::Scheduler;
use romi_control::signals::SignalBus;
use romi_control::sim::{SimEncoder, SimImu, SimLineSensor, SimMotor, SimWorld};
use romi_control::tasks::{
    BodyController, MissionPlanner, Navigator, WheelController, WheelSide,
};
use romi_control::{encoder::Encoder, line::LinePosition};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Parse config path from command line arguments.
///
/// Supports:
/// - `romi-control <path>` (positional)
/// - `romi-control --config <path>` (flag-based)
/// - `romi-control -c <path>` (short flag)
///
/// Defaults to `romi.toml` in the working directory if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    "romi.toml".to_string()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = parse_config_path();
    let config = if std::path::Path::new(&config_path).exists() {
        log::info!("Using config: {}", config_path);
        RobotConfig::load(&config_path)?
    } else {
        log::info!("No config at {}, using chassis defaults", config_path);
        RobotConfig::default()
    };

    let world = SimWorld::new(&config, 0);
    let bus = SignalBus::new();

    let imu = share_imu(Box::new(SimImu::new(world.clone())));
    imu.lock().set_mode(OperatingMode::Ndof)?;
    let line = LinePosition::new(Box::new(SimLineSensor::new(world.clone())));

    let mut scheduler = Scheduler::new();
    scheduler.add_task(
        Box::new(MissionPlanner::new(
            Arc::clone(&bus),
            Arc::clone(&imu),
            config.clone(),
        )),
        4,
        150_000,
    );
    scheduler.add_task(
        Box::new(Navigator::new(Arc::clone(&bus), line, &config)),
        3,
        25_000,
    );
    scheduler.add_task(
        Box::new(BodyController::new(Arc::clone(&bus), imu, &config)),
        1,
        5_000,
    );
    for side in [WheelSide::Left, WheelSide::Right] {
        let encoder = Encoder::new(Box::new(SimEncoder::new(world.clone(), side)), 0);
        scheduler.add_task(
            Box::new(WheelController::new(
                side,
                Box::new(SimMotor::new(world.clone(), side)),
                encoder,
                Arc::clone(&bus),
                &config,
            )),
            1,
            2_000,
        );
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| romi_control::Error::Config(format!("Error setting Ctrl-C handler: {}", e)))?;

    // Advance the simulated world in real time and press the virtual user
    // button once calibration completes
    let sim_running = Arc::clone(&running);
    let sim_bus = Arc::clone(&bus);
    let sim_world = world.clone();
    thread::Builder::new()
        .name("sim-world".to_string())
        .spawn(move || {
            let mut button_pressed = false;
            while sim_running.load(Ordering::Relaxed) {
                sim_world.advance(0.002);
                if !button_pressed && sim_bus.calibrated.get() {
                    log::info!("Simulated user button press");
                    sim_bus.button_pressed.raise();
                    button_pressed = true;
                }
                thread::sleep(Duration::from_millis(2));
            }
        })?;

    log::info!("Control stack running, Ctrl-C to stop");
    scheduler.run(&running)
}
