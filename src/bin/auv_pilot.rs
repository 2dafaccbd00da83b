/**
 * AUV Pilot Binary
 *
 * Runs the control loop in the background and takes operator commands on
 * stdin. Without `--sim`, sensors and actuators go over the serial link in
 * the settings file.
 *
 * Ctrl-C, SIGTERM, `x` or end of input all stop the loop, which commands
 * every actuator to neutral before the process exits.
 *
 * Usage: auv_pilot [config.toml] [--sim]
 * Default: built-in settings, hardware link
 */

use std::io::{self, Write};
use std::sync::Arc;
use std::thread;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voith_nav::auv::{AuvController, VehicleIo};
use voith_nav::{Axis, MissionMode, NavCommand, Settings};

enum Input {
    Nav(NavCommand),
    Telemetry,
    Exit,
    Help,
}

fn parse_input(line: &str) -> Result<Option<Input>, String> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    let value = || -> Result<f64, String> {
        let raw = arg.ok_or_else(|| format!("{cmd} needs a value"))?;
        raw.parse().map_err(|_| format!("not a number: {raw}"))
    };

    let input = match cmd {
        "depth" => Input::Nav(NavCommand::SetReference(Axis::Depth, value()?)),
        "yaw" => Input::Nav(NavCommand::SetReference(Axis::Yaw, value()?)),
        "pitch" => Input::Nav(NavCommand::SetReference(Axis::Pitch, value()?)),
        "roll" => Input::Nav(NavCommand::SetReference(Axis::Roll, value()?)),
        "fx" => Input::Nav(NavCommand::SetReference(Axis::Fx, value()?)),
        "fy" => Input::Nav(NavCommand::SetReference(Axis::Fy, value()?)),
        "thrust" => Input::Nav(NavCommand::SetNetThrust(value()?)),
        "mode" => match arg {
            Some("normal") => Input::Nav(NavCommand::SetMission(MissionMode::Normal)),
            Some("box") | Some("box_pickup") => Input::Nav(NavCommand::SetMission(MissionMode::BoxPickup)),
            _ => return Err("mode is one of: normal, box".to_string()),
        },
        "zero" => Input::Nav(NavCommand::ZeroErrors),
        "t" | "telemetry" => Input::Telemetry,
        "x" | "exit" | "quit" => Input::Exit,
        "h" | "help" => Input::Help,
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(Some(input))
}

fn print_help() {
    println!("\n[Commands]");
    println!("  depth <m>            - depth reference");
    println!("  yaw|pitch|roll <deg> - attitude references");
    println!("  fx|fy <value>        - lateral demand (thrust, or pixel offset in box mode)");
    println!("  thrust <value>       - net Voith thrust");
    println!("  mode normal|box      - mission mode");
    println!("  zero                 - reset all controller errors");
    println!("  t                    - print telemetry");
    println!("  x                    - exit\n");
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let simulate = args.iter().any(|a| a == "--sim");
    let config = args.iter().find(|a| !a.starts_with("--"));

    let settings = match config {
        Some(path) => Settings::load(path).unwrap_or_else(|e| {
            eprintln!("failed to load {path}: {e}");
            std::process::exit(1);
        }),
        None => Settings::default(),
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = settings.logger.level.as_str();
            format!("voith_nav={level},auv_pilot={level}").into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let io = if simulate {
        VehicleIo::simulated(&settings)
    } else {
        VehicleIo::connect(&settings).unwrap_or_else(|e| {
            tracing::error!(error = %e, port = %settings.link.port, "cannot open serial link (try --sim)");
            std::process::exit(1);
        })
    };

    println!("==============================================");
    println!("  Voith AUV Pilot");
    println!("==============================================");
    println!("  Link:    {}", if simulate { "simulated".to_string() } else { settings.link.port.clone() });
    println!("  Mission: {:?}", settings.controller.mission);
    println!("==============================================");

    let controller = Arc::new(AuvController::new(settings));
    let handle = controller.clone().start_background(io);

    let on_signal = controller.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("signal received, shutting down");
        on_signal.shutdown();
    }) {
        tracing::error!(error = %e, "cannot install signal handler");
        controller.shutdown();
        let _ = handle.join();
        std::process::exit(1);
    }

    print_help();

    // Detached: the process ends once the control loop has stopped, even if
    // this thread is still waiting on stdin.
    let operator = controller.clone();
    thread::spawn(move || {
        operator_loop(&operator);
        operator.shutdown();
    });

    if handle.join().is_err() {
        tracing::error!("control loop panicked");
        std::process::exit(1);
    }
    println!("[SHUTDOWN] actuators neutral");
    println!("Goodbye!");
}

fn operator_loop(controller: &AuvController) {
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        if !controller.is_running() {
            return;
        }

        match parse_input(&line) {
            Ok(Some(Input::Nav(cmd))) => {
                if controller.command(cmd.clone()) {
                    println!("[OK] {cmd:?}");
                } else {
                    println!("[BUSY] try again");
                }
            }
            Ok(Some(Input::Telemetry)) => match controller.latest_telemetry() {
                Some(t) => println!("{t}"),
                None => println!("[NO TELEMETRY YET]"),
            },
            Ok(Some(Input::Help)) => print_help(),
            Ok(Some(Input::Exit)) => return,
            Ok(None) => {}
            Err(msg) => println!("{msg}"),
        }
    }
}
