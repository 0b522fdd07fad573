//! Command-line harness: enumerate HID devices or watch the bridged
//! controller state live.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hid_procon_protocol::{PRODUCT_ID, VENDOR_ID};
use hidapi::HidApi;
use propad_engine::{AgentConfig, ProAgent};
use propad_xinput::surface;
use propad_xinput_types::{
    XInputBatteryInformation, XInputState, BATTERY_DEVTYPE_GAMEPAD, ERROR_SUCCESS,
};
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "propad", about = "Nintendo Switch Pro controller to XInput bridge harness")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connected HID devices and flag the Pro controller
    List,
    /// Attach an agent and print the translated state live
    Watch {
        /// Redraw interval in milliseconds
        #[arg(long, default_value = "16")]
        interval: u64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::List => list_devices(),
        Commands::Watch { interval } => watch(Duration::from_millis(interval)),
    }
}

fn list_devices() -> Result<()> {
    let api = HidApi::new().context("initializing hidapi")?;
    let devices: Vec<_> = api.device_list().collect();
    if devices.is_empty() {
        println!("No HID devices found.");
        return Ok(());
    }

    println!("{:<8} {:<8} {:<24} {}", "VID", "PID", "Product", "Path");
    println!("{}", "-".repeat(72));
    for device in devices {
        let is_pro =
            device.vendor_id() == VENDOR_ID && device.product_id() == PRODUCT_ID;
        println!(
            "{:<8} {:<8} {:<24} {}{}",
            format!("0x{:04X}", device.vendor_id()),
            format!("0x{:04X}", device.product_id()),
            device.product_string().unwrap_or("(unknown)"),
            device.path().to_string_lossy(),
            if is_pro { "  <- Pro controller" } else { "" },
        );
    }
    Ok(())
}

fn watch(interval: Duration) -> Result<()> {
    info!("attaching controller agent");
    let agent = ProAgent::new(AgentConfig::default());

    // clear screen once, then redraw in place, driving the same entry-point
    // logic a game would
    print!("\x1B[2J");
    loop {
        let mut state = XInputState::default();
        let mut battery = XInputBatteryInformation::default();
        let code = surface::get_state(&agent, 0, &mut state);
        let _ = surface::get_battery_information(&agent, 0, BATTERY_DEVTYPE_GAMEPAD, &mut battery);

        print!("\x1B[H");
        render(code, &state, &battery);
        std::thread::sleep(interval);
    }
}

fn render(code: u32, state: &XInputState, battery: &XInputBatteryInformation) {
    let color = if code == ERROR_SUCCESS { "\x1B[0;32m" } else { "\x1B[0;31m" };
    println!("{color}Result code: {code:08X}\x1B[0m   ");
    println!("Input states:");
    println!("    Packet number   = {:02X}   ", state.packet_number);
    println!("    Buttons         = {:04X}   ", state.gamepad.buttons);
    println!("    Left trigger    = {:3}     ", state.gamepad.left_trigger);
    println!("    Right trigger   = {:3}     ", state.gamepad.right_trigger);
    println!(
        "    Left thumbstick  = ({:+6}, {:+6})     ",
        state.gamepad.thumb_lx, state.gamepad.thumb_ly
    );
    println!(
        "    Right thumbstick = ({:+6}, {:+6})     ",
        state.gamepad.thumb_rx, state.gamepad.thumb_ry
    );
    println!("Battery info:");
    println!("    Type  = {:02X}   ", battery.battery_type);
    println!("    Level = {:02X}   ", battery.battery_level);
}
